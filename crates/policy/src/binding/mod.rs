//! Where a behaviour is attached.
//!
//! Class and feature bindings are hierarchical: [`Binding::generalise`]
//! yields the next broader binding, and lookups walk that chain until a bound
//! key is found. Service bindings are flat and always apply.
//!
//! Generalisation order:
//!
//! - an instance-qualified binding drops its instance first;
//! - `Class(C)` becomes `Class(parent(C))`;
//! - `Feature(C, Named(f))` becomes `Feature(C, All)`;
//! - `Feature(C, All)` becomes `Feature(parent(C), All)`;
//! - roots and services stop.

use std::fmt;
use std::sync::Arc;

use quire_dictionary::ClassHierarchy;
use quire_primitives::{NodeRef, QName};

/// Property or association selector of a feature binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Feature {
	/// Every feature of the class.
	All,
	Named(QName),
}

/// Opaque identity of a service-level binding target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(Arc<str>);

impl ServiceId {
	pub fn new(id: impl Into<Arc<str>>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ServiceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Attachment key for a behaviour. Equality and hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Binding {
	Class {
		class: QName,
		instance: Option<NodeRef>,
	},
	Feature {
		class: QName,
		feature: Feature,
		instance: Option<NodeRef>,
	},
	Service(ServiceId),
}

impl Binding {
	pub fn class(class: QName) -> Self {
		Binding::Class {
			class,
			instance: None,
		}
	}

	pub fn instance(node: NodeRef, class: QName) -> Self {
		Binding::Class {
			class,
			instance: Some(node),
		}
	}

	/// Binding for a named feature, or for all features when `feature` is `None`.
	pub fn feature(class: QName, feature: Option<QName>) -> Self {
		Binding::Feature {
			class,
			feature: feature.map_or(Feature::All, Feature::Named),
			instance: None,
		}
	}

	pub fn service(id: ServiceId) -> Self {
		Binding::Service(id)
	}

	/// The class this binding is keyed on. `None` for services.
	pub fn class_name(&self) -> Option<&QName> {
		match self {
			Binding::Class { class, .. } | Binding::Feature { class, .. } => Some(class),
			Binding::Service(_) => None,
		}
	}

	pub fn instance_ref(&self) -> Option<&NodeRef> {
		match self {
			Binding::Class { instance, .. } | Binding::Feature { instance, .. } => {
				instance.as_ref()
			}
			Binding::Service(_) => None,
		}
	}

	pub fn is_service(&self) -> bool {
		matches!(self, Binding::Service(_))
	}

	/// Returns the next broader binding, or `None` at the root.
	pub fn generalise(&self, hierarchy: &dyn ClassHierarchy) -> Option<Binding> {
		match self {
			Binding::Class {
				class,
				instance: Some(_),
			} => Some(Binding::class(class.clone())),
			Binding::Class {
				class,
				instance: None,
			} => hierarchy.parent_of(class).map(Binding::class),
			Binding::Feature {
				class,
				feature,
				instance: Some(_),
			} => Some(Binding::Feature {
				class: class.clone(),
				feature: feature.clone(),
				instance: None,
			}),
			Binding::Feature {
				class,
				feature: Feature::Named(_),
				instance: None,
			} => Some(Binding::feature(class.clone(), None)),
			Binding::Feature {
				class,
				feature: Feature::All,
				instance: None,
			} => hierarchy
				.parent_of(class)
				.map(|parent| Binding::feature(parent, None)),
			Binding::Service(_) => None,
		}
	}

	/// Iterates this binding followed by its generalisations, at most `limit`
	/// bindings in total.
	pub fn lineage<'a>(&self, hierarchy: &'a dyn ClassHierarchy, limit: usize) -> Lineage<'a> {
		Lineage {
			hierarchy,
			next: Some(self.clone()),
			remaining: limit,
		}
	}
}

impl fmt::Display for Binding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Binding::Class { class, instance } => {
				write!(f, "{class}")?;
				if let Some(node) = instance {
					write!(f, "@{node}")?;
				}
				Ok(())
			}
			Binding::Feature {
				class,
				feature,
				instance,
			} => {
				match feature {
					Feature::All => write!(f, "{class}.*")?,
					Feature::Named(name) => write!(f, "{class}.{name}")?,
				}
				if let Some(node) = instance {
					write!(f, "@{node}")?;
				}
				Ok(())
			}
			Binding::Service(id) => write!(f, "service:{id}"),
		}
	}
}

/// Iterator returned by [`Binding::lineage`].
pub struct Lineage<'a> {
	hierarchy: &'a dyn ClassHierarchy,
	next: Option<Binding>,
	remaining: usize,
}

impl Lineage<'_> {
	/// True once the walk stopped on the limit rather than at a root.
	pub fn truncated(&self) -> bool {
		self.remaining == 0 && self.next.is_some()
	}
}

impl Iterator for Lineage<'_> {
	type Item = Binding;

	fn next(&mut self) -> Option<Binding> {
		if self.remaining == 0 {
			return None;
		}
		let current = self.next.take()?;
		self.remaining -= 1;
		self.next = current.generalise(self.hierarchy);
		Some(current)
	}
}
