//! Unit-of-work scoped behaviour filtering.
//!
//! Every scope is a reentrant counter: `disable` increments, `enable`
//! decrements and never goes below zero. A scope is disabled while its
//! counter is non-zero. Counters live in the [`UnitOfWork`] and vanish with it.
//!
//! Checks compose conjunctively. A class check fails when the global scope is
//! disabled, when the class itself is disabled, or when an ancestor was
//! disabled together with its subclasses. An instance+class check adds the
//! per-node class filters (hierarchy-aware) and the plain instance filter.

use std::sync::Arc;

use quire_dictionary::ClassHierarchy;
use quire_primitives::{NodeRef, QName};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::uow::UnitOfWork;

/// Target of a `disable`/`enable` call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterScope {
	/// Every behaviour.
	Global,
	/// Behaviours bound to exactly this class.
	Class(QName),
	/// Behaviours bound to this class or any of its subclasses.
	ClassAndSubclasses(QName),
	/// Behaviours fired for this node.
	Instance(NodeRef),
	/// Behaviours of this class (and subclasses) fired for this node.
	InstanceClass(NodeRef, QName),
}

#[derive(Debug, Clone, Copy, Default)]
struct ClassFilter {
	count: u32,
	/// Sticky until the counter returns to zero.
	subclasses: bool,
}

/// Filter counters held by a unit of work. Zero entries are removed.
#[derive(Debug, Default)]
pub(crate) struct FilterState {
	global: u32,
	classes: FxHashMap<QName, ClassFilter>,
	instances: FxHashMap<NodeRef, u32>,
	instance_classes: FxHashMap<NodeRef, FxHashMap<QName, u32>>,
}

impl FilterState {
	pub(crate) fn clear(&mut self) {
		*self = Self::default();
	}

	fn is_activated(&self) -> bool {
		self.global > 0
			|| !self.classes.is_empty()
			|| !self.instances.is_empty()
			|| !self.instance_classes.is_empty()
	}

	fn disable(&mut self, scope: &FilterScope) {
		match scope {
			FilterScope::Global => self.global += 1,
			FilterScope::Class(class) => {
				self.classes.entry(class.clone()).or_default().count += 1;
			}
			FilterScope::ClassAndSubclasses(class) => {
				let filter = self.classes.entry(class.clone()).or_default();
				filter.count += 1;
				filter.subclasses = true;
			}
			FilterScope::Instance(node) => *self.instances.entry(node.clone()).or_default() += 1,
			FilterScope::InstanceClass(node, class) => {
				*self
					.instance_classes
					.entry(node.clone())
					.or_default()
					.entry(class.clone())
					.or_default() += 1;
			}
		}
	}

	/// Returns false when the scope was not disabled.
	fn enable(&mut self, scope: &FilterScope) -> bool {
		match scope {
			FilterScope::Global => {
				let was = self.global > 0;
				self.global = self.global.saturating_sub(1);
				was
			}
			FilterScope::Class(class) | FilterScope::ClassAndSubclasses(class) => {
				let Some(filter) = self.classes.get_mut(class) else {
					return false;
				};
				filter.count -= 1;
				if filter.count == 0 {
					self.classes.remove(class);
				}
				true
			}
			FilterScope::Instance(node) => decrement(&mut self.instances, node),
			FilterScope::InstanceClass(node, class) => {
				let Some(per_node) = self.instance_classes.get_mut(node) else {
					return false;
				};
				let released = decrement(per_node, class);
				if per_node.is_empty() {
					self.instance_classes.remove(node);
				}
				released
			}
		}
	}

	/// Drops every instance and instance+class counter for `node`.
	fn enable_instance_all(&mut self, node: &NodeRef) -> usize {
		let instance = self.instances.remove(node).map_or(0, |count| count as usize);
		let classes = self
			.instance_classes
			.remove(node)
			.map_or(0, |per_node| per_node.values().map(|&count| count as usize).sum());
		instance + classes
	}
}

fn decrement<K: std::hash::Hash + Eq>(map: &mut FxHashMap<K, u32>, key: &K) -> bool {
	let Some(count) = map.get_mut(key) else {
		return false;
	};
	*count -= 1;
	if *count == 0 {
		map.remove(key);
	}
	true
}

/// Shared front end over the per-unit-of-work filter counters.
pub struct BehaviourFilter {
	hierarchy: Arc<dyn ClassHierarchy>,
}

impl BehaviourFilter {
	pub fn new(hierarchy: Arc<dyn ClassHierarchy>) -> Self {
		Self { hierarchy }
	}

	pub fn hierarchy(&self) -> &dyn ClassHierarchy {
		&*self.hierarchy
	}

	pub fn disable(&self, uow: &UnitOfWork, scope: FilterScope) {
		trace!(uow = %uow.id(), ?scope, "filter.disable");
		uow.filter.lock().disable(&scope);
	}

	/// Releases one `disable` of `scope`. Releasing a scope that is not
	/// disabled does nothing.
	pub fn enable(&self, uow: &UnitOfWork, scope: FilterScope) {
		let released = uow.filter.lock().enable(&scope);
		trace!(uow = %uow.id(), ?scope, released, "filter.enable");
	}

	/// Releases every instance and instance+class filter on `node`,
	/// whatever its count.
	pub fn enable_instance_all(&self, uow: &UnitOfWork, node: &NodeRef) {
		let released = uow.filter.lock().enable_instance_all(node);
		trace!(uow = %uow.id(), %node, released, "filter.enable_instance_all");
	}

	/// Resets every filter in `uow`.
	pub fn enable_all(&self, uow: &UnitOfWork) {
		uow.filter.lock().clear();
		trace!(uow = %uow.id(), "filter.enable_all");
	}

	/// Disables `scope` until the returned guard is dropped.
	#[must_use = "the scope is re-enabled when the guard is dropped"]
	pub fn suppress<'a>(&'a self, uow: &'a UnitOfWork, scope: FilterScope) -> Suppressed<'a> {
		self.disable(uow, scope.clone());
		Suppressed {
			filter: self,
			uow,
			scope,
		}
	}

	pub fn is_enabled(&self, uow: &UnitOfWork) -> bool {
		uow.filter.lock().global == 0
	}

	pub fn is_class_enabled(&self, uow: &UnitOfWork, class: &QName) -> bool {
		let state = uow.filter.lock();
		self.class_enabled(&state, class)
	}

	pub fn is_instance_enabled(&self, uow: &UnitOfWork, node: &NodeRef) -> bool {
		let state = uow.filter.lock();
		state.global == 0 && !state.instances.contains_key(node)
	}

	pub fn is_instance_class_enabled(
		&self,
		uow: &UnitOfWork,
		node: &NodeRef,
		class: &QName,
	) -> bool {
		let state = uow.filter.lock();
		if !self.class_enabled(&state, class) {
			return false;
		}
		if let Some(per_node) = state.instance_classes.get(node)
			&& per_node
				.keys()
				.any(|filtered| self.hierarchy.is_subclass(class, filtered))
		{
			return false;
		}
		!state.instances.contains_key(node)
	}

	/// True while any scope holds a non-zero counter.
	pub fn is_activated(&self, uow: &UnitOfWork) -> bool {
		uow.filter.lock().is_activated()
	}

	fn class_enabled(&self, state: &FilterState, class: &QName) -> bool {
		if state.global > 0 {
			return false;
		}
		!state.classes.iter().any(|(filtered, filter)| {
			filtered == class || (filter.subclasses && self.hierarchy.is_subclass(class, filtered))
		})
	}
}

/// Guard returned by [`BehaviourFilter::suppress`].
pub struct Suppressed<'a> {
	filter: &'a BehaviourFilter,
	uow: &'a UnitOfWork,
	scope: FilterScope,
}

impl Drop for Suppressed<'_> {
	fn drop(&mut self) {
		let scope = std::mem::replace(&mut self.scope, FilterScope::Global);
		self.filter.enable(self.uow, scope);
	}
}
