//! Typed delegates returned at registration.
//!
//! A delegate turns repository coordinates (class, node, feature) into
//! bindings and asks its policy's factory for handlers. Class lookups are
//! checked against the content model when binding validation is enabled.

use std::sync::Arc;

use quire_primitives::{NodeRef, QName, Value};

use super::ModelChecker;
use crate::binding::Binding;
use crate::dispatch::{HandlerList, PolicyHandler, PolicyHandlerFactory};
use crate::error::{BindingError, PolicyError};
use crate::policy::PolicyDefinition;
use crate::uow::UnitOfWork;

/// Shared plumbing of all delegate kinds.
#[derive(Clone)]
struct Delegate {
	checker: ModelChecker,
	factory: Arc<dyn PolicyHandlerFactory>,
}

impl Delegate {
	fn get(&self, uow: &UnitOfWork, binding: &Binding) -> Result<Arc<PolicyHandler>, BindingError> {
		if let Some(class) = binding.class_name() {
			self.checker.class(class)?;
		}
		Ok(self.factory.create(uow, binding))
	}

	fn list(&self, uow: &UnitOfWork, binding: &Binding) -> Result<HandlerList, BindingError> {
		if let Some(class) = binding.class_name() {
			self.checker.class(class)?;
		}
		Ok(self.factory.create_list(uow, binding))
	}

	/// One handler over the behaviours of every binding, each behaviour once.
	fn merged(
		&self,
		uow: &UnitOfWork,
		bindings: impl IntoIterator<Item = Binding>,
	) -> Result<Arc<PolicyHandler>, BindingError> {
		let handlers = bindings
			.into_iter()
			.map(|b| self.get(uow, &b))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Arc::new(PolicyHandler::merge(
			Arc::clone(self.factory.policy()),
			handlers.iter().map(Arc::as_ref),
		)))
	}
}

/// Handle to a registered class-level policy.
#[derive(Clone)]
pub struct ClassPolicyDelegate {
	inner: Delegate,
}

impl ClassPolicyDelegate {
	pub(crate) fn new(checker: ModelChecker, factory: Arc<dyn PolicyHandlerFactory>) -> Self {
		Self {
			inner: Delegate { checker, factory },
		}
	}

	pub fn policy(&self) -> &Arc<PolicyDefinition> {
		self.inner.factory.policy()
	}

	/// Handler for behaviours bound to `class` or its nearest bound ancestor.
	pub fn get(&self, uow: &UnitOfWork, class: &QName) -> Result<Arc<PolicyHandler>, BindingError> {
		self.inner.get(uow, &Binding::class(class.clone()))
	}

	/// Like [`Self::get`], but instance bindings on `node` take precedence.
	pub fn get_for_instance(
		&self,
		uow: &UnitOfWork,
		node: &NodeRef,
		class: &QName,
	) -> Result<Arc<PolicyHandler>, BindingError> {
		self.inner
			.get(uow, &Binding::instance(node.clone(), class.clone()))
	}

	/// Handler over several classes, e.g. a node's type and its aspects.
	pub fn get_for_classes<'a>(
		&self,
		uow: &UnitOfWork,
		classes: impl IntoIterator<Item = &'a QName>,
	) -> Result<Arc<PolicyHandler>, BindingError> {
		self.inner
			.merged(uow, classes.into_iter().cloned().map(Binding::class))
	}

	pub fn list(&self, uow: &UnitOfWork, class: &QName) -> Result<HandlerList, BindingError> {
		self.inner.list(uow, &Binding::class(class.clone()))
	}

	/// Looks up the handler for `class` and fires it.
	pub fn invoke(
		&self,
		uow: &UnitOfWork,
		class: &QName,
		args: &[Value],
	) -> Result<Value, PolicyError> {
		self.get(uow, class)?.invoke(uow, args)
	}
}

macro_rules! feature_delegate {
	($(#[$doc:meta])* $name:ident) => {
		$(#[$doc])*
		#[derive(Clone)]
		pub struct $name {
			inner: Delegate,
		}

		impl $name {
			pub(crate) fn new(
				checker: ModelChecker,
				factory: Arc<dyn PolicyHandlerFactory>,
			) -> Self {
				Self {
					inner: Delegate { checker, factory },
				}
			}

			pub fn policy(&self) -> &Arc<PolicyDefinition> {
				self.inner.factory.policy()
			}

			/// Handler for `feature` of `class`, falling back to the class-wide
			/// wildcard and then to ancestors.
			pub fn get(
				&self,
				uow: &UnitOfWork,
				class: &QName,
				feature: &QName,
			) -> Result<Arc<PolicyHandler>, BindingError> {
				self.inner
					.get(uow, &Binding::feature(class.clone(), Some(feature.clone())))
			}

			pub fn get_for_classes<'a>(
				&self,
				uow: &UnitOfWork,
				classes: impl IntoIterator<Item = &'a QName>,
				feature: &QName,
			) -> Result<Arc<PolicyHandler>, BindingError> {
				self.inner.merged(
					uow,
					classes
						.into_iter()
						.map(|c| Binding::feature(c.clone(), Some(feature.clone()))),
				)
			}

			pub fn list(
				&self,
				uow: &UnitOfWork,
				class: &QName,
				feature: &QName,
			) -> Result<HandlerList, BindingError> {
				self.inner
					.list(uow, &Binding::feature(class.clone(), Some(feature.clone())))
			}

			pub fn invoke(
				&self,
				uow: &UnitOfWork,
				class: &QName,
				feature: &QName,
				args: &[Value],
			) -> Result<Value, PolicyError> {
				self.get(uow, class, feature)?.invoke(uow, args)
			}
		}
	};
}

feature_delegate! {
	/// Handle to a registered property-level policy.
	PropertyPolicyDelegate
}

feature_delegate! {
	/// Handle to a registered association-level policy.
	AssociationPolicyDelegate
}
