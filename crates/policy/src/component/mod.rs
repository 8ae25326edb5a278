//! Policy component: the registration and binding front end.
//!
//! # Role
//!
//! One [`PolicyComponent`] is constructed at process start and shared by
//! everything that registers policies, binds behaviours or fires policies.
//! It owns the policy registry, the behaviour filter and one
//! [`BehaviourIndex`] per (kind, policy) pair.
//!
//! # Invariants
//!
//! - Behaviours bound before their policy is registered are validated once,
//!   at registration; a failure leaves the policy unregistered.
//! - Behaviours bound after registration are validated on bind.
//! - Registration and binding of the same policy are serialized, so no
//!   behaviour escapes validation.

use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use quire_dictionary::{ClassHierarchy, ContentModel};
use quire_primitives::{NodeRef, QName};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::behaviour::{Behaviour, BehaviourDefinition};
use crate::binding::{Binding, ServiceId};
use crate::config::PolicyConfig;
use crate::dispatch::{CachedPolicyFactory, PolicyFactory, PolicyHandlerFactory};
use crate::error::{BindingError, PolicyError};
use crate::filter::BehaviourFilter;
use crate::index::BehaviourIndex;
use crate::policy::{PolicyDefinition, PolicyKind, PolicyRegistry, PolicyShape};

mod delegate;

pub use delegate::{AssociationPolicyDelegate, ClassPolicyDelegate, PropertyPolicyDelegate};

/// Index and factory of one (kind, policy) pair.
struct PolicySlot {
	index: Arc<BehaviourIndex>,
	factory: OnceLock<Arc<dyn PolicyHandlerFactory>>,
	/// Serializes registration with binding.
	gate: Mutex<()>,
}

/// Registers policies, binds behaviours and hands out delegates.
pub struct PolicyComponent {
	model: Arc<dyn ContentModel>,
	config: PolicyConfig,
	registry: PolicyRegistry,
	filter: Arc<BehaviourFilter>,
	slots: RwLock<FxHashMap<(PolicyKind, QName), Arc<PolicySlot>>>,
}

impl PolicyComponent {
	pub fn new<M>(model: Arc<M>, config: PolicyConfig) -> Self
	where
		M: ContentModel + 'static,
	{
		let hierarchy: Arc<dyn ClassHierarchy> = model.clone();
		Self {
			model,
			config,
			registry: PolicyRegistry::new(),
			filter: Arc::new(BehaviourFilter::new(hierarchy)),
			slots: RwLock::new(FxHashMap::default()),
		}
	}

	pub fn config(&self) -> &PolicyConfig {
		&self.config
	}

	pub fn filter(&self) -> &Arc<BehaviourFilter> {
		&self.filter
	}

	pub fn model(&self) -> &Arc<dyn ContentModel> {
		&self.model
	}

	pub fn register_class_policy(
		&self,
		shape: &PolicyShape,
	) -> Result<ClassPolicyDelegate, PolicyError> {
		let factory = self.register(PolicyKind::Class, shape)?;
		Ok(ClassPolicyDelegate::new(self.checker(), factory))
	}

	pub fn register_property_policy(
		&self,
		shape: &PolicyShape,
	) -> Result<PropertyPolicyDelegate, PolicyError> {
		let factory = self.register(PolicyKind::Property, shape)?;
		Ok(PropertyPolicyDelegate::new(self.checker(), factory))
	}

	pub fn register_association_policy(
		&self,
		shape: &PolicyShape,
	) -> Result<AssociationPolicyDelegate, PolicyError> {
		let factory = self.register(PolicyKind::Association, shape)?;
		Ok(AssociationPolicyDelegate::new(self.checker(), factory))
	}

	pub fn registered_policy(
		&self,
		kind: PolicyKind,
		name: &QName,
	) -> Option<Arc<PolicyDefinition>> {
		self.registry.get(kind, name)
	}

	/// Every registered policy, ordered by kind then name.
	pub fn registered_policies(&self) -> Vec<Arc<PolicyDefinition>> {
		self.registry.all()
	}

	pub fn bind_class_behaviour(
		&self,
		policy: &QName,
		class: &QName,
		behaviour: Behaviour,
	) -> Result<BehaviourDefinition, PolicyError> {
		self.checker().class(class)?;
		self.bind(PolicyKind::Class, policy, Binding::class(class.clone()), behaviour)
	}

	pub fn bind_instance_behaviour(
		&self,
		policy: &QName,
		node: &NodeRef,
		class: &QName,
		behaviour: Behaviour,
	) -> Result<BehaviourDefinition, PolicyError> {
		self.checker().class(class)?;
		let binding = Binding::instance(node.clone(), class.clone());
		self.bind(PolicyKind::Class, policy, binding, behaviour)
	}

	/// Binds to one property of `class`, or to all of them when `property` is `None`.
	pub fn bind_property_behaviour(
		&self,
		policy: &QName,
		class: &QName,
		property: Option<&QName>,
		behaviour: Behaviour,
	) -> Result<BehaviourDefinition, PolicyError> {
		let checker = self.checker();
		checker.class(class)?;
		if let Some(property) = property {
			checker.property(property)?;
		}
		let binding = Binding::feature(class.clone(), property.cloned());
		self.bind(PolicyKind::Property, policy, binding, behaviour)
	}

	/// Binds to one association of `class`, or to all of them when `association` is `None`.
	pub fn bind_association_behaviour(
		&self,
		policy: &QName,
		class: &QName,
		association: Option<&QName>,
		behaviour: Behaviour,
	) -> Result<BehaviourDefinition, PolicyError> {
		let checker = self.checker();
		checker.class(class)?;
		if let Some(association) = association {
			checker.association(association)?;
		}
		let binding = Binding::feature(class.clone(), association.cloned());
		self.bind(PolicyKind::Association, policy, binding, behaviour)
	}

	/// Binds a behaviour that applies to every lookup of `policy`.
	pub fn bind_service_behaviour(
		&self,
		kind: PolicyKind,
		policy: &QName,
		service: &ServiceId,
		behaviour: Behaviour,
	) -> Result<BehaviourDefinition, PolicyError> {
		self.bind(kind, policy, Binding::service(service.clone()), behaviour)
	}

	/// Removes a bound definition. Returns false if it was not bound.
	pub fn unbind(&self, definition: &BehaviourDefinition) -> bool {
		let Some(slot) = self.existing_slot(definition.kind(), definition.policy()) else {
			return false;
		};
		let removed = slot.index.remove(definition);
		if removed {
			debug!(
				policy = %definition.policy(),
				behaviour = definition.behaviour().name(),
				binding = %definition.binding(),
				"policy.unbind"
			);
		}
		removed
	}

	/// Every definition bound to `policy`.
	pub fn behaviours(&self, kind: PolicyKind, policy: &QName) -> Vec<BehaviourDefinition> {
		self.existing_slot(kind, policy)
			.map(|slot| slot.index.all())
			.unwrap_or_default()
	}

	fn register(
		&self,
		kind: PolicyKind,
		shape: &PolicyShape,
	) -> Result<Arc<dyn PolicyHandlerFactory>, PolicyError> {
		let definition = PolicyDefinition::from_shape(kind, shape)?;
		let slot = self.slot(kind, definition.name());
		let definition = {
			let _gate = slot.gate.lock();
			if self.registry.get(kind, definition.name()).is_none() {
				for bound in slot.index.all() {
					bound.behaviour().validate(&definition)?;
				}
			}
			self.registry.insert(definition)?
		};

		let factory = slot.factory.get_or_init(|| {
			debug!(
				policy = %definition.name(),
				%kind,
				arity = definition.arity(),
				bound = slot.index.len(),
				cached = self.config.cache_enabled,
				"policy.register"
			);
			let policy = Arc::clone(&definition);
			let index = Arc::clone(&slot.index);
			let factory: Arc<dyn PolicyHandlerFactory> = if self.config.cache_enabled {
				Arc::new(CachedPolicyFactory::new(policy, index))
			} else {
				Arc::new(PolicyFactory::new(policy, index))
			};
			factory
		});
		Ok(Arc::clone(factory))
	}

	fn bind(
		&self,
		kind: PolicyKind,
		policy: &QName,
		binding: Binding,
		behaviour: Behaviour,
	) -> Result<BehaviourDefinition, PolicyError> {
		let slot = self.slot(kind, policy);
		let definition = BehaviourDefinition::new(policy.clone(), kind, binding, behaviour);
		{
			let _gate = slot.gate.lock();
			if let Some(registered) = self.registry.get(kind, policy) {
				definition.behaviour().validate(&registered)?;
			}
			slot.index.add(definition.clone());
		}
		debug!(
			policy = %policy,
			behaviour = definition.behaviour().name(),
			frequency = ?definition.behaviour().frequency(),
			binding = %definition.binding(),
			"policy.bind"
		);
		Ok(definition)
	}

	fn existing_slot(&self, kind: PolicyKind, policy: &QName) -> Option<Arc<PolicySlot>> {
		self.slots.read().get(&(kind, policy.clone())).cloned()
	}

	fn slot(&self, kind: PolicyKind, policy: &QName) -> Arc<PolicySlot> {
		if let Some(slot) = self.existing_slot(kind, policy) {
			return slot;
		}
		let mut slots = self.slots.write();
		let slot = slots.entry((kind, policy.clone())).or_insert_with(|| {
			Arc::new(PolicySlot {
				index: Arc::new(BehaviourIndex::new(
					policy.clone(),
					kind,
					Arc::clone(&self.filter),
					self.config.max_hierarchy_depth,
				)),
				factory: OnceLock::new(),
				gate: Mutex::new(()),
			})
		});
		Arc::clone(slot)
	}

	fn checker(&self) -> ModelChecker {
		ModelChecker {
			model: Arc::clone(&self.model),
			enabled: self.config.validate_bindings,
		}
	}
}

/// Existence checks against the content model, skipped when disabled.
#[derive(Clone)]
pub(crate) struct ModelChecker {
	model: Arc<dyn ContentModel>,
	enabled: bool,
}

impl ModelChecker {
	pub(crate) fn class(&self, class: &QName) -> Result<(), BindingError> {
		if self.enabled && !self.model.has_class(class) {
			return Err(BindingError::UnknownClass(class.clone()));
		}
		Ok(())
	}

	pub(crate) fn property(&self, property: &QName) -> Result<(), BindingError> {
		if self.enabled && !self.model.has_property(property) {
			return Err(BindingError::UnknownProperty(property.clone()));
		}
		Ok(())
	}

	pub(crate) fn association(&self, association: &QName) -> Result<(), BindingError> {
		if self.enabled && !self.model.has_association(association) {
			return Err(BindingError::UnknownAssociation(association.clone()));
		}
		Ok(())
	}
}
