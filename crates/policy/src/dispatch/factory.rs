use std::sync::Arc;

use super::{Invoker, PolicyHandler};
use crate::binding::Binding;
use crate::index::BehaviourIndex;
use crate::policy::PolicyDefinition;
use crate::uow::UnitOfWork;

/// One single-behaviour handler per matching behaviour.
pub type HandlerList = Arc<[Arc<PolicyHandler>]>;

/// Produces handlers for bindings of one policy.
pub trait PolicyHandlerFactory: Send + Sync {
	fn policy(&self) -> &Arc<PolicyDefinition>;

	/// Aggregate handler for `binding`.
	fn create(&self, uow: &UnitOfWork, binding: &Binding) -> Arc<PolicyHandler>;

	/// Individual handlers for `binding`, in discovery order.
	fn create_list(&self, uow: &UnitOfWork, binding: &Binding) -> HandlerList;
}

/// Builds a fresh handler from an index lookup on every call.
pub struct PolicyFactory {
	policy: Arc<PolicyDefinition>,
	index: Arc<BehaviourIndex>,
}

impl PolicyFactory {
	pub fn new(policy: Arc<PolicyDefinition>, index: Arc<BehaviourIndex>) -> Self {
		Self { policy, index }
	}

	pub fn index(&self) -> &Arc<BehaviourIndex> {
		&self.index
	}
}

impl PolicyHandlerFactory for PolicyFactory {
	fn policy(&self) -> &Arc<PolicyDefinition> {
		&self.policy
	}

	fn create(&self, uow: &UnitOfWork, binding: &Binding) -> Arc<PolicyHandler> {
		let found = self.index.find(uow, binding);
		Arc::new(PolicyHandler::from_definitions(Arc::clone(&self.policy), &found))
	}

	fn create_list(&self, uow: &UnitOfWork, binding: &Binding) -> HandlerList {
		self.index
			.find(uow, binding)
			.into_iter()
			.map(|d| {
				let invoker = Invoker::new(Arc::clone(&self.policy), d.behaviour().clone());
				Arc::new(PolicyHandler::new(Arc::clone(&self.policy), vec![invoker]))
			})
			.collect()
	}
}
