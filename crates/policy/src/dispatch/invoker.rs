use std::sync::Arc;

use quire_primitives::Value;
use tracing::trace;

use crate::behaviour::{Behaviour, Invocation};
use crate::deferred;
use crate::error::PolicyError;
use crate::policy::PolicyDefinition;
use crate::uow::UnitOfWork;
use crate::NotificationFrequency;

/// One behaviour bound to one policy, routed by its frequency.
#[derive(Clone)]
pub struct Invoker {
	policy: Arc<PolicyDefinition>,
	behaviour: Behaviour,
}

impl Invoker {
	pub(crate) fn new(policy: Arc<PolicyDefinition>, behaviour: Behaviour) -> Self {
		Self { policy, behaviour }
	}

	pub fn policy(&self) -> &PolicyDefinition {
		&self.policy
	}

	pub fn behaviour(&self) -> &Behaviour {
		&self.behaviour
	}

	/// Fires the behaviour. A behaviour that is already running in `uow`
	/// is skipped and yields `Null`.
	pub fn invoke(&self, uow: &UnitOfWork, args: &[Value]) -> Result<Value, PolicyError> {
		if !self.behaviour.is_enabled(uow) {
			trace!(
				policy = %self.policy.name(),
				behaviour = self.behaviour.name(),
				"dispatch.reentry_skipped"
			);
			return Ok(Value::Null);
		}
		match self.behaviour.frequency() {
			NotificationFrequency::EveryEvent => self.execute(uow, args),
			NotificationFrequency::FirstEvent => deferred::first_event(uow, self, args),
			NotificationFrequency::OnCommit => deferred::on_commit(uow, self, args),
		}
	}

	/// Runs the handler now, guarded against reentry.
	pub(crate) fn execute(&self, uow: &UnitOfWork, args: &[Value]) -> Result<Value, PolicyError> {
		self.behaviour.call(&Invocation::new(uow, &self.policy, args))
	}
}
