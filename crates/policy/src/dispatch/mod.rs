//! Aggregate policy handlers.
//!
//! A [`PolicyHandler`] is what the repository layer calls when it fires a
//! policy. It fans out to the behaviours found for a binding:
//!
//! - no behaviour: returns `Null`;
//! - one behaviour: passes its result through;
//! - several: runs each in discovery order and returns the last result. The
//!   first error stops the remaining behaviours and is returned unchanged.

use std::fmt;
use std::sync::Arc;

use quire_primitives::Value;
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::behaviour::{Behaviour, BehaviourDefinition};
use crate::error::PolicyError;
use crate::policy::PolicyDefinition;
use crate::uow::UnitOfWork;

mod cache;
mod factory;
mod invoker;

pub use cache::{CachedPolicyFactory, HandlerCache};
pub use factory::{HandlerList, PolicyFactory, PolicyHandlerFactory};
pub use invoker::Invoker;

/// Fan-out shape of a handler.
#[derive(Clone)]
pub enum Dispatch {
	Empty,
	Single(Invoker),
	Many(Vec<Invoker>),
}

/// Callable aggregate for one policy and binding.
pub struct PolicyHandler {
	policy: Arc<PolicyDefinition>,
	dispatch: Dispatch,
}

impl PolicyHandler {
	pub fn new(policy: Arc<PolicyDefinition>, mut invokers: Vec<Invoker>) -> Self {
		let dispatch = match invokers.len() {
			0 => Dispatch::Empty,
			1 => match invokers.pop() {
				Some(only) => Dispatch::Single(only),
				None => Dispatch::Empty,
			},
			_ => Dispatch::Many(invokers),
		};
		Self { policy, dispatch }
	}

	/// Builds a handler over the behaviours of `definitions`.
	pub fn from_definitions(
		policy: Arc<PolicyDefinition>,
		definitions: &[BehaviourDefinition],
	) -> Self {
		let invokers = definitions
			.iter()
			.map(|d| Invoker::new(Arc::clone(&policy), d.behaviour().clone()))
			.collect();
		Self::new(policy, invokers)
	}

	/// Merges several handlers, keeping the first occurrence of each behaviour.
	pub fn merge<'a>(
		policy: Arc<PolicyDefinition>,
		handlers: impl IntoIterator<Item = &'a PolicyHandler>,
	) -> Self {
		let mut seen = FxHashSet::default();
		let invokers = handlers
			.into_iter()
			.flat_map(|h| h.invokers().iter())
			.filter(|i| seen.insert(i.behaviour().id()))
			.cloned()
			.collect();
		Self::new(policy, invokers)
	}

	pub fn policy(&self) -> &Arc<PolicyDefinition> {
		&self.policy
	}

	pub fn dispatch(&self) -> &Dispatch {
		&self.dispatch
	}

	pub fn invokers(&self) -> &[Invoker] {
		match &self.dispatch {
			Dispatch::Empty => &[],
			Dispatch::Single(one) => std::slice::from_ref(one),
			Dispatch::Many(all) => all,
		}
	}

	pub fn behaviours(&self) -> impl Iterator<Item = &Behaviour> {
		self.invokers().iter().map(Invoker::behaviour)
	}

	pub fn len(&self) -> usize {
		self.invokers().len()
	}

	pub fn is_empty(&self) -> bool {
		matches!(self.dispatch, Dispatch::Empty)
	}

	/// Fires the policy.
	pub fn invoke(&self, uow: &UnitOfWork, args: &[Value]) -> Result<Value, PolicyError> {
		if args.len() != self.policy.arity() {
			return Err(PolicyError::ArgumentCount {
				policy: self.policy.name().clone(),
				expected: self.policy.arity(),
				found: args.len(),
			});
		}
		trace!(
			uow = %uow.id(),
			policy = %self.policy.name(),
			behaviours = self.len(),
			"policy.dispatch"
		);
		match &self.dispatch {
			Dispatch::Empty => Ok(Value::Null),
			Dispatch::Single(one) => one.invoke(uow, args),
			Dispatch::Many(all) => {
				let mut last = Value::Null;
				for invoker in all {
					last = invoker.invoke(uow, args)?;
				}
				Ok(last)
			}
		}
	}
}

impl fmt::Display for PolicyHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}[", self.policy.name())?;
		for (i, behaviour) in self.behaviours().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{behaviour}")?;
		}
		f.write_str("]")
	}
}

impl fmt::Debug for PolicyHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PolicyHandler")
			.field("policy", &self.policy.name())
			.field("behaviours", &self.behaviours().map(Behaviour::name).collect::<Vec<_>>())
			.finish()
	}
}
