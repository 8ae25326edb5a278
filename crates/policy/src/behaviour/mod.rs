//! Behaviours and their bound definitions.
//!
//! A [`Behaviour`] is a shared handle to handler logic plus an invocation
//! frequency. Equality is identity: two behaviours built from the same
//! closure are still distinct. Each behaviour also carries a reentrancy
//! guard whose state lives in the calling [`UnitOfWork`], so disabling a
//! behaviour in one unit of work never affects another.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use quire_primitives::{QName, Value};
use serde::{Deserialize, Serialize};

use crate::binding::Binding;
use crate::error::{FilterError, PolicyError, ValidationError};
use crate::policy::{PolicyDefinition, PolicyKind};
use crate::uow::UnitOfWork;

/// Process-unique behaviour identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BehaviourId(u64);

impl BehaviourId {
	fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}
}

impl fmt::Display for BehaviourId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// When a behaviour runs relative to the event that fired it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationFrequency {
	/// On every firing.
	#[default]
	EveryEvent,
	/// Once per unit of work per key; later firings return the first result.
	FirstEvent,
	/// Once per unit of work per key, just before commit, with final values.
	OnCommit,
}

/// Arguments and context handed to a behaviour handler.
pub struct Invocation<'a> {
	uow: &'a UnitOfWork,
	policy: &'a PolicyDefinition,
	args: &'a [Value],
}

impl<'a> Invocation<'a> {
	pub(crate) fn new(
		uow: &'a UnitOfWork,
		policy: &'a PolicyDefinition,
		args: &'a [Value],
	) -> Self {
		Self { uow, policy, args }
	}

	/// The unit of work the event was fired in.
	pub fn unit_of_work(&self) -> &'a UnitOfWork {
		self.uow
	}

	pub fn policy(&self) -> &'a PolicyDefinition {
		self.policy
	}

	pub fn args(&self) -> &'a [Value] {
		self.args
	}

	/// Argument at `index`, or `Null` when out of range.
	pub fn arg(&self, index: usize) -> &'a Value {
		static NULL: Value = Value::Null;
		self.args.get(index).unwrap_or(&NULL)
	}
}

/// Handler logic behind a behaviour.
pub trait BehaviourHandler: Send + Sync {
	fn handle(&self, invocation: &Invocation<'_>) -> Result<Value, PolicyError>;
}

impl<F> BehaviourHandler for F
where
	F: Fn(&Invocation<'_>) -> Result<Value, PolicyError> + Send + Sync,
{
	fn handle(&self, invocation: &Invocation<'_>) -> Result<Value, PolicyError> {
		self(invocation)
	}
}

/// Operation a behaviour declares it implements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
	pub operation: String,
	pub arity: usize,
}

struct Inner {
	id: BehaviourId,
	name: Arc<str>,
	frequency: NotificationFrequency,
	signature: Option<Signature>,
	handler: Box<dyn BehaviourHandler>,
}

/// Shared handle to a handler and its invocation frequency.
#[derive(Clone)]
pub struct Behaviour {
	inner: Arc<Inner>,
}

impl Behaviour {
	/// Creates an `EveryEvent` behaviour with no declared signature.
	pub fn new<F>(name: impl Into<Arc<str>>, handler: F) -> Self
	where
		F: Fn(&Invocation<'_>) -> Result<Value, PolicyError> + Send + Sync + 'static,
	{
		Self::builder(name).build(handler)
	}

	pub fn builder(name: impl Into<Arc<str>>) -> BehaviourBuilder {
		BehaviourBuilder {
			name: name.into(),
			frequency: NotificationFrequency::EveryEvent,
			signature: None,
		}
	}

	pub fn id(&self) -> BehaviourId {
		self.inner.id
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn frequency(&self) -> NotificationFrequency {
		self.inner.frequency
	}

	pub fn signature(&self) -> Option<&Signature> {
		self.inner.signature.as_ref()
	}

	/// Checks the declared signature, if any, against `policy`.
	pub fn validate(&self, policy: &PolicyDefinition) -> Result<(), ValidationError> {
		let Some(sig) = &self.inner.signature else {
			return Ok(());
		};
		if sig.operation != policy.operation() {
			return Err(ValidationError::OperationMismatch {
				policy: policy.name().clone(),
				behaviour: self.name().to_string(),
				expected: policy.operation().to_string(),
				found: sig.operation.clone(),
			});
		}
		if sig.arity != policy.arity() {
			return Err(ValidationError::ArityMismatch {
				policy: policy.name().clone(),
				behaviour: self.name().to_string(),
				expected: policy.arity(),
				found: sig.arity,
			});
		}
		Ok(())
	}

	/// Pushes a disable marker for this behaviour in `uow`.
	pub fn disable(&self, uow: &UnitOfWork) {
		uow.push_disabled(self.id());
	}

	/// Pops a disable marker pushed by [`Behaviour::disable`].
	pub fn enable(&self, uow: &UnitOfWork) -> Result<(), FilterError> {
		if uow.pop_disabled(self.id()) {
			Ok(())
		} else {
			Err(FilterError::UnbalancedEnable {
				behaviour: self.name().to_string(),
			})
		}
	}

	pub fn is_enabled(&self, uow: &UnitOfWork) -> bool {
		!uow.is_disabled(self.id())
	}

	/// Runs the handler with this behaviour disabled for the duration.
	pub(crate) fn call(&self, invocation: &Invocation<'_>) -> Result<Value, PolicyError> {
		let _guard = Reentry::enter(self, invocation.unit_of_work());
		self.inner.handler.handle(invocation)
	}
}

impl PartialEq for Behaviour {
	fn eq(&self, other: &Self) -> bool {
		self.inner.id == other.inner.id
	}
}

impl Eq for Behaviour {}

impl Hash for Behaviour {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.inner.id.hash(state);
	}
}

impl fmt::Debug for Behaviour {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Behaviour")
			.field("id", &self.inner.id)
			.field("name", &self.inner.name)
			.field("frequency", &self.inner.frequency)
			.finish_non_exhaustive()
	}
}

impl fmt::Display for Behaviour {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.inner.name)
	}
}

/// Builder returned by [`Behaviour::builder`].
pub struct BehaviourBuilder {
	name: Arc<str>,
	frequency: NotificationFrequency,
	signature: Option<Signature>,
}

impl BehaviourBuilder {
	pub fn frequency(mut self, frequency: NotificationFrequency) -> Self {
		self.frequency = frequency;
		self
	}

	/// Declares the operation this behaviour implements, checked on bind.
	pub fn signature(mut self, operation: impl Into<String>, arity: usize) -> Self {
		self.signature = Some(Signature {
			operation: operation.into(),
			arity,
		});
		self
	}

	pub fn build<F>(self, handler: F) -> Behaviour
	where
		F: Fn(&Invocation<'_>) -> Result<Value, PolicyError> + Send + Sync + 'static,
	{
		self.build_handler(handler)
	}

	pub fn build_handler(self, handler: impl BehaviourHandler + 'static) -> Behaviour {
		Behaviour {
			inner: Arc::new(Inner {
				id: BehaviourId::next(),
				name: self.name,
				frequency: self.frequency,
				signature: self.signature,
				handler: Box::new(handler),
			}),
		}
	}
}

/// Disables a behaviour until dropped.
struct Reentry<'a> {
	behaviour: &'a Behaviour,
	uow: &'a UnitOfWork,
}

impl<'a> Reentry<'a> {
	fn enter(behaviour: &'a Behaviour, uow: &'a UnitOfWork) -> Self {
		behaviour.disable(uow);
		Self { behaviour, uow }
	}
}

impl Drop for Reentry<'_> {
	fn drop(&mut self) {
		if let Err(err) = self.behaviour.enable(self.uow) {
			tracing::error!(%err, "behaviour.reentry");
		}
	}
}

/// An immutable (policy, binding, behaviour) triple created at bind time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BehaviourDefinition {
	policy: QName,
	kind: PolicyKind,
	binding: Binding,
	behaviour: Behaviour,
}

impl BehaviourDefinition {
	pub fn new(policy: QName, kind: PolicyKind, binding: Binding, behaviour: Behaviour) -> Self {
		Self {
			policy,
			kind,
			binding,
			behaviour,
		}
	}

	pub fn policy(&self) -> &QName {
		&self.policy
	}

	pub fn kind(&self) -> PolicyKind {
		self.kind
	}

	pub fn binding(&self) -> &Binding {
		&self.binding
	}

	pub fn behaviour(&self) -> &Behaviour {
		&self.behaviour
	}
}

impl fmt::Display for BehaviourDefinition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} -> {} @ {}", self.policy, self.behaviour, self.binding)
	}
}
