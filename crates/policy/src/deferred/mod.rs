//! Deferred and deduplicated invocation.
//!
//! # Role
//!
//! Behaviours with [`NotificationFrequency::FirstEvent`] or
//! [`NotificationFrequency::OnCommit`] do not simply run on every firing.
//! Both are keyed by the behaviour and the values of the policy's `Key`
//! arguments, and both are scoped to the unit of work:
//!
//! - first-event: the first firing per key runs and its result is replayed
//!   for later firings with the same key;
//! - on-commit: the first firing per key queues an execution; later firings
//!   overwrite the queued `EndValue` arguments. [`flush`] drains the queue in
//!   enqueue order, including executions queued while draining, and then
//!   closes it. Firings after that run immediately. A firing during the
//!   flush whose key already ran is queued again rather than merged.
//!
//! # Invariants
//!
//! - A queued execution runs at most once.
//! - Every firing before the queue closes is observed by some execution.
//! - The queue lock is never held while a handler runs.
//!
//! [`NotificationFrequency::FirstEvent`]: crate::NotificationFrequency::FirstEvent
//! [`NotificationFrequency::OnCommit`]: crate::NotificationFrequency::OnCommit

use quire_primitives::{Value, ValueTuple};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::behaviour::BehaviourId;
use crate::dispatch::Invoker;
use crate::error::PolicyError;
use crate::policy::ArgRole;
use crate::uow::UnitOfWork;

/// Deduplication key: behaviour identity plus ordered key-argument values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InvocationKey {
	behaviour: BehaviourId,
	keys: ValueTuple,
}

impl InvocationKey {
	fn new(invoker: &Invoker, args: &[Value]) -> Self {
		Self {
			behaviour: invoker.behaviour().id(),
			keys: invoker
				.policy()
				.positions(ArgRole::Key)
				.map(|i| args.get(i).cloned().unwrap_or_default())
				.collect(),
		}
	}
}

struct PendingExecution {
	invoker: Invoker,
	args: Vec<Value>,
}

/// Per-unit-of-work queue state, created on first use.
#[derive(Default)]
pub(crate) struct DeferredQueue {
	executions: Vec<PendingExecution>,
	index: FxHashMap<InvocationKey, usize>,
	/// Index of the next execution to run.
	cursor: usize,
	committed: bool,
	first_events: FxHashMap<InvocationKey, Value>,
}

impl DeferredQueue {
	pub(crate) fn pending(&self) -> usize {
		self.executions.len() - self.cursor
	}
}

/// Runs the first firing per key and replays its result afterwards.
pub(crate) fn first_event(
	uow: &UnitOfWork,
	invoker: &Invoker,
	args: &[Value],
) -> Result<Value, PolicyError> {
	let key = InvocationKey::new(invoker, args);
	let cached = uow
		.deferred
		.lock()
		.as_ref()
		.and_then(|queue| queue.first_events.get(&key).cloned());
	if let Some(value) = cached {
		trace!(
			policy = %invoker.policy().name(),
			behaviour = invoker.behaviour().name(),
			"deferred.first_event.replay"
		);
		return Ok(value);
	}

	let value = invoker.execute(uow, args)?;
	uow.deferred
		.lock()
		.get_or_insert_with(DeferredQueue::default)
		.first_events
		.entry(key)
		.or_insert_with(|| value.clone());
	Ok(value)
}

/// Queues a commit-time execution, or merges into the queued one.
///
/// Returns `Null` when queued. Once the queue has been flushed the execution
/// runs immediately and its result is returned.
pub(crate) fn on_commit(
	uow: &UnitOfWork,
	invoker: &Invoker,
	args: &[Value],
) -> Result<Value, PolicyError> {
	let key = InvocationKey::new(invoker, args);
	{
		let mut guard = uow.deferred.lock();
		let queue = guard.get_or_insert_with(DeferredQueue::default);
		if !queue.committed {
			match queue.index.get(&key) {
				Some(&pos) if pos < queue.cursor => {
					// Already ran in this flush; the new values need their own run.
					queue.index.insert(key, queue.executions.len());
					queue.executions.push(PendingExecution {
						invoker: invoker.clone(),
						args: args.to_vec(),
					});
					trace!(
						policy = %invoker.policy().name(),
						behaviour = invoker.behaviour().name(),
						pending = queue.pending(),
						"deferred.requeue"
					);
				}
				Some(&pos) => {
					let pending = &mut queue.executions[pos];
					for i in invoker.policy().positions(ArgRole::EndValue) {
						if let (Some(slot), Some(value)) = (pending.args.get_mut(i), args.get(i)) {
							*slot = value.clone();
						}
					}
					trace!(
						policy = %invoker.policy().name(),
						behaviour = invoker.behaviour().name(),
						"deferred.merge"
					);
				}
				None => {
					queue.index.insert(key, queue.executions.len());
					queue.executions.push(PendingExecution {
						invoker: invoker.clone(),
						args: args.to_vec(),
					});
					trace!(
						policy = %invoker.policy().name(),
						behaviour = invoker.behaviour().name(),
						pending = queue.pending(),
						"deferred.enqueue"
					);
				}
			}
			return Ok(Value::Null);
		}
	}
	invoker.execute(uow, args)
}

/// Drains the commit-time queue of `uow` and closes it.
pub(crate) fn flush(uow: &UnitOfWork) -> Result<(), PolicyError> {
	let mut executed = 0usize;
	loop {
		let (invoker, args) = {
			let mut guard = uow.deferred.lock();
			let queue = guard.get_or_insert_with(DeferredQueue::default);
			let Some(next) = queue.executions.get(queue.cursor) else {
				queue.committed = true;
				break;
			};
			let next = (next.invoker.clone(), next.args.clone());
			queue.cursor += 1;
			next
		};

		trace!(
			policy = %invoker.policy().name(),
			behaviour = invoker.behaviour().name(),
			"deferred.execute"
		);
		invoker
			.execute(uow, &args)
			.map_err(|source| PolicyError::Deferred {
				unit_of_work: uow.id(),
				policy: invoker.policy().name().clone(),
				behaviour: invoker.behaviour().name().to_string(),
				source: Box::new(source),
			})?;
		executed += 1;
	}
	debug!(uow = %uow.id(), executed, "deferred.flush");
	Ok(())
}
