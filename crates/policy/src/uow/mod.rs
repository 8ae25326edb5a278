//! Unit-of-work context.
//!
//! # Role
//!
//! A [`UnitOfWork`] owns every piece of state the engine scopes to one
//! transaction: behaviour filter counters, behaviour reentrancy depths,
//! first-event results and the commit-time queue. The transaction manager
//! creates it with [`UnitOfWork::begin`], passes it to every dispatch, and
//! ends it with [`UnitOfWork::commit`] or [`UnitOfWork::rollback`].
//!
//! # Invariants
//!
//! - Ending a unit of work consumes it, so no state can leak into a later one.
//! - Dropping an active unit of work rolls it back.
//! - No internal lock is held while a behaviour handler runs.

use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::behaviour::BehaviourId;
use crate::deferred::{self, DeferredQueue};
use crate::error::PolicyError;
use crate::filter::FilterState;

/// Identity of a unit of work, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitOfWorkId(Uuid);

impl fmt::Display for UnitOfWorkId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// Lifecycle position of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
	Active,
	/// Commit-time executions are draining or have drained.
	Committing,
	Committed,
	RolledBack,
}

/// Explicit context for one transaction.
pub struct UnitOfWork {
	id: UnitOfWorkId,
	status: Mutex<Status>,
	pub(crate) filter: Mutex<FilterState>,
	reentrancy: Mutex<FxHashMap<BehaviourId, u32>>,
	pub(crate) deferred: Mutex<Option<DeferredQueue>>,
}

impl UnitOfWork {
	pub fn begin() -> Self {
		let uow = Self {
			id: UnitOfWorkId(Uuid::new_v4()),
			status: Mutex::new(Status::Active),
			filter: Mutex::new(FilterState::default()),
			reentrancy: Mutex::new(FxHashMap::default()),
			deferred: Mutex::new(None),
		};
		debug!(uow = %uow.id, "uow.begin");
		uow
	}

	pub fn id(&self) -> UnitOfWorkId {
		self.id
	}

	pub fn status(&self) -> Status {
		*self.status.lock()
	}

	/// Number of commit-time executions queued and not yet run.
	pub fn pending_executions(&self) -> usize {
		self.deferred.lock().as_ref().map_or(0, DeferredQueue::pending)
	}

	/// Runs every queued commit-time execution, in enqueue order.
	///
	/// Executions queued while draining run in the same pass. Afterwards the
	/// queue is closed and later commit-time firings run immediately. Calling
	/// this again is a no-op.
	pub fn before_commit(&self) -> Result<(), PolicyError> {
		{
			let mut status = self.status.lock();
			if *status == Status::Active {
				*status = Status::Committing;
			}
		}
		deferred::flush(self)
	}

	/// Marks the unit of work committed and releases its state.
	///
	/// Executions still queued because [`Self::before_commit`] never ran are
	/// discarded and reported with a `uow.commit.discarded` warning.
	pub fn after_commit(self) {
		self.finish(Status::Committed);
	}

	/// Runs [`Self::before_commit`] then [`Self::after_commit`].
	///
	/// A commit-time failure rolls the unit of work back and is returned.
	pub fn commit(self) -> Result<(), PolicyError> {
		match self.before_commit() {
			Ok(()) => {
				self.after_commit();
				Ok(())
			}
			Err(err) => {
				self.rollback();
				Err(err)
			}
		}
	}

	/// Discards queued executions without running them, then all other state.
	pub fn rollback(self) {
		self.finish(Status::RolledBack);
	}

	fn finish(&self, status: Status) {
		let discarded = self
			.deferred
			.lock()
			.take()
			.map_or(0, |queue| queue.pending());
		self.filter.lock().clear();
		self.reentrancy.lock().clear();
		*self.status.lock() = status;
		match status {
			Status::RolledBack => debug!(uow = %self.id, discarded, "uow.rollback"),
			_ if discarded > 0 => warn!(uow = %self.id, discarded, "uow.commit.discarded"),
			_ => debug!(uow = %self.id, "uow.commit"),
		}
	}

	pub(crate) fn push_disabled(&self, id: BehaviourId) {
		*self.reentrancy.lock().entry(id).or_insert(0) += 1;
	}

	/// Returns false if `id` had no disable marker.
	pub(crate) fn pop_disabled(&self, id: BehaviourId) -> bool {
		let mut depths = self.reentrancy.lock();
		let Some(depth) = depths.get_mut(&id) else {
			return false;
		};
		*depth -= 1;
		if *depth == 0 {
			depths.remove(&id);
		}
		true
	}

	pub(crate) fn is_disabled(&self, id: BehaviourId) -> bool {
		self.reentrancy.lock().contains_key(&id)
	}
}

impl Drop for UnitOfWork {
	fn drop(&mut self) {
		if matches!(self.status(), Status::Active | Status::Committing) {
			self.finish(Status::RolledBack);
		}
	}
}

impl fmt::Debug for UnitOfWork {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UnitOfWork")
			.field("id", &self.id)
			.field("status", &self.status())
			.field("pending", &self.pending_executions())
			.finish()
	}
}
