//! Registered policy definitions with atomic publication.
//!
//! # Role
//!
//! Readers load the current snapshot without locking. Writers copy the
//! snapshot, insert, and publish with compare-and-swap, retrying on contention.
//!
//! # Invariants
//!
//! - A (kind, name) pair maps to at most one definition for the registry's lifetime.
//! - Concurrent registrations are linearizable (see `invariants::test_concurrent_registration`).

use std::sync::Arc;

use arc_swap::ArcSwap;
use quire_primitives::QName;
use rustc_hash::FxHashMap;

use super::{PolicyDefinition, PolicyKind};
use crate::error::DefinitionError;

type Table = FxHashMap<(PolicyKind, QName), Arc<PolicyDefinition>>;

/// Lock-free map of registered policies.
pub struct PolicyRegistry {
	snap: ArcSwap<Table>,
}

impl Default for PolicyRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl PolicyRegistry {
	pub fn new() -> Self {
		Self {
			snap: ArcSwap::from_pointee(Table::default()),
		}
	}

	#[inline]
	pub fn get(&self, kind: PolicyKind, name: &QName) -> Option<Arc<PolicyDefinition>> {
		self.snap.load().get(&(kind, name.clone())).cloned()
	}

	/// Publishes `def`.
	///
	/// Inserting a definition equal to the registered one returns the existing
	/// `Arc`; a different definition under the same key is a conflict.
	pub fn insert(&self, def: PolicyDefinition) -> Result<Arc<PolicyDefinition>, DefinitionError> {
		let key = (def.kind(), def.name().clone());
		let def = Arc::new(def);
		loop {
			let old = self.snap.load_full();
			if let Some(existing) = old.get(&key) {
				return if **existing == *def {
					Ok(Arc::clone(existing))
				} else {
					Err(DefinitionError::Conflict {
						policy: key.1,
						kind: key.0,
					})
				};
			}

			let mut table = (*old).clone();
			table.insert(key.clone(), Arc::clone(&def));
			let prev = self.snap.compare_and_swap(&old, Arc::new(table));
			if Arc::ptr_eq(&prev, &old) {
				return Ok(def);
			}
		}
	}

	/// Returns every registered definition, ordered by kind then name.
	pub fn all(&self) -> Vec<Arc<PolicyDefinition>> {
		let snap = self.snap.load();
		let mut defs: Vec<_> = snap.values().cloned().collect();
		defs.sort_by(|a, b| (a.kind(), a.name()).cmp(&(b.kind(), b.name())));
		defs
	}

	pub fn len(&self) -> usize {
		self.snap.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
