//! Cross-unit-of-work handler cache.
//!
//! # Role
//!
//! Keeps one aggregate handler per binding so repeated firings skip the
//! index walk. The cache is shared by every unit of work, so a unit of work
//! with any active filter bypasses it: its lookups depend on state no other
//! unit of work shares.
//!
//! # Invariants
//!
//! - A hit returns the same `Arc` until the entry is evicted.
//! - A change to binding `B` evicts every key equal to `B` or generalising to `B`.
//! - A service-level change clears the cache.
//! - Handlers are built under the write lock, so an index change that races
//!   a build is always followed by its eviction.

use std::sync::Arc;

use parking_lot::RwLock;
use quire_primitives::QName;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::factory::{HandlerList, PolicyFactory, PolicyHandlerFactory};
use super::PolicyHandler;
use crate::binding::Binding;
use crate::filter::BehaviourFilter;
use crate::index::{BehaviourChangeObserver, BehaviourIndex};
use crate::policy::PolicyDefinition;
use crate::uow::UnitOfWork;

#[derive(Default)]
struct Entries {
	singles: FxHashMap<Binding, Arc<PolicyHandler>>,
	lists: FxHashMap<Binding, HandlerList>,
}

/// Cached handlers of one policy, invalidated by index changes.
pub struct HandlerCache {
	policy: QName,
	filter: Arc<BehaviourFilter>,
	max_depth: usize,
	entries: RwLock<Entries>,
}

impl HandlerCache {
	fn new(index: &BehaviourIndex) -> Self {
		Self {
			policy: index.policy().clone(),
			filter: Arc::clone(index.filter()),
			max_depth: index.max_depth(),
			entries: RwLock::new(Entries::default()),
		}
	}

	/// Number of cached aggregate and list entries.
	pub fn len(&self) -> usize {
		let entries = self.entries.read();
		entries.singles.len() + entries.lists.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// True if `key` is `changed` or generalises to it.
	fn derives_from(&self, key: &Binding, changed: &Binding) -> bool {
		key.lineage(self.filter.hierarchy(), self.max_depth)
			.any(|b| &b == changed)
	}
}

impl BehaviourChangeObserver for HandlerCache {
	fn behaviour_changed(&self, binding: Option<&Binding>) {
		let mut entries = self.entries.write();
		let before = entries.singles.len() + entries.lists.len();
		match binding {
			None => {
				entries.singles.clear();
				entries.lists.clear();
			}
			Some(changed) => {
				entries.singles.retain(|key, _| !self.derives_from(key, changed));
				entries.lists.retain(|key, _| !self.derives_from(key, changed));
			}
		}
		let evicted = before - (entries.singles.len() + entries.lists.len());
		debug!(
			policy = %self.policy,
			binding = ?binding.map(ToString::to_string),
			evicted,
			"cache.evict"
		);
	}
}

/// Handler factory that reuses handlers across units of work.
pub struct CachedPolicyFactory {
	inner: PolicyFactory,
	cache: Arc<HandlerCache>,
}

impl CachedPolicyFactory {
	/// Creates the factory and subscribes its cache to `index`.
	pub fn new(policy: Arc<PolicyDefinition>, index: Arc<BehaviourIndex>) -> Self {
		let cache = Arc::new(HandlerCache::new(&index));
		index.add_observer(cache.clone());
		Self {
			inner: PolicyFactory::new(policy, index),
			cache,
		}
	}

	pub fn cache(&self) -> &Arc<HandlerCache> {
		&self.cache
	}

	fn bypass(&self, uow: &UnitOfWork) -> bool {
		self.inner.index().filter().is_activated(uow)
	}
}

impl PolicyHandlerFactory for CachedPolicyFactory {
	fn policy(&self) -> &Arc<PolicyDefinition> {
		self.inner.policy()
	}

	fn create(&self, uow: &UnitOfWork, binding: &Binding) -> Arc<PolicyHandler> {
		if self.bypass(uow) {
			return self.inner.create(uow, binding);
		}
		if let Some(hit) = self.cache.entries.read().singles.get(binding) {
			return Arc::clone(hit);
		}

		// Re-check under the write lock; another thread may have built it.
		let mut entries = self.cache.entries.write();
		let handler = entries
			.singles
			.entry(binding.clone())
			.or_insert_with(|| self.inner.create(uow, binding));
		Arc::clone(handler)
	}

	fn create_list(&self, uow: &UnitOfWork, binding: &Binding) -> HandlerList {
		if self.bypass(uow) {
			return self.inner.create_list(uow, binding);
		}
		if let Some(hit) = self.cache.entries.read().lists.get(binding) {
			return Arc::clone(hit);
		}

		let mut entries = self.cache.entries.write();
		let list = entries
			.lists
			.entry(binding.clone())
			.or_insert_with(|| self.inner.create_list(uow, binding));
		Arc::clone(list)
	}
}
