//! Per-policy behaviour index.
//!
//! # Role
//!
//! Maps bindings to the ordered definitions bound there. Lookups walk the
//! binding's generalisation chain and stop at the nearest bound key: a
//! subclass binding shadows, rather than supplements, a superclass binding.
//! Service definitions are flat and appended to every lookup.
//!
//! # Invariants
//!
//! - A binding is a key at most once; a definition is listed at most once per key.
//! - Observers run after the index lock is released.

use std::sync::Arc;

use parking_lot::RwLock;
use quire_primitives::QName;
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::behaviour::BehaviourDefinition;
use crate::binding::Binding;
use crate::filter::BehaviourFilter;
use crate::policy::PolicyKind;
use crate::uow::UnitOfWork;

/// Notified after an index mutation.
///
/// `Some(binding)` names the changed class or feature binding; `None` means
/// a service-level change that may affect every lookup.
pub trait BehaviourChangeObserver: Send + Sync {
	fn behaviour_changed(&self, binding: Option<&Binding>);
}

#[derive(Default)]
struct IndexState {
	bound: FxHashMap<Binding, Vec<BehaviourDefinition>>,
	services: Vec<BehaviourDefinition>,
}

/// Bindings of one (kind, policy) pair.
pub struct BehaviourIndex {
	policy: QName,
	kind: PolicyKind,
	filter: Arc<BehaviourFilter>,
	max_depth: usize,
	state: RwLock<IndexState>,
	observers: RwLock<Vec<Arc<dyn BehaviourChangeObserver>>>,
}

impl BehaviourIndex {
	pub fn new(
		policy: QName,
		kind: PolicyKind,
		filter: Arc<BehaviourFilter>,
		max_depth: usize,
	) -> Self {
		Self {
			policy,
			kind,
			filter,
			max_depth,
			state: RwLock::new(IndexState::default()),
			observers: RwLock::new(Vec::new()),
		}
	}

	pub fn policy(&self) -> &QName {
		&self.policy
	}

	pub fn kind(&self) -> PolicyKind {
		self.kind
	}

	pub fn filter(&self) -> &Arc<BehaviourFilter> {
		&self.filter
	}

	pub fn max_depth(&self) -> usize {
		self.max_depth
	}

	pub fn add_observer(&self, observer: Arc<dyn BehaviourChangeObserver>) {
		self.observers.write().push(observer);
	}

	/// Adds `definition` under its binding. Returns false if already present.
	pub fn add(&self, definition: BehaviourDefinition) -> bool {
		let binding = definition.binding().clone();
		let added = {
			let mut state = self.state.write();
			let list = if binding.is_service() {
				&mut state.services
			} else {
				state.bound.entry(binding.clone()).or_default()
			};
			if list.contains(&definition) {
				false
			} else {
				list.push(definition);
				true
			}
		};
		if added {
			self.notify(&binding);
		}
		added
	}

	/// Removes `definition`. Returns false if it was not present.
	pub fn remove(&self, definition: &BehaviourDefinition) -> bool {
		let binding = definition.binding();
		let removed = {
			let mut state = self.state.write();
			if binding.is_service() {
				let before = state.services.len();
				state.services.retain(|d| d != definition);
				state.services.len() != before
			} else if let Some(list) = state.bound.get_mut(binding) {
				let before = list.len();
				list.retain(|d| d != definition);
				let removed = list.len() != before;
				if list.is_empty() {
					state.bound.remove(binding);
				}
				removed
			} else {
				false
			}
		};
		if removed {
			self.notify(binding);
		}
		removed
	}

	/// Definitions that apply to `binding` in `uow`.
	///
	/// When the filter disables the binding's class (or instance and class),
	/// only service definitions are returned.
	pub fn find(&self, uow: &UnitOfWork, binding: &Binding) -> Vec<BehaviourDefinition> {
		let state = self.state.read();
		let mut found = Vec::new();

		if !binding.is_service() && self.binding_enabled(uow, binding) {
			let hierarchy = self.filter.hierarchy();
			let mut lineage = binding.lineage(hierarchy, self.max_depth);
			if let Some(list) = lineage.by_ref().find_map(|b| state.bound.get(&b)) {
				found.extend(list.iter().cloned());
			} else if lineage.truncated() {
				warn!(
					policy = %self.policy,
					%binding,
					max_depth = self.max_depth,
					"index.find.depth_exceeded"
				);
			}
		}

		found.extend(state.services.iter().cloned());
		trace!(policy = %self.policy, %binding, found = found.len(), "index.find");
		found
	}

	/// Every definition, bound keys first (in no particular order), then services.
	pub fn all(&self) -> Vec<BehaviourDefinition> {
		let state = self.state.read();
		state
			.bound
			.values()
			.flatten()
			.chain(state.services.iter())
			.cloned()
			.collect()
	}

	pub fn len(&self) -> usize {
		let state = self.state.read();
		state.bound.values().map(Vec::len).sum::<usize>() + state.services.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn binding_enabled(&self, uow: &UnitOfWork, binding: &Binding) -> bool {
		let Some(class) = binding.class_name() else {
			return true;
		};
		match binding.instance_ref() {
			Some(node) => self.filter.is_instance_class_enabled(uow, node, class),
			None => self.filter.is_class_enabled(uow, class),
		}
	}

	fn notify(&self, binding: &Binding) {
		let changed = (!binding.is_service()).then_some(binding);
		let observers = self.observers.read().clone();
		for observer in observers {
			observer.behaviour_changed(changed);
		}
	}
}
