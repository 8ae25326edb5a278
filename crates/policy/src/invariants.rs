#![allow(dead_code)]

use std::sync::{Arc, Barrier};
use std::thread;

use quire_primitives::Value;

use crate::policy::PolicyRegistry;
use crate::test_fixtures::{Log, component, failing, model, node, q, recording, shape};
use crate::{
	Binding, FilterScope, NotificationFrequency, Operation, PolicyDefinition, PolicyError,
	PolicyKind, PolicyShape, UnitOfWork,
};

/// Invariant: Generalisation terminates.
///
/// Every binding reaches `None` within the depth of its class, passing
/// through the class-wide wildcard before climbing.
pub(crate) fn inv_generalisation_terminates() {
	let model = model();
	let start = Binding::feature(q("c"), Some(q("title")));
	let mut steps = 0;
	let mut current = Some(start);
	while let Some(binding) = current {
		current = binding.generalise(&*model);
		steps += 1;
		assert!(steps < 16, "generalisation did not terminate");
	}
	// c.title, c.*, b.*, a.*, base.*
	assert_eq!(steps, 5);
}

#[cfg_attr(test, test)]
pub(crate) fn test_generalisation_terminates() {
	inv_generalisation_terminates();
}

/// Invariant: Cached handlers survive unrelated binds.
///
/// A cache hit returns the same handler until a bind at the looked-up class
/// or one of its ancestors evicts it. Binds elsewhere leave it warm.
pub(crate) fn inv_cache_identity_and_scoped_eviction() {
	let component = component();
	let delegate = component.register_class_policy(&shape("onTouch", 1)).unwrap();
	let log = Log::default();
	component
		.bind_class_behaviour(
			&q("onTouch"),
			&q("a"),
			recording("a", NotificationFrequency::EveryEvent, &log),
		)
		.unwrap();

	let uow = UnitOfWork::begin();
	let for_c = delegate.get(&uow, &q("c")).unwrap();
	assert!(Arc::ptr_eq(&for_c, &delegate.get(&uow, &q("c")).unwrap()));

	let for_document = delegate.get(&uow, &q("document")).unwrap();
	component
		.bind_class_behaviour(
			&q("onTouch"),
			&q("b"),
			recording("b", NotificationFrequency::EveryEvent, &log),
		)
		.unwrap();

	assert!(Arc::ptr_eq(&for_document, &delegate.get(&uow, &q("document")).unwrap()));
	let refreshed = delegate.get(&uow, &q("c")).unwrap();
	assert!(!Arc::ptr_eq(&for_c, &refreshed));
	assert_eq!(refreshed.to_string(), format!("{}[b]", q("onTouch")));
}

#[cfg_attr(test, test)]
pub(crate) fn test_cache_identity_and_scoped_eviction() {
	inv_cache_identity_and_scoped_eviction();
}

/// Invariant: A global disable turns every filter check off.
pub(crate) fn inv_global_disable_covers_all_checks() {
	let component = component();
	let filter = component.filter();
	let n1 = node("n1");
	let uow = UnitOfWork::begin();

	filter.disable(&uow, FilterScope::Global);
	assert!(!filter.is_enabled(&uow));
	assert!(!filter.is_class_enabled(&uow, &q("a")));
	assert!(!filter.is_instance_enabled(&uow, &n1));
	assert!(!filter.is_instance_class_enabled(&uow, &n1, &q("a")));

	filter.enable(&uow, FilterScope::Global);
	assert!(filter.is_enabled(&uow));
	assert!(filter.is_class_enabled(&uow, &q("a")));
	assert!(filter.is_instance_enabled(&uow, &n1));
	assert!(filter.is_instance_class_enabled(&uow, &n1, &q("a")));
}

#[cfg_attr(test, test)]
pub(crate) fn test_global_disable_covers_all_checks() {
	inv_global_disable_covers_all_checks();
}

/// Invariant: A first-event behaviour runs once per key per unit of work.
pub(crate) fn inv_first_event_runs_once_per_key() {
	let component = component();
	let op = Operation::new("onRead").key("node").param("reason");
	let delegate = component
		.register_class_policy(&PolicyShape::new(q("onRead")).operation(op))
		.unwrap();
	let log = Log::default();
	component
		.bind_class_behaviour(
			&q("onRead"),
			&q("a"),
			recording("once", NotificationFrequency::FirstEvent, &log),
		)
		.unwrap();

	let uow = UnitOfWork::begin();
	for reason in ["x", "y", "z"] {
		let out = delegate
			.invoke(&uow, &q("a"), &[Value::from("n1"), Value::from(reason)])
			.unwrap();
		assert_eq!(out, Value::from("once"));
	}
	delegate
		.invoke(&uow, &q("a"), &[Value::from("n2"), Value::from("x")])
		.unwrap();
	assert_eq!(log.take(), vec!["once(\"n1\",\"x\")", "once(\"n2\",\"x\")"]);
	uow.rollback();

	let next = UnitOfWork::begin();
	delegate
		.invoke(&next, &q("a"), &[Value::from("n1"), Value::from("x")])
		.unwrap();
	assert_eq!(log.len(), 1);
}

#[cfg_attr(test, test)]
pub(crate) fn test_first_event_runs_once_per_key() {
	inv_first_event_runs_once_per_key();
}

/// Invariant: An on-commit behaviour sees the last end value for its key.
pub(crate) fn inv_on_commit_sees_final_end_value() {
	let component = component();
	let op = Operation::new("onChange")
		.key("node")
		.start_value("before")
		.end_value("after");
	let delegate = component
		.register_class_policy(&PolicyShape::new(q("onChange")).operation(op))
		.unwrap();
	let log = Log::default();
	component
		.bind_class_behaviour(
			&q("onChange"),
			&q("a"),
			recording("commit", NotificationFrequency::OnCommit, &log),
		)
		.unwrap();

	let uow = UnitOfWork::begin();
	for (before, after) in [("v0", "v1"), ("v1", "v2"), ("v2", "v3")] {
		let args = [Value::from("n1"), Value::from(before), Value::from(after)];
		let out = delegate.invoke(&uow, &q("a"), &args).unwrap();
		assert_eq!(out, Value::Null);
	}
	assert_eq!(uow.pending_executions(), 1);
	assert_eq!(log.len(), 0);

	uow.commit().unwrap();
	assert_eq!(log.take(), vec!["commit(\"n1\",\"v0\",\"v3\")"]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_on_commit_sees_final_end_value() {
	inv_on_commit_sees_final_end_value();
}

/// Invariant: The first failing behaviour stops a multi-behaviour dispatch.
pub(crate) fn inv_many_dispatch_stops_on_error() {
	let component = component();
	let delegate = component.register_class_policy(&shape("onSave", 0)).unwrap();
	let log = Log::default();
	for behaviour in [
		recording("first", NotificationFrequency::EveryEvent, &log),
		failing("second", &log),
		recording("third", NotificationFrequency::EveryEvent, &log),
	] {
		component
			.bind_class_behaviour(&q("onSave"), &q("a"), behaviour)
			.unwrap();
	}

	let uow = UnitOfWork::begin();
	let err = delegate.invoke(&uow, &q("a"), &[]).unwrap_err();
	assert!(matches!(err, PolicyError::Behaviour(_)));
	assert_eq!(log.take(), vec!["first()", "second"]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_many_dispatch_stops_on_error() {
	inv_many_dispatch_stops_on_error();
}

/// Invariant: Rollback discards queued commit-time executions unrun.
pub(crate) fn inv_rollback_discards_queue() {
	let component = component();
	let delegate = component.register_class_policy(&shape("onDelete", 1)).unwrap();
	let log = Log::default();
	component
		.bind_class_behaviour(
			&q("onDelete"),
			&q("a"),
			recording("late", NotificationFrequency::OnCommit, &log),
		)
		.unwrap();

	let uow = UnitOfWork::begin();
	delegate.invoke(&uow, &q("b"), &[Value::from("n1")]).unwrap();
	assert_eq!(uow.pending_executions(), 1);
	uow.rollback();
	assert_eq!(log.len(), 0);

	{
		let dropped = UnitOfWork::begin();
		delegate.invoke(&dropped, &q("b"), &[Value::from("n2")]).unwrap();
	}
	assert_eq!(log.len(), 0);
}

#[cfg_attr(test, test)]
pub(crate) fn test_rollback_discards_queue() {
	inv_rollback_discards_queue();
}

/// Invariant: Concurrent registration of one policy publishes one definition.
///
/// Every racer receives the same `Arc`; the registry holds exactly one entry.
pub(crate) fn inv_concurrent_registration() {
	const THREADS: usize = 8;
	let registry = Arc::new(PolicyRegistry::new());
	let barrier = Arc::new(Barrier::new(THREADS));
	let handles: Vec<_> = (0..THREADS)
		.map(|_| {
			let registry = Arc::clone(&registry);
			let barrier = Arc::clone(&barrier);
			thread::spawn(move || {
				let def =
					PolicyDefinition::from_shape(PolicyKind::Class, &shape("onRace", 2)).unwrap();
				barrier.wait();
				registry.insert(def).unwrap()
			})
		})
		.collect();

	let published: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
	assert_eq!(registry.len(), 1);
	assert!(published.iter().all(|def| Arc::ptr_eq(def, &published[0])));
}

#[cfg_attr(test, test)]
pub(crate) fn test_concurrent_registration() {
	inv_concurrent_registration();
}
