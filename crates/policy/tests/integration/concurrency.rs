//! Registration, binding and dispatch from many threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use quire_policy::{Behaviour, NotificationFrequency, Operation, PolicyShape, UnitOfWork};
use quire_primitives::Value;

use crate::common::{component, node, t};

const THREADS: usize = 8;

fn touch_shape() -> PolicyShape {
	PolicyShape::new(t("onTouch")).operation(Operation::new("onTouch").key("node"))
}

#[test]
fn racing_registrations_share_one_definition() {
	let component = Arc::new(component());
	let barrier = Arc::new(Barrier::new(THREADS));
	let handles: Vec<_> = (0..THREADS)
		.map(|_| {
			let component = Arc::clone(&component);
			let barrier = Arc::clone(&barrier);
			thread::spawn(move || {
				barrier.wait();
				let delegate = component.register_class_policy(&touch_shape()).unwrap();
				Arc::clone(delegate.policy())
			})
		})
		.collect();

	let policies: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
	assert!(policies.iter().all(|p| Arc::ptr_eq(p, &policies[0])));
	assert_eq!(component.registered_policies().len(), 1);
}

#[test]
fn binds_during_dispatch_are_seen_by_later_lookups() {
	let component = Arc::new(component());
	let delegate = component.register_class_policy(&touch_shape()).unwrap();
	let calls = Arc::new(AtomicUsize::new(0));
	let barrier = Arc::new(Barrier::new(THREADS + 1));

	let dispatchers: Vec<_> = (0..THREADS)
		.map(|i| {
			let delegate = delegate.clone();
			let barrier = Arc::clone(&barrier);
			thread::spawn(move || {
				barrier.wait();
				let uow = UnitOfWork::begin();
				for _ in 0..200 {
					let args = [Value::from(node(&format!("n{i}")))];
					delegate.invoke(&uow, &t("c_type"), &args).unwrap();
				}
				uow.commit().unwrap();
			})
		})
		.collect();

	barrier.wait();
	for level in ["base", "a_type", "b_type"] {
		let calls = Arc::clone(&calls);
		let behaviour = Behaviour::new(level, move |_| {
			calls.fetch_add(1, Ordering::Relaxed);
			Ok(Value::Null)
		});
		component
			.bind_class_behaviour(&t("onTouch"), &t(level), behaviour)
			.unwrap();
	}
	for handle in dispatchers {
		handle.join().unwrap();
	}

	// Once every bind returned, the nearest binding for c_type is b_type.
	let uow = UnitOfWork::begin();
	let handler = delegate.get(&uow, &t("c_type")).unwrap();
	let names: Vec<_> = handler.behaviours().map(Behaviour::name).collect();
	assert_eq!(names, ["b_type"]);
}

#[test]
fn first_event_memo_is_per_unit_of_work() {
	let component = Arc::new(component());
	let delegate = component.register_class_policy(&touch_shape()).unwrap();
	let calls = Arc::new(AtomicUsize::new(0));
	let behaviour = {
		let calls = Arc::clone(&calls);
		Behaviour::builder("once")
			.frequency(NotificationFrequency::FirstEvent)
			.build(move |_| {
				calls.fetch_add(1, Ordering::SeqCst);
				Ok(Value::from(true))
			})
	};
	component
		.bind_class_behaviour(&t("onTouch"), &t("base"), behaviour)
		.unwrap();

	let handles: Vec<_> = (0..THREADS)
		.map(|_| {
			let delegate = delegate.clone();
			thread::spawn(move || {
				let uow = UnitOfWork::begin();
				let args = [Value::from(node("shared"))];
				for _ in 0..10 {
					delegate.invoke(&uow, &t("document"), &args).unwrap();
				}
				uow.commit().unwrap();
			})
		})
		.collect();
	for handle in handles {
		handle.join().unwrap();
	}
	assert_eq!(calls.load(Ordering::SeqCst), THREADS);
}

#[test]
fn commit_queues_are_isolated() {
	let component = Arc::new(component());
	let delegate = component.register_class_policy(&touch_shape()).unwrap();
	let calls = Arc::new(AtomicUsize::new(0));
	let behaviour = {
		let calls = Arc::clone(&calls);
		Behaviour::builder("late")
			.frequency(NotificationFrequency::OnCommit)
			.build(move |_| {
				calls.fetch_add(1, Ordering::SeqCst);
				Ok(Value::Null)
			})
	};
	component
		.bind_class_behaviour(&t("onTouch"), &t("base"), behaviour)
		.unwrap();

	let handles: Vec<_> = (0..THREADS)
		.map(|i| {
			let delegate = delegate.clone();
			thread::spawn(move || {
				let uow = UnitOfWork::begin();
				let args = [Value::from(node("shared"))];
				delegate.invoke(&uow, &t("folder"), &args).unwrap();
				if i % 2 == 0 {
					uow.commit().unwrap();
				} else {
					uow.rollback();
				}
			})
		})
		.collect();
	for handle in handles {
		handle.join().unwrap();
	}
	assert_eq!(calls.load(Ordering::SeqCst), THREADS / 2);
}
