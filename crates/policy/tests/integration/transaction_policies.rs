//! First-event and commit-time behaviours across units of work.

use pretty_assertions::assert_eq;
use quire_policy::{
	ArgRole, Behaviour, ClassPolicyDelegate, NotificationFrequency, Operation, PolicyComponent,
	PolicyKind, PolicyShape, UnitOfWork,
};
use quire_primitives::Value;

use crate::common::{Results, component, t};

/// `(key1, key2, start, end, side_effect)`; the trailing flag is an untagged value.
fn transaction_shape(name: &str) -> PolicyShape {
	PolicyShape::new(t(name)).operation(
		Operation::new(name)
			.key("key1")
			.key("key2")
			.start_value("start")
			.end_value("end")
			.param("side_effect"),
	)
}

fn side_effect_shape() -> PolicyShape {
	PolicyShape::new(t("sideEffect")).operation(
		Operation::new("sideEffect")
			.key("key1")
			.key("key2")
			.start_value("start")
			.end_value("end"),
	)
}

fn args(k1: &str, k2: &str, start: &str, end: &str, side_effect: bool) -> Vec<Value> {
	vec![
		Value::from(k1),
		Value::from(k2),
		Value::from(start),
		Value::from(end),
		Value::from(side_effect),
	]
}

fn result(behaviour: &str, k1: &str, k2: &str, start: &str, end: &str) -> String {
	format!("{behaviour}:{k1}:{k2}:{start}:{end}")
}

/// Records `name` with the first four arguments and, when the trailing flag
/// is set, fires the side-effect policy with them.
fn recorder(
	name: &'static str,
	frequency: NotificationFrequency,
	results: &Results,
	side_effect: Option<ClassPolicyDelegate>,
) -> Behaviour {
	let results = results.clone();
	Behaviour::builder(name)
		.frequency(frequency)
		.build(move |inv| {
			let text = |i: usize| inv.arg(i).as_str().unwrap_or_default().to_string();
			let entry = result(name, &text(0), &text(1), &text(2), &text(3));
			results.push(entry.clone());
			if let Some(side) = &side_effect
				&& inv.arg(4).as_bool() == Some(true)
			{
				side.invoke(inv.unit_of_work(), &t("base"), &inv.args()[..4])?;
			}
			Ok(Value::from(entry))
		})
}

/// Registers `sideEffect` with a commit-time behaviour on `base`.
fn side_effects(component: &PolicyComponent, results: &Results) -> ClassPolicyDelegate {
	let delegate = component.register_class_policy(&side_effect_shape()).unwrap();
	component
		.bind_class_behaviour(
			&t("sideEffect"),
			&t("base"),
			recorder("sideEffectTest", NotificationFrequency::OnCommit, results, None),
		)
		.unwrap();
	delegate
}

#[test]
fn argument_roles_follow_the_declaration() {
	let component = component();
	component.register_class_policy(&transaction_shape("start")).unwrap();
	let definition = component
		.registered_policy(PolicyKind::Class, &t("start"))
		.unwrap();
	assert_eq!(
		definition.roles(),
		[
			ArgRole::Key,
			ArgRole::Key,
			ArgRole::StartValue,
			ArgRole::EndValue,
			ArgRole::StartValue,
		]
	);
}

#[test]
fn start_policy_runs_once_per_key() {
	let component = component();
	let results = Results::default();
	let side = side_effects(&component, &results);
	let start = component.register_class_policy(&transaction_shape("start")).unwrap();
	component
		.bind_class_behaviour(
			&t("start"),
			&t("base"),
			recorder(
				"startTransactionTest",
				NotificationFrequency::FirstEvent,
				&results,
				Some(side),
			),
		)
		.unwrap();

	let result1 = result("startTransactionTest", "1", "2", "value1a", "value2a");
	let result2 = result("startTransactionTest", "2", "1", "value1b", "value2b");

	let uow = UnitOfWork::begin();
	let out = start.invoke(&uow, &t("base"), &args("1", "2", "value1a", "value2a", false));
	assert_eq!(out.unwrap(), Value::from(result1.as_str()));
	let out = start.invoke(&uow, &t("base"), &args("2", "1", "value1b", "value2b", false));
	assert_eq!(out.unwrap(), Value::from(result2.as_str()));
	// Same key: the first result is replayed and nothing is recorded.
	let out = start.invoke(&uow, &t("base"), &args("1", "2", "value1c", "value2c", false));
	assert_eq!(out.unwrap(), Value::from(result1.as_str()));
	assert_eq!(results.len(), 2);
	uow.commit().unwrap();
	assert_eq!(results.snapshot(), [result1.clone(), result2.clone()]);

	// A new unit of work starts over; side effects run at commit.
	let results_before = results.len();
	let uow = UnitOfWork::begin();
	start
		.invoke(&uow, &t("base"), &args("1", "2", "value1a", "value2a", true))
		.unwrap();
	start
		.invoke(&uow, &t("base"), &args("2", "1", "value1b", "value2b", true))
		.unwrap();
	start
		.invoke(&uow, &t("base"), &args("1", "2", "value1c", "value2c", true))
		.unwrap();
	assert_eq!(results.len() - results_before, 2);
	uow.commit().unwrap();

	assert_eq!(
		results.snapshot().split_off(results_before),
		[
			result1,
			result2,
			result("sideEffectTest", "1", "2", "value1a", "value2a"),
			result("sideEffectTest", "2", "1", "value1b", "value2b"),
		]
	);
}

#[test]
fn end_policy_runs_at_commit_with_the_final_end_value() {
	let component = component();
	let results = Results::default();
	let side = side_effects(&component, &results);
	let end = component.register_class_policy(&transaction_shape("end")).unwrap();
	component
		.bind_class_behaviour(
			&t("end"),
			&t("base"),
			recorder("endTransactionTest", NotificationFrequency::OnCommit, &results, Some(side)),
		)
		.unwrap();

	let uow = UnitOfWork::begin();
	for a in [
		args("1", "2", "value1a", "value2a", false),
		args("2", "1", "value1b", "value2b", false),
		args("1", "2", "value1a", "value2c", false),
	] {
		assert_eq!(end.invoke(&uow, &t("base"), &a).unwrap(), Value::Null);
	}
	assert_eq!(results.len(), 0);
	uow.commit().unwrap();
	assert_eq!(
		results.snapshot(),
		[
			result("endTransactionTest", "1", "2", "value1a", "value2c"),
			result("endTransactionTest", "2", "1", "value1b", "value2b"),
		]
	);
}

#[test]
fn side_effects_queued_during_commit_run_in_the_same_commit() {
	let component = component();
	let results = Results::default();
	let side = side_effects(&component, &results);
	let end = component.register_class_policy(&transaction_shape("end")).unwrap();
	component
		.bind_class_behaviour(
			&t("end"),
			&t("base"),
			recorder("endTransactionTest", NotificationFrequency::OnCommit, &results, Some(side)),
		)
		.unwrap();

	let uow = UnitOfWork::begin();
	for a in [
		args("1", "2", "value1a", "value2a", true),
		args("2", "1", "value1b", "value2b", true),
		args("1", "2", "value1a", "value2c", true),
	] {
		end.invoke(&uow, &t("base"), &a).unwrap();
	}
	assert_eq!(uow.pending_executions(), 2);
	uow.commit().unwrap();

	assert_eq!(
		results.snapshot(),
		[
			result("endTransactionTest", "1", "2", "value1a", "value2c"),
			result("endTransactionTest", "2", "1", "value1b", "value2b"),
			result("sideEffectTest", "1", "2", "value1a", "value2c"),
			result("sideEffectTest", "2", "1", "value1b", "value2b"),
		]
	);
}

#[test]
fn rollback_runs_nothing_queued() {
	let component = component();
	let results = Results::default();
	let end = component.register_class_policy(&transaction_shape("end")).unwrap();
	component
		.bind_class_behaviour(
			&t("end"),
			&t("file"),
			recorder("endTransactionTest", NotificationFrequency::OnCommit, &results, None),
		)
		.unwrap();

	let uow = UnitOfWork::begin();
	let out = end.invoke(&uow, &t("document"), &args("1", "2", "a", "b", false));
	assert_eq!(out.unwrap(), Value::Null);
	assert_eq!(uow.pending_executions(), 1);
	uow.rollback();
	assert_eq!(results.len(), 0);
}
