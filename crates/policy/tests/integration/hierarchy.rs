//! Class filters across `a_type <- b_type <- c_type`.
//!
//! Creation fires the policy for the created type and each of its ancestors,
//! so each level's behaviour runs once when nothing is filtered.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use quire_dictionary::ClassHierarchy;
use quire_policy::{
	Behaviour, ClassPolicyDelegate, FilterScope, Operation, PolicyComponent, PolicyShape,
	UnitOfWork,
};
use quire_primitives::{QName, Value};
use rstest::rstest;

use crate::common::{component, node, t};

struct Fixture {
	component: PolicyComponent,
	on_create: ClassPolicyDelegate,
	counts: [Arc<AtomicUsize>; 3],
}

const LEVELS: [&str; 3] = ["a_type", "b_type", "c_type"];

fn fixture() -> Fixture {
	let component = component();
	let shape = PolicyShape::new(t("onCreateNode"))
		.operation(Operation::new("onCreateNode").key("node"));
	let on_create = component.register_class_policy(&shape).unwrap();
	let counts: [Arc<AtomicUsize>; 3] = Default::default();
	for (level, count) in LEVELS.iter().zip(&counts) {
		let count = Arc::clone(count);
		let behaviour = Behaviour::new(*level, move |_| {
			count.fetch_add(1, Ordering::SeqCst);
			Ok(Value::Null)
		});
		component
			.bind_class_behaviour(&t("onCreateNode"), &t(level), behaviour)
			.unwrap();
	}
	Fixture {
		component,
		on_create,
		counts,
	}
}

impl Fixture {
	/// Fires `onCreateNode` for `class` and every ancestor up to the root.
	fn create(&self, uow: &UnitOfWork, class: &QName) {
		let model = self.component.model();
		let mut chain = vec![class.clone()];
		while let Some(parent) = model.parent_of(chain.last().unwrap()) {
			chain.push(parent);
		}
		let args = [Value::from(node("created"))];
		for class in &chain {
			self.on_create.invoke(uow, class, &args).unwrap();
		}
	}

	fn counts(&self) -> [usize; 3] {
		self.counts.each_ref().map(|c| c.load(Ordering::SeqCst))
	}
}

/// Runs a creation in its own unit of work with `filters` disabled around it.
fn create_with_filters(fixture: &Fixture, created: &str, filters: &[FilterScope]) {
	let uow = UnitOfWork::begin();
	let filter = fixture.component.filter();
	for scope in filters {
		filter.disable(&uow, scope.clone());
	}
	fixture.create(&uow, &t(created));
	for scope in filters {
		filter.enable(&uow, scope.clone());
	}
	assert!(!filter.is_activated(&uow));
	uow.commit().unwrap();
}

fn each_level(subclasses: bool) -> Vec<FilterScope> {
	LEVELS
		.iter()
		.map(|level| {
			if subclasses {
				FilterScope::ClassAndSubclasses(t(level))
			} else {
				FilterScope::Class(t(level))
			}
		})
		.collect()
}

#[rstest]
#[case::a("a_type", [1, 0, 0])]
#[case::b("b_type", [1, 1, 0])]
#[case::c("c_type", [1, 1, 1])]
fn enabled_hierarchy_runs_each_level_once(#[case] created: &str, #[case] expected: [usize; 3]) {
	let fixture = fixture();
	create_with_filters(&fixture, created, &[]);
	assert_eq!(fixture.counts(), expected);
}

#[rstest]
#[case::a_exact("a_type", false)]
#[case::b_exact("b_type", false)]
#[case::c_exact("c_type", false)]
#[case::a_down("a_type", true)]
#[case::b_down("b_type", true)]
#[case::c_down("c_type", true)]
fn disabling_every_level_runs_nothing(#[case] created: &str, #[case] subclasses: bool) {
	let fixture = fixture();
	create_with_filters(&fixture, created, &each_level(subclasses));
	assert_eq!(fixture.counts(), [0, 0, 0]);
}

#[rstest]
#[case::exact(FilterScope::Class(t("a_type")), [0, 1, 1])]
#[case::down(FilterScope::ClassAndSubclasses(t("a_type")), [0, 0, 0])]
fn disabling_the_top_level(#[case] scope: FilterScope, #[case] expected: [usize; 3]) {
	let fixture = fixture();
	create_with_filters(&fixture, "c_type", &[scope]);
	assert_eq!(fixture.counts(), expected);
}

#[test]
fn disabling_a_middle_level_only_affects_that_level() {
	let fixture = fixture();
	create_with_filters(&fixture, "c_type", &[FilterScope::Class(t("b_type"))]);
	assert_eq!(fixture.counts(), [1, 0, 1]);
}

#[test]
fn global_disable_suppresses_every_level() {
	let fixture = fixture();
	create_with_filters(&fixture, "c_type", &[FilterScope::Global]);
	assert_eq!(fixture.counts(), [0, 0, 0]);
}

#[test]
fn filters_do_not_leak_between_units_of_work() {
	let fixture = fixture();
	let filtered = UnitOfWork::begin();
	fixture
		.component
		.filter()
		.disable(&filtered, FilterScope::ClassAndSubclasses(t("a_type")));

	let other = UnitOfWork::begin();
	fixture.create(&other, &t("c_type"));
	assert_eq!(fixture.counts(), [1, 1, 1]);

	fixture.create(&filtered, &t("c_type"));
	assert_eq!(fixture.counts(), [1, 1, 1]);
	filtered.rollback();
}

#[test]
fn instance_filter_suppresses_one_node() {
	let fixture = fixture();
	let uow = UnitOfWork::begin();
	let filter = fixture.component.filter();
	let scope = FilterScope::InstanceClass(node("created"), t("a_type"));
	let _suppressed = filter.suppress(&uow, scope);

	assert!(!filter.is_instance_class_enabled(&uow, &node("created"), &t("c_type")));
	assert!(filter.is_instance_class_enabled(&uow, &node("other"), &t("c_type")));
	assert!(filter.is_class_enabled(&uow, &t("c_type")));
}
