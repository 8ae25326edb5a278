//! `beforeSave` on separate `document` and `folder` branches.

use pretty_assertions::assert_eq;
use quire_policy::{
	Behaviour, FilterScope, NotificationFrequency, Operation, PolicyComponent, PolicyConfig,
	PolicyShape, PropertyPolicyDelegate, UnitOfWork,
};
use quire_primitives::Value;

use crate::common::{Results, component, model, node, t};

fn before_save_shape() -> PolicyShape {
	PolicyShape::new(t("beforeSave")).operation(
		Operation::new("beforeSave")
			.key("node")
			.start_value("old_name")
			.end_value("new_name"),
	)
}

fn named(name: &'static str) -> Behaviour {
	Behaviour::builder(name)
		.signature("beforeSave", 3)
		.build(move |inv| Ok(Value::from(format!("{name}:{}", inv.arg(2)))))
}

fn save_args(id: &str) -> [Value; 3] {
	[Value::from(node(id)), Value::from("old"), Value::from("new")]
}

#[test]
fn dispatch_follows_the_filter() {
	let component = component();
	let before_save = component.register_class_policy(&before_save_shape()).unwrap();
	component
		.bind_class_behaviour(&t("beforeSave"), &t("document"), named("H1"))
		.unwrap();
	component
		.bind_class_behaviour(&t("beforeSave"), &t("folder"), named("H2"))
		.unwrap();

	let uow = UnitOfWork::begin();
	let document = t("document");
	let args = save_args("doc-1");

	let handler = before_save.get(&uow, &document).unwrap();
	assert_eq!(handler.to_string(), format!("{}[H1]", t("beforeSave")));
	assert_eq!(before_save.invoke(&uow, &document, &args).unwrap(), Value::from("H1:\"new\""));

	component.filter().disable(&uow, FilterScope::Class(document.clone()));
	assert_eq!(before_save.invoke(&uow, &document, &args).unwrap(), Value::Null);
	assert_eq!(
		before_save.invoke(&uow, &t("folder"), &args).unwrap(),
		Value::from("H2:\"new\"")
	);

	component.filter().enable(&uow, FilterScope::Class(document.clone()));
	assert_eq!(before_save.invoke(&uow, &document, &args).unwrap(), Value::from("H1:\"new\""));
	uow.commit().unwrap();
}

#[test]
fn subclasses_inherit_the_nearest_binding() {
	let component = component();
	let before_save = component.register_class_policy(&before_save_shape()).unwrap();
	component
		.bind_class_behaviour(&t("beforeSave"), &t("file"), named("on_file"))
		.unwrap();
	component
		.bind_class_behaviour(&t("beforeSave"), &t("base"), named("on_base"))
		.unwrap();

	let uow = UnitOfWork::begin();
	let args = save_args("doc-1");
	assert_eq!(
		before_save.invoke(&uow, &t("document"), &args).unwrap(),
		Value::from("on_file:\"new\"")
	);
	assert_eq!(
		before_save.invoke(&uow, &t("folder"), &args).unwrap(),
		Value::from("on_base:\"new\"")
	);
}

#[test]
fn aspects_combine_with_the_node_type() {
	let component = component();
	let before_save = component.register_class_policy(&before_save_shape()).unwrap();
	let results = Results::default();
	for (class, name) in [("document", "typed"), ("versionable", "versioned")] {
		let results = results.clone();
		let behaviour = Behaviour::new(name, move |_| {
			results.push(name);
			Ok(Value::Null)
		});
		component
			.bind_class_behaviour(&t("beforeSave"), &t(class), behaviour)
			.unwrap();
	}

	let uow = UnitOfWork::begin();
	let handler = before_save
		.get_for_classes(&uow, [&t("document"), &t("versionable")])
		.unwrap();
	handler.invoke(&uow, &save_args("doc-1")).unwrap();
	assert_eq!(results.snapshot(), ["typed", "versioned"]);
}

#[test]
fn property_policies_resolve_named_then_wildcard_bindings() {
	let component = component();
	let shape = PolicyShape::new(t("onUpdateProperty")).operation(
		Operation::new("onUpdateProperty")
			.key("node")
			.start_value("before")
			.end_value("after"),
	);
	let on_update: PropertyPolicyDelegate = component.register_property_policy(&shape).unwrap();
	let results = Results::default();
	let bind = |class: &str, property: Option<&str>, label: &'static str| {
		let results = results.clone();
		let behaviour = Behaviour::new(label, move |_| {
			results.push(label);
			Ok(Value::Null)
		});
		let property = property.map(t);
		component
			.bind_property_behaviour(
				&t("onUpdateProperty"),
				&t(class),
				property.as_ref(),
				behaviour,
			)
			.unwrap();
	};
	bind("document", Some("content"), "content");
	bind("file", None, "any_file_property");

	let uow = UnitOfWork::begin();
	let args = save_args("doc-1");
	on_update
		.invoke(&uow, &t("document"), &t("content"), &args)
		.unwrap();
	on_update
		.invoke(&uow, &t("document"), &t("name"), &args)
		.unwrap();
	assert_eq!(results.snapshot(), ["content", "any_file_property"]);
}

#[test]
fn on_commit_before_save_sees_the_last_name() {
	let component = component();
	let before_save = component.register_class_policy(&before_save_shape()).unwrap();
	let results = Results::default();
	let behaviour = {
		let results = results.clone();
		Behaviour::builder("audit")
			.frequency(NotificationFrequency::OnCommit)
			.build(move |inv| {
				results.push(format!("{} {} -> {}", inv.arg(0), inv.arg(1), inv.arg(2)));
				Ok(Value::Null)
			})
	};
	component
		.bind_class_behaviour(&t("beforeSave"), &t("base"), behaviour)
		.unwrap();

	let uow = UnitOfWork::begin();
	let doc = Value::from(node("doc-1"));
	for (old, new) in [("a", "b"), ("b", "c"), ("c", "d")] {
		let args = [doc.clone(), Value::from(old), Value::from(new)];
		before_save.invoke(&uow, &t("document"), &args).unwrap();
	}
	uow.commit().unwrap();
	assert_eq!(results.snapshot(), [format!("{doc} \"a\" -> \"d\"")]);
}

#[test]
fn uncached_component_dispatches_identically() {
	let config = PolicyConfig {
		cache_enabled: false,
		..PolicyConfig::default()
	};
	let component = PolicyComponent::new(model(), config);
	let before_save = component.register_class_policy(&before_save_shape()).unwrap();
	component
		.bind_class_behaviour(&t("beforeSave"), &t("document"), named("H1"))
		.unwrap();

	let uow = UnitOfWork::begin();
	let first = before_save.get(&uow, &t("document")).unwrap();
	let second = before_save.get(&uow, &t("document")).unwrap();
	assert!(!std::sync::Arc::ptr_eq(&first, &second));
	assert_eq!(
		first.invoke(&uow, &save_args("doc-1")).unwrap(),
		second.invoke(&uow, &save_args("doc-1")).unwrap()
	);
}
