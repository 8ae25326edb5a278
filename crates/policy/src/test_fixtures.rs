use std::sync::Arc;

use parking_lot::Mutex;
use quire_dictionary::{ClassDef, ModelDictionary};
use quire_primitives::{NodeRef, QName, StoreRef, Value};

use crate::{
	Behaviour, Binding, NotificationFrequency, Operation, PolicyComponent, PolicyConfig,
	PolicyError, PolicyShape,
};

pub(crate) const NS: &str = "urn:quire:test";

pub(crate) fn q(local: &str) -> QName {
	QName::new(NS, local)
}

pub(crate) fn node(id: &str) -> NodeRef {
	NodeRef::new(StoreRef::workspace(), id)
}

/// `base <- a <- b <- c`, `base <- document`, `base <- folder`, aspect `titled`.
pub(crate) fn model() -> Arc<ModelDictionary> {
	let model = ModelDictionary::builder()
		.class(ClassDef::new_type(q("base")).with_property(q("name")))
		.class(ClassDef::new_type(q("a")).with_parent(q("base")))
		.class(ClassDef::new_type(q("b")).with_parent(q("a")))
		.class(ClassDef::new_type(q("c")).with_parent(q("b")))
		.class(ClassDef::new_type(q("document")).with_parent(q("base")))
		.class(
			ClassDef::new_type(q("folder"))
				.with_parent(q("base"))
				.with_association(q("contains")),
		)
		.class(ClassDef::new_aspect(q("titled")).with_property(q("title")))
		.build()
		.unwrap();
	Arc::new(model)
}

pub(crate) fn component() -> PolicyComponent {
	PolicyComponent::new(model(), PolicyConfig::default())
}

/// Single-operation shape with `arity` untagged arguments.
pub(crate) fn shape(local: &str, arity: usize) -> PolicyShape {
	let mut op = Operation::new(local);
	for i in 0..arity {
		op = op.param(format!("arg{i}"));
	}
	PolicyShape::new(q(local)).operation(op)
}

/// Shared call log written by recording behaviours.
#[derive(Clone, Default)]
pub(crate) struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
	pub(crate) fn push(&self, entry: impl Into<String>) {
		self.0.lock().push(entry.into());
	}

	pub(crate) fn take(&self) -> Vec<String> {
		std::mem::take(&mut *self.0.lock())
	}

	pub(crate) fn len(&self) -> usize {
		self.0.lock().len()
	}
}

/// Behaviour that logs `name(args..)` and returns `name` as text.
pub(crate) fn recording(name: &str, frequency: NotificationFrequency, log: &Log) -> Behaviour {
	let log = log.clone();
	let label = name.to_string();
	Behaviour::builder(name)
		.frequency(frequency)
		.build(move |inv| {
			let args: Vec<String> = inv.args().iter().map(ToString::to_string).collect();
			log.push(format!("{label}({})", args.join(",")));
			Ok(Value::from(label.as_str()))
		})
}

/// Behaviour that logs its name and fails.
pub(crate) fn failing(name: &str, log: &Log) -> Behaviour {
	let log = log.clone();
	let label = name.to_string();
	Behaviour::new(name, move |_| {
		log.push(label.clone());
		Err(PolicyError::behaviour(format!("{label} failed")))
	})
}

pub(crate) fn class_binding(local: &str) -> Binding {
	Binding::class(q(local))
}
