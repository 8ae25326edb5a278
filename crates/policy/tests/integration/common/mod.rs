//! Common utilities for policy integration tests.

use std::sync::Arc;

use parking_lot::Mutex;
use quire_dictionary::{ModelDictionary, ModelSpec};
use quire_policy::{PolicyComponent, PolicyConfig};
use quire_primitives::{NodeRef, QName, StoreRef};

pub const TEST_NAMESPACE: &str = "urn:quire:policy-test";

/// Model shared by every integration test.
///
/// `base <- a_type <- b_type <- c_type`, `base <- file <- document`,
/// `base <- folder`, and the `versionable` aspect.
pub const TEST_MODEL: &str = r#"
[namespaces]
test = "urn:quire:policy-test"

[[types]]
name = "test:base"
properties = ["test:name"]

[[types]]
name = "test:file"
parent = "test:base"

[[types]]
name = "test:document"
parent = "test:file"
properties = ["test:content"]

[[types]]
name = "test:folder"
parent = "test:base"
associations = ["test:contains"]

[[types]]
name = "test:a_type"
parent = "test:base"

[[types]]
name = "test:b_type"
parent = "test:a_type"

[[types]]
name = "test:c_type"
parent = "test:b_type"

[[aspects]]
name = "test:versionable"
properties = ["test:label"]
"#;

pub fn t(local: &str) -> QName {
	QName::new(TEST_NAMESPACE, local)
}

pub fn node(id: &str) -> NodeRef {
	NodeRef::new(StoreRef::workspace(), id)
}

pub fn model() -> Arc<ModelDictionary> {
	let model = ModelSpec::from_toml_str(TEST_MODEL)
		.expect("test model parses")
		.into_dictionary()
		.expect("test model is consistent");
	Arc::new(model)
}

/// Fresh component over [`TEST_MODEL`], with tracing initialised.
pub fn component() -> PolicyComponent {
	let _ = tracing_subscriber::fmt::try_init();
	PolicyComponent::new(model(), PolicyConfig::default())
}

/// Ordered record of behaviour executions.
#[derive(Clone, Default)]
pub struct Results(Arc<Mutex<Vec<String>>>);

impl Results {
	pub fn push(&self, entry: impl Into<String>) {
		self.0.lock().push(entry.into());
	}

	pub fn snapshot(&self) -> Vec<String> {
		self.0.lock().clone()
	}

	pub fn len(&self) -> usize {
		self.0.lock().len()
	}
}
