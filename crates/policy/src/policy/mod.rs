//! Policy shapes and their validated definitions.
//!
//! A policy is a named extension point with exactly one operation. Each
//! argument of that operation carries an [`ArgRole`]: `Key` arguments
//! identify the subject of an event (and form deduplication keys for
//! deferred behaviours), `StartValue` and `EndValue` carry the value before
//! and after a change.

use std::fmt;
use std::sync::Arc;

use quire_primitives::QName;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::DefinitionError;

mod registry;

pub use registry::PolicyRegistry;

/// Level at which a policy is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
	Class,
	Property,
	Association,
}

impl fmt::Display for PolicyKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			PolicyKind::Class => "class",
			PolicyKind::Property => "property",
			PolicyKind::Association => "association",
		})
	}
}

/// Semantic role of a policy argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgRole {
	Key,
	StartValue,
	EndValue,
}

/// A declared operation parameter. Untagged parameters get a default role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub role: Option<ArgRole>,
}

/// A declared operation signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
	pub name: String,
	#[serde(default)]
	pub parameters: Vec<Parameter>,
}

impl Operation {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			parameters: Vec::new(),
		}
	}

	/// Appends an untagged parameter.
	pub fn param(mut self, name: impl Into<String>) -> Self {
		self.parameters.push(Parameter {
			name: name.into(),
			role: None,
		});
		self
	}

	/// Appends a parameter with an explicit role.
	pub fn tagged(mut self, name: impl Into<String>, role: ArgRole) -> Self {
		self.parameters.push(Parameter {
			name: name.into(),
			role: Some(role),
		});
		self
	}

	pub fn key(self, name: impl Into<String>) -> Self {
		self.tagged(name, ArgRole::Key)
	}

	pub fn start_value(self, name: impl Into<String>) -> Self {
		self.tagged(name, ArgRole::StartValue)
	}

	pub fn end_value(self, name: impl Into<String>) -> Self {
		self.tagged(name, ArgRole::EndValue)
	}
}

/// The raw, unvalidated description of a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyShape {
	pub name: QName,
	#[serde(default)]
	pub operations: Vec<Operation>,
}

impl PolicyShape {
	pub fn new(name: QName) -> Self {
		Self {
			name,
			operations: Vec::new(),
		}
	}

	pub fn operation(mut self, operation: Operation) -> Self {
		self.operations.push(operation);
		self
	}
}

/// A registered policy: immutable name, kind and argument roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyDefinition {
	name: QName,
	kind: PolicyKind,
	operation: Arc<str>,
	roles: SmallVec<[ArgRole; 4]>,
}

impl PolicyDefinition {
	/// Validates `shape` and extracts argument roles.
	///
	/// Position 0 defaults to `Key`; other untagged positions default to
	/// `StartValue`.
	pub fn from_shape(kind: PolicyKind, shape: &PolicyShape) -> Result<Self, DefinitionError> {
		let operation = match shape.operations.as_slice() {
			[] => {
				return Err(DefinitionError::NoOperation {
					policy: shape.name.clone(),
				});
			}
			[op] => op,
			ops => {
				return Err(DefinitionError::MultipleOperations {
					policy: shape.name.clone(),
					count: ops.len(),
				});
			}
		};

		let mut roles = SmallVec::with_capacity(operation.parameters.len());
		for (i, param) in operation.parameters.iter().enumerate() {
			let role = match (i, param.role) {
				(0, None | Some(ArgRole::Key)) => ArgRole::Key,
				(0, Some(role)) => {
					return Err(DefinitionError::FirstArgumentNotKey {
						policy: shape.name.clone(),
						role,
					});
				}
				(_, Some(role)) => role,
				(_, None) => ArgRole::StartValue,
			};
			roles.push(role);
		}

		Ok(Self {
			name: shape.name.clone(),
			kind,
			operation: operation.name.as_str().into(),
			roles,
		})
	}

	pub fn name(&self) -> &QName {
		&self.name
	}

	pub fn kind(&self) -> PolicyKind {
		self.kind
	}

	/// Name of the single operation.
	pub fn operation(&self) -> &str {
		&self.operation
	}

	pub fn arity(&self) -> usize {
		self.roles.len()
	}

	pub fn roles(&self) -> &[ArgRole] {
		&self.roles
	}

	/// Positions of arguments with `role`, in order.
	pub fn positions(&self, role: ArgRole) -> impl Iterator<Item = usize> + '_ {
		self.roles
			.iter()
			.enumerate()
			.filter(move |(_, r)| **r == role)
			.map(|(i, _)| i)
	}
}

impl fmt::Display for PolicyDefinition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.name, self.operation)
	}
}
