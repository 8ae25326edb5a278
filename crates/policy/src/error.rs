//! Error taxonomy for registration, binding and dispatch.

use std::path::PathBuf;

use quire_primitives::QName;
use thiserror::Error;

use crate::policy::{ArgRole, PolicyKind};
use crate::uow::UnitOfWorkId;

/// Boxed error raised by a behaviour handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A policy shape could not be turned into a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
	/// The shape declares no operation.
	#[error("policy {policy} declares no operation")]
	NoOperation { policy: QName },

	/// The shape declares more than one operation.
	#[error("policy {policy} declares {count} operations; exactly one is required")]
	MultipleOperations { policy: QName, count: usize },

	/// Argument 0 carries a role other than `Key`.
	#[error("policy {policy}: first argument must be a key, found {role:?}")]
	FirstArgumentNotKey { policy: QName, role: ArgRole },

	/// The name is already registered for this kind with a different shape.
	#[error("{kind} policy {policy} is already registered with a different shape")]
	Conflict { policy: QName, kind: PolicyKind },
}

/// A binding target does not exist in the content model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
	#[error("class {0} is not defined in the content model")]
	UnknownClass(QName),

	#[error("property {0} is not defined in the content model")]
	UnknownProperty(QName),

	#[error("association {0} is not defined in the content model")]
	UnknownAssociation(QName),
}

/// A behaviour does not fit the contract of the policy it is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("behaviour {behaviour} implements {found:?} but policy {policy} expects {expected:?}")]
	OperationMismatch {
		policy: QName,
		behaviour: String,
		expected: String,
		found: String,
	},

	#[error("behaviour {behaviour} takes {found} arguments but policy {policy} passes {expected}")]
	ArityMismatch {
		policy: QName,
		behaviour: String,
		expected: usize,
		found: usize,
	},
}

/// Misuse of a behaviour's reentrancy guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
	/// `enable` was called without a matching `disable`.
	#[error("behaviour {behaviour} enabled without a matching disable")]
	UnbalancedEnable { behaviour: String },
}

/// Errors that can occur when loading engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or structure.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
}

/// Umbrella error for the policy engine.
///
/// Behaviour handlers return this type too, so a handler that fires another
/// policy can propagate its failure with `?`.
#[derive(Debug, Error)]
pub enum PolicyError {
	#[error(transparent)]
	Definition(#[from] DefinitionError),

	#[error(transparent)]
	Binding(#[from] BindingError),

	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error(transparent)]
	Filter(#[from] FilterError),

	/// A handler was invoked with the wrong number of arguments.
	#[error("policy {policy} takes {expected} arguments, got {found}")]
	ArgumentCount {
		policy: QName,
		expected: usize,
		found: usize,
	},

	/// A behaviour handler failed.
	#[error(transparent)]
	Behaviour(BoxError),

	/// A commit-time execution failed.
	#[error(
		"unit of work {unit_of_work}: deferred behaviour {behaviour} for policy {policy} failed"
	)]
	Deferred {
		unit_of_work: UnitOfWorkId,
		policy: QName,
		behaviour: String,
		#[source]
		source: Box<PolicyError>,
	},
}

impl PolicyError {
	/// Wraps an arbitrary handler failure.
	pub fn behaviour(err: impl Into<BoxError>) -> Self {
		Self::Behaviour(err.into())
	}
}

/// Result type for engine operations.
pub type Result<T, E = PolicyError> = std::result::Result<T, E>;
