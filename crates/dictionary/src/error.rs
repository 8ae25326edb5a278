//! Error types for model construction.

use std::path::PathBuf;

use quire_primitives::{ParseError, QName};
use thiserror::Error;

/// Errors that can occur while building or loading a content model.
#[derive(Debug, Error)]
pub enum DictionaryError {
	/// The same class was defined twice.
	#[error("class {0} is defined more than once")]
	DuplicateClass(QName),

	/// A class names a parent that is not part of the model.
	#[error("class {class} has unknown parent {parent}")]
	UnknownParent {
		/// The class declaring the parent.
		class: QName,
		/// The missing parent.
		parent: QName,
	},

	/// Following parent links from a class leads back to it.
	#[error("class hierarchy cycle through {0}")]
	Cycle(QName),

	/// A `prefix:local` name used a prefix missing from `[namespaces]`.
	#[error("unknown namespace prefix {prefix:?} in {name:?}")]
	UnknownPrefix {
		/// The unresolved prefix.
		prefix: String,
		/// The full name as written.
		name: String,
	},

	/// A name could not be parsed.
	#[error(transparent)]
	Name(#[from] ParseError),

	/// Error parsing TOML syntax or structure.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a model file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
}

/// Result type for dictionary operations.
pub type Result<T> = std::result::Result<T, DictionaryError>;
