//! Engine configuration.
//!
//! ```toml
//! cache-enabled = true
//! validate-bindings = true
//! max-hierarchy-depth = 64
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for a [`crate::PolicyComponent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PolicyConfig {
	/// Reuse aggregate handlers across units of work.
	pub cache_enabled: bool,
	/// Check bound classes, properties and associations against the model.
	pub validate_bindings: bool,
	/// Maximum generalisation steps taken by a single lookup.
	pub max_hierarchy_depth: usize,
}

/// Returns the default generalisation bound.
fn default_max_hierarchy_depth() -> usize {
	64
}

impl Default for PolicyConfig {
	fn default() -> Self {
		Self {
			cache_enabled: true,
			validate_bindings: true,
			max_hierarchy_depth: default_max_hierarchy_depth(),
		}
	}
}

impl PolicyConfig {
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}
}
