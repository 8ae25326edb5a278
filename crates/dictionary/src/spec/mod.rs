//! TOML model descriptions.
//!
//! ```toml
//! [namespaces]
//! cm = "urn:quire:model:content"
//!
//! [[types]]
//! name = "cm:folder"
//! parent = "cm:cmobject"
//! associations = ["cm:contains"]
//!
//! [[aspects]]
//! name = "cm:titled"
//! properties = ["cm:title", "cm:description"]
//! ```
//!
//! Names are written `prefix:local` against the `[namespaces]` table, or in
//! the canonical `{namespace}local` form.

use std::collections::BTreeMap;
use std::path::Path;

use quire_primitives::QName;
use serde::Deserialize;

use crate::error::{DictionaryError, Result};
use crate::model::{ClassDef, ModelDictionary};

/// Top-level model document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSpec {
	pub namespaces: BTreeMap<String, String>,
	pub types: Vec<ClassSpec>,
	pub aspects: Vec<ClassSpec>,
}

/// One `[[types]]` or `[[aspects]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassSpec {
	pub name: String,
	#[serde(default)]
	pub parent: Option<String>,
	#[serde(default)]
	pub properties: Vec<String>,
	#[serde(default)]
	pub associations: Vec<String>,
}

impl ModelSpec {
	pub fn from_toml_str(text: &str) -> Result<Self> {
		Ok(toml::from_str(text)?)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|error| DictionaryError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	/// Resolves `prefix:local` or `{namespace}local` to a [`QName`].
	pub fn resolve(&self, name: &str) -> Result<QName> {
		if name.starts_with('{') {
			return Ok(QName::parse(name)?);
		}
		match name.split_once(':') {
			Some((prefix, local)) => {
				let namespace =
					self.namespaces
						.get(prefix)
						.ok_or_else(|| DictionaryError::UnknownPrefix {
							prefix: prefix.to_string(),
							name: name.to_string(),
						})?;
				Ok(QName::parse(&format!("{{{namespace}}}{local}"))?)
			}
			None => Ok(QName::parse(name)?),
		}
	}

	/// Resolves every name and builds a validated dictionary.
	pub fn into_dictionary(self) -> Result<ModelDictionary> {
		let mut builder = ModelDictionary::builder();
		for spec in &self.types {
			builder.push(self.class_def(spec, ClassDef::new_type)?);
		}
		for spec in &self.aspects {
			builder.push(self.class_def(spec, ClassDef::new_aspect)?);
		}
		builder.build()
	}

	fn class_def(&self, spec: &ClassSpec, new: fn(QName) -> ClassDef) -> Result<ClassDef> {
		let mut def = new(self.resolve(&spec.name)?);
		if let Some(parent) = &spec.parent {
			def = def.with_parent(self.resolve(parent)?);
		}
		for p in &spec.properties {
			def = def.with_property(self.resolve(p)?);
		}
		for a in &spec.associations {
			def = def.with_association(self.resolve(a)?);
		}
		Ok(def)
	}
}
