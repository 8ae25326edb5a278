//! In-memory content model.
//!
//! A [`ModelDictionary`] is immutable once built. [`ModelBuilder::build`]
//! rejects duplicate classes, dangling parents and parent cycles, so every
//! ancestry walk over a built dictionary terminates at a root.

use quire_primitives::QName;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::{DictionaryError, Result};
use crate::hierarchy::{ClassHierarchy, ContentModel};

/// Whether a class is a type or an aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
	Type,
	Aspect,
}

/// A class or aspect definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
	pub name: QName,
	pub kind: ClassKind,
	pub parent: Option<QName>,
	pub properties: Vec<QName>,
	pub associations: Vec<QName>,
}

impl ClassDef {
	pub fn new_type(name: QName) -> Self {
		Self::new(name, ClassKind::Type)
	}

	pub fn new_aspect(name: QName) -> Self {
		Self::new(name, ClassKind::Aspect)
	}

	fn new(name: QName, kind: ClassKind) -> Self {
		Self {
			name,
			kind,
			parent: None,
			properties: Vec::new(),
			associations: Vec::new(),
		}
	}

	pub fn with_parent(mut self, parent: QName) -> Self {
		self.parent = Some(parent);
		self
	}

	pub fn with_property(mut self, property: QName) -> Self {
		self.properties.push(property);
		self
	}

	pub fn with_association(mut self, association: QName) -> Self {
		self.associations.push(association);
		self
	}
}

/// Validated, immutable set of class definitions.
#[derive(Debug, Default)]
pub struct ModelDictionary {
	classes: FxHashMap<QName, ClassDef>,
	/// Property name to declaring class.
	properties: FxHashMap<QName, QName>,
	/// Association name to declaring class.
	associations: FxHashMap<QName, QName>,
}

impl ModelDictionary {
	pub fn builder() -> ModelBuilder {
		ModelBuilder::default()
	}

	pub fn class(&self, name: &QName) -> Option<&ClassDef> {
		self.classes.get(name)
	}

	/// Returns the class declaring `property`.
	pub fn property_owner(&self, property: &QName) -> Option<&QName> {
		self.properties.get(property)
	}

	/// Returns the class declaring `association`.
	pub fn association_owner(&self, association: &QName) -> Option<&QName> {
		self.associations.get(association)
	}

	pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
		self.classes.values()
	}

	pub fn len(&self) -> usize {
		self.classes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.classes.is_empty()
	}
}

impl ClassHierarchy for ModelDictionary {
	fn parent_of(&self, class: &QName) -> Option<QName> {
		self.classes.get(class)?.parent.clone()
	}
}

impl ContentModel for ModelDictionary {
	fn has_class(&self, class: &QName) -> bool {
		self.classes.contains_key(class)
	}

	fn has_property(&self, property: &QName) -> bool {
		self.properties.contains_key(property)
	}

	fn has_association(&self, association: &QName) -> bool {
		self.associations.contains_key(association)
	}
}

/// Accumulates class definitions for a [`ModelDictionary`].
#[derive(Debug, Default)]
pub struct ModelBuilder {
	defs: Vec<ClassDef>,
}

impl ModelBuilder {
	pub fn class(mut self, def: ClassDef) -> Self {
		self.defs.push(def);
		self
	}

	pub fn push(&mut self, def: ClassDef) {
		self.defs.push(def);
	}

	/// Validates the accumulated definitions and freezes them.
	pub fn build(self) -> Result<ModelDictionary> {
		let mut classes = FxHashMap::default();
		for def in self.defs {
			if classes.contains_key(&def.name) {
				return Err(DictionaryError::DuplicateClass(def.name));
			}
			classes.insert(def.name.clone(), def);
		}

		for def in classes.values() {
			if let Some(parent) = &def.parent
				&& !classes.contains_key(parent)
			{
				return Err(DictionaryError::UnknownParent {
					class: def.name.clone(),
					parent: parent.clone(),
				});
			}
		}
		check_acyclic(&classes)?;

		let mut properties = FxHashMap::default();
		let mut associations = FxHashMap::default();
		for def in classes.values() {
			for p in &def.properties {
				properties.insert(p.clone(), def.name.clone());
			}
			for a in &def.associations {
				associations.insert(a.clone(), def.name.clone());
			}
		}

		debug!(
			classes = classes.len(),
			properties = properties.len(),
			associations = associations.len(),
			"dictionary.build"
		);
		Ok(ModelDictionary {
			classes,
			properties,
			associations,
		})
	}
}

fn check_acyclic(classes: &FxHashMap<QName, ClassDef>) -> Result<()> {
	let mut rooted: FxHashSet<&QName> = FxHashSet::default();
	for start in classes.keys() {
		let mut path: FxHashSet<&QName> = FxHashSet::default();
		let mut current = start;
		loop {
			if rooted.contains(current) {
				break;
			}
			if !path.insert(current) {
				return Err(DictionaryError::Cycle(current.clone()));
			}
			match classes.get(current).and_then(|d| d.parent.as_ref()) {
				Some(parent) => current = parent,
				None => break,
			}
		}
		rooted.extend(path);
	}
	Ok(())
}
