//! Content model capabilities.
//!
//! The policy engine never inspects a content model directly. It asks two
//! narrow questions through the traits in [`hierarchy`]: what is the parent of
//! a class, and does a class, property or association exist. [`ModelDictionary`]
//! is an in-memory implementation that can be assembled programmatically or
//! loaded from a TOML [`ModelSpec`].

/// Construction and loading errors.
pub mod error;
/// Capability traits.
pub mod hierarchy;
/// In-memory model dictionary.
pub mod model;
/// TOML model descriptions.
pub mod spec;

pub use error::{DictionaryError, Result};
pub use hierarchy::{Ancestors, ClassHierarchy, ContentModel};
pub use model::{ClassDef, ClassKind, ModelBuilder, ModelDictionary};
pub use spec::{ClassSpec, ModelSpec};
