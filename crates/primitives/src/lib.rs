//! Core repository types: qualified names, node references and policy argument values.

/// Parse errors for the textual forms of names and references.
pub mod error;
/// Store and node references.
pub mod node;
/// Namespace-qualified names.
pub mod qname;
/// Argument and return values passed through policies.
pub mod value;

pub use error::ParseError;
pub use node::{NodeRef, StoreRef};
pub use qname::QName;
pub use value::{Value, ValueTuple};
