use thiserror::Error;

/// Errors produced when parsing the textual form of a primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	/// A qualified name was not of the form `{namespace}local`.
	#[error("invalid qualified name {0:?} (expected `{{namespace}}local`)")]
	QName(String),

	/// A qualified name had an empty local part.
	#[error("qualified name {0:?} has an empty local name")]
	EmptyLocalName(String),

	/// A store reference was not of the form `protocol://identifier`.
	#[error("invalid store reference {0:?} (expected `protocol://identifier`)")]
	StoreRef(String),

	/// A node reference was not of the form `protocol://identifier/id`.
	#[error("invalid node reference {0:?} (expected `protocol://identifier/id`)")]
	NodeRef(String),
}
