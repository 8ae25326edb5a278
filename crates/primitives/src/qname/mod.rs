use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ParseError;

/// A namespace-qualified name identifying classes, aspects, properties,
/// associations and policies.
///
/// Both parts are reference counted, so clones are cheap and names can be
/// used freely as map keys across threads. The canonical text form is
/// `{namespace}local`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
	namespace: Arc<str>,
	local: Arc<str>,
}

impl QName {
	/// Creates a name from a namespace URI and a local name.
	pub fn new(namespace: impl Into<Arc<str>>, local: impl Into<Arc<str>>) -> Self {
		Self {
			namespace: namespace.into(),
			local: local.into(),
		}
	}

	/// Parses the canonical `{namespace}local` form.
	///
	/// A bare `local` (no braces) is accepted as a name in the empty namespace.
	pub fn parse(text: &str) -> Result<Self, ParseError> {
		let (namespace, local) = match text.strip_prefix('{') {
			Some(rest) => rest
				.split_once('}')
				.ok_or_else(|| ParseError::QName(text.to_string()))?,
			None if text.contains('}') => return Err(ParseError::QName(text.to_string())),
			None => ("", text),
		};
		if local.is_empty() {
			return Err(ParseError::EmptyLocalName(text.to_string()));
		}
		Ok(Self::new(namespace, local))
	}

	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	pub fn local_name(&self) -> &str {
		&self.local
	}
}

impl fmt::Display for QName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{{{}}}{}", self.namespace, self.local)
	}
}

impl fmt::Debug for QName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "QName({self})")
	}
}

impl FromStr for QName {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl Serialize for QName {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for QName {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let text = String::deserialize(deserializer)?;
		Self::parse(&text).map_err(serde::de::Error::custom)
	}
}
