use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::ParseError;

/// Reference to a store, rendered `protocol://identifier`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreRef {
	protocol: Arc<str>,
	identifier: Arc<str>,
}

impl StoreRef {
	pub fn new(protocol: impl Into<Arc<str>>, identifier: impl Into<Arc<str>>) -> Self {
		Self {
			protocol: protocol.into(),
			identifier: identifier.into(),
		}
	}

	/// The default live workspace store.
	pub fn workspace() -> Self {
		Self::new("workspace", "SpacesStore")
	}

	pub fn parse(text: &str) -> Result<Self, ParseError> {
		let (protocol, identifier) = text
			.split_once("://")
			.filter(|(p, i)| !p.is_empty() && !i.is_empty() && !i.contains('/'))
			.ok_or_else(|| ParseError::StoreRef(text.to_string()))?;
		Ok(Self::new(protocol, identifier))
	}

	pub fn protocol(&self) -> &str {
		&self.protocol
	}

	pub fn identifier(&self) -> &str {
		&self.identifier
	}
}

impl fmt::Display for StoreRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}://{}", self.protocol, self.identifier)
	}
}

impl fmt::Debug for StoreRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "StoreRef({self})")
	}
}

/// Identity of a single node instance within a store.
///
/// Instance-level bindings and filters are keyed by this type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef {
	store: StoreRef,
	id: Arc<str>,
}

impl NodeRef {
	pub fn new(store: StoreRef, id: impl Into<Arc<str>>) -> Self {
		Self {
			store,
			id: id.into(),
		}
	}

	/// Creates a reference with a fresh random (v4) identifier.
	pub fn generate(store: StoreRef) -> Self {
		Self::new(store, Uuid::new_v4().to_string())
	}

	pub fn parse(text: &str) -> Result<Self, ParseError> {
		let err = || ParseError::NodeRef(text.to_string());
		let (store, id) = text.rsplit_once('/').ok_or_else(err)?;
		if id.is_empty() {
			return Err(err());
		}
		let store = StoreRef::parse(store).map_err(|_| err())?;
		Ok(Self::new(store, id))
	}

	pub fn store(&self) -> &StoreRef {
		&self.store
	}

	pub fn id(&self) -> &str {
		&self.id
	}
}

impl fmt::Display for NodeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.store, self.id)
	}
}

impl fmt::Debug for NodeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "NodeRef({self})")
	}
}

impl FromStr for NodeRef {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl Serialize for NodeRef {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for NodeRef {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let text = String::deserialize(deserializer)?;
		Self::parse(&text).map_err(serde::de::Error::custom)
	}
}
