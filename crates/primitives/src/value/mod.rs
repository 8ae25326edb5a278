use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{NodeRef, QName};

/// Small ordered tuple of values, used for policy key arguments.
pub type ValueTuple = SmallVec<[Value; 2]>;

/// A value passed to, or returned from, a policy invocation.
///
/// `Null` is the result of a dispatch that ran no behaviour. Values are
/// hashable so that key arguments can identify repeated events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Int(i64),
	Text(String),
	QName(QName),
	Node(NodeRef),
	List(Vec<Value>),
}

impl Value {
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Value::Int(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Text(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_qname(&self) -> Option<&QName> {
		match self {
			Value::QName(q) => Some(q),
			_ => None,
		}
	}

	pub fn as_node(&self) -> Option<&NodeRef> {
		match self {
			Value::Node(n) => Some(n),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(items) => Some(items),
			_ => None,
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("null"),
			Value::Bool(b) => write!(f, "{b}"),
			Value::Int(i) => write!(f, "{i}"),
			Value::Text(s) => write!(f, "{s:?}"),
			Value::QName(q) => write!(f, "{q}"),
			Value::Node(n) => write!(f, "{n}"),
			Value::List(items) => {
				f.write_str("[")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{item}")?;
				}
				f.write_str("]")
			}
		}
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<i64> for Value {
	fn from(i: i64) -> Self {
		Value::Int(i)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::Text(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::Text(s)
	}
}

impl From<QName> for Value {
	fn from(q: QName) -> Self {
		Value::QName(q)
	}
}

impl From<NodeRef> for Value {
	fn from(n: NodeRef) -> Self {
		Value::Node(n)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(v: Option<T>) -> Self {
		v.map_or(Value::Null, Into::into)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(items: Vec<T>) -> Self {
		Value::List(items.into_iter().map(Into::into).collect())
	}
}
