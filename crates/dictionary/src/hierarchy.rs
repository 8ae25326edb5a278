//! Capability traits injected into the policy engine.

use quire_primitives::QName;

/// Upper bound on parent links followed by the default ancestry walk.
///
/// Implementations that cannot guarantee an acyclic hierarchy still terminate.
pub const MAX_ANCESTRY: usize = 256;

/// Parent-of relationships between classes and aspects.
pub trait ClassHierarchy: Send + Sync {
	/// Returns the direct parent of `class`, or `None` at a root or for an
	/// unknown class.
	fn parent_of(&self, class: &QName) -> Option<QName>;

	/// Returns true if `class` is `ancestor` or descends from it.
	fn is_subclass(&self, class: &QName, ancestor: &QName) -> bool {
		class == ancestor || Ancestors::new(self, class).any(|c| &c == ancestor)
	}
}

/// Iterator over the strict ancestors of a class, nearest first.
pub struct Ancestors<'a, H: ?Sized> {
	hierarchy: &'a H,
	next: Option<QName>,
	remaining: usize,
}

impl<'a, H: ClassHierarchy + ?Sized> Ancestors<'a, H> {
	pub fn new(hierarchy: &'a H, class: &QName) -> Self {
		Self {
			hierarchy,
			next: hierarchy.parent_of(class),
			remaining: MAX_ANCESTRY,
		}
	}
}

impl<H: ClassHierarchy + ?Sized> Iterator for Ancestors<'_, H> {
	type Item = QName;

	fn next(&mut self) -> Option<QName> {
		if self.remaining == 0 {
			return None;
		}
		self.remaining -= 1;
		let current = self.next.take()?;
		self.next = self.hierarchy.parent_of(&current);
		Some(current)
	}
}

/// Existence checks used to validate bindings.
pub trait ContentModel: ClassHierarchy {
	fn has_class(&self, class: &QName) -> bool;
	fn has_property(&self, property: &QName) -> bool;
	fn has_association(&self, association: &QName) -> bool;
}
