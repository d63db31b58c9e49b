//! Compiled templates, their part descriptors and per-invocation results.

use crate::{fragment::Fragment, value::Value};
use core::{
	fmt,
	sync::atomic::{AtomicU64, Ordering},
};
use std::{rc::Rc, sync::OnceLock};

/// Identity token of a [`Literal`], assigned when it's first observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LiteralId(u64);

impl LiteralId {
	fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(0);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}
}

/// The static segments of one template call site.
///
/// Identity, not content, decides template reuse: two literals with equal segments still compile separately.
/// The [`html!`](`crate::html!`) macro declares one `static` [`Literal`] per call site.
pub struct Literal {
	segments: &'static [&'static str],
	id: OnceLock<LiteralId>,
}

impl Literal {
	#[must_use]
	pub const fn new(segments: &'static [&'static str]) -> Self {
		Self { segments, id: OnceLock::new() }
	}

	#[must_use]
	pub fn segments(&self) -> &'static [&'static str] {
		self.segments
	}

	#[must_use]
	pub fn id(&self) -> LiteralId {
		*self.id.get_or_init(LiteralId::next)
	}
}

impl fmt::Debug for Literal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Literal").field("segments", &self.segments).field("id", &self.id.get()).finish()
	}
}

/// Child indices leading from a [`Fragment`]'s root list to one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path(Vec<usize>);

impl Path {
	#[must_use]
	pub fn new(indices: Vec<usize>) -> Self {
		Self(indices)
	}

	#[must_use]
	pub fn indices(&self) -> &[usize] {
		&self.0
	}

	/// Whether this path points at one of the fragment's roots.
	#[must_use]
	pub fn is_root(&self) -> bool {
		self.0.len() == 1
	}
}

impl fmt::Display for Path {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut indices = self.0.iter();
		if let Some(first) = indices.next() {
			write!(f, "{}", first)?;
		}
		for index in indices {
			write!(f, "/{}", index)?;
		}
		Ok(())
	}
}

/// A dynamic value used as an attribute's whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePart {
	pub(crate) path: Path,
	pub(crate) name: String,
	pub(crate) raw_name: String,
}

impl AttributePart {
	/// Path of the owning element.
	#[must_use]
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// The attribute name as reported by the parser, usually lower-case.
	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The attribute name exactly as written in the literal.
	#[must_use]
	pub fn raw_name(&self) -> &str {
		&self.raw_name
	}
}

/// A dynamic value rendered as child content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePart {
	pub(crate) path: Path,
}

impl NodePart {
	/// Path of the empty text node anchoring this part's output.
	#[must_use]
	pub fn path(&self) -> &Path {
		&self.path
	}
}

/// Compile-time description of one dynamic position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
	Attribute(AttributePart),
	Node(NodePart),
}

impl Part {
	#[must_use]
	pub fn path(&self) -> &Path {
		match self {
			Part::Attribute(attribute) => &attribute.path,
			Part::Node(node) => &node.path,
		}
	}
}

/// The compiled, immutable form of one [`Literal`].
///
/// `parts[i]` always describes where `values[i]` of a matching [`TemplateResult`] goes.
#[derive(Debug)]
pub struct Template {
	pub(crate) literal: LiteralId,
	pub(crate) segments: &'static [&'static str],
	pub(crate) fragment: Fragment,
	pub(crate) parts: Vec<Part>,
}

impl Template {
	#[must_use]
	pub fn literal(&self) -> LiteralId {
		self.literal
	}

	#[must_use]
	pub fn segments(&self) -> &'static [&'static str] {
		self.segments
	}

	/// The structure cloned for each instance.
	///
	/// Marker-valued attributes are omitted, and each node part's position holds an empty text node.
	#[must_use]
	pub fn fragment(&self) -> &Fragment {
		&self.fragment
	}

	#[must_use]
	pub fn parts(&self) -> &[Part] {
		&self.parts
	}
}

/// One evaluation of a template call site: the cached [`Template`] and the values for its parts.
#[derive(Debug, Clone)]
pub struct TemplateResult {
	pub(crate) template: Rc<Template>,
	pub(crate) values: Vec<Value>,
}

impl TemplateResult {
	#[must_use]
	pub fn template(&self) -> &Rc<Template> {
		&self.template
	}

	#[must_use]
	pub fn values(&self) -> &[Value] {
		&self.values
	}
}
