//! Error types for compilation and value resolution.
//!
//! [`StructuralError`]s are fatal for the literal they were raised for and are returned to the caller.
//! [`ResolutionError`]s never leave the renderer: they are isolated to a single part, which renders empty,
//! and are surfaced as [`Diagnostic`]s instead.

use core::fmt;
use thiserror::Error;

/// Boxed error returned by a failing [`Thunk`](`crate::Thunk`).
pub type ThunkError = Box<dyn std::error::Error>;

/// Where a sentinel was found when it couldn't be turned into a part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerContext {
	/// Inside or in place of a tag name, as in `<${tag}>`.
	TagName,
	/// Inside an attribute name, as in `<div data-${x}="">`.
	AttributeName,
	/// In place of a whole attribute, as in `<div ${x}>`.
	Tag,
	/// Sharing an attribute value with other text or other parts, as in `class="a ${b}"`.
	PartialAttributeValue { name: String },
	/// Inside a comment or another markup declaration.
	Comment,
	/// Inside an element whose content isn't parsed as markup.
	RawText { tag: String },
}

impl fmt::Display for MarkerContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MarkerContext::TagName => f.write_str("inside a tag name"),
			MarkerContext::AttributeName => f.write_str("inside an attribute name"),
			MarkerContext::Tag => f.write_str("in place of an attribute"),
			MarkerContext::PartialAttributeValue { name } => write!(f, "in part of the value of attribute `{}`", name),
			MarkerContext::Comment => f.write_str("inside a comment"),
			MarkerContext::RawText { tag } => write!(f, "inside the raw text of <{}>", tag),
		}
	}
}

/// Error returned by a [`Parser`](`crate::fragment::Parser`).
#[derive(Debug, Clone, Error)]
#[error("markup parser failed: {message}")]
pub struct ParseError {
	pub message: String,
}

impl ParseError {
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// A literal that can't be compiled into a [`Template`](`crate::Template`).
#[derive(Debug, Clone, Error)]
pub enum StructuralError {
	/// A literal needs at least one segment.
	#[error("a template literal needs at least one segment")]
	NoSegments,

	/// The literal itself contains the reserved sentinel.
	#[error("segment {segment} contains the reserved part marker")]
	ReservedMarker { segment: usize },

	/// A dynamic position can't be represented as a whole attribute value or a standalone child.
	#[error("dynamic value {index} is {context}")]
	UnsupportedPosition { index: usize, context: MarkerContext },

	/// The parsed tree doesn't place sentinels where the source text does.
	#[error("dynamic value {index} was not found where the source text puts it")]
	Misaligned { index: usize },

	/// The parsed tree dropped or duplicated sentinels.
	#[error("expected {expected} parts but the parsed markup yields {found}")]
	PartCount { expected: usize, found: usize },

	/// A tag invocation passed the wrong number of values.
	#[error("a literal with {segments} segments takes {} values, but {values} were given", .segments.saturating_sub(1))]
	ValueCount { segments: usize, values: usize },

	#[error(transparent)]
	Parse(#[from] ParseError),
}

/// A failure to turn one dynamic value into output. Isolated to the part it occurred in.
#[derive(Debug, Error)]
pub enum ResolutionError {
	/// A deferred value returned an error.
	#[error("deferred value failed: {0}")]
	Failed(ThunkError),

	/// A deferred value panicked.
	#[error("deferred value panicked: {message}")]
	Panicked { message: String },

	/// Deferred values kept returning deferred values.
	#[error("deferred value still unresolved after {limit} invocations")]
	TrampolineLimit { limit: usize },

	/// Nested templates and item lists went deeper than allowed.
	#[error("nesting depth limit ({limit}) reached")]
	DepthLimit { limit: usize },

	/// Templates can only be rendered into node positions.
	#[error("a template result can't be used as an attribute value")]
	TemplateInAttribute,

	/// The host tree doesn't contain a node the template's structure promises.
	#[error("no node found at template path {path}")]
	UnresolvedPath { path: String },

	/// The host refused an update.
	#[error("host rejected update: {message}")]
	Host { message: String },
}

/// A non-fatal problem encountered while rendering, tied to the part it affected.
#[derive(Debug, Error)]
#[error("part {part} (nesting depth {depth}): {error}")]
pub struct Diagnostic {
	/// Index of the part within its template, which equals the index of its value.
	pub part: usize,
	/// 0 for parts of the rendered template, increasing by one per nested template or item list.
	pub depth: usize,
	#[source]
	pub error: ResolutionError,
}
