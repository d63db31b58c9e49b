//! Dynamic values and their resolution into renderable shapes.

use crate::{
	error::{ResolutionError, ThunkError},
	template::TemplateResult,
};
use core::{any::Any, fmt};
use std::{
	borrow::Cow,
	panic::{self, AssertUnwindSafe},
	rc::Rc,
};

/// Default number of times a chain of deferred values is invoked before giving up.
pub const DEFAULT_THUNK_LIMIT: usize = 16;

/// A dynamic value for one part of a template.
#[derive(Debug, Clone)]
pub enum Value {
	Empty,
	Text(Rc<str>),
	Integer(i64),
	Float(f64),
	Bool(bool),
	/// A nested template. Only valid in node positions.
	Template(TemplateResult),
	/// Rendered one after another. In attribute positions, the items' texts are concatenated.
	Items(Vec<Value>),
	/// Computed when the part is updated.
	Thunk(Thunk),
}

/// A deferred computation, invoked without arguments whenever the part holding it is updated.
#[derive(Clone)]
pub struct Thunk(Rc<dyn Fn() -> Result<Value, ThunkError>>);

impl Thunk {
	pub fn new(f: impl Fn() -> Result<Value, ThunkError> + 'static) -> Self {
		Self(Rc::new(f))
	}

	/// Invokes the computation, turning both errors and panics into a [`ResolutionError`].
	fn invoke(&self) -> Result<Value, ResolutionError> {
		match panic::catch_unwind(AssertUnwindSafe(|| (self.0)())) {
			Ok(Ok(value)) => Ok(value),
			Ok(Err(error)) => Err(ResolutionError::Failed(error)),
			Err(payload) => Err(ResolutionError::Panicked {
				message: panic_message(payload.as_ref()),
			}),
		}
	}
}

impl fmt::Debug for Thunk {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Thunk(..)")
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_owned()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"(non-string panic payload)".to_owned()
	}
}

impl Value {
	/// Wraps a deferred computation.
	pub fn thunk(f: impl Fn() -> Result<Value, ThunkError> + 'static) -> Self {
		Value::Thunk(Thunk::new(f))
	}

	/// Collects any iterable into [`Value::Items`].
	pub fn items<I>(items: I) -> Self
	where
		I: IntoIterator,
		I::Item: Into<Value>,
	{
		Value::Items(items.into_iter().map(Into::into).collect())
	}

	/// The text a primitive renders as, or [`None`] for templates, items and thunks.
	#[must_use]
	pub fn primitive_text(&self) -> Option<String> {
		match self {
			Value::Empty => Some(String::new()),
			Value::Text(text) => Some(text.as_ref().to_owned()),
			Value::Integer(integer) => Some(integer.to_string()),
			Value::Float(float) => Some(float.to_string()),
			Value::Bool(flag) => Some(flag.to_string()),
			Value::Template(_) | Value::Items(_) | Value::Thunk(_) => None,
		}
	}

	/// Whether both values are the same primitive, variant included.
	///
	/// [`Value::Empty`] and empty text render the same as text but aren't the same primitive.
	#[must_use]
	pub fn is_same_primitive(&self, other: &Value) -> bool {
		match (self, other) {
			(Value::Empty, Value::Empty) => true,
			(Value::Text(a), Value::Text(b)) => a == b,
			(Value::Integer(a), Value::Integer(b)) => a == b,
			(Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
			(Value::Bool(a), Value::Bool(b)) => a == b,
			_ => false,
		}
	}

	/// Whether this is a primitive, [`Value::Empty`] included.
	#[must_use]
	pub fn is_primitive(&self) -> bool {
		matches!(Shape::of(self), Shape::Primitive(_))
	}
}

/// How a value is rendered, checked in declaration order.
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
	Deferred(&'a Thunk),
	Template(&'a TemplateResult),
	Items(&'a [Value]),
	/// Includes [`Value::Empty`].
	Primitive(&'a Value),
}

impl<'a> Shape<'a> {
	#[must_use]
	pub fn of(value: &'a Value) -> Self {
		match value {
			Value::Thunk(thunk) => Shape::Deferred(thunk),
			Value::Template(result) => Shape::Template(result),
			Value::Items(items) => Shape::Items(items),
			Value::Empty | Value::Text(_) | Value::Integer(_) | Value::Float(_) | Value::Bool(_) => Shape::Primitive(value),
		}
	}
}

/// Invokes deferred values until something else comes out, at most `limit` times.
///
/// The result is never [`Shape::Deferred`]. Items are left as they are.
///
/// # Errors
///
/// Iff a deferred value fails or panics, or more than `limit` invocations would be needed.
pub fn resolve(value: &Value, limit: usize) -> Result<Cow<'_, Value>, ResolutionError> {
	let mut current = Cow::Borrowed(value);
	let mut invocations = 0;
	while let Value::Thunk(thunk) = &*current {
		if invocations == limit {
			return Err(ResolutionError::TrampolineLimit { limit });
		}
		invocations += 1;
		let next = thunk.invoke()?;
		current = Cow::Owned(next);
	}
	Ok(current)
}

/// Like [`resolve`], but also resolves deferred values inside items, recursively.
///
/// At most `depth_limit` levels of items may nest.
///
/// # Errors
///
/// Iff resolving the value or any of its items fails, or items nest too deeply.
pub fn resolve_deep(value: &Value, limit: usize, depth_limit: usize) -> Result<Cow<'_, Value>, ResolutionError> {
	resolve_nested(value, limit, depth_limit, 0)
}

fn resolve_nested(value: &Value, limit: usize, depth_limit: usize, depth: usize) -> Result<Cow<'_, Value>, ResolutionError> {
	let resolved = resolve(value, limit)?;
	let items = match &*resolved {
		Value::Items(items) => items,
		_ => return Ok(resolved),
	};
	if depth >= depth_limit {
		return Err(ResolutionError::DepthLimit { limit: depth_limit });
	}

	let mut resolved_items = Vec::with_capacity(items.len());
	let mut changed = false;
	for item in items {
		let item = resolve_nested(item, limit, depth_limit, depth + 1)?;
		changed |= matches!(item, Cow::Owned(_));
		resolved_items.push(item);
	}
	if changed {
		Ok(Cow::Owned(Value::Items(resolved_items.into_iter().map(Cow::into_owned).collect())))
	} else {
		drop(resolved_items);
		Ok(resolved)
	}
}

/// Coerces a value resolved with [`resolve_deep`] into an attribute value.
///
/// # Errors
///
/// Iff the value is or contains a nested template.
pub fn attribute_text(value: &Value) -> Result<String, ResolutionError> {
	match value {
		Value::Template(_) => Err(ResolutionError::TemplateInAttribute),
		Value::Items(items) => items.iter().map(attribute_text).collect(),
		// Not reachable for resolved values.
		Value::Thunk(_) => Ok(String::new()),
		primitive => Ok(primitive.primitive_text().unwrap_or_default()),
	}
}

impl From<()> for Value {
	fn from(_: ()) -> Self {
		Value::Empty
	}
}

impl From<&str> for Value {
	fn from(text: &str) -> Self {
		Value::Text(text.into())
	}
}

impl From<&String> for Value {
	fn from(text: &String) -> Self {
		Value::Text(text.as_str().into())
	}
}

impl From<String> for Value {
	fn from(text: String) -> Self {
		Value::Text(text.into())
	}
}

impl From<Rc<str>> for Value {
	fn from(text: Rc<str>) -> Self {
		Value::Text(text)
	}
}

impl From<char> for Value {
	fn from(character: char) -> Self {
		Value::Text(character.to_string().into())
	}
}

macro_rules! from_integer {
	($($integer:ty),*$(,)?) => {$(
		impl From<$integer> for Value {
			fn from(integer: $integer) -> Self {
				Value::Integer(integer.into())
			}
		}
	)*};
}
from_integer!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! from_wide_integer {
	($($integer:ty),*$(,)?) => {$(
		impl From<$integer> for Value {
			#[allow(clippy::cast_precision_loss)]
			fn from(integer: $integer) -> Self {
				i64::try_from(integer).map_or(Value::Float(integer as f64), Value::Integer)
			}
		}
	)*};
}
from_wide_integer!(u64, usize, isize, i128, u128);

impl From<f32> for Value {
	fn from(float: f32) -> Self {
		Value::Float(float.into())
	}
}

impl From<f64> for Value {
	fn from(float: f64) -> Self {
		Value::Float(float)
	}
}

impl From<bool> for Value {
	fn from(flag: bool) -> Self {
		Value::Bool(flag)
	}
}

impl From<TemplateResult> for Value {
	fn from(result: TemplateResult) -> Self {
		Value::Template(result)
	}
}

impl From<Thunk> for Value {
	fn from(thunk: Thunk) -> Self {
		Value::Thunk(thunk)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(option: Option<T>) -> Self {
		option.map_or(Value::Empty, Into::into)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(items: Vec<T>) -> Self {
		Value::items(items)
	}
}
