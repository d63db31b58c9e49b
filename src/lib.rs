#![doc(html_root_url = "https://docs.rs/stencil-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod arena;
pub mod compile;
pub mod dom;
pub mod error;
pub mod fragment;
mod instance;
pub mod marker;
pub mod render;
pub mod template;
pub mod value;
pub mod web;

pub use arena::{ArenaDom, Mutation, NodeId};
pub use compile::{compile, TemplateCache};
pub use dom::Dom;
pub use error::{Diagnostic, MarkerContext, ParseError, ResolutionError, StructuralError, ThunkError};
pub use fragment::{Fragment, Html5Parser, Parser};
pub use instance::{AttributeStrategy, SetAttribute};
pub use render::{Config, RenderReport, Renderer};
pub use template::{AttributePart, Literal, LiteralId, NodePart, Part, Path, Template, TemplateResult};
pub use value::{Thunk, Value};

/// Evaluates a template call site.
///
/// Expands to a call of [`TemplateCache::html`] with a `static` [`Literal`] unique to this invocation,
/// so the literal is compiled at most once per cache no matter how often the expression is evaluated.
/// Each value is converted with [`Value::from`].
///
/// ```
/// use stencil_dom::{html, TemplateCache};
///
/// let cache = TemplateCache::default();
/// let greet = |name: &str| html!(cache; ["<p>Hello ", "!</p>"], name.to_owned());
///
/// let a = greet("Ada").unwrap();
/// let b = greet("Grace").unwrap();
/// assert!(std::rc::Rc::ptr_eq(a.template(), b.template()));
/// assert_eq!(cache.len(), 1);
/// ```
///
/// # Errors
///
/// The expression evaluates to a [`Result`], which is [`Err`] iff the literal can't be compiled.
#[macro_export]
macro_rules! html {
	($cache:expr; [$($segment:literal),+ $(,)?] $(, $value:expr)* $(,)?) => {{
		static LITERAL: $crate::Literal = $crate::Literal::new(&[$($segment),+]);
		$crate::TemplateCache::html(&$cache, &LITERAL, ::std::vec![$($crate::Value::from($value)),*])
	}};
}
