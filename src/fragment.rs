//! Host-independent structural trees and the markup parsers producing them.
//!
//! A [`Fragment`] is what a compiled [`Template`](`crate::Template`) clones for each instance.
//! It's produced once per literal by a [`Parser`], which is the only part of the crate that interprets markup.

use crate::error::ParseError;
use html5gum::{State, Token, Tokenizer};
use tracing::{debug, instrument};

/// Namespace of `<svg>` and its descendants.
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// HTML void elements that cannot have children.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// A parsed sequence of sibling nodes without a parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
	pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
	Element(Element),
	Text(String),
	Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
	/// Tag name as reported by the parser.
	pub name: String,
	pub namespace: Option<String>,
	/// Attributes as (name, value) pairs. Names are as reported by the parser, which is usually lower-case.
	pub attributes: Vec<(String, String)>,
	pub children: Vec<Node>,
}

impl Element {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			namespace: None,
			attributes: Vec::new(),
			children: Vec::new(),
		}
	}

	/// Appends text, merging it into a preceding text node like a tree builder would.
	fn push_text(&mut self, text: &str) {
		push_text(&mut self.children, text);
	}
}

fn push_text(children: &mut Vec<Node>, text: &str) {
	if text.is_empty() {
		return;
	}
	if let Some(Node::Text(existing)) = children.last_mut() {
		existing.push_str(text);
	} else {
		children.push(Node::Text(text.to_owned()));
	}
}

/// The tree-construction facility templates are compiled with.
///
/// Implementations must follow standard HTML parsing rules closely enough that a [sentinel](`crate::marker::sentinel`)
/// written in attribute value position ends up as that attribute's exact value,
/// and that a sentinel in text position ends up inside a text node.
/// Parsers may move content. Templates whose sentinels end up out of source order then fail to compile.
pub trait Parser {
	/// Parses `markup` as the content of a `<template>` element.
	///
	/// # Errors
	///
	/// Iff the markup can't be parsed at all. Recoverable markup errors should be recovered from, like a browser would.
	fn parse(&self, markup: &str) -> Result<Fragment, ParseError>;
}

/// Parses markup with the [`html5gum`] tokenizer and a simple stack-based tree builder.
///
/// Unlike a browser, this doesn't reparent misnested content (for example inside tables).
///
/// Static attributes are reported sorted by name rather than in source order, since the tokenizer collects them into an ordered map.
/// Rendered output therefore lists them alphabetically.
#[derive(Debug, Clone, Copy, Default)]
pub struct Html5Parser;

impl Parser for Html5Parser {
	#[instrument(skip(markup))]
	fn parse(&self, markup: &str) -> Result<Fragment, ParseError> {
		let mut tokenizer = Tokenizer::new(markup);
		let mut stack: Vec<Element> = Vec::new();
		let mut roots: Vec<Node> = Vec::new();

		while let Some(token) = tokenizer.next() {
			let token = token.map_err(|error| ParseError::new(format!("{:?}", error)))?;
			match token {
				Token::StartTag(tag) => {
					let name = String::from_utf8_lossy(&tag.name).to_ascii_lowercase();
					let mut element = Element::new(name.clone());
					element.namespace = if name == "svg" {
						Some(SVG_NAMESPACE.to_owned())
					} else {
						stack.last().and_then(|parent| parent.namespace.clone())
					};
					element.attributes = tag
						.attributes
						.iter()
						.map(|(name, value)| (String::from_utf8_lossy(name).to_ascii_lowercase(), String::from_utf8_lossy(value).into_owned()))
						.collect();

					if tag.self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
						attach(&mut stack, &mut roots, element);
					} else {
						match name.as_str() {
							"script" | "style" => tokenizer.set_state(State::ScriptData),
							"textarea" | "title" => tokenizer.set_state(State::RcData),
							_ => (),
						}
						stack.push(element);
					}
				}
				Token::EndTag(tag) => {
					let name = String::from_utf8_lossy(&tag.name).to_ascii_lowercase();
					// Stray end tags are ignored.
					if let Some(index) = stack.iter().rposition(|element| element.name == name) {
						while stack.len() > index {
							if let Some(element) = stack.pop() {
								attach(&mut stack, &mut roots, element);
							}
						}
					}
				}
				Token::String(text) => {
					let text = String::from_utf8_lossy(&text);
					match stack.last_mut() {
						Some(parent) => parent.push_text(&text),
						None => push_text(&mut roots, &text),
					}
				}
				Token::Comment(comment) => {
					let comment = Node::Comment(String::from_utf8_lossy(&comment).into_owned());
					match stack.last_mut() {
						Some(parent) => parent.children.push(comment),
						None => roots.push(comment),
					}
				}
				Token::Doctype(_) => debug!("Ignoring doctype in template markup."),
				Token::Error(error) => debug!("Recovered from markup error: {:?}", error),
			}
		}

		while let Some(element) = stack.pop() {
			attach(&mut stack, &mut roots, element);
		}

		Ok(Fragment { children: roots })
	}
}

fn attach(stack: &mut [Element], roots: &mut Vec<Node>, element: Element) {
	match stack.last_mut() {
		Some(parent) => parent.children.push(Node::Element(element)),
		None => roots.push(Node::Element(element)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn element(name: &str, attributes: &[(&str, &str)], children: Vec<Node>) -> Node {
		let mut element = Element::new(name);
		element.attributes = attributes.iter().map(|&(name, value)| (name.to_owned(), value.to_owned())).collect();
		element.children = children;
		Node::Element(element)
	}

	fn text(text: &str) -> Node {
		Node::Text(text.to_owned())
	}

	#[test]
	fn mixed_content() {
		let fragment = Html5Parser.parse("<p>Hello <strong>world</strong> there</p>").unwrap();
		assert_eq!(
			fragment.children,
			vec![element("p", &[], vec![text("Hello "), element("strong", &[], vec![text("world")]), text(" there")])]
		);
	}

	#[test]
	fn attribute_names_are_lower_cased() {
		let fragment = Html5Parser.parse(r#"<DIV someProp="x"></DIV>"#).unwrap();
		assert_eq!(fragment.children, vec![element("div", &[("someprop", "x")], vec![])]);
	}

	#[test]
	fn top_level_text_and_void_elements() {
		let fragment = Html5Parser.parse("a<br>b<!--c-->").unwrap();
		assert_eq!(
			fragment.children,
			vec![text("a"), element("br", &[], vec![]), text("b"), Node::Comment("c".to_owned())]
		);
	}

	#[test]
	fn svg_namespace_is_inherited() {
		let fragment = Html5Parser.parse("<svg><circle/></svg>").unwrap();
		match &fragment.children[..] {
			[Node::Element(svg)] => {
				assert_eq!(svg.namespace.as_deref(), Some(SVG_NAMESPACE));
				match &svg.children[..] {
					[Node::Element(circle)] => assert_eq!(circle.namespace.as_deref(), Some(SVG_NAMESPACE)),
					other => panic!("unexpected children: {:?}", other),
				}
			}
			other => panic!("unexpected fragment: {:?}", other),
		}
	}

	#[test]
	fn attributes_are_sorted_by_name() {
		let fragment = Html5Parser.parse(r#"<a title="t" class="c" href="h"></a>"#).unwrap();
		assert_eq!(fragment.children, vec![element("a", &[("class", "c"), ("href", "h"), ("title", "t")], vec![])]);
	}
}
