//! The structural compiler and the literal-identity cache in front of it.

use crate::{
	error::{MarkerContext, StructuralError},
	fragment::{Element, Fragment, Html5Parser, Node, Parser},
	marker::{self, Piece, Position},
	template::{AttributePart, Literal, LiteralId, NodePart, Part, Path, Template, TemplateResult},
	value::Value,
};
use core::{cell::RefCell, fmt};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{instrument, trace, warn};

/// Compiles `segments` into a [`Template`] identified by `literal`.
///
/// The segments are joined with indexed sentinels, parsed, and walked depth-first in pre-order.
/// Each sentinel-valued attribute and each sentinel inside text becomes one [`Part`], in source order.
///
/// # Errors
///
/// Iff a sentinel is in an unsupported position or the parsed tree doesn't agree with the source text about where sentinels are.
/// This includes parsers that move content around, as browsers do inside tables.
#[instrument(skip(parser))]
pub fn compile(literal: LiteralId, segments: &'static [&'static str], parser: &dyn Parser) -> Result<Template, StructuralError> {
	let positions = marker::scan(segments)?;
	let markup = marker::join(segments);
	let fragment = parser.parse(&markup)?;

	let mut walker = Walker {
		positions: &positions,
		parts: Vec::with_capacity(positions.len()),
	};
	let children = walker.walk_children(fragment.children, &mut Vec::new())?;

	if walker.parts.len() < positions.len() {
		warn!("The parsed markup dropped value {} of the literal.", walker.parts.len());
		return Err(StructuralError::PartCount {
			expected: positions.len(),
			found: walker.parts.len(),
		});
	}

	Ok(Template {
		literal,
		segments,
		fragment: Fragment { children },
		parts: walker.parts,
	})
}

struct Walker<'a> {
	positions: &'a [Position],
	parts: Vec<Part>,
}

impl<'a> Walker<'a> {
	/// The source position of the next part, after checking that the sentinel `found` in the parsed tree is the one written there.
	fn expect(&self, found: usize) -> Result<&'a Position, StructuralError> {
		let index = self.parts.len();
		let position = self.positions.get(index).ok_or(StructuralError::PartCount {
			expected: self.positions.len(),
			found: index + 1,
		})?;
		if found != index {
			warn!("The parsed markup has value {} where the literal has value {}.", found, index);
			return Err(StructuralError::Misaligned { index });
		}
		Ok(position)
	}

	fn walk_children(&mut self, children: Vec<Node>, path: &mut Vec<usize>) -> Result<Vec<Node>, StructuralError> {
		let mut output = Vec::with_capacity(children.len());
		for child in children {
			match child {
				Node::Element(element) => {
					path.push(output.len());
					let element = self.walk_element(element, path)?;
					path.pop();
					output.push(Node::Element(element));
				}
				Node::Text(text) if marker::contains_sentinel(&text) => {
					for piece in marker::split(&text) {
						match piece {
							Piece::Text(run) => output.push(Node::Text(run.to_owned())),
							Piece::Sentinel(found) => {
								if *self.expect(found)? != Position::Child {
									return Err(StructuralError::Misaligned { index: found });
								}
								path.push(output.len());
								self.parts.push(Part::Node(NodePart { path: Path::new(path.clone()) }));
								path.pop();
								output.push(Node::Text(String::new()));
							}
						}
					}
				}
				Node::Comment(comment) if marker::contains_sentinel(&comment) => {
					let index = self.parts.len();
					return Err(StructuralError::UnsupportedPosition { index, context: MarkerContext::Comment });
				}
				other => output.push(other),
			}
		}
		Ok(output)
	}

	fn walk_element(&mut self, mut element: Element, path: &mut Vec<usize>) -> Result<Element, StructuralError> {
		if marker::contains_sentinel(&element.name) {
			let index = self.parts.len();
			return Err(StructuralError::UnsupportedPosition { index, context: MarkerContext::TagName });
		}

		let mut bound = Vec::new();
		let mut attributes = Vec::with_capacity(element.attributes.len());
		for (name, value) in element.attributes {
			if let Some(found) = marker::parse(&value) {
				bound.push((name, found));
			} else if marker::contains_sentinel(&name) {
				let index = self.parts.len();
				return Err(StructuralError::UnsupportedPosition { index, context: MarkerContext::AttributeName });
			} else if marker::contains_sentinel(&value) {
				let index = self.parts.len();
				return Err(StructuralError::UnsupportedPosition { index, context: MarkerContext::PartialAttributeValue { name } });
			} else {
				attributes.push((name, value));
			}
		}
		element.attributes = attributes;

		// The parser may report attributes in any order.
		bound.sort_by_key(|&(_, found)| found);
		for (name, found) in bound {
			let raw_name = match self.expect(found)? {
				Position::Attribute { raw_name } if name.eq_ignore_ascii_case(raw_name) => raw_name,
				_ => return Err(StructuralError::Misaligned { index: found }),
			};
			self.parts.push(Part::Attribute(AttributePart {
				path: Path::new(path.clone()),
				name,
				raw_name: raw_name.clone(),
			}));
		}

		element.children = self.walk_children(element.children, path)?;
		Ok(element)
	}
}

/// Explicit literal-identity cache: one [`Template`] per [`Literal`], compiled on first use.
///
/// Entries live as long as the cache unless [`TemplateCache::clear`] is called.
pub struct TemplateCache {
	parser: Box<dyn Parser>,
	templates: RefCell<HashMap<LiteralId, Rc<Template>>>,
}

impl Default for TemplateCache {
	fn default() -> Self {
		Self::new(Html5Parser)
	}
}

impl fmt::Debug for TemplateCache {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TemplateCache").field("templates", &self.templates.borrow().len()).finish_non_exhaustive()
	}
}

impl TemplateCache {
	pub fn new(parser: impl Parser + 'static) -> Self {
		Self {
			parser: Box::new(parser),
			templates: RefCell::default(),
		}
	}

	/// Looks up or compiles the template for `literal`.
	///
	/// A hit returns the same [`Rc`] every time. Failed compilations aren't cached.
	///
	/// # Errors
	///
	/// Iff `literal` can't be compiled. See [`compile`].
	pub fn template(&self, literal: &Literal) -> Result<Rc<Template>, StructuralError> {
		let id = literal.id();
		if let Some(template) = self.templates.borrow().get(&id) {
			trace!("Template cache hit for {:?}.", id);
			return Ok(template.clone());
		}

		trace!("Template cache miss for {:?}. Compiling.", id);
		let template = Rc::new(compile(id, literal.segments(), &*self.parser)?);
		self.templates.borrow_mut().insert(id, template.clone());
		Ok(template)
	}

	/// The tag invocation: pairs the cached template of `literal` with this evaluation's `values`.
	///
	/// # Errors
	///
	/// Iff `literal` can't be compiled or the number of values doesn't match it.
	pub fn html(&self, literal: &Literal, values: Vec<Value>) -> Result<TemplateResult, StructuralError> {
		let segments = literal.segments().len();
		if segments != values.len() + 1 {
			return Err(StructuralError::ValueCount { segments, values: values.len() });
		}
		Ok(TemplateResult {
			template: self.template(literal)?,
			values,
		})
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.templates.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.templates.borrow().is_empty()
	}

	/// Forgets all compiled templates. Live instances keep theirs.
	pub fn clear(&self) {
		self.templates.borrow_mut().clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ParseError;
	use pretty_assertions::assert_eq;

	fn compile_static(segments: &'static [&'static str]) -> Result<Template, StructuralError> {
		compile(Literal::new(segments).id(), segments, &Html5Parser)
	}

	fn paths(template: &Template) -> Vec<String> {
		template.parts().iter().map(|part| part.path().to_string()).collect()
	}

	#[test]
	fn text_parts_split_text_nodes() {
		let template = compile_static(&["<div>Hello ", "!</div>"]).unwrap();
		assert_eq!(paths(&template), vec!["0/1"]);
		match &template.fragment().children[..] {
			[Node::Element(div)] => assert_eq!(
				div.children,
				vec![Node::Text("Hello ".to_owned()), Node::Text(String::new()), Node::Text("!".to_owned())]
			),
			other => panic!("unexpected fragment: {:?}", other),
		}
	}

	#[test]
	fn adjacent_and_root_parts() {
		let template = compile_static(&["", "", " and <b>", "</b>"]).unwrap();
		assert_eq!(paths(&template), vec!["0", "1", "3/0"]);
		assert!(template.parts().iter().all(|part| matches!(part, Part::Node(_))));
	}

	#[test]
	fn parts_follow_source_order() {
		let template = compile_static(&[r#"<ul zeta=""#, r#"" alpha=""#, r#""><li>"#, r#"</li><li title=""#, r#""></li></ul>"#]).unwrap();
		let summary: Vec<_> = template
			.parts()
			.iter()
			.map(|part| match part {
				Part::Attribute(attribute) => format!("{}@{}", attribute.name(), attribute.path()),
				Part::Node(node) => format!("#text@{}", node.path()),
			})
			.collect();
		assert_eq!(summary, vec!["zeta@0", "alpha@0", "#text@0/0/0", "title@0/1"]);
	}

	#[test]
	fn raw_attribute_names_are_kept() {
		let template = compile_static(&[r#"<div someProp=""#, r#""></div>"#]).unwrap();
		match template.parts() {
			[Part::Attribute(attribute)] => {
				assert_eq!(attribute.name(), "someprop");
				assert_eq!(attribute.raw_name(), "someProp");
			}
			other => panic!("unexpected parts: {:?}", other),
		}
		match &template.fragment().children[..] {
			[Node::Element(div)] => assert!(div.attributes.is_empty()),
			other => panic!("unexpected fragment: {:?}", other),
		}
	}

	#[test]
	fn duplicate_bound_attributes_are_reported() {
		assert!(matches!(
			compile_static(&["<div a=", " a=", "></div>"]),
			Err(StructuralError::PartCount { expected: 2, found: 1 })
		));
	}

	#[test]
	fn unsupported_positions_are_reported() {
		assert!(matches!(
			compile_static(&["<!-- ", " -->"]),
			Err(StructuralError::UnsupportedPosition { index: 0, context: MarkerContext::Comment })
		));
	}

	/// Moves text out of tables like a browser's tree builder does.
	struct FosteringParser;

	impl Parser for FosteringParser {
		fn parse(&self, markup: &str) -> Result<Fragment, ParseError> {
			let parsed = Html5Parser.parse(markup)?;
			let mut children = Vec::new();
			for node in parsed.children {
				match node {
					Node::Element(mut table) if table.name == "table" => {
						let (text, rest): (Vec<_>, Vec<_>) = table.children.into_iter().partition(|child| matches!(child, Node::Text(_)));
						children.extend(text);
						table.children = rest;
						children.push(Node::Element(table));
					}
					other => children.push(other),
				}
			}
			Ok(Fragment { children })
		}
	}

	#[test]
	fn moved_sentinels_are_reported() {
		static SEGMENTS: &[&str] = &["<table><tbody><tr><td>", "</td></tr></tbody>", "</table>"];
		assert!(compile(Literal::new(SEGMENTS).id(), SEGMENTS, &Html5Parser).is_ok());
		assert!(matches!(
			compile(Literal::new(SEGMENTS).id(), SEGMENTS, &FosteringParser),
			Err(StructuralError::Misaligned { index: 0 })
		));

		let cache = TemplateCache::new(FosteringParser);
		assert!(matches!(
			crate::html!(cache; ["<table><tbody><tr><td>", "</td></tr></tbody>", "</table>"], "A", "B"),
			Err(StructuralError::Misaligned { index: 0 })
		));
		assert!(cache.is_empty());
	}

	#[test]
	fn attribute_order_from_the_parser_does_not_matter() {
		let template = compile_static(&["<a z=", " y=", " x=", "></a>"]).unwrap();
		let names: Vec<_> = template
			.parts()
			.iter()
			.map(|part| match part {
				Part::Attribute(attribute) => attribute.raw_name().to_owned(),
				Part::Node(_) => panic!("unexpected node part"),
			})
			.collect();
		assert_eq!(names, vec!["z", "y", "x"]);
	}
}
