//! Browser bindings: a [`Dom`] over [`web_sys`] nodes and a [`Parser`] using the browser's own HTML parser.

use crate::{
	dom::Dom,
	error::{ParseError, ResolutionError},
	fragment::{self, Fragment, Parser},
	instance::AttributeStrategy,
	template::AttributePart,
	value::{self, Value},
};
use core::cell::Cell;
use js_sys::{Object, Reflect, WeakMap};
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CharacterData, Comment, Document, Element, HtmlTemplateElement, NamedNodeMap, Node, NodeList, Text};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Identity of a [`web_sys::Node`] as assigned by one [`WebDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WebKey(u32);

/// Renders into live browser nodes created by `document`.
///
/// Host failures (which the renderer's own operations shouldn't cause) are logged as errors and otherwise ignored.
#[derive(Debug)]
pub struct WebDom {
	document: Document,
	keys: WeakMap,
	next_key: Cell<u32>,
}

impl WebDom {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self {
			document,
			keys: WeakMap::new(),
			next_key: Cell::new(0),
		}
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}
}

impl Dom for WebDom {
	type Node = Node;
	type Key = WebKey;

	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn key(&self, node: &Node) -> WebKey {
		let object: &Object = node.as_ref();
		if let Some(key) = self.keys.get(object).as_f64() {
			return WebKey(key as u32);
		}
		let key = self.next_key.get();
		self.next_key.set(key.wrapping_add(1));
		self.keys.set(object, &JsValue::from(key));
		WebKey(key)
	}

	fn create_element(&mut self, name: &str, namespace: Option<&str>) -> Node {
		let created = match namespace {
			Some(namespace) => self.document.create_element_ns(Some(namespace), name),
			None => self.document.create_element(name),
		};
		match created {
			Ok(element) => element.into(),
			Err(error) => {
				error!("Failed to create element {:?}: {:?}", name, error);
				self.document.create_comment(name).into()
			}
		}
	}

	fn create_text(&mut self, data: &str) -> Node {
		self.document.create_text_node(data).into()
	}

	fn create_comment(&mut self, data: &str) -> Node {
		self.document.create_comment(data).into()
	}

	fn set_attribute(&mut self, element: &Node, name: &str, value: &str) {
		match element.dyn_ref::<Element>() {
			Some(element) => {
				if let Err(error) = element.set_attribute(name, value) {
					error!("Failed to set attribute {:?}: {:?}", name, error);
				}
			}
			None => error!("Expected element to set attribute {:?} on, but found {:?}.", name, element),
		}
	}

	fn set_text(&mut self, node: &Node, data: &str) {
		match node.dyn_ref::<CharacterData>() {
			Some(character_data) => character_data.set_data(data),
			None => error!("Expected text node, but found {:?}.", node),
		}
	}

	fn insert_before(&mut self, parent: &Node, node: &Node, reference: Option<&Node>) {
		if let Err(error) = parent.insert_before(node, reference) {
			error!("Failed to insert node: {:?}", error);
		}
	}

	fn remove(&mut self, node: &Node) {
		if let Some(parent) = node.parent_node() {
			if let Err(error) = parent.remove_child(node) {
				error!("Failed to remove node: {:?}", error);
			}
		}
	}

	fn child(&self, node: &Node, index: usize) -> Option<Node> {
		node.child_nodes().item(u32::try_from(index).ok()?)
	}

	fn first_child(&self, node: &Node) -> Option<Node> {
		node.first_child()
	}

	fn parent(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	fn next_sibling(&self, node: &Node) -> Option<Node> {
		node.next_sibling()
	}
}

/// Parses markup by assigning it to a `<template>` element's ***innerHTML*** and reading back the result.
///
/// This is exactly the tree a browser would build, including table fix-ups.
#[derive(Debug, Clone)]
pub struct WebParser {
	document: Document,
}

impl WebParser {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self { document }
	}
}

impl Parser for WebParser {
	#[instrument(skip(self, markup))]
	fn parse(&self, markup: &str) -> Result<Fragment, ParseError> {
		let template = self
			.document
			.create_element("template")
			.map_err(|error| ParseError::new(format!("{:?}", error)))?
			.dyn_into::<HtmlTemplateElement>()
			.map_err(|element| ParseError::new(format!("not a template element: {:?}", element)))?;
		template.set_inner_html(markup);
		let content = template.content();
		Ok(Fragment {
			children: load_child_nodes(&content.child_nodes()),
		})
	}
}

fn load_child_nodes(child_nodes: &NodeList) -> Vec<fragment::Node> {
	(0..child_nodes.length())
		.filter_map(|i| child_nodes.item(i))
		.filter_map(|child| {
			if let Some(element) = child.dyn_ref::<Element>() {
				Some(fragment::Node::Element(load_element(element)))
			} else if let Some(text) = child.dyn_ref::<Text>() {
				Some(fragment::Node::Text(text.data()))
			} else if let Some(comment) = child.dyn_ref::<Comment>() {
				Some(fragment::Node::Comment(comment.data()))
			} else {
				warn!("Skipping unrecognised child node: {:?}", child);
				None
			}
		})
		.collect()
}

fn load_element(element: &Element) -> fragment::Element {
	let mut loaded = fragment::Element::new(element.local_name());
	loaded.namespace = element.namespace_uri().filter(|namespace| namespace != HTML_NAMESPACE);
	loaded.attributes = load_attributes(&element.attributes());
	loaded.children = load_child_nodes(&element.child_nodes());
	loaded
}

fn load_attributes(attributes: &NamedNodeMap) -> Vec<(String, String)> {
	(0..attributes.length())
		.filter_map(|i| attributes.item(i))
		.map(|attribute| (attribute.name(), attribute.value()))
		.collect()
}

/// Sets JavaScript properties instead of attributes for parts whose raw name starts with `.`, as in `.value=${x}`.
///
/// The property name is the raw name without the dot, so its case is kept.
/// Primitives keep their JavaScript type, [`Value::Empty`] becomes `undefined` and items are concatenated into a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyStrategy;

impl AttributeStrategy<WebDom> for PropertyStrategy {
	fn claims(&self, part: &AttributePart) -> bool {
		part.raw_name().starts_with('.')
	}

	fn commit(&self, _: &mut WebDom, element: &Node, part: &AttributePart, value: &Value) -> Result<(), ResolutionError> {
		let property = &part.raw_name()[1..];
		#[allow(clippy::cast_precision_loss)]
		let js_value = match value {
			Value::Empty => JsValue::UNDEFINED,
			Value::Text(text) => JsValue::from_str(text),
			Value::Integer(integer) => JsValue::from_f64(*integer as f64),
			Value::Float(float) => JsValue::from_f64(*float),
			Value::Bool(flag) => JsValue::from_bool(*flag),
			other => JsValue::from_str(&value::attribute_text(other)?),
		};
		trace!("Setting property {:?}.", property);
		match Reflect::set(element.as_ref(), &JsValue::from_str(property), &js_value) {
			Ok(true) => Ok(()),
			Ok(false) => Err(ResolutionError::Host {
				message: format!("property {:?} is read-only", property),
			}),
			Err(error) => Err(ResolutionError::Host {
				message: format!("{:?}", error),
			}),
		}
	}
}
