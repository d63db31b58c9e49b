//! An in-memory [`Dom`] backed by an arena of index-addressed nodes.
//!
//! Every mutation is recorded, which makes it possible to check exactly what a render touched.

use crate::{dom::Dom, fragment::VOID_ELEMENTS};
use tracing::warn;

/// Handle of a node in an [`ArenaDom`]. Only meaningful for the arena that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One recorded tree mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
	SetAttribute { element: NodeId, name: String, value: String },
	SetText { node: NodeId, data: String },
	Insert { parent: NodeId, node: NodeId },
	Remove { node: NodeId },
}

#[derive(Debug)]
enum Data {
	Element {
		name: String,
		namespace: Option<String>,
		attributes: Vec<(String, String)>,
	},
	Text(String),
	Comment(String),
}

#[derive(Debug)]
struct Slot {
	data: Data,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

/// Nodes are never freed. Removed nodes stay valid and can be reinserted.
#[derive(Debug, Default)]
pub struct ArenaDom {
	slots: Vec<Slot>,
	mutations: Vec<Mutation>,
}

impl ArenaDom {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn push(&mut self, data: Data) -> NodeId {
		self.slots.push(Slot {
			data,
			parent: None,
			children: Vec::new(),
		});
		NodeId(self.slots.len() - 1)
	}

	/// Shorthand for an HTML element without namespace.
	pub fn element(&mut self, name: &str) -> NodeId {
		self.create_element(name, None)
	}

	/// Number of nodes ever created.
	#[must_use]
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> &[NodeId] {
		&self.slots[node.0].children
	}

	/// The tag name of an element.
	#[must_use]
	pub fn name(&self, node: NodeId) -> Option<&str> {
		match &self.slots[node.0].data {
			Data::Element { name, .. } => Some(name),
			Data::Text(_) | Data::Comment(_) => None,
		}
	}

	#[must_use]
	pub fn namespace(&self, node: NodeId) -> Option<&str> {
		match &self.slots[node.0].data {
			Data::Element { namespace, .. } => namespace.as_deref(),
			Data::Text(_) | Data::Comment(_) => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		match &self.slots[node.0].data {
			Data::Element { attributes, .. } => attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.as_str()),
			Data::Text(_) | Data::Comment(_) => None,
		}
	}

	/// The data of a text node.
	#[must_use]
	pub fn text(&self, node: NodeId) -> Option<&str> {
		match &self.slots[node.0].data {
			Data::Text(data) => Some(data),
			Data::Element { .. } | Data::Comment(_) => None,
		}
	}

	/// Concatenated data of all descendant text nodes.
	#[must_use]
	pub fn text_content(&self, node: NodeId) -> String {
		let mut text = String::new();
		self.collect_text(node, &mut text);
		text
	}

	fn collect_text(&self, node: NodeId, text: &mut String) {
		let slot = &self.slots[node.0];
		match &slot.data {
			Data::Text(data) => text.push_str(data),
			Data::Comment(_) => (),
			Data::Element { .. } => {
				for &child in &slot.children {
					self.collect_text(child, text);
				}
			}
		}
	}

	/// Serializes the children of `node`.
	#[must_use]
	pub fn inner_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		for &child in &self.slots[node.0].children {
			self.write_html(child, &mut html);
		}
		html
	}

	#[must_use]
	pub fn outer_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		self.write_html(node, &mut html);
		html
	}

	fn write_html(&self, node: NodeId, html: &mut String) {
		let slot = &self.slots[node.0];
		match &slot.data {
			Data::Text(data) => html.push_str(&escape(data, false)),
			Data::Comment(data) => {
				html.push_str("<!--");
				html.push_str(data);
				html.push_str("-->");
			}
			Data::Element { name, attributes, .. } => {
				html.push('<');
				html.push_str(name);
				for (name, value) in attributes {
					html.push(' ');
					html.push_str(name);
					html.push_str("=\"");
					html.push_str(&escape(value, true));
					html.push('"');
				}
				html.push('>');
				if VOID_ELEMENTS.contains(&name.as_str()) {
					return;
				}
				for &child in &slot.children {
					self.write_html(child, html);
				}
				html.push_str("</");
				html.push_str(name);
				html.push('>');
			}
		}
	}

	#[must_use]
	pub fn mutations(&self) -> &[Mutation] {
		&self.mutations
	}

	/// Returns and forgets the mutations recorded so far.
	pub fn take_mutations(&mut self) -> Vec<Mutation> {
		std::mem::take(&mut self.mutations)
	}

	fn detach(&mut self, node: NodeId) {
		if let Some(parent) = self.slots[node.0].parent.take() {
			self.slots[parent.0].children.retain(|&child| child != node);
		}
	}
}

fn escape(text: &str, attribute: bool) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' if !attribute => escaped.push_str("&lt;"),
			'>' if !attribute => escaped.push_str("&gt;"),
			'"' if attribute => escaped.push_str("&quot;"),
			'\u{a0}' => escaped.push_str("&nbsp;"),
			c => escaped.push(c),
		}
	}
	escaped
}

impl Dom for ArenaDom {
	type Node = NodeId;
	type Key = NodeId;

	fn key(&self, node: &NodeId) -> NodeId {
		*node
	}

	fn create_element(&mut self, name: &str, namespace: Option<&str>) -> NodeId {
		self.push(Data::Element {
			name: name.to_owned(),
			namespace: namespace.map(ToOwned::to_owned),
			attributes: Vec::new(),
		})
	}

	fn create_text(&mut self, data: &str) -> NodeId {
		self.push(Data::Text(data.to_owned()))
	}

	fn create_comment(&mut self, data: &str) -> NodeId {
		self.push(Data::Comment(data.to_owned()))
	}

	fn set_attribute(&mut self, element: &NodeId, name: &str, value: &str) {
		match &mut self.slots[element.0].data {
			Data::Element { attributes, .. } => match attributes.iter_mut().find(|(n, _)| n == name) {
				Some((_, existing)) => value.clone_into(existing),
				None => attributes.push((name.to_owned(), value.to_owned())),
			},
			Data::Text(_) | Data::Comment(_) => return warn!("Tried to set attribute `{}` on a non-element {:?}. Ignoring.", name, element),
		}
		self.mutations.push(Mutation::SetAttribute {
			element: *element,
			name: name.to_owned(),
			value: value.to_owned(),
		});
	}

	fn set_text(&mut self, node: &NodeId, data: &str) {
		match &mut self.slots[node.0].data {
			Data::Text(existing) | Data::Comment(existing) => data.clone_into(existing),
			Data::Element { .. } => return warn!("Tried to set text data of element {:?}. Ignoring.", node),
		}
		self.mutations.push(Mutation::SetText {
			node: *node,
			data: data.to_owned(),
		});
	}

	fn insert_before(&mut self, parent: &NodeId, node: &NodeId, reference: Option<&NodeId>) {
		self.detach(*node);
		let children = &mut self.slots[parent.0].children;
		let index = match reference {
			None => children.len(),
			Some(reference) => children.iter().position(|child| child == reference).unwrap_or_else(|| {
				warn!("Reference node {:?} is not a child of {:?}. Appending instead.", reference, parent);
				children.len()
			}),
		};
		children.insert(index, *node);
		self.slots[node.0].parent = Some(*parent);
		self.mutations.push(Mutation::Insert {
			parent: *parent,
			node: *node,
		});
	}

	fn remove(&mut self, node: &NodeId) {
		self.detach(*node);
		self.mutations.push(Mutation::Remove { node: *node });
	}

	fn child(&self, node: &NodeId, index: usize) -> Option<NodeId> {
		self.slots[node.0].children.get(index).copied()
	}

	fn parent(&self, node: &NodeId) -> Option<NodeId> {
		self.slots[node.0].parent
	}

	fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
		let parent = self.slots[node.0].parent?;
		let siblings = &self.slots[parent.0].children;
		let index = siblings.iter().position(|child| child == node)?;
		siblings.get(index + 1).copied()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insertion_and_serialization() {
		let mut dom = ArenaDom::new();
		let div = dom.element("div");
		let b = dom.element("b");
		let text = dom.create_text("1 < 2");
		dom.append_child(&div, &text);
		dom.insert_before(&div, &b, Some(&text));
		dom.set_attribute(&div, "title", "\"quoted\"");
		assert_eq!(dom.outer_html(div), r#"<div title="&quot;quoted&quot;"><b></b>1 &lt; 2</div>"#);
		assert_eq!(dom.next_sibling(&b), Some(text));
		assert_eq!(dom.next_sibling(&text), None);

		dom.remove(&b);
		assert_eq!(dom.inner_html(div), "1 &lt; 2");
		assert_eq!(dom.parent(&b), None);
		assert_eq!(dom.mutations().len(), 4);
	}

	#[test]
	fn moving_detaches_first() {
		let mut dom = ArenaDom::new();
		let a = dom.element("a");
		let b = dom.element("b");
		let text = dom.create_text("x");
		dom.append_child(&a, &text);
		dom.append_child(&b, &text);
		assert!(dom.children(a).is_empty());
		assert_eq!(dom.children(b), &[text]);
	}
}
