//! The output tree primitives rendering is expressed in.

use core::{fmt::Debug, hash::Hash};

/// A live output tree that templates are rendered into.
///
/// Mutations are assumed not to fail for the inputs the renderer produces.
/// Implementations that can fail anyway should log and carry on.
pub trait Dom {
	/// A handle to one node. Cloning must not clone the node itself.
	type Node: Clone + PartialEq + Debug;

	/// Identity of a node, stable for as long as the node lives.
	type Key: Copy + Eq + Hash + Debug;

	fn key(&self, node: &Self::Node) -> Self::Key;

	fn create_element(&mut self, name: &str, namespace: Option<&str>) -> Self::Node;
	fn create_text(&mut self, data: &str) -> Self::Node;
	fn create_comment(&mut self, data: &str) -> Self::Node;

	/// Replaces the whole value of one attribute.
	fn set_attribute(&mut self, element: &Self::Node, name: &str, value: &str);

	/// Replaces the data of a text node.
	fn set_text(&mut self, node: &Self::Node, data: &str);

	/// Inserts `node` into `parent` before `reference`, or at the end if there is no reference.
	///
	/// If `node` already has a parent, it is moved.
	fn insert_before(&mut self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>);

	fn append_child(&mut self, parent: &Self::Node, node: &Self::Node) {
		self.insert_before(parent, node, None);
	}

	/// Detaches `node` (and with it its subtree) from its parent, if any.
	fn remove(&mut self, node: &Self::Node);

	fn child(&self, node: &Self::Node, index: usize) -> Option<Self::Node>;

	fn first_child(&self, node: &Self::Node) -> Option<Self::Node> {
		self.child(node, 0)
	}

	fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
}
