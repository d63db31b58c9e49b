//! Live template instances and the bindings updating their parts.

use crate::{
	dom::Dom,
	error::{Diagnostic, ResolutionError},
	fragment,
	render::Config,
	template::{AttributePart, Part, Path, Template, TemplateResult},
	value::{self, Shape, Value},
};
use std::{borrow::Cow, mem, rc::Rc};
use tracing::{error, trace, trace_span, warn};

/// Decides how an attribute part's value reaches its element.
///
/// Strategies are chosen per part when an instance is created, so they can be swapped without recompiling templates.
pub trait AttributeStrategy<D: Dom> {
	/// Whether this strategy handles `part`.
	fn claims(&self, part: &AttributePart) -> bool;

	/// Applies `value` to `element`.
	///
	/// `value` contains no [`Value::Thunk`]s at any depth.
	///
	/// # Errors
	///
	/// Iff `value` can't be applied. The part is then committed again with [`Value::Empty`].
	fn commit(&self, dom: &mut D, element: &D::Node, part: &AttributePart, value: &Value) -> Result<(), ResolutionError>;
}

/// Sets the attribute named by the parsed name to the value's text. Used for parts no other strategy claims.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetAttribute;

impl<D: Dom> AttributeStrategy<D> for SetAttribute {
	fn claims(&self, _: &AttributePart) -> bool {
		true
	}

	fn commit(&self, dom: &mut D, element: &D::Node, part: &AttributePart, value: &Value) -> Result<(), ResolutionError> {
		let text = value::attribute_text(value)?;
		if cfg!(feature = "dangerous-logging") {
			trace!("Setting attribute {:?} to {:?}.", part.name(), text);
		}
		dom.set_attribute(element, part.name(), &text);
		Ok(())
	}
}

/// Everything part updates need besides the part itself.
pub(crate) struct Context<'a, D: Dom> {
	pub(crate) dom: &'a mut D,
	pub(crate) config: &'a Config,
	pub(crate) strategies: &'a [Rc<dyn AttributeStrategy<D>>],
	pub(crate) diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a, D: Dom> Context<'a, D> {
	pub(crate) fn report(&mut self, part: usize, depth: usize, error: ResolutionError) {
		warn!(part, depth, "Part renders empty instead: {}", error);
		self.diagnostics.push(Diagnostic { part, depth, error });
	}

	fn strategy_for(&self, part: &AttributePart) -> Rc<dyn AttributeStrategy<D>> {
		match self.strategies.iter().find(|strategy| strategy.claims(part)) {
			Some(strategy) => strategy.clone(),
			None => Rc::new(SetAttribute),
		}
	}
}

/// A [`Template`] cloned into a [`Dom`], with each part bound to its node in that clone.
pub(crate) struct Instance<D: Dom> {
	template: Rc<Template>,
	roots: Vec<D::Node>,
	parts: Vec<InstancePart<D>>,
}

enum InstancePart<D: Dom> {
	Attribute(AttributeBinding<D>),
	Node(NodeBinding<D>),
}

impl<D: Dom> Instance<D> {
	/// Clones `template`'s structure into detached nodes and locates each part in them.
	///
	/// # Errors
	///
	/// Iff the host tree doesn't match the template structure. Carries the index of the first unlocatable part.
	pub(crate) fn new(cx: &mut Context<'_, D>, template: Rc<Template>) -> Result<Self, (usize, ResolutionError)> {
		let roots: Vec<_> = template.fragment().children.iter().map(|node| materialize(cx.dom, node)).collect();

		let mut parts = Vec::with_capacity(template.parts().len());
		for (index, part) in template.parts().iter().enumerate() {
			let node = locate(cx.dom, &roots, part.path()).ok_or_else(|| {
				(
					index,
					ResolutionError::UnresolvedPath {
						path: part.path().to_string(),
					},
				)
			})?;
			parts.push(match part {
				Part::Attribute(attribute) => InstancePart::Attribute(AttributeBinding {
					element: node,
					descriptor: attribute.clone(),
					strategy: cx.strategy_for(attribute),
					last: None,
				}),
				Part::Node(_) => InstancePart::Node(NodeBinding::new(node)),
			});
		}

		trace!("Instantiated template with {} root(s) and {} part(s).", roots.len(), parts.len());
		Ok(Self { template, roots, parts })
	}

	pub(crate) fn template(&self) -> &Rc<Template> {
		&self.template
	}

	pub(crate) fn roots(&self) -> &[D::Node] {
		&self.roots
	}

	/// Updates part `i` with `values[i]`, in ascending order.
	pub(crate) fn update(&mut self, cx: &mut Context<'_, D>, values: &[Value], depth: usize) {
		debug_assert_eq!(values.len(), self.parts.len());
		for (index, ((part, descriptor), value)) in self.parts.iter_mut().zip(self.template.parts()).zip(values).enumerate() {
			let span = if cfg!(feature = "log-paths") {
				trace_span!("Updating part", index, depth, path = %descriptor.path())
			} else {
				trace_span!("Updating part", index, depth)
			};
			let _enter = span.enter();
			match part {
				InstancePart::Attribute(binding) => binding.update(cx, index, value, depth),
				InstancePart::Node(binding) => binding.update(cx, index, value, depth),
			}
		}
	}

	/// Removes this instance's output from wherever it was inserted.
	pub(crate) fn detach(&mut self, dom: &mut D) {
		for (part, descriptor) in self.parts.iter_mut().zip(self.template.parts()) {
			// Output of deeper parts goes away with the elements containing it.
			if let (InstancePart::Node(binding), true) = (part, descriptor.path().is_root()) {
				binding.clear(dom);
			}
		}
		for root in &self.roots {
			dom.remove(root);
		}
	}

	/// The last node of this instance's output among its roots' siblings.
	fn last_node(&self) -> Option<D::Node> {
		let last = self.roots.len().checked_sub(1)?;
		for (part, descriptor) in self.parts.iter().zip(self.template.parts()).rev() {
			if let InstancePart::Node(binding) = part {
				if matches!(descriptor.path().indices(), [index] if *index == last) {
					return Some(binding.last_node());
				}
			}
		}
		self.roots.last().cloned()
	}
}

fn materialize<D: Dom>(dom: &mut D, node: &fragment::Node) -> D::Node {
	match node {
		fragment::Node::Element(element) => {
			let created = dom.create_element(&element.name, element.namespace.as_deref());
			for (name, value) in &element.attributes {
				dom.set_attribute(&created, name, value);
			}
			for child in &element.children {
				let child = materialize(dom, child);
				dom.append_child(&created, &child);
			}
			created
		}
		fragment::Node::Text(data) => dom.create_text(data),
		fragment::Node::Comment(data) => dom.create_comment(data),
	}
}

fn locate<D: Dom>(dom: &D, roots: &[D::Node], path: &Path) -> Option<D::Node> {
	let (first, rest) = path.indices().split_first()?;
	let mut node = roots.get(*first)?.clone();
	for &index in rest {
		node = dom.child(&node, index)?;
	}
	Some(node)
}

struct AttributeBinding<D: Dom> {
	element: D::Node,
	descriptor: AttributePart,
	strategy: Rc<dyn AttributeStrategy<D>>,
	/// The last committed primitive.
	last: Option<Value>,
}

impl<D: Dom> AttributeBinding<D> {
	fn update(&mut self, cx: &mut Context<'_, D>, index: usize, value: &Value, depth: usize) {
		let resolved = match value::resolve_deep(value, cx.config.max_thunk_depth, cx.config.depth_limit.saturating_sub(depth)) {
			Ok(resolved) => resolved,
			Err(error) => {
				let error = match error {
					ResolutionError::DepthLimit { .. } => ResolutionError::DepthLimit { limit: cx.config.depth_limit },
					error => error,
				};
				cx.report(index, depth, error);
				Cow::Owned(Value::Empty)
			}
		};

		if self.last.as_ref().is_some_and(|last| last.is_same_primitive(&resolved)) {
			return trace!("Attribute value unchanged.");
		}

		match self.strategy.commit(cx.dom, &self.element, &self.descriptor, &resolved) {
			Ok(()) => self.last = resolved.is_primitive().then(|| resolved.into_owned()),
			Err(error) => {
				cx.report(index, depth, error);
				self.last = None;
				if let Err(error) = self.strategy.commit(cx.dom, &self.element, &self.descriptor, &Value::Empty) {
					error!("Could not clear attribute {:?} either: {}", self.descriptor.raw_name(), error);
				}
			}
		}
	}
}

/// Owns an anchor (an empty text node placed at compile time) and the output rendered after it.
struct NodeBinding<D: Dom> {
	anchor: D::Node,
	content: Content<D>,
}

enum Content<D: Dom> {
	Empty,
	/// Stored in the anchor itself.
	Text(String),
	Template(Box<Instance<D>>),
	/// One binding per item, each with its own anchor after this binding's anchor.
	Items(Vec<NodeBinding<D>>),
}

impl<D: Dom> NodeBinding<D> {
	fn new(anchor: D::Node) -> Self {
		Self { anchor, content: Content::Empty }
	}

	fn last_node(&self) -> D::Node {
		match &self.content {
			Content::Template(instance) => instance.last_node().unwrap_or_else(|| self.anchor.clone()),
			Content::Items(items) => items.last().map_or_else(|| self.anchor.clone(), NodeBinding::last_node),
			Content::Empty | Content::Text(_) => self.anchor.clone(),
		}
	}

	/// Removes all output of this binding, leaving only an empty anchor.
	fn clear(&mut self, dom: &mut D) {
		match mem::replace(&mut self.content, Content::Empty) {
			Content::Empty => (),
			Content::Text(_) => dom.set_text(&self.anchor, ""),
			Content::Template(mut instance) => instance.detach(dom),
			Content::Items(items) => {
				for mut item in items {
					item.clear(dom);
					dom.remove(&item.anchor);
				}
			}
		}
	}

	fn update(&mut self, cx: &mut Context<'_, D>, index: usize, value: &Value, depth: usize) {
		if depth > cx.config.depth_limit {
			cx.report(index, depth, ResolutionError::DepthLimit { limit: cx.config.depth_limit });
			return self.clear(cx.dom);
		}

		let resolved = match value::resolve(value, cx.config.max_thunk_depth) {
			Ok(resolved) => resolved,
			Err(error) => {
				cx.report(index, depth, error);
				return self.clear(cx.dom);
			}
		};

		match Shape::of(&resolved) {
			Shape::Primitive(primitive) => self.commit_text(cx.dom, primitive.primitive_text().unwrap_or_default()),
			Shape::Template(result) => self.commit_template(cx, index, result, depth),
			Shape::Items(items) => self.commit_items(cx, index, items, depth),
			Shape::Deferred(_) => {
				error!("Resolved value is still deferred. Clearing the part.");
				self.clear(cx.dom);
			}
		}
	}

	fn commit_text(&mut self, dom: &mut D, text: String) {
		if matches!(&self.content, Content::Text(previous) if *previous == text) {
			return trace!("Text unchanged.");
		}
		if !matches!(self.content, Content::Empty | Content::Text(_)) {
			self.clear(dom);
		}

		if text.is_empty() {
			self.clear(dom);
		} else {
			if cfg!(feature = "dangerous-logging") {
				trace!("Setting text to {:?}.", text);
			}
			dom.set_text(&self.anchor, &text);
			self.content = Content::Text(text);
		}
	}

	fn commit_template(&mut self, cx: &mut Context<'_, D>, index: usize, result: &TemplateResult, depth: usize) {
		if let Content::Template(instance) = &mut self.content {
			if Rc::ptr_eq(instance.template(), result.template()) {
				trace!("Reusing nested instance.");
				return instance.update(cx, result.values(), depth + 1);
			}
		}

		self.clear(cx.dom);
		let mut instance = match Instance::new(cx, result.template().clone()) {
			Ok(instance) => instance,
			Err((part, error)) => {
				error!("Could not instantiate nested template for part {}.", index);
				return cx.report(part, depth + 1, error);
			}
		};

		match cx.dom.parent(&self.anchor) {
			Some(parent) => {
				let next = cx.dom.next_sibling(&self.anchor);
				for root in instance.roots() {
					cx.dom.insert_before(&parent, root, next.as_ref());
				}
			}
			None => error!("Anchor of part {} is detached. The nested template stays invisible.", index),
		}

		instance.update(cx, result.values(), depth + 1);
		self.content = Content::Template(Box::new(instance));
	}

	fn commit_items(&mut self, cx: &mut Context<'_, D>, index: usize, items: &[Value], depth: usize) {
		if !matches!(self.content, Content::Items(_)) {
			self.clear(cx.dom);
			self.content = Content::Items(Vec::new());
		}
		let NodeBinding { anchor, content } = self;
		let bindings = match content {
			Content::Items(bindings) => bindings,
			_ => return,
		};

		for (position, item) in items.iter().enumerate() {
			if position == bindings.len() {
				let after = bindings.last().map_or_else(|| anchor.clone(), NodeBinding::last_node);
				let item_anchor = cx.dom.create_text("");
				match cx.dom.parent(&after) {
					Some(parent) => {
						let next = cx.dom.next_sibling(&after);
						cx.dom.insert_before(&parent, &item_anchor, next.as_ref());
					}
					None => error!("Anchor of part {} is detached. Item {} stays invisible.", index, position),
				}
				bindings.push(NodeBinding::new(item_anchor));
			}
			bindings[position].update(cx, index, item, depth + 1);
		}

		if bindings.len() > items.len() {
			trace!("Removing {} excess item(s).", bindings.len() - items.len());
			for mut excess in bindings.drain(items.len()..) {
				excess.clear(cx.dom);
				cx.dom.remove(&excess.anchor);
			}
		}
	}
}
