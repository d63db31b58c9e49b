//! The top-level entry point: renders [`TemplateResult`]s into containers and keeps them up to date.

use crate::{
	dom::Dom,
	error::Diagnostic,
	instance::{AttributeStrategy, Context, Instance},
	template::{Template, TemplateResult},
	value::DEFAULT_THUNK_LIMIT,
};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{error, instrument, trace};

/// Default limit for nested templates and item lists.
pub const DEFAULT_DEPTH_LIMIT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
	/// How many times a chain of deferred values is invoked before the part gives up.
	pub max_thunk_depth: usize,
	/// How deeply templates and item lists may nest below the rendered template.
	pub depth_limit: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			max_thunk_depth: DEFAULT_THUNK_LIMIT,
			depth_limit: DEFAULT_DEPTH_LIMIT,
		}
	}
}

/// What went wrong during one [`Renderer::render`] call, if anything.
///
/// Each diagnostic's part rendered empty. All other parts were updated normally.
#[derive(Debug, Default)]
#[must_use]
pub struct RenderReport {
	pub diagnostics: Vec<Diagnostic>,
}

impl RenderReport {
	/// Whether every part rendered its value.
	#[must_use]
	pub fn is_clean(&self) -> bool {
		self.diagnostics.is_empty()
	}
}

/// Owns a [`Dom`] and remembers which template instance lives in which container.
pub struct Renderer<D: Dom> {
	dom: D,
	config: Config,
	strategies: Vec<Rc<dyn AttributeStrategy<D>>>,
	instances: HashMap<D::Key, Instance<D>>,
}

impl<D: Dom> Renderer<D> {
	pub fn new(dom: D) -> Self {
		Self::with_config(dom, Config::default())
	}

	pub fn with_config(dom: D, config: Config) -> Self {
		Self {
			dom,
			config,
			strategies: Vec::new(),
			instances: HashMap::new(),
		}
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	#[must_use]
	pub fn dom(&self) -> &D {
		&self.dom
	}

	/// Direct access to the output tree.
	///
	/// Moving or removing nodes that rendered instances own leads to unspecified (but memory-safe) results on later renders.
	pub fn dom_mut(&mut self) -> &mut D {
		&mut self.dom
	}

	/// Registers a strategy for attribute parts it claims.
	///
	/// Strategies are asked in registration order. Parts no strategy claims use [`SetAttribute`](`crate::SetAttribute`).
	/// Only instances created afterwards are affected.
	pub fn add_attribute_strategy(&mut self, strategy: impl AttributeStrategy<D> + 'static) {
		self.strategies.push(Rc::new(strategy));
	}

	/// Renders `result` into `container`.
	///
	/// If `container` already holds an instance of the same template, only its parts are updated.
	/// Otherwise the previous output (or, on the first render, any existing children) is removed and a new instance is created.
	#[instrument(skip(self, result))]
	pub fn render(&mut self, container: &D::Node, result: &TemplateResult) -> RenderReport {
		let key = self.dom.key(container);
		let mut diagnostics = Vec::new();
		let mut cx = Context {
			dom: &mut self.dom,
			config: &self.config,
			strategies: &self.strategies,
			diagnostics: &mut diagnostics,
		};

		let reusable = self
			.instances
			.get(&key)
			.map_or(false, |instance| Rc::ptr_eq(instance.template(), result.template()));
		if reusable {
			trace!("Updating existing instance.");
		} else {
			if let Some(mut previous) = self.instances.remove(&key) {
				trace!("Container holds another template. Detaching it.");
				previous.detach(cx.dom);
			}
			while let Some(child) = cx.dom.first_child(container) {
				cx.dom.remove(&child);
				if cx.dom.first_child(container).as_ref() == Some(&child) {
					error!("Could not remove child {:?} from container. Rendering after it.", child);
					break;
				}
			}

			match Instance::new(&mut cx, result.template().clone()) {
				Ok(instance) => {
					for root in instance.roots() {
						cx.dom.append_child(container, root);
					}
					self.instances.insert(key, instance);
				}
				Err((part, error)) => {
					error!("Could not instantiate template.");
					cx.report(part, 0, error);
				}
			}
		}

		if let Some(instance) = self.instances.get_mut(&key) {
			instance.update(&mut cx, result.values(), 0);
		}

		RenderReport { diagnostics }
	}

	/// The template of the instance currently rendered into `container`.
	#[must_use]
	pub fn instance_template(&self, container: &D::Node) -> Option<&Rc<Template>> {
		self.instances.get(&self.dom.key(container)).map(Instance::template)
	}

	/// Removes the output rendered into `container` and forgets its instance.
	///
	/// Returns whether there was one.
	pub fn release(&mut self, container: &D::Node) -> bool {
		match self.instances.remove(&self.dom.key(container)) {
			Some(mut instance) => {
				instance.detach(&mut self.dom);
				true
			}
			None => false,
		}
	}
}

impl TemplateResult {
	/// Shorthand for [`Renderer::render`].
	pub fn render_to<D: Dom>(&self, renderer: &mut Renderer<D>, container: &D::Node) -> RenderReport {
		renderer.render(container, self)
	}
}
