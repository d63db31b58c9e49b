use pretty_assertions::assert_eq;
use stencil_dom::{html, value, ArenaDom, AttributePart, AttributeStrategy, NodeId, Renderer, ResolutionError, TemplateCache, Value};
use std::{cell::RefCell, rc::Rc};

/// Records `@`-prefixed parts instead of setting attributes, like an event binding would.
#[derive(Clone, Default)]
struct Recorder {
	commits: Rc<RefCell<Vec<(String, String)>>>,
}

impl AttributeStrategy<ArenaDom> for Recorder {
	fn claims(&self, part: &AttributePart) -> bool {
		part.raw_name().starts_with('@')
	}

	fn commit(&self, _: &mut ArenaDom, _: &NodeId, part: &AttributePart, value: &Value) -> Result<(), ResolutionError> {
		let text = match value {
			Value::Template(_) => {
				return Err(ResolutionError::Host {
					message: "templates can't be bound".to_owned(),
				})
			}
			other => value::attribute_text(other)?,
		};
		self.commits.borrow_mut().push((part.raw_name().to_owned(), text));
		Ok(())
	}
}

fn commits(recorder: &Recorder) -> Vec<(String, String)> {
	recorder.commits.borrow().clone()
}

fn commit(name: &str, text: &str) -> (String, String) {
	(name.to_owned(), text.to_owned())
}

#[test]
fn claimed_parts_bypass_attributes() {
	let cache = TemplateCache::default();
	let recorder = Recorder::default();
	let mut renderer = Renderer::new(ArenaDom::new());
	renderer.add_attribute_strategy(recorder.clone());
	let container = renderer.dom_mut().element("main");

	let view = |handler: Value, title: &str| html!(cache; ["<button @onClick=", " title=", ">go</button>"], handler, title).unwrap();

	let report = renderer.render(&container, &view(Value::thunk(|| Ok("clicked".into())), "tip"));
	assert!(report.is_clean());
	assert_eq!(commits(&recorder), vec![commit("@onClick", "clicked")]);
	assert_eq!(renderer.dom().inner_html(container), r#"<button title="tip">go</button>"#);

	let _ = renderer.render(&container, &view("clicked".into(), "tip"));
	assert_eq!(commits(&recorder).len(), 1, "unchanged primitives are not committed again");
}

#[test]
fn failed_commits_are_retried_empty() {
	let cache = TemplateCache::default();
	let recorder = Recorder::default();
	let mut renderer = Renderer::new(ArenaDom::new());
	renderer.add_attribute_strategy(recorder.clone());
	let container = renderer.dom_mut().element("main");

	let nested = html!(cache; ["<b>", "</b>"], "x").unwrap();
	let report = renderer.render(&container, &html!(cache; ["<button @onClick=", "></button>"], nested).unwrap());

	match &report.diagnostics[..] {
		[diagnostic] => assert!(matches!(&diagnostic.error, ResolutionError::Host { message } if message == "templates can't be bound")),
		other => panic!("unexpected diagnostics: {:?}", other),
	}
	assert_eq!(commits(&recorder), vec![commit("@onClick", "")]);
}

#[test]
fn strategies_apply_to_later_instances_only() {
	let cache = TemplateCache::default();
	let recorder = Recorder::default();
	let mut renderer = Renderer::new(ArenaDom::new());
	let container = renderer.dom_mut().element("main");
	let view = |handler: &str| html!(cache; ["<button @onClick=", "></button>"], handler).unwrap();

	let _ = renderer.render(&container, &view("a"));
	assert_eq!(renderer.dom().inner_html(container), r#"<button @onclick="a"></button>"#);

	renderer.add_attribute_strategy(recorder.clone());
	let _ = renderer.render(&container, &view("b"));
	assert!(commits(&recorder).is_empty());
	assert_eq!(renderer.dom().inner_html(container), r#"<button @onclick="b"></button>"#);

	let other = renderer.dom_mut().element("aside");
	let _ = renderer.render(&other, &view("c"));
	assert_eq!(commits(&recorder), vec![commit("@onClick", "c")]);
	assert_eq!(renderer.dom().inner_html(other), "<button></button>");
}

#[test]
fn empty_and_empty_text_are_distinct() {
	let cache = TemplateCache::default();
	let recorder = Recorder::default();
	let mut renderer = Renderer::new(ArenaDom::new());
	renderer.add_attribute_strategy(recorder.clone());
	let container = renderer.dom_mut().element("main");
	let view = |handler: Value| html!(cache; ["<button @onClick=", "></button>"], handler).unwrap();

	let _ = renderer.render(&container, &view(Value::Empty));
	let _ = renderer.render(&container, &view("".into()));
	let _ = renderer.render(&container, &view("".into()));
	assert_eq!(commits(&recorder), vec![commit("@onClick", ""), commit("@onClick", "")]);
}
