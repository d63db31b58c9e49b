#![cfg(target_arch = "wasm32")]

use js_sys::Reflect;
use std::sync::Once;
use stencil_dom::{
	html,
	web::{PropertyStrategy, WebDom, WebParser},
	Renderer, TemplateCache, Value,
};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, Document, HtmlBodyElement, Node};

wasm_bindgen_test_configure!(run_in_browser);

static LOG_INIT: Once = Once::new();

fn setup() -> (Document, Node) {
	LOG_INIT.call_once(tracing_wasm::set_as_global_default);

	let document = window().unwrap().document().unwrap();
	let body = document.body().unwrap().dyn_into::<HtmlBodyElement>().unwrap();
	let container: Node = document.create_element("div").unwrap().into();
	body.append_child(&container).unwrap();
	(document, container)
}

fn inner_html(node: &Node) -> String {
	node.dyn_ref::<web_sys::Element>().unwrap().inner_html()
}

#[wasm_bindgen_test]
fn text_updates_in_place() {
	let (document, container) = setup();
	let cache = TemplateCache::default();
	let mut renderer = Renderer::new(WebDom::new(document));
	let view = |name: &str| html!(cache; ["<div>Hello ", "!</div>"], name).unwrap();

	assert!(renderer.render(&container, &view("Steve")).is_clean());
	assert_eq!(inner_html(&container), "<div>Hello Steve!</div>");
	let div = container.first_child().unwrap();
	let anchor = div.child_nodes().item(1).unwrap();

	assert!(renderer.render(&container, &view("Kevin")).is_clean());
	assert_eq!(inner_html(&container), "<div>Hello Kevin!</div>");
	assert!(container.first_child().unwrap().is_same_node(Some(&div)));
	assert!(div.child_nodes().item(1).unwrap().is_same_node(Some(&anchor)));
	assert_eq!(anchor.text_content().unwrap(), "Kevin");
}

#[wasm_bindgen_test]
fn browser_parser_and_items() {
	let (document, container) = setup();
	let cache = TemplateCache::new(WebParser::new(document.clone()));
	let mut renderer = Renderer::new(WebDom::new(document));
	let view = |items: &[&str]| {
		let items = items.iter().map(|&item| html!(cache; ["<li>", "</li>"], item).unwrap());
		html!(cache; [r#"<ul class=""#, r#"">"#, "</ul>"], "list", Value::items(items)).unwrap()
	};

	let _ = renderer.render(&container, &view(&["a", "b", "c"]));
	assert_eq!(inner_html(&container), r#"<ul class="list"><li>a</li><li>b</li><li>c</li></ul>"#);

	let _ = renderer.render(&container, &view(&["a"]));
	assert_eq!(inner_html(&container), r#"<ul class="list"><li>a</li></ul>"#);
}

#[wasm_bindgen_test]
fn properties_keep_their_case() {
	let (document, container) = setup();
	let cache = TemplateCache::new(WebParser::new(document.clone()));
	let mut renderer = Renderer::new(WebDom::new(document));
	renderer.add_attribute_strategy(PropertyStrategy);

	let report = renderer.render(&container, &html!(cache; ["<input .someProp=", " .value=", ">"], 5, "typed").unwrap());
	assert!(report.is_clean());

	let input = container.first_child().unwrap();
	assert_eq!(Reflect::get(&input, &JsValue::from_str("someProp")).unwrap().as_f64(), Some(5.0));
	assert_eq!(Reflect::get(&input, &JsValue::from_str("value")).unwrap().as_string().as_deref(), Some("typed"));
	assert_eq!(inner_html(&container), "<input>");
}
