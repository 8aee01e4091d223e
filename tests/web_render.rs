#![cfg(target_arch = "wasm32")]

use std::{cell::Cell, rc::Rc, sync::Once};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, Element, HtmlElement, Node};
use wire_dom::{
	dom::{web::WebDom, Dom, Namespace},
	values, Engine, Primitive, Value,
};

wasm_bindgen_test_configure!(run_in_browser);

fn setup() -> (WebDom, Engine<WebDom>, Node) {
	static LOG: Once = Once::new();
	LOG.call_once(tracing_wasm::set_as_global_default);

	let dom = WebDom::new().unwrap();
	let body: Node = window().unwrap().document().unwrap().body().unwrap().into();
	let container = dom.create_element(Namespace::Html, "div").unwrap();
	dom.append_child(&body, &container).unwrap();
	(dom.clone(), Engine::new(dom), container)
}

fn inner_html(node: &Node) -> String {
	node.dyn_ref::<Element>().unwrap().inner_html()
}

#[wasm_bindgen_test]
fn renders_and_updates_in_place() {
	static CARD: &[&str] = &["<p class=", ">Hello, ", "!</p>"];
	let (dom, engine, container) = setup();

	engine.render(&container, CARD, values!["greeting", "World"]);
	assert_eq!(inner_html(&container), r#"<p class="greeting">Hello, World<!---->!</p>"#);
	let p = dom.first_child(&container).unwrap();

	engine.render(&container, CARD, values!["greeting", "there"]);
	assert_eq!(dom.first_child(&container), Some(p));
	assert_eq!(inner_html(&container), r#"<p class="greeting">Hello, there<!---->!</p>"#);
}

#[wasm_bindgen_test]
fn click_listener() {
	static BUTTON: &[&str] = &["<button onclick=", ">go</button>"];
	let (dom, engine, container) = setup();
	let clicks = Rc::new(Cell::new(0));
	let listener = {
		let clicks = clicks.clone();
		Value::listener(move |_: &web_sys::Event| clicks.set(clicks.get() + 1))
	};

	engine.render(&container, BUTTON, vec![listener]);
	let button: HtmlElement = dom.first_child(&container).unwrap().dyn_into().unwrap();
	button.click();
	assert_eq!(clicks.get(), 1);

	engine.render(&container, BUTTON, vec![Value::Null]);
	button.click();
	assert_eq!(clicks.get(), 1);
}

#[wasm_bindgen_test]
fn properties_and_styles() {
	static FORM: &[&str] = &["<input value=", " style=", ">"];
	let (dom, engine, container) = setup();

	engine.render(&container, FORM, vec![Value::from("typed"), Value::style(vec![("marginTop", Some(Primitive::Number(4.0)))])]);
	let input: web_sys::HtmlInputElement = dom.first_child(&container).unwrap().dyn_into().unwrap();
	assert_eq!(input.value(), "typed");
	assert_eq!(input.get_attribute("value"), None);
	assert_eq!(input.get_attribute("style").as_deref(), Some("margin-top: 4px;"));
}

#[wasm_bindgen_test]
fn lists_are_cleared_by_range() {
	static LIST: &[&str] = &["<ul>", "</ul>"];
	let (dom, engine, container) = setup();

	engine.render(&container, LIST, vec![Value::html("<li>a</li><li>b</li><li>c</li>")]);
	assert_eq!(inner_html(&container), "<ul><li>a</li><li>b</li><li>c</li><!----></ul>");

	engine.render(&container, LIST, vec![Value::Null]);
	assert_eq!(inner_html(&container), "<ul><!----></ul>");
}

#[wasm_bindgen_test]
fn svg_content() {
	static ICON: &[&str] = &["<svg viewBox=\"0 0 2 2\"><circle r=", "/></svg>"];
	let (dom, engine, container) = setup();

	engine.render(&container, ICON, values![1]);
	let svg = dom.first_child(&container).unwrap();
	let circle = dom.first_child(&svg).unwrap();
	assert_eq!(dom.namespace(&circle), Some(Namespace::Svg));
	assert_eq!(circle.dyn_ref::<Element>().unwrap().get_attribute("r").as_deref(), Some("1"));
	assert_eq!(svg.dyn_ref::<Element>().unwrap().get_attribute("viewBox").as_deref(), Some("0 0 2 2"));
}
