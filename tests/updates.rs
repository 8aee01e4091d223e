mod common;

use std::{cell::Cell, rc::Rc};
use wire_dom::{
	dom::{
		memory::{MemoryDom, MemoryEvent},
		Dom, Listener, Property,
	},
	values, Engine, Pending, Primitive, Value,
};

fn setup() -> (MemoryDom, Engine<MemoryDom>) {
	common::init_logging();
	let dom = MemoryDom::new();
	(dom.clone(), Engine::new(dom))
}

#[test]
fn known_properties_are_assigned() {
	static INPUT: &[&str] = &["<input value=", " checked=", " form=", ">"];
	let (dom, engine) = setup();
	let body = dom.body();

	engine.render(&body, INPUT, values!["hi", true, "signup"]);
	let input = dom.first_child(&body).unwrap();
	assert_eq!(dom.property(&input, "value"), Some(Property::Str("hi".to_string())));
	assert_eq!(dom.property(&input, "checked"), Some(Property::Bool(true)));
	assert_eq!(dom.attribute(&input, "value"), None);
	// Read-only as a property.
	assert_eq!(dom.property(&input, "form"), None);
	assert_eq!(dom.attribute(&input, "form").as_deref(), Some("signup"));

	engine.render(&body, INPUT, vec![Value::Null, false.into(), Value::Null]);
	assert_eq!(dom.property(&input, "value"), Some(Property::Null));
	assert_eq!(dom.property(&input, "checked"), Some(Property::Bool(false)));
	assert_eq!(dom.attribute(&input, "form"), None);
}

#[test]
fn data_is_always_a_property() {
	static CHART: &[&str] = &["<x-chart data=", "></x-chart>"];
	let (dom, engine) = setup();
	let body = dom.body();

	engine.render(&body, CHART, values![42]);
	let chart = dom.first_child(&body).unwrap();
	assert_eq!(dom.property(&chart, "data"), Some(Property::Number(42.0)));
	assert_eq!(dom.attribute(&chart, "data"), None);
}

#[test]
fn attribute_lists_concatenate() {
	static BOX: &[&str] = &["<div class=", "></div>"];
	let (dom, engine) = setup();
	let body = dom.body();

	engine.render(&body, BOX, vec![Value::from(vec!["a ", "b"])]);
	assert_eq!(dom.inner_html(&body), r#"<div class="a b"></div>"#);
}

fn counting_listener(count: &Rc<Cell<u32>>) -> Listener<MemoryEvent> {
	let count = count.clone();
	Listener::new(move |_: &MemoryEvent| count.set(count.get() + 1))
}

#[test]
fn listeners_are_swapped() {
	static BUTTON: &[&str] = &["<button onClick=", ">go</button>"];
	let (dom, engine) = setup();
	let body = dom.body();
	let first = Rc::new(Cell::new(0));
	let second = Rc::new(Cell::new(0));
	let first_listener = counting_listener(&first);

	engine.render(&body, BUTTON, vec![first_listener.clone().into()]);
	let button = dom.first_child(&body).unwrap();
	assert_eq!(dom.attribute(&button, "onClick"), None);
	dom.dispatch_event(&button, "click").unwrap();
	assert_eq!(first.get(), 1);

	let before = dom.mutation_count();
	engine.render(&body, BUTTON, vec![first_listener.into()]);
	assert_eq!(dom.mutation_count(), before);
	assert_eq!(dom.listener_count(&button, "click"), 1);

	engine.render(&body, BUTTON, vec![counting_listener(&second).into()]);
	dom.dispatch_event(&button, "click").unwrap();
	assert_eq!((first.get(), second.get()), (1, 1));
	assert_eq!(dom.listener_count(&button, "click"), 1);

	engine.render(&body, BUTTON, vec![Value::Null]);
	assert_eq!(dom.listener_count(&button, "click"), 0);
}

#[test]
fn discarded_instances_detach_their_listeners() {
	static BUTTON: &[&str] = &["<button onclick=", ">go</button>"];
	static LATER: &[&str] = &["<button onclick=", ">later</button>"];
	static PLAIN: &[&str] = &["<p>plain</p>"];
	let (dom, engine) = setup();
	let body = dom.body();
	let count = Rc::new(Cell::new(0));

	engine.render(&body, BUTTON, vec![counting_listener(&count).into()]);
	let swapped = dom.first_child(&body).unwrap();
	engine.render(&body, PLAIN, Vec::new());
	assert_eq!(dom.listener_count(&swapped, "click"), 0);

	engine.render(&body, BUTTON, vec![counting_listener(&count).into()]);
	let released = dom.first_child(&body).unwrap();
	engine.release(&body);
	assert_eq!(dom.first_child(&body), Some(released.clone()));
	assert_eq!(dom.listener_count(&released, "click"), 0);
	dom.dispatch_event(&released, "click").unwrap();
	assert_eq!(count.get(), 0);

	// A listener that only arrives after its instance was replaced stays unattached.
	let (pending, resolver) = Pending::<Value<MemoryDom>>::new();
	engine.render(&body, LATER, vec![pending.into()]);
	let late = dom.first_child(&body).unwrap();
	engine.render(&body, PLAIN, Vec::new());
	resolver.resolve(counting_listener(&count).into());
	dom.run_microtasks();
	assert_eq!(dom.listener_count(&late, "click"), 0);
}

#[test]
fn unknown_events_keep_their_case() {
	static WIDGET: &[&str] = &["<div onItemSelected=", "></div>"];
	let (dom, engine) = setup();
	let body = dom.body();
	let count = Rc::new(Cell::new(0));

	engine.render(&body, WIDGET, vec![counting_listener(&count).into()]);
	let div = dom.first_child(&body).unwrap();
	assert_eq!(dom.listener_count(&div, "ItemSelected"), 1);
	dom.dispatch_event(&div, "itemselected").unwrap();
	assert_eq!(count.get(), 0);
	dom.dispatch_event(&div, "ItemSelected").unwrap();
	assert_eq!(count.get(), 1);
}

#[test]
fn style_objects_are_diffed() {
	static STYLED: &[&str] = &["<div style=", "></div>"];
	let (dom, engine) = setup();
	let body = dom.body();
	let object = || {
		Value::style(vec![
			("width", Some(Primitive::Number(10.0))),
			("zIndex", Some(Primitive::Number(2.0))),
			("backgroundColor", Some(Primitive::Str("red".to_string()))),
		])
	};

	engine.render(&body, STYLED, vec![object()]);
	let div = dom.first_child(&body).unwrap();
	assert_eq!(dom.style(&div, "width").as_deref(), Some("10px"));
	assert_eq!(dom.style(&div, "z-index").as_deref(), Some("2"));
	assert_eq!(dom.style(&div, "background-color").as_deref(), Some("red"));

	let before = dom.mutation_count();
	engine.render(&body, STYLED, vec![object()]);
	assert_eq!(dom.mutation_count(), before);

	engine.render(&body, STYLED, vec![Value::style(vec![("width", Some(Primitive::Number(10.0))), ("zIndex", None)])]);
	assert_eq!(dom.style(&div, "width").as_deref(), Some("10px"));
	assert_eq!(dom.style(&div, "z-index"), None);
	assert_eq!(dom.style(&div, "background-color"), None);
}

#[test]
fn style_strings_replace_declarations() {
	static STYLED: &[&str] = &["<p style=", ">styled</p>"];
	let (dom, engine) = setup();
	let body = dom.body();

	engine.render(&body, STYLED, vec![Value::style(vec![("width", Some(Primitive::Number(1.5)))])]);
	let p = dom.first_child(&body).unwrap();
	assert_eq!(dom.style(&p, "width").as_deref(), Some("1.5px"));

	engine.render(&body, STYLED, values!["color: blue"]);
	assert_eq!(dom.style(&p, "color").as_deref(), Some("blue"));
	assert_eq!(dom.style(&p, "width"), None);

	engine.render(&body, STYLED, vec![Value::style(vec![("opacity", Some(Primitive::Number(0.5)))])]);
	assert_eq!(dom.style(&p, "color"), None);
	assert_eq!(dom.style(&p, "opacity").as_deref(), Some("0.5"));
	assert_eq!(dom.outer_html(&p), r#"<p style="opacity: 0.5;">styled</p>"#);
}

#[test]
fn unsupported_values_are_ignored() {
	static LINK: &[&str] = &["<a href=", ">x</a>"];
	let (dom, engine) = setup();
	let body = dom.body();

	engine.render(&body, LINK, values!["/a"]);
	let a = dom.first_child(&body).unwrap();
	engine.render(&body, LINK, vec![Value::node(dom.create_text("nope"))]);
	assert_eq!(dom.attribute(&a, "href").as_deref(), Some("/a"));
}
