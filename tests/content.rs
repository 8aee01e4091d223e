mod common;

use std::{cell::RefCell, rc::Rc};
use wire_dom::{
	dom::{
		memory::{MemoryDom, MemoryNode},
		Dom, Namespace,
	},
	values, Engine, Intent, Options, Pending, Primitive, Reapply, Value,
};

static LIST: &[&str] = &["<ul>", "</ul>"];

fn setup() -> (MemoryDom, Engine<MemoryDom>) {
	common::init_logging();
	let dom = MemoryDom::new();
	(dom.clone(), Engine::new(dom))
}

fn items(dom: &MemoryDom, count: usize) -> Vec<MemoryNode> {
	(0..count)
		.map(|i| {
			let li = dom.create_element(Namespace::Html, "li").unwrap();
			dom.append_child(&li, &dom.create_text(&i.to_string())).unwrap();
			li
		})
		.collect()
}

fn pick(nodes: &[MemoryNode], order: &[usize]) -> Value<MemoryDom> {
	Value::List(order.iter().map(|&i| Value::node(nodes[i])).collect())
}

#[test]
fn node_lists_are_reconciled_by_identity() {
	let (dom, engine) = setup();
	let body = dom.body();
	let nodes = items(&dom, 4);

	engine.render(&body, LIST, vec![pick(&nodes, &[0, 1, 2, 3])]);
	assert_eq!(dom.inner_html(&body), "<ul><li>0</li><li>1</li><li>2</li><li>3</li><!----></ul>");
	let ul = dom.first_child(&body).unwrap();
	let marker = dom.last_child(&ul).unwrap();

	engine.render(&body, LIST, vec![pick(&nodes, &[3, 1, 0])]);
	assert_eq!(dom.child_nodes(&ul), vec![nodes[3], nodes[1], nodes[0], marker]);
	assert_eq!(dom.parent(&nodes[2]), None);

	engine.render(&body, LIST, vec![Value::List(Vec::new())]);
	assert_eq!(dom.child_nodes(&ul), vec![marker]);
}

#[test]
fn primitive_lists_become_html() {
	let (dom, engine) = setup();
	let body = dom.body();

	engine.render(&body, LIST, vec![Value::from(vec!["<li>a</li>", "<li>b</li>"])]);
	assert_eq!(dom.inner_html(&body), "<ul><li>a</li><li>b</li><!----></ul>");
}

#[test]
fn nested_lists_are_flattened() {
	let (dom, engine) = setup();
	let body = dom.body();
	let nodes = items(&dom, 3);

	engine.render(&body, LIST, vec![Value::List(vec![Value::node(nodes[0]), pick(&nodes, &[1, 2]), Value::Null])]);
	assert_eq!(dom.inner_html(&body), "<ul><li>0</li><li>1</li><li>2</li><!----></ul>");
}

#[test]
fn fragments_stand_for_their_children() {
	let (dom, engine) = setup();
	let body = dom.body();
	let fragment = dom.create_fragment();
	dom.append_child(&fragment, &dom.create_text("a")).unwrap();
	dom.append_child(&fragment, &dom.create_comment("b")).unwrap();

	engine.render(&body, LIST, vec![Value::node(fragment)]);
	assert_eq!(dom.inner_html(&body), "<ul>a<!--b--><!----></ul>");
	assert!(dom.child_nodes(&fragment).is_empty());
}

#[test]
fn content_switches_between_shapes() {
	static CARD: &[&str] = &["<div>", "</div>"];
	let (dom, engine) = setup();
	let body = dom.body();
	let nodes = items(&dom, 1);

	engine.render(&body, CARD, values!["text"]);
	assert_eq!(dom.inner_html(&body), "<div>text<!----></div>");
	engine.render(&body, CARD, vec![Value::node(nodes[0])]);
	assert_eq!(dom.inner_html(&body), "<div><li>0</li><!----></div>");
	engine.render(&body, CARD, values![1.5]);
	assert_eq!(dom.inner_html(&body), "<div>1.5<!----></div>");
	engine.render(&body, CARD, vec![Value::Null]);
	assert_eq!(dom.inner_html(&body), "<div><!----></div>");
}

#[test]
fn text_updates_reuse_the_text_node() {
	static CARD: &[&str] = &["<div>", "</div>"];
	let (dom, engine) = setup();
	let body = dom.body();

	engine.render(&body, CARD, values!["one"]);
	let div = dom.first_child(&body).unwrap();
	let text = dom.first_child(&div).unwrap();
	engine.render(&body, CARD, values!["two"]);
	assert_eq!(dom.first_child(&div), Some(text));
	assert_eq!(dom.text_content(&div), "two");
}

#[test]
fn text_and_html_intents() {
	static CARD: &[&str] = &["<div>", "</div>"];
	let (dom, engine) = setup();
	let body = dom.body();

	engine.render(&body, CARD, vec![Value::text("<b>bold</b>")]);
	assert_eq!(dom.inner_html(&body), "<div>&lt;b&gt;bold&lt;/b&gt;<!----></div>");

	engine.render(&body, CARD, vec![Value::html("<b>bold</b> &amp; <i>it</i>")]);
	assert_eq!(dom.inner_html(&body), "<div><b>bold</b> &amp; <i>it</i><!----></div>");

	engine.render(&body, CARD, vec![Value::any("plain")]);
	assert_eq!(dom.inner_html(&body), "<div>plain<!----></div>");
}

#[test]
fn svg_content_is_parsed_as_svg() {
	static ICON: &[&str] = &["<svg>", "</svg>"];
	let (dom, engine) = setup();
	let body = dom.body();

	engine.render(&body, ICON, vec![Value::html("<circle r=\"1\"></circle>")]);
	let svg = dom.first_child(&body).unwrap();
	let circle = dom.first_child(&svg).unwrap();
	assert_eq!(dom.namespace(&circle), Some(Namespace::Svg));
}

#[test]
fn pending_values_apply_in_a_later_microtask() {
	static CARD: &[&str] = &["<p>", "</p>"];
	let (dom, engine) = setup();
	let body = dom.body();
	let (pending, resolver) = Pending::new();

	engine.render(&body, CARD, vec![pending.into()]);
	assert_eq!(dom.inner_html(&body), "<p><!----></p>");

	resolver.resolve(Value::from("done"));
	assert_eq!(dom.inner_html(&body), "<p><!----></p>");
	dom.run_microtasks();
	assert_eq!(dom.inner_html(&body), "<p>done<!----></p>");
}

#[test]
fn rejections_change_nothing() {
	static CARD: &[&str] = &["<p class=", ">", "</p>"];
	let (dom, engine) = setup();
	let body = dom.body();

	engine.render(&body, CARD, values!["kept", "kept"]);
	engine.render(&body, CARD, vec![Pending::rejected("offline").into(), Pending::rejected("offline").into()]);
	dom.run_microtasks();
	assert_eq!(dom.inner_html(&body), r#"<p class="kept">kept<!----></p>"#);
}

fn race(options: Options) -> String {
	static CARD: &[&str] = &["<p>", "</p>"];
	common::init_logging();
	let dom = MemoryDom::new();
	let engine = Engine::with_options(dom.clone(), options);
	let body = dom.body();
	let (slow, resolve_slow) = Pending::new();
	let (fast, resolve_fast) = Pending::new();

	engine.render(&body, CARD, vec![slow.into()]);
	engine.render(&body, CARD, vec![fast.into()]);
	resolve_fast.resolve(Value::from("fast"));
	dom.run_microtasks();
	resolve_slow.resolve(Value::from("slow"));
	dom.run_microtasks();
	dom.inner_html(&body)
}

#[test]
fn last_settled_value_wins_by_default() {
	assert_eq!(race(Options::default()), "<p>slow<!----></p>");
}

#[test]
fn stale_values_can_be_dropped() {
	assert_eq!(race(Options { drop_stale_async: true }), "<p>fast<!----></p>");
}

#[test]
fn placeholders_show_until_the_source_arrives() {
	static CARD: &[&str] = &["<p>", "</p>"];
	let (dom, engine) = setup();
	let body = dom.body();
	let (pending, resolver) = Pending::new();

	engine.render(&body, CARD, vec![Value::placeholder("loading…", Intent::Text(Box::new(pending.into())))]);
	assert_eq!(dom.inner_html(&body), "<p>loading…<!----></p>");
	dom.run_microtasks();
	assert_eq!(dom.inner_html(&body), "<p>loading…<!----></p>");

	resolver.resolve(Value::from("<ready>"));
	dom.run_microtasks();
	assert_eq!(dom.inner_html(&body), "<p>&lt;ready&gt;<!----></p>");
}

#[test]
fn placeholders_defer_even_settled_sources() {
	static CARD: &[&str] = &["<p class=", "></p>"];
	let (dom, engine) = setup();
	let body = dom.body();

	engine.render(&body, CARD, vec![Value::placeholder("waiting", Intent::Any(Box::new("ready".into())))]);
	let p = dom.first_child(&body).unwrap();
	assert_eq!(dom.attribute(&p, "class").as_deref(), Some("waiting"));
	dom.run_microtasks();
	assert_eq!(dom.attribute(&p, "class").as_deref(), Some("ready"));
}

#[test]
fn pending_lists_wait_for_every_item() {
	let (dom, engine) = setup();
	let body = dom.body();
	let (first, resolve_first) = Pending::new();
	let (second, resolve_second) = Pending::new();

	engine.render(&body, LIST, vec![Value::List(vec![first.into(), second.into()])]);
	resolve_second.resolve(Value::from("<li>b</li>"));
	dom.run_microtasks();
	assert_eq!(dom.inner_html(&body), "<ul><!----></ul>");

	resolve_first.resolve(Value::from("<li>a</li>"));
	dom.run_microtasks();
	assert_eq!(dom.inner_html(&body), "<ul><li>a</li><li>b</li><!----></ul>");
}

fn uppercase(value: Value<MemoryDom>, _: Reapply<MemoryDom>) -> Value<MemoryDom> {
	match value {
		Value::Primitive(Primitive::Str(text)) => Value::from(text.to_uppercase()),
		other => other,
	}
}

#[test]
fn custom_intents_transform_values() {
	static CARD: &[&str] = &["<p>", "</p>"];
	let (dom, engine) = setup();
	let body = dom.body();
	engine.define_intent("upper", uppercase);

	engine.render(&body, CARD, vec![Value::custom("upper", "shout")]);
	assert_eq!(dom.inner_html(&body), "<p>SHOUT<!----></p>");

	engine.render(&body, CARD, vec![Value::custom("unknown", "ignored")]);
	assert_eq!(dom.inner_html(&body), "<p>SHOUT<!----></p>");
}

#[test]
fn custom_intents_can_reapply_later() {
	static CARD: &[&str] = &["<p>", "</p>"];
	let (dom, engine) = setup();
	let body = dom.body();
	let stash: Rc<RefCell<Option<Reapply<MemoryDom>>>> = Rc::default();
	engine.define_intent("later", {
		let stash = stash.clone();
		move |value, reapply| {
			*stash.borrow_mut() = Some(reapply);
			value
		}
	});

	engine.render(&body, CARD, vec![Value::custom("later", "first")]);
	assert_eq!(dom.inner_html(&body), "<p>first<!----></p>");

	let reapply = stash.borrow_mut().take().unwrap();
	reapply(Value::from("second"));
	assert_eq!(dom.inner_html(&body), "<p>second<!----></p>");
}
