//! A [`Dom`] over a browser document, through [`web_sys`].

use super::{Capabilities, Dom, Listener, Mutation, Namespace, NodeKey, NodeKind, ObserverCallback, Property, SVG_NAMESPACE};
use crate::rc_hash_map::RcHashMap;
use core::fmt::{self, Debug, Formatter};
use js_sys::{Array, Function, Reflect};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};
use tracing::{trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{CssStyleDeclaration, Document, Element, MutationObserver, MutationObserverInit, MutationRecord, Node, NodeList, Window};

/// Expando property holding a node's [`NodeKey`].
const KEY_PROPERTY: &str = "__wireDomKey";

struct WebShared {
	window: Window,
	document: Document,
	capabilities: Capabilities,
	next_key: Cell<u64>,
	/// One JavaScript closure per [`Listener`], counted per attachment.
	handlers: RefCell<RcHashMap<usize, u16, Closure<dyn Fn(web_sys::Event)>>>,
	/// Kept alive for as long as the host.
	observers: RefCell<Vec<(MutationObserver, Closure<dyn Fn(Array, MutationObserver)>)>>,
}

/// A cheap handle to a browser document. Clones share listener bookkeeping.
#[derive(Clone)]
pub struct WebDom(Rc<WebShared>);
impl Debug for WebDom {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebDom")
			.field("capabilities", &self.0.capabilities)
			.field("handlers", &self.0.handlers.borrow().len())
			.finish()
	}
}

impl WebDom {
	/// The global window's document, or [`None`] outside a browser main thread.
	#[must_use]
	pub fn new() -> Option<Self> {
		let window = web_sys::window()?;
		let document = window.document()?;
		Some(Self::for_document(window, document))
	}

	#[must_use]
	pub fn for_document(window: Window, document: Document) -> Self {
		let has = |target: &JsValue, name: &str| Reflect::has(target, &JsValue::from_str(name)).unwrap_or(false);
		let capabilities = Capabilities {
			range_deletion: has(document.as_ref(), "createRange"),
			mutation_observer: has(window.as_ref(), "MutationObserver"),
			inert_cloned_scripts: true,
		};
		trace!(?capabilities, "Probed browser capabilities.");
		Self(Rc::new(WebShared {
			window,
			document,
			capabilities,
			next_key: Cell::new(1),
			handlers: RefCell::default(),
			observers: RefCell::default(),
		}))
	}

	fn style(element: &Node) -> Result<CssStyleDeclaration, JsValue> {
		Reflect::get(element, &JsValue::from_str("style"))?.dyn_into::<CssStyleDeclaration>()
	}

	fn element(node: &Node) -> Result<&Element, JsValue> {
		node.dyn_ref::<Element>().ok_or_else(|| JsValue::from_str("expected an element"))
	}
}

fn node_list(list: &NodeList) -> Vec<Node> {
	(0..list.length()).filter_map(|index| list.get(index)).collect()
}

impl Dom for WebDom {
	type Node = Node;
	type Event = web_sys::Event;
	type Error = JsValue;

	fn capabilities(&self) -> Capabilities {
		self.0.capabilities
	}

	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
	fn key(&self, node: &Node) -> NodeKey {
		let property = JsValue::from_str(KEY_PROPERTY);
		if let Some(key) = Reflect::get(node, &property).ok().and_then(|key| key.as_f64()) {
			return NodeKey(key as u64);
		}
		let key = self.0.next_key.get();
		self.0.next_key.set(key + 1);
		if Reflect::set(node, &property, &JsValue::from_f64(key as f64)).is_err() {
			warn!("Failed to store node key on {:?}.", node)
		}
		NodeKey(key)
	}

	fn kind(&self, node: &Node) -> NodeKind {
		match node.node_type() {
			Node::ELEMENT_NODE => NodeKind::Element,
			Node::TEXT_NODE | Node::CDATA_SECTION_NODE => NodeKind::Text,
			Node::DOCUMENT_NODE => NodeKind::Document,
			Node::DOCUMENT_FRAGMENT_NODE => NodeKind::Fragment,
			_ => NodeKind::Comment,
		}
	}

	fn namespace(&self, node: &Node) -> Option<Namespace> {
		let element = node.dyn_ref::<Element>()?;
		Some(match element.namespace_uri() {
			Some(uri) if uri == SVG_NAMESPACE => Namespace::Svg,
			_ => Namespace::Html,
		})
	}

	fn name(&self, node: &Node) -> Option<String> {
		node.dyn_ref::<Element>().map(Element::local_name)
	}

	fn document(&self) -> Node {
		self.0.document.clone().into()
	}

	fn create_element(&self, namespace: Namespace, name: &str) -> Result<Node, JsValue> {
		self.0.document.create_element_ns(Some(namespace.uri()), name).map(Into::into)
	}

	fn create_text(&self, data: &str) -> Node {
		self.0.document.create_text_node(data).into()
	}

	fn create_comment(&self, data: &str) -> Node {
		self.0.document.create_comment(data).into()
	}

	fn create_fragment(&self) -> Node {
		self.0.document.create_document_fragment().into()
	}

	fn clone_node(&self, node: &Node, deep: bool) -> Result<Node, JsValue> {
		node.clone_node_with_deep(deep)
	}

	fn parent(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	fn first_child(&self, node: &Node) -> Option<Node> {
		node.first_child()
	}

	fn last_child(&self, node: &Node) -> Option<Node> {
		node.last_child()
	}

	fn next_sibling(&self, node: &Node) -> Option<Node> {
		node.next_sibling()
	}

	fn previous_sibling(&self, node: &Node) -> Option<Node> {
		node.previous_sibling()
	}

	fn child_nodes(&self, node: &Node) -> Vec<Node> {
		node_list(&node.child_nodes())
	}

	#[allow(clippy::cast_possible_truncation)]
	fn child_at(&self, node: &Node, index: usize) -> Option<Node> {
		node.child_nodes().get(index as u32)
	}

	fn insert_before(&self, parent: &Node, node: &Node, reference: Option<&Node>) -> Result<(), JsValue> {
		parent.insert_before(node, reference).map(drop)
	}

	fn remove_child(&self, parent: &Node, node: &Node) -> Result<(), JsValue> {
		parent.remove_child(node).map(drop)
	}

	fn delete_range(&self, first: &Node, last: &Node) -> Result<(), JsValue> {
		let range = self.0.document.create_range()?;
		range.set_start_before(first)?;
		range.set_end_after(last)?;
		range.delete_contents()
	}

	fn text_content(&self, node: &Node) -> String {
		node.text_content().unwrap_or_default()
	}

	fn set_text_content(&self, node: &Node, text: &str) {
		node.set_text_content(Some(text))
	}

	fn attribute(&self, element: &Node, name: &str) -> Option<String> {
		element.dyn_ref::<Element>()?.get_attribute(name)
	}

	fn attribute_names(&self, element: &Node) -> Vec<String> {
		match element.dyn_ref::<Element>() {
			Some(element) => element.get_attribute_names().iter().filter_map(|name| name.as_string()).collect(),
			None => Vec::new(),
		}
	}

	fn set_attribute(&self, element: &Node, name: &str, value: &str) -> Result<(), JsValue> {
		Self::element(element)?.set_attribute(name, value)
	}

	fn remove_attribute(&self, element: &Node, name: &str) -> Result<(), JsValue> {
		Self::element(element)?.remove_attribute(name)
	}

	/// The `in` operator: own and inherited properties count.
	fn has_property(&self, element: &Node, name: &str) -> bool {
		Reflect::has(element, &JsValue::from_str(name)).unwrap_or(false)
	}

	fn set_property(&self, element: &Node, name: &str, value: &Property) -> Result<(), JsValue> {
		let value = match value {
			Property::Null => JsValue::NULL,
			Property::Str(string) => JsValue::from_str(string),
			Property::Number(number) => JsValue::from_f64(*number),
			Property::Bool(boolean) => JsValue::from_bool(*boolean),
		};
		Reflect::set(element, &JsValue::from_str(name), &value).map(drop)
	}

	fn set_style(&self, element: &Node, name: &str, value: Option<&str>) -> Result<(), JsValue> {
		let style = Self::style(element)?;
		match value {
			Some(value) => style.set_property(name, value),
			None => style.remove_property(name).map(drop),
		}
	}

	fn set_style_text(&self, element: &Node, css: &str) -> Result<(), JsValue> {
		Self::style(element)?.set_css_text(css);
		Ok(())
	}

	fn add_event_listener(&self, node: &Node, event_type: &str, listener: &Listener<web_sys::Event>) -> Result<(), JsValue> {
		let mut handlers = self.0.handlers.borrow_mut();
		let closure = handlers
			.acquire_with(listener.address(), || {
				let listener = listener.clone();
				Closure::wrap(Box::new(move |event: web_sys::Event| {
					let span = trace_span!("listener", event_type = %event.type_());
					let _enter = span.enter();
					listener.call(&event)
				}) as Box<dyn Fn(web_sys::Event)>)
			})
			.map_err(|error| JsValue::from_str(&error.to_string()))?;
		node.add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref::<Function>())
	}

	fn remove_event_listener(&self, node: &Node, event_type: &str, listener: &Listener<web_sys::Event>) -> Result<(), JsValue> {
		let mut handlers = self.0.handlers.borrow_mut();
		if let Some(closure) = handlers.get(&listener.address()) {
			node.remove_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref::<Function>())?;
		}
		handlers.release(&listener.address()).map_err(|error| JsValue::from_str(&error.to_string()))?;
		let freed = handlers.drain_weak().count();
		if freed > 0 {
			trace!("Freed {} event listener closure(s).", freed);
		}
		Ok(())
	}

	fn dispatch_event(&self, node: &Node, event_type: &str) -> Result<(), JsValue> {
		let event = web_sys::Event::new(event_type)?;
		node.dispatch_event(&event).map(drop)
	}

	fn is_connected(&self, node: &Node) -> bool {
		node.is_connected()
	}

	fn observe(&self, callback: ObserverCallback<Node>) -> Result<(), JsValue> {
		let closure = Closure::wrap(Box::new(move |records: Array, _: MutationObserver| {
			let mutations = records
				.iter()
				.filter_map(|record| record.dyn_into::<MutationRecord>().ok())
				.map(|record| Mutation {
					added: node_list(&record.added_nodes()),
					removed: node_list(&record.removed_nodes()),
				})
				.collect();
			callback(mutations)
		}) as Box<dyn Fn(Array, MutationObserver)>);

		let observer = MutationObserver::new(closure.as_ref().unchecked_ref::<Function>())?;
		let init = MutationObserverInit::new();
		init.set_child_list(true);
		init.set_subtree(true);
		observer.observe_with_options(&self.0.document, &init)?;
		trace!("Observing document mutations.");
		self.0.observers.borrow_mut().push((observer, closure));
		Ok(())
	}

	fn queue_microtask(&self, task: Box<dyn FnOnce()>) {
		let task = Closure::once_into_js(move || task());
		self.0.window.queue_microtask(task.unchecked_ref::<Function>())
	}
}
