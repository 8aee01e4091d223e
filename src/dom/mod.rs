//! The host DOM seam.
//!
//! Everything above this module only ever talks to a [`Dom`] implementation.
//! [`memory::MemoryDom`] is a complete in-memory host, [`web::WebDom`] drives a browser document through [`web_sys`].

use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;

pub mod memory;
pub mod web;

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Opaque, stable identity of a host node.
///
/// Used to key side tables (bound contexts, connected components) without holding on to the node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	Document,
	Fragment,
	Element,
	Text,
	Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
	Html,
	Svg,
}
impl Namespace {
	#[must_use]
	pub fn uri(self) -> &'static str {
		match self {
			Namespace::Html => HTML_NAMESPACE,
			Namespace::Svg => SVG_NAMESPACE,
		}
	}
}

/// What a host can do, probed once per [`Engine`](`crate::Engine`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
	/// [`Dom::delete_range`] removes a sibling run in one operation.
	/// Without it, the core removes the run node by node.
	pub range_deletion: bool,
	/// [`Dom::observe`] reports subtree mutations of the document.
	pub mutation_observer: bool,
	/// Script elements of cloned fragments won't execute and must be recreated.
	pub inert_cloned_scripts: bool,
}
impl Default for Capabilities {
	fn default() -> Self {
		Self {
			range_deletion: true,
			mutation_observer: true,
			inert_cloned_scripts: false,
		}
	}
}

/// A value assigned to a live DOM property.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
	Null,
	Str(String),
	Number(f64),
	Bool(bool),
}

/// One batch entry delivered to [`Dom::observe`] subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation<N> {
	pub added: Vec<N>,
	pub removed: Vec<N>,
}

/// An event handler, compared by identity.
pub struct Listener<E>(Rc<dyn Fn(&E)>);
impl<E> Listener<E> {
	pub fn new(handler: impl 'static + Fn(&E)) -> Self {
		Self(Rc::new(handler))
	}

	pub fn call(&self, event: &E) {
		(self.0)(event)
	}

	/// Stable for as long as any clone of this [`Listener`] is alive.
	#[must_use]
	pub fn address(&self) -> usize {
		Rc::as_ptr(&self.0) as *const () as usize
	}
}
impl<E> Clone for Listener<E> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}
impl<E> PartialEq for Listener<E> {
	fn eq(&self, other: &Self) -> bool {
		self.address() == other.address()
	}
}
impl<E> Eq for Listener<E> {}
impl<E> Debug for Listener<E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Listener").field(&format_args!("{:#x}", self.address())).finish()
	}
}

pub type ObserverCallback<N> = Box<dyn Fn(Vec<Mutation<N>>)>;

/// The operations the renderer needs from its host document.
///
/// Handles are cheap to clone and compare by node identity.
/// Mutating operations report host failures as [`Dom::Error`], which the core logs and then moves past.
pub trait Dom: Clone + 'static {
	type Node: Clone + PartialEq + Debug + 'static;
	type Event: 'static;
	type Error: Debug;

	fn capabilities(&self) -> Capabilities;
	fn key(&self, node: &Self::Node) -> NodeKey;
	fn kind(&self, node: &Self::Node) -> NodeKind;
	/// [`None`] for anything but elements.
	fn namespace(&self, node: &Self::Node) -> Option<Namespace>;
	/// Local name of an element.
	fn name(&self, node: &Self::Node) -> Option<String>;
	fn document(&self) -> Self::Node;

	fn create_element(&self, namespace: Namespace, name: &str) -> Result<Self::Node, Self::Error>;
	fn create_text(&self, data: &str) -> Self::Node;
	fn create_comment(&self, data: &str) -> Self::Node;
	fn create_fragment(&self) -> Self::Node;
	/// Listeners are never cloned.
	fn clone_node(&self, node: &Self::Node, deep: bool) -> Result<Self::Node, Self::Error>;

	fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
	fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;
	fn last_child(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
	fn previous_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
	fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;
	fn child_at(&self, node: &Self::Node, index: usize) -> Option<Self::Node>;

	/// Inserting a fragment moves its children instead, leaving it empty.
	fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>) -> Result<(), Self::Error>;
	fn append_child(&self, parent: &Self::Node, node: &Self::Node) -> Result<(), Self::Error> {
		self.insert_before(parent, node, None)
	}
	fn remove_child(&self, parent: &Self::Node, node: &Self::Node) -> Result<(), Self::Error>;
	/// Removes `first`, `last` and every sibling between them.
	fn delete_range(&self, first: &Self::Node, last: &Self::Node) -> Result<(), Self::Error>;

	fn text_content(&self, node: &Self::Node) -> String;
	fn set_text_content(&self, node: &Self::Node, text: &str);

	fn attribute(&self, element: &Self::Node, name: &str) -> Option<String>;
	fn attribute_names(&self, element: &Self::Node) -> Vec<String>;
	fn set_attribute(&self, element: &Self::Node, name: &str, value: &str) -> Result<(), Self::Error>;
	fn remove_attribute(&self, element: &Self::Node, name: &str) -> Result<(), Self::Error>;

	fn has_property(&self, element: &Self::Node, name: &str) -> bool;
	fn set_property(&self, element: &Self::Node, name: &str, value: &Property) -> Result<(), Self::Error>;

	/// `name` is hyphenated. [`None`] removes the declaration.
	fn set_style(&self, element: &Self::Node, name: &str, value: Option<&str>) -> Result<(), Self::Error>;
	/// Replaces all inline declarations.
	fn set_style_text(&self, element: &Self::Node, css: &str) -> Result<(), Self::Error>;

	fn add_event_listener(&self, node: &Self::Node, event_type: &str, listener: &Listener<Self::Event>) -> Result<(), Self::Error>;
	fn remove_event_listener(&self, node: &Self::Node, event_type: &str, listener: &Listener<Self::Event>) -> Result<(), Self::Error>;
	fn dispatch_event(&self, node: &Self::Node, event_type: &str) -> Result<(), Self::Error>;

	fn is_connected(&self, node: &Self::Node) -> bool;
	/// Subscribes to child list mutations anywhere below the document.
	fn observe(&self, callback: ObserverCallback<Self::Node>) -> Result<(), Self::Error>;
	fn queue_microtask(&self, task: Box<dyn FnOnce()>);
}
