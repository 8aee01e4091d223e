//! An arena-backed, single-threaded DOM.
//!
//! Nodes are never freed while the [`MemoryDom`] is alive, so [`MemoryNode`] handles stay valid indefinitely.
//! Mutation records and queued microtasks are only processed by [`MemoryDom::run_microtasks`],
//! which stands in for the host event loop.

use super::{Capabilities, Dom, Listener, Mutation, Namespace, NodeKey, NodeKind, ObserverCallback, Property};
use crate::markup::is_void_element;
use core::fmt::Write as _;
use hashbrown::HashMap;
use std::{
	cell::{Cell, RefCell},
	collections::VecDeque,
	rc::{Rc, Weak},
};
use thiserror::Error;
use tracing::{trace, trace_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryNode(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEvent {
	pub event_type: String,
	pub target: MemoryNode,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryDomError {
	#[error("{node:?} is not a child of {parent:?}")]
	NotAChild { parent: MemoryNode, node: MemoryNode },
	#[error("can't insert {node:?} into {parent:?}")]
	Hierarchy { parent: MemoryNode, node: MemoryNode },
	#[error("expected {expected} but {node:?} is a {found:?} node")]
	WrongKind {
		node: MemoryNode,
		expected: &'static str,
		found: NodeKind,
	},
	#[error("range {first:?}..={last:?} does not span a sibling run")]
	InvalidRange { first: MemoryNode, last: MemoryNode },
}

const EVENT_HANDLER_PROPERTIES: &[&str] = &[
	"onabort", "onblur", "onchange", "onclick", "ondblclick", "onfocus", "oninput", "onkeydown", "onkeypress", "onkeyup", "onload", "onmousedown", "onmouseenter", "onmouseleave", "onmousemove",
	"onmouseout", "onmouseover", "onmouseup", "onreset", "onscroll", "onsubmit",
];
const GLOBAL_PROPERTIES: &[&str] = &["className", "dir", "hidden", "id", "lang", "tabIndex", "title"];

fn element_properties(name: &str) -> &'static [&'static str] {
	match name {
		"input" => &["checked", "disabled", "form", "list", "name", "placeholder", "readOnly", "required", "type", "value"],
		"textarea" => &["disabled", "form", "name", "placeholder", "readOnly", "value"],
		"select" => &["disabled", "form", "multiple", "selectedIndex", "value"],
		"option" => &["disabled", "selected", "value"],
		"button" => &["disabled", "form", "name", "type", "value"],
		_ => &[],
	}
}

#[derive(Clone)]
struct ElementData {
	namespace: Namespace,
	name: String,
	attributes: Vec<(String, String)>,
	style: Vec<(String, String)>,
	properties: HashMap<String, Property>,
	listeners: Vec<(String, Listener<MemoryEvent>)>,
}

#[derive(Clone)]
enum Data {
	Document,
	Fragment,
	Element(ElementData),
	Text(String),
	Comment(String),
}
impl Data {
	fn kind(&self) -> NodeKind {
		match self {
			Data::Document => NodeKind::Document,
			Data::Fragment => NodeKind::Fragment,
			Data::Element(_) => NodeKind::Element,
			Data::Text(_) => NodeKind::Text,
			Data::Comment(_) => NodeKind::Comment,
		}
	}
}

struct NodeData {
	data: Data,
	parent: Option<usize>,
	children: Vec<usize>,
}

struct Tree {
	nodes: Vec<NodeData>,
	document: usize,
	body: usize,
}
impl Tree {
	fn push(&mut self, data: Data) -> usize {
		self.nodes.push(NodeData { data, parent: None, children: Vec::new() });
		self.nodes.len() - 1
	}

	fn connected(&self, mut id: usize) -> bool {
		loop {
			if id == self.document {
				return true;
			}
			match self.nodes[id].parent {
				Some(parent) => id = parent,
				None => return false,
			}
		}
	}

	fn is_inclusive_ancestor(&self, ancestor: usize, mut id: usize) -> bool {
		loop {
			if id == ancestor {
				return true;
			}
			match self.nodes[id].parent {
				Some(parent) => id = parent,
				None => return false,
			}
		}
	}

	fn detach(&mut self, id: usize) -> Option<usize> {
		let parent = self.nodes[id].parent.take()?;
		self.nodes[parent].children.retain(|&child| child != id);
		Some(parent)
	}

	fn element(&self, id: usize) -> Option<&ElementData> {
		match &self.nodes[id].data {
			Data::Element(element) => Some(element),
			_ => None,
		}
	}

	fn element_mut(&mut self, id: usize) -> Result<&mut ElementData, MemoryDomError> {
		let found = self.nodes[id].data.kind();
		match &mut self.nodes[id].data {
			Data::Element(element) => Ok(element),
			_ => Err(MemoryDomError::WrongKind {
				node: MemoryNode(id),
				expected: "an element",
				found,
			}),
		}
	}

	fn deep_clone(&mut self, id: usize, deep: bool) -> usize {
		let data = match &self.nodes[id].data {
			Data::Element(element) => Data::Element(ElementData {
				properties: HashMap::new(),
				listeners: Vec::new(),
				..element.clone()
			}),
			other => other.clone(),
		};
		let clone = self.push(data);
		if deep {
			for child in self.nodes[id].children.clone() {
				let child_clone = self.deep_clone(child, true);
				self.nodes[child_clone].parent = Some(clone);
				self.nodes[clone].children.push(child_clone);
			}
		}
		clone
	}

	fn text_content(&self, id: usize, out: &mut String) {
		match &self.nodes[id].data {
			Data::Text(text) => out.push_str(text),
			Data::Comment(_) | Data::Document => (),
			Data::Element(_) | Data::Fragment => {
				for &child in &self.nodes[id].children {
					if !matches!(self.nodes[child].data, Data::Comment(_)) {
						self.text_content(child, out)
					}
				}
			}
		}
	}

	fn serialize(&self, id: usize, raw_text: bool, out: &mut String) {
		match &self.nodes[id].data {
			Data::Document | Data::Fragment => self.serialize_children(id, false, out),
			Data::Text(text) if raw_text => out.push_str(text),
			Data::Text(text) => escape(text, false, out),
			Data::Comment(comment) => {
				out.push_str("<!--");
				out.push_str(comment);
				out.push_str("-->");
			}
			Data::Element(element) => {
				out.push('<');
				out.push_str(&element.name);
				for (name, value) in &element.attributes {
					out.push(' ');
					out.push_str(name);
					out.push_str("=\"");
					escape(value, true, out);
					out.push('"');
				}
				if !element.style.is_empty() {
					out.push_str(" style=\"");
					escape(&serialize_style(&element.style), true, out);
					out.push('"');
				}
				out.push('>');
				if element.namespace == Namespace::Html && is_void_element(&element.name) {
					return;
				}
				let raw_text = matches!(element.name.as_str(), "script" | "style");
				self.serialize_children(id, raw_text, out);
				out.push_str("</");
				out.push_str(&element.name);
				out.push('>');
			}
		}
	}

	fn serialize_children(&self, id: usize, raw_text: bool, out: &mut String) {
		for &child in &self.nodes[id].children {
			self.serialize(child, raw_text, out)
		}
	}
}

fn escape(text: &str, attribute: bool, out: &mut String) {
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' if !attribute => out.push_str("&lt;"),
			'>' if !attribute => out.push_str("&gt;"),
			'"' if attribute => out.push_str("&quot;"),
			'\u{a0}' => out.push_str("&nbsp;"),
			c => out.push(c),
		}
	}
}

fn serialize_style(style: &[(String, String)]) -> String {
	let mut css = String::new();
	for (name, value) in style {
		if !css.is_empty() {
			css.push(' ');
		}
		let _ = write!(css, "{}: {};", name, value);
	}
	css
}

fn parse_style(css: &str) -> Vec<(String, String)> {
	css.split(';')
		.filter_map(|declaration| {
			let (name, value) = declaration.split_at(declaration.find(':')?);
			let (name, value) = (name.trim(), value[1..].trim());
			if name.is_empty() || value.is_empty() {
				None
			} else {
				Some((name.to_string(), value.to_string()))
			}
		})
		.collect()
}

struct Shared {
	tree: RefCell<Tree>,
	tasks: RefCell<VecDeque<Box<dyn FnOnce()>>>,
	observers: RefCell<Vec<Rc<dyn Fn(Vec<Mutation<MemoryNode>>)>>>,
	records: RefCell<Vec<Mutation<MemoryNode>>>,
	delivery_scheduled: Cell<bool>,
	mutation_count: Cell<usize>,
	capabilities: Capabilities,
}

/// A cheap handle to an in-memory document. Clones share the same document.
#[derive(Clone)]
pub struct MemoryDom(Rc<Shared>);
impl Default for MemoryDom {
	fn default() -> Self {
		Self::new()
	}
}
impl MemoryDom {
	/// Creates a document containing a single `<body>` element.
	#[must_use]
	pub fn new() -> Self {
		Self::with_capabilities(Capabilities::default())
	}

	#[must_use]
	pub fn with_capabilities(capabilities: Capabilities) -> Self {
		let mut tree = Tree {
			nodes: Vec::new(),
			document: 0,
			body: 0,
		};
		tree.document = tree.push(Data::Document);
		tree.body = tree.push(Data::Element(ElementData {
			namespace: Namespace::Html,
			name: "body".to_string(),
			attributes: Vec::new(),
			style: Vec::new(),
			properties: HashMap::new(),
			listeners: Vec::new(),
		}));
		let (document, body) = (tree.document, tree.body);
		tree.nodes[body].parent = Some(document);
		tree.nodes[document].children.push(body);

		Self(Rc::new(Shared {
			tree: RefCell::new(tree),
			tasks: RefCell::default(),
			observers: RefCell::default(),
			records: RefCell::default(),
			delivery_scheduled: Cell::new(false),
			mutation_count: Cell::new(0),
			capabilities,
		}))
	}

	#[must_use]
	pub fn body(&self) -> MemoryNode {
		MemoryNode(self.0.tree.borrow().body)
	}

	/// Number of mutating operations performed so far.
	#[must_use]
	pub fn mutation_count(&self) -> usize {
		self.0.mutation_count.get()
	}

	/// Runs queued microtasks (including mutation observer delivery) until the queue is empty.
	pub fn run_microtasks(&self) {
		let span = trace_span!("run_microtasks");
		let _enter = span.enter();
		let mut count = 0_usize;
		loop {
			let task = self.0.tasks.borrow_mut().pop_front();
			match task {
				Some(task) => {
					task();
					count += 1;
				}
				None => break,
			}
		}
		trace!("Ran {} microtask(s).", count);
	}

	#[must_use]
	pub fn inner_html(&self, node: &MemoryNode) -> String {
		let tree = self.0.tree.borrow();
		let raw_text = tree.element(node.0).map_or(false, |element| matches!(element.name.as_str(), "script" | "style"));
		let mut out = String::new();
		tree.serialize_children(node.0, raw_text, &mut out);
		out
	}

	#[must_use]
	pub fn outer_html(&self, node: &MemoryNode) -> String {
		let mut out = String::new();
		self.0.tree.borrow().serialize(node.0, false, &mut out);
		out
	}

	#[must_use]
	pub fn property(&self, element: &MemoryNode, name: &str) -> Option<Property> {
		self.0.tree.borrow().element(element.0)?.properties.get(name).cloned()
	}

	#[must_use]
	pub fn style(&self, element: &MemoryNode, name: &str) -> Option<String> {
		let tree = self.0.tree.borrow();
		tree.element(element.0)?.style.iter().find(|(n, _)| n == name).map(|(_, value)| value.clone())
	}

	#[must_use]
	pub fn listener_count(&self, node: &MemoryNode, event_type: &str) -> usize {
		let tree = self.0.tree.borrow();
		tree.element(node.0).map_or(0, |element| element.listeners.iter().filter(|(t, _)| t == event_type).count())
	}

	fn touch(&self) {
		self.0.mutation_count.set(self.0.mutation_count.get() + 1)
	}

	fn record(&self, mutation: Mutation<MemoryNode>) {
		if self.0.observers.borrow().is_empty() {
			return;
		}
		self.0.records.borrow_mut().push(mutation);
		if !self.0.delivery_scheduled.replace(true) {
			let shared = Rc::downgrade(&self.0);
			self.queue_microtask(Box::new(move || deliver(&shared)));
		}
	}
}

fn deliver(shared: &Weak<Shared>) {
	let shared = match shared.upgrade() {
		Some(shared) => shared,
		None => return,
	};
	shared.delivery_scheduled.set(false);
	let records = shared.records.take();
	if records.is_empty() {
		return;
	}
	let observers = shared.observers.borrow().clone();
	trace!("Delivering {} mutation record(s) to {} observer(s).", records.len(), observers.len());
	for observer in observers {
		observer(records.clone())
	}
}

impl Dom for MemoryDom {
	type Node = MemoryNode;
	type Event = MemoryEvent;
	type Error = MemoryDomError;

	fn capabilities(&self) -> Capabilities {
		self.0.capabilities
	}

	fn key(&self, node: &MemoryNode) -> NodeKey {
		NodeKey(node.0 as u64)
	}

	fn kind(&self, node: &MemoryNode) -> NodeKind {
		self.0.tree.borrow().nodes[node.0].data.kind()
	}

	fn namespace(&self, node: &MemoryNode) -> Option<Namespace> {
		self.0.tree.borrow().element(node.0).map(|element| element.namespace)
	}

	fn name(&self, node: &MemoryNode) -> Option<String> {
		self.0.tree.borrow().element(node.0).map(|element| element.name.clone())
	}

	fn document(&self) -> MemoryNode {
		MemoryNode(self.0.tree.borrow().document)
	}

	fn create_element(&self, namespace: Namespace, name: &str) -> Result<MemoryNode, MemoryDomError> {
		Ok(MemoryNode(self.0.tree.borrow_mut().push(Data::Element(ElementData {
			namespace,
			name: name.to_string(),
			attributes: Vec::new(),
			style: Vec::new(),
			properties: HashMap::new(),
			listeners: Vec::new(),
		}))))
	}

	fn create_text(&self, data: &str) -> MemoryNode {
		MemoryNode(self.0.tree.borrow_mut().push(Data::Text(data.to_string())))
	}

	fn create_comment(&self, data: &str) -> MemoryNode {
		MemoryNode(self.0.tree.borrow_mut().push(Data::Comment(data.to_string())))
	}

	fn create_fragment(&self) -> MemoryNode {
		MemoryNode(self.0.tree.borrow_mut().push(Data::Fragment))
	}

	fn clone_node(&self, node: &MemoryNode, deep: bool) -> Result<MemoryNode, MemoryDomError> {
		let mut tree = self.0.tree.borrow_mut();
		let found = tree.nodes[node.0].data.kind();
		if found == NodeKind::Document {
			return Err(MemoryDomError::WrongKind {
				node: *node,
				expected: "a non-document node",
				found,
			});
		}
		Ok(MemoryNode(tree.deep_clone(node.0, deep)))
	}

	fn parent(&self, node: &MemoryNode) -> Option<MemoryNode> {
		self.0.tree.borrow().nodes[node.0].parent.map(MemoryNode)
	}

	fn first_child(&self, node: &MemoryNode) -> Option<MemoryNode> {
		self.0.tree.borrow().nodes[node.0].children.first().copied().map(MemoryNode)
	}

	fn last_child(&self, node: &MemoryNode) -> Option<MemoryNode> {
		self.0.tree.borrow().nodes[node.0].children.last().copied().map(MemoryNode)
	}

	fn next_sibling(&self, node: &MemoryNode) -> Option<MemoryNode> {
		let tree = self.0.tree.borrow();
		let siblings = &tree.nodes[tree.nodes[node.0].parent?].children;
		let index = siblings.iter().position(|&sibling| sibling == node.0)?;
		siblings.get(index + 1).copied().map(MemoryNode)
	}

	fn previous_sibling(&self, node: &MemoryNode) -> Option<MemoryNode> {
		let tree = self.0.tree.borrow();
		let siblings = &tree.nodes[tree.nodes[node.0].parent?].children;
		let index = siblings.iter().position(|&sibling| sibling == node.0)?;
		index.checked_sub(1).map(|index| MemoryNode(siblings[index]))
	}

	fn child_nodes(&self, node: &MemoryNode) -> Vec<MemoryNode> {
		self.0.tree.borrow().nodes[node.0].children.iter().copied().map(MemoryNode).collect()
	}

	fn child_at(&self, node: &MemoryNode, index: usize) -> Option<MemoryNode> {
		self.0.tree.borrow().nodes[node.0].children.get(index).copied().map(MemoryNode)
	}

	fn insert_before(&self, parent: &MemoryNode, node: &MemoryNode, reference: Option<&MemoryNode>) -> Result<(), MemoryDomError> {
		let mut records = Vec::new();
		{
			let mut tree = self.0.tree.borrow_mut();
			match tree.nodes[parent.0].data.kind() {
				NodeKind::Document | NodeKind::Fragment | NodeKind::Element => (),
				NodeKind::Text | NodeKind::Comment => return Err(MemoryDomError::Hierarchy { parent: *parent, node: *node }),
			}
			let node_kind = tree.nodes[node.0].data.kind();
			if node_kind == NodeKind::Document || (node_kind != NodeKind::Fragment && tree.is_inclusive_ancestor(node.0, parent.0)) {
				return Err(MemoryDomError::Hierarchy { parent: *parent, node: *node });
			}
			let mut reference = reference.map(|reference| reference.0);
			if let Some(r) = reference {
				if tree.nodes[r].parent != Some(parent.0) {
					return Err(MemoryDomError::NotAChild {
						parent: *parent,
						node: MemoryNode(r),
					});
				}
				if r == node.0 {
					let siblings = &tree.nodes[parent.0].children;
					reference = siblings.iter().position(|&sibling| sibling == r).and_then(|index| siblings.get(index + 1)).copied();
				}
			}

			let moved = if node_kind == NodeKind::Fragment {
				let children = core::mem::take(&mut tree.nodes[node.0].children);
				for &child in &children {
					tree.nodes[child].parent = None;
				}
				children
			} else {
				vec![node.0]
			};

			for &id in &moved {
				if let Some(old_parent) = tree.detach(id) {
					if tree.connected(old_parent) {
						records.push(Mutation {
							added: Vec::new(),
							removed: vec![MemoryNode(id)],
						})
					}
				}
			}

			let siblings = &tree.nodes[parent.0].children;
			let index = reference.and_then(|r| siblings.iter().position(|&sibling| sibling == r)).unwrap_or(siblings.len());
			for &id in &moved {
				tree.nodes[id].parent = Some(parent.0);
			}
			tree.nodes[parent.0].children.splice(index..index, moved.iter().copied());

			if !moved.is_empty() && tree.connected(parent.0) {
				records.push(Mutation {
					added: moved.into_iter().map(MemoryNode).collect(),
					removed: Vec::new(),
				})
			}
		}
		self.touch();
		for record in records {
			self.record(record)
		}
		Ok(())
	}

	fn remove_child(&self, parent: &MemoryNode, node: &MemoryNode) -> Result<(), MemoryDomError> {
		let connected = {
			let mut tree = self.0.tree.borrow_mut();
			if tree.nodes[node.0].parent != Some(parent.0) {
				return Err(MemoryDomError::NotAChild { parent: *parent, node: *node });
			}
			tree.detach(node.0);
			tree.connected(parent.0)
		};
		self.touch();
		if connected {
			self.record(Mutation {
				added: Vec::new(),
				removed: vec![*node],
			})
		}
		Ok(())
	}

	fn delete_range(&self, first: &MemoryNode, last: &MemoryNode) -> Result<(), MemoryDomError> {
		let (removed, connected) = {
			let mut tree = self.0.tree.borrow_mut();
			let invalid = MemoryDomError::InvalidRange { first: *first, last: *last };
			let parent = match (tree.nodes[first.0].parent, tree.nodes[last.0].parent) {
				(Some(a), Some(b)) if a == b => a,
				_ => return Err(invalid),
			};
			let siblings = &tree.nodes[parent].children;
			let start = siblings.iter().position(|&sibling| sibling == first.0).ok_or_else(|| invalid.clone())?;
			let end = siblings.iter().position(|&sibling| sibling == last.0).ok_or_else(|| invalid.clone())?;
			if start > end {
				return Err(invalid);
			}
			let removed: Vec<usize> = tree.nodes[parent].children.drain(start..=end).collect();
			for &id in &removed {
				tree.nodes[id].parent = None;
			}
			(removed, tree.connected(parent))
		};
		self.touch();
		if connected {
			self.record(Mutation {
				added: Vec::new(),
				removed: removed.into_iter().map(MemoryNode).collect(),
			})
		}
		Ok(())
	}

	fn text_content(&self, node: &MemoryNode) -> String {
		let tree = self.0.tree.borrow();
		match &tree.nodes[node.0].data {
			Data::Comment(comment) => comment.clone(),
			_ => {
				let mut out = String::new();
				tree.text_content(node.0, &mut out);
				out
			}
		}
	}

	fn set_text_content(&self, node: &MemoryNode, text: &str) {
		let removed = {
			let mut tree = self.0.tree.borrow_mut();
			match tree.nodes[node.0].data.kind() {
				NodeKind::Text | NodeKind::Comment => {
					if let Data::Text(data) | Data::Comment(data) = &mut tree.nodes[node.0].data {
						*data = text.to_string();
					}
					None
				}
				NodeKind::Document => None,
				NodeKind::Element | NodeKind::Fragment => {
					let removed = core::mem::take(&mut tree.nodes[node.0].children);
					for &child in &removed {
						tree.nodes[child].parent = None;
					}
					if !text.is_empty() {
						let text = tree.push(Data::Text(text.to_string()));
						tree.nodes[text].parent = Some(node.0);
						tree.nodes[node.0].children.push(text);
					}
					if !removed.is_empty() && tree.connected(node.0) {
						Some(removed)
					} else {
						None
					}
				}
			}
		};
		self.touch();
		if let Some(removed) = removed {
			self.record(Mutation {
				added: Vec::new(),
				removed: removed.into_iter().map(MemoryNode).collect(),
			})
		}
	}

	fn attribute(&self, element: &MemoryNode, name: &str) -> Option<String> {
		let tree = self.0.tree.borrow();
		let element = tree.element(element.0)?;
		if name == "style" {
			return if element.style.is_empty() { None } else { Some(serialize_style(&element.style)) };
		}
		element.attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.clone())
	}

	fn attribute_names(&self, element: &MemoryNode) -> Vec<String> {
		let tree = self.0.tree.borrow();
		tree.element(element.0).map_or_else(Vec::new, |element| {
			let mut names: Vec<String> = element.attributes.iter().map(|(name, _)| name.clone()).collect();
			if !element.style.is_empty() {
				names.push("style".to_string())
			}
			names
		})
	}

	fn set_attribute(&self, element: &MemoryNode, name: &str, value: &str) -> Result<(), MemoryDomError> {
		{
			let mut tree = self.0.tree.borrow_mut();
			let element = tree.element_mut(element.0)?;
			if name == "style" {
				element.style = parse_style(value);
			} else {
				match element.attributes.iter_mut().find(|(n, _)| n == name) {
					Some((_, existing)) => *existing = value.to_string(),
					None => element.attributes.push((name.to_string(), value.to_string())),
				}
			}
		}
		self.touch();
		Ok(())
	}

	fn remove_attribute(&self, element: &MemoryNode, name: &str) -> Result<(), MemoryDomError> {
		{
			let mut tree = self.0.tree.borrow_mut();
			let element = tree.element_mut(element.0)?;
			if name == "style" {
				element.style.clear();
			} else {
				element.attributes.retain(|(n, _)| n != name);
			}
		}
		self.touch();
		Ok(())
	}

	fn has_property(&self, element: &MemoryNode, name: &str) -> bool {
		let tree = self.0.tree.borrow();
		match tree.element(element.0) {
			Some(data) => {
				EVENT_HANDLER_PROPERTIES.contains(&name)
					|| data.properties.contains_key(name)
					|| (data.namespace == Namespace::Html && (GLOBAL_PROPERTIES.contains(&name) || element_properties(&data.name).contains(&name)))
			}
			None => false,
		}
	}

	fn set_property(&self, element: &MemoryNode, name: &str, value: &Property) -> Result<(), MemoryDomError> {
		{
			let mut tree = self.0.tree.borrow_mut();
			tree.element_mut(element.0)?.properties.insert(name.to_string(), value.clone());
		}
		self.touch();
		Ok(())
	}

	fn set_style(&self, element: &MemoryNode, name: &str, value: Option<&str>) -> Result<(), MemoryDomError> {
		{
			let mut tree = self.0.tree.borrow_mut();
			let style = &mut tree.element_mut(element.0)?.style;
			match (value, style.iter().position(|(n, _)| n == name)) {
				(Some(value), Some(index)) => style[index].1 = value.to_string(),
				(Some(value), None) => style.push((name.to_string(), value.to_string())),
				(None, Some(index)) => {
					style.remove(index);
				}
				(None, None) => (),
			}
		}
		self.touch();
		Ok(())
	}

	fn set_style_text(&self, element: &MemoryNode, css: &str) -> Result<(), MemoryDomError> {
		{
			let mut tree = self.0.tree.borrow_mut();
			tree.element_mut(element.0)?.style = parse_style(css);
		}
		self.touch();
		Ok(())
	}

	fn add_event_listener(&self, node: &MemoryNode, event_type: &str, listener: &Listener<MemoryEvent>) -> Result<(), MemoryDomError> {
		{
			let mut tree = self.0.tree.borrow_mut();
			let listeners = &mut tree.element_mut(node.0)?.listeners;
			if !listeners.iter().any(|(t, l)| t == event_type && l == listener) {
				listeners.push((event_type.to_string(), listener.clone()))
			}
		}
		self.touch();
		Ok(())
	}

	fn remove_event_listener(&self, node: &MemoryNode, event_type: &str, listener: &Listener<MemoryEvent>) -> Result<(), MemoryDomError> {
		{
			let mut tree = self.0.tree.borrow_mut();
			tree.element_mut(node.0)?.listeners.retain(|(t, l)| !(t == event_type && l == listener));
		}
		self.touch();
		Ok(())
	}

	/// Only listeners on `node` itself are invoked; events don't bubble.
	fn dispatch_event(&self, node: &MemoryNode, event_type: &str) -> Result<(), MemoryDomError> {
		let listeners: Vec<Listener<MemoryEvent>> = {
			let tree = self.0.tree.borrow();
			match tree.element(node.0) {
				Some(element) => element.listeners.iter().filter(|(t, _)| t == event_type).map(|(_, listener)| listener.clone()).collect(),
				None => Vec::new(),
			}
		};
		let event = MemoryEvent {
			event_type: event_type.to_string(),
			target: *node,
		};
		for listener in listeners {
			listener.call(&event)
		}
		Ok(())
	}

	fn is_connected(&self, node: &MemoryNode) -> bool {
		self.0.tree.borrow().connected(node.0)
	}

	fn observe(&self, callback: ObserverCallback<MemoryNode>) -> Result<(), MemoryDomError> {
		self.0.observers.borrow_mut().push(Rc::from(callback));
		Ok(())
	}

	fn queue_microtask(&self, task: Box<dyn FnOnce()>) {
		self.0.tasks.borrow_mut().push_back(task)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fragment_insertion_moves_children() {
		let dom = MemoryDom::new();
		let fragment = dom.create_fragment();
		let a = dom.create_text("a");
		let b = dom.create_element(Namespace::Html, "b").unwrap();
		dom.append_child(&fragment, &a).unwrap();
		dom.append_child(&fragment, &b).unwrap();

		dom.append_child(&dom.body(), &fragment).unwrap();
		assert!(dom.child_nodes(&fragment).is_empty());
		assert_eq!(dom.inner_html(&dom.body()), "a<b></b>");
		assert!(dom.is_connected(&b));
	}

	#[test]
	fn style_attribute_round_trips_through_declarations() {
		let dom = MemoryDom::new();
		let div = dom.create_element(Namespace::Html, "div").unwrap();
		dom.set_attribute(&div, "style", "width: 10px;display:flex").unwrap();
		assert_eq!(dom.style(&div, "display").as_deref(), Some("flex"));
		assert_eq!(dom.outer_html(&div), r#"<div style="width: 10px; display: flex;"></div>"#);
	}

	#[test]
	fn delete_range_requires_siblings() {
		let dom = MemoryDom::new();
		let body = dom.body();
		let nodes: Vec<_> = (0..4).map(|i| dom.create_text(&i.to_string())).collect();
		for node in &nodes {
			dom.append_child(&body, node).unwrap();
		}
		assert!(dom.delete_range(&nodes[2], &nodes[1]).is_err());
		dom.delete_range(&nodes[1], &nodes[2]).unwrap();
		assert_eq!(dom.text_content(&body), "03");
	}
}
