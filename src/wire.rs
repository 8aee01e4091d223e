//! Multi-node template results that behave like a single list item.

use crate::{
	dom::{Dom, Namespace},
	engine::Engine,
	reconcile::remove_run,
	value::Value,
};
use core::fmt::{self, Debug, Formatter};
use std::{cell::RefCell, rc::Rc};
use tracing::error;

/// A fixed, non-empty run of sibling nodes, compared by identity.
///
/// While placed, the nodes must stay adjacent and in order.
pub struct Wire<D: Dom>(Rc<Vec<D::Node>>);
impl<D: Dom> Clone for Wire<D> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}
impl<D: Dom> PartialEq for Wire<D> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl<D: Dom> Debug for Wire<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Wire").field(&self.0.len()).finish()
	}
}

impl<D: Dom> Wire<D> {
	/// [`None`] if `child_nodes` is empty.
	#[must_use]
	pub fn new(child_nodes: Vec<D::Node>) -> Option<Self> {
		if child_nodes.is_empty() {
			None
		} else {
			Some(Self(Rc::new(child_nodes)))
		}
	}

	#[must_use]
	pub fn child_nodes(&self) -> &[D::Node] {
		&self.0
	}

	#[must_use]
	pub fn first(&self) -> &D::Node {
		&self.0[0]
	}

	#[must_use]
	pub fn last(&self) -> &D::Node {
		&self.0[self.0.len() - 1]
	}

	/// Collects all nodes into a fresh fragment, for insertion as one unit.
	pub fn insert(&self, dom: &D) -> D::Node {
		let fragment = dom.create_fragment();
		for node in self.0.iter() {
			if let Err(error) = dom.append_child(&fragment, node) {
				error!("Failed to collect wire node into fragment: {:?}", error)
			}
		}
		fragment
	}

	/// Removes every node but the first, which is returned for the caller to remove.
	pub fn remove(&self, dom: &D) -> D::Node {
		if self.0.len() > 1 {
			match dom.parent(self.last()) {
				Some(parent) => remove_run(dom, &parent, &self.0[1], self.last()),
				None => error!("Can't remove detached wire."),
			}
		}
		self.first().clone()
	}
}

/// Renders templates into a private fragment and hands out the result as a single [`Value`].
///
/// Re-rendering the same template updates and returns the same nodes.
pub struct WireRenderer<D: Dom> {
	engine: Engine<D>,
	fragment: D::Node,
	namespace: Namespace,
	content: RefCell<Value<D>>,
}
impl<D: Dom> WireRenderer<D> {
	pub(crate) fn new(engine: Engine<D>, namespace: Namespace) -> Self {
		let fragment = engine.dom().create_fragment();
		Self {
			engine,
			fragment,
			namespace,
			content: RefCell::new(Value::Null),
		}
	}

	/// [`Value::Null`] for an empty template, [`Value::Node`] for a single node and [`Value::Wire`] otherwise.
	pub fn render(&self, strings: &'static [&'static str], values: Vec<Value<D>>) -> Value<D> {
		if self.engine.render_into(&self.fragment, strings, self.namespace, values) {
			let mut child_nodes = self.engine.dom().child_nodes(&self.fragment);
			let content = match child_nodes.len() {
				0 => Value::Null,
				1 => Value::Node(child_nodes.remove(0)),
				_ => Wire::new(child_nodes).map_or(Value::Null, Value::Wire),
			};
			*self.content.borrow_mut() = content;
		}
		self.content.borrow().clone()
	}

	#[must_use]
	pub fn namespace(&self) -> Namespace {
		self.namespace
	}
}
