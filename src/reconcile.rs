//! Keyed list reconciliation against live sibling nodes.

use crate::{
	dom::Dom,
	value::{component_address, Component, Content},
	wire::Wire,
};
use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use tracing::{error, instrument, trace};

/// Why the reconciler asks for an item's node.
///
/// Multi-node items (wires) answer differently depending on the hint:
/// a fragment of all their nodes to [`Hint::Insert`], their first/last node to [`Hint::First`]/[`Hint::Last`],
/// and, for [`Hint::Remove`], their first node after removing all the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
	Insert,
	Remove,
	First,
	Last,
}

/// A reconcilable unit of content.
pub enum Item<D: Dom> {
	Node(D::Node),
	Wire(Wire<D>),
	Component(Rc<dyn Component<D>>),
}
impl<D: Dom> Clone for Item<D> {
	fn clone(&self) -> Self {
		match self {
			Item::Node(node) => Item::Node(node.clone()),
			Item::Wire(wire) => Item::Wire(wire.clone()),
			Item::Component(component) => Item::Component(component.clone()),
		}
	}
}
impl<D: Dom> PartialEq for Item<D> {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Item::Node(a), Item::Node(b)) => a == b,
			(Item::Wire(a), Item::Wire(b)) => a == b,
			(Item::Component(a), Item::Component(b)) => component_address(a) == component_address(b),
			_ => false,
		}
	}
}
impl<D: Dom> Debug for Item<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Item::Node(node) => f.debug_tuple("Node").field(node).finish(),
			Item::Wire(wire) => Debug::fmt(wire, f),
			Item::Component(component) => f.debug_tuple("Component").field(&format_args!("{:#x}", component_address(component))).finish(),
		}
	}
}
impl<D: Dom> Item<D> {
	pub fn node(&self, dom: &D, hint: Hint) -> D::Node {
		let wire_node = |wire: &Wire<D>| match hint {
			Hint::Insert => wire.insert(dom),
			Hint::Remove => wire.remove(dom),
			Hint::First => wire.first().clone(),
			Hint::Last => wire.last().clone(),
		};
		match self {
			Item::Node(node) => node.clone(),
			Item::Wire(wire) => wire_node(wire),
			Item::Component(component) => match component.content() {
				Content::Node(node) => node,
				Content::Wire(wire) => wire_node(&wire),
			},
		}
	}
}

fn insert<D: Dom>(dom: &D, parent: &D::Node, node: &D::Node, reference: Option<&D::Node>) {
	if let Err(error) = dom.insert_before(parent, node, reference) {
		error!("Failed to insert node: {:?}", error)
	}
}

/// Removes `first`, `last` and every sibling between them from `parent`.
pub(crate) fn remove_run<D: Dom>(dom: &D, parent: &D::Node, first: &D::Node, last: &D::Node) {
	if first == last {
		if let Err(error) = dom.remove_child(parent, first) {
			error!("Failed to remove node: {:?}", error)
		}
		return;
	}
	if dom.capabilities().range_deletion {
		match dom.delete_range(first, last) {
			Ok(()) => return,
			Err(error) => error!("Range deletion failed, removing nodes one by one: {:?}", error),
		}
	}
	let mut next = Some(first.clone());
	while let Some(node) = next {
		next = if &node == last { None } else { dom.next_sibling(&node) };
		if let Err(error) = dom.remove_child(parent, &node) {
			return error!("Failed to remove node: {:?}", error);
		}
	}
}

/// Makes the children of `parent` in front of `before` (or at its end) match `future`, where they currently match `current`.
///
/// Items are compared with [`PartialEq`] and expected to be unique within each list.
/// Matching items keep their nodes: unchanged runs at either end are skipped,
/// items that swapped ends are moved, others are looked up and moved or created.
/// Returns `future`, to be passed in as `current` next time.
#[instrument(level = "trace", skip_all, fields(current = current.len(), future = future.len()))]
pub fn reconcile<D, T, F>(dom: &D, parent: &D::Node, current: Vec<T>, future: Vec<T>, get: F, before: Option<&D::Node>) -> Vec<T>
where
	D: Dom,
	T: PartialEq,
	F: Fn(&T, Hint) -> D::Node,
{
	let mut current: Vec<Option<T>> = current.into_iter().map(Some).collect();
	let (mut current_start, mut current_end) = (0, current.len());
	let (mut future_start, mut future_end) = (0, future.len());
	let mut moves = 0_usize;

	while current_start < current_end && future_start < future_end {
		let current_first = match &current[current_start] {
			Some(item) => item,
			None => {
				current_start += 1;
				continue;
			}
		};
		let current_last = match &current[current_end - 1] {
			Some(item) => item,
			None => {
				current_end -= 1;
				continue;
			}
		};
		let future_first = &future[future_start];
		let future_last = &future[future_end - 1];

		if current_first == future_first {
			current_start += 1;
			future_start += 1;
		} else if current_last == future_last {
			current_end -= 1;
			future_end -= 1;
		} else if current_first == future_last {
			let after = dom.next_sibling(&get(current_last, Hint::Last));
			insert(dom, parent, &get(current_first, Hint::Insert), after.as_ref());
			moves += 1;
			current_start += 1;
			future_end -= 1;
		} else if current_last == future_first {
			insert(dom, parent, &get(current_last, Hint::Insert), Some(&get(current_first, Hint::First)));
			moves += 1;
			current_end -= 1;
			future_start += 1;
		} else {
			let reference = get(current_first, Hint::First);
			let found = current[current_start..current_end].iter().position(|item| item.as_ref() == Some(future_first));
			match found {
				Some(offset) => {
					let node = current[current_start + offset].take().map(|item| get(&item, Hint::Insert));
					if let Some(node) = node {
						insert(dom, parent, &node, Some(&reference));
						moves += 1;
					}
				}
				None => insert(dom, parent, &get(future_first, Hint::Insert), Some(&reference)),
			}
			future_start += 1;
		}
	}

	let inserted = future_end.saturating_sub(future_start);
	if future_start < future_end {
		let reference = match future.get(future_end) {
			Some(item) => Some(get(item, Hint::First)),
			None => before.cloned(),
		};
		let node = if inserted == 1 {
			get(&future[future_start], Hint::Insert)
		} else {
			let fragment = dom.create_fragment();
			for item in &future[future_start..future_end] {
				insert(dom, &fragment, &get(item, Hint::Insert), None);
			}
			fragment
		};
		insert(dom, parent, &node, reference.as_ref());
	}

	let mut removed = 0_usize;
	let remaining: Vec<&T> = current[current_start.min(current_end)..current_end].iter().filter_map(Option::as_ref).collect();
	match remaining.as_slice() {
		[] => (),
		[item] => {
			let node = get(item, Hint::Remove);
			remove_run(dom, parent, &node, &node);
			removed = 1;
		}
		[first, .., last] => {
			let first = get(first, Hint::Remove);
			let last = get(last, Hint::Remove);
			remove_run(dom, parent, &first, &last);
			removed = remaining.len();
		}
	}

	trace!(moves, inserted, removed, "Reconciled.");
	future
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::memory::{MemoryDom, MemoryNode};

	#[test]
	fn appends_in_front_of_the_marker() {
		let dom = MemoryDom::new();
		let parent = dom.body();
		let marker = dom.create_comment("marker");
		dom.append_child(&parent, &marker).unwrap();
		let nodes: Vec<MemoryNode> = ["a", "b"].iter().map(|text| dom.create_text(text)).collect();

		let current = reconcile(&dom, &parent, Vec::new(), nodes.clone(), |node, _| *node, Some(&marker));
		assert_eq!(dom.inner_html(&parent), "ab<!--marker-->");

		let cleared = reconcile(&dom, &parent, current, Vec::new(), |node, _| *node, Some(&marker));
		assert!(cleared.is_empty());
		assert_eq!(dom.child_nodes(&parent), vec![marker]);
	}
}
