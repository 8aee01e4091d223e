//! Child-index routes from a template fragment to the nodes its interpolations update.

use crate::dom::Dom;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKind {
	/// The value targets one attribute of the element at the end of the route.
	Attribute(String),
	/// The value replaces the text of a text-only element (`<style>`, `<textarea>`, …).
	Text,
	/// The value becomes arbitrary content in front of the comment placeholder at the end of the route.
	Any,
}

/// Where an interpolation lands, relative to its template's root fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
	pub kind: PathKind,
	/// Child indices, outermost first.
	pub route: Vec<usize>,
}
impl Path {
	/// Walks [`Path::route`] from `root`.
	///
	/// Only meaningful on an untouched clone of the fragment the path was recorded on.
	pub fn resolve<D: Dom>(&self, dom: &D, root: &D::Node) -> Option<D::Node> {
		walk(dom, root, &self.route)
	}
}

pub(crate) fn walk<D: Dom>(dom: &D, root: &D::Node, route: &[usize]) -> Option<D::Node> {
	route.iter().try_fold(root.clone(), |node, &index| dom.child_at(&node, index))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::{memory::MemoryDom, Namespace};

	#[test]
	fn resolves_by_child_index() {
		let dom = MemoryDom::new();
		let root = dom.create_fragment();
		let div = dom.create_element(Namespace::Html, "div").unwrap();
		let marker = dom.create_comment("");
		dom.append_child(&root, &dom.create_text("before")).unwrap();
		dom.append_child(&root, &div).unwrap();
		dom.append_child(&div, &dom.create_text("x")).unwrap();
		dom.append_child(&div, &marker).unwrap();

		let path = Path {
			kind: PathKind::Any,
			route: vec![1, 1],
		};
		assert_eq!(path.resolve(&dom, &root), Some(marker));

		let missing = Path {
			kind: PathKind::Text,
			route: vec![1, 2],
		};
		assert_eq!(missing.resolve(&dom, &root), None);
	}
}
