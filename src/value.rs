//! Interpolation values.

use crate::{
	dom::{Dom, Listener, NodeKind, Property},
	pending::Pending,
	wire::Wire,
};
use core::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;

/// A string, number or boolean, rendered the way a browser would stringify it.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
	Str(String),
	Number(f64),
	Bool(bool),
}
impl Primitive {
	pub(crate) fn to_property(&self) -> Property {
		match self {
			Primitive::Str(string) => Property::Str(string.clone()),
			Primitive::Number(number) => Property::Number(*number),
			Primitive::Bool(boolean) => Property::Bool(*boolean),
		}
	}
}
impl Display for Primitive {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Primitive::Str(string) => f.write_str(string),
			Primitive::Number(number) if number.is_nan() => f.write_str("NaN"),
			Primitive::Number(number) if number.is_infinite() => f.write_str(if *number > 0.0 { "Infinity" } else { "-Infinity" }),
			// Also catches `-0.0`.
			Primitive::Number(number) if *number == 0.0 => f.write_str("0"),
			Primitive::Number(number) if number.abs() >= 1e21 || number.abs() < 1e-6 => {
				let formatted = format!("{:e}", number);
				match formatted.split_once('e') {
					Some((mantissa, exponent)) if !exponent.starts_with('-') => write!(f, "{}e+{}", mantissa, exponent),
					_ => f.write_str(&formatted),
				}
			}
			Primitive::Number(number) => Display::fmt(number, f),
			Primitive::Bool(boolean) => Display::fmt(boolean, f),
		}
	}
}

/// What a [`Component`] currently renders as.
pub enum Content<D: Dom> {
	Node(D::Node),
	Wire(Wire<D>),
}

/// An object that knows how to produce its current DOM content.
///
/// Components are compared by identity: the same [`Rc`] placed twice is the same list item.
pub trait Component<D: Dom> {
	fn content(&self) -> Content<D>;
}

/// Everything that can be interpolated into a template.
pub enum Value<D: Dom> {
	/// Clears content, removes plain attributes and sets properties to their null value.
	Null,
	Primitive(Primitive),
	List(Vec<Value<D>>),
	Node(D::Node),
	Wire(Wire<D>),
	Component(Rc<dyn Component<D>>),
	Pending(Pending<Value<D>>),
	Intent(Intent<D>),
	Listener(Listener<D::Event>),
	/// Camel- or kebab-case declaration names. [`None`] removes a declaration.
	Style(Vec<(String, Option<Primitive>)>),
}

/// An explicit instruction for how a value should be rendered.
pub enum Intent<D: Dom> {
	/// Render as text even in content position.
	Text(Box<Value<D>>),
	/// Render as arbitrary content.
	Any(Box<Value<D>>),
	/// Parse as markup.
	Html(Box<Value<D>>),
	/// Render `placeholder` now and `source` asynchronously.
	Placeholder { placeholder: Box<Value<D>>, source: Box<Intent<D>> },
	/// A record dispatched to the first registered intent whose name it contains.
	Custom(Vec<(String, Value<D>)>),
}

impl<D: Dom> Clone for Value<D> {
	fn clone(&self) -> Self {
		match self {
			Value::Null => Value::Null,
			Value::Primitive(primitive) => Value::Primitive(primitive.clone()),
			Value::List(values) => Value::List(values.clone()),
			Value::Node(node) => Value::Node(node.clone()),
			Value::Wire(wire) => Value::Wire(wire.clone()),
			Value::Component(component) => Value::Component(component.clone()),
			Value::Pending(pending) => Value::Pending(pending.clone()),
			Value::Intent(intent) => Value::Intent(intent.clone()),
			Value::Listener(listener) => Value::Listener(listener.clone()),
			Value::Style(declarations) => Value::Style(declarations.clone()),
		}
	}
}
impl<D: Dom> Clone for Intent<D> {
	fn clone(&self) -> Self {
		match self {
			Intent::Text(value) => Intent::Text(value.clone()),
			Intent::Any(value) => Intent::Any(value.clone()),
			Intent::Html(value) => Intent::Html(value.clone()),
			Intent::Placeholder { placeholder, source } => Intent::Placeholder {
				placeholder: placeholder.clone(),
				source: source.clone(),
			},
			Intent::Custom(record) => Intent::Custom(record.clone()),
		}
	}
}

pub(crate) fn component_address<D: Dom>(component: &Rc<dyn Component<D>>) -> usize {
	Rc::as_ptr(component) as *const () as usize
}

impl<D: Dom> Value<D> {
	pub fn node(node: D::Node) -> Self {
		Value::Node(node)
	}

	pub fn listener(handler: impl 'static + Fn(&D::Event)) -> Self {
		Value::Listener(Listener::new(handler))
	}

	pub fn component(component: impl 'static + Component<D>) -> Self {
		Value::Component(Rc::new(component))
	}

	pub fn style<K: Into<String>>(declarations: impl IntoIterator<Item = (K, Option<Primitive>)>) -> Self {
		Value::Style(declarations.into_iter().map(|(name, value)| (name.into(), value)).collect())
	}

	pub fn text(value: impl Into<Value<D>>) -> Self {
		Value::Intent(Intent::Text(Box::new(value.into())))
	}

	pub fn html(value: impl Into<Value<D>>) -> Self {
		Value::Intent(Intent::Html(Box::new(value.into())))
	}

	pub fn any(value: impl Into<Value<D>>) -> Self {
		Value::Intent(Intent::Any(Box::new(value.into())))
	}

	/// Shows `placeholder` until `source` (usually holding a [`Pending`]) can be rendered.
	pub fn placeholder(placeholder: impl Into<Value<D>>, source: Intent<D>) -> Self {
		Value::Intent(Intent::Placeholder {
			placeholder: Box::new(placeholder.into()),
			source: Box::new(source),
		})
	}

	/// A one-entry [`Intent::Custom`] record.
	pub fn custom(name: impl Into<String>, value: impl Into<Value<D>>) -> Self {
		Value::Intent(Intent::Custom(vec![(name.into(), value.into())]))
	}

	#[must_use]
	pub fn kind(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Primitive(_) => "primitive",
			Value::List(_) => "list",
			Value::Node(_) => "node",
			Value::Wire(_) => "wire",
			Value::Component(_) => "component",
			Value::Pending(_) => "pending",
			Value::Intent(_) => "intent",
			Value::Listener(_) => "listener",
			Value::Style(_) => "style",
		}
	}

	/// Text of primitives and (recursively) lists of them, concatenated.
	///
	/// [`None`] if anything else is encountered.
	pub(crate) fn to_text(&self) -> Option<String> {
		match self {
			Value::Null => Some(String::new()),
			Value::Primitive(primitive) => Some(primitive.to_string()),
			Value::List(values) => values.iter().map(Value::to_text).collect(),
			_ => None,
		}
	}

	/// Content nodes for a single node value. Fragments stand for their children.
	pub(crate) fn expand_node(dom: &D, node: D::Node) -> Vec<D::Node> {
		if dom.kind(&node) == NodeKind::Fragment {
			dom.child_nodes(&node)
		} else {
			vec![node]
		}
	}
}

impl<D: Dom> Debug for Value<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		if cfg!(feature = "dangerous-logging") {
			match self {
				Value::Null => f.write_str("Null"),
				Value::Primitive(primitive) => f.debug_tuple("Primitive").field(primitive).finish(),
				Value::List(values) => f.debug_tuple("List").field(values).finish(),
				Value::Node(node) => f.debug_tuple("Node").field(node).finish(),
				Value::Wire(wire) => f.debug_tuple("Wire").field(&wire.child_nodes()).finish(),
				Value::Component(component) => f.debug_tuple("Component").field(&format_args!("{:#x}", component_address(component))).finish(),
				Value::Pending(pending) => Debug::fmt(pending, f),
				Value::Intent(intent) => Debug::fmt(intent, f),
				Value::Listener(listener) => Debug::fmt(listener, f),
				Value::Style(declarations) => f.debug_tuple("Style").field(declarations).finish(),
			}
		} else {
			match self {
				Value::List(values) => write!(f, "List(<{} values>)", values.len()),
				Value::Intent(intent) => Debug::fmt(intent, f),
				other => write!(f, "<{}>", other.kind()),
			}
		}
	}
}
impl<D: Dom> Debug for Intent<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Intent::Text(value) => f.debug_tuple("Text").field(value).finish(),
			Intent::Any(value) => f.debug_tuple("Any").field(value).finish(),
			Intent::Html(value) => f.debug_tuple("Html").field(value).finish(),
			Intent::Placeholder { placeholder, source } => f.debug_struct("Placeholder").field("placeholder", placeholder).field("source", source).finish(),
			Intent::Custom(record) => f.debug_tuple("Custom").field(&record.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>()).finish(),
		}
	}
}

impl<D: Dom> From<Primitive> for Value<D> {
	fn from(primitive: Primitive) -> Self {
		Value::Primitive(primitive)
	}
}
impl<D: Dom> From<&str> for Value<D> {
	fn from(string: &str) -> Self {
		Value::Primitive(Primitive::Str(string.to_string()))
	}
}
impl<D: Dom> From<String> for Value<D> {
	fn from(string: String) -> Self {
		Value::Primitive(Primitive::Str(string))
	}
}
impl<D: Dom> From<bool> for Value<D> {
	fn from(boolean: bool) -> Self {
		Value::Primitive(Primitive::Bool(boolean))
	}
}
macro_rules! number_values {
	($($ty:ty),*$(,)?) => {$(
		impl<D: Dom> From<$ty> for Value<D> {
			#[allow(clippy::cast_lossless, clippy::cast_precision_loss)]
			fn from(number: $ty) -> Self {
				Value::Primitive(Primitive::Number(number as f64))
			}
		}
	)*};
}
number_values!(f64, f32, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<D: Dom, T: Into<Value<D>>> From<Option<T>> for Value<D> {
	fn from(option: Option<T>) -> Self {
		option.map_or(Value::Null, Into::into)
	}
}
impl<D: Dom, T: Into<Value<D>>> From<Vec<T>> for Value<D> {
	fn from(values: Vec<T>) -> Self {
		Value::List(values.into_iter().map(Into::into).collect())
	}
}
impl<D: Dom> From<Wire<D>> for Value<D> {
	fn from(wire: Wire<D>) -> Self {
		Value::Wire(wire)
	}
}
impl<D: Dom> From<Pending<Value<D>>> for Value<D> {
	fn from(pending: Pending<Value<D>>) -> Self {
		Value::Pending(pending)
	}
}
impl<D: Dom> From<Intent<D>> for Value<D> {
	fn from(intent: Intent<D>) -> Self {
		Value::Intent(intent)
	}
}
impl<D: Dom> From<Listener<D::Event>> for Value<D> {
	fn from(listener: Listener<D::Event>) -> Self {
		Value::Listener(listener)
	}
}
impl<D: Dom> From<Rc<dyn Component<D>>> for Value<D> {
	fn from(component: Rc<dyn Component<D>>) -> Self {
		Value::Component(component)
	}
}

/// Builds a `Vec<Value<_>>` from anything convertible into [`Value`].
#[macro_export]
macro_rules! values {
	($($value:expr),*$(,)?) => {
		vec![$($crate::Value::from($value)),*]
	};
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::memory::MemoryDom;

	type V = Value<MemoryDom>;

	#[test]
	fn numbers_stringify_like_a_browser() {
		let text = |value: V| value.to_text().unwrap();
		assert_eq!(text(1.5.into()), "1.5");
		assert_eq!(text(3_u8.into()), "3");
		assert_eq!(text((-0.0).into()), "0");
		assert_eq!(text(f64::NAN.into()), "NaN");
		assert_eq!(text(f64::NEG_INFINITY.into()), "-Infinity");
		assert_eq!(text(true.into()), "true");
		assert_eq!(text(1e21.into()), "1e+21");
		assert_eq!(text((-1.5e300).into()), "-1.5e+300");
		assert_eq!(text(1e20.into()), "100000000000000000000");
		assert_eq!(text(1e-7.into()), "1e-7");
		assert_eq!(text(2.5e-7.into()), "2.5e-7");
		assert_eq!(text(0.000_001.into()), "0.000001");
	}

	#[test]
	fn lists_concatenate_and_nodes_have_no_text() {
		let dom = MemoryDom::new();
		let list: V = vec![V::from("a"), V::from(1), V::Null, V::from(vec!["b"])].into();
		assert_eq!(list.to_text().as_deref(), Some("a1b"));
		assert_eq!(V::node(dom.body()).to_text(), None);
		assert_eq!(V::from(None::<&str>).kind(), "null");
	}
}
