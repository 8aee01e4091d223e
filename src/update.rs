//! Updaters: one per interpolation, bound to the live node its path resolved to.
//!
//! Every updater is idempotent: applying the value it last applied doesn't touch the host.

use crate::{
	dom::{Dom, Listener, Namespace, Property},
	engine::Engine,
	intent::Reapply,
	path::PathKind,
	pending::Pending,
	reconcile::{reconcile, Item},
	style,
	template::fragment_from_markup,
	value::{Intent, Primitive, Value},
};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};
use tracing::{error, trace, warn};

pub(crate) enum Update<D: Dom> {
	Attribute(Rc<AttributeUpdate<D>>),
	Property(Rc<PropertyUpdate<D>>),
	Event(Rc<EventUpdate<D>>),
	Style(Rc<StyleUpdate<D>>),
	Text(Rc<TextUpdate<D>>),
	Any(Rc<AnyUpdate<D>>),
}
impl<D: Dom> Clone for Update<D> {
	fn clone(&self) -> Self {
		match self {
			Update::Attribute(update) => Update::Attribute(update.clone()),
			Update::Property(update) => Update::Property(update.clone()),
			Update::Event(update) => Update::Event(update.clone()),
			Update::Style(update) => Update::Style(update.clone()),
			Update::Text(update) => Update::Text(update.clone()),
			Update::Any(update) => Update::Any(update.clone()),
		}
	}
}

impl<D: Dom> Update<D> {
	/// Chooses the updater for `node`.
	///
	/// `namespace` is the template's, used for content placed directly in its root fragment.
	pub(crate) fn create(engine: &Engine<D>, node: D::Node, kind: &PathKind, namespace: Namespace) -> Self {
		let dom = engine.dom();
		match kind {
			PathKind::Any => {
				let namespace = match dom.parent(&node).and_then(|parent| Some((dom.namespace(&parent)?, dom.name(&parent)?))) {
					Some((Namespace::Svg, name)) if name != "foreignObject" => Namespace::Svg,
					Some(_) => Namespace::Html,
					None => namespace,
				};
				Update::Any(Rc::new(AnyUpdate {
					marker: node,
					namespace,
					items: RefCell::default(),
					text: RefCell::default(),
					generation: Cell::default(),
				}))
			}

			PathKind::Text => Update::Text(Rc::new(TextUpdate {
				element: node,
				current: RefCell::default(),
				generation: Cell::default(),
			})),

			PathKind::Attribute(name) if name == "style" => Update::Style(Rc::new(StyleUpdate {
				element: node,
				current: RefCell::new(StyleState::Unset),
				generation: Cell::default(),
			})),

			PathKind::Attribute(name) if name.len() > 2 && name.starts_with("on") => {
				let event_type = match name.as_str() {
					"onconnect" | "ondisconnect" => {
						engine.register_component(&node);
						name[2..].to_string()
					}
					_ => {
						let lowercase = name.to_ascii_lowercase();
						if dom.has_property(&node, &lowercase) {
							lowercase[2..].to_string()
						} else {
							name[2..].to_string()
						}
					}
				};
				Update::Event(Rc::new(EventUpdate {
					element: node,
					event_type,
					current: RefCell::default(),
					generation: Cell::default(),
					disposed: Cell::new(false),
				}))
			}

			PathKind::Attribute(name)
				if name == "data" || (dom.namespace(&node) != Some(Namespace::Svg) && !matches!(name.as_str(), "form" | "list") && dom.has_property(&node, name)) =>
			{
				Update::Property(Rc::new(PropertyUpdate {
					element: node,
					name: name.clone(),
					current: RefCell::default(),
					generation: Cell::default(),
				}))
			}

			PathKind::Attribute(name) => Update::Attribute(Rc::new(AttributeUpdate {
				element: node,
				name: name.clone(),
				current: RefCell::default(),
				generation: Cell::default(),
			})),
		}
	}

	pub(crate) fn apply(&self, engine: &Engine<D>, value: Value<D>) {
		trace!(updater = self.kind(), ?value, "Applying interpolation value.");
		match self {
			Update::Attribute(update) => update.apply(engine, value),
			Update::Property(update) => update.apply(engine, value),
			Update::Event(update) => update.apply(engine, value),
			Update::Style(update) => update.apply(engine, value),
			Update::Text(update) => update.apply(engine, value),
			Update::Any(update) => update.apply(engine, value),
		}
	}

	/// Undoes what this updater registered with the host, for an instance that's being discarded.
	///
	/// The instance's nodes are left alone.
	pub(crate) fn dispose(&self, engine: &Engine<D>) {
		if let Update::Event(update) = self {
			update.disposed.set(true);
			update.detach(engine.dom());
			if matches!(update.event_type.as_str(), "connect" | "disconnect") {
				engine.unregister_component(&update.element)
			}
		}
	}

	fn kind(&self) -> &'static str {
		match self {
			Update::Attribute(_) => "attribute",
			Update::Property(_) => "property",
			Update::Event(_) => "event",
			Update::Style(_) => "style",
			Update::Text(_) => "text",
			Update::Any(_) => "any",
		}
	}
}

trait Apply<D: Dom>: 'static {
	fn apply(self: &Rc<Self>, engine: &Engine<D>, value: Value<D>);

	/// Counts applications, so asynchronous values can tell whether they were superseded.
	fn generation(&self) -> &Cell<u64>;

	fn advance(&self) {
		let generation = self.generation();
		generation.set(generation.get().wrapping_add(1))
	}
}

/// Applies what `pending` settles to through `target`, in a later microtask.
fn apply_later<D: Dom, U: Apply<D>>(engine: &Engine<D>, target: &Rc<U>, pending: &Pending<Value<D>>, wrap: impl 'static + FnOnce(Value<D>) -> Value<D>) {
	let issued = target.generation().get();
	let engine_ref = engine.downgrade();
	let target = target.clone();
	pending.on_settle(move |settled| {
		let engine = match engine_ref.upgrade() {
			Some(engine) => engine,
			None => return,
		};
		let engine_ref = engine.downgrade();
		engine.dom().queue_microtask(Box::new(move || {
			let engine = match engine_ref.upgrade() {
				Some(engine) => engine,
				None => return trace!("Engine was dropped before an asynchronous value arrived."),
			};
			match settled {
				Ok(_) if engine.options().drop_stale_async && target.generation().get() != issued => trace!("Dropping superseded asynchronous value."),
				Ok(value) => target.apply(&engine, wrap(value)),
				Err(rejection) => error!("Asynchronous interpolation value was rejected: {}", rejection),
			}
		}))
	})
}

fn reapply<D: Dom, U: Apply<D>>(engine: &Engine<D>, target: &Rc<U>) -> Reapply<D> {
	let engine_ref = engine.downgrade();
	let target = target.clone();
	Rc::new(move |value: Value<D>| {
		if let Some(engine) = engine_ref.upgrade() {
			target.apply(&engine, value)
		}
	})
}

/// Handles the value shapes all updaters treat alike, and logs anything else as unsupported.
fn apply_common<D: Dom, U: Apply<D>>(engine: &Engine<D>, target: &Rc<U>, value: Value<D>, updater: &str) {
	match value {
		Value::Pending(pending) => apply_later(engine, target, &pending, |value| value),
		Value::Intent(Intent::Placeholder { placeholder, source }) => {
			target.apply(engine, *placeholder);
			apply_later(engine, target, &Pending::resolved(Value::Intent(*source)), |value| value)
		}
		Value::Intent(Intent::Custom(record)) => match engine.find_intent(record) {
			Some((handler, value)) => {
				let value = handler(value, reapply(engine, target));
				target.apply(engine, value)
			}
			None => warn!("No registered intent matched the interpolated record; ignoring it."),
		},
		other => warn!("A {} value can't be applied as {}; ignoring it.", other.kind(), updater),
	}
}

pub(crate) struct AttributeUpdate<D: Dom> {
	element: D::Node,
	name: String,
	/// [`None`] while the attribute is absent.
	current: RefCell<Option<String>>,
	generation: Cell<u64>,
}
impl<D: Dom> Apply<D> for AttributeUpdate<D> {
	fn apply(self: &Rc<Self>, engine: &Engine<D>, value: Value<D>) {
		self.advance();
		let dom = engine.dom();
		match value {
			Value::Null => {
				if self.current.borrow_mut().take().is_some() {
					if let Err(error) = dom.remove_attribute(&self.element, &self.name) {
						error!("Failed to remove attribute {:?}: {:?}", self.name, error)
					}
				}
			}
			Value::Primitive(_) | Value::List(_) => {
				let text = match value.to_text() {
					Some(text) => text,
					None => return warn!("Attribute {:?} can only take primitive lists; ignoring the value.", self.name),
				};
				if self.current.borrow().as_ref() == Some(&text) {
					return;
				}
				if let Err(error) = dom.set_attribute(&self.element, &self.name, &text) {
					return error!("Failed to set attribute {:?}: {:?}", self.name, error);
				}
				*self.current.borrow_mut() = Some(text)
			}
			Value::Intent(Intent::Text(inner)) | Value::Intent(Intent::Any(inner)) | Value::Intent(Intent::Html(inner)) => self.apply(engine, *inner),
			other => apply_common(engine, self, other, "an attribute"),
		}
	}

	fn generation(&self) -> &Cell<u64> {
		&self.generation
	}
}

pub(crate) struct PropertyUpdate<D: Dom> {
	element: D::Node,
	name: String,
	current: RefCell<Option<Property>>,
	generation: Cell<u64>,
}
impl<D: Dom> Apply<D> for PropertyUpdate<D> {
	fn apply(self: &Rc<Self>, engine: &Engine<D>, value: Value<D>) {
		self.advance();
		let property = match value {
			Value::Null => Property::Null,
			Value::Primitive(primitive) => primitive.to_property(),
			Value::Intent(Intent::Text(inner)) | Value::Intent(Intent::Any(inner)) => return self.apply(engine, *inner),
			other => return apply_common(engine, self, other, "a property"),
		};
		if self.current.borrow().as_ref() == Some(&property) {
			return;
		}

		let dom = engine.dom();
		if let Err(error) = dom.set_property(&self.element, &self.name, &property) {
			return error!("Failed to set property {:?}: {:?}", self.name, error);
		}
		if property == Property::Null {
			if let Err(error) = dom.remove_attribute(&self.element, &self.name) {
				error!("Failed to remove attribute {:?}: {:?}", self.name, error)
			}
		}
		*self.current.borrow_mut() = Some(property)
	}

	fn generation(&self) -> &Cell<u64> {
		&self.generation
	}
}

pub(crate) struct EventUpdate<D: Dom> {
	element: D::Node,
	event_type: String,
	current: RefCell<Option<Listener<D::Event>>>,
	generation: Cell<u64>,
	/// Set once the owning instance is discarded. Late asynchronous listeners are ignored then.
	disposed: Cell<bool>,
}
impl<D: Dom> EventUpdate<D> {
	fn detach(&self, dom: &D) {
		if let Some(listener) = self.current.borrow_mut().take() {
			if let Err(error) = dom.remove_event_listener(&self.element, &self.event_type, &listener) {
				error!("Failed to remove {:?} listener: {:?}", self.event_type, error)
			}
		}
	}
}
impl<D: Dom> Apply<D> for EventUpdate<D> {
	fn apply(self: &Rc<Self>, engine: &Engine<D>, value: Value<D>) {
		if self.disposed.get() {
			return trace!(event_type = %self.event_type, "Ignoring value for a discarded listener slot.");
		}
		self.advance();
		let dom = engine.dom();
		match value {
			Value::Listener(listener) => {
				if self.current.borrow().as_ref() == Some(&listener) {
					return;
				}
				self.detach(dom);
				match dom.add_event_listener(&self.element, &self.event_type, &listener) {
					Ok(()) => *self.current.borrow_mut() = Some(listener),
					Err(error) => error!("Failed to add {:?} listener: {:?}", self.event_type, error),
				}
			}
			Value::Null => self.detach(dom),
			other => apply_common(engine, self, other, "an event listener"),
		}
	}

	fn generation(&self) -> &Cell<u64> {
		&self.generation
	}
}

enum StyleState {
	Unset,
	Text(String),
	/// Hyphenated names with their applied values.
	Declarations(Vec<(String, String)>),
}

pub(crate) struct StyleUpdate<D: Dom> {
	element: D::Node,
	current: RefCell<StyleState>,
	generation: Cell<u64>,
}
impl<D: Dom> StyleUpdate<D> {
	fn set_text(&self, dom: &D, css: String) {
		if matches!(&*self.current.borrow(), StyleState::Text(current) if *current == css) {
			return;
		}
		if let Err(error) = dom.set_style_text(&self.element, &css) {
			return error!("Failed to set inline style: {:?}", error);
		}
		*self.current.borrow_mut() = StyleState::Text(css)
	}

	fn set_declarations(&self, dom: &D, declarations: Vec<(String, Option<Primitive>)>) {
		let future: Vec<(String, String)> = declarations
			.into_iter()
			.filter_map(|(name, value)| {
				let name = style::hyphenate(&name);
				let value = style::declaration_value(&name, &value?);
				Some((name, value))
			})
			.collect();

		let previous = match self.current.replace(StyleState::Unset) {
			StyleState::Declarations(previous) => previous,
			StyleState::Text(_) => {
				if let Err(error) = dom.set_style_text(&self.element, "") {
					error!("Failed to reset inline style: {:?}", error)
				}
				Vec::new()
			}
			StyleState::Unset => Vec::new(),
		};

		for (name, _) in &previous {
			if !future.iter().any(|(future_name, _)| future_name == name) {
				if let Err(error) = dom.set_style(&self.element, name, None) {
					error!("Failed to remove style {:?}: {:?}", name, error)
				}
			}
		}
		for (name, value) in &future {
			let unchanged = previous.iter().any(|(previous_name, previous_value)| previous_name == name && previous_value == value);
			if !unchanged {
				if let Err(error) = dom.set_style(&self.element, name, Some(value)) {
					error!("Failed to set style {:?}: {:?}", name, error)
				}
			}
		}
		*self.current.borrow_mut() = StyleState::Declarations(future)
	}
}
impl<D: Dom> Apply<D> for StyleUpdate<D> {
	fn apply(self: &Rc<Self>, engine: &Engine<D>, value: Value<D>) {
		self.advance();
		let dom = engine.dom();
		match value {
			Value::Null => self.set_text(dom, String::new()),
			Value::Primitive(primitive) => self.set_text(dom, primitive.to_string()),
			Value::Style(declarations) => self.set_declarations(dom, declarations),
			other => apply_common(engine, self, other, "a style"),
		}
	}

	fn generation(&self) -> &Cell<u64> {
		&self.generation
	}
}

/// Replaces the text of a text-only element.
pub(crate) struct TextUpdate<D: Dom> {
	element: D::Node,
	current: RefCell<Option<String>>,
	generation: Cell<u64>,
}
impl<D: Dom> Apply<D> for TextUpdate<D> {
	fn apply(self: &Rc<Self>, engine: &Engine<D>, value: Value<D>) {
		self.advance();
		match value {
			Value::Null | Value::Primitive(_) | Value::List(_) => {
				let text = match value.to_text() {
					Some(text) => text,
					None => return warn!("Text content can only take primitive lists; ignoring the value."),
				};
				if self.current.borrow().as_ref() != Some(&text) {
					engine.dom().set_text_content(&self.element, &text);
					*self.current.borrow_mut() = Some(text)
				}
			}
			Value::Intent(Intent::Text(inner)) | Value::Intent(Intent::Any(inner)) | Value::Intent(Intent::Html(inner)) => self.apply(engine, *inner),
			other => apply_common(engine, self, other, "text"),
		}
	}

	fn generation(&self) -> &Cell<u64> {
		&self.generation
	}
}

/// Renders arbitrary content in front of a comment marker.
pub(crate) struct AnyUpdate<D: Dom> {
	marker: D::Node,
	/// For parsing HTML content.
	namespace: Namespace,
	items: RefCell<Vec<Item<D>>>,
	/// Set while `items` is a single text node showing this text.
	text: RefCell<Option<String>>,
	generation: Cell<u64>,
}
impl<D: Dom> AnyUpdate<D> {
	fn show(&self, engine: &Engine<D>, future: Vec<Item<D>>) {
		self.text.replace(None);
		let dom = engine.dom();
		let parent = match dom.parent(&self.marker) {
			Some(parent) => parent,
			None => return error!("Content marker is detached; can't update its content."),
		};
		let current = self.items.take();
		let items = reconcile(dom, &parent, current, future, |item, hint| item.node(dom, hint), Some(&self.marker));
		*self.items.borrow_mut() = items;
	}

	fn show_text(&self, engine: &Engine<D>, text: String) {
		let fast = match (self.items.borrow().as_slice(), self.text.borrow().as_ref()) {
			([Item::Node(node)], Some(current)) => Some((node.clone(), *current == text)),
			_ => None,
		};
		match fast {
			Some((_, true)) => (),
			Some((node, false)) => {
				engine.dom().set_text_content(&node, &text);
				*self.text.borrow_mut() = Some(text)
			}
			None => {
				let node = engine.dom().create_text(&text);
				self.show(engine, vec![Item::Node(node)]);
				*self.text.borrow_mut() = Some(text)
			}
		}
	}

	fn show_list(self: &Rc<Self>, engine: &Engine<D>, values: Vec<Value<D>>) {
		if values.is_empty() {
			return self.show(engine, Vec::new());
		}
		if matches!(values[0], Value::Primitive(_)) {
			return self.apply(engine, Value::Intent(Intent::Html(Box::new(Value::List(values)))));
		}

		let values: Vec<Value<D>> = if values.iter().any(|value| matches!(value, Value::List(_))) {
			values
				.into_iter()
				.flat_map(|value| match value {
					Value::List(values) => values,
					value => vec![value],
				})
				.collect()
		} else {
			values
		};

		if matches!(values.first(), Some(Value::Pending(_))) {
			let pendings = values
				.into_iter()
				.map(|value| match value {
					Value::Pending(pending) => pending,
					value => Pending::resolved(value),
				})
				.collect();
			return apply_later(engine, self, &Pending::all(pendings).map(Value::List), |value| value);
		}

		let dom = engine.dom();
		let mut items = Vec::with_capacity(values.len());
		for value in values {
			match value {
				Value::Null => (),
				Value::Primitive(primitive) => items.push(Item::Node(dom.create_text(&primitive.to_string()))),
				Value::Node(node) => items.extend(Value::expand_node(dom, node).into_iter().map(Item::Node)),
				Value::Wire(wire) => items.push(Item::Wire(wire)),
				Value::Component(component) => items.push(Item::Component(component)),
				other => warn!("A {} value can't be a list item; skipping it.", other.kind()),
			}
		}
		self.show(engine, items)
	}

	fn show_html(&self, engine: &Engine<D>, markup: &str) {
		let dom = engine.dom();
		let fragment = fragment_from_markup(dom, markup, self.namespace);
		self.show(engine, dom.child_nodes(&fragment).into_iter().map(Item::Node).collect())
	}
}
impl<D: Dom> Apply<D> for AnyUpdate<D> {
	fn apply(self: &Rc<Self>, engine: &Engine<D>, value: Value<D>) {
		self.advance();
		let dom = engine.dom();
		match value {
			Value::Null => self.show(engine, Vec::new()),
			Value::Primitive(primitive) => self.show_text(engine, primitive.to_string()),
			Value::List(values) => self.show_list(engine, values),
			Value::Node(node) => self.show(engine, Value::expand_node(dom, node).into_iter().map(Item::Node).collect()),
			Value::Wire(wire) => self.show(engine, vec![Item::Wire(wire)]),
			Value::Component(component) => self.show(engine, vec![Item::Component(component)]),
			Value::Intent(Intent::Any(inner)) => self.apply(engine, *inner),
			Value::Intent(Intent::Text(inner)) => match *inner {
				Value::Pending(pending) => apply_later(engine, self, &pending, |value| Value::Intent(Intent::Text(Box::new(value)))),
				inner => match inner.to_text() {
					Some(text) => self.show_text(engine, text),
					None => warn!("A {} value can't be shown as text; ignoring it.", inner.kind()),
				},
			},
			Value::Intent(Intent::Html(inner)) => match *inner {
				Value::Pending(pending) => apply_later(engine, self, &pending, |value| Value::Intent(Intent::Html(Box::new(value)))),
				inner => match inner.to_text() {
					Some(markup) => self.show_html(engine, &markup),
					None => warn!("A {} value can't be parsed as HTML; ignoring it.", inner.kind()),
				},
			},
			other => apply_common(engine, self, other, "content"),
		}
	}

	fn generation(&self) -> &Cell<u64> {
		&self.generation
	}
}
