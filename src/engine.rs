//! Render dispatch: template identity per context, in-place updates, and upgrades.

use crate::{
	dom::{Capabilities, Dom, Mutation, Namespace, NodeKey},
	intent::{IntentHandler, IntentRegistry, Reapply},
	path,
	reconcile::remove_run,
	template::{Sentinel, TemplateCache, TemplateInfo},
	update::Update,
	value::Value,
	wire::WireRenderer,
};
use hashbrown::HashMap;
use std::{
	cell::{Cell, RefCell},
	rc::{Rc, Weak},
};
use tracing::{error, instrument, trace, trace_span, warn};

/// Behaviour switches that aren't host capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
	/// Discard asynchronous values that settle after their interpolation received a newer value.
	///
	/// Off by default, in which case the last value to *settle* wins.
	pub drop_stale_async: bool,
}

struct Binding<D: Dom> {
	template: Rc<TemplateInfo<D>>,
	updates: Rc<Vec<Option<Update<D>>>>,
}

struct Registration<D: Dom> {
	node: D::Node,
	connected: Cell<bool>,
}

struct Inner<D: Dom> {
	dom: D,
	capabilities: Capabilities,
	options: Options,
	sentinel: Sentinel,
	templates: RefCell<TemplateCache<D>>,
	bindings: RefCell<HashMap<NodeKey, Binding<D>>>,
	intents: RefCell<IntentRegistry<D>>,
	components: RefCell<HashMap<NodeKey, Registration<D>>>,
	observing: Cell<bool>,
}

/// Renders tagged templates into host nodes.
///
/// Cheap to clone; clones share template caches, bindings and intents.
pub struct Engine<D: Dom>(Rc<Inner<D>>);
impl<D: Dom> Clone for Engine<D> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

pub(crate) struct WeakEngine<D: Dom>(Weak<Inner<D>>);
impl<D: Dom> WeakEngine<D> {
	pub fn upgrade(&self) -> Option<Engine<D>> {
		self.0.upgrade().map(Engine)
	}
}

impl<D: Dom> Engine<D> {
	#[must_use]
	pub fn new(dom: D) -> Self {
		Self::with_options(dom, Options::default())
	}

	#[must_use]
	pub fn with_options(dom: D, options: Options) -> Self {
		let capabilities = dom.capabilities();
		trace!(?capabilities, ?options, "Creating engine.");
		Self(Rc::new(Inner {
			dom,
			capabilities,
			options,
			sentinel: Sentinel::new(),
			templates: RefCell::new(TemplateCache::new()),
			bindings: RefCell::default(),
			intents: RefCell::new(IntentRegistry::new()),
			components: RefCell::default(),
			observing: Cell::new(false),
		}))
	}

	#[must_use]
	pub fn dom(&self) -> &D {
		&self.0.dom
	}

	#[must_use]
	pub fn options(&self) -> Options {
		self.0.options
	}

	/// As probed when this engine was created.
	#[must_use]
	pub fn capabilities(&self) -> Capabilities {
		self.0.capabilities
	}

	/// Number of distinct templates parsed so far.
	#[must_use]
	pub fn template_count(&self) -> usize {
		self.0.templates.borrow().len()
	}

	pub(crate) fn downgrade(&self) -> WeakEngine<D> {
		WeakEngine(Rc::downgrade(&self.0))
	}

	/// Renders a template into `context`, which is returned.
	///
	/// If `context` last rendered the same template, only the interpolations are updated.
	/// Otherwise its children are replaced by a fresh instance of the template.
	///
	/// Templates are identified by the address of `strings`, falling back to its contents.
	/// Inside SVG elements (other than `<foreignObject>`), the template is read as SVG.
	pub fn render(&self, context: &D::Node, strings: &'static [&'static str], values: Vec<Value<D>>) -> D::Node {
		let dom = self.dom();
		let namespace = match (dom.namespace(context), dom.name(context)) {
			(Some(Namespace::Svg), Some(name)) if name != "foreignObject" => Namespace::Svg,
			_ => Namespace::Html,
		};
		self.render_into(context, strings, namespace, values);
		context.clone()
	}

	/// A handle that renders into `context`.
	#[must_use]
	pub fn bind(&self, context: D::Node) -> Bound<D> {
		Bound { engine: self.clone(), context }
	}

	/// A renderer for standalone HTML content.
	#[must_use]
	pub fn wire(&self) -> WireRenderer<D> {
		WireRenderer::new(self.clone(), Namespace::Html)
	}

	/// A renderer for standalone SVG content.
	#[must_use]
	pub fn svg_wire(&self) -> WireRenderer<D> {
		WireRenderer::new(self.clone(), Namespace::Svg)
	}

	/// Registers a handler for [`Intent::Custom`](`crate::Intent::Custom`) records containing `name`.
	///
	/// Handlers are consulted in registration order. Redefining a name replaces its handler in place.
	pub fn define_intent(&self, name: &str, handler: impl 'static + Fn(Value<D>, Reapply<D>) -> Value<D>) {
		self.0.intents.borrow_mut().define(name, Rc::new(handler))
	}

	/// Forgets the template bound to `context` and any `onconnect`/`ondisconnect` registrations below it.
	///
	/// The rendered nodes stay in place, but the event listeners its interpolations attached are removed.
	/// The next render into `context` starts fresh.
	pub fn release(&self, context: &D::Node) {
		let dom = self.dom();
		let binding = self.0.bindings.borrow_mut().remove(&dom.key(context));
		let released = binding.is_some();
		if let Some(binding) = binding {
			self.dispose(&binding)
		}

		let mut components = self.0.components.borrow_mut();
		let mut stack = dom.child_nodes(context);
		let mut unregistered = 0_usize;
		while let Some(node) = stack.pop() {
			if components.remove(&dom.key(&node)).is_some() {
				unregistered += 1
			}
			stack.extend(dom.child_nodes(&node));
		}
		trace!(released, unregistered, "Released context.");
	}

	pub(crate) fn find_intent(&self, record: Vec<(String, Value<D>)>) -> Option<(IntentHandler<D>, Value<D>)> {
		self.0.intents.borrow().find(record)
	}

	/// Returns whether the template instance was (re)created.
	#[instrument(skip(self, values))]
	pub(crate) fn render_into(&self, context: &D::Node, strings: &'static [&'static str], namespace: Namespace, values: Vec<Value<D>>) -> bool {
		let dom = self.dom();
		let template = self.0.templates.borrow_mut().get_or_parse(dom, &self.0.sentinel, strings, namespace);
		let key = dom.key(context);
		let bound = self
			.0
			.bindings
			.borrow()
			.get(&key)
			.filter(|binding| Rc::ptr_eq(&binding.template, &template))
			.map(|binding| binding.updates.clone());

		match bound {
			Some(updates) => {
				trace!("Updating bound template in place.");
				self.feed(&updates, values);
				false
			}
			None => {
				self.upgrade(context, key, template, values);
				true
			}
		}
	}

	fn upgrade(&self, context: &D::Node, key: NodeKey, template: Rc<TemplateInfo<D>>, values: Vec<Value<D>>) {
		let span = trace_span!("upgrade", slots = template.paths.len());
		let _enter = span.enter();
		let dom = self.dom();

		let fragment = match dom.clone_node(&template.fragment, true) {
			Ok(fragment) => fragment,
			Err(error) => return error!("Failed to clone template fragment: {:?}", error),
		};
		if self.0.capabilities.inert_cloned_scripts {
			for route in &template.scripts {
				self.recreate_script(&fragment, route)
			}
		}

		// All paths are resolved before any value is applied, since content updates shift child indices.
		let targets: Vec<_> = template
			.paths
			.iter()
			.enumerate()
			.map(|(slot, path)| {
				let path = path.as_ref()?;
				match path.resolve(dom, &fragment) {
					Some(node) => Some((node, path)),
					None => {
						error!("Path for interpolation #{} didn't resolve in the cloned fragment.", slot);
						None
					}
				}
			})
			.collect();
		let updates: Rc<Vec<_>> = Rc::new(
			targets
				.into_iter()
				.map(|target| target.map(|(node, path)| Update::create(self, node, &path.kind, template.namespace)))
				.collect(),
		);
		self.feed(&updates, values);

		if let (Some(first), Some(last)) = (dom.first_child(context), dom.last_child(context)) {
			remove_run(dom, context, &first, &last)
		}
		if let Err(error) = dom.append_child(context, &fragment) {
			error!("Failed to insert template instance: {:?}", error)
		}
		let previous = self.0.bindings.borrow_mut().insert(key, Binding { template, updates });
		if let Some(previous) = previous {
			self.dispose(&previous)
		}
	}

	fn dispose(&self, binding: &Binding<D>) {
		for update in binding.updates.iter().flatten() {
			update.dispose(self)
		}
	}

	fn recreate_script(&self, fragment: &D::Node, route: &[usize]) {
		let dom = self.dom();
		let original = match path::walk(dom, fragment, route) {
			Some(original) => original,
			None => return error!("Script path didn't resolve in the cloned fragment."),
		};
		let parent = match dom.parent(&original) {
			Some(parent) => parent,
			None => return,
		};
		let script = match dom.create_element(Namespace::Html, "script") {
			Ok(script) => script,
			Err(error) => return error!("Failed to recreate <script>: {:?}", error),
		};
		for name in dom.attribute_names(&original) {
			if let Some(value) = dom.attribute(&original, &name) {
				if let Err(error) = dom.set_attribute(&script, &name, &value) {
					error!("Failed to copy script attribute {:?}: {:?}", name, error)
				}
			}
		}
		dom.set_text_content(&script, &dom.text_content(&original));
		if let Err(error) = dom.insert_before(&parent, &script, Some(&original)).and_then(|()| dom.remove_child(&parent, &original)) {
			error!("Failed to swap in recreated <script>: {:?}", error)
		}
	}

	fn feed(&self, updates: &[Option<Update<D>>], values: Vec<Value<D>>) {
		if values.len() != updates.len() {
			warn!("Template has {} interpolation(s) but {} value(s) were given.", updates.len(), values.len());
		}
		for (slot, (update, value)) in updates.iter().zip(values).enumerate() {
			match update {
				Some(update) => update.apply(self, value),
				None => trace!("Interpolation #{} has no target; ignoring its value.", slot),
			}
		}
	}

	/// Tracks `node` so it receives `connect`/`disconnect` events when its connectivity changes.
	pub(crate) fn register_component(&self, node: &D::Node) {
		let dom = self.dom();
		self.0.components.borrow_mut().entry(dom.key(node)).or_insert_with(|| Registration {
			node: node.clone(),
			connected: Cell::new(dom.is_connected(node)),
		});

		if self.0.observing.replace(true) {
			return;
		}
		if !self.0.capabilities.mutation_observer {
			return warn!("The host can't observe mutations; `onconnect` and `ondisconnect` won't fire.");
		}
		let engine_ref = self.downgrade();
		let observed = dom.observe(Box::new(move |mutations| {
			if let Some(engine) = engine_ref.upgrade() {
				engine.sync_connections(mutations)
			}
		}));
		if let Err(error) = observed {
			error!("Failed to observe the document: {:?}", error)
		}
	}

	pub(crate) fn unregister_component(&self, node: &D::Node) {
		let key = self.dom().key(node);
		if self.0.components.borrow_mut().remove(&key).is_some() {
			trace!(?node, "Unregistered component.");
		}
	}

	fn sync_connections(&self, mutations: Vec<Mutation<D::Node>>) {
		let dom = self.dom();
		let mut changed = Vec::new();
		{
			let components = self.0.components.borrow();
			if components.is_empty() {
				return;
			}
			let mut stack: Vec<D::Node> = mutations.into_iter().flat_map(|mutation| mutation.added.into_iter().chain(mutation.removed)).collect();
			while let Some(node) = stack.pop() {
				if let Some(registration) = components.get(&dom.key(&node)) {
					let connected = dom.is_connected(&registration.node);
					if registration.connected.replace(connected) != connected {
						changed.push((registration.node.clone(), connected));
					}
				}
				stack.extend(dom.child_nodes(&node));
			}
		}

		for (node, connected) in changed {
			let event_type = if connected { "connect" } else { "disconnect" };
			trace!(?node, event_type, "Dispatching connectivity event.");
			if let Err(error) = dom.dispatch_event(&node, event_type) {
				error!("Failed to dispatch {:?}: {:?}", event_type, error)
			}
		}
	}
}

/// An [`Engine`] bound to one context node.
pub struct Bound<D: Dom> {
	engine: Engine<D>,
	context: D::Node,
}
impl<D: Dom> Bound<D> {
	pub fn render(&self, strings: &'static [&'static str], values: Vec<Value<D>>) -> D::Node {
		self.engine.render(&self.context, strings, values)
	}

	#[must_use]
	pub fn context(&self) -> &D::Node {
		&self.context
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::memory::MemoryDom;

	static WATCHED: &[&str] = &["<x-a onconnect=", ">a</x-a>"];
	static PLAIN: &[&str] = &["<i>b</i>"];

	#[test]
	fn swapped_out_components_are_unregistered() {
		let dom = MemoryDom::new();
		let engine = Engine::new(dom.clone());
		let body = dom.body();

		for _ in 0..50 {
			engine.render(&body, WATCHED, vec![Value::listener(|_| ())]);
			assert_eq!(engine.0.components.borrow().len(), 1);
			engine.render(&body, PLAIN, Vec::new());
			assert!(engine.0.components.borrow().is_empty());
		}
		dom.run_microtasks();

		engine.render(&body, WATCHED, vec![Value::listener(|_| ())]);
		engine.release(&body);
		assert!(engine.0.components.borrow().is_empty());
	}
}
