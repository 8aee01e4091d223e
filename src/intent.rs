//! User-defined content intents.

use crate::{dom::Dom, value::Value};
use std::rc::Rc;
use tracing::{trace, warn};

/// Re-applies a value to the interpolation that invoked an intent handler, for example once data has arrived.
pub type Reapply<D> = Rc<dyn Fn(Value<D>)>;

/// Turns an intent record entry into a renderable value.
pub type IntentHandler<D> = Rc<dyn Fn(Value<D>, Reapply<D>) -> Value<D>>;

const BUILT_IN: &[&str] = &["any", "html", "placeholder", "text"];

/// Handlers in registration order. Redefining a name replaces its handler in place.
pub(crate) struct IntentRegistry<D: Dom> {
	handlers: Vec<(String, IntentHandler<D>)>,
}
impl<D: Dom> IntentRegistry<D> {
	pub fn new() -> Self {
		Self { handlers: Vec::new() }
	}

	pub fn define(&mut self, name: &str, handler: IntentHandler<D>) {
		if BUILT_IN.contains(&name) {
			return warn!("Can't redefine built-in intent {:?}; ignoring.", name);
		}
		match self.handlers.iter_mut().find(|(existing, _)| existing == name) {
			Some((_, existing)) => {
				trace!("Replacing intent {:?}.", name);
				*existing = handler
			}
			None => self.handlers.push((name.to_string(), handler)),
		}
	}

	/// The first registered handler named in `record`, with that entry's value.
	pub fn find(&self, mut record: Vec<(String, Value<D>)>) -> Option<(IntentHandler<D>, Value<D>)> {
		self.handlers.iter().find_map(|(name, handler)| {
			let index = record.iter().position(|(key, _)| key == name)?;
			Some((handler.clone(), record.swap_remove(index).1))
		})
	}
}
