#![doc(html_root_url = "https://docs.rs/wire-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Tagged-template DOM rendering without a VDOM.
//!
//! A template is a `&'static [&'static str]` of static markup chunks plus one [`Value`] per gap between them.
//! The first render of a template into a context parses it once, clones the result and binds an updater to every gap.
//! Later renders of the same template into the same context only feed the new values to those updaters.
//!
//! ```
//! use wire_dom::{dom::memory::MemoryDom, values, Engine};
//!
//! let dom = MemoryDom::new();
//! let engine = Engine::new(dom.clone());
//! let body = dom.body();
//!
//! static GREETING: &[&str] = &["<p class=", ">Hello, ", "!</p>"];
//! engine.render(&body, GREETING, values!["greeting", "World"]);
//! assert_eq!(dom.inner_html(&body), r#"<p class="greeting">Hello, World<!---->!</p>"#);
//! ```
//!
//! # Logging
//!
//! Diagnostics go through [`tracing`]. Interpolated values are only logged by kind,
//! unless the `"dangerous-logging"` feature is enabled.

pub mod dom;
mod engine;
mod intent;
mod markup;
pub mod path;
mod pending;
mod rc_hash_map;
pub mod reconcile;
mod style;
mod template;
mod update;
mod value;
mod wire;

pub use engine::{Bound, Engine, Options};
pub use intent::{IntentHandler, Reapply};
pub use pending::{Pending, Rejection, Resolver};
pub use value::{Component, Content, Intent, Primitive, Value};
pub use wire::{Wire, WireRenderer};
