//! A minimal single-threaded promise.
//!
//! Interpolations may be [`Pending`]: the renderer subscribes with [`Pending::on_settle`] and applies the value later.

use core::fmt::{self, Debug, Formatter};
use std::{cell::RefCell, rc::Rc};
use thiserror::Error;
use tracing::warn;

/// Why a [`Pending`] value never arrived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Rejection(pub String);

type Settled<T> = Result<T, Rejection>;

enum State<T> {
	Waiting(Vec<Box<dyn FnOnce(Settled<T>)>>),
	Settled(Settled<T>),
}

/// A value that becomes available later, compared by identity.
pub struct Pending<T>(Rc<RefCell<State<T>>>);

/// Settles its [`Pending`] at most once. Dropping it leaves the value pending forever.
pub struct Resolver<T>(Pending<T>);

impl<T> Clone for Pending<T> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}
impl<T> PartialEq for Pending<T> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl<T> Debug for Pending<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let state = match &*self.0.borrow() {
			State::Waiting(_) => "waiting",
			State::Settled(Ok(_)) => "resolved",
			State::Settled(Err(_)) => "rejected",
		};
		f.debug_tuple("Pending").field(&format_args!("{}", state)).finish()
	}
}

impl<T: Clone + 'static> Pending<T> {
	#[must_use]
	pub fn new() -> (Self, Resolver<T>) {
		let pending = Self(Rc::new(RefCell::new(State::Waiting(Vec::new()))));
		(pending.clone(), Resolver(pending))
	}

	#[must_use]
	pub fn resolved(value: T) -> Self {
		Self(Rc::new(RefCell::new(State::Settled(Ok(value)))))
	}

	#[must_use]
	pub fn rejected(reason: impl Into<String>) -> Self {
		Self(Rc::new(RefCell::new(State::Settled(Err(Rejection(reason.into()))))))
	}

	#[must_use]
	pub fn is_settled(&self) -> bool {
		matches!(&*self.0.borrow(), State::Settled(_))
	}

	/// Runs `callback` once this value settles, immediately if it already has.
	pub fn on_settle(&self, callback: impl 'static + FnOnce(Settled<T>)) {
		let settled = {
			let mut state = self.0.borrow_mut();
			match &mut *state {
				State::Waiting(callbacks) => {
					callbacks.push(Box::new(callback));
					return;
				}
				State::Settled(settled) => settled.clone(),
			}
		};
		callback(settled)
	}

	#[must_use]
	pub fn map<U: Clone + 'static>(&self, transform: impl 'static + FnOnce(T) -> U) -> Pending<U> {
		let (mapped, resolver) = Pending::new();
		self.on_settle(move |settled| resolver.settle(settled.map(transform)));
		mapped
	}

	/// Resolves once every input has, in input order. Rejects with the first rejection.
	#[must_use]
	pub fn all(pendings: Vec<Pending<T>>) -> Pending<Vec<T>> {
		if pendings.is_empty() {
			return Pending::resolved(Vec::new());
		}

		struct Gather<T> {
			values: Vec<Option<T>>,
			remaining: usize,
			resolver: Option<Resolver<Vec<T>>>,
		}

		let (all, resolver) = Pending::new();
		let gather = Rc::new(RefCell::new(Gather {
			values: vec![None; pendings.len()],
			remaining: pendings.len(),
			resolver: Some(resolver),
		}));
		for (index, pending) in pendings.into_iter().enumerate() {
			let gather = gather.clone();
			pending.on_settle(move |settled| {
				let mut gather = gather.borrow_mut();
				let complete = match settled {
					Ok(value) => {
						gather.values[index] = Some(value);
						gather.remaining -= 1;
						if gather.remaining > 0 {
							return;
						}
						Ok(gather.values.iter_mut().filter_map(Option::take).collect())
					}
					Err(rejection) => Err(rejection),
				};
				let resolver = gather.resolver.take();
				drop(gather);
				if let Some(resolver) = resolver {
					resolver.settle(complete)
				}
			})
		}
		all
	}
}

impl<T: Clone + 'static> Resolver<T> {
	pub fn resolve(self, value: T) {
		self.settle(Ok(value))
	}

	pub fn reject(self, reason: impl Into<String>) {
		self.settle(Err(Rejection(reason.into())))
	}

	fn settle(self, settled: Settled<T>) {
		let callbacks = {
			let mut state = (self.0).0.borrow_mut();
			match &mut *state {
				State::Waiting(callbacks) => {
					let callbacks = core::mem::take(callbacks);
					*state = State::Settled(settled.clone());
					callbacks
				}
				State::Settled(_) => return warn!("Tried to settle an already settled `Pending`."),
			}
		};
		for callback in callbacks {
			callback(settled.clone())
		}
	}
}
