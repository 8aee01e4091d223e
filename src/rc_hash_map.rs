//! Reference-counted side table for host-side handles that must outlive individual registrations.

use core::{
	borrow::Borrow,
	hash::{BuildHasher, Hash},
};
use hashbrown::{
	hash_map::{DefaultHashBuilder, Entry},
	HashMap,
};
use num_traits::{CheckedAdd, CheckedSub, One, Zero};
use thiserror::Error;

/// A [`HashMap`] whose entries carry a use count.
///
/// Entries aren't removed when their count reaches zero, only when [`RcHashMap::drain_weak`] is called,
/// so a handle that's released and reacquired within one update isn't recreated.
#[derive(Debug)]
pub(crate) struct RcHashMap<K, C, V, S = DefaultHashBuilder>(HashMap<K, (C, V), S>)
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher;
impl<K, C, V, S> Default for RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: Default + BuildHasher,
{
	fn default() -> Self {
		Self(HashMap::with_hasher(S::default()))
	}
}
impl<K, C, V, S> RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher,
{
	pub fn acquire_with(&mut self, key: K, create: impl FnOnce() -> V) -> Result<&mut V, CountSaturatedError> {
		match self.0.entry(key) {
			Entry::Occupied(occupied) => {
				let (count, value) = occupied.into_mut();
				*count = count.checked_add(&C::one()).ok_or(CountSaturatedError)?;
				Ok(value)
			}
			Entry::Vacant(vacant) => {
				let (_, value) = vacant.insert((C::one(), create()));
				Ok(value)
			}
		}
	}

	/// Returns the entry's value if it is still present.
	pub fn release<Q: ?Sized>(&mut self, key: &Q) -> Result<Option<&mut V>, CountSaturatedError>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		match self.0.get_mut(key) {
			Some((count, value)) => {
				*count = count.checked_sub(&C::one()).ok_or(CountSaturatedError)?;
				Ok(Some(value))
			}
			None => Ok(None),
		}
	}

	pub fn get<Q: ?Sized>(&self, key: &Q) -> Option<&V>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		self.0.get(key).map(|(_, value)| value)
	}

	/// Removes and yields every entry with a zero count.
	pub fn drain_weak(&mut self) -> impl '_ + Iterator<Item = (K, V)> {
		self.0.extract_if(|_, (count, _)| count.is_zero()).map(|(key, (_, value))| (key, value))
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("handle use count saturated")]
pub(crate) struct CountSaturatedError;
