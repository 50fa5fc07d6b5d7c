use core::{
	borrow::Borrow,
	hash::{BuildHasher, Hash},
};
use hashbrown::{
	hash_map::{DefaultHashBuilder, Entry},
	HashMap,
};
use num_traits::{CheckedAdd, CheckedSub, One, Zero};

/// A map whose entries carry a use count.
///
/// Entries are never removed implicitly. [`decrement`](`RcHashMap::decrement`) hands removal decisions to the caller
/// at the moment a count reaches zero.
pub struct RcHashMap<K, C, V, S = DefaultHashBuilder>(HashMap<K, (C, V), S>)
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
		Self::new()
	}
}
impl<K, C, V, S> RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher,
{
	#[must_use]
	pub fn new() -> Self
	where
		S: Default,
	{
		Self(HashMap::with_hasher(S::default()))
	}

	/// Inserts `v` with a count of zero, replacing (and returning) any previous value but keeping its count.
	pub fn insert_weak(&mut self, k: K, v: V) -> Option<V> {
		match self.0.entry(k) {
			Entry::Occupied(occupied) => Some(core::mem::replace(&mut occupied.into_mut().1, v)),
			Entry::Vacant(vacant) => {
				vacant.insert((C::zero(), v));
				None
			}
		}
	}

	/// Increments the count of `k`, inserting `v` with a count of one if it's missing.
	///
	/// `v` is handed back if it wasn't inserted.
	pub fn increment_or_insert(&mut self, k: K, v: V) -> Result<(&mut V, Option<V>), CountSaturatedError> {
		match self.0.entry(k) {
			Entry::Occupied(occupied) => {
				let (c, existing) = occupied.into_mut();
				*c = c.checked_add(&C::one()).ok_or(CountSaturatedError)?;
				Ok((existing, Some(v)))
			}
			Entry::Vacant(vacant) => {
				let (_, v) = vacant.insert((C::one(), v));
				Ok((v, None))
			}
		}
	}

	/// Increments the count of an existing entry.
	pub fn increment<Q: ?Sized>(&mut self, k: &Q) -> Result<Option<&mut V>, CountSaturatedError>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		match self.0.get_mut(k) {
			Some((c, v)) => {
				*c = c.checked_add(&C::one()).ok_or(CountSaturatedError)?;
				Ok(Some(v))
			}
			None => Ok(None),
		}
	}

	/// Decrements the count of `k`. If it reaches zero and `remove_if` agrees, the entry is removed.
	pub fn decrement<Q: ?Sized>(&mut self, k: &Q, remove_if: impl FnOnce(&V) -> bool) -> Result<Decrement<V>, CountSaturatedError>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		let remove = match self.0.get_mut(k) {
			Some((c, v)) => {
				*c = c.checked_sub(&C::one()).ok_or(CountSaturatedError)?;
				c.is_zero() && remove_if(v)
			}
			None => return Ok(Decrement::Missing),
		};

		if remove {
			Ok(self.0.remove(k).map_or(Decrement::Missing, |(_, v)| Decrement::Removed(v)))
		} else {
			Ok(Decrement::Retained)
		}
	}

	pub fn get<Q: ?Sized>(&self, k: &Q) -> Option<(&C, &V)>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		self.0.get(k).map(|(c, v)| (c, v))
	}

	pub fn contains_key<Q: ?Sized>(&self, k: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		self.0.contains_key(k)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

#[derive(Debug, PartialEq, Eq)]
pub enum Decrement<V> {
	Missing,
	Retained,
	Removed(V),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSaturatedError;

impl From<CountSaturatedError> for crate::Error {
	fn from(_: CountSaturatedError) -> Self {
		Self::CountSaturated
	}
}
