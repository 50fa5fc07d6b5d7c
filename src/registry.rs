//! The Reactive Instance Registry.
//!
//! Several UI components may observe the same search or category engine instance by passing the same state key.
//! Instances are created on first use and disposed deterministically when their last [`Lease`] is dropped.
//! The default instance of each kind (state key `None`) is provided up front and lives for the whole page.

use crate::{
	rc_hash_map::{Decrement, RcHashMap},
	Error, Result, Signal, Subscription,
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Display, Formatter},
	ops::Deref,
};
use std::rc::{Rc, Weak};
use tracing::{error, instrument, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
	Search,
	Category,
}

impl Display for EngineKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			EngineKind::Search => "search",
			EngineKind::Category => "category",
		})
	}
}

/// Teardown for a lazily created instance. Runs at most once.
pub struct Disposer(Box<dyn FnOnce()>);

impl Disposer {
	pub fn new(dispose: impl FnOnce() + 'static) -> Self {
		Self(Box::new(dispose))
	}

	pub fn dispose(self) {
		(self.0)()
	}
}

impl Debug for Disposer {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str("Disposer")
	}
}

type Key = (EngineKind, Option<String>);

struct Slot<I> {
	instance: I,
	/// `None` only for default instances, which are never removed.
	dispose: Option<Disposer>,
}

struct Inner<I> {
	entries: RefCell<RcHashMap<Key, u32, Slot<I>>>,
}

impl<I> Inner<I> {
	fn release(&self, key: &Key) {
		let decrement = self.entries.borrow_mut().decrement(key, |slot| slot.dispose.is_some());
		match decrement {
			Ok(Decrement::Removed(slot)) => {
				trace!(kind = %key.0, "Disposing instance.");
				if let Some(dispose) = slot.dispose {
					dispose.dispose()
				}
			}
			Ok(Decrement::Retained) => (),
			Ok(Decrement::Missing) => warn!(kind = %key.0, "Released an instance that isn't registered."),
			Err(_) => error!(kind = %key.0, "Released an instance more often than it was acquired."),
		}
	}
}

/// Cheap to clone; all clones share the same entries.
pub struct InstanceRegistry<I>(Rc<Inner<I>>);

impl<I> Clone for InstanceRegistry<I> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<I> Default for InstanceRegistry<I> {
	fn default() -> Self {
		Self(Rc::new(Inner {
			entries: RefCell::new(RcHashMap::new()),
		}))
	}
}

impl<I: Clone + 'static> InstanceRegistry<I> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the default instance of `kind`. Called once during provider setup.
	#[instrument(skip(self, instance))]
	pub fn provide_default(&self, kind: EngineKind, instance: I) {
		if self.0.entries.borrow_mut().insert_weak((kind, None), Slot { instance, dispose: None }).is_some() {
			warn!("Replaced the default {} instance.", kind);
		}
	}

	/// Acquires the instance of `kind` for `state_key`, creating it with `create` if necessary.
	///
	/// `create` runs without any registry borrows held, so it may use the registry itself.
	///
	/// # Errors
	///
	/// - [`Error::ProviderNotInitialized`] iff there is no default instance of `kind` yet.
	/// - [`Error::CountSaturated`] iff the instance already has [`u32::MAX`] users.
	#[instrument(skip(self, create))]
	pub fn get_or_create(&self, kind: EngineKind, state_key: Option<&str>, create: impl FnOnce() -> (I, Disposer)) -> Result<Lease<I>> {
		if !self.0.entries.borrow().contains_key(&(kind, None::<String>)) {
			return Err(Error::ProviderNotInitialized { kind });
		}

		let key: Key = (kind, state_key.map(ToOwned::to_owned));

		let existing = self.0.entries.borrow_mut().increment(&key)?.map(|slot| slot.instance.clone());
		let instance = match existing {
			Some(instance) => instance,
			None => {
				let (instance, dispose) = create();
				trace!("Created instance.");
				let (instance, unused) = {
					let mut entries = self.0.entries.borrow_mut();
					let (slot, unused) = entries.increment_or_insert(
						key.clone(),
						Slot {
							instance,
							dispose: Some(dispose),
						},
					)?;
					(slot.instance.clone(), unused)
				};
				if let Some(unused) = unused {
					// `create` registered the same key itself.
					warn!("Instance was created reentrantly; disposing the duplicate.");
					if let Some(dispose) = unused.dispose {
						dispose.dispose()
					}
				}
				instance
			}
		};

		Ok(Lease {
			registry: Rc::downgrade(&self.0),
			key: Some(key),
			instance,
		})
	}

	#[must_use]
	pub fn users(&self, kind: EngineKind, state_key: Option<&str>) -> Option<u32> {
		self.0.entries.borrow().get(&(kind, state_key.map(ToOwned::to_owned))).map(|(&users, _)| users)
	}

	#[must_use]
	pub fn contains(&self, kind: EngineKind, state_key: Option<&str>) -> bool {
		self.0.entries.borrow().contains_key(&(kind, state_key.map(ToOwned::to_owned)))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.entries.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<I> Debug for InstanceRegistry<I> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("InstanceRegistry").field("entries", &self.0.entries.borrow().len()).finish()
	}
}

/// One user's share of a registered instance. Dropping it releases that share.
pub struct Lease<I> {
	registry: Weak<Inner<I>>,
	key: Option<Key>,
	instance: I,
}

impl<I> Lease<I> {
	#[must_use]
	pub fn instance(&self) -> &I {
		&self.instance
	}

	#[must_use]
	pub fn kind(&self) -> Option<EngineKind> {
		self.key.as_ref().map(|(kind, _)| *kind)
	}

	#[must_use]
	pub fn state_key(&self) -> Option<&str> {
		self.key.as_ref().and_then(|(_, state_key)| state_key.as_deref())
	}
}

impl<I> Deref for Lease<I> {
	type Target = I;

	fn deref(&self) -> &I {
		&self.instance
	}
}

impl<I> Drop for Lease<I> {
	fn drop(&mut self) {
		if let (Some(key), Some(registry)) = (self.key.take(), self.registry.upgrade()) {
			registry.release(&key)
		}
	}
}

impl<I: Debug> Debug for Lease<I> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Lease").field("key", &self.key).field("instance", &self.instance).finish()
	}
}

/// Page-wide settings every engine instance follows.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
	pub market: Signal<String>,
	pub merchant: Signal<String>,
	pub locale: Signal<String>,
}

impl SharedSettings {
	#[must_use]
	pub fn new(merchant: &str, market: &str, locale: &str) -> Self {
		Self {
			market: Signal::new(market.to_owned()),
			merchant: Signal::new(merchant.to_owned()),
			locale: Signal::new(locale.to_owned()),
		}
	}
}

/// An engine instance's own copy of the [`SharedSettings`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
	pub market: Signal<String>,
	pub merchant: Signal<String>,
	pub locale: Signal<String>,
}

impl EngineSettings {
	/// Creates settings that track `shared` until the returned [`Disposer`] runs.
	pub fn follow(shared: &SharedSettings) -> (Self, Disposer) {
		fn mirror(source: &Signal<String>) -> (Signal<String>, Subscription) {
			let target = Signal::new(source.get());
			let subscription = source.subscribe({
				let target = target.clone();
				move |value| {
					target.set(value.clone());
				}
			});
			(target, subscription)
		}

		let (market, market_subscription) = mirror(&shared.market);
		let (merchant, merchant_subscription) = mirror(&shared.merchant);
		let (locale, locale_subscription) = mirror(&shared.locale);

		let settings = Self { market, merchant, locale };
		let disposer = Disposer::new(move || {
			drop(market_subscription);
			drop(merchant_subscription);
			drop(locale_subscription);
		});
		(settings, disposer)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use core::cell::Cell;

	#[test]
	fn requires_provider() {
		let registry = InstanceRegistry::<u8>::new();
		let result = registry.get_or_create(EngineKind::Search, Some("a"), || (1, Disposer::new(|| ())));
		assert_eq!(result.err(), Some(Error::ProviderNotInitialized { kind: EngineKind::Search }));
	}

	#[test]
	fn reentrant_create_keeps_one_instance() {
		let registry = InstanceRegistry::<u8>::new();
		registry.provide_default(EngineKind::Category, 0);
		let disposed = Rc::new(Cell::new(0));

		let inner_lease = Rc::new(RefCell::new(None));
		let outer = registry
			.get_or_create(EngineKind::Category, Some("k"), {
				let registry = registry.clone();
				let inner_lease = inner_lease.clone();
				let disposed = disposed.clone();
				move || {
					*inner_lease.borrow_mut() = Some(registry.get_or_create(EngineKind::Category, Some("k"), || (1, Disposer::new(|| ()))).unwrap());
					(2, Disposer::new(move || disposed.set(disposed.get() + 1)))
				}
			})
			.unwrap();

		assert_eq!(*outer, 1);
		assert_eq!(disposed.get(), 1);
		assert_eq!(registry.users(EngineKind::Category, Some("k")), Some(2));
		drop(outer);
		drop(inner_lease.borrow_mut().take());
		assert!(!registry.contains(EngineKind::Category, Some("k")));
	}

	#[test]
	fn engine_settings_follow_until_disposed() {
		let shared = SharedSettings::new("merchant", "se", "sv-SE");
		let (settings, disposer) = EngineSettings::follow(&shared);
		assert_eq!(settings.locale.get(), "sv-SE");

		shared.locale.set("en-GB".to_owned());
		assert_eq!(settings.locale.get(), "en-GB");

		disposer.dispose();
		shared.market.set("gb".to_owned());
		assert_eq!(settings.market.get(), "se");
		assert_eq!(shared.market.observer_count(), 0);
	}
}
