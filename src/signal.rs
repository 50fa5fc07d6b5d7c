//! A small single-threaded reactive model.
//!
//! Propagation is synchronous: [`Signal::set`] returns only after every observer ran.
//! Observers are snapshotted before each notification, so they may freely set other signals,
//! subscribe or drop [`Subscription`]s while being notified.

use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use std::rc::{Rc, Weak};

type Observer<T> = Rc<dyn Fn(&T)>;

struct Inner<T> {
	value: RefCell<T>,
	observers: RefCell<Vec<(u64, Observer<T>)>>,
	next_id: Cell<u64>,
}

/// A shared, observable value.
///
/// Cloning a [`Signal`] yields another handle to the same cell.
pub struct Signal<T>(Rc<Inner<T>>);

impl<T> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<T: Debug> Debug for Signal<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Signal").field(&*self.0.value.borrow()).finish()
	}
}

impl<T: Default + Clone + PartialEq + 'static> Default for Signal<T> {
	fn default() -> Self {
		Self::new(T::default())
	}
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
	#[must_use]
	pub fn new(value: T) -> Self {
		Self(Rc::new(Inner {
			value: RefCell::new(value),
			observers: RefCell::new(Vec::new()),
			next_id: Cell::new(0),
		}))
	}

	#[must_use]
	pub fn get(&self) -> T {
		self.0.value.borrow().clone()
	}

	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&self.0.value.borrow())
	}

	/// Stores `value` and notifies observers if it differs from the current one.
	///
	/// Returns whether observers were notified.
	pub fn set(&self, value: T) -> bool {
		{
			let mut current = self.0.value.borrow_mut();
			if *current == value {
				return false;
			}
			*current = value;
		}
		self.notify();
		true
	}

	pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
		let mut value = self.get();
		f(&mut value);
		self.set(value)
	}

	/// Calls `observer` after each change.
	#[must_use = "The observer is removed when the `Subscription` is dropped."]
	pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> Subscription {
		let id = self.0.next_id.get();
		self.0.next_id.set(id + 1);
		self.0.observers.borrow_mut().push((id, Rc::new(observer)));

		let weak: Weak<Inner<T>> = Rc::downgrade(&self.0);
		Subscription::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.observers.borrow_mut().retain(|(other, _)| *other != id);
			}
		})
	}

	/// Like [`subscribe`](`Signal::subscribe`), but also calls `observer` with the current value right away.
	#[must_use = "The observer is removed when the `Subscription` is dropped."]
	pub fn watch(&self, observer: impl Fn(&T) + 'static) -> Subscription {
		let current = self.get();
		observer(&current);
		self.subscribe(observer)
	}

	/// Calls `f` once, as soon as `predicate` holds for the signal's value.
	///
	/// If it already holds, `f` runs before this method returns and the returned [`Subscription`] is inert.
	#[must_use = "The pending call is cancelled when the `Subscription` is dropped."]
	pub fn when(&self, predicate: impl Fn(&T) -> bool + 'static, f: impl FnOnce() + 'static) -> Subscription {
		if self.with(&predicate) {
			f();
			return Subscription::empty();
		}

		let f = Cell::new(Some(f));
		self.subscribe(move |value| {
			if predicate(value) {
				if let Some(f) = f.take() {
					f()
				}
			}
		})
	}

	#[must_use]
	pub fn read_only(&self) -> ReadSignal<T> {
		ReadSignal(self.clone())
	}

	#[must_use]
	pub fn observer_count(&self) -> usize {
		self.0.observers.borrow().len()
	}

	/// Observers unsubscribed by an earlier observer of the same notification are skipped.
	fn notify(&self) {
		let snapshot: Vec<(u64, Observer<T>)> = self.0.observers.borrow().clone();
		for (id, observer) in snapshot {
			if !self.0.observers.borrow().iter().any(|(other, _)| *other == id) {
				continue;
			}
			let value = self.get();
			observer(&value);
		}
	}
}

/// A read-only view of a [`Signal`].
pub struct ReadSignal<T>(Signal<T>);

impl<T> Clone for ReadSignal<T> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<T: Debug> Debug for ReadSignal<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ReadSignal").field(&*(self.0).0.value.borrow()).finish()
	}
}

impl<T: Clone + PartialEq + 'static> ReadSignal<T> {
	#[must_use]
	pub fn get(&self) -> T {
		self.0.get()
	}

	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		self.0.with(f)
	}

	#[must_use = "The observer is removed when the `Subscription` is dropped."]
	pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> Subscription {
		self.0.subscribe(observer)
	}

	#[must_use = "The observer is removed when the `Subscription` is dropped."]
	pub fn watch(&self, observer: impl Fn(&T) + 'static) -> Subscription {
		self.0.watch(observer)
	}

	#[must_use = "The pending call is cancelled when the `Subscription` is dropped."]
	pub fn when(&self, predicate: impl Fn(&T) -> bool + 'static, f: impl FnOnce() + 'static) -> Subscription {
		self.0.when(predicate, f)
	}
}

impl<T> From<Signal<T>> for ReadSignal<T> {
	fn from(signal: Signal<T>) -> Self {
		Self(signal)
	}
}

/// Removes an observer (or runs some other teardown) when dropped.
pub struct Subscription(Option<Box<dyn FnOnce()>>);

impl Subscription {
	pub fn new(teardown: impl FnOnce() + 'static) -> Self {
		Self(Some(Box::new(teardown)))
	}

	#[must_use]
	pub fn empty() -> Self {
		Self(None)
	}

	/// Keeps the observer alive for the rest of the page's lifetime.
	pub fn detach(mut self) {
		self.0 = None;
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(teardown) = self.0.take() {
			teardown()
		}
	}
}

impl Debug for Subscription {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Subscription").field(&self.0.is_some()).finish()
	}
}

/// Owns teardown work for some lifetime (usually a mounted component) and runs it, newest first, on drop.
#[derive(Default)]
pub struct Scope {
	cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl Scope {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on_cleanup(&self, cleanup: impl FnOnce() + 'static) {
		self.cleanups.borrow_mut().push(Box::new(cleanup));
	}

	pub fn hold(&self, subscription: Subscription) {
		self.on_cleanup(move || drop(subscription));
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.cleanups.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Drop for Scope {
	fn drop(&mut self) {
		// Cleanups may register further cleanups on other scopes, but never on this one.
		let cleanups = self.cleanups.replace(Vec::new());
		for cleanup in cleanups.into_iter().rev() {
			cleanup()
		}
	}
}

impl Debug for Scope {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope").field("cleanups", &self.len()).finish()
	}
}
