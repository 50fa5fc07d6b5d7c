//! History change detection.
//!
//! A [`NavigationInterceptor`] is installed once per page on top of a [`HistoryBackend`].
//! The backend reports every (patched) `pushState`/`replaceState` call and every `popstate` event through [`InterceptHooks`],
//! and the interceptor turns these into [`NavigationEvent`]s for its subscribers.

use crate::{
	callback_set::{CallbackSet, HandlerId},
	loggable, Result,
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::{Rc, Weak};
use tracing::{debug, instrument, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationKind {
	Popstate,
	PushState,
	ReplaceState,
}

/// A mutating History API call, as reported by a [`HistoryBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryCall {
	PushState,
	ReplaceState,
}

impl From<HistoryCall> for NavigationKind {
	fn from(call: HistoryCall) -> Self {
		match call {
			HistoryCall::PushState => Self::PushState,
			HistoryCall::ReplaceState => Self::ReplaceState,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
	pub kind: NavigationKind,
	/// The href observed right after the event.
	pub href: String,
	/// The href the interceptor had observed before this event.
	///
	/// Recorded when the event is created, so nested navigations in other handlers don't affect it.
	pub previous_href: String,
}

/// Mirrors [***history.scrollRestoration***](https://developer.mozilla.org/en-US/docs/Web/API/History/scrollRestoration).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollRestoration {
	Auto,
	Manual,
}

impl Default for ScrollRestoration {
	fn default() -> Self {
		Self::Auto
	}
}

/// The page's session history and window scroll function.
///
/// Implementations report mutations through the [`InterceptHooks`] handed to [`install`](`HistoryBackend::install`),
/// including mutations made by code that doesn't know about the interceptor.
pub trait HistoryBackend {
	fn href(&self) -> String;

	/// # Errors
	///
	/// Iff `url` can't be resolved or the platform rejects the call.
	fn push_state(&self, url: &str) -> Result<()>;

	/// # Errors
	///
	/// Iff `url` can't be resolved or the platform rejects the call.
	fn replace_state(&self, url: &str) -> Result<()>;

	/// Moves through the session history. `popstate` may be reported later.
	///
	/// # Errors
	///
	/// Iff the platform rejects the call. Out-of-range deltas are not an error.
	fn go(&self, delta: i32) -> Result<()>;
	fn scroll_restoration(&self) -> ScrollRestoration;
	/// The unintercepted scroll function.
	fn scroll_to(&self, x: f64, y: f64);

	/// Starts reporting to `hooks`.
	///
	/// # Errors
	///
	/// [`Error::AlreadyInstalled`](`crate::Error::AlreadyInstalled`) iff interception is already installed for this page.
	fn install(&self, hooks: InterceptHooks) -> Result<()>;
}

struct Inner {
	backend: Rc<dyn HistoryBackend>,
	last_href: RefCell<String>,
	handlers: CallbackSet<NavigationEvent>,
	scroll_gate: RefCell<Option<Rc<dyn Fn() -> bool>>>,
}

/// The History Change Detector.
///
/// Cheap to clone; all clones share the same interception.
#[derive(Clone)]
pub struct NavigationInterceptor(Rc<Inner>);

impl NavigationInterceptor {
	/// Installs interception on `backend`.
	///
	/// # Errors
	///
	/// Iff `backend` refuses the installation, most likely because it is already intercepted.
	#[instrument(skip(backend))]
	pub fn install(backend: Rc<dyn HistoryBackend>) -> Result<Self> {
		let href = backend.href();
		let inner = Rc::new(Inner {
			backend,
			last_href: RefCell::new(href),
			handlers: CallbackSet::default(),
			scroll_gate: RefCell::new(None),
		});
		inner.backend.install(InterceptHooks(Rc::downgrade(&inner)))?;
		debug!("Installed navigation interception.");
		Ok(Self(inner))
	}

	pub fn add(&self, handler: impl Fn(&NavigationEvent) + 'static) -> HandlerId {
		self.0.handlers.add(Rc::new(handler))
	}

	pub fn delete(&self, id: HandlerId) -> bool {
		self.0.handlers.delete(id)
	}

	/// Like [`add`](`NavigationInterceptor::add`), but the handler is deleted when the returned [`Listener`] is dropped.
	#[must_use = "The handler is deleted when the `Listener` is dropped."]
	pub fn listen(&self, handler: impl Fn(&NavigationEvent) + 'static) -> Listener {
		Listener {
			interceptor: Rc::downgrade(&self.0),
			id: Some(self.add(handler)),
		}
	}

	#[must_use]
	pub fn handler_count(&self) -> usize {
		self.0.handlers.len()
	}

	#[must_use]
	pub fn href(&self) -> String {
		self.0.backend.href()
	}

	#[must_use]
	pub fn scroll_restoration(&self) -> ScrollRestoration {
		self.0.backend.scroll_restoration()
	}

	/// # Errors
	///
	/// Iff the backend can't resolve `url` ([`Error::InvalidUrl`](`crate::Error::InvalidUrl`))
	/// or the browser rejects the call ([`Error::Js`](`crate::Error::Js`)).
	pub fn push_state(&self, url: &str) -> Result<()> {
		self.0.backend.push_state(url)
	}

	/// # Errors
	///
	/// See [`push_state`](`NavigationInterceptor::push_state`).
	pub fn replace_state(&self, url: &str) -> Result<()> {
		self.0.backend.replace_state(url)
	}

	/// # Errors
	///
	/// Iff the browser rejects the traversal. Out-of-range deltas are ignored instead.
	pub fn go(&self, delta: i32) -> Result<()> {
		self.0.backend.go(delta)
	}

	/// # Errors
	///
	/// See [`go`](`NavigationInterceptor::go`).
	pub fn back(&self) -> Result<()> {
		self.go(-1)
	}

	/// # Errors
	///
	/// See [`go`](`NavigationInterceptor::go`).
	pub fn forward(&self) -> Result<()> {
		self.go(1)
	}

	/// Scrolls the window unless the scroll gate currently swallows programmatic scrolling.
	///
	/// Returns whether the call was forwarded.
	pub fn scroll_to(&self, x: f64, y: f64) -> bool {
		let allowed = self.hooks().allow_scroll();
		if allowed {
			self.0.backend.scroll_to(x, y);
		}
		allowed
	}

	/// Installs the predicate consulted before each programmatic scroll call.
	///
	/// There is only one gate per page. The gate is removed when the returned guard is dropped.
	#[must_use = "The gate is removed when the `Subscription` is dropped."]
	pub fn set_scroll_gate(&self, gate: impl Fn() -> bool + 'static) -> crate::Subscription {
		let gate: Rc<dyn Fn() -> bool> = Rc::new(gate);
		if self.0.scroll_gate.replace(Some(gate.clone())).is_some() {
			warn!("Replaced an existing scroll gate.");
		}
		let inner = Rc::downgrade(&self.0);
		crate::Subscription::new(move || {
			if let Some(inner) = inner.upgrade() {
				let mut slot = inner.scroll_gate.borrow_mut();
				if slot.as_ref().map_or(false, |current| Rc::ptr_eq(current, &gate)) {
					*slot = None;
				}
			}
		})
	}

	/// The same hooks the backend reports to.
	#[must_use]
	pub fn hooks(&self) -> InterceptHooks {
		InterceptHooks(Rc::downgrade(&self.0))
	}
}

impl Debug for NavigationInterceptor {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("NavigationInterceptor")
			.field("last_href", &loggable(&self.0.last_href.borrow()))
			.field("handlers", &self.0.handlers)
			.finish()
	}
}

/// Entry points a [`HistoryBackend`] calls from its patched functions and event listeners.
///
/// All methods do nothing once the [`NavigationInterceptor`] is gone.
#[derive(Clone)]
pub struct InterceptHooks(Weak<Inner>);

impl InterceptHooks {
	/// To be called right after the real `pushState`/`replaceState` returned.
	pub fn history_call(&self, call: HistoryCall) {
		let inner = match self.0.upgrade() {
			Some(inner) => inner,
			None => return,
		};

		let href = inner.backend.href();
		if *inner.last_href.borrow() == href {
			trace!(?call, "History call without href change.");
			return;
		}
		let previous_href = inner.last_href.replace(href.clone());

		trace!(?call, href = loggable(&href), "History changed.");
		inner.handlers.dispatch(&NavigationEvent {
			kind: call.into(),
			href,
			previous_href,
		});
	}

	/// To be called from the `popstate` listener. Always notifies, even if the href is unchanged.
	pub fn popstate(&self) {
		let inner = match self.0.upgrade() {
			Some(inner) => inner,
			None => return,
		};

		let href = inner.backend.href();
		let previous_href = inner.last_href.replace(href.clone());

		trace!(href = loggable(&href), "popstate");
		inner.handlers.dispatch(&NavigationEvent {
			kind: NavigationKind::Popstate,
			href,
			previous_href,
		});
	}

	/// Whether a programmatic scroll call should reach the real scroll function.
	#[must_use]
	pub fn allow_scroll(&self) -> bool {
		let gate = match self.0.upgrade() {
			Some(inner) => inner.scroll_gate.borrow().clone(),
			None => return true,
		};
		match gate {
			Some(gate) => {
				let allowed = gate();
				if !allowed {
					debug!("Swallowed a programmatic scroll call.");
				}
				allowed
			}
			None => true,
		}
	}
}

impl Debug for InterceptHooks {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("InterceptHooks").field(&(self.0.strong_count() > 0)).finish()
	}
}

/// Deletes its handler from the [`NavigationInterceptor`] when dropped.
pub struct Listener {
	interceptor: Weak<Inner>,
	id: Option<HandlerId>,
}

impl Listener {
	/// Keeps the handler registered for the rest of the page's lifetime.
	pub fn detach(mut self) -> Option<HandlerId> {
		self.id.take()
	}
}

impl Drop for Listener {
	fn drop(&mut self) {
		if let (Some(id), Some(inner)) = (self.id.take(), self.interceptor.upgrade()) {
			inner.handlers.delete(id);
		}
	}
}

impl Debug for Listener {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Listener").field("id", &self.id).finish()
	}
}
