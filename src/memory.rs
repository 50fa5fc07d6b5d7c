//! In-memory implementations of every host capability.
//!
//! These make the navigation core usable without a browser, for example in headless hosts and tests.
//! Unlike in browsers, `popstate` is reported synchronously from within [`MemoryHistory::go`].

use crate::{
	guard::{CurrentEventClassifier, EventOrigin},
	history::{HistoryBackend, HistoryCall, InterceptHooks, NavigationInterceptor, ScrollRestoration},
	loggable,
	padding::{PaddingEffect, PaddingSurface},
	router::{HostRouter, NavigateMode},
	Error, ReadSignal, Result, Signal, TaskQueue,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use std::{collections::VecDeque, rc::Rc};
use tracing::{debug, trace};
use url::Url;

/// A session history with no browser attached.
#[derive(Debug)]
pub struct MemoryHistory {
	entries: RefCell<Vec<String>>,
	index: Cell<usize>,
	hooks: RefCell<Option<InterceptHooks>>,
	scroll_restoration: Cell<ScrollRestoration>,
	scroll_calls: RefCell<Vec<(f64, f64)>>,
	in_popstate: Cell<bool>,
}

impl MemoryHistory {
	/// # Errors
	///
	/// Iff `initial_href` isn't an absolute URL.
	pub fn new(initial_href: &str) -> Result<Self> {
		let url = Url::parse(initial_href).map_err(|error| Error::InvalidUrl {
			url: initial_href.to_owned(),
			reason: error.to_string(),
		})?;
		Ok(Self {
			entries: RefCell::new(vec![url.into()]),
			index: Cell::new(0),
			hooks: RefCell::new(None),
			scroll_restoration: Cell::new(ScrollRestoration::Auto),
			scroll_calls: RefCell::new(Vec::new()),
			in_popstate: Cell::new(false),
		})
	}

	pub fn set_scroll_restoration(&self, scroll_restoration: ScrollRestoration) {
		self.scroll_restoration.set(scroll_restoration)
	}

	/// The programmatic scroll calls that reached the window, oldest first.
	#[must_use]
	pub fn scroll_calls(&self) -> Vec<(f64, f64)> {
		self.scroll_calls.borrow().clone()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		false
	}

	#[must_use]
	pub fn index(&self) -> usize {
		self.index.get()
	}

	fn resolve(&self, url: &str) -> Result<String> {
		let current = self.href();
		Url::parse(&current)
			.and_then(|base| base.join(url))
			.map(String::from)
			.map_err(|error| Error::InvalidUrl {
				url: url.to_owned(),
				reason: error.to_string(),
			})
	}

	fn hooks(&self) -> Option<InterceptHooks> {
		self.hooks.borrow().clone()
	}
}

impl HistoryBackend for MemoryHistory {
	fn href(&self) -> String {
		self.entries.borrow()[self.index.get()].clone()
	}

	fn push_state(&self, url: &str) -> Result<()> {
		let href = self.resolve(url)?;
		{
			let mut entries = self.entries.borrow_mut();
			let index = self.index.get();
			entries.truncate(index + 1);
			entries.push(href);
			self.index.set(index + 1);
		}
		if let Some(hooks) = self.hooks() {
			hooks.history_call(HistoryCall::PushState)
		}
		Ok(())
	}

	fn replace_state(&self, url: &str) -> Result<()> {
		let href = self.resolve(url)?;
		self.entries.borrow_mut()[self.index.get()] = href;
		if let Some(hooks) = self.hooks() {
			hooks.history_call(HistoryCall::ReplaceState)
		}
		Ok(())
	}

	fn go(&self, delta: i32) -> Result<()> {
		#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
		let target = self.index.get() as i64 + i64::from(delta);
		#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
		let len = self.len() as i64;
		if delta == 0 || target < 0 || target >= len {
			debug!(delta, "Ignored history traversal out of range.");
			return Ok(());
		}

		#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
		self.index.set(target as usize);
		trace!(href = loggable(&self.href()), "Traversed history.");

		if let Some(hooks) = self.hooks() {
			self.in_popstate.set(true);
			hooks.popstate();
			self.in_popstate.set(false);
		}
		Ok(())
	}

	fn scroll_restoration(&self) -> ScrollRestoration {
		self.scroll_restoration.get()
	}

	fn scroll_to(&self, x: f64, y: f64) {
		self.scroll_calls.borrow_mut().push((x, y));
	}

	fn install(&self, hooks: InterceptHooks) -> Result<()> {
		let mut slot = self.hooks.borrow_mut();
		if slot.is_some() {
			return Err(Error::AlreadyInstalled);
		}
		*slot = Some(hooks);
		Ok(())
	}
}

/// Reports [`EventOrigin::Popstate`] while [`MemoryHistory`] is dispatching `popstate`.
impl CurrentEventClassifier for MemoryHistory {
	fn is_popstate(&self) -> EventOrigin {
		if self.in_popstate.get() {
			EventOrigin::Popstate
		} else {
			EventOrigin::Programmatic
		}
	}
}

/// A macrotask queue that only runs when told to.
#[derive(Default)]
pub struct ManualTaskQueue {
	tasks: RefCell<VecDeque<Box<dyn FnOnce()>>>,
}

impl ManualTaskQueue {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn pending(&self) -> usize {
		self.tasks.borrow().len()
	}

	/// Runs the oldest queued task, if any.
	pub fn run_next(&self) -> bool {
		let task = self.tasks.borrow_mut().pop_front();
		match task {
			Some(task) => {
				task();
				true
			}
			None => false,
		}
	}

	/// Runs tasks until the queue is empty, including tasks queued meanwhile. Returns how many ran.
	pub fn run_until_idle(&self) -> usize {
		let mut count = 0;
		while self.run_next() {
			count += 1;
		}
		count
	}
}

impl TaskQueue for ManualTaskQueue {
	fn queue_macrotask(&self, task: Box<dyn FnOnce()>) {
		self.tasks.borrow_mut().push_back(task);
	}
}

impl Debug for ManualTaskQueue {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ManualTaskQueue").field("pending", &self.pending()).finish()
	}
}

#[derive(Debug, Default)]
struct Recording {
	applied: Cell<usize>,
	released: Cell<usize>,
	heights: RefCell<Vec<f64>>,
}

/// A [`PaddingSurface`] that only counts.
///
/// Clones share their counters.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface(Rc<Recording>);

impl RecordingSurface {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// How many effects were created.
	#[must_use]
	pub fn applied(&self) -> usize {
		self.0.applied.get()
	}

	#[must_use]
	pub fn released(&self) -> usize {
		self.0.released.get()
	}

	#[must_use]
	pub fn active(&self) -> usize {
		self.applied() - self.released()
	}

	#[must_use]
	pub fn heights(&self) -> Vec<f64> {
		self.0.heights.borrow().clone()
	}
}

impl PaddingSurface for RecordingSurface {
	fn apply(&self, min_height_px: f64) -> Result<Box<dyn PaddingEffect>> {
		self.0.applied.set(self.0.applied.get() + 1);
		self.0.heights.borrow_mut().push(min_height_px);
		Ok(Box::new(RecordedEffect(self.0.clone())))
	}
}

struct RecordedEffect(Rc<Recording>);

impl PaddingEffect for RecordedEffect {
	fn release(self: Box<Self>) {
		self.0.released.set(self.0.released.get() + 1);
	}
}

/// A host router that behaves like common SPA routers do:
/// its "is routing" signal falls before the URL is committed.
pub struct MemoryRouter {
	interceptor: NavigationInterceptor,
	is_routing: Signal<bool>,
	route_change_start: RefCell<Option<Rc<dyn Fn()>>>,
}

impl MemoryRouter {
	#[must_use]
	pub fn new(interceptor: NavigationInterceptor) -> Self {
		Self {
			interceptor,
			is_routing: Signal::new(false),
			route_change_start: RefCell::new(None),
		}
	}

	/// Registers the route change start notification.
	pub fn on_route_change_start(&self, callback: impl Fn() + 'static) {
		*self.route_change_start.borrow_mut() = Some(Rc::new(callback));
	}

	/// Starts routing without touching the history, as a router does when it reacts to `popstate`.
	pub fn begin(&self) {
		self.is_routing.set(true);
		let callback = self.route_change_start.borrow().clone();
		if let Some(callback) = callback {
			callback()
		}
	}

	pub fn finish(&self) {
		self.is_routing.set(false);
	}
}

impl HostRouter for MemoryRouter {
	fn navigate(&self, href: &str, mode: NavigateMode) -> Result<()> {
		self.begin();
		self.finish();
		match mode {
			NavigateMode::Push => self.interceptor.push_state(href),
			NavigateMode::Replace => self.interceptor.replace_state(href),
		}
	}

	fn is_routing(&self) -> ReadSignal<bool> {
		self.is_routing.read_only()
	}
}

impl Debug for MemoryRouter {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryRouter").field("is_routing", &self.is_routing.get()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn push_truncates_forward_entries() {
		let history = MemoryHistory::new("https://shop.example/").unwrap();
		history.push_state("/a").unwrap();
		history.push_state("/b").unwrap();
		history.go(-2).unwrap();
		history.push_state("/c").unwrap();

		assert_eq!(history.len(), 2);
		assert_eq!(history.href(), "https://shop.example/c");
	}

	#[test]
	fn out_of_range_traversal_is_ignored() {
		let history = MemoryHistory::new("https://shop.example/").unwrap();
		history.go(-1).unwrap();
		assert_eq!(history.index(), 0);
	}

	#[test]
	fn tasks_run_in_order() {
		let queue = ManualTaskQueue::new();
		let order = Rc::new(RefCell::new(Vec::new()));
		for i in 0..3 {
			let order = order.clone();
			queue.queue_macrotask(Box::new(move || order.borrow_mut().push(i)));
		}
		assert_eq!(queue.run_until_idle(), 3);
		assert_eq!(*order.borrow(), vec![0, 1, 2]);
	}
}
