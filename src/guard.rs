//! The Scroll Padding Guard's triggering policy and scroll interception.

use crate::{
	history::{NavigationEvent, NavigationInterceptor, NavigationKind, ScrollRestoration},
	loggable,
	page::{PageKind, PageSurface},
	padding::ScrollPadding,
	routing::RoutingTracker,
	ReadSignal, Scope, Subscription,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use std::rc::{Rc, Weak};
use tracing::{debug, instrument, trace};

/// Where the event currently being dispatched (if any) came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventOrigin {
	Popstate,
	Programmatic,
	/// The platform can't tell. Treated like [`Programmatic`](`EventOrigin::Programmatic`).
	Unknown,
}

/// Tells whether a host router's route change was started from within a `popstate` handler.
///
/// In browsers this relies on the deprecated `window.event`, which may disappear at any time.
/// Implementations must return [`EventOrigin::Unknown`] rather than guess.
pub trait CurrentEventClassifier {
	fn is_popstate(&self) -> EventOrigin;
}

/// For hosts that can't introspect the current event at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCurrentEvent;

impl CurrentEventClassifier for NoCurrentEvent {
	fn is_popstate(&self) -> EventOrigin {
		EventOrigin::Unknown
	}
}

struct Shared {
	interceptor: NavigationInterceptor,
	surface: Rc<PageSurface>,
	padding: Rc<ScrollPadding>,
	is_actually_routing: ReadSignal<bool>,
	should_use_old_scroll: Cell<bool>,
	awaiting_history_change: Cell<bool>,
	pending: RefCell<Option<Subscription>>,
}

impl Shared {
	fn on_navigation(this: &Rc<Self>, event: &NavigationEvent) {
		// Any history change confirms a started route change, including `popstate`.
		// The `popstate` policy below re-adds padding if the traversal needs it.
		if this.awaiting_history_change.replace(false) {
			trace!(kind = ?event.kind, "History change confirmed route change.");
			this.padding.remove_padding();
		}

		if event.kind == NavigationKind::Popstate {
			Self::on_popstate(this, &event.previous_href, &event.href)
		}
	}

	fn on_popstate(this: &Rc<Self>, previous: &str, href: &str) {
		let from = this.surface.classify_href(previous);
		let to = this.surface.classify_href(href);
		trace!(from = loggable(previous), to = loggable(href), ?from, ?to, "Classified popstate.");

		// A newer navigation supersedes whatever the last one was waiting for.
		let superseded = this.pending.borrow_mut().take();
		drop(superseded);

		let to = match (from, to) {
			(None, None) => {
				this.padding.remove_padding();
				return;
			}
			(Some(from), Some(to)) if from == to && this.surface.in_dom(to).get() => {
				debug!(page = %to, "Same page popstate with mounted content; not padding.");
				this.should_use_old_scroll.set(true);
				return;
			}
			(_, to) => to,
		};

		// Must happen synchronously: the browser computes the restored scroll position right after this handler.
		this.padding.add_padding();

		let weak = Rc::downgrade(this);
		let pending = match to {
			Some(kind) => {
				this.should_use_old_scroll.set(true);
				this.surface.in_dom(kind).when(|in_dom| *in_dom, move || Self::release(&weak, kind))
			}
			None => {
				let fired = Cell::new(false);
				this.is_actually_routing.subscribe(move |is_routing| {
					if !*is_routing && !fired.replace(true) {
						if let Some(this) = weak.upgrade() {
							trace!("Left the listing surface.");
							this.padding.remove_padding();
						}
					}
				})
			}
		};
		*this.pending.borrow_mut() = Some(pending);
	}

	fn release(this: &Weak<Self>, kind: PageKind) {
		if let Some(this) = this.upgrade() {
			trace!(page = %kind, "Destination page is in the DOM.");
			this.padding.remove_padding();
		}
	}

	fn allow_scroll(&self) -> bool {
		!(self.should_use_old_scroll.get()
			&& self.surface.classify_now(&self.interceptor).is_some()
			&& self.interceptor.scroll_restoration() != ScrollRestoration::Manual)
	}
}

/// Adds scroll padding around navigations that would otherwise truncate scroll restoration,
/// and swallows host router scroll calls while the browser's own restoration is in charge.
///
/// Dropping the guard removes its handlers, its scroll gate and any pending waits.
pub struct ScrollGuard {
	_scope: Scope,
	shared: Rc<Shared>,
	current_event: Rc<dyn CurrentEventClassifier>,
}

impl ScrollGuard {
	/// `tracker` must have been created on the same `interceptor`, before this guard,
	/// so that it sees each navigation event first.
	#[instrument(skip_all)]
	pub fn new(
		interceptor: &NavigationInterceptor,
		tracker: &RoutingTracker,
		surface: Rc<PageSurface>,
		padding: Rc<ScrollPadding>,
		current_event: Rc<dyn CurrentEventClassifier>,
	) -> Self {
		let shared = Rc::new(Shared {
			interceptor: interceptor.clone(),
			surface,
			padding,
			is_actually_routing: tracker.is_actually_routing(),
			should_use_old_scroll: Cell::new(false),
			awaiting_history_change: Cell::new(false),
			pending: RefCell::new(None),
		});

		let scope = Scope::new();
		{
			let weak = Rc::downgrade(&shared);
			let listener = interceptor.listen(move |event| {
				if let Some(shared) = weak.upgrade() {
					Shared::on_navigation(&shared, event)
				}
			});
			scope.on_cleanup(move || drop(listener));
		}
		{
			let weak = Rc::downgrade(&shared);
			scope.hold(interceptor.set_scroll_gate(move || weak.upgrade().map_or(true, |shared| shared.allow_scroll())));
		}
		{
			let weak = Rc::downgrade(&shared);
			scope.hold(shared.is_actually_routing.subscribe(move |is_routing| {
				if !*is_routing {
					if let Some(shared) = weak.upgrade() {
						if shared.should_use_old_scroll.replace(false) {
							trace!("Navigation settled; programmatic scrolling allowed again.");
						}
					}
				}
			}));
		}

		Self {
			_scope: scope,
			shared,
			current_event,
		}
	}

	/// To be called from the host router's route change start notification.
	///
	/// Route changes triggered by `popstate` are handled by the `popstate` path already and are ignored here.
	#[instrument(skip(self))]
	pub fn route_change_start(&self) {
		match self.current_event.is_popstate() {
			EventOrigin::Popstate => {
				trace!("Route change started from popstate.");
				return;
			}
			EventOrigin::Unknown => debug!("Could not classify the current event; assuming a programmatic route change."),
			EventOrigin::Programmatic => (),
		}

		self.shared.padding.add_padding();
		self.shared.awaiting_history_change.set(true);
	}

	#[must_use]
	pub fn padding(&self) -> &Rc<ScrollPadding> {
		&self.shared.padding
	}

	#[must_use]
	pub fn should_use_old_scroll(&self) -> bool {
		self.shared.should_use_old_scroll.get()
	}
}

impl Debug for ScrollGuard {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScrollGuard")
			.field("padding", &self.shared.padding)
			.field("should_use_old_scroll", &self.shared.should_use_old_scroll.get())
			.field("awaiting_history_change", &self.shared.awaiting_history_change.get())
			.finish()
	}
}
