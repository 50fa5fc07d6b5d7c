use crate::{
	config::Config,
	guard::{CurrentEventClassifier, ScrollGuard},
	history::{HistoryBackend, NavigationInterceptor},
	padding::{PaddingSurface, ScrollPadding},
	page::PageSurface,
	routing::RoutingTracker,
	router::{HostRouter, NavigateMode},
	ReadSignal, Result, Signal, TaskQueue,
};
use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use tracing::{debug, instrument};

/// The host capabilities the navigation core is built on.
pub struct Capabilities {
	pub history: Rc<dyn HistoryBackend>,
	pub tasks: Rc<dyn TaskQueue>,
	pub padding_surface: Box<dyn PaddingSurface>,
	pub current_event: Rc<dyn CurrentEventClassifier>,
}

impl Debug for Capabilities {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Capabilities").finish_non_exhaustive()
	}
}

/// The assembled navigation core of one page.
///
/// Construct it once at application start and hand out references.
pub struct Navigation {
	// Dropped first, so that it never observes a half-torn-down tracker.
	guard: ScrollGuard,
	tracker: RoutingTracker,
	surface: Rc<PageSurface>,
	interceptor: NavigationInterceptor,
	router: Option<Rc<dyn HostRouter>>,
}

impl Navigation {
	/// Installs history interception and wires up the tracker and scroll guard.
	///
	/// Without a `router`, the tracker only reacts to history events and route change starts are ignored.
	///
	/// # Errors
	///
	/// Iff interception is already installed on this page.
	#[instrument(skip_all)]
	pub fn new(capabilities: Capabilities, router: Option<Rc<dyn HostRouter>>, config: Config) -> Result<Self> {
		let Capabilities {
			history,
			tasks,
			padding_surface,
			current_event,
		} = capabilities;

		let interceptor = NavigationInterceptor::install(history)?;
		Ok(Self::with_interceptor(interceptor, tasks, padding_surface, current_event, router, config))
	}

	/// Like [`new`](`Navigation::new`), for when the interceptor had to exist first (usually because the router needs it).
	#[must_use]
	pub fn with_interceptor(
		interceptor: NavigationInterceptor,
		tasks: Rc<dyn TaskQueue>,
		padding_surface: Box<dyn PaddingSurface>,
		current_event: Rc<dyn CurrentEventClassifier>,
		router: Option<Rc<dyn HostRouter>>,
		config: Config,
	) -> Self {
		let host_is_routing = match &router {
			Some(router) => router.is_routing(),
			None => {
				debug!("No host router; route change starts will be ignored.");
				Signal::new(false).read_only()
			}
		};

		// The tracker must subscribe before the guard.
		let tracker = RoutingTracker::new(&interceptor, &host_is_routing, tasks);
		let surface = Rc::new(PageSurface::new());
		let padding = Rc::new(ScrollPadding::new(padding_surface, config.padding));
		let guard = ScrollGuard::new(&interceptor, &tracker, surface.clone(), padding, current_event);

		Self {
			guard,
			tracker,
			surface,
			interceptor,
			router,
		}
	}

	#[must_use]
	pub fn interceptor(&self) -> &NavigationInterceptor {
		&self.interceptor
	}

	#[must_use]
	pub fn tracker(&self) -> &RoutingTracker {
		&self.tracker
	}

	#[must_use]
	pub fn surface(&self) -> &Rc<PageSurface> {
		&self.surface
	}

	#[must_use]
	pub fn guard(&self) -> &ScrollGuard {
		&self.guard
	}

	#[must_use]
	pub fn padding(&self) -> &Rc<ScrollPadding> {
		self.guard.padding()
	}

	#[must_use]
	pub fn is_actually_routing(&self) -> ReadSignal<bool> {
		self.tracker.is_actually_routing()
	}

	/// Forwards the host router's route change start notification to the scroll guard.
	pub fn route_change_start(&self) {
		if self.router.is_none() {
			debug!("Ignored route change start without a host router.");
			return;
		}
		self.guard.route_change_start()
	}

	/// Navigates through the host router, or directly through the history if there is none.
	///
	/// # Errors
	///
	/// Whatever [`HostRouter::navigate`] or [`NavigationInterceptor::push_state`]/[`replace_state`](`NavigationInterceptor::replace_state`) return.
	pub fn navigate(&self, href: &str, mode: NavigateMode) -> Result<()> {
		match (&self.router, mode) {
			(Some(router), mode) => router.navigate(href, mode),
			(None, NavigateMode::Push) => self.interceptor.push_state(href),
			(None, NavigateMode::Replace) => self.interceptor.replace_state(href),
		}
	}
}

impl Debug for Navigation {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Navigation")
			.field("interceptor", &self.interceptor)
			.field("tracker", &self.tracker)
			.field("guard", &self.guard)
			.field("router", &self.router.is_some())
			.finish()
	}
}
