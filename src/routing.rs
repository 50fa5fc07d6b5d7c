//! The Routing-In-Flight Tracker.
//!
//! Host routers report "done" too early, and not in the same way for every kind of navigation:
//!
//! - After `popstate`, the URL is already updated when the event fires, so no further history change can confirm completion.
//!   The tracker waits for the host router's "is routing" signal to fall instead.
//! - After a programmatic push/replace, the router's signal falls before the URL is committed.
//!   The tracker waits for the history change instead.
//!
//! In both cases, the final transition to [`RoutingPhase::Idle`] happens one macrotask later.

use crate::{
	history::{NavigationEvent, NavigationInterceptor, NavigationKind},
	Listener, ReadSignal, Signal, Subscription, TaskQueue,
};
use core::{
	cell::Cell,
	fmt::{self, Debug, Formatter},
};
use std::rc::{Rc, Weak};
use tracing::{instrument, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingPhase {
	Idle,
	PopstateOccurred,
	IsRoutingAfterPopstate,
	IsRoutingAfterPushOrReplace,
}

impl Default for RoutingPhase {
	fn default() -> Self {
		Self::Idle
	}
}

struct State {
	phase: Cell<RoutingPhase>,
	/// Bumped whenever a navigation starts, so that stale deferred idle transitions can be told apart.
	epoch: Cell<u64>,
	is_actually_routing: Signal<bool>,
	tasks: Rc<dyn TaskQueue>,
}

impl State {
	fn transition(&self, phase: RoutingPhase) {
		let previous = self.phase.replace(phase);
		if previous != phase {
			trace!(?previous, ?phase, "Routing phase transition.");
		}
	}

	fn start(&self, phase: RoutingPhase) {
		self.epoch.set(self.epoch.get().wrapping_add(1));
		self.transition(phase);
		self.is_actually_routing.set(true);
	}

	fn on_navigation(this: &Rc<Self>, event: &NavigationEvent) {
		match event.kind {
			NavigationKind::Popstate => this.start(RoutingPhase::PopstateOccurred),
			NavigationKind::PushState | NavigationKind::ReplaceState => {
				if this.phase.get() == RoutingPhase::IsRoutingAfterPushOrReplace {
					Self::schedule_idle(this)
				}
			}
		}
	}

	fn on_host_routing(this: &Rc<Self>, is_routing: bool) {
		if is_routing {
			let next = match this.phase.get() {
				RoutingPhase::PopstateOccurred => RoutingPhase::IsRoutingAfterPopstate,
				_ => RoutingPhase::IsRoutingAfterPushOrReplace,
			};
			// The host signal only notifies on change, so this is always a new navigation.
			this.start(next);
		} else if this.phase.get() == RoutingPhase::IsRoutingAfterPopstate {
			Self::schedule_idle(this)
		}
	}

	fn schedule_idle(this: &Rc<Self>) {
		let epoch = this.epoch.get();
		let weak: Weak<Self> = Rc::downgrade(this);
		trace!(epoch, "Scheduling idle transition.");
		this.tasks.queue_macrotask(Box::new(move || {
			if let Some(this) = weak.upgrade() {
				if this.epoch.get() != epoch {
					trace!(epoch, current = this.epoch.get(), "Dropped stale idle transition.");
					return;
				}
				this.transition(RoutingPhase::Idle);
				this.is_actually_routing.set(false);
			}
		}));
	}
}

/// Reconciles [`NavigationInterceptor`] events with a host router's "is routing" signal.
///
/// Dropping the tracker disconnects it; its [`is_actually_routing`](`RoutingTracker::is_actually_routing`) signal then keeps its last value.
pub struct RoutingTracker {
	state: Rc<State>,
	_listener: Listener,
	_host: Subscription,
}

impl RoutingTracker {
	#[instrument(skip(interceptor, host_is_routing, tasks))]
	pub fn new(interceptor: &NavigationInterceptor, host_is_routing: &ReadSignal<bool>, tasks: Rc<dyn TaskQueue>) -> Self {
		let state = Rc::new(State {
			phase: Cell::new(RoutingPhase::Idle),
			epoch: Cell::new(0),
			is_actually_routing: Signal::new(false),
			tasks,
		});

		let listener = interceptor.listen({
			let state = Rc::downgrade(&state);
			move |event| {
				if let Some(state) = state.upgrade() {
					State::on_navigation(&state, event)
				}
			}
		});

		let host = host_is_routing.watch({
			let state = Rc::downgrade(&state);
			move |&is_routing| {
				if let Some(state) = state.upgrade() {
					State::on_host_routing(&state, is_routing)
				}
			}
		});

		Self {
			state,
			_listener: listener,
			_host: host,
		}
	}

	#[must_use]
	pub fn phase(&self) -> RoutingPhase {
		self.state.phase.get()
	}

	#[must_use]
	pub fn is_actually_routing(&self) -> ReadSignal<bool> {
		self.state.is_actually_routing.read_only()
	}
}

impl Debug for RoutingTracker {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RoutingTracker")
			.field("phase", &self.state.phase.get())
			.field("is_actually_routing", &self.state.is_actually_routing.get())
			.finish()
	}
}
