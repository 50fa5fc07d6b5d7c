#![doc(html_root_url = "https://docs.rs/actually-routing/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Tells when a single-page navigation has *actually* finished, and keeps scroll restoration intact meanwhile.
//!
//! See the README for an overview. The pieces, leaves first:
//!
//! - [`NavigationInterceptor`]: reports `pushState`, `replaceState` and `popstate`.
//! - [`RoutingTracker`]: reconciles those with the host router's "is routing" signal.
//! - [`ScrollGuard`] and [`ScrollPadding`]: pad the page during back/forward navigation.
//! - [`PageSurface`]: which URLs are search or category pages, and whether those are in the DOM.
//! - [`InstanceRegistry`]: refcounted engine instances per state key.
//!
//! [`Navigation`] assembles the first four from host [`Capabilities`].

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod callback_set;
mod config;
mod error;
pub mod guard;
pub mod history;
pub mod memory;
mod navigation;
pub mod padding;
pub mod page;
mod rc_hash_map;
pub mod registry;
pub mod router;
pub mod routing;
pub mod signal;
mod task;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use callback_set::HandlerId;
pub use config::{Config, PaddingConfig};
pub use error::{Error, Result};
pub use guard::{CurrentEventClassifier, EventOrigin, NoCurrentEvent, ScrollGuard};
pub use history::{HistoryBackend, Listener, NavigationEvent, NavigationInterceptor, NavigationKind, ScrollRestoration};
pub use navigation::{Capabilities, Navigation};
pub use padding::{PaddingEffect, PaddingSurface, ScrollPadding};
pub use page::{PageClassifier, PageKind, PageSurface};
pub use registry::{Disposer, EngineKind, EngineSettings, InstanceRegistry, Lease, SharedSettings};
pub use router::{HostRouter, NavigateMode};
pub use routing::{RoutingPhase, RoutingTracker};
pub use signal::{ReadSignal, Scope, Signal, Subscription};
pub use task::TaskQueue;

/// hrefs can contain search queries, so they are only logged with the `dangerous-logging` feature.
pub(crate) fn loggable(href: &str) -> &str {
	if cfg!(feature = "dangerous-logging") {
		href
	} else {
		"<href>"
	}
}
