//! Temporary page height inflation.
//!
//! While the outgoing listing is gone and the incoming one isn't mounted yet, the document can be much shorter than the
//! scroll position the browser is about to restore. The padding keeps it tall enough for that moment.

use crate::{config::PaddingConfig, Result};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use tracing::{instrument, trace, warn};

/// Something that can temporarily raise the document's minimum height.
///
/// The browser implementation uses a paused `Element.animate` effect, which layers above all stylesheets without
/// touching `style` or classes and is trivially reversible.
pub trait PaddingSurface {
	/// # Errors
	///
	/// Iff the effect can't be applied. [`ScrollPadding`] logs this and stays inactive.
	fn apply(&self, min_height_px: f64) -> Result<Box<dyn PaddingEffect>>;
}

pub trait PaddingEffect {
	/// Removes the effect.
	fn release(self: Box<Self>);
}

pub struct ScrollPadding {
	surface: Box<dyn PaddingSurface>,
	config: PaddingConfig,
	results_loaded: Cell<usize>,
	active: RefCell<Option<Box<dyn PaddingEffect>>>,
}

impl ScrollPadding {
	#[must_use]
	pub fn new(surface: Box<dyn PaddingSurface>, config: PaddingConfig) -> Self {
		Self {
			surface,
			config,
			results_loaded: Cell::new(0),
			active: RefCell::new(None),
		}
	}

	/// Records how many results were loaded in the listing most recently shown.
	pub fn record_results_loaded(&self, results_loaded: usize) {
		self.results_loaded.set(results_loaded);
	}

	#[must_use]
	pub fn results_loaded(&self) -> usize {
		self.results_loaded.get()
	}

	#[must_use]
	pub fn is_active(&self) -> bool {
		self.active.borrow().is_some()
	}

	/// Does nothing if padding is already applied.
	///
	/// Surface failures are logged and leave the padding inactive.
	#[instrument(skip(self))]
	pub fn add_padding(&self) {
		if self.is_active() {
			trace!("Padding already active.");
			return;
		}

		let min_height_px = self.config.min_height_px(self.results_loaded.get());
		match self.surface.apply(min_height_px) {
			Ok(effect) => {
				trace!(min_height_px, "Added padding.");
				*self.active.borrow_mut() = Some(effect);
			}
			Err(error) => warn!("Could not add padding: {}", error),
		}
	}

	/// Does nothing if no padding is applied.
	#[instrument(skip(self))]
	pub fn remove_padding(&self) {
		// The borrow must end before `release`, which may run arbitrary host code.
		let effect = self.active.borrow_mut().take();
		if let Some(effect) = effect {
			effect.release();
			trace!("Removed padding.");
		}
	}
}

impl Debug for ScrollPadding {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScrollPadding")
			.field("config", &self.config)
			.field("results_loaded", &self.results_loaded.get())
			.field("active", &self.is_active())
			.finish()
	}
}

impl Drop for ScrollPadding {
	fn drop(&mut self) {
		self.remove_padding()
	}
}
