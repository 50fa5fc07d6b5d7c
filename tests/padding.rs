use actually_routing::{memory::RecordingSurface, Error, PaddingConfig, PaddingEffect, PaddingSurface, Result, ScrollPadding};
use std::{cell::Cell, rc::Rc};

#[test]
fn adding_and_removing_is_idempotent() {
	let surface = RecordingSurface::new();
	let padding = ScrollPadding::new(Box::new(surface.clone()), PaddingConfig::default());

	padding.add_padding();
	padding.add_padding();
	assert!(padding.is_active());
	assert_eq!(surface.applied(), 1);

	padding.remove_padding();
	padding.remove_padding();
	assert!(!padding.is_active());
	assert_eq!(surface.released(), 1);
	assert_eq!(surface.active(), 0);
}

#[test]
fn height_follows_recorded_results() {
	let surface = RecordingSurface::new();
	let padding = ScrollPadding::new(Box::new(surface.clone()), PaddingConfig::new().px_per_result(100.0).floor_px(1000.0));

	padding.add_padding();
	padding.remove_padding();
	padding.record_results_loaded(24);
	padding.add_padding();

	assert_eq!(surface.heights(), vec![1000.0, 2400.0]);
	assert_eq!(padding.results_loaded(), 24);
}

#[test]
fn dropping_removes_padding() {
	let surface = RecordingSurface::new();
	let padding = ScrollPadding::new(Box::new(surface.clone()), PaddingConfig::default());
	padding.add_padding();
	drop(padding);
	assert_eq!(surface.active(), 0);
}

struct Failing(Rc<Cell<usize>>);

impl PaddingSurface for Failing {
	fn apply(&self, _min_height_px: f64) -> Result<Box<dyn PaddingEffect>> {
		self.0.set(self.0.get() + 1);
		Err(Error::Surface("animations unsupported".to_owned()))
	}
}

#[test]
fn surface_failure_leaves_padding_inactive() {
	let attempts = Rc::new(Cell::new(0));
	let padding = ScrollPadding::new(Box::new(Failing(attempts.clone())), PaddingConfig::default());

	padding.add_padding();
	assert!(!padding.is_active());

	// Not latched: the next attempt tries again.
	padding.add_padding();
	assert_eq!(attempts.get(), 2);

	padding.remove_padding();
}
