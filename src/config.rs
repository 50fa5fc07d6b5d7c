/// Tuning for [`ScrollPadding`](`crate::ScrollPadding`).
///
/// The defaults were tuned against desktop browsers with a product grid. Other layouts should re-derive them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaddingConfig {
	px_per_result: f64,
	floor_px: f64,
}

impl PaddingConfig {
	#[must_use]
	pub const fn new() -> Self {
		Self {
			px_per_result: 150.0,
			floor_px: 1500.0,
		}
	}

	/// Height to reserve per previously loaded result.
	#[must_use]
	pub const fn px_per_result(self, px_per_result: f64) -> Self {
		Self { px_per_result, ..self }
	}

	/// Minimum padded height, used while few or no results were recorded.
	#[must_use]
	pub const fn floor_px(self, floor_px: f64) -> Self {
		Self { floor_px, ..self }
	}

	#[must_use]
	pub fn min_height_px(&self, results_loaded: usize) -> f64 {
		#[allow(clippy::cast_precision_loss)]
		let by_results = results_loaded as f64 * self.px_per_result;
		by_results.max(self.floor_px)
	}
}

impl Default for PaddingConfig {
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Config {
	pub padding: PaddingConfig,
}

impl Config {
	#[must_use]
	pub const fn new() -> Self {
		Self { padding: PaddingConfig::new() }
	}

	#[must_use]
	pub const fn padding(self, padding: PaddingConfig) -> Self {
		Self { padding }
	}
}
