use crate::registry::EngineKind;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// An instance was requested before the provider created the default entry for its kind.
	#[error("no default {kind} instance: the provider has not been initialized")]
	ProviderNotInitialized { kind: EngineKind },

	/// History interception was requested a second time for the same page.
	#[error("navigation interception is already installed on this page")]
	AlreadyInstalled,

	/// A reference count would have overflowed or dropped below zero.
	#[error("reference count saturated")]
	CountSaturated,

	/// A URL passed to a history operation couldn't be resolved against the current location.
	#[error("invalid URL {url:?}: {reason}")]
	InvalidUrl { url: String, reason: String },

	/// The padding surface could not apply its effect.
	#[error("padding surface failed: {0}")]
	Surface(String),

	/// A browser API call threw.
	#[error("JavaScript error: {0}")]
	Js(String),
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for Error {
	fn from(value: wasm_bindgen::JsValue) -> Self {
		Self::Js(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
	}
}
