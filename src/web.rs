//! Browser implementations of the host capabilities.
//!
//! [`WebHistory::install`] patches `history.pushState`, `history.replaceState` and `window.scrollTo` in place.
//! The patches stay for the page's lifetime, and there can only be one set of them per page.
//! They are created through `Function` constructors, so a Content Security Policy without `'unsafe-eval'` prevents installation.

use crate::{
	config::Config,
	guard::{CurrentEventClassifier, EventOrigin},
	history::{HistoryBackend, HistoryCall, InterceptHooks, ScrollRestoration},
	navigation::{Capabilities, Navigation},
	padding::{PaddingEffect, PaddingSurface},
	router::HostRouter,
	Error, Result, TaskQueue,
};
use core::cell::Cell;
use gloo_timers::callback::Timeout;
use js_sys::{Array, Function, Object, Reflect};
use std::rc::Rc;
use tracing::{debug, instrument, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Element, History, Window};

thread_local! {
	static INSTALLED: Cell<bool> = Cell::new(false);
}

fn window() -> Result<Window> {
	web_sys::window().ok_or_else(|| Error::Js("no global `window`".to_owned()))
}

fn method(target: &JsValue, name: &str) -> Result<Function> {
	Reflect::get(target, &JsValue::from_str(name))?
		.dyn_into::<Function>()
		.map_err(|value| Error::Js(format!("`{}` is not a function: {:?}", name, value)))
}

fn call_method(target: &JsValue, name: &str, args: &Array) -> Result<JsValue> {
	Ok(method(target, name)?.apply(target, args)?)
}

/// The page's `window.history`.
#[derive(Debug, Clone)]
pub struct WebHistory {
	window: Window,
	history: History,
	/// `window.scrollTo` as it was before interception.
	original_scroll_to: Function,
}

impl WebHistory {
	/// # Errors
	///
	/// Iff there is no `window.history` or `window.scrollTo`.
	pub fn new() -> Result<Self> {
		let window = window()?;
		let history = window.history()?;
		let original_scroll_to = method(&window, "scrollTo")?;
		Ok(Self {
			window,
			history,
			original_scroll_to,
		})
	}

	fn patched(target: &JsValue, name: &str, factory_body: &str, hook: &JsValue) -> Result<JsValue> {
		let original = method(target, name)?;
		let factory = Function::new_with_args("original, hook", factory_body);
		Ok(factory.call2(&JsValue::NULL, &original, hook)?)
	}

	fn replace(target: &JsValue, name: &str, patched: &JsValue) -> Result<()> {
		if !Reflect::set(target, &JsValue::from_str(name), patched)? {
			return Err(Error::Js(format!("could not replace `{}`", name)));
		}
		debug!("Patched `{}`.", name);
		Ok(())
	}
}

/// Runs `install` unless `installed` is set, and sets it iff `install` succeeded.
fn install_once(installed: &Cell<bool>, install: impl FnOnce() -> Result<()>) -> Result<()> {
	if installed.get() {
		return Err(Error::AlreadyInstalled);
	}
	install()?;
	installed.set(true);
	Ok(())
}

const AFTER_CALL: &str = "return function () { var result = original.apply(this, arguments); hook(); return result; };";
const GATED_CALL: &str = "return function () { if (hook()) { return original.apply(this, arguments); } };";

impl HistoryBackend for WebHistory {
	fn href(&self) -> String {
		self.window.location().href().unwrap_or_default()
	}

	fn push_state(&self, url: &str) -> Result<()> {
		// Through the (patched) property, so that the change is reported.
		call_method(&self.history, "pushState", &Array::of3(&JsValue::NULL, &JsValue::from_str(""), &JsValue::from_str(url)))?;
		Ok(())
	}

	fn replace_state(&self, url: &str) -> Result<()> {
		call_method(&self.history, "replaceState", &Array::of3(&JsValue::NULL, &JsValue::from_str(""), &JsValue::from_str(url)))?;
		Ok(())
	}

	fn go(&self, delta: i32) -> Result<()> {
		Ok(self.history.go_with_delta(delta)?)
	}

	fn scroll_restoration(&self) -> ScrollRestoration {
		match self.history.scroll_restoration() {
			Ok(web_sys::ScrollRestoration::Manual) => ScrollRestoration::Manual,
			_ => ScrollRestoration::Auto,
		}
	}

	fn scroll_to(&self, x: f64, y: f64) {
		if let Err(error) = self.original_scroll_to.call2(&self.window, &JsValue::from_f64(x), &JsValue::from_f64(y)) {
			warn!("`scrollTo` threw: {:?}", error);
		}
	}

	/// All patches are prepared before the first function is replaced.
	/// A failure while preparing leaves the page untouched, and installation may be retried.
	#[instrument(skip_all)]
	fn install(&self, hooks: InterceptHooks) -> Result<()> {
		INSTALLED.with(|installed| {
			install_once(installed, || {
				let history: &JsValue = &self.history;
				let window: &JsValue = &self.window;
				let mut staged = Vec::with_capacity(3);

				// Hooks handed to JavaScript live as long as the patched functions reference them.
				for (name, call) in [("pushState", HistoryCall::PushState), ("replaceState", HistoryCall::ReplaceState)].iter().copied() {
					let hooks = hooks.clone();
					let hook = Closure::wrap(Box::new(move || hooks.history_call(call)) as Box<dyn Fn()>).into_js_value();
					staged.push((history, name, Self::patched(history, name, AFTER_CALL, &hook)?));
				}
				{
					let hooks = hooks.clone();
					let hook = Closure::wrap(Box::new(move || hooks.allow_scroll()) as Box<dyn Fn() -> bool>).into_js_value();
					staged.push((window, "scrollTo", Self::patched(window, "scrollTo", GATED_CALL, &hook)?));
				}
				let popstate = Closure::wrap(Box::new(move |_: web_sys::Event| hooks.popstate()) as Box<dyn Fn(web_sys::Event)>).into_js_value();

				for (target, name, patched) in &staged {
					Self::replace(target, name, patched)?;
				}
				self.window.add_event_listener_with_callback("popstate", popstate.unchecked_ref())?;
				Ok(())
			})
		})
	}
}

/// Queues macrotasks with zero-delay `setTimeout`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutQueue;

impl TaskQueue for TimeoutQueue {
	fn queue_macrotask(&self, task: Box<dyn FnOnce()>) {
		let _id = Timeout::new(0, task).forget();
	}
}

/// Pads an element (by default the document element) with a paused `min-height` animation.
#[derive(Debug, Clone)]
pub struct AnimatedPadding {
	element: Element,
}

impl AnimatedPadding {
	#[must_use]
	pub fn new(element: Element) -> Self {
		Self { element }
	}

	/// # Errors
	///
	/// Iff there is no document element.
	pub fn for_document_element() -> Result<Self> {
		let element = window()?
			.document()
			.and_then(|document| document.document_element())
			.ok_or_else(|| Error::Js("no document element".to_owned()))?;
		Ok(Self::new(element))
	}
}

impl PaddingSurface for AnimatedPadding {
	fn apply(&self, min_height_px: f64) -> Result<Box<dyn PaddingEffect>> {
		let keyframe = Object::new();
		Reflect::set(&keyframe, &JsValue::from_str("minHeight"), &JsValue::from_str(&format!("{}px", min_height_px)))?;
		let keyframes = Array::of2(&keyframe, &keyframe);

		// Paused at its start, a one-millisecond effect applies indefinitely. Playing it lets it finish and vanish.
		let options = Object::new();
		Reflect::set(&options, &JsValue::from_str("duration"), &JsValue::from_f64(1.0))?;

		let animation = call_method(&self.element, "animate", &Array::of2(&keyframes, &options)).map_err(|error| Error::Surface(error.to_string()))?;
		call_method(&animation, "pause", &Array::new()).map_err(|error| Error::Surface(error.to_string()))?;
		Ok(Box::new(PausedAnimation(animation)))
	}
}

struct PausedAnimation(JsValue);

impl PaddingEffect for PausedAnimation {
	fn release(self: Box<Self>) {
		if let Err(error) = call_method(&self.0, "play", &Array::new()) {
			warn!("Could not release padding animation: {}", error);
		}
	}
}

/// Classifies `window.event`.
#[derive(Debug, Clone)]
pub struct WindowEventClassifier {
	window: Window,
}

impl WindowEventClassifier {
	/// # Errors
	///
	/// Iff there is no `window`.
	pub fn new() -> Result<Self> {
		Ok(Self { window: window()? })
	}
}

impl CurrentEventClassifier for WindowEventClassifier {
	fn is_popstate(&self) -> EventOrigin {
		let key = JsValue::from_str("event");
		match Reflect::has(&self.window, &key) {
			Ok(true) => (),
			_ => return EventOrigin::Unknown,
		}
		let event = match Reflect::get(&self.window, &key) {
			Ok(event) => event,
			Err(_) => return EventOrigin::Unknown,
		};
		if event.is_undefined() || event.is_null() {
			return EventOrigin::Programmatic;
		}
		match Reflect::get(&event, &JsValue::from_str("type")).ok().and_then(|kind| kind.as_string()) {
			Some(kind) if kind == "popstate" => EventOrigin::Popstate,
			Some(_) => EventOrigin::Programmatic,
			None => EventOrigin::Unknown,
		}
	}
}

/// Assembles the navigation core for the current page.
///
/// # Errors
///
/// Iff a browser API is missing or interception was already installed.
pub fn navigation(router: Option<Rc<dyn HostRouter>>, config: Config) -> Result<Navigation> {
	Navigation::new(
		Capabilities {
			history: Rc::new(WebHistory::new()?),
			tasks: Rc::new(TimeoutQueue),
			padding_surface: Box::new(AnimatedPadding::for_document_element()?),
			current_event: Rc::new(WindowEventClassifier::new()?),
		},
		router,
		config,
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use wasm_bindgen_test::wasm_bindgen_test;

	#[wasm_bindgen_test]
	fn failed_installation_can_be_retried() {
		let installed = Cell::new(false);

		let failed = install_once(&installed, || Err(Error::Js("`pushState` is not a function".to_owned())));
		assert_eq!(failed, Err(Error::Js("`pushState` is not a function".to_owned())));
		assert!(!installed.get());

		assert_eq!(install_once(&installed, || Ok(())), Ok(()));
		assert_eq!(install_once(&installed, || Ok(())), Err(Error::AlreadyInstalled));
	}
}
