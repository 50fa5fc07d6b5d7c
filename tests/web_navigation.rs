#![cfg(target_arch = "wasm32")]

use actually_routing::{
	memory::MemoryRouter,
	web::{AnimatedPadding, TimeoutQueue, WebHistory, WindowEventClassifier},
	Config, Error, EventOrigin, CurrentEventClassifier, NavigateMode, Navigation, NavigationInterceptor, PaddingConfig, ScrollPadding,
};
use gloo_timers::future::TimeoutFuture;
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

static mut LOG_INITIALIZED: bool = false;

fn init_logging() {
	unsafe {
		if !LOG_INITIALIZED {
			tracing_wasm::set_as_global_default();
			LOG_INITIALIZED = true;
		}
	}
}

// Interception can only be installed once per page, so everything that needs it lives in this one test.
#[wasm_bindgen_test]
async fn history_interception() {
	init_logging();

	let interceptor = NavigationInterceptor::install(Rc::new(WebHistory::new().unwrap())).unwrap();
	let hrefs = Rc::new(RefCell::new(Vec::<String>::new()));
	interceptor.add({
		let hrefs = hrefs.clone();
		move |event| hrefs.borrow_mut().push(event.href.clone())
	});

	let router = Rc::new(MemoryRouter::new(interceptor.clone()));
	let navigation = Navigation::with_interceptor(
		interceptor.clone(),
		Rc::new(TimeoutQueue),
		Box::new(AnimatedPadding::for_document_element().unwrap()),
		Rc::new(WindowEventClassifier::new().unwrap()),
		Some(router.clone()),
		Config::default(),
	);

	router.navigate("?web-test=router", NavigateMode::Push).unwrap();
	assert!(navigation.is_actually_routing().get());
	TimeoutFuture::new(20).await;
	assert!(!navigation.is_actually_routing().get());

	// Calls that bypass this crate are reported as well.
	window()
		.unwrap()
		.history()
		.unwrap()
		.push_state_with_url(&JsValue::NULL, "", Some("?web-test=direct"))
		.unwrap();
	assert!(hrefs.borrow().last().unwrap().ends_with("?web-test=direct"));
	assert_eq!(hrefs.borrow().len(), 2);

	// Outside of any event handler.
	assert_ne!(WindowEventClassifier::new().unwrap().is_popstate(), EventOrigin::Popstate);

	let gate = interceptor.set_scroll_gate(|| false);
	assert!(!interceptor.scroll_to(0.0, 0.0));
	drop(gate);
	assert!(interceptor.scroll_to(0.0, 0.0));

	assert!(matches!(
		NavigationInterceptor::install(Rc::new(WebHistory::new().unwrap())),
		Err(Error::AlreadyInstalled)
	));
}

#[wasm_bindgen_test]
async fn animated_padding_holds_until_released() {
	init_logging();

	let document = window().unwrap().document().unwrap();
	let element = document.create_element("div").unwrap();
	document.body().unwrap().append_child(&element).unwrap();

	let padding = ScrollPadding::new(Box::new(AnimatedPadding::new(element.clone())), PaddingConfig::new().floor_px(4321.0));
	padding.add_padding();
	assert!(padding.is_active());
	assert!(element.dyn_ref::<HtmlElement>().unwrap().offset_height() >= 4321);

	padding.remove_padding();
	TimeoutFuture::new(50).await;
	assert!(element.dyn_ref::<HtmlElement>().unwrap().offset_height() < 4321);
}

#[wasm_bindgen_test]
async fn timeout_queue_runs_later() {
	init_logging();

	use actually_routing::TaskQueue;
	let ran = Rc::new(RefCell::new(false));
	TimeoutQueue.queue_macrotask(Box::new({
		let ran = ran.clone();
		move || *ran.borrow_mut() = true
	}));
	assert!(!*ran.borrow());
	TimeoutFuture::new(10).await;
	assert!(*ran.borrow());
}
