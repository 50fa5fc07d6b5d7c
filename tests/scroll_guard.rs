use actually_routing::{
	memory::{ManualTaskQueue, MemoryHistory, RecordingSurface},
	Config, CurrentEventClassifier, EventOrigin, NavigateMode, Navigation, NavigationInterceptor, NavigationKind, NoCurrentEvent, PageKind, ScrollRestoration,
};
use std::{cell::RefCell, rc::Rc};

use harness_::Harness;

#[test]
fn same_page_popstate_is_not_padded() {
	let harness = Harness::on_search_page("a");
	let interceptor = harness.navigation.interceptor();

	interceptor.push_state("/search?q=a").unwrap();
	interceptor.push_state("/search?q=b").unwrap();
	interceptor.back().unwrap();

	assert_eq!(harness.href(), "https://shop.example/search?q=a");
	assert_eq!(harness.padding.applied(), 0);
}

#[test]
fn cross_page_popstate_pads_until_destination_is_in_dom() {
	let harness = Harness::on_search_page("shoes");
	let surface = harness.navigation.surface().clone();
	let interceptor = harness.navigation.interceptor().clone();

	interceptor.push_state("/category/123").unwrap();
	surface.set_in_dom(PageKind::Search, false);
	surface.category_listing_resolved("/category/123");
	surface.set_in_dom(PageKind::Category, true);

	// Back to search: the search page mounts asynchronously.
	surface.set_in_dom(PageKind::Category, false);
	interceptor.back().unwrap();
	assert_eq!(harness.padding.applied(), 1);
	assert_eq!(harness.padding.active(), 1);

	surface.set_in_dom(PageKind::Search, true);
	assert_eq!(harness.padding.active(), 0);

	// Forward to the category page again.

	let observed = Rc::new(RefCell::new(Vec::new()));
	let listener = interceptor.listen({
		let observed = observed.clone();
		let padding = harness.padding.clone();
		move |_| observed.borrow_mut().push(("popstate handlers ran", padding.active()))
	});

	surface.set_in_dom(PageKind::Search, false);
	interceptor.forward().unwrap();
	drop(listener);

	// Padding was added synchronously, within the popstate dispatch.
	assert_eq!(*observed.borrow(), vec![("popstate handlers ran", 1)]);
	assert_eq!(harness.padding.active(), 1);

	harness.tasks.run_until_idle();
	assert_eq!(harness.padding.active(), 1, "Padding must outlast unrelated tasks.");

	surface.set_in_dom(PageKind::Category, true);
	assert_eq!(harness.padding.active(), 0);
	assert_eq!(harness.padding.applied(), 2);
}

#[test]
fn popstate_off_surface_removes_padding() {
	let harness = Harness::new("/about");
	let interceptor = harness.navigation.interceptor();
	interceptor.push_state("/contact").unwrap();

	harness.navigation.padding().add_padding();
	interceptor.back().unwrap();
	assert_eq!(harness.padding.active(), 0);
	assert_eq!(harness.padding.applied(), 1);
}

#[test]
fn leaving_the_surface_removes_padding_when_routing_settles() {
	let harness = Harness::on_search_page("a");
	let interceptor = harness.navigation.interceptor();
	interceptor.push_state("/about").unwrap();
	interceptor.push_state("/search?q=b").unwrap();

	interceptor.go(-1).unwrap();
	assert_eq!(harness.padding.active(), 1);

	harness.router.begin();
	harness.router.finish();
	assert_eq!(harness.padding.active(), 1);
	harness.tasks.run_until_idle();
	assert_eq!(harness.padding.active(), 0);
}

#[test]
fn programmatic_route_change_pads_until_history_changes() {
	let harness = Harness::on_search_page("a");
	harness.navigation.surface().category_listing_resolved("/category/1");

	harness.router.begin();
	assert_eq!(harness.padding.active(), 1);
	harness.router.finish();
	assert_eq!(harness.padding.active(), 1);

	harness.navigation.interceptor().push_state("/category/1").unwrap();
	assert_eq!(harness.padding.active(), 0);
}

#[test]
fn popstate_confirms_a_started_route_change() {
	let harness = Harness::on_search_page("a");
	let interceptor = harness.navigation.interceptor().clone();
	interceptor.push_state("/search?q=b").unwrap();

	harness.router.begin();
	assert_eq!(harness.padding.active(), 1);
	harness.router.finish();

	// The router reacts to `popstate` from its own listener.
	let _listener = interceptor.listen({
		let router = harness.router.clone();
		move |event| {
			if event.kind == NavigationKind::Popstate {
				router.begin()
			}
		}
	});

	// The user goes back before the router commits its URL. The search page stays mounted.
	interceptor.back().unwrap();
	assert_eq!(harness.padding.active(), 0);

	harness.router.finish();
	harness.tasks.run_until_idle();
	assert!(!harness.is_actually_routing());
	assert_eq!(harness.padding.active(), 0);
	assert_eq!(harness.padding.applied(), 1);
}

#[test]
fn popstate_classifies_against_the_href_it_left_despite_early_redirects() {
	// A router listening before the navigation core that rewrites legacy URLs during `popstate`.
	let harness = Harness::mount_search(Harness::with_early_listeners("/search?q=a", |interceptor| {
		let redirecting = interceptor.clone();
		interceptor.add(move |event| {
			if event.kind == NavigationKind::Popstate && event.href.ends_with("/legacy") {
				redirecting.replace_state("/search?q=b").unwrap();
			}
		});
	}));
	let interceptor = harness.navigation.interceptor().clone();

	interceptor.push_state("/legacy").unwrap();
	interceptor.back().unwrap();
	assert_eq!(harness.padding.applied(), 1);

	interceptor.forward().unwrap();
	assert_eq!(harness.href(), "https://shop.example/search?q=b");
	assert_eq!(harness.padding.applied(), 2);

	harness.router.begin();
	harness.router.finish();
	harness.tasks.run_until_idle();
	assert_eq!(harness.padding.active(), 0);

	// From the redirected search page back to the search page: nothing to pad.
	interceptor.back().unwrap();
	assert_eq!(harness.padding.applied(), 2);
	assert_eq!(harness.padding.active(), 0);
}

#[test]
fn route_change_from_popstate_is_left_to_the_popstate_path() {
	let harness = Harness::on_search_page("a");
	let interceptor = harness.navigation.interceptor().clone();
	interceptor.push_state("/search?q=b").unwrap();

	// Like a host router reacting to popstate from its own listener.
	let _listener = interceptor.listen({
		let router = harness.router.clone();
		move |event| {
			if event.kind == NavigationKind::Popstate {
				router.begin()
			}
		}
	});
	interceptor.back().unwrap();

	assert_eq!(harness.padding.applied(), 0);
}

#[test]
fn unknown_event_origin_pads() {
	let history = Rc::new(MemoryHistory::new("https://shop.example/search").unwrap());
	let padding = RecordingSurface::new();
	let router = {
		let interceptor = NavigationInterceptor::install(history.clone()).unwrap();
		let router = Rc::new(actually_routing::memory::MemoryRouter::new(interceptor.clone()));
		let navigation = Navigation::with_interceptor(interceptor, Rc::new(ManualTaskQueue::new()), Box::new(padding.clone()), Rc::new(NoCurrentEvent), Some(router.clone()), Config::default());
		navigation.route_change_start();
		assert_eq!(padding.active(), 1);
		router
	};
	drop(router);

	// Dropping the navigation core removes its padding.
	assert_eq!(padding.active(), 0);
	assert_eq!(NoCurrentEvent.is_popstate(), EventOrigin::Unknown);
}

#[test]
fn route_change_start_without_router_is_ignored() {
	let history = Rc::new(MemoryHistory::new("https://shop.example/search").unwrap());
	let padding = RecordingSurface::new();
	let navigation = Navigation::new(
		actually_routing::Capabilities {
			history: history.clone(),
			tasks: Rc::new(ManualTaskQueue::new()),
			padding_surface: Box::new(padding.clone()),
			current_event: history,
		},
		None,
		Config::default(),
	)
	.unwrap();

	navigation.route_change_start();
	assert_eq!(padding.applied(), 0);

	navigation.navigate("/search?q=x", NavigateMode::Push).unwrap();
	assert_eq!(navigation.interceptor().href(), "https://shop.example/search?q=x");
}

#[test]
fn host_scroll_is_swallowed_while_restoring() {
	let harness = Harness::on_search_page("a");
	let interceptor = harness.navigation.interceptor().clone();
	interceptor.push_state("/search?q=b").unwrap();

	assert!(interceptor.scroll_to(0.0, 100.0));

	interceptor.back().unwrap();
	harness.router.begin();
	assert!(harness.navigation.guard().should_use_old_scroll());
	assert!(!interceptor.scroll_to(0.0, 0.0));

	harness.router.finish();
	assert!(!interceptor.scroll_to(0.0, 0.0));
	harness.tasks.run_until_idle();
	assert!(!harness.navigation.guard().should_use_old_scroll());
	assert!(interceptor.scroll_to(0.0, 200.0));

	assert_eq!(harness.history.scroll_calls(), vec![(0.0, 100.0), (0.0, 200.0)]);
}

#[test]
fn manual_scroll_restoration_is_respected() {
	let harness = Harness::on_search_page("a");
	harness.history.set_scroll_restoration(ScrollRestoration::Manual);
	let interceptor = harness.navigation.interceptor().clone();
	interceptor.push_state("/search?q=b").unwrap();

	interceptor.back().unwrap();
	assert!(harness.navigation.guard().should_use_old_scroll());
	assert!(interceptor.scroll_to(0.0, 0.0));
}

#[test]
fn off_surface_scroll_is_forwarded() {
	let harness = Harness::on_search_page("a");
	let interceptor = harness.navigation.interceptor().clone();
	interceptor.push_state("/about").unwrap();
	interceptor.push_state("/search?q=b").unwrap();
	interceptor.back().unwrap();

	assert!(interceptor.scroll_to(0.0, 0.0));
}

#[test]
fn padding_height_follows_recorded_results() {
	let harness = Harness::on_search_page("a");
	let config = Config::default().padding;
	harness.navigation.padding().record_results_loaded(40);
	harness.router.begin();

	assert_eq!(harness.padding.heights(), vec![config.min_height_px(40)]);
}
