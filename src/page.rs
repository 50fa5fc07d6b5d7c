//! Page identity: which listing surface a URL belongs to, and whether that surface is currently in the DOM.

use crate::{history::NavigationInterceptor, loggable, Signal};
use core::{
	cell::RefCell,
	fmt::{self, Display, Formatter},
};
use hashbrown::HashSet;
use tracing::{debug, trace};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
	Search,
	Category,
}

impl Display for PageKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			PageKind::Search => "search",
			PageKind::Category => "category",
		})
	}
}

/// Classifies URLs by pathname.
///
/// The search path is configured when a search page mounts.
/// Category paths are learned as category listings resolve and are never forgotten.
#[derive(Debug, Default)]
pub struct PageClassifier {
	search_path: Option<String>,
	category_paths: HashSet<String>,
}

impl PageClassifier {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_search_path(&mut self, path: impl Into<String>) {
		self.search_path = Some(path.into());
	}

	/// Returns `true` iff the path wasn't known yet.
	pub fn learn_category_path(&mut self, path: impl Into<String>) -> bool {
		self.category_paths.insert(path.into())
	}

	#[must_use]
	pub fn is_search_page(&self, url: &Url) -> bool {
		self.search_path.as_deref() == Some(url.path())
	}

	#[must_use]
	pub fn is_category_page(&self, url: &Url) -> bool {
		self.category_paths.contains(url.path())
	}

	#[must_use]
	pub fn classify(&self, url: &Url) -> Option<PageKind> {
		if self.is_search_page(url) {
			Some(PageKind::Search)
		} else if self.is_category_page(url) {
			Some(PageKind::Category)
		} else {
			None
		}
	}

	/// Like [`classify`](`PageClassifier::classify`), but unparseable hrefs aren't on any surface.
	#[must_use]
	pub fn classify_href(&self, href: &str) -> Option<PageKind> {
		match Url::parse(href) {
			Ok(url) => self.classify(&url),
			Err(error) => {
				debug!(href = loggable(href), %error, "Could not parse href for classification.");
				None
			}
		}
	}

	#[must_use]
	pub fn search_path(&self) -> Option<&str> {
		self.search_path.as_deref()
	}

	#[must_use]
	pub fn known_category_paths(&self) -> usize {
		self.category_paths.len()
	}
}

/// The page components' side of the navigation core.
///
/// Page components report their resolved paths and DOM presence here;
/// the scroll guard reads both.
#[derive(Debug, Default)]
pub struct PageSurface {
	classifier: RefCell<PageClassifier>,
	search_in_dom: Signal<bool>,
	category_in_dom: Signal<bool>,
}

impl PageSurface {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Called by the search page once it has mounted and resolved its path.
	pub fn search_page_mounted(&self, path: &str) {
		trace!(path = loggable(path), "Search page mounted.");
		self.classifier.borrow_mut().set_search_path(path);
	}

	/// Called by a category page each time it successfully resolves a listing.
	pub fn category_listing_resolved(&self, path: &str) {
		if self.classifier.borrow_mut().learn_category_path(path) {
			trace!(path = loggable(path), "Learned category path.");
		}
	}

	#[must_use]
	pub fn in_dom(&self, kind: PageKind) -> &Signal<bool> {
		match kind {
			PageKind::Search => &self.search_in_dom,
			PageKind::Category => &self.category_in_dom,
		}
	}

	pub fn set_in_dom(&self, kind: PageKind, in_dom: bool) {
		if self.in_dom(kind).set(in_dom) {
			trace!(%kind, in_dom, "Page DOM presence changed.");
		}
	}

	#[must_use]
	pub fn classify_href(&self, href: &str) -> Option<PageKind> {
		self.classifier.borrow().classify_href(href)
	}

	#[must_use]
	pub fn is_search_page(&self, url: &Url) -> bool {
		self.classifier.borrow().is_search_page(url)
	}

	#[must_use]
	pub fn is_category_page(&self, url: &Url) -> bool {
		self.classifier.borrow().is_category_page(url)
	}

	/// Classifies the current location.
	#[must_use]
	pub fn classify_now(&self, interceptor: &NavigationInterceptor) -> Option<PageKind> {
		self.classify_href(&interceptor.href())
	}

	#[must_use]
	pub fn is_search_page_now(&self, interceptor: &NavigationInterceptor) -> bool {
		self.classify_now(interceptor) == Some(PageKind::Search)
	}

	#[must_use]
	pub fn is_category_page_now(&self, interceptor: &NavigationInterceptor) -> bool {
		Url::parse(&interceptor.href()).map_or(false, |url| self.is_category_page(&url))
	}

	pub fn with_classifier<R>(&self, f: impl FnOnce(&PageClassifier) -> R) -> R {
		f(&self.classifier.borrow())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn url(href: &str) -> Url {
		Url::parse(href).unwrap()
	}

	#[test]
	fn unconfigured_classifies_nothing() {
		let classifier = PageClassifier::new();
		assert!(!classifier.is_search_page(&url("https://shop.example/search")));
		assert_eq!(classifier.classify(&url("https://shop.example/")), None);
	}

	#[test]
	fn search_path_ignores_query() {
		let mut classifier = PageClassifier::new();
		classifier.set_search_path("/search");
		assert_eq!(classifier.classify(&url("https://shop.example/search?q=shoes")), Some(PageKind::Search));
		assert_eq!(classifier.classify(&url("https://shop.example/search/more")), None);
	}

	#[test]
	fn category_paths_are_exact() {
		let mut classifier = PageClassifier::new();
		assert!(classifier.learn_category_path("/category/123"));
		assert!(!classifier.learn_category_path("/category/123"));
		assert!(classifier.is_category_page(&url("https://shop.example/category/123?sort=price")));
		assert!(!classifier.is_category_page(&url("https://shop.example/category/1234")));
	}

	#[test]
	fn bad_href_is_off_surface() {
		let surface = PageSurface::new();
		surface.search_page_mounted("/search");
		assert_eq!(surface.classify_href("not a url"), None);
	}
}
