use crate::{ReadSignal, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigateMode {
	Push,
	Replace,
}

/// The host framework's router, as far as the navigation core is concerned.
///
/// Any framework that can navigate imperatively and expose whether it is currently routing can be adapted.
pub trait HostRouter {
	/// # Errors
	///
	/// Iff the router can't start the navigation, for example because `href` is invalid.
	fn navigate(&self, href: &str, mode: NavigateMode) -> Result<()>;

	/// Becomes `true` when the router starts a navigation and `false` when it considers it done.
	fn is_routing(&self) -> ReadSignal<bool>;
}
