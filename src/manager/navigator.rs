// self
use crate::_prelude::*;

/// Application routes the session logic can send the user to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
	/// Credential entry point; navigation replaces the history entry.
	Login,
	/// Main view with the map.
	Home,
}

/// Page-navigation collaborator.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Navigates to `route`.
	fn navigate(&self, route: Route);
}

/// Navigator that ignores every request; the default for headless embedders.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;
impl Navigator for NoopNavigator {
	fn navigate(&self, _route: Route) {}
}

/// Navigator that records requested routes, for tests and demos.
#[derive(Debug, Default)]
pub struct RecordingNavigator(Mutex<Vec<Route>>);
impl RecordingNavigator {
	/// Returns every route requested so far, oldest first.
	pub fn routes(&self) -> Vec<Route> {
		self.0.lock().clone()
	}

	/// Returns the most recently requested route.
	pub fn last(&self) -> Option<Route> {
		self.0.lock().last().copied()
	}
}
impl Navigator for RecordingNavigator {
	fn navigate(&self, route: Route) {
		self.0.lock().push(route);
	}
}
