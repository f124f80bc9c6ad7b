//! Entry-point routing and the login submission flow.
//!
//! [`SessionGate`] turns token validity into a routing decision and runs the two-step
//! credential exchange behind a single-flight guard.

// self
use crate::{
	_prelude::*,
	auth::{Credentials, Session},
	error::AuthError,
	http::ApiHttpClient,
	manager::{Route, TokenManager},
	obs::log_event,
};

/// Outcome of [`SessionGate::entry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryDecision {
	/// A usable token is stored; the main view was requested.
	Proceed,
	/// The user must log in.
	RequireLogin,
}

/// Outcome of [`SessionGate::on_back_navigation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackAction {
	/// Leave the application instead of backing into the login screen.
	ExitApp,
	/// Let the platform's default back navigation happen.
	Default,
}

/// Login-required decisions and the credential submission flow.
pub struct SessionGate<C>
where
	C: ?Sized + ApiHttpClient,
{
	manager: Arc<TokenManager<C>>,
	submission: AsyncMutex<()>,
}
impl<C> SessionGate<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a gate over `manager`.
	pub fn new(manager: Arc<TokenManager<C>>) -> Self {
		Self { manager, submission: AsyncMutex::new(()) }
	}

	/// Returns the wrapped manager.
	pub fn manager(&self) -> &Arc<TokenManager<C>> {
		&self.manager
	}

	/// Decides whether the entry point may proceed; on [`EntryDecision::Proceed`] the navigator is
	/// sent to [`Route::Home`].
	pub async fn entry(&self) -> EntryDecision {
		if self.manager.is_logged_in().await {
			self.manager.navigator().navigate(Route::Home);

			EntryDecision::Proceed
		} else {
			EntryDecision::RequireLogin
		}
	}

	/// Exits when authenticated, otherwise defers to the default behavior.
	pub async fn on_back_navigation(&self) -> BackAction {
		if self.manager.is_logged_in().await { BackAction::ExitApp } else { BackAction::Default }
	}

	/// Returns `true` while a submission is pending.
	pub fn is_submitting(&self) -> bool {
		self.submission.try_lock().is_none()
	}

	/// Acquires a service token, then logs in with `credentials`.
	///
	/// Login is never attempted when the first step fails, and that failure always surfaces as
	/// [`AuthError::TokenUnavailable`]. Login failures surface unchanged. A submission made while
	/// another is pending is rejected with [`AuthError::SubmissionInFlight`]. On success the
	/// navigator is sent to [`Route::Home`].
	pub async fn submit(&self, credentials: &Credentials) -> Result<Session> {
		let Some(_submission) = self.submission.try_lock() else {
			log_event!(debug, "Rejecting credential submission while another is pending.");

			return Err(AuthError::SubmissionInFlight.into());
		};

		self.manager.acquire_service_token().await.map_err(|e| match e {
			Error::Auth(AuthError::TokenUnavailable { .. }) => e,
			other => AuthError::token_unavailable(other.to_string()).into(),
		})?;

		let session = self.manager.login(credentials).await?;

		self.manager.navigator().navigate(Route::Home);

		Ok(session)
	}
}
impl<C> Debug for SessionGate<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionGate")
			.field("manager", &self.manager)
			.field("submitting", &self.is_submitting())
			.finish()
	}
}
