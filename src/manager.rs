//! Bearer-token lifecycle: service-token exchange, executor login, persisted session state.
//!
//! [`TokenManager`] is the only writer of the persisted auth keys. It holds the service token in
//! memory, exchanges executor credentials for a user token, and answers "is the user logged in"
//! by decoding the stored token's expiry claim (fail-closed).
//!
//! Logout and login race on the shared store: a login response may land after the user has
//! logged out. Every logout bumps a session epoch, and a login only persists its result when the
//! epoch it started under is still current.

mod exchange;
mod navigator;

pub use navigator::*;

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	api::ApiDescriptor,
	auth::{Session, Token},
	http::ApiHttpClient,
	obs::log_event,
	store::{KeyValueStore, TokenStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Token manager specialized for the crate's default reqwest transport.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient>;

/// Owns the credential exchange, token persistence, and expiry evaluation.
pub struct TokenManager<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// HTTP client used for the token and login endpoints.
	pub http_client: Arc<C>,
	/// Backend descriptor.
	pub descriptor: ApiDescriptor,
	store: TokenStore,
	navigator: Arc<dyn Navigator>,
	service_token: Mutex<Option<Token>>,
	epoch: AtomicU64,
	persist_guard: AsyncMutex<()>,
}
impl<C> TokenManager<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a manager that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn KeyValueStore>,
		descriptor: ApiDescriptor,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			descriptor,
			store: TokenStore::new(store),
			navigator: Arc::new(NoopNavigator),
			service_token: Mutex::new(None),
			epoch: AtomicU64::new(0),
			persist_guard: AsyncMutex::new(()),
		}
	}

	/// Sets the navigation collaborator notified on logout.
	pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
		self.navigator = navigator;

		self
	}

	/// Returns a read handle on the persisted auth state for read-only consumers.
	pub fn token_store(&self) -> TokenStore {
		self.store.clone()
	}

	/// Returns the navigation collaborator.
	pub fn navigator(&self) -> &Arc<dyn Navigator> {
		&self.navigator
	}

	/// Returns `true` iff a stored token exists and its expiry lies strictly after `now`.
	pub async fn is_logged_in_at(&self, now: OffsetDateTime) -> bool {
		match self.store.load_token().await {
			Ok(Some(token)) => token.is_usable_at(now),
			Ok(None) => false,
			Err(e) => {
				log_event!(warn, "Reading the stored token failed; treating as logged out: {e}");

				false
			},
		}
	}

	/// Returns `true` iff a stored token exists and has not expired.
	pub async fn is_logged_in(&self) -> bool {
		self.is_logged_in_at(OffsetDateTime::now_utc()).await
	}

	/// Returns the persisted session; absent fields read as empty strings. Never fails.
	pub async fn get_session(&self) -> Session {
		self.store.load_session().await.unwrap_or_else(|e| {
			log_event!(warn, "Reading the stored session failed: {e}");

			Session::default()
		})
	}

	/// Clears every persisted auth key and routes the user to the login entry point.
	///
	/// Idempotent. Any login still in flight is invalidated and will not persist its result.
	pub async fn logout(&self) {
		let persist = self.persist_guard.lock().await;

		self.epoch.fetch_add(1, Ordering::SeqCst);

		if let Err(e) = self.store.clear().await {
			log_event!(warn, "Clearing stored auth state failed: {e}");
		}

		drop(persist);
		log_event!(info, "User logged out.");
		self.navigator.navigate(Route::Login);
	}

	fn current_epoch(&self) -> u64 {
		self.epoch.load(Ordering::SeqCst)
	}
}
#[cfg(feature = "reqwest")]
impl TokenManager<ReqwestHttpClient> {
	/// Creates a manager that provisions its own reqwest-backed transport.
	pub fn new(store: Arc<dyn KeyValueStore>, descriptor: ApiDescriptor) -> Self {
		Self::with_http_client(store, descriptor, ReqwestHttpClient::default())
	}
}
impl<C> Debug for TokenManager<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("descriptor", &self.descriptor)
			.field("service_token_set", &self.service_token.lock().is_some())
			.field("epoch", &self.current_epoch())
			.finish()
	}
}
