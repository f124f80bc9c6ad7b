//! Key/value persistence contracts, built-in backends, and the auth-state wrapper.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Session, Token},
	obs::log_event,
};

/// Key holding the user bearer token; its absence means "logged out".
pub const USER_TOKEN_KEY: &str = "userToken";
/// Key holding the backend user identifier.
pub const USER_ID_KEY: &str = "userId";
/// Key holding the user display name.
pub const USER_NAME_KEY: &str = "userName";

// Restore and clear touch the token before the session fields.
const AUTH_KEYS: [&str; 3] = [USER_TOKEN_KEY, USER_ID_KEY, USER_NAME_KEY];

/// Boxed future returned by [`KeyValueStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// String key/value backend, the platform storage the auth state lives in.
pub trait KeyValueStore
where
	Self: Send + Sync,
{
	/// Fetches the value stored under `key`, if present.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores or replaces the value under `key`.
	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

	/// Removes `key`; removing an absent key succeeds.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`KeyValueStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Auth-state view over a [`KeyValueStore`] using the fixed persisted keys.
///
/// The token manager is the only writer; the site directory and the session gate read through
/// their own clones.
#[derive(Clone)]
pub struct TokenStore {
	backend: Arc<dyn KeyValueStore>,
}
impl TokenStore {
	/// Wraps the provided backend.
	pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
		Self { backend }
	}

	/// Loads the persisted user token, if any.
	pub async fn load_token(&self) -> Result<Option<Token>, StoreError> {
		Ok(self.backend.get(USER_TOKEN_KEY).await?.map(Token::new))
	}

	/// Loads the persisted session, defaulting absent fields to empty strings.
	pub async fn load_session(&self) -> Result<Session, StoreError> {
		let user_id = self.backend.get(USER_ID_KEY).await?.unwrap_or_default();
		let user_name = self.backend.get(USER_NAME_KEY).await?.unwrap_or_default();

		Ok(Session { user_id, user_name })
	}

	/// Persists the token and session fields, overwriting prior values.
	///
	/// All three keys change or none do: when a write fails, the previous values are restored
	/// before the error is returned. The token is written last so a reader never sees a new token
	/// paired with a stale session.
	pub async fn save_login(&self, token: &Token, session: &Session) -> Result<(), StoreError> {
		let mut previous = Vec::with_capacity(AUTH_KEYS.len());

		for key in AUTH_KEYS {
			previous.push((key, self.backend.get(key).await?));
		}

		let writes = [
			(USER_ID_KEY, session.user_id.clone()),
			(USER_NAME_KEY, session.user_name.clone()),
			(USER_TOKEN_KEY, token.secret().expose().to_owned()),
		];

		for (key, value) in writes {
			if let Err(e) = self.backend.set(key, value).await {
				self.restore(previous).await;

				return Err(e);
			}
		}

		Ok(())
	}

	/// Removes every persisted auth key. Idempotent.
	///
	/// Every key is attempted even when an earlier removal fails; the first failure is returned.
	pub async fn clear(&self) -> Result<(), StoreError> {
		let mut first_error = None;

		for key in AUTH_KEYS {
			if let Err(e) = self.backend.remove(key).await {
				log_event!(warn, "Removing {key} failed: {e}");

				first_error.get_or_insert(e);
			}
		}

		first_error.map_or(Ok(()), Err)
	}

	async fn restore(&self, previous: Vec<(&'static str, Option<String>)>) {
		for (key, value) in previous {
			let restored = match value {
				Some(value) => self.backend.set(key, value).await,
				None => self.backend.remove(key).await,
			};

			if let Err(e) = restored {
				log_event!(warn, "Restoring {key} after a failed login write failed: {e}");
			}
		}
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenStore(..)")
	}
}
