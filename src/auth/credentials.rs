//! Executor credentials and the persisted session identity.

// self
use crate::{
	_prelude::*,
	auth::{ExecutorId, Secret},
	error::AuthError,
};

/// Executor login credentials. Transient; never persisted.
#[derive(Clone, Debug)]
pub struct Credentials {
	/// Executor identifier entered on the login form.
	pub executor_id: ExecutorId,
	password: Secret,
}
impl Credentials {
	/// Validates both fields; a blank identifier or password is rejected before any network call.
	pub fn new(
		executor_id: impl AsRef<str>,
		password: impl Into<String>,
	) -> Result<Self, AuthError> {
		let executor_id =
			ExecutorId::new(executor_id).map_err(|_| AuthError::InvalidCredentials)?;
		let password = Secret::new(password);

		if password.is_empty() {
			return Err(AuthError::InvalidCredentials);
		}

		Ok(Self { executor_id, password })
	}

	/// Returns the password. Callers must avoid logging it.
	pub fn password(&self) -> &Secret {
		&self.password
	}
}

/// Identity of the logged-in executor as persisted next to the bearer token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	/// Backend user identifier; empty when no session is stored.
	pub user_id: String,
	/// Display name; empty when no session is stored.
	pub user_name: String,
}
impl Session {
	/// Creates a session from the identity returned by the login endpoint.
	pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
		Self { user_id: user_id.into(), user_name: user_name.into() }
	}

	/// Returns `true` when neither field carries a value.
	pub fn is_empty(&self) -> bool {
		self.user_id.is_empty() && self.user_name.is_empty()
	}
}
