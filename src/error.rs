//! Crate-level error taxonomy shared by the token manager, site directory, and monitor.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token acquisition, login, or session failure.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Geofence site lookup failure.
	#[error(transparent)]
	Location(#[from] LocationError),
	/// Position watch failure.
	#[error(transparent)]
	Geofence(#[from] GeofenceError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Failures raised by the credential exchange and session handling.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// The service token could not be obtained, or is not held when login is attempted.
	#[error("Service token is unavailable: {reason}.")]
	TokenUnavailable {
		/// Human-readable cause.
		reason: String,
	},
	/// The backend rejected the executor credentials (or the executor is inactive).
	#[error("Invalid credentials or inactive user.")]
	InvalidCredentials,
	/// Any other transport or response failure during login.
	#[error("Authentication service is unavailable: {message}.")]
	ServiceUnavailable {
		/// Human-readable cause.
		message: String,
		/// HTTP status code, when a response was received.
		status: Option<u16>,
	},
	/// A credential submission is already pending.
	#[error("A credential submission is already in flight.")]
	SubmissionInFlight,
	/// The session was logged out while this login was in flight; its result was discarded.
	#[error("Login response arrived after the session was reset and was discarded.")]
	Superseded,
}
impl AuthError {
	pub(crate) fn token_unavailable(reason: impl Into<String>) -> Self {
		Self::TokenUnavailable { reason: reason.into() }
	}

	pub(crate) fn service_unavailable(message: impl Into<String>, status: Option<u16>) -> Self {
		Self::ServiceUnavailable { message: message.into(), status }
	}
}

/// Failures raised while fetching geofence sites.
#[derive(Debug, ThisError)]
pub enum LocationError {
	/// The backend returned zero site records.
	#[error("No site records were returned for {ids:?}.")]
	NotFound {
		/// Identifiers that were requested.
		ids: Vec<String>,
	},
	/// Any transport, status, or response-shape failure.
	#[error("Site lookup failed: {message}.")]
	TransportFailure {
		/// Human-readable cause.
		message: String,
		/// HTTP status code, when a response was received.
		status: Option<u16>,
	},
}
impl LocationError {
	pub(crate) fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
		Self::TransportFailure { message: message.into(), status }
	}
}

/// Failures raised while starting the position watch.
#[derive(Debug, ThisError)]
pub enum GeofenceError {
	/// Location permission was denied by the platform or the user.
	#[error("Location permission was denied.")]
	PermissionDenied,
	/// The platform could not start (or report) the position watch.
	#[error("Position watch failed: {message}.")]
	WatchFailure {
		/// Human-readable cause.
		message: String,
	},
	/// The monitoring session has already been stopped and cannot be restarted.
	#[error("Monitoring session has ended; create a new monitor.")]
	SessionEnded,
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// API descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::api::ApiDescriptorError),
	/// A request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO) reported by [`ApiHttpClient`](crate::http::ApiHttpClient)
/// implementations.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
