//! Transport primitives for backend calls.
//!
//! The module exposes [`ApiHttpClient`] alongside [`ApiRequest`] and [`ApiResponse`] so
//! embedders can plug in a platform HTTP stack (or a scripted fake in tests) without the token
//! manager or the site directory knowing which client executes the exchange. Every backend call
//! in this crate is a JSON `POST` carrying the origin tag and, when available, a bearer token.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	api::{ApiDescriptor, ORIGIN_HEADER},
	auth::Secret,
	error::{ConfigError, TransportError},
};

/// Boxed future returned by [`ApiHttpClient::post_json`].
pub type HttpFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing backend calls.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared between the token
/// manager and the site directory behind an `Arc`. Non-2xx statuses are not transport errors:
/// they come back as an [`ApiResponse`] so callers can classify them.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Executes a JSON `POST` and returns the raw status and body.
	fn post_json(&self, request: ApiRequest) -> HttpFuture<'_, ApiResponse>;
}

/// Outbound JSON `POST`.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// Target endpoint.
	pub url: Url,
	/// Value for the origin header.
	pub origin: String,
	/// Optional bearer token for the `Authorization` header.
	pub bearer: Option<Secret>,
	/// JSON body.
	pub body: serde_json::Value,
}
impl ApiRequest {
	/// Builds a request for `url` using the descriptor's origin tag.
	pub fn new(
		descriptor: &ApiDescriptor,
		url: &Url,
		body: &impl Serialize,
	) -> Result<Self, ConfigError> {
		let body = serde_json::to_value(body).map_err(ConfigError::RequestBody)?;

		Ok(Self { url: url.clone(), origin: descriptor.origin.clone(), bearer: None, body })
	}

	/// Attaches a bearer token.
	pub fn with_bearer(mut self, bearer: Option<Secret>) -> Self {
		self.bearer = bearer;

		self
	}
}

/// Raw backend response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response from a status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` for `401 Unauthorized`.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}

	/// Lossy UTF-8 preview of the body, truncated for log lines and error messages.
	pub fn body_preview(&self) -> String {
		const LIMIT: usize = 256;

		let text = String::from_utf8_lossy(&self.body);

		match text.char_indices().nth(LIMIT) {
			Some((idx, _)) => format!("{}...", &text[..idx]),
			None => text.into_owned(),
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with the given overall request timeout.
	pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, ConfigError> {
		Ok(Self(ReqwestClient::builder().timeout(timeout).build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	fn post_json(&self, request: ApiRequest) -> HttpFuture<'_, ApiResponse> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client
				.post(request.url)
				.header(ORIGIN_HEADER, request.origin)
				.json(&request.body);

			if let Some(bearer) = request.bearer.as_ref() {
				builder = builder.header(AUTHORIZATION, format!("Bearer {}", bearer.expose()));
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn status_helpers_classify_responses() {
		assert!(ApiResponse::new(200, "{}").is_success());
		assert!(ApiResponse::new(204, "").is_success());
		assert!(!ApiResponse::new(401, "").is_success());
		assert!(ApiResponse::new(401, "").is_unauthorized());
		assert!(!ApiResponse::new(403, "").is_unauthorized());
	}

	#[test]
	fn body_preview_truncates_long_bodies() {
		let response = ApiResponse::new(500, "x".repeat(1_000));
		let preview = response.body_preview();

		assert_eq!(preview.len(), 259);
		assert!(preview.ends_with("..."));
		assert_eq!(ApiResponse::new(500, "short").body_preview(), "short");
	}
}
