//! Session-gated geofence monitoring: bearer-token lifecycle, site lookup, and live
//! inside/outside tracking of a mobile user against a registered site.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod directory;
pub mod error;
pub mod gate;
pub mod geo;
pub mod http;
pub mod manager;
pub mod obs;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::{
		api::{ApiDescriptor, ServiceIdentity},
		http::ReqwestHttpClient,
		manager::{RecordingNavigator, TokenManager},
		store::{KeyValueStore, MemoryStore},
	};

	/// Token manager type alias used by reqwest-backed integration tests.
	pub type ReqwestTestManager = TokenManager<ReqwestHttpClient>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a descriptor whose endpoints live under `base_url` (typically an `httpmock`
	/// server URL).
	pub fn test_descriptor(base_url: &str) -> ApiDescriptor {
		let base = Url::parse(base_url).expect("Failed to parse mock server base URL.");

		ApiDescriptor::builder()
			.base_url(&base)
			.expect("Mock server base URL should accept relative endpoints.")
			.service_identity(ServiceIdentity::new(3, "11223344", "test"))
			.build()
			.expect("Mock descriptor should build successfully.")
	}

	/// Constructs a [`TokenManager`] backed by an in-memory store, a recording navigator, and
	/// the reqwest transport used across integration tests.
	pub fn build_reqwest_test_manager(
		descriptor: ApiDescriptor,
	) -> (Arc<ReqwestTestManager>, Arc<MemoryStore>, Arc<RecordingNavigator>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn KeyValueStore> = store_backend.clone();
		let navigator = Arc::new(RecordingNavigator::default());
		let manager = TokenManager::with_http_client(store, descriptor, test_reqwest_http_client())
			.with_navigator(navigator.clone());

		(Arc::new(manager), store_backend, navigator)
	}

	/// Builds an unsigned bearer token whose claims segment carries `exp`.
	pub fn bearer_with_exp(exp: i64) -> String {
		bearer_with_claims(&format!("{{\"exp\":{exp},\"sub\":\"executor\"}}"))
	}

	/// Builds an unsigned bearer token whose claims segment encodes `claims` verbatim.
	pub fn bearer_with_claims(claims: &str) -> String {
		let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\",\"typ\":\"JWT\"}");
		let payload = URL_SAFE_NO_PAD.encode(claims.as_bytes());

		format!("{header}.{payload}.signature")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
