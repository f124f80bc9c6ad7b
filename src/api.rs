//! Backend descriptor (configuration) and wire shapes.
//!
//! `ApiDescriptor` carries validated, HTTPS-only endpoints for the token, login, and site lookup
//! calls, the `APP-Request-Origin` header value, and the fixed service identity used for the
//! service-token exchange. `wire` holds the request bodies and response envelopes exchanged with
//! the backend.

/// Builder API for assembling descriptors.
pub mod builder;
/// Request and response shapes exchanged with the backend.
pub mod wire;

pub use builder::*;

// self
use crate::{_prelude::*, auth::Secret};

/// Header carrying the calling application's origin tag.
pub const ORIGIN_HEADER: &str = "APP-Request-Origin";
/// Origin tag sent by the field application.
pub const DEFAULT_ORIGIN: &str = "RadartaskAPP";

/// Endpoint set declared by a descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoints {
	/// Service-token endpoint (`POST /token`).
	pub token: Url,
	/// Executor login endpoint (`POST /ejecutores/login`).
	pub login: Url,
	/// Site lookup endpoint (`POST /ubicacion/byParams`).
	pub location: Url,
}

/// Fixed client identity presented to the service-token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
	/// Numeric requester identifier (`id_solicitante`).
	pub requester_id: u64,
	/// Customer key (`customer_key`).
	pub customer_key: String,
	/// Customer secret (`customer_secret`); redacted in debug output.
	pub customer_secret: Secret,
}
impl ServiceIdentity {
	/// Creates a service identity.
	pub fn new(
		requester_id: u64,
		customer_key: impl Into<String>,
		customer_secret: impl Into<String>,
	) -> Self {
		Self {
			requester_id,
			customer_key: customer_key.into(),
			customer_secret: Secret::new(customer_secret),
		}
	}
}

/// Immutable backend descriptor consumed by the token manager and the site directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescriptor {
	/// Endpoint definitions.
	pub endpoints: ApiEndpoints,
	/// Value sent in the [`ORIGIN_HEADER`] header.
	pub origin: String,
	/// Service identity used by the service-token exchange.
	pub service_identity: ServiceIdentity,
}
impl ApiDescriptor {
	/// Creates a new builder.
	pub fn builder() -> ApiDescriptorBuilder {
		ApiDescriptorBuilder::new()
	}
}
