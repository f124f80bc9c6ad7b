// self
use crate::{
	_prelude::*,
	api::{ApiDescriptor, ApiEndpoints, DEFAULT_ORIGIN, ServiceIdentity},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ApiDescriptorError {
	/// An endpoint was not configured.
	#[error("Missing {endpoint} endpoint.")]
	MissingEndpoint {
		/// Which endpoint is missing.
		endpoint: &'static str,
	},
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// A base URL could not be joined with an endpoint path.
	#[error("Cannot derive the {endpoint} endpoint from {base}.")]
	InvalidBase {
		/// Which endpoint could not be derived.
		endpoint: &'static str,
		/// Base URL that was supplied.
		base: String,
	},
	/// The origin tag is empty or not a valid header value.
	#[error("Origin tag must be non-empty visible ASCII.")]
	InvalidOrigin,
	/// No service identity was configured.
	#[error("Missing service identity.")]
	MissingServiceIdentity,
}

/// Builder for [`ApiDescriptor`] values.
#[derive(Debug, Default)]
pub struct ApiDescriptorBuilder {
	/// Service-token endpoint.
	pub token_endpoint: Option<Url>,
	/// Executor login endpoint.
	pub login_endpoint: Option<Url>,
	/// Site lookup endpoint.
	pub location_endpoint: Option<Url>,
	/// Origin tag override; defaults to [`DEFAULT_ORIGIN`].
	pub origin: Option<String>,
	/// Service identity for the service-token exchange.
	pub service_identity: Option<ServiceIdentity>,
}
impl ApiDescriptorBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Derives all three endpoints from a base URL such as `https://host/apid/`.
	///
	/// A missing trailing slash is added so the last path segment is kept.
	pub fn base_url(self, base: &Url) -> Result<Self, ApiDescriptorError> {
		let mut base = base.clone();

		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		let join = |endpoint: &'static str, path: &str| {
			base.join(path)
				.map_err(|_| ApiDescriptorError::InvalidBase { endpoint, base: base.to_string() })
		};
		let token = join("token", "token")?;
		let login = join("login", "ejecutores/login")?;
		let location = join("location", "ubicacion/byParams")?;

		Ok(self.token_endpoint(token).login_endpoint(login).location_endpoint(location))
	}

	/// Sets the service-token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the login endpoint.
	pub fn login_endpoint(mut self, url: Url) -> Self {
		self.login_endpoint = Some(url);

		self
	}

	/// Sets the site lookup endpoint.
	pub fn location_endpoint(mut self, url: Url) -> Self {
		self.location_endpoint = Some(url);

		self
	}

	/// Overrides the origin tag.
	pub fn origin(mut self, origin: impl Into<String>) -> Self {
		self.origin = Some(origin.into());

		self
	}

	/// Sets the service identity.
	pub fn service_identity(mut self, identity: ServiceIdentity) -> Self {
		self.service_identity = Some(identity);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ApiDescriptor, ApiDescriptorError> {
		let token = self
			.token_endpoint
			.ok_or(ApiDescriptorError::MissingEndpoint { endpoint: "token" })?;
		let login = self
			.login_endpoint
			.ok_or(ApiDescriptorError::MissingEndpoint { endpoint: "login" })?;
		let location = self
			.location_endpoint
			.ok_or(ApiDescriptorError::MissingEndpoint { endpoint: "location" })?;
		let service_identity =
			self.service_identity.ok_or(ApiDescriptorError::MissingServiceIdentity)?;
		let descriptor = ApiDescriptor {
			endpoints: ApiEndpoints { token, login, location },
			origin: self.origin.unwrap_or_else(|| DEFAULT_ORIGIN.into()),
			service_identity,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ApiDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ApiDescriptorError> {
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("login", &self.endpoints.login)?;
		validate_endpoint("location", &self.endpoints.location)?;
		validate_origin(&self.origin)
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ApiDescriptorError> {
	if url.scheme() != "https" {
		Err(ApiDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

fn validate_origin(origin: &str) -> Result<(), ApiDescriptorError> {
	if origin.is_empty() || !origin.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
		Err(ApiDescriptorError::InvalidOrigin)
	} else {
		Ok(())
	}
}
