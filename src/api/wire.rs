//! Request bodies and response envelopes exchanged with the backend.
//!
//! Every response is wrapped in `{ "data": ... }`. Parsing goes through `serde_path_to_error`
//! so structural failures report the offending path (`data.token`, `data[0].latitud`, ...)
//! instead of a bare serde message.

// crates.io
use serde::{Deserializer, de::DeserializeOwned, de::Error as _};
// self
use crate::_prelude::*;

/// Structured parse failure naming the offending JSON path.
pub type WireError = serde_path_to_error::Error<serde_json::Error>;

/// Body of the service-token exchange.
#[derive(Clone, Debug, Serialize)]
pub struct ServiceTokenRequest<'a> {
	/// Numeric requester identifier.
	pub id_solicitante: u64,
	/// Customer secret.
	pub customer_secret: &'a str,
	/// Customer key.
	pub customer_key: &'a str,
}

/// Body of the executor login call.
#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest<'a> {
	/// Executor identifier.
	pub id_ejecutor: &'a str,
	/// Executor password.
	pub password: &'a str,
}

/// Body of the site lookup call.
#[derive(Clone, Debug, Serialize)]
pub struct SiteQuery<'a> {
	/// Requested site identifiers.
	pub id_ubicacion: Vec<&'a str>,
}

/// `{ "data": T }` response envelope.
#[derive(Clone, Debug, Deserialize)]
pub struct Envelope<T> {
	/// Payload.
	pub data: T,
}

/// Payload of the service-token response.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenData {
	/// Service bearer token.
	pub token: String,
}

/// Payload of the login response.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginData {
	/// User bearer token.
	pub token: String,
	/// Backend user identifier; numeric or string on the wire.
	#[serde(default, deserialize_with = "opt_string_or_number")]
	pub id: Option<String>,
	/// Display name.
	#[serde(default)]
	pub name: Option<String>,
}

/// One site record from the lookup response.
#[derive(Clone, Debug, Deserialize)]
pub struct SiteRecord {
	/// Site identifier, when echoed back by the backend.
	#[serde(default, deserialize_with = "opt_string_or_number")]
	pub id_ubicacion: Option<String>,
	/// Latitude in degrees; number or numeric string on the wire.
	#[serde(deserialize_with = "float_or_numeric_string")]
	pub latitud: f64,
	/// Longitude in degrees; number or numeric string on the wire.
	#[serde(deserialize_with = "float_or_numeric_string")]
	pub longitud: f64,
	/// Human-readable site label.
	#[serde(default)]
	pub descripcion: Option<String>,
}

/// Parses a `{ "data": T }` envelope and returns the payload.
pub fn parse_envelope<T>(body: &[u8]) -> Result<T, WireError>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);
	let envelope: Envelope<T> = serde_path_to_error::deserialize(&mut de)?;

	Ok(envelope.data)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
	String(String),
	Number(serde_json::Number),
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(|raw| match raw {
		StringOrNumber::String(value) => value,
		StringOrNumber::Number(value) => value.to_string(),
	}))
}

fn float_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
	D: Deserializer<'de>,
{
	match StringOrNumber::deserialize(deserializer)? {
		StringOrNumber::Number(value) =>
			value.as_f64().ok_or_else(|| D::Error::custom("coordinate is not representable")),
		StringOrNumber::String(value) => value
			.trim()
			.parse::<f64>()
			.map_err(|e| D::Error::custom(format!("coordinate `{value}` is not numeric: {e}"))),
	}
}
