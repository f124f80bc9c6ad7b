//! Claims decoding for signed bearer tokens.

// crates.io
use base64::{
	Engine, alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde::{Deserializer, de::Error as _};
// self
use crate::_prelude::*;

// Backends emit the claims segment both with and without `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
	&alphabet::URL_SAFE,
	GeneralPurposeConfig::new()
		.with_encode_padding(false)
		.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Subset of token claims the session logic relies on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	/// Expiry as seconds since the Unix epoch; fractional values are floored.
	#[serde(default, deserialize_with = "floored_seconds")]
	pub exp: Option<i64>,
}
impl Claims {
	/// Decodes the middle segment of `raw` as URL-safe base64 JSON.
	///
	/// Returns `None` when the segment is missing, is not valid base64, or is not a JSON object.
	pub fn decode(raw: &str) -> Option<Self> {
		let segment = raw.split('.').nth(1).filter(|segment| !segment.is_empty())?;
		let bytes = URL_SAFE_LENIENT.decode(segment).ok()?;

		serde_json::from_slice(&bytes).ok()
	}

	/// Returns the expiry instant, if the claim is present and representable.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.exp.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
	}
}

fn floored_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
	D: Deserializer<'de>,
{
	let Some(raw) = Option::<serde_json::Number>::deserialize(deserializer)? else {
		return Ok(None);
	};

	if let Some(secs) = raw.as_i64() {
		return Ok(Some(secs));
	}

	match raw.as_f64().map(f64::floor) {
		Some(secs) if secs.is_finite() && (i64::MIN as f64..i64::MAX as f64).contains(&secs) =>
			Ok(Some(secs as i64)),
		_ => Err(D::Error::custom(format!("`exp` {raw} is not a representable timestamp"))),
	}
}
