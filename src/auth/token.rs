//! Bearer tokens and the lifecycle status derived from their embedded claims.

pub mod claims;

// self
use crate::{
	_prelude::*,
	auth::{Claims, Secret},
};

/// Lifecycle status of a bearer token at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// The expiry claim lies strictly in the future.
	Active,
	/// The expiry claim is at or before the evaluated instant.
	Expired,
	/// No expiry could be decoded; treated exactly like [`TokenStatus::Expired`].
	Malformed,
}

/// Opaque bearer token plus lazily decoded claims.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
	secret: Secret,
}
impl Token {
	/// Wraps a raw bearer string.
	pub fn new(raw: impl Into<String>) -> Self {
		Self { secret: Secret::new(raw) }
	}

	/// Returns the redacting wrapper around the raw bearer string.
	pub fn secret(&self) -> &Secret {
		&self.secret
	}

	/// Decodes the claims segment, returning `None` on any decode failure.
	pub fn claims(&self) -> Option<Claims> {
		Claims::decode(self.secret.expose())
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		match self.claims().and_then(|claims| claims.expires_at()) {
			Some(expiry) if expiry > instant => TokenStatus::Active,
			Some(_) => TokenStatus::Expired,
			None => TokenStatus::Malformed,
		}
	}

	/// Returns `true` only for [`TokenStatus::Active`] at the provided instant.
	pub fn is_usable_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Active)
	}

	/// Convenience helper that checks usability against the current UTC instant.
	pub fn is_usable(&self) -> bool {
		self.is_usable_at(OffsetDateTime::now_utc())
	}
}
impl From<Secret> for Token {
	fn from(secret: Secret) -> Self {
		Self { secret }
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token").field("secret", &"<redacted>").finish()
	}
}

/// Fail-closed expiry check: any decode failure reads as expired.
pub fn is_token_expired(raw: &str, now: OffsetDateTime) -> bool {
	!Token::new(raw).is_usable_at(now)
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::_preludet::{bearer_with_claims, bearer_with_exp};

	#[test]
	fn status_follows_expiry_claim() {
		let now = macros::datetime!(2025-06-01 12:00 UTC);
		let exp = now.unix_timestamp();

		assert_eq!(Token::new(bearer_with_exp(exp + 60)).status_at(now), TokenStatus::Active);
		assert_eq!(Token::new(bearer_with_exp(exp - 60)).status_at(now), TokenStatus::Expired);
		assert_eq!(Token::new(bearer_with_exp(exp)).status_at(now), TokenStatus::Expired);
	}

	#[test]
	fn undecodable_tokens_are_expired() {
		let now = macros::datetime!(2025-06-01 12:00 UTC);

		for raw in ["", "opaque", "a.%%%.c", "a.bm90LWpzb24.c"] {
			assert_eq!(Token::new(raw).status_at(now), TokenStatus::Malformed, "raw = {raw:?}");
			assert!(is_token_expired(raw, now));
		}

		let no_exp = bearer_with_claims("{\"sub\":\"executor\"}");

		assert!(is_token_expired(&no_exp, now));
	}

	#[test]
	fn debug_output_redacts_bearer() {
		let token = Token::new("header.payload.signature");

		assert!(!format!("{token:?}").contains("payload"));
	}
}
