//! Identifiers typed in by executors or returned by the backend.
//!
//! Both kinds are free-form strings on the wire. Surrounding whitespace (a common artifact of
//! form input) is trimmed; what remains must be non-empty, printable, and reasonably short.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

const MAX_CHARS: usize = 64;

/// Validation failure for [`ExecutorId`] or [`SiteId`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// Nothing but whitespace was supplied.
	#[error("{kind} identifier is blank.")]
	Blank {
		/// `"executor"` or `"site"`.
		kind: &'static str,
	},
	/// A control character (newline, tab, NUL, ...) was found.
	#[error("{kind} identifier contains a control character at byte {at}.")]
	ControlCharacter {
		/// `"executor"` or `"site"`.
		kind: &'static str,
		/// Byte offset within the trimmed value.
		at: usize,
	},
	/// The trimmed value is longer than the backend accepts.
	#[error("{kind} identifier is longer than {max} characters.")]
	TooLong {
		/// `"executor"` or `"site"`.
		kind: &'static str,
		/// Maximum accepted character count.
		max: usize,
	},
}

macro_rules! def_id {
	($(#[$meta:meta])* $name:ident => $kind:literal) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Trims and validates `value`.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				normalize($kind, value.as_ref()).map(Self)
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", stringify!($name), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

def_id! {
	/// Login identifier of a field executor (`id_ejecutor`).
	ExecutorId => "executor"
}
def_id! {
	/// Backend identifier of a registered geofence site (`id_ubicacion`).
	SiteId => "site"
}

fn normalize(kind: &'static str, raw: &str) -> Result<String, IdentifierError> {
	let value = raw.trim();

	if value.is_empty() {
		return Err(IdentifierError::Blank { kind });
	}
	if let Some((at, _)) = value.char_indices().find(|(_, c)| c.is_control()) {
		return Err(IdentifierError::ControlCharacter { kind, at });
	}
	if value.chars().count() > MAX_CHARS {
		return Err(IdentifierError::TooLong { kind, max: MAX_CHARS });
	}

	Ok(value.to_owned())
}
