//! Optional observability helpers for network operations and the geofence monitor.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to emit structured spans named `sitewatch.op` with the `op`
//!   and `stage` fields, plus the crate's log events.
//! - Enable `metrics` to increment the `sitewatch_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`, and the
//!   `sitewatch_geofence_transition_total` counter labeled by `direction`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Emits a log event at the given `tracing` level; compiles to a no-op without the feature.
///
/// Only plain format strings are accepted so the disabled build can still type-check them.
macro_rules! log_event {
	($level:ident, $($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		{
			::tracing::$level!($($arg)+);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = format_args!($($arg)+);
		}
	}};
}
pub(crate) use log_event;

/// Operation kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Service-token exchange.
	ServiceToken,
	/// Executor login.
	Login,
	/// Site lookup.
	FetchSites,
	/// Position watch start.
	Watch,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::ServiceToken => "service_token",
			OpKind::Login => "login",
			OpKind::FetchSites => "fetch_sites",
			OpKind::Watch => "watch",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}

	/// Maps a result onto [`OpOutcome::Success`] or [`OpOutcome::Failure`].
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { OpOutcome::Success } else { OpOutcome::Failure }
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
