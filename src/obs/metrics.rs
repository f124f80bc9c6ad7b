// self
use crate::obs::{OpKind, OpOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"sitewatch_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a geofence boundary crossing (when enabled).
pub fn record_geofence_transition(entered: bool) {
	#[cfg(feature = "metrics")]
	{
		let direction = if entered { "enter" } else { "exit" };

		metrics::counter!("sitewatch_geofence_transition_total", "direction" => direction)
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = entered;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_are_callable_without_a_global_recorder() {
		record_op_outcome(OpKind::FetchSites, OpOutcome::Failure);
		record_geofence_transition(true);
	}
}
