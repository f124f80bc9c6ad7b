//! Map rendering seam.
//!
//! The monitor never creates a marker twice: the surface hands back a [`MarkerId`] when a marker
//! is created and every later update goes through that handle.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	geo::{Coordinate, GeofenceState},
};

/// Handle to a marker owned by a [`RenderSurface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

/// What a marker represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkerKind {
	/// The user's live position.
	Position,
	/// The registered site.
	Site,
}

/// Drawing surface the monitor renders into.
///
/// Calls arrive while the monitor holds its state lock, so implementations must not call back
/// into the monitor.
pub trait RenderSurface
where
	Self: Send + Sync,
{
	/// Centers the viewport on `at`.
	fn center_on(&self, at: Coordinate);

	/// Creates the position marker.
	fn set_position(&self, at: Coordinate) -> MarkerId;

	/// Creates the site marker labeled with `label`.
	fn set_site_marker(&self, at: Coordinate, label: &str) -> MarkerId;

	/// Moves an existing marker.
	fn move_marker(&self, marker: MarkerId, at: Coordinate);

	/// Removes an existing marker.
	fn remove_marker(&self, marker: MarkerId);

	/// Displays the latest geofence state.
	fn set_geofence_state(&self, state: GeofenceState);

	/// Resets any state display.
	fn clear(&self);
}

/// Everything a [`RecordingSurface`] was asked to do, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderEvent {
	/// [`RenderSurface::center_on`].
	Centered(Coordinate),
	/// A marker was created.
	MarkerCreated {
		/// Handle returned to the caller.
		id: MarkerId,
		/// Marker role.
		kind: MarkerKind,
		/// Initial location.
		at: Coordinate,
	},
	/// [`RenderSurface::move_marker`].
	MarkerMoved {
		/// Moved marker.
		id: MarkerId,
		/// New location.
		at: Coordinate,
	},
	/// [`RenderSurface::remove_marker`].
	MarkerRemoved(MarkerId),
	/// [`RenderSurface::set_geofence_state`].
	State(GeofenceState),
	/// [`RenderSurface::clear`].
	Cleared,
}

/// Headless [`RenderSurface`] that records every call.
///
/// Useful for tests and for running the monitor without a map (e.g. a background reporter).
#[derive(Debug, Default)]
pub struct RecordingSurface {
	events: Mutex<Vec<RenderEvent>>,
	markers: Mutex<BTreeMap<MarkerId, (MarkerKind, Coordinate, String)>>,
	next_id: AtomicU64,
}
impl RecordingSurface {
	/// Returns a copy of the recorded events.
	pub fn events(&self) -> Vec<RenderEvent> {
		self.events.lock().clone()
	}

	/// Returns the markers currently on the surface.
	pub fn markers(&self) -> Vec<(MarkerId, MarkerKind, Coordinate)> {
		self.markers.lock().iter().map(|(id, (kind, at, _))| (*id, *kind, *at)).collect()
	}

	/// Number of markers of `kind` ever created.
	pub fn created(&self, kind: MarkerKind) -> usize {
		let events = self.events.lock();

		events
			.iter()
			.filter(|e| matches!(e, RenderEvent::MarkerCreated { kind: k, .. } if *k == kind))
			.count()
	}

	/// Label attached to the site marker, if one is present.
	pub fn site_label(&self) -> Option<String> {
		self.markers
			.lock()
			.values()
			.find(|(kind, ..)| *kind == MarkerKind::Site)
			.map(|(_, _, label)| label.clone())
	}

	/// Most recent state passed to [`RenderSurface::set_geofence_state`].
	pub fn last_state(&self) -> Option<GeofenceState> {
		self.events.lock().iter().rev().find_map(|event| match event {
			RenderEvent::State(state) => Some(*state),
			_ => None,
		})
	}

	fn create(&self, kind: MarkerKind, at: Coordinate, label: &str) -> MarkerId {
		let id = MarkerId(self.next_id.fetch_add(1, Ordering::SeqCst));

		self.markers.lock().insert(id, (kind, at, label.to_owned()));
		self.events.lock().push(RenderEvent::MarkerCreated { id, kind, at });

		id
	}
}
impl RenderSurface for RecordingSurface {
	fn center_on(&self, at: Coordinate) {
		self.events.lock().push(RenderEvent::Centered(at));
	}

	fn set_position(&self, at: Coordinate) -> MarkerId {
		self.create(MarkerKind::Position, at, "")
	}

	fn set_site_marker(&self, at: Coordinate, label: &str) -> MarkerId {
		self.create(MarkerKind::Site, at, label)
	}

	fn move_marker(&self, marker: MarkerId, at: Coordinate) {
		if let Some(entry) = self.markers.lock().get_mut(&marker) {
			entry.1 = at;
		}

		self.events.lock().push(RenderEvent::MarkerMoved { id: marker, at });
	}

	fn remove_marker(&self, marker: MarkerId) {
		self.markers.lock().remove(&marker);
		self.events.lock().push(RenderEvent::MarkerRemoved(marker));
	}

	fn set_geofence_state(&self, state: GeofenceState) {
		self.events.lock().push(RenderEvent::State(state));
	}

	fn clear(&self) {
		self.events.lock().push(RenderEvent::Cleared);
	}
}
