//! Haversine distance and the derived geofence state.

// self
use crate::_prelude::*;

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
/// Geofence radius around the site, in meters. Inclusive.
pub const GEOFENCE_RADIUS_METERS: f64 = 50.0;

/// Latitude/longitude pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
	/// Latitude in degrees, `[-90, 90]`.
	pub latitude: f64,
	/// Longitude in degrees, `[-180, 180]`.
	pub longitude: f64,
}
impl Coordinate {
	/// Creates a coordinate.
	pub const fn new(latitude: f64, longitude: f64) -> Self {
		Self { latitude, longitude }
	}

	/// Returns `true` when both components are finite and within range.
	pub fn is_valid(&self) -> bool {
		self.latitude.is_finite()
			&& self.longitude.is_finite()
			&& (-90.0..=90.0).contains(&self.latitude)
			&& (-180.0..=180.0).contains(&self.longitude)
	}

	/// Great-circle distance to `other`, in meters.
	pub fn distance_to(&self, other: &Coordinate) -> f64 {
		haversine_distance(self, other)
	}
}

/// Great-circle distance between two coordinates on a sphere of [`EARTH_RADIUS_METERS`].
///
/// The haversine term is clamped to `[0, 1]` so identical and antipodal points never yield NaN.
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
	let phi_a = a.latitude.to_radians();
	let phi_b = b.latitude.to_radians();
	let d_phi = (b.latitude - a.latitude).to_radians();
	let d_lambda = (b.longitude - a.longitude).to_radians();
	let h = (d_phi / 2.0).sin().powi(2)
		+ phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);
	let h = h.clamp(0.0, 1.0);

	EARTH_RADIUS_METERS * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Positional form of [`haversine_distance`].
pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
	haversine_distance(&Coordinate::new(lat1, lon1), &Coordinate::new(lat2, lon2))
}

/// Distance to the site and whether the position lies inside the geofence.
///
/// Always a pure function of the latest position and the site; never cached across a change of
/// either input.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeofenceState {
	/// Great-circle distance to the site, in meters.
	pub distance_meters: f64,
	/// `true` iff `distance_meters <= GEOFENCE_RADIUS_METERS`.
	pub is_inside: bool,
}
impl GeofenceState {
	/// Classifies a distance against [`GEOFENCE_RADIUS_METERS`].
	pub fn from_distance(distance_meters: f64) -> Self {
		Self { distance_meters, is_inside: distance_meters <= GEOFENCE_RADIUS_METERS }
	}

	/// Evaluates `position` against `site`.
	pub fn evaluate(position: &Coordinate, site: &Coordinate) -> Self {
		Self::from_distance(haversine_distance(position, site))
	}
}
