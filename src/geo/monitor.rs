//! Position watch lifecycle and inside/outside tracking for one monitoring session.
//!
//! A [`GeofenceMonitor`] moves `Idle -> Watching -> Stopped`. Stopped is terminal: the watch is
//! released, both markers are removed, and late position samples or site responses are dropped.
//! Position and site may arrive in either order; the geofence state is computed as soon as both
//! are known and recomputed on every later sample.

// self
use crate::{
	_prelude::*,
	auth::SiteId,
	directory::{GeofenceSite, LocationDirectory},
	error::GeofenceError,
	geo::{
		GeofenceState, MarkerId, PermissionState, PositionCallback, PositionSample,
		PositionSource, PositionSourceError, RenderSurface, WatchId,
	},
	http::ApiHttpClient,
	obs::{self, OpKind, OpOutcome, OpSpan, log_event},
};

/// Lifecycle phase of a [`GeofenceMonitor`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorPhase {
	/// Created; no watch registered.
	#[default]
	Idle,
	/// Receiving position updates.
	Watching,
	/// Released; terminal.
	Stopped,
}

/// Point-in-time view of a monitor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
	/// Lifecycle phase.
	pub phase: MonitorPhase,
	/// Latest accepted position sample.
	pub position: Option<PositionSample>,
	/// Attached site.
	pub site: Option<GeofenceSite>,
	/// Latest geofence evaluation; `None` until both position and site are known.
	pub state: Option<GeofenceState>,
}

/// Tracks the user's position against one site and drives a [`RenderSurface`].
pub struct GeofenceMonitor {
	shared: Arc<Shared>,
	starting: AsyncMutex<()>,
}
impl GeofenceMonitor {
	/// Creates an idle monitor.
	pub fn new(source: Arc<dyn PositionSource>, surface: Arc<dyn RenderSurface>) -> Self {
		Self {
			shared: Arc::new(Shared { source, surface, state: Mutex::default() }),
			starting: AsyncMutex::new(()),
		}
	}

	/// Current lifecycle phase.
	pub fn phase(&self) -> MonitorPhase {
		self.shared.state.lock().phase
	}

	/// Ensures location permission and registers the position watch.
	///
	/// A [`PermissionState::Prompt`] is resolved by asking the user. Denial yields
	/// [`GeofenceError::PermissionDenied`] and a watch registration failure yields
	/// [`GeofenceError::WatchFailure`]; the monitor stays idle in both cases. Calling `start` while
	/// watching is a no-op, and calling it after [`GeofenceMonitor::stop`] yields
	/// [`GeofenceError::SessionEnded`].
	pub async fn start(&self) -> Result<()> {
		const KIND: OpKind = OpKind::Watch;

		let span = OpSpan::new(KIND, "start");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _starting = self.starting.lock().await;

				match self.phase() {
					MonitorPhase::Watching => return Ok(()),
					MonitorPhase::Stopped => return Err(GeofenceError::SessionEnded.into()),
					MonitorPhase::Idle => {},
				}

				let source = &self.shared.source;
				let mut permission = source.check_permission().await.map_err(watch_failure)?;

				if permission == PermissionState::Prompt {
					permission = source.request_permission().await.map_err(watch_failure)?;
				}
				if permission != PermissionState::Granted {
					log_event!(warn, "Location permission is {permission:?}; not watching.");

					return Err(GeofenceError::PermissionDenied.into());
				}

				let shared = Arc::downgrade(&self.shared);
				let callback: PositionCallback = Arc::new(move |update| {
					if let Some(shared) = shared.upgrade() {
						shared.on_update(update);
					}
				});
				let id = source.watch(callback).await.map_err(watch_failure)?;
				let mut state = self.shared.state.lock();

				if state.phase == MonitorPhase::Stopped {
					drop(state);
					source.clear_watch(id);

					return Err(GeofenceError::SessionEnded.into());
				}

				state.phase = MonitorPhase::Watching;
				state.watch = Some(id);
				log_event!(debug, "Position {id} registered.");

				Ok(())
			})
			.await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	/// Releases the watch and removes both markers. Idempotent and terminal.
	pub fn stop(&self) {
		self.shared.stop();
	}

	/// Attaches the site this session is measured against.
	///
	/// Returns `false` when the session has stopped or a site is already attached; the site is
	/// fixed for the lifetime of a session.
	pub fn attach_site(&self, site: GeofenceSite) -> bool {
		self.shared.attach_site(site)
	}

	/// Fetches `id` through `directory` and attaches it.
	///
	/// Returns `Ok(false)` when the session stopped before the response arrived; the response
	/// is then discarded.
	pub async fn watch_site<C>(&self, directory: &LocationDirectory<C>, id: &SiteId) -> Result<bool>
	where
		C: ?Sized + ApiHttpClient,
	{
		if self.phase() == MonitorPhase::Stopped {
			return Ok(false);
		}

		let site = directory.fetch_active_site(id).await?;

		Ok(self.attach_site(site))
	}

	/// Returns a copy of the current state.
	pub fn snapshot(&self) -> MonitorSnapshot {
		let state = self.shared.state.lock();

		MonitorSnapshot {
			phase: state.phase,
			position: state.position.clone(),
			site: state.site.clone(),
			state: state.geofence,
		}
	}
}
impl Drop for GeofenceMonitor {
	fn drop(&mut self) {
		self.shared.stop();
	}
}
impl Debug for GeofenceMonitor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GeofenceMonitor").field("snapshot", &self.snapshot()).finish()
	}
}

#[derive(Default)]
struct MonitorState {
	phase: MonitorPhase,
	watch: Option<WatchId>,
	position: Option<PositionSample>,
	site: Option<GeofenceSite>,
	geofence: Option<GeofenceState>,
	position_marker: Option<MarkerId>,
	site_marker: Option<MarkerId>,
	centered: bool,
}

// Shared with the watch callback through a `Weak` so the source never keeps a dropped monitor
// alive.
struct Shared {
	source: Arc<dyn PositionSource>,
	surface: Arc<dyn RenderSurface>,
	state: Mutex<MonitorState>,
}
impl Shared {
	fn on_update(&self, update: Result<PositionSample, PositionSourceError>) {
		let sample = match update {
			Ok(sample) => sample,
			Err(e) => {
				log_event!(warn, "Position update failed; still watching: {e}");

				return;
			},
		};
		let at = sample.coordinate();

		if !at.is_valid() {
			log_event!(warn, "Ignoring position sample with invalid coordinate {at:?}.");

			return;
		}

		let mut state = self.state.lock();

		if state.phase == MonitorPhase::Stopped {
			return;
		}
		if !state.centered {
			self.surface.center_on(at);
			state.centered = true;
		}

		match state.position_marker {
			Some(marker) => self.surface.move_marker(marker, at),
			None => state.position_marker = Some(self.surface.set_position(at)),
		}

		state.position = Some(sample);
		self.recompute(&mut state);
	}

	fn attach_site(&self, site: GeofenceSite) -> bool {
		let mut state = self.state.lock();

		if state.phase == MonitorPhase::Stopped {
			log_event!(debug, "Discarding site {} for a stopped session.", site.id);

			return false;
		}
		if let Some(current) = &state.site {
			log_event!(warn, "Site {} is already attached; ignoring site {}.", current.id, site.id);

			return false;
		}

		let marker = self.surface.set_site_marker(site.coordinate(), &site.description);

		state.site_marker = Some(marker);
		log_event!(debug, "Site {} attached.", site.id);
		state.site = Some(site);
		self.recompute(&mut state);

		true
	}

	fn recompute(&self, state: &mut MonitorState) {
		let (Some(position), Some(site)) = (&state.position, &state.site) else {
			return;
		};
		let next = GeofenceState::evaluate(&position.coordinate(), &site.coordinate());
		let distance = next.distance_meters;
		let site_id = &site.id;

		match state.geofence {
			Some(previous) if previous.is_inside != next.is_inside => {
				let direction = if next.is_inside { "entered" } else { "left" };

				log_event!(info, "User {direction} site {site_id} geofence ({distance:.1} m).");
				obs::record_geofence_transition(next.is_inside);
			},
			None => {
				let inside = next.is_inside;

				log_event!(debug, "Site {site_id}: inside={inside} ({distance:.1} m).");
			},
			_ => {},
		}

		state.geofence = Some(next);
		self.surface.set_geofence_state(next);
	}

	fn stop(&self) {
		let mut state = self.state.lock();

		if state.phase == MonitorPhase::Stopped {
			return;
		}

		state.phase = MonitorPhase::Stopped;

		if let Some(id) = state.watch.take() {
			self.source.clear_watch(id);
		}

		let markers = [state.position_marker.take(), state.site_marker.take()];

		for marker in markers.into_iter().flatten() {
			self.surface.remove_marker(marker);
		}

		self.surface.clear();
		log_event!(debug, "Geofence monitor stopped.");
	}
}

fn watch_failure(e: PositionSourceError) -> GeofenceError {
	GeofenceError::WatchFailure { message: e.message }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::geo::{
		Coordinate, ManualPositionSource, MarkerKind, RecordingSurface, RenderEvent,
	};

	const SITE: Coordinate = Coordinate::new(19.4326, -99.1332);

	fn site() -> GeofenceSite {
		GeofenceSite {
			id: "1791".into(),
			latitude: SITE.latitude,
			longitude: SITE.longitude,
			description: "Bodega norte".into(),
		}
	}

	fn monitor(
		source: ManualPositionSource,
	) -> (GeofenceMonitor, Arc<ManualPositionSource>, Arc<RecordingSurface>) {
		let source = Arc::new(source);
		let surface = Arc::new(RecordingSurface::default());

		(GeofenceMonitor::new(source.clone(), surface.clone()), source, surface)
	}

	#[tokio::test]
	async fn state_waits_for_both_position_and_site() {
		let (monitor, source, surface) = monitor(ManualPositionSource::default());

		monitor.start().await.expect("Start should succeed with granted permission.");
		source.push(PositionSample::new(19.4330, -99.1330));

		let snapshot = monitor.snapshot();

		assert_eq!(snapshot.phase, MonitorPhase::Watching);
		assert!(snapshot.position.is_some());
		assert!(snapshot.state.is_none());
		assert!(monitor.attach_site(site()));

		let state =
			monitor.snapshot().state.expect("State should be computed once the site lands.");

		assert!(state.is_inside);
		assert!(state.distance_meters < 50.0);
		assert_eq!(surface.last_state(), Some(state));
		assert_eq!(surface.site_label().as_deref(), Some("Bodega norte"));
	}

	#[tokio::test]
	async fn markers_are_created_once_and_moved_afterwards() {
		let (monitor, source, surface) = monitor(ManualPositionSource::default());

		monitor.start().await.expect("Start should succeed.");
		monitor.attach_site(site());
		source.push(PositionSample::new(19.4330, -99.1330));
		source.push(PositionSample::new(19.4400, -99.1400));
		source.push(PositionSample::new(19.4327, -99.1331));

		assert!(!monitor.attach_site(site()));
		assert_eq!(surface.created(MarkerKind::Position), 1);
		assert_eq!(surface.created(MarkerKind::Site), 1);

		let events = surface.events();
		let centered = events.iter().filter(|e| matches!(e, RenderEvent::Centered(_))).count();
		let moves = events.iter().filter(|e| matches!(e, RenderEvent::MarkerMoved { .. })).count();

		assert_eq!(centered, 1);
		assert_eq!(moves, 2);
	}

	#[tokio::test]
	async fn state_follows_every_sample() {
		let (monitor, source, _surface) = monitor(ManualPositionSource::default());

		monitor.start().await.expect("Start should succeed.");
		monitor.attach_site(site());
		source.push(PositionSample::new(19.4330, -99.1330));

		assert_eq!(monitor.snapshot().state.map(|s| s.is_inside), Some(true));

		source.push(PositionSample::new(19.4400, -99.1400));

		let state = monitor.snapshot().state.expect("State should be present.");

		assert!(!state.is_inside);
		assert!(state.distance_meters > 1_000.0);

		source.push(PositionSample::new(SITE.latitude, SITE.longitude));

		assert_eq!(monitor.snapshot().state, Some(GeofenceState::from_distance(0.0)));
	}

	#[tokio::test]
	async fn per_sample_errors_keep_the_watch_alive() {
		let (monitor, source, _surface) = monitor(ManualPositionSource::default());

		monitor.start().await.expect("Start should succeed.");
		source.push_error("signal lost");
		source.push(PositionSample::new(f64::NAN, 0.0));

		let snapshot = monitor.snapshot();

		assert_eq!(snapshot.phase, MonitorPhase::Watching);
		assert!(snapshot.position.is_none());

		source.push(PositionSample::new(19.4330, -99.1330));

		assert!(monitor.snapshot().position.is_some());
	}

	#[tokio::test]
	async fn prompt_requests_permission_before_watching() {
		let (monitor, source, _surface) =
			monitor(ManualPositionSource::new(PermissionState::Prompt));

		monitor.start().await.expect("Granted prompt should start the watch.");

		assert_eq!(source.permission_requests(), 1);
		assert_eq!(source.active_watches(), 1);
	}

	#[tokio::test]
	async fn denied_permission_leaves_monitor_idle() {
		let (monitor, source, _surface) = monitor(
			ManualPositionSource::new(PermissionState::Prompt)
				.with_request_outcome(PermissionState::Denied),
		);
		let err = monitor.start().await.expect_err("Denied permission should fail.");

		assert!(matches!(err, Error::Geofence(GeofenceError::PermissionDenied)));
		assert_eq!(monitor.phase(), MonitorPhase::Idle);
		assert_eq!(source.active_watches(), 0);
	}

	#[tokio::test]
	async fn watch_failure_leaves_monitor_idle_and_retryable() {
		let (monitor, source, _surface) = monitor(ManualPositionSource::default());

		source.fail_next_watch("provider disabled");

		let err = monitor.start().await.expect_err("Watch failure should surface.");

		assert!(matches!(
			err,
			Error::Geofence(GeofenceError::WatchFailure { ref message })
				if message == "provider disabled"
		));
		assert_eq!(monitor.phase(), MonitorPhase::Idle);

		monitor.start().await.expect("Retry should succeed.");

		assert_eq!(monitor.phase(), MonitorPhase::Watching);
	}

	#[tokio::test]
	async fn repeated_start_registers_a_single_watch() {
		let (monitor, source, _surface) = monitor(ManualPositionSource::default());

		monitor.start().await.expect("First start should succeed.");
		monitor.start().await.expect("Second start should be a no-op.");

		assert_eq!(source.active_watches(), 1);
	}

	#[tokio::test]
	async fn stop_is_terminal_and_idempotent() {
		let (monitor, source, surface) = monitor(ManualPositionSource::default());

		monitor.start().await.expect("Start should succeed.");
		monitor.attach_site(site());
		source.push(PositionSample::new(19.4330, -99.1330));
		monitor.stop();
		monitor.stop();

		assert_eq!(monitor.phase(), MonitorPhase::Stopped);
		assert_eq!(source.active_watches(), 0);
		assert!(surface.markers().is_empty());

		let cleared = surface.events().iter().filter(|e| matches!(e, RenderEvent::Cleared)).count();

		assert_eq!(cleared, 1);

		let before = monitor.snapshot();

		source.push(PositionSample::new(19.4400, -99.1400));

		assert_eq!(monitor.snapshot(), before);
		assert!(matches!(
			monitor.start().await,
			Err(Error::Geofence(GeofenceError::SessionEnded))
		));
	}

	#[tokio::test]
	async fn site_arriving_after_stop_is_discarded() {
		let (monitor, _source, surface) = monitor(ManualPositionSource::default());

		monitor.start().await.expect("Start should succeed.");
		monitor.stop();

		assert!(!monitor.attach_site(site()));
		assert_eq!(surface.created(MarkerKind::Site), 0);
		assert!(monitor.snapshot().site.is_none());
	}

	#[tokio::test]
	async fn dropping_the_monitor_releases_the_watch() {
		let (monitor, source, surface) = monitor(ManualPositionSource::default());

		monitor.start().await.expect("Start should succeed.");
		source.push(PositionSample::new(19.4330, -99.1330));
		drop(monitor);

		assert_eq!(source.active_watches(), 0);
		assert!(surface.markers().is_empty());

		source.push(PositionSample::new(19.4331, -99.1331));
	}
}
