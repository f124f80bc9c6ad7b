//! Platform position source seam.
//!
//! Platforms deliver position updates by push: [`PositionSource::watch`] registers a callback
//! that is invoked once per sample (or per per-sample failure) until the watch is cleared.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{_prelude::*, geo::Coordinate};

/// Boxed future returned by [`PositionSource`] methods.
pub type SourceFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, PositionSourceError>> + 'a + Send>>;

/// Callback invoked for every position update.
pub type PositionCallback =
	Arc<dyn Fn(Result<PositionSample, PositionSourceError>) + Send + Sync>;

/// Failure reported by a position source.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct PositionSourceError {
	/// Platform-provided description.
	pub message: String,
}
impl PositionSourceError {
	/// Creates an error from a platform message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// One position fix reported by the platform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
	/// Latitude in degrees.
	pub latitude: f64,
	/// Longitude in degrees.
	pub longitude: f64,
	/// Instant the fix was taken.
	pub timestamp: OffsetDateTime,
}
impl PositionSample {
	/// Creates a sample stamped with the current time.
	pub fn new(latitude: f64, longitude: f64) -> Self {
		Self::at(latitude, longitude, OffsetDateTime::now_utc())
	}

	/// Creates a sample with an explicit timestamp.
	pub fn at(latitude: f64, longitude: f64, timestamp: OffsetDateTime) -> Self {
		Self { latitude, longitude, timestamp }
	}

	/// Returns the sample's coordinate.
	pub fn coordinate(&self) -> Coordinate {
		Coordinate::new(self.latitude, self.longitude)
	}
}

/// Location permission as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
	/// Location access is allowed.
	Granted,
	/// Location access is refused.
	Denied,
	/// The platform will ask the user on request.
	Prompt,
}

/// Handle identifying an active position watch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchId(pub u64);
impl Display for WatchId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "watch-{}", self.0)
	}
}

/// Platform position provider.
///
/// Implementations must tolerate `clear_watch` for an identifier that is no longer active.
pub trait PositionSource
where
	Self: Send + Sync,
{
	/// Reports the current permission state without prompting.
	fn check_permission(&self) -> SourceFuture<'_, PermissionState>;

	/// Prompts the user for permission and reports the outcome.
	fn request_permission(&self) -> SourceFuture<'_, PermissionState>;

	/// Registers `callback` for continuous position updates.
	fn watch(&self, callback: PositionCallback) -> SourceFuture<'_, WatchId>;

	/// Cancels a watch. Idempotent.
	fn clear_watch(&self, id: WatchId);
}

/// In-process [`PositionSource`] driven by explicit pushes.
///
/// Serves as the bridge for platforms whose glue code receives fixes on its own thread, and as
/// the fake source in tests.
pub struct ManualPositionSource {
	permission: Mutex<PermissionState>,
	request_outcome: Mutex<PermissionState>,
	watch_failure: Mutex<Option<PositionSourceError>>,
	watchers: Mutex<BTreeMap<WatchId, PositionCallback>>,
	permission_requests: AtomicU64,
	next_id: AtomicU64,
}
impl ManualPositionSource {
	/// Creates a source reporting `permission`; a prompt resolves to [`PermissionState::Granted`].
	pub fn new(permission: PermissionState) -> Self {
		Self {
			permission: Mutex::new(permission),
			request_outcome: Mutex::new(PermissionState::Granted),
			watch_failure: Mutex::new(None),
			watchers: Mutex::new(BTreeMap::new()),
			permission_requests: AtomicU64::new(0),
			next_id: AtomicU64::new(1),
		}
	}

	/// Sets the state a permission prompt resolves to.
	pub fn with_request_outcome(self, outcome: PermissionState) -> Self {
		*self.request_outcome.lock() = outcome;

		self
	}

	/// Makes the next [`PositionSource::watch`] call fail with `message`.
	pub fn fail_next_watch(&self, message: impl Into<String>) {
		*self.watch_failure.lock() = Some(PositionSourceError::new(message));
	}

	/// Delivers `sample` to every active watch.
	pub fn push(&self, sample: PositionSample) {
		self.dispatch(Ok(sample));
	}

	/// Delivers a per-sample failure to every active watch.
	pub fn push_error(&self, message: impl Into<String>) {
		self.dispatch(Err(PositionSourceError::new(message)));
	}

	/// Number of watches that have not been cleared.
	pub fn active_watches(&self) -> usize {
		self.watchers.lock().len()
	}

	/// Number of times the permission prompt was shown.
	pub fn permission_requests(&self) -> u64 {
		self.permission_requests.load(Ordering::SeqCst)
	}

	fn dispatch(&self, update: Result<PositionSample, PositionSourceError>) {
		// Callbacks run outside the lock so they may clear their own watch.
		let callbacks = self.watchers.lock().values().cloned().collect::<Vec<_>>();

		for callback in callbacks {
			callback(update.clone());
		}
	}
}
impl Default for ManualPositionSource {
	fn default() -> Self {
		Self::new(PermissionState::Granted)
	}
}
impl Debug for ManualPositionSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ManualPositionSource")
			.field("permission", &*self.permission.lock())
			.field("active_watches", &self.active_watches())
			.finish()
	}
}
impl PositionSource for ManualPositionSource {
	fn check_permission(&self) -> SourceFuture<'_, PermissionState> {
		Box::pin(async move { Ok(*self.permission.lock()) })
	}

	fn request_permission(&self) -> SourceFuture<'_, PermissionState> {
		Box::pin(async move {
			self.permission_requests.fetch_add(1, Ordering::SeqCst);

			let outcome = *self.request_outcome.lock();

			*self.permission.lock() = outcome;

			Ok(outcome)
		})
	}

	fn watch(&self, callback: PositionCallback) -> SourceFuture<'_, WatchId> {
		Box::pin(async move {
			if let Some(err) = self.watch_failure.lock().take() {
				return Err(err);
			}

			let id = WatchId(self.next_id.fetch_add(1, Ordering::SeqCst));

			self.watchers.lock().insert(id, callback);

			Ok(id)
		})
	}

	fn clear_watch(&self, id: WatchId) {
		self.watchers.lock().remove(&id);
	}
}
