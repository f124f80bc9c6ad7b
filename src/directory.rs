//! Geofence site lookup authenticated with the persisted user token.

// self
use crate::{
	_prelude::*,
	api::{
		ApiDescriptor,
		wire::{self, SiteQuery, SiteRecord},
	},
	auth::SiteId,
	error::{ConfigError, LocationError},
	geo::Coordinate,
	http::{ApiHttpClient, ApiRequest},
	manager::TokenManager,
	obs::{self, OpKind, OpOutcome, OpSpan, log_event},
	store::TokenStore,
};

/// A registered site the user's position is compared against.
///
/// Immutable once fetched; a monitoring session holds it read-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeofenceSite {
	/// Backend site identifier.
	pub id: String,
	/// Latitude in degrees.
	pub latitude: f64,
	/// Longitude in degrees.
	pub longitude: f64,
	/// Human-readable label shown on the site marker.
	pub description: String,
}
impl GeofenceSite {
	/// Returns the site's coordinate.
	pub fn coordinate(&self) -> Coordinate {
		Coordinate::new(self.latitude, self.longitude)
	}

	fn from_record(
		record: SiteRecord,
		fallback_id: Option<&SiteId>,
	) -> Result<Self, LocationError> {
		let coordinate = Coordinate::new(record.latitud, record.longitud);

		if !coordinate.is_valid() {
			return Err(LocationError::transport(
				format!(
					"site record carries an invalid coordinate ({}, {})",
					record.latitud, record.longitud
				),
				None,
			));
		}

		let id = record
			.id_ubicacion
			.or_else(|| fallback_id.map(|id| id.to_string()))
			.unwrap_or_default();

		Ok(Self {
			id,
			latitude: coordinate.latitude,
			longitude: coordinate.longitude,
			description: record.descripcion.unwrap_or_default(),
		})
	}
}

/// Fetches [`GeofenceSite`] records by identifier.
///
/// Reads the stored user token but never writes auth state. No caching and no retries: every
/// call re-fetches and the caller decides whether to try again.
pub struct LocationDirectory<C>
where
	C: ?Sized + ApiHttpClient,
{
	http_client: Arc<C>,
	descriptor: ApiDescriptor,
	tokens: TokenStore,
}
impl<C> LocationDirectory<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a directory from explicit parts.
	pub fn new(http_client: Arc<C>, descriptor: ApiDescriptor, tokens: TokenStore) -> Self {
		Self { http_client, descriptor, tokens }
	}

	/// Creates a directory sharing the manager's transport, descriptor, and token store.
	pub fn from_manager(manager: &TokenManager<C>) -> Self {
		Self::new(manager.http_client.clone(), manager.descriptor.clone(), manager.token_store())
	}

	/// Posts `ids` to the site lookup endpoint and returns every record, in response order.
	///
	/// Fails with [`LocationError::NotFound`] when zero records come back and with
	/// [`LocationError::TransportFailure`] for everything else.
	pub async fn fetch_sites(&self, ids: &[SiteId]) -> Result<Vec<GeofenceSite>> {
		const KIND: OpKind = OpKind::FetchSites;

		let span = OpSpan::new(KIND, "fetch_sites");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				if ids.is_empty() {
					return Err(LocationError::NotFound { ids: Vec::new() }.into());
				}

				let bearer = self.bearer().await?;
				let body = SiteQuery { id_ubicacion: ids.iter().map(|id| id.as_ref()).collect() };
				let request =
					ApiRequest::new(&self.descriptor, &self.descriptor.endpoints.location, &body)
						.map_err(body_rejected)?
						.with_bearer(bearer);
				let response = self
					.http_client
					.post_json(request)
					.await
					.map_err(|e| LocationError::transport(e.to_string(), None))?;

				if !response.is_success() {
					return Err(LocationError::transport(
						format!("location endpoint answered: {}", response.body_preview()),
						Some(response.status),
					)
					.into());
				}

				let records: Vec<SiteRecord> =
					wire::parse_envelope(&response.body).map_err(|e| {
						LocationError::transport(
							format!("malformed location response: {e}"),
							Some(response.status),
						)
					})?;

				if records.is_empty() {
					log_event!(warn, "No site records returned for {ids:?}.");

					return Err(LocationError::NotFound {
						ids: ids.iter().map(ToString::to_string).collect(),
					}
					.into());
				}

				let sites = records
					.into_iter()
					.enumerate()
					.map(|(idx, record)| GeofenceSite::from_record(record, ids.get(idx)))
					.collect::<Result<Vec<_>, _>>()?;

				Ok(sites)
			})
			.await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	/// Fetches a single site and returns it as the active site for a monitoring session.
	pub async fn fetch_active_site(&self, id: &SiteId) -> Result<GeofenceSite> {
		let mut sites = self.fetch_sites(std::slice::from_ref(id)).await?;

		// `fetch_sites` never returns an empty list.
		Ok(sites.swap_remove(0))
	}

	// Expired or undecodable tokens are sent as no token at all.
	async fn bearer(&self) -> Result<Option<crate::auth::Secret>, LocationError> {
		let token = self.tokens.load_token().await.map_err(|e| {
			LocationError::transport(format!("stored token could not be read: {e}"), None)
		})?;

		Ok(token.filter(|token| token.is_usable()).map(|token| token.secret().clone()))
	}
}
impl<C> Debug for LocationDirectory<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LocationDirectory").field("descriptor", &self.descriptor).finish()
	}
}

fn body_rejected(e: ConfigError) -> LocationError {
	LocationError::transport(format!("request body could not be encoded: {e}"), None)
}
