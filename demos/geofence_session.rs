//! Walks a full session against a mock backend: login through the gate, look up a site, and
//! feed a few position fixes through the monitor.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use sitewatch::{
	api::{ApiDescriptor, ServiceIdentity},
	auth::{Credentials, SiteId},
	directory::LocationDirectory,
	gate::{EntryDecision, SessionGate},
	geo::{GeofenceMonitor, ManualPositionSource, PositionSample, RecordingSurface},
	http::ReqwestHttpClient,
	manager::{RecordingNavigator, TokenManager},
	reqwest::Client,
	store::{KeyValueStore, MemoryStore},
};

// `{"alg":"HS256"}.{"exp":4102444800}.signature`
const USER_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJleHAiOjQxMDI0NDQ4MDB9.signature";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"data\":{\"token\":\"demo-service-token\"}}");
		})
		.await;
	let _login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/ejecutores/login");
			then.status(200).header("content-type", "application/json").body(format!(
				"{{\"data\":{{\"token\":\"{USER_TOKEN}\",\"id\":42,\"name\":\"Ana Ruiz\"}}}}"
			));
		})
		.await;
	let _site_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/ubicacion/byParams");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"data\":[{\"latitud\":19.4326,\"longitud\":-99.1332,\"descripcion\":\"Zocalo\"}]}");
		})
		.await;
	let descriptor = ApiDescriptor::builder()
		.base_url(&Url::parse(&server.url("/"))?)?
		.service_identity(ServiceIdentity::new(3, "11223344", "demo-secret"))
		.build()?;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::default());
	let navigator = Arc::new(RecordingNavigator::default());
	let manager = Arc::new(
		TokenManager::with_http_client(store, descriptor, http_client)
			.with_navigator(navigator.clone()),
	);
	let gate = SessionGate::new(manager.clone());

	if gate.entry().await == EntryDecision::RequireLogin {
		let session = gate.submit(&Credentials::new("exec-7", "demo-password")?).await?;

		println!("Logged in as {} ({}).", session.user_name, session.user_id);
	}

	let directory = LocationDirectory::from_manager(&manager);
	let source = Arc::new(ManualPositionSource::default());
	let surface = Arc::new(RecordingSurface::default());
	let monitor = GeofenceMonitor::new(source.clone(), surface.clone());

	monitor.start().await?;
	monitor.watch_site(&directory, &SiteId::new("1791")?).await?;

	for (latitude, longitude) in [(19.4330, -99.1330), (19.4400, -99.1400), (19.4327, -99.1331)] {
		source.push(PositionSample::new(latitude, longitude));

		if let Some(state) = monitor.snapshot().state {
			let label = if state.is_inside { "inside" } else { "outside" };

			println!("({latitude}, {longitude}): {:.1} m, {label}.", state.distance_meters);
		}
	}

	monitor.stop();
	manager.logout().await;

	println!("Routes requested: {:?}.", navigator.routes());

	Ok(())
}
