// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use sitewatch::{
	_preludet::*,
	auth::{Credentials, Session, Token},
	error::AuthError,
	manager::Route,
	store::{KeyValueStore, TokenStore, USER_ID_KEY, USER_NAME_KEY, USER_TOKEN_KEY},
};

const FAR_FUTURE: i64 = 4_102_444_800;

fn credentials() -> Credentials {
	Credentials::new("exec-7", "hunter2").expect("Credentials fixture should be valid.")
}

async fn mock_service_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("app-request-origin", "RadartaskAPP")
				.json_body(json!({
					"id_solicitante": 3,
					"customer_secret": "test",
					"customer_key": "11223344",
				}));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"data\":{\"token\":\"svc-token\"}}");
		})
		.await
}

#[tokio::test]
async fn login_persists_token_and_session() {
	let server = MockServer::start_async().await;
	let (manager, store, _navigator) =
		build_reqwest_test_manager(test_descriptor(&server.url("/")));
	let user_token = bearer_with_exp(FAR_FUTURE);
	let token_mock = mock_service_token(&server).await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/ejecutores/login")
				.header("app-request-origin", "RadartaskAPP")
				.header("authorization", "Bearer svc-token")
				.json_body(json!({ "id_ejecutor": "exec-7", "password": "hunter2" }));
			then.status(200).header("content-type", "application/json").body(format!(
				"{{\"data\":{{\"token\":\"{user_token}\",\"id\":42,\"name\":\"Ana Ruiz\"}}}}"
			));
		})
		.await;

	assert!(!manager.is_logged_in().await);

	manager.acquire_service_token().await.expect("Service token exchange should succeed.");

	let session = manager.login(&credentials()).await.expect("Login should succeed.");

	assert_eq!(session, Session::new("42", "Ana Ruiz"));
	assert!(manager.is_logged_in().await);
	assert_eq!(manager.get_session().await, session);

	let persisted = store.snapshot();

	assert_eq!(persisted.get(USER_TOKEN_KEY), Some(&user_token));
	assert_eq!(persisted.get(USER_ID_KEY).map(String::as_str), Some("42"));
	assert_eq!(persisted.get(USER_NAME_KEY).map(String::as_str), Some("Ana Ruiz"));

	token_mock.assert_calls_async(1).await;
	login_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn rejected_login_leaves_previous_state_untouched() {
	let server = MockServer::start_async().await;
	let (manager, store, _navigator) =
		build_reqwest_test_manager(test_descriptor(&server.url("/")));
	let previous = bearer_with_exp(FAR_FUTURE);
	let backend: Arc<dyn KeyValueStore> = store.clone();

	TokenStore::new(backend)
		.save_login(&Token::new(previous.clone()), &Session::new("7", "Previous User"))
		.await
		.expect("Seeding the store should succeed.");

	let _token_mock = mock_service_token(&server).await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/ejecutores/login");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"message\":\"Usuario inactivo\"}");
		})
		.await;
	let before = store.snapshot();

	manager.acquire_service_token().await.expect("Service token exchange should succeed.");

	let err = manager.login(&credentials()).await.expect_err("Login should be rejected.");

	assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
	assert_eq!(store.snapshot(), before);
	assert_eq!(manager.get_session().await, Session::new("7", "Previous User"));

	login_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn malformed_login_payload_is_service_unavailable() {
	let server = MockServer::start_async().await;
	let (manager, store, _navigator) =
		build_reqwest_test_manager(test_descriptor(&server.url("/")));
	let _token_mock = mock_service_token(&server).await;
	let _login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/ejecutores/login");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"data\":{\"id\":42,\"name\":\"Ana\"}}");
		})
		.await;

	manager.acquire_service_token().await.expect("Service token exchange should succeed.");

	let err = manager.login(&credentials()).await.expect_err("Login should fail.");

	assert!(matches!(
		err,
		Error::Auth(AuthError::ServiceUnavailable { status: Some(200), .. })
	));
	assert!(store.is_empty());
}

#[tokio::test]
async fn service_token_without_token_field_is_unavailable() {
	let server = MockServer::start_async().await;
	let (manager, _store, _navigator) =
		build_reqwest_test_manager(test_descriptor(&server.url("/")));
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body("{\"data\":{}}");
		})
		.await;
	let err = manager.acquire_service_token().await.expect_err("Exchange should fail.");

	assert!(matches!(err, Error::Auth(AuthError::TokenUnavailable { .. })));

	token_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn expired_and_malformed_tokens_read_as_logged_out() {
	let (manager, store, _navigator) =
		build_reqwest_test_manager(test_descriptor("https://backend.test/"));
	let backend: Arc<dyn KeyValueStore> = store.clone();
	let now = OffsetDateTime::now_utc().unix_timestamp();

	for raw in [
		bearer_with_exp(now - 60),
		bearer_with_claims("{\"sub\":\"no-expiry\"}"),
		"not-a-jwt".to_string(),
		"header.%%%.signature".to_string(),
	] {
		backend.set(USER_TOKEN_KEY, raw.clone()).await.expect("Seeding the token should succeed.");

		assert!(!manager.is_logged_in().await, "{raw} should not count as logged in");
	}

	backend
		.set(USER_TOKEN_KEY, bearer_with_exp(now + 3_600))
		.await
		.expect("Seeding the token should succeed.");

	assert!(manager.is_logged_in().await);
}

#[tokio::test]
async fn logout_clears_state_and_routes_to_login() {
	let (manager, store, navigator) =
		build_reqwest_test_manager(test_descriptor("https://backend.test/"));
	let backend: Arc<dyn KeyValueStore> = store.clone();

	TokenStore::new(backend)
		.save_login(&Token::new(bearer_with_exp(FAR_FUTURE)), &Session::new("42", "Ana"))
		.await
		.expect("Seeding the store should succeed.");

	assert!(manager.is_logged_in().await);

	manager.logout().await;

	assert!(!manager.is_logged_in().await);
	assert!(store.is_empty());
	assert_eq!(manager.get_session().await, Session::default());

	manager.logout().await;

	assert_eq!(navigator.routes(), vec![Route::Login, Route::Login]);
}
