//! Service-token and executor-login exchanges.

// self
use crate::{
	_prelude::*,
	api::wire::{self, LoginData, LoginRequest, ServiceTokenRequest, TokenData},
	auth::{Credentials, Session, Token},
	error::{AuthError, ConfigError},
	http::{ApiHttpClient, ApiRequest},
	manager::TokenManager,
	obs::{self, OpKind, OpOutcome, OpSpan, log_event},
};

impl<C> TokenManager<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Performs the service-level exchange and keeps the resulting token in memory.
	///
	/// The token is not persisted and its claims are not checked; it only authorizes the
	/// subsequent [`TokenManager::login`] call. Every failure maps to
	/// [`AuthError::TokenUnavailable`].
	pub async fn acquire_service_token(&self) -> Result<Token> {
		const KIND: OpKind = OpKind::ServiceToken;

		let span = OpSpan::new(KIND, "acquire_service_token");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let identity = &self.descriptor.service_identity;
				let body = ServiceTokenRequest {
					id_solicitante: identity.requester_id,
					customer_secret: identity.customer_secret.expose(),
					customer_key: &identity.customer_key,
				};
				let request =
					ApiRequest::new(&self.descriptor, &self.descriptor.endpoints.token, &body)
						.map_err(|e| AuthError::token_unavailable(body_rejected(&e)))?;
				let response = self
					.http_client
					.post_json(request)
					.await
					.map_err(|e| AuthError::token_unavailable(format!("transport failure: {e}")))?;

				if !response.is_success() {
					return Err(AuthError::token_unavailable(format!(
						"token endpoint answered {}: {}",
						response.status,
						response.body_preview()
					))
					.into());
				}

				let data: TokenData = wire::parse_envelope(&response.body).map_err(|e| {
					AuthError::token_unavailable(format!("malformed token response: {e}"))
				})?;

				if data.token.is_empty() {
					let reason = "token endpoint returned an empty token";

					return Err(AuthError::token_unavailable(reason).into());
				}

				let token = Token::new(data.token);

				*self.service_token.lock() = Some(token.clone());
				log_event!(debug, "Service token obtained.");

				Ok(token)
			})
			.await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	/// Exchanges executor credentials for a user token and session, authorized by the in-memory
	/// service token.
	///
	/// On success the token and session fields are persisted, overwriting prior values. Nothing
	/// is written on failure, including when the store rejects one of the writes. A `401` maps to [`AuthError::InvalidCredentials`], other failures to
	/// [`AuthError::ServiceUnavailable`]; a logout that lands while the exchange is in flight
	/// yields [`AuthError::Superseded`].
	pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
		const KIND: OpKind = OpKind::Login;

		let span = OpSpan::new(KIND, "login");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let epoch = self.current_epoch();
				let service_token = self.service_token.lock().clone().ok_or_else(|| {
					AuthError::token_unavailable("no service token has been acquired")
				})?;
				let body = LoginRequest {
					id_ejecutor: &credentials.executor_id,
					password: credentials.password().expose(),
				};
				let request =
					ApiRequest::new(&self.descriptor, &self.descriptor.endpoints.login, &body)
						.map_err(|e| AuthError::service_unavailable(body_rejected(&e), None))?
						.with_bearer(Some(service_token.secret().clone()));
				let response = self.http_client.post_json(request).await.map_err(|e| {
					AuthError::service_unavailable(format!("transport failure: {e}"), None)
				})?;

				if response.is_unauthorized() {
					return Err(AuthError::InvalidCredentials.into());
				}
				if !response.is_success() {
					return Err(AuthError::service_unavailable(
						format!("login endpoint answered: {}", response.body_preview()),
						Some(response.status),
					)
					.into());
				}

				let data: LoginData = wire::parse_envelope(&response.body).map_err(|e| {
					AuthError::service_unavailable(
						format!("malformed login response: {e}"),
						Some(response.status),
					)
				})?;

				if data.token.is_empty() {
					return Err(AuthError::service_unavailable(
						"login response carried an empty token",
						Some(response.status),
					)
					.into());
				}

				let token = Token::new(data.token);
				let session =
					Session::new(data.id.unwrap_or_default(), data.name.unwrap_or_default());
				let _persist = self.persist_guard.lock().await;

				if self.current_epoch() != epoch {
					log_event!(warn, "Discarding login response that arrived after a logout.");

					return Err(AuthError::Superseded.into());
				}

				self.store.save_login(&token, &session).await?;
				log_event!(info, "Executor {} logged in.", credentials.executor_id);

				Ok(session)
			})
			.await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}
}

fn body_rejected(e: &ConfigError) -> String {
	format!("request body could not be encoded: {e}")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	// crates.io
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::{
		api::{ApiDescriptor, ServiceIdentity},
		error::TransportError,
		http::{ApiResponse, HttpFuture},
		store::{KeyValueStore, MemoryStore, USER_ID_KEY, tests::FaultyStore},
	};

	type Scripted = std::result::Result<ApiResponse, TransportError>;

	struct ScriptedClient {
		responses: Mutex<Vec<(std::time::Duration, Scripted)>>,
		requests: Mutex<Vec<ApiRequest>>,
	}
	impl ScriptedClient {
		fn new(responses: Vec<Scripted>) -> Self {
			Self::delayed(responses.into_iter().map(|r| (std::time::Duration::ZERO, r)).collect())
		}

		fn delayed(responses: Vec<(std::time::Duration, Scripted)>) -> Self {
			Self { responses: Mutex::new(responses), requests: Mutex::new(Vec::new()) }
		}
	}
	impl ApiHttpClient for ScriptedClient {
		fn post_json(&self, request: ApiRequest) -> HttpFuture<'_, ApiResponse> {
			self.requests.lock().push(request);

			let (delay, next) = self.responses.lock().remove(0);

			Box::pin(async move {
				tokio::time::sleep(delay).await;

				next
			})
		}
	}

	fn descriptor() -> ApiDescriptor {
		let base = Url::parse("https://backend.test/apid/").expect("Base URL should parse.");

		ApiDescriptor::builder()
			.base_url(&base)
			.expect("Base URL should accept relative endpoints.")
			.service_identity(ServiceIdentity::new(3, "11223344", "test"))
			.build()
			.expect("Descriptor should build.")
	}

	fn manager(client: ScriptedClient) -> (TokenManager<ScriptedClient>, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let backend: Arc<dyn KeyValueStore> = store.clone();

		(TokenManager::with_http_client(backend, descriptor(), client), store)
	}

	#[tokio::test]
	async fn login_without_service_token_is_token_unavailable() {
		let (manager, store) = manager(ScriptedClient::new(Vec::new()));
		let credentials = Credentials::new("exec-7", "pw").expect("Credentials should be valid.");
		let err = manager.login(&credentials).await.expect_err("Login should fail.");

		assert!(matches!(err, Error::Auth(AuthError::TokenUnavailable { .. })));
		assert!(manager.http_client.requests.lock().is_empty());
		assert!(store.is_empty());
	}

	#[tokio::test]
	async fn service_token_request_carries_identity_and_origin() {
		let (manager, _store) = manager(ScriptedClient::new(vec![Ok(ApiResponse::new(
			200,
			r#"{"data":{"token":"svc.token.sig"}}"#,
		))]));
		let token = manager.acquire_service_token().await.expect("Exchange should succeed.");
		let requests = manager.http_client.requests.lock();

		assert_eq!(token.secret().expose(), "svc.token.sig");
		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].url.as_str(), "https://backend.test/apid/token");
		assert_eq!(requests[0].origin, "RadartaskAPP");
		assert!(requests[0].bearer.is_none());
		assert_eq!(
			requests[0].body,
			serde_json::json!({
				"id_solicitante": 3,
				"customer_secret": "test",
				"customer_key": "11223344",
			})
		);
	}

	#[tokio::test]
	async fn transport_failure_during_service_exchange_is_token_unavailable() {
		let (manager, _store) = manager(ScriptedClient::new(vec![Err(TransportError::Io(
			std::io::Error::other("connection reset"),
		))]));
		let err = manager.acquire_service_token().await.expect_err("Exchange should fail.");

		assert!(matches!(err, Error::Auth(AuthError::TokenUnavailable { .. })));
	}

	#[tokio::test]
	async fn logout_during_login_discards_the_response() {
		let (manager, store) = manager(ScriptedClient::delayed(vec![
			(std::time::Duration::ZERO, Ok(ApiResponse::new(200, r#"{"data":{"token":"svc"}}"#))),
			(
				std::time::Duration::from_millis(100),
				Ok(ApiResponse::new(200, r#"{"data":{"token":"user","id":1,"name":"Ana"}}"#)),
			),
		]));
		let credentials = Credentials::new("exec-7", "pw").expect("Credentials should be valid.");

		manager.acquire_service_token().await.expect("Exchange should succeed.");

		let (login, ()) = tokio::join!(manager.login(&credentials), async {
			tokio::time::sleep(std::time::Duration::from_millis(10)).await;
			manager.logout().await;
		});

		assert!(matches!(login, Err(Error::Auth(AuthError::Superseded))));
		assert!(store.is_empty());
		assert!(!manager.is_logged_in().await);
	}

	#[tokio::test]
	async fn rejected_store_write_leaves_auth_state_untouched() {
		let claims = URL_SAFE_NO_PAD.encode(b"{\"exp\":4102444800}");
		let user_token = format!("h.{claims}.s");
		let login_body = format!(r#"{{"data":{{"token":"{user_token}","id":42,"name":"Ana"}}}}"#);
		let store = Arc::new(FaultyStore::default());
		let backend: Arc<dyn KeyValueStore> = store.clone();
		let client = ScriptedClient::new(vec![
			Ok(ApiResponse::new(200, r#"{"data":{"token":"svc"}}"#)),
			Ok(ApiResponse::new(200, login_body)),
		]);
		let manager = TokenManager::with_http_client(backend, descriptor(), client);
		let credentials = Credentials::new("exec-7", "pw").expect("Credentials should be valid.");

		store.fail_set(USER_ID_KEY);
		manager.acquire_service_token().await.expect("Exchange should succeed.");

		let err = manager.login(&credentials).await.expect_err("Rejected write should fail login.");

		assert!(matches!(err, Error::Storage(_)));
		assert!(!manager.is_logged_in().await);
		assert!(store.inner.is_empty());
	}

	#[test]
	fn unencodable_bodies_map_into_auth_errors() {
		let descriptor = descriptor();
		let body = HashMap::from([((1_u8, 2_u8), "tuple keys are not JSON object keys")]);
		let err = ApiRequest::new(&descriptor, &descriptor.endpoints.login, &body)
			.map_err(|e| AuthError::service_unavailable(body_rejected(&e), None))
			.expect_err("Tuple-keyed map should not encode.");

		assert!(matches!(
			err,
			AuthError::ServiceUnavailable { ref message, status: None }
				if message.starts_with("request body could not be encoded")
		));
	}
}
