//! HTTP API for the intent coordinator.
//!
//! Thin translation layer: handlers decode the request, call the
//! coordinator, and map its error taxonomy onto HTTP statuses. Every
//! response about a specific intent carries an `x-intent-id` header so
//! callers can correlate logs across services.

use axum::{
	extract::{Path, State},
	http::{HeaderName, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
	Json, Router,
};
use coordinator_core::{CreateIntentRequest, IntentCoordinator};
use coordinator_types::{Address, CoordinatorError, IntentId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

static INTENT_ID_HEADER: HeaderName = HeaderName::from_static("x-intent-id");

#[derive(Clone)]
pub struct AppState {
	pub coordinator: Arc<IntentCoordinator>,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/intents", post(create_intent))
		.route("/intents/{id}", get(get_intent))
		.route("/intents/{id}/valid", get(is_intent_valid))
		.route("/intents/{id}/lock", post(lock_revocation))
		.route("/intents/{id}/executed", post(mark_executed))
		.route("/intents/{id}/failed", post(mark_failed))
		.route("/intents/{id}/revoke", post(revoke_intent))
		.route("/nonce/{address}", get(user_nonce))
		.with_state(state)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

pub async fn serve(coordinator: Arc<IntentCoordinator>, port: u16) -> anyhow::Result<()> {
	let app = router(AppState { coordinator });
	let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

	info!("API server listening on port {}", port);
	axum::serve(listener, app).await?;
	Ok(())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error: &'static str,
	message: String,
}

struct ApiError {
	status: StatusCode,
	code: &'static str,
	message: String,
}

impl ApiError {
	fn bad_request(code: &'static str, message: String) -> Self {
		Self {
			status: StatusCode::BAD_REQUEST,
			code,
			message,
		}
	}
}

impl From<CoordinatorError> for ApiError {
	fn from(err: CoordinatorError) -> Self {
		let (status, code) = match &err {
			CoordinatorError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
			CoordinatorError::Unauthorized { .. } => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
			CoordinatorError::NotPending { .. } => (StatusCode::CONFLICT, "NOT_PENDING"),
			CoordinatorError::StillLocked { .. } => (StatusCode::CONFLICT, "STILL_LOCKED"),
			CoordinatorError::InvalidSignature { .. } => {
				(StatusCode::BAD_REQUEST, "INVALID_SIGNATURE")
			}
			CoordinatorError::StaleNonce { .. } => (StatusCode::BAD_REQUEST, "STALE_NONCE"),
			CoordinatorError::ExpiryInPast { .. } => (StatusCode::BAD_REQUEST, "EXPIRY_IN_PAST"),
			CoordinatorError::UnknownAgent(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_AGENT"),
			CoordinatorError::Storage(_) | CoordinatorError::Identity(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
			}
		};
		Self {
			status,
			code,
			message: err.to_string(),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(
			self.status,
			Json(ErrorBody {
				error: self.code,
				message: self.message,
			}),
		)
			.into_response()
	}
}

fn parse_intent_id(raw: &str) -> Result<IntentId, ApiError> {
	raw.parse()
		.map_err(|_| ApiError::bad_request("INVALID_INTENT_ID", format!("not an intent id: {}", raw)))
}

fn intent_id_header(intent_id: IntentId) -> [(HeaderName, String); 1] {
	[(INTENT_ID_HEADER.clone(), intent_id.to_string())]
}

async fn health() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
struct CreateIntentResponse {
	intent_id: IntentId,
}

async fn create_intent(
	State(state): State<AppState>,
	Json(request): Json<CreateIntentRequest>,
) -> Result<Response, ApiError> {
	let intent_id = state.coordinator.create_intent(request).await?;
	Ok((
		StatusCode::CREATED,
		intent_id_header(intent_id),
		Json(CreateIntentResponse { intent_id }),
	)
		.into_response())
}

async fn get_intent(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Response, ApiError> {
	let intent_id = parse_intent_id(&id)?;
	let intent = state.coordinator.get_intent(&intent_id)?;
	Ok((intent_id_header(intent_id), Json(intent)).into_response())
}

#[derive(Debug, Serialize)]
struct ValidityResponse {
	intent_id: IntentId,
	valid: bool,
}

async fn is_intent_valid(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Response, ApiError> {
	let intent_id = parse_intent_id(&id)?;
	// Unknown ids report invalid rather than erroring
	let valid = state.coordinator.is_intent_valid(&intent_id);
	Ok((
		intent_id_header(intent_id),
		Json(ValidityResponse { intent_id, valid }),
	)
		.into_response())
}

/// Caller identity for transition endpoints. Callers are identified by
/// address; authorization against the intent's roles happens in the
/// coordinator.
#[derive(Debug, Deserialize)]
struct CallerRequest {
	caller: Address,
}

#[derive(Debug, Deserialize)]
struct FailRequest {
	caller: Address,
	reason: String,
}

async fn lock_revocation(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(request): Json<CallerRequest>,
) -> Result<Response, ApiError> {
	let intent_id = parse_intent_id(&id)?;
	state
		.coordinator
		.lock_revocation(intent_id, &request.caller)
		.await?;
	Ok((StatusCode::OK, intent_id_header(intent_id)).into_response())
}

async fn mark_executed(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(request): Json<CallerRequest>,
) -> Result<Response, ApiError> {
	let intent_id = parse_intent_id(&id)?;
	state
		.coordinator
		.mark_executed(intent_id, &request.caller)
		.await?;
	Ok((StatusCode::OK, intent_id_header(intent_id)).into_response())
}

async fn mark_failed(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(request): Json<FailRequest>,
) -> Result<Response, ApiError> {
	let intent_id = parse_intent_id(&id)?;
	state
		.coordinator
		.mark_failed(intent_id, request.reason, &request.caller)
		.await?;
	Ok((StatusCode::OK, intent_id_header(intent_id)).into_response())
}

async fn revoke_intent(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(request): Json<CallerRequest>,
) -> Result<Response, ApiError> {
	let intent_id = parse_intent_id(&id)?;
	state
		.coordinator
		.revoke_intent(intent_id, &request.caller)
		.await?;
	Ok((StatusCode::OK, intent_id_header(intent_id)).into_response())
}

#[derive(Debug, Serialize)]
struct NonceResponse {
	address: Address,
	nonce: u64,
}

async fn user_nonce(
	State(state): State<AppState>,
	Path(address): Path<String>,
) -> Result<Json<NonceResponse>, ApiError> {
	let address: Address = address
		.parse()
		.map_err(|_| ApiError::bad_request("INVALID_ADDRESS", format!("not an address: {}", address)))?;
	let nonce = state.coordinator.user_nonce(&address).await?;
	Ok(Json(NonceResponse { address, nonce }))
}
