//! REST API server for the advisor
//!
//! Exposes the recommendation orchestrator, advisor history and saved SIP
//! calculations over HTTP. Every `/api` route except health requires a
//! bearer token.

use axum::{
    extract::{rejection::JsonRejection, FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::agent::RecommendationOrchestrator;
use crate::auth::{AuthUser, TokenVerifier};
use crate::error::AdvisorError;
use crate::models::{AdvisorSession, Calculation, Recommendation};
use crate::state::Stores;
use crate::validation::{validate_calculation, validate_profile};

/// =============================
/// Error Responses
/// =============================

/// HTTP error with a `{"error": "..."}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<AdvisorError> for ApiError {
    fn from(error: AdvisorError) -> Self {
        let status = match &error {
            AdvisorError::Validation(_) => StatusCode::BAD_REQUEST,
            AdvisorError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AdvisorError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match error {
            AdvisorError::Validation(message)
            | AdvisorError::Unauthorized(message)
            | AdvisorError::NotFound(message) => Self { status, message },
            other => {
                error!("Request failed: {}", other);
                Self::internal("Server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl IntoResponse for AdvisorError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<RecommendationOrchestrator>,
    pub stores: Stores,
    pub tokens: Arc<TokenVerifier>,
}

impl FromRef<ApiState> for Arc<TokenVerifier> {
    fn from_ref(state: &ApiState) -> Self {
        state.tokens.clone()
    }
}

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AdvisorError::Validation(rejection.body_text()).into())
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Auth Endpoint
/// =============================

async fn verify_token(AuthUser(claims): AuthUser) -> Json<Value> {
    Json(json!({ "user": claims }))
}

/// =============================
/// Advisor Endpoints
/// =============================

async fn analyze(
    State(state): State<ApiState>,
    AuthUser(claims): AuthUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Recommendation>> {
    let profile = validate_profile(&json_body(payload)?)?;

    info!(user_id = claims.user_id, "Received analysis request");

    let recommendation = state.orchestrator.analyze(claims.user_id, &profile).await;
    Ok(Json(recommendation))
}

async fn history(
    State(state): State<ApiState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<Vec<AdvisorSession>>> {
    let sessions = state
        .stores
        .sessions
        .list_by_user(claims.user_id)
        .await
        .map_err(|e| {
            error!(user_id = claims.user_id, "History error: {}", e);
            ApiError::internal("Failed to fetch history")
        })?;

    Ok(Json(sessions))
}

/// =============================
/// Calculation Endpoints
/// =============================

async fn save_calculation(
    State(state): State<ApiState>,
    AuthUser(claims): AuthUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let calculation = validate_calculation(&json_body(payload)?)?;

    let calculation_id = state
        .stores
        .calculations
        .save(claims.user_id, calculation)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Calculation saved successfully",
            "calculationId": calculation_id
        })),
    ))
}

async fn list_calculations(
    State(state): State<ApiState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<Value>> {
    let calculations: Vec<Calculation> = state
        .stores
        .calculations
        .list_by_user(claims.user_id)
        .await?;

    Ok(Json(json!({ "calculations": calculations })))
}

async fn delete_calculation(
    State(state): State<ApiState>,
    AuthUser(claims): AuthUser,
    Path(calculation_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let deleted = state
        .stores
        .calculations
        .delete_owned(claims.user_id, calculation_id)
        .await?;

    if !deleted {
        return Err(AdvisorError::NotFound("Calculation not found".to_string()).into());
    }

    Ok(Json(json!({ "message": "Calculation deleted successfully" })))
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/verify", get(verify_token))
        .route("/api/advisor/analyze", post(analyze))
        .route("/api/advisor/history", get(history))
        .route(
            "/api/calculations",
            post(save_calculation).get(list_calculations),
        )
        .route("/api/calculations/:id", delete(delete_calculation))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
