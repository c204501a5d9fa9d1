// HTTP layer - the axum routes in front of the moderation service.
//
// Routes:
// - GET  /healthz  liveness probe, static payload
// - POST /analyze  classify one report

use crate::core::moderation::{
    AgentProvider, Decision, ModerationError, ModerationService, ReportPacket,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const SERVICE_NAME: &str = "moderation-agent";

/// Shared state handed to every request task.
pub type SharedService = Arc<ModerationService<Box<dyn AgentProvider>>>;

/// Wraps core errors so they can be turned into HTTP responses.
#[derive(Debug)]
pub struct ApiError(ModerationError);

impl From<ModerationError> for ApiError {
    fn from(err: ModerationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ModerationError::EmptyReason => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/analyze", post(analyze))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

async fn analyze(
    State(service): State<SharedService>,
    Json(packet): Json<ReportPacket>,
) -> Result<Json<Decision>, ApiError> {
    tracing::debug!(report_id = %packet.report_id, "Analyze request received");
    let decision = service.analyze(&packet).await?;
    Ok(Json(decision))
}
