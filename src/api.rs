use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::error::EvaluationError;
use crate::ingest::types::Source;
use crate::ingest::Pipeline;
use crate::snapshot::Snapshot;

#[derive(Clone)]
pub struct AppState {
    pipeline: Pipeline,
}

pub fn router(pipeline: Pipeline) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/evaluation", get(evaluation))
        .layer(CorsLayer::very_permissive())
        .with_state(AppState { pipeline })
}

/// `GET /evaluation?url=...&url=...`
async fn evaluation(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let sources: Vec<Source> = params
        .into_iter()
        .filter(|(k, _)| k == "url")
        .map(|(_, v)| Source::new(v))
        .collect();
    tracing::info!(?sources, "/evaluation called");

    match state.pipeline.evaluate(sources).await {
        Ok(snapshot) => encode(&snapshot),
        Err(EvaluationError::NoSources) => {
            tracing::warn!("query parameter 'url' is missing");
            error_response(StatusCode::BAD_REQUEST, "query parameter 'url' is missing")
        }
        Err(e) => {
            tracing::error!(error = %e, "evaluation failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

// Encoding failure is a server-side error for this request only.
fn encode(snapshot: &Snapshot) -> Response {
    match serde_json::to_vec(snapshot) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "snapshot encoding failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to encode evaluation result",
            )
        }
    }
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}
