//! The cron/manual fill entry point (spec §6.1).

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::error;

use crate::app::AppState;
use crate::llm::EnvCredentialSource;
use crate::pipeline::PipelineFillResult;
use crate::store::models::Genre;

#[derive(Debug, Serialize)]
struct FillEntry {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<PipelineFillResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// `GET`/`POST` — runs `FillWindow` for every enabled genre.
pub(crate) async fn run(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(secret) = state.config().cron_shared_secret() {
        if !authorized(&headers, secret) {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response();
        }
    }

    let credentials: Arc<dyn crate::llm::LlmCredentialSource> =
        Arc::new(EnvCredentialSource::new(state.config().llm_api_key().map(str::to_string)));

    let outcomes = match state.scheduler().fill_all_enabled(credentials).await {
        Ok(outcomes) => outcomes,
        Err(err) => {
            error!(error = %err, "failed to enumerate enabled pipeline configs");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("misconfigured: {err}") })),
            )
                .into_response();
        }
    };

    let mut results = Map::new();
    let mut any_failed = false;
    for (genre, outcome) in outcomes {
        let entry = match outcome {
            Ok(result) => FillEntry { success: true, result: Some(result), error: None },
            Err(err) => {
                any_failed = true;
                FillEntry { success: false, result: None, error: Some(err.to_string()) }
            }
        };
        results.insert(genre_key(&genre), serde_json::to_value(entry).unwrap_or(Value::Null));
    }

    let status = if results.is_empty() {
        StatusCode::OK
    } else if any_failed {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::OK
    };

    let body = json!({
        "timestamp": Utc::now().to_rfc3339(),
        "results": Value::Object(results),
    });

    (status, Json(body)).into_response()
}

fn genre_key(genre: &Genre) -> String {
    genre.as_str().to_string()
}

fn authorized(headers: &HeaderMap, secret: &str) -> bool {
    let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    value.strip_prefix("Bearer ").map(|token| token == secret).unwrap_or(false)
}
