use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;

use super::state::{CallbackEvent, DashboardState};
use super::templates;
use crate::binding::Binding;
use crate::registry::RegistryError;

// ── GET / — page shell that renders the layout in the browser ───────

pub async fn index(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    templates::render_index(state.app.config())
}

// ── GET /_dash-layout — component tree as JSON ───────────────────────

pub async fn get_layout(State(state): State<Arc<DashboardState>>) -> Response {
    match state.app.layout() {
        Some(layout) => Json(layout).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "layout has not been set"),
    }
}

// ── GET /_dash-dependencies — registered callbacks ──────────────────

pub async fn get_dependencies(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    Json(state.app.registry().dependencies())
}

// ── POST /_dash-update-component — run one callback ─────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    /// `component.property` of the output to recompute.
    pub output: String,
    #[serde(default)]
    pub inputs: Vec<InputValue>,
}

#[derive(Debug, Deserialize)]
pub struct InputValue {
    pub id: String,
    pub property: String,
    #[serde(default)]
    pub value: Value,
}

pub async fn update_component(
    State(state): State<Arc<DashboardState>>,
    Json(req): Json<UpdateRequest>,
) -> Response {
    let Some(target) = Binding::parse_key(&req.output) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!("malformed output '{}', expected component.property", req.output),
        );
    };

    let args = match ordered_args(&state, &req) {
        Ok(args) => args,
        Err(resp) => return resp,
    };

    // Handlers are synchronous user code; keep them off the async workers.
    let started = Instant::now();
    let output = req.output.clone();
    let task_state = state.clone();
    let result = tokio::task::spawn_blocking(move || task_state.app.registry().dispatch(&output, &args)).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(logger) = state.app.logger() {
                let _ = logger.log_error(&format!("callback task for {} panicked: {}", req.output, e));
            }
            record(&state, &req.output, duration_ms, Some(format!("callback task panicked: {}", e))).await;
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "callback task panicked");
        }
    };

    match outcome {
        Ok(value) => {
            record(&state, &req.output, duration_ms, None).await;
            let mut props = Map::new();
            props.insert(target.property, value);
            let mut response = Map::new();
            response.insert(target.component_id, Value::Object(props));
            Json(json!({ "response": response })).into_response()
        }
        Err(e) => {
            let status = match e {
                RegistryError::UnknownOutput(_) => StatusCode::NOT_FOUND,
                RegistryError::ArityMismatch { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let message = e.to_string();
            record(&state, &req.output, duration_ms, Some(message.clone())).await;
            error_response(status, &message)
        }
    }
}

/// Arrange request values in the callback's declared input order. Unknown
/// outputs fall through so `dispatch` reports them.
#[allow(clippy::result_large_err)]
fn ordered_args(state: &DashboardState, req: &UpdateRequest) -> Result<Vec<Value>, Response> {
    let Some(callback) = state.app.registry().get(&req.output) else {
        return Ok(req.inputs.iter().map(|i| i.value.clone()).collect());
    };

    callback
        .inputs
        .iter()
        .map(|declared| {
            req.inputs
                .iter()
                .find(|i| i.id == declared.component_id && i.property == declared.property)
                .map(|i| i.value.clone())
                .ok_or_else(|| {
                    error_response(
                        StatusCode::BAD_REQUEST,
                        &format!("missing input {} for {}", declared.key(), req.output),
                    )
                })
        })
        .collect()
}

async fn record(state: &DashboardState, output: &str, duration_ms: u64, error: Option<String>) {
    let success = error.is_none();
    {
        let mut m = state.metrics.write().await;
        m.record(success);
    }
    if let Some(logger) = state.app.logger() {
        let detail = error.clone().unwrap_or_else(|| format!("{}ms", duration_ms));
        let _ = logger.log_invocation(output, success, &detail);
    }
    state.broadcast(CallbackEvent::Invoked {
        output: output.to_string(),
        success,
        duration_ms,
        error,
    });
}

// ── GET /api/stats — callback metrics as JSON ────────────────────────

#[derive(Serialize)]
pub struct StatsResponse {
    pub callbacks: usize,
    pub total_calls: usize,
    pub successful_calls: usize,
    pub failed_calls: usize,
    pub success_rate: f64,
}

pub async fn get_stats(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let m = state.metrics.read().await;
    Json(StatsResponse {
        callbacks: state.app.registry().len(),
        total_calls: m.total_calls,
        successful_calls: m.successful_calls,
        failed_calls: m.failed_calls,
        success_rate: m.success_rate(),
    })
}

// ── Helpers ──────────────────────────────────────────────────────────

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
