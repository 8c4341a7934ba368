//! Test endpoints: health, echo, injected latency and injected failures.
//!
//! Failures are reported two ways: the status code the client sees, and an
//! error recorded in the [`RequestContext`] for the request log.

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::SimulationConfig;
use crate::observability::RequestContext;

/// Body accepted by every `/test/*` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TestRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Body returned by every `/test/*` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TestResponse {
    pub success: bool,
    pub message: String,
    pub response_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TestRequest>,
}

impl TestResponse {
    fn ok(message: &str, response_time_ms: u64, data: TestRequest) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            response_time_ms,
            data: Some(data),
        }
    }

    fn failed(message: String, response_time_ms: u64) -> Self {
        Self {
            success: false,
            message,
            response_time_ms,
            data: None,
        }
    }
}

/// Failure injected by a test endpoint.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SimulatedError(String);

/// Status codes `/test/random` picks from when it fails.
pub const RANDOM_ERROR_STATUSES: [StatusCode; 6] = [
    StatusCode::BAD_REQUEST,
    StatusCode::UNAUTHORIZED,
    StatusCode::FORBIDDEN,
    StatusCode::NOT_FOUND,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::SERVICE_UNAVAILABLE,
];

/// Routes of the test server, without any middleware.
pub fn routes(simulation: SimulationConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(root))
        .route("/test/echo", post(echo))
        .route("/test/delay", post(delay))
        .route("/test/error", post(error))
        .route("/test/random", post(random))
        .fallback(not_found)
        .with_state(simulation)
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn root() -> Json<Value> {
    Json(serde_json::json!({ "message": "DevOps infrastructure test server is running!" }))
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))).into_response()
}

fn bad_request(rejection: JsonRejection) -> Response {
    let message = format!("invalid request format: {}", rejection.body_text());
    let body = TestResponse::failed(message, 0);
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn random_below(max_ms: u64) -> u64 {
    if max_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..max_ms)
    }
}

fn roll(probability: f64) -> bool {
    rand::thread_rng().gen::<f64>() < probability
}

async fn echo(payload: Result<Json<TestRequest>, JsonRejection>) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return bad_request(rejection),
    };

    Json(TestResponse::ok("echo response", 0, req)).into_response()
}

async fn delay(
    State(sim): State<SimulationConfig>,
    payload: Result<Json<TestRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return bad_request(rejection),
    };

    let delay_ms = random_below(sim.delay_max_ms);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    Json(TestResponse::ok("delayed response", delay_ms, req)).into_response()
}

async fn error(
    State(sim): State<SimulationConfig>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<TestRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return bad_request(rejection),
    };

    if roll(sim.error_probability) {
        let err = SimulatedError("random error occurred".to_string());
        let body = TestResponse::failed(err.to_string(), 0);
        tracing::debug!(request_id = %ctx.request_id(), "Injecting failure");
        ctx.record_error(err);
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    }

    Json(TestResponse::ok("normal response", 0, req)).into_response()
}

async fn random(
    State(sim): State<SimulationConfig>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<TestRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return bad_request(rejection),
    };

    let delay_ms = random_below(sim.random_delay_max_ms);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    if roll(sim.random_error_probability) {
        let index = rand::thread_rng().gen_range(0..RANDOM_ERROR_STATUSES.len());
        let status = RANDOM_ERROR_STATUSES[index];
        let message = format!(
            "random error occurred (status: {})",
            status.canonical_reason().unwrap_or("unknown")
        );
        tracing::debug!(request_id = %ctx.request_id(), status = %status, "Injecting failure");
        ctx.record_error(SimulatedError(message.clone()));
        return (status, Json(TestResponse::failed(message, delay_ms))).into_response();
    }

    Json(TestResponse::ok("random test normal response", delay_ms, req)).into_response()
}
