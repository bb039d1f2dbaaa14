//! # Handlers HTTP
//! src/api/handlers.rs
//!
//! Endpoints bajo `/v1`:
//! - `GET  /healthz`
//! - `GET  /err`
//! - `GET  /status`
//! - `POST /jobs`
//! - `GET  /jobs/result?id=ID`

use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::http::{Request, Response, StatusCode};
use crate::results::ResultLog;
use crate::status::{HealthReporter, Reporter, StatusSnapshot};
use crate::work::{ItemId, Payload, WorkResult};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Estado compartido por los handlers
pub struct ApiState {
    pub dispatcher: Arc<Dispatcher>,
    pub reporter: Arc<HealthReporter>,
    pub results: Arc<ResultLog>,
    /// Valor del header `Retry-After` (segundos) con backpressure
    pub retry_after_secs: u64,
}

/// Handler para /v1/healthz
///
/// 200 `{}` mientras el pool acepta trabajo; 503 cuando se está apagando.
pub fn healthz_handler(_req: &Request, state: &ApiState) -> Response {
    if state.reporter.is_ready() {
        Response::json_value(StatusCode::Ok, &json!({}))
    } else {
        Response::error(StatusCode::ServiceUnavailable, "shutting down")
    }
}

/// Handler para /v1/err: siempre 400
pub fn err_handler(_req: &Request) -> Response {
    Response::error(StatusCode::BadRequest, "something went wrong")
}

#[derive(Serialize)]
struct StatusBody<'a> {
    #[serde(flatten)]
    snapshot: &'a StatusSnapshot,
    counters: BTreeMap<String, u64>,
}

/// Handler para /v1/status
///
/// # Ejemplo de response
/// ```json
/// {"accepted": 10, "completed": 9, "failed": 1, "queue_depth": 0,
///  "queue_capacity": 64, "in_flight": 0, "workers": 4, "pool_open": true,
///  "phase": "running", "counters": {"dispatch.accepted": 10, ...}}
/// ```
pub fn status_handler(_req: &Request, state: &ApiState) -> Response {
    let snapshot = state.reporter.status();
    let body = StatusBody {
        snapshot: &snapshot,
        counters: state.reporter.counters().snapshot(),
    };
    Response::json_value(StatusCode::Ok, &body)
}

/// Handler para POST /v1/jobs
///
/// Body: `{"task": "fibonacci", "params": {"num": "10"}}`
///
/// # Ejemplo de response (202)
/// ```json
/// {"id": "item-0000000000000001", "status": "queued"}
/// ```
pub fn submit_handler(req: &Request, state: &ApiState) -> Response {
    let payload: Payload = match serde_json::from_slice(req.body()) {
        Ok(payload) => payload,
        Err(e) => {
            return Response::error(StatusCode::BadRequest, &format!("Invalid JSON body: {}", e));
        }
    };

    match state.dispatcher.dispatch(payload) {
        Ok(id) => Response::json_value(
            StatusCode::Accepted,
            &json!({ "id": id, "status": "queued" }),
        ),
        Err(err) => dispatch_error_response(&err, state.retry_after_secs),
    }
}

/// Convierte un `DispatchError` en respuesta HTTP
pub fn dispatch_error_response(err: &DispatchError, retry_after_secs: u64) -> Response {
    match err {
        DispatchError::Validation(reason) => Response::error(StatusCode::BadRequest, reason),
        DispatchError::Backpressure { .. } => {
            Response::error(StatusCode::ServiceUnavailable, &err.to_string())
                .with_header("Retry-After", &retry_after_secs.to_string())
        }
        DispatchError::Shutdown | DispatchError::Canceled => {
            Response::error(StatusCode::ServiceUnavailable, &err.to_string())
        }
    }
}

/// Handler para /v1/jobs/result?id=ID
///
/// # Ejemplo de response
/// ```json
/// {"id": "item-0000000000000001", "task": "fibonacci", "worker": 2,
///  "status": "done", "result": {"num": 10, "result": 55}, "latency_ms": 0}
/// ```
pub fn result_handler(req: &Request, state: &ApiState) -> Response {
    let raw_id = match req.query_param("id") {
        Some(id) => id,
        None => {
            return Response::error(StatusCode::BadRequest, "Missing required parameter: id");
        }
    };

    let id: ItemId = match raw_id.parse() {
        Ok(id) => id,
        Err(e) => return Response::error(StatusCode::BadRequest, &e),
    };

    match state.results.get(id) {
        Some(result) => Response::json_value(StatusCode::Ok, &result_body(&result)),
        None => Response::error(
            StatusCode::NotFound,
            &format!("Result not found (pending or expired): {}", id),
        ),
    }
}

fn result_body(result: &WorkResult) -> Value {
    let mut body = json!({
        "id": result.item_id,
        "task": result.task,
        "worker": result.worker,
        "latency_ms": result.latency_ms(),
    });

    let extra = match &result.outcome {
        Ok(value) => json!({ "status": "done", "result": value }),
        Err(fault) => json!({
            "status": "failed",
            "error": fault.public_message(),
            "kind": fault.kind(),
        }),
    };

    if let (Value::Object(body), Value::Object(extra)) = (&mut body, extra) {
        body.extend(extra);
    }
    body
}
