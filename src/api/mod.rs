//! # API HTTP
//! src/api/mod.rs
//!
//! Arma el router de la aplicación: todas las rutas se montan bajo `/v1`.

pub mod handlers;

pub use handlers::ApiState;

use crate::router::Router;
use std::sync::Arc;

/// Prefijo de versión de la API
pub const API_PREFIX: &str = "/v1";

/// Router completo de la API
pub fn router(state: Arc<ApiState>) -> Router {
    let mut v1 = Router::new();

    let s = Arc::clone(&state);
    v1.get("/healthz", move |req| handlers::healthz_handler(req, &s));

    v1.get("/err", handlers::err_handler);

    let s = Arc::clone(&state);
    v1.get("/status", move |req| handlers::status_handler(req, &s));

    let s = Arc::clone(&state);
    v1.post("/jobs", move |req| handlers::submit_handler(req, &s));

    let s = state;
    v1.get("/jobs/result", move |req| handlers::result_handler(req, &s));

    let mut root = Router::new();
    root.mount(API_PREFIX, v1);
    root
}
