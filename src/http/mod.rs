//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Protocolo HTTP/1.0 implementado a mano:
//!
//! - Parsing de requests (request line, headers, body con `Content-Length`)
//! - Construcción de responses JSON
//! - Status codes
//!
//! Las conexiones no son persistentes: una request por conexión y
//! `Connection: close` en todas las respuestas.

pub mod request;
pub mod response;
pub mod status;

// Permite usar `http::Request` en vez de `http::request::Request`
pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
