//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! API para construir respuestas HTTP/1.0 y convertirlas a bytes.
//!
//! ## Formato de una respuesta
//!
//! ```text
//! HTTP/1.0 400 Bad Request\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 32\r\n
//! \r\n
//! {"error":"something went wrong"}
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use work_server::http::{Response, StatusCode};
//!
//! let response = Response::error(StatusCode::BadRequest, "something went wrong");
//! assert_eq!(response.body(), br#"{"error":"something went wrong"}"#);
//! ```

use super::StatusCode;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;

/// Body que se manda si falla la serialización de una respuesta
const SERIALIZATION_FAILURE: &str = r#"{"error":"internal server error"}"#;

/// Respuesta HTTP completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// Headers ordenados por nombre (salida determinística)
    headers: BTreeMap<String, String>,

    body: Vec<u8>,
}

impl Response {
    /// Respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header (si ya existe, se sobrescribe)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de `with_header`
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el body y el header `Content-Length`
    pub fn with_body(self, body: &str) -> Self {
        self.with_body_bytes(body.as_bytes().to_vec())
    }

    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());
        self
    }

    /// Respuesta JSON 200 a partir de un string ya serializado
    pub fn json(body: &str) -> Self {
        Self::json_raw(StatusCode::Ok, body)
    }

    fn json_raw(status: StatusCode, body: &str) -> Self {
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }

    /// Serializa `value` como body JSON
    ///
    /// Si la serialización falla responde 500 con un body genérico.
    pub fn json_value<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::json_raw(status, &body),
            Err(e) => {
                error!("no se pudo serializar la respuesta: {}", e);
                Self::json_raw(StatusCode::InternalServerError, SERIALIZATION_FAILURE)
            }
        }
    }

    /// Respuesta de error: `{"error":"mensaje"}`
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json_value(status, &serde_json::json!({ "error": message }))
    }

    /// Convierte la respuesta a bytes listos para el socket
    ///
    /// - Status line: `HTTP/1.0 200 OK\r\n`
    /// - Headers: `Header-Name: Value\r\n`
    /// - Línea vacía: `\r\n`
    /// - Body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(128 + self.body.len());

        result.extend_from_slice(format!("HTTP/1.0 {}\r\n", self.status).as_bytes());

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);

        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
