//! # Política CORS
//! src/router/cors.rs
//!
//! Política fija del servicio:
//! - Orígenes: `https://*`, `http://*` (el `Origin` se devuelve tal cual si coincide)
//! - Métodos: GET, POST, PUT, DELETE, OPTIONS
//! - Headers: `*`
//! - Expuestos: `Link`
//! - Sin credenciales, max-age 300 s

use crate::http::{Method, Request, Response, StatusCode};

/// Configuración CORS
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    /// Patrones de origen; `*` es comodín
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<Method>,
    /// `*` acepta cualquier header pedido
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Segundos que el navegador puede cachear el preflight
    pub max_age: u32,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["https://*".to_string(), "http://*".to_string()],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ],
            allowed_headers: vec!["*".to_string()],
            exposed_headers: vec!["Link".to_string()],
            allow_credentials: false,
            max_age: 300,
        }
    }
}

impl CorsPolicy {
    /// ¿El origen coincide con algún patrón?
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|pattern| wildcard_match(pattern, origin))
    }

    /// Origen permitido del request, si lo hay
    fn allowed_origin<'a>(&self, request: &'a Request) -> Option<&'a str> {
        request
            .header("Origin")
            .filter(|origin| self.is_origin_allowed(origin))
    }

    /// Headers CORS de una respuesta normal (no preflight)
    pub fn apply(&self, request: &Request, response: &mut Response) {
        let Some(origin) = self.allowed_origin(request) else {
            return;
        };

        response.add_header("Access-Control-Allow-Origin", origin);
        response.add_header("Vary", "Origin");
        if self.allow_credentials {
            response.add_header("Access-Control-Allow-Credentials", "true");
        }
        if !self.exposed_headers.is_empty() {
            response.add_header("Access-Control-Expose-Headers", &self.exposed_headers.join(", "));
        }
    }

    /// Respuesta a un `OPTIONS` (204 siempre; los headers sólo si el
    /// origen y el método pedidos están permitidos)
    pub fn preflight(&self, request: &Request) -> Response {
        let mut response = Response::new(StatusCode::NoContent);

        let Some(origin) = self.allowed_origin(request) else {
            return response;
        };

        let requested_method = request.header("Access-Control-Request-Method");
        let method_allowed = match requested_method {
            Some(method) => self
                .allowed_methods
                .iter()
                .any(|m| m.as_str().eq_ignore_ascii_case(method.trim())),
            None => true,
        };
        if !method_allowed {
            return response;
        }

        response.add_header("Access-Control-Allow-Origin", origin);
        response.add_header("Vary", "Origin");
        response.add_header(
            "Access-Control-Allow-Methods",
            &self
                .allowed_methods
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );

        let allow_headers = if self.allowed_headers.iter().any(|h| h == "*") {
            // Comodín: se devuelven los headers pedidos
            request
                .header("Access-Control-Request-Headers")
                .map(|h| h.to_string())
        } else if self.allowed_headers.is_empty() {
            None
        } else {
            Some(self.allowed_headers.join(", "))
        };
        if let Some(headers) = allow_headers {
            response.add_header("Access-Control-Allow-Headers", &headers);
        }

        if self.allow_credentials {
            response.add_header("Access-Control-Allow-Credentials", "true");
        }
        if self.max_age > 0 {
            response.add_header("Access-Control-Max-Age", &self.max_age.to_string());
        }

        response
    }
}

/// Match con un único `*` como comodín
fn wildcard_match(pattern: &str, value: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            value.len() >= prefix.len() + suffix.len()
                && value.starts_with(prefix)
                && value.ends_with(suffix)
        }
        None => pattern == value,
    }
}
