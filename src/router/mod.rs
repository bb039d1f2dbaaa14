//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea (método, path) a handlers.
//!
//! ```text
//! Request → Router → Handler → Response (+ headers comunes y CORS)
//! ```
//!
//! - Path desconocido → 404
//! - Path conocido con otro método → 405 (con header `Allow`)
//! - `OPTIONS` a cualquier path → preflight CORS (204)
//! - Un handler que hace panic → 500 sin detalle

pub mod cors;

pub use cors::CorsPolicy;

use crate::http::{Method, Request, Response, StatusCode};
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// Un handler recibe un Request y retorna una Response. Puede capturar
/// estado compartido (por eso no es un simple `fn`).
pub type Handler = Box<dyn Fn(&Request) -> Response + Send + Sync>;

struct Route {
    method: Method,
    path: String,
    handler: Handler,
}

/// Router que mapea rutas a handlers
pub struct Router {
    routes: Vec<Route>,
    cors: CorsPolicy,
}

impl Router {
    /// Router vacío con la política CORS por defecto
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            cors: CorsPolicy::default(),
        }
    }

    /// Registra una ruta
    ///
    /// # Ejemplo
    /// ```
    /// use work_server::router::Router;
    /// use work_server::http::{Method, Response};
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/hello", |_req| Response::json(r#"{"message":"hello"}"#));
    /// ```
    pub fn register<F>(&mut self, method: Method, path: &str, handler: F)
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            handler: Box::new(handler),
        });
    }

    pub fn get<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.register(Method::GET, path, handler);
    }

    pub fn post<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.register(Method::POST, path, handler);
    }

    /// Monta todas las rutas de `sub` bajo `prefix` (ej: "/v1")
    pub fn mount(&mut self, prefix: &str, sub: Router) {
        let prefix = prefix.trim_end_matches('/');
        for route in sub.routes {
            self.routes.push(Route {
                path: format!("{}{}", prefix, route.path),
                ..route
            });
        }
    }

    /// Encuentra y ejecuta el handler apropiado
    pub fn route(&self, request: &Request) -> Response {
        let mut response = self.dispatch(request);
        self.add_common_headers(request, &mut response);
        response
    }

    fn dispatch(&self, request: &Request) -> Response {
        if request.method() == Method::OPTIONS {
            return self.cors.preflight(request);
        }

        let path = request.path();
        let mut same_path = self.routes.iter().filter(|r| r.path == path).peekable();

        if same_path.peek().is_none() {
            return Response::error(StatusCode::NotFound, &format!("Route not found: {}", path));
        }

        let mut allowed = Vec::new();
        for route in same_path {
            if route.method == request.method() {
                return Self::call(route, request);
            }
            allowed.push(route.method.as_str());
        }

        Response::error(
            StatusCode::MethodNotAllowed,
            &format!("Method {} not allowed for {}", request.method(), path),
        )
        .with_header("Allow", &allowed.join(", "))
    }

    /// Ejecuta el handler aislando panics
    fn call(route: &Route, request: &Request) -> Response {
        match panic::catch_unwind(AssertUnwindSafe(|| (route.handler)(request))) {
            Ok(response) => response,
            Err(_) => {
                error!(method = %request.method(), path = %route.path, "panic en handler");
                Response::error(StatusCode::InternalServerError, "internal server error")
            }
        }
    }

    /// Headers comunes a todas las respuestas
    fn add_common_headers(&self, request: &Request, response: &mut Response) {
        response.add_header("Server", "work_server/HTTP-1.0");
        response.add_header("Connection", "close");
        self.cors.apply(request, response);
    }

    /// Número de rutas registradas
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
