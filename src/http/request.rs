//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Parser HTTP/1.0 (acepta request lines HTTP/1.1) escrito a mano.
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /v1/jobs HTTP/1.0\r\n
//! Host: localhost:8080\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 47\r\n
//! \r\n
//! {"task": "reverse", "params": {"text": "hola"}}
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path?query VERSION`
//! 2. **Headers**: Pares `Name: Value` (uno por línea, nombres sin distinguir mayúsculas)
//! 3. **Empty Line**: `\r\n` que separa headers del body
//! 4. **Body**: `Content-Length` bytes (o el resto del buffer si no hay header)

use std::collections::HashMap;

/// Tamaño máximo de la sección de headers
pub const MAX_HEADER_BYTES: usize = 16 * 1024;

/// Tamaño máximo del body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const HEADER_END: &[u8] = b"\r\n\r\n";

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    /// Preflight CORS
    OPTIONS,
}

impl Method {
    /// Parsea un método HTTP desde un string
    fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "OPTIONS" => Ok(Method::OPTIONS),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Path sin query (ej: "/v1/jobs/result")
    path: String,

    /// Query parameters ya decodificados
    query_params: HashMap<String, String>,

    /// Headers, con el nombre en minúsculas
    headers: HashMap<String, String>,

    version: String,

    body: Vec<u8>,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Incomplete HTTP request")]
    IncompleteRequest,

    #[error("Invalid request line format")]
    InvalidRequestLine,

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("Request too large")]
    TooLarge,

    #[error("Empty request")]
    EmptyRequest,
}

impl Request {
    /// Parsea un request completo desde bytes
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use work_server::http::Request;
    ///
    /// let raw = b"GET /v1/jobs/result?id=item-0000000000000001 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/v1/jobs/result");
    /// assert_eq!(request.query_param("id"), Some("item-0000000000000001"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let (head, rest) = match Self::header_end(buffer) {
            Some(end) => (&buffer[..end - HEADER_END.len()], &buffer[end..]),
            None => (buffer, &[][..]),
        };

        let head = std::str::from_utf8(head).map_err(|_| ParseError::InvalidRequestLine)?;
        if head.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = head.split("\r\n");
        let request_line = lines.next().ok_or(ParseError::IncompleteRequest)?;

        // 1. Request line
        let (method, path, query_params, version) = Self::parse_request_line(request_line)?;

        // 2. Headers
        let headers = Self::parse_headers(lines)?;

        // 3. Body
        let body = match Self::content_length_from(&headers)? {
            Some(len) if len > rest.len() => return Err(ParseError::IncompleteRequest),
            Some(len) => rest[..len].to_vec(),
            None => rest.to_vec(),
        };

        Ok(Request {
            method,
            path,
            query_params,
            headers,
            version,
            body,
        })
    }

    /// Posición justo después de `\r\n\r\n`, si ya llegó
    pub fn header_end(buffer: &[u8]) -> Option<usize> {
        buffer
            .windows(HEADER_END.len())
            .position(|w| w == HEADER_END)
            .map(|pos| pos + HEADER_END.len())
    }

    /// Cuántos bytes ocupa el request completo (headers + body), si los
    /// headers ya llegaron. Lo usa el servidor para saber cuándo dejar de leer.
    pub fn expected_len(buffer: &[u8]) -> Result<Option<usize>, ParseError> {
        let end = match Self::header_end(buffer) {
            Some(end) => end,
            None if buffer.len() > MAX_HEADER_BYTES => return Err(ParseError::TooLarge),
            None => return Ok(None),
        };

        let head = String::from_utf8_lossy(&buffer[..end]);
        let mut content_length = 0;
        for line in head.split("\r\n").skip(1) {
            if let Some((name, value)) = line.split_once(':') {
                if name.trim().eq_ignore_ascii_case("content-length") {
                    content_length = Self::parse_content_length(value)?;
                }
            }
        }

        if content_length > MAX_BODY_BYTES {
            return Err(ParseError::TooLarge);
        }
        Ok(Some(end + content_length))
    }

    /// Formato: `GET /path?query HTTP/1.0`
    fn parse_request_line(
        line: &str,
    ) -> Result<(Method, String, HashMap<String, String>, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        // METHOD PATH VERSION
        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = Method::parse(parts[0])?;
        let (path, query_params) = Self::parse_path_and_query(parts[1]);

        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        Ok((method, path, query_params, version))
    }

    /// "/result?id=abc" → ("/result", {"id": "abc"})
    fn parse_path_and_query(path_with_query: &str) -> (String, HashMap<String, String>) {
        match path_with_query.split_once('?') {
            Some((path, query)) => (path.to_string(), Self::parse_query_string(query)),
            None => (path_with_query.to_string(), HashMap::new()),
        }
    }

    /// "num=10&text=hola%20mundo" → {"num": "10", "text": "hola mundo"}
    fn parse_query_string(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter(|param| !param.is_empty())
            .map(|param| match param.split_once('=') {
                Some((key, value)) => (url_decode(key), url_decode(value)),
                // Parámetro sin valor (ej: "?debug")
                None => (url_decode(param), String::new()),
            })
            .collect()
    }

    fn parse_headers<'a>(
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.trim().is_empty() {
                break;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        Ok(headers)
    }

    fn content_length_from(headers: &HashMap<String, String>) -> Result<Option<usize>, ParseError> {
        headers
            .get("content-length")
            .map(|value| Self::parse_content_length(value))
            .transpose()
    }

    fn parse_content_length(value: &str) -> Result<usize, ParseError> {
        value
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidContentLength(value.trim().to_string()))
    }

    // === Accesores ===

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Header por nombre, sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Decodifica `%XX` y `+` de una query string
fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}
