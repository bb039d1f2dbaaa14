//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración con soporte para argumentos CLI y variables de entorno.
//! `main` carga antes un `.env` (si existe), así que cualquier variable
//! también puede venir de ahí.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./work_server --port 8080 --workers 8 --queue-capacity 128
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! PORT=8080 WORKERS=8 LOG_LEVEL=debug ./work_server
//! ```

use crate::error::ConfigError;
use clap::Parser;
use tracing::info;

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "work_server")]
#[command(about = "Núcleo concurrente de procesamiento de requests con API HTTP/JSON")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor (obligatorio)
    #[arg(short, long, env = "PORT")]
    pub port: String,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    // === Pool ===

    /// Número de workers
    #[arg(long, default_value = "4", env = "WORKERS")]
    pub workers: usize,

    /// Capacidad máxima de la cola
    #[arg(long = "queue-capacity", default_value = "64", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Cuánto espera un submit con la cola llena antes de rechazar (0 = no espera)
    #[arg(long = "submit-timeout-ms", default_value = "100", env = "SUBMIT_TIMEOUT_MS")]
    pub submit_timeout_ms: u64,

    /// Tiempo de reintento sugerido (header Retry-After) cuando hay backpressure
    #[arg(long = "retry-after-ms", default_value = "1000", env = "RETRY_AFTER_MS")]
    pub retry_after_ms: u64,

    // === Servidor ===

    /// Máximo de conexiones concurrentes; las demás reciben 503
    #[arg(long = "max-connections", default_value = "256", env = "MAX_CONNECTIONS")]
    pub max_connections: usize,

    /// Cuántos resultados recientes se guardan para `GET /v1/jobs/result`
    #[arg(long = "result-log-capacity", default_value = "1024", env = "RESULT_LOG_CAPACITY")]
    pub result_log_capacity: usize,

    // === Logging ===

    /// Nivel de log (RUST_LOG tiene prioridad)
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Logs en formato JSON
    #[arg(long = "log-json", default_value_t = false, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    /// Parsea argumentos CLI y variables de entorno
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use work_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port.trim())
    }

    /// Puerto ya parseado
    pub fn port_number(&self) -> Result<u16, ConfigError> {
        let port = self.port.trim();
        if port.is_empty() {
            return Err(ConfigError::MissingPort);
        }
        port.parse()
            .map_err(|_| ConfigError::InvalidPort(port.to_string()))
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.port_number()?;

        let positive = [
            ("workers", self.workers),
            ("queue capacity", self.queue_capacity),
            ("max connections", self.max_connections),
            ("result log capacity", self.result_log_capacity),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }

        Ok(())
    }

    /// Loguea la configuración efectiva
    pub fn log_summary(&self) {
        info!(address = %self.address(), "configuración de red");
        info!(
            workers = self.workers,
            queue_capacity = self.queue_capacity,
            submit_timeout_ms = self.submit_timeout_ms,
            retry_after_ms = self.retry_after_ms,
            "configuración del pool"
        );
        info!(
            max_connections = self.max_connections,
            result_log_capacity = self.result_log_capacity,
            log_level = %self.log_level,
            log_json = self.log_json,
            "configuración del servidor"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto (puerto 8080)
    fn default() -> Self {
        Self {
            port: "8080".to_string(),
            host: "0.0.0.0".to_string(),
            workers: 4,
            queue_capacity: 64,
            submit_timeout_ms: 100,
            retry_after_ms: 1_000,
            max_connections: 256,
            result_log_capacity: 1024,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}
