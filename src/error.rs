//! # Errores del Núcleo
//! src/error.rs
//!
//! Taxonomía de errores de las capas de trabajo:
//! - `SubmitError`: lo que devuelve la cola del pool al encolar
//! - `DispatchError`: lo que ve quien llama al dispatcher (y el HTTP)
//! - `PoolError`: errores de ciclo de vida del pool
//! - `ConfigError`: configuración inválida al arrancar
//!
//! Las fallas de procesamiento (`ProcessingFault`) no están aquí: viajan
//! dentro de cada `WorkResult` y nunca se propagan como error.

/// Error al encolar un item en el pool
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// La cola siguió llena hasta que venció el timeout
    #[error("queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// El pool ya no acepta items (shutdown en curso o terminado)
    #[error("pool is closed")]
    Closed,

    /// El token de cancelación se disparó
    #[error("submission canceled")]
    Canceled,
}

/// Error devuelto por `Dispatcher::dispatch`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Payload malformado, rechazado antes de tocar el pool
    #[error("invalid request: {0}")]
    Validation(String),

    /// Cola llena: quien llama debe reintentar o descartar
    #[error("server busy: queue is full (capacity {capacity})")]
    Backpressure { capacity: usize },

    #[error("server is shutting down")]
    Shutdown,

    #[error("request canceled")]
    Canceled,
}

impl From<SubmitError> for DispatchError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::QueueFull { capacity } => DispatchError::Backpressure { capacity },
            SubmitError::Closed => DispatchError::Shutdown,
            SubmitError::Canceled => DispatchError::Canceled,
        }
    }
}

/// Errores de ciclo de vida del pool
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("pool already started")]
    AlreadyStarted,

    #[error("pool is stopped")]
    Stopped,

    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// Configuración inválida detectada en `Config::validate`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("could not find port")]
    MissingPort,

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("{field} must be >= 1")]
    Zero { field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_error_maps_to_dispatch_error() {
        assert_eq!(
            DispatchError::from(SubmitError::QueueFull { capacity: 8 }),
            DispatchError::Backpressure { capacity: 8 }
        );
        assert_eq!(DispatchError::from(SubmitError::Closed), DispatchError::Shutdown);
        assert_eq!(DispatchError::from(SubmitError::Canceled), DispatchError::Canceled);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SubmitError::QueueFull { capacity: 2 }.to_string(),
            "queue is full (capacity 2)"
        );
        assert_eq!(
            DispatchError::Validation("missing task".into()).to_string(),
            "invalid request: missing task"
        );
        assert_eq!(ConfigError::MissingPort.to_string(), "could not find port");
        assert_eq!(
            ConfigError::Zero { field: "workers" }.to_string(),
            "workers must be >= 1"
        );
    }
}
