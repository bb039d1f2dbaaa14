//! # Trait Processor
//! src/work/processor.rs
//!
//! Capacidad que el pool necesita para ejecutar trabajo. El dispatcher usa
//! `validate` antes de encolar; los workers usan `process`.

use crate::work::item::{Payload, ProcessingFault, WorkItem};
use serde_json::Value;

/// Lógica de negocio que ejecutan los workers
pub trait Processor: Send + Sync + 'static {
    /// Valida el payload antes de encolarlo. Por defecto acepta todo.
    fn validate(&self, _payload: &Payload) -> Result<(), String> {
        Ok(())
    }

    /// Procesa un item. Un `Err` (o un panic) se convierte en un
    /// `WorkResult` fallido; nunca detiene al worker.
    fn process(&self, item: &WorkItem) -> Result<Value, ProcessingFault>;
}

/// Cualquier closure con la firma adecuada es un processor (útil en tests)
impl<F> Processor for F
where
    F: Fn(&WorkItem) -> Result<Value, ProcessingFault> + Send + Sync + 'static,
{
    fn process(&self, item: &WorkItem) -> Result<Value, ProcessingFault> {
        self(item)
    }
}
