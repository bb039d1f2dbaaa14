//! # Dispatcher de Requests
//! src/dispatch.rs
//!
//! Punto de entrada al pool: valida el payload, asigna el id y encola.
//! Cada resultado (aceptado o el motivo del rechazo) se cuenta en el
//! `CounterStore`.

use crate::error::DispatchError;
use crate::metrics::{store, CounterStore};
use crate::work::{CancellationToken, ItemId, Payload, Processor, WorkItem, WorkerPool};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Dispatcher con backpressure
pub struct Dispatcher {
    processor: Arc<dyn Processor>,
    pool: Arc<WorkerPool>,
    counters: Arc<CounterStore>,
    next_id: AtomicU64,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        processor: Arc<dyn Processor>,
        pool: Arc<WorkerPool>,
        counters: Arc<CounterStore>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            processor,
            pool,
            counters,
            next_id: AtomicU64::new(1),
            cancel,
        }
    }

    /// Valida y encola un payload
    ///
    /// Bloquea como máximo el timeout de submit del pool. Un payload inválido
    /// se rechaza sin tocar el pool.
    pub fn dispatch(&self, payload: Payload) -> Result<ItemId, DispatchError> {
        if self.cancel.is_canceled() {
            self.counters.increment(store::REJECTED_CANCELED);
            return Err(DispatchError::Canceled);
        }

        if let Err(reason) = self.processor.validate(&payload) {
            self.counters.increment(store::REJECTED_INVALID);
            debug!(task = %payload.task, %reason, "payload rechazado");
            return Err(DispatchError::Validation(reason));
        }

        let id = ItemId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let task = payload.task.clone();

        match self.pool.submit(WorkItem::new(id, payload)) {
            Ok(()) => {
                self.counters.increment(store::ACCEPTED);
                debug!(item = %id, %task, "item encolado");
                Ok(id)
            }
            Err(err) => {
                let err = DispatchError::from(err);
                let key = match &err {
                    DispatchError::Backpressure { .. } => store::REJECTED_BUSY,
                    DispatchError::Shutdown => store::REJECTED_SHUTDOWN,
                    DispatchError::Canceled => store::REJECTED_CANCELED,
                    DispatchError::Validation(_) => store::REJECTED_INVALID,
                };
                self.counters.increment(key);
                warn!(item = %id, %task, "item rechazado: {}", err);
                Err(err)
            }
        }
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }
}
