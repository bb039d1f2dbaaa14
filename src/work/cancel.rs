//! # Token de Cancelación
//! src/work/cancel.rs
//!
//! Token clonable que se propaga dispatcher → pool → workers → fan-in.
//! Además del flag atómico expone un `Receiver` que se desconecta al
//! cancelar, para poder esperarlo dentro de un `Select` junto a otros canales.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Inner {
    canceled: AtomicBool,
    /// Se suelta (drop) al cancelar: eso desconecta `signal`
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

/// Token de cancelación cooperativa
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (trigger, signal) = channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                canceled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Dispara la cancelación. Idempotente.
    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::Release);
        self.inner.trigger.lock().take();
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::Acquire)
    }

    /// Canal que queda "listo" (desconectado) cuando se cancela.
    /// Nunca entrega mensajes.
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("canceled", &self.is_canceled())
            .finish()
    }
}
