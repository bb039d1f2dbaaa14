//! # Sink de Resultados
//! src/results.rs
//!
//! Último eslabón del pipeline: consume el canal unificado del fan-in,
//! actualiza contadores y guarda los resultados recientes en un log acotado
//! (los más viejos se descartan primero).

use crate::metrics::{store, CounterStore};
use crate::work::{ItemId, WorkResult};
use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

struct LogState {
    results: HashMap<ItemId, WorkResult>,
    /// Orden de llegada, para desalojar el más viejo
    order: VecDeque<ItemId>,
}

/// Log acotado de resultados recientes
pub struct ResultLog {
    state: Mutex<LogState>,
    capacity: usize,
}

impl ResultLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LogState {
                results: HashMap::with_capacity(capacity.min(4096)),
                order: VecDeque::with_capacity(capacity.min(4096)),
            }),
            capacity,
        }
    }

    /// Guarda un resultado, desalojando el más viejo si está lleno
    pub fn record(&self, result: WorkResult) {
        if self.capacity == 0 {
            return;
        }

        let mut state = self.state.lock();
        let id = result.item_id;

        if state.results.insert(id, result).is_none() {
            state.order.push_back(id);
        }

        while state.order.len() > self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.results.remove(&oldest);
            }
        }
    }

    pub fn get(&self, id: ItemId) -> Option<WorkResult> {
        self.state.lock().results.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Lanza el thread que consume `merged` hasta que se cierra. El handle
/// devuelve cuántos resultados se registraron.
pub fn spawn_sink(
    merged: Receiver<WorkResult>,
    counters: Arc<CounterStore>,
    log: Arc<ResultLog>,
) -> io::Result<JoinHandle<u64>> {
    thread::Builder::new()
        .name("result-sink".to_string())
        .spawn(move || {
            let mut recorded: u64 = 0;

            for result in merged.iter() {
                let outcome_key = if result.is_success() {
                    store::COMPLETED
                } else {
                    store::FAILED
                };
                counters.increment(outcome_key);
                counters.increment(&store::task_key(&result.task));

                debug!(
                    item = %result.item_id,
                    worker = result.worker,
                    success = result.is_success(),
                    latency_ms = result.latency_ms(),
                    "resultado recibido"
                );

                log.record(result);
                recorded += 1;
            }

            info!(recorded, "sink de resultados terminado");
            recorded
        })
}
