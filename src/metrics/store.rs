//! # Store de Contadores
//! src/metrics/store.rs
//!
//! Mapa `clave → contador` seguro para concurrencia. Toda la lectura-
//! modificación-escritura de un incremento ocurre bajo el lock exclusivo,
//! así que incrementos concurrentes sobre la misma clave nunca se pierden.
//! Las lecturas toman el lock compartido y pueden correr en paralelo.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Items aceptados por el dispatcher
pub const ACCEPTED: &str = "dispatch.accepted";
/// Payloads rechazados por validación
pub const REJECTED_INVALID: &str = "dispatch.rejected.invalid";
/// Rechazados porque la cola estaba llena
pub const REJECTED_BUSY: &str = "dispatch.rejected.busy";
/// Rechazados porque el pool estaba cerrando
pub const REJECTED_SHUTDOWN: &str = "dispatch.rejected.shutdown";
/// Rechazados por cancelación
pub const REJECTED_CANCELED: &str = "dispatch.rejected.canceled";
/// Resultados exitosos que llegaron al sink
pub const COMPLETED: &str = "results.completed";
/// Resultados con falla de procesamiento
pub const FAILED: &str = "results.failed";

/// Clave del contador por tarea (`task.fibonacci`, ...)
pub fn task_key(task: &str) -> String {
    format!("task.{}", task)
}

/// Clave del contador por código HTTP (`http.status.200`, ...)
pub fn http_status_key(code: u16) -> String {
    format!("http.status.{}", code)
}

/// Contadores protegidos por un lock de lectura/escritura
#[derive(Debug, Default)]
pub struct CounterStore {
    counts: RwLock<HashMap<String, u64>>,
}

impl CounterStore {
    /// Crea un store vacío
    pub fn new() -> Self {
        Self::default()
    }

    /// Incrementa en 1 el contador de `key` (lo crea en 0 si no existe)
    pub fn increment(&self, key: &str) {
        self.add(key, 1);
    }

    /// Suma `n` al contador de `key`
    pub fn add(&self, key: &str, n: u64) {
        let mut counts = self.counts.write();
        // Evitar allocar la clave cuando ya existe
        if let Some(count) = counts.get_mut(key) {
            *count = count.saturating_add(n);
        } else {
            counts.insert(key.to_string(), n);
        }
    }

    /// Valor actual del contador (0 si no existe)
    pub fn value(&self, key: &str) -> u64 {
        self.counts.read().get(key).copied().unwrap_or(0)
    }

    /// Copia consistente de todos los contadores, ordenada por clave
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        let counts = self.counts.read();
        counts.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    /// Número de claves distintas
    pub fn len(&self) -> usize {
        self.counts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
