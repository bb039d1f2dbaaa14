//! # Reporter de Estado
//! src/status.rs
//!
//! Vista de sólo lectura del estado del proceso. Lee el `CounterStore` (read
//! lock) y los atómicos/cola del pool; nunca modifica nada.

use crate::metrics::{store, CounterStore};
use crate::work::{PoolPhase, WorkerPool};
use serde::Serialize;
use std::sync::Arc;

/// Foto del estado en un instante
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub accepted: u64,
    pub completed: u64,
    pub failed: u64,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub in_flight: usize,
    pub workers: usize,
    pub pool_open: bool,
    pub phase: PoolPhase,
}

/// Capacidad de reportar estado
pub trait Reporter: Send + Sync {
    fn status(&self) -> StatusSnapshot;

    /// ¿Puede el proceso aceptar trabajo?
    fn is_ready(&self) -> bool;
}

/// Reporter sobre el pool y los contadores compartidos
pub struct HealthReporter {
    counters: Arc<CounterStore>,
    pool: Arc<WorkerPool>,
}

impl HealthReporter {
    pub fn new(counters: Arc<CounterStore>, pool: Arc<WorkerPool>) -> Self {
        Self { counters, pool }
    }

    pub fn counters(&self) -> &CounterStore {
        &self.counters
    }
}

impl Reporter for HealthReporter {
    fn status(&self) -> StatusSnapshot {
        let (queue_depth, in_flight) = self.pool.load();
        StatusSnapshot {
            accepted: self.counters.value(store::ACCEPTED),
            completed: self.counters.value(store::COMPLETED),
            failed: self.counters.value(store::FAILED),
            queue_depth,
            queue_capacity: self.pool.capacity(),
            in_flight,
            workers: self.pool.worker_count(),
            pool_open: self.pool.is_accepting(),
            phase: self.pool.phase(),
        }
    }

    fn is_ready(&self) -> bool {
        self.pool.is_accepting()
            && matches!(self.pool.phase(), PoolPhase::Idle | PoolPhase::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::{CancellationToken, PoolConfig};

    fn reporter() -> (HealthReporter, Arc<CounterStore>, Arc<WorkerPool>) {
        let counters = Arc::new(CounterStore::new());
        let pool = Arc::new(WorkerPool::new(
            PoolConfig {
                workers: 3,
                queue_capacity: 10,
                submit_timeout: None,
            },
            CancellationToken::new(),
        ));
        (
            HealthReporter::new(Arc::clone(&counters), Arc::clone(&pool)),
            counters,
            pool,
        )
    }

    #[test]
    fn test_status_reflects_counters_and_pool() {
        let (reporter, counters, _pool) = reporter();
        counters.add(store::ACCEPTED, 5);
        counters.add(store::COMPLETED, 3);
        counters.increment(store::FAILED);

        let status = reporter.status();
        assert_eq!(
            status,
            StatusSnapshot {
                accepted: 5,
                completed: 3,
                failed: 1,
                queue_depth: 0,
                queue_capacity: 10,
                in_flight: 0,
                workers: 3,
                pool_open: true,
                phase: PoolPhase::Idle,
            }
        );
    }

    #[test]
    fn test_status_does_not_mutate() {
        let (reporter, counters, _pool) = reporter();
        let _ = reporter.status();
        let _ = reporter.status();
        assert!(counters.is_empty());
    }

    #[test]
    fn test_not_ready_after_shutdown() {
        let (reporter, _counters, pool) = reporter();
        assert!(reporter.is_ready());

        pool.shutdown();
        assert!(!reporter.is_ready());

        let status = reporter.status();
        assert!(!status.pool_open);
        assert_eq!(status.phase, PoolPhase::Stopped);
        assert_eq!(status.queue_depth, 0);
    }

    #[test]
    fn test_snapshot_serializes_phase_lowercase() {
        let (reporter, _counters, _pool) = reporter();
        let json = serde_json::to_value(reporter.status()).unwrap();
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["pool_open"], true);
    }
}
