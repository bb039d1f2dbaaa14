//! # Aplicación
//! src/app.rs
//!
//! Ensambla el pipeline completo:
//!
//! ```text
//! HTTP → Dispatcher → WorkerPool (N workers) → FanIn → sink → ResultLog
//!                                                        ↘ CounterStore
//! ```
//!
//! `App::start` arranca los threads; `App::shutdown` los drena y espera en
//! orden (pool, fan-in, sink).

use crate::api::{self, ApiState};
use crate::commands::TaskProcessor;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::metrics::CounterStore;
use crate::results::{self, ResultLog};
use crate::router::Router;
use crate::status::HealthReporter;
use crate::work::{CancellationToken, FanIn, PoolConfig, Processor, WorkerPool};
use anyhow::Context;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};

/// Cuántos resultados pasaron por cada etapa al apagar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub merged: u64,
    pub recorded: u64,
}

/// Convierte milisegundos al valor en segundos de `Retry-After` (mínimo 1)
pub fn retry_after_secs(retry_after_ms: u64) -> u64 {
    retry_after_ms.div_ceil(1000).max(1)
}

/// Pipeline en ejecución
pub struct App {
    pool: Arc<WorkerPool>,
    counters: Arc<CounterStore>,
    results: Arc<ResultLog>,
    cancel: CancellationToken,
    state: Arc<ApiState>,
    fan_in: Mutex<Option<JoinHandle<u64>>>,
    sink: Mutex<Option<JoinHandle<u64>>>,
}

impl App {
    /// Arranca el pipeline con el processor de tareas por defecto
    pub fn start(config: &Config) -> anyhow::Result<Self> {
        Self::start_with(config, Arc::new(TaskProcessor))
    }

    /// Arranca el pipeline con un processor arbitrario
    pub fn start_with(config: &Config, processor: Arc<dyn Processor>) -> anyhow::Result<Self> {
        let counters = Arc::new(CounterStore::new());
        let cancel = CancellationToken::new();
        let results = Arc::new(ResultLog::new(config.result_log_capacity));

        let pool = Arc::new(WorkerPool::new(
            PoolConfig::from_config(config),
            cancel.clone(),
        ));
        let outputs = pool
            .start(Arc::clone(&processor))
            .context("no se pudo iniciar el pool de workers")?;

        let (merged, fan_in) = FanIn::new(outputs, cancel.clone())
            .spawn()
            .context("no se pudo lanzar el fan-in")?;
        let sink = results::spawn_sink(merged, Arc::clone(&counters), Arc::clone(&results))
            .context("no se pudo lanzar el sink de resultados")?;

        let dispatcher = Arc::new(Dispatcher::new(
            processor,
            Arc::clone(&pool),
            Arc::clone(&counters),
            cancel.clone(),
        ));
        let reporter = Arc::new(HealthReporter::new(Arc::clone(&counters), Arc::clone(&pool)));

        let state = Arc::new(ApiState {
            dispatcher,
            reporter,
            results: Arc::clone(&results),
            retry_after_secs: retry_after_secs(config.retry_after_ms),
        });

        info!(workers = pool.worker_count(), capacity = pool.capacity(), "pipeline iniciado");

        Ok(Self {
            pool,
            counters,
            results,
            cancel,
            state,
            fan_in: Mutex::new(Some(fan_in)),
            sink: Mutex::new(Some(sink)),
        })
    }

    /// Router HTTP de la API (`/v1/...`) sobre este pipeline
    pub fn router(&self) -> Router {
        api::router(Arc::clone(&self.state))
    }

    pub fn counters(&self) -> Arc<CounterStore> {
        Arc::clone(&self.counters)
    }

    pub fn results(&self) -> &ResultLog {
        &self.results
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancela: los submits pendientes se rechazan y los workers drenan
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drena el pool y espera al fan-in y al sink. Idempotente: las llamadas
    /// siguientes devuelven un reporte vacío.
    pub fn shutdown(&self) -> ShutdownReport {
        self.pool.shutdown();

        let mut report = ShutdownReport::default();

        if let Some(handle) = self.fan_in.lock().take() {
            match handle.join() {
                Ok(merged) => report.merged = merged,
                Err(_) => warn!("el thread de fan-in terminó con panic"),
            }
        }
        if let Some(handle) = self.sink.lock().take() {
            match handle.join() {
                Ok(recorded) => report.recorded = recorded,
                Err(_) => warn!("el sink de resultados terminó con panic"),
            }
        }

        info!(merged = report.merged, recorded = report.recorded, "pipeline detenido");
        report
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
