//! # Pool de Workers
//! src/work/pool.rs
//!
//! Conjunto fijo de threads que vacían una cola acotada.
//!
//! ## Ciclo de vida
//!
//! ```text
//! Idle ──start()──▶ Running ──shutdown()/cancel──▶ Draining ──join──▶ Stopped
//!   └───────────────────shutdown()───────────────────────────────────────┘
//! ```
//!
//! Cada worker tiene su propio canal de salida; el fan-in los une después.

use crate::config::Config;
use crate::error::{PoolError, SubmitError};
use crate::work::cancel::CancellationToken;
use crate::work::item::{ProcessingFault, WorkItem, WorkResult};
use crate::work::processor::Processor;
use crate::work::queue::{BoundedQueue, Pop, PushError};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cada cuánto revisa un worker ocioso el token de cancelación
const IDLE_POLL: Duration = Duration::from_millis(25);

/// Fase del pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolPhase {
    Idle,
    Running,
    Draining,
    Stopped,
}

/// Configuración del pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Número de workers
    pub workers: usize,

    /// Capacidad máxima de la cola
    pub queue_capacity: usize,

    /// Cuánto puede bloquear `submit` con la cola llena (`None` = sin límite)
    pub submit_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 64,
            submit_timeout: Some(Duration::from_millis(100)),
        }
    }
}

impl PoolConfig {
    /// Crea una configuración desde el Config principal
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.workers,
            queue_capacity: config.queue_capacity,
            submit_timeout: Some(Duration::from_millis(config.submit_timeout_ms)),
        }
    }
}

/// Estado compartido entre el pool y sus workers
struct PoolShared {
    queue: BoundedQueue<WorkItem>,
    phase: Mutex<PoolPhase>,
    cancel: CancellationToken,
}

impl PoolShared {
    /// Running → Draining y cierra la cola. Los items encolados se siguen
    /// procesando.
    fn begin_drain(&self) {
        let mut phase = self.phase.lock();
        if *phase == PoolPhase::Running {
            *phase = PoolPhase::Draining;
            info!("pool entrando en draining");
        }
        drop(phase);
        self.queue.close();
    }
}

/// Pool de workers con cola acotada
pub struct WorkerPool {
    config: PoolConfig,
    shared: Arc<PoolShared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    /// Serializa `shutdown`: quien llega segundo espera al join del primero
    shutdown_lock: Mutex<()>,
}

impl WorkerPool {
    /// Crea el pool en fase `Idle`. Los items enviados antes de `start`
    /// quedan en la cola.
    pub fn new(config: PoolConfig, cancel: CancellationToken) -> Self {
        let shared = Arc::new(PoolShared {
            queue: BoundedQueue::new(config.queue_capacity),
            phase: Mutex::new(PoolPhase::Idle),
            cancel,
        });

        Self {
            config,
            shared,
            handles: Mutex::new(Vec::new()),
            shutdown_lock: Mutex::new(()),
        }
    }

    /// Lanza los workers. Devuelve un receiver por worker, en orden de índice.
    pub fn start(&self, processor: Arc<dyn Processor>) -> Result<Vec<Receiver<WorkResult>>, PoolError> {
        if self.config.workers == 0 {
            return Err(PoolError::InvalidConfig("workers must be >= 1".to_string()));
        }
        if self.config.queue_capacity == 0 {
            return Err(PoolError::InvalidConfig("queue capacity must be >= 1".to_string()));
        }

        let mut phase = self.shared.phase.lock();
        match *phase {
            PoolPhase::Idle => {}
            PoolPhase::Stopped => return Err(PoolError::Stopped),
            PoolPhase::Running | PoolPhase::Draining => return Err(PoolError::AlreadyStarted),
        }

        let mut handles = self.handles.lock();
        let mut outputs = Vec::with_capacity(self.config.workers);

        for worker in 0..self.config.workers {
            let (tx, rx) = channel::unbounded();
            let shared = Arc::clone(&self.shared);
            let processor = Arc::clone(&processor);

            let spawned = thread::Builder::new()
                .name(format!("worker-{}", worker))
                .spawn(move || Self::worker_loop(worker, shared, processor, tx));

            match spawned {
                Ok(handle) => {
                    handles.push(handle);
                    outputs.push(rx);
                }
                Err(e) => {
                    // Los que sí arrancaron terminan al cerrar la cola
                    *phase = PoolPhase::Draining;
                    self.shared.queue.close();
                    return Err(PoolError::Spawn(e.to_string()));
                }
            }
        }

        *phase = PoolPhase::Running;
        info!(
            workers = self.config.workers,
            capacity = self.config.queue_capacity,
            "pool iniciado"
        );

        Ok(outputs)
    }

    /// Loop principal del worker
    fn worker_loop(
        worker: usize,
        shared: Arc<PoolShared>,
        processor: Arc<dyn Processor>,
        output: Sender<WorkResult>,
    ) {
        debug!(worker, "worker iniciado");
        let mut processed: u64 = 0;

        loop {
            match shared.queue.pop_timeout(IDLE_POLL) {
                Pop::Item(item) => {
                    let result = Self::run_item(worker, processor.as_ref(), &item);
                    processed += 1;

                    if output.send(result).is_err() {
                        warn!(worker, item = %item.id(), "sin receptor de resultados, descartando");
                    }
                    // En proceso hasta que el resultado salió
                    shared.queue.complete();
                }
                Pop::Empty => {
                    if shared.cancel.is_canceled() {
                        shared.begin_drain();
                    }
                }
                Pop::Closed => break,
            }
        }

        debug!(worker, processed, "worker terminado");
    }

    /// Ejecuta un item capturando panics
    fn run_item(worker: usize, processor: &dyn Processor, item: &WorkItem) -> WorkResult {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| processor.process(item))) {
            Ok(outcome) => outcome,
            Err(panic_payload) => {
                let message = panic_message(panic_payload.as_ref());
                warn!(worker, item = %item.id(), task = item.task(), "panic procesando item: {}", message);
                Err(ProcessingFault::Panicked(message))
            }
        };

        if let Err(fault) = &outcome {
            debug!(worker, item = %item.id(), kind = fault.kind(), "item fallido");
        }

        WorkResult::from_item(item, worker, outcome)
    }

    /// Encola con el timeout configurado
    pub fn submit(&self, item: WorkItem) -> Result<(), SubmitError> {
        self.submit_timeout(item, self.config.submit_timeout)
    }

    /// Encola esperando como máximo `timeout` a que haya espacio
    pub fn submit_timeout(&self, item: WorkItem, timeout: Option<Duration>) -> Result<(), SubmitError> {
        if self.shared.cancel.is_canceled() {
            return Err(SubmitError::Canceled);
        }

        match self.shared.queue.push(item, timeout, &self.shared.cancel) {
            Ok(()) => Ok(()),
            Err(PushError::Full(_)) => Err(SubmitError::QueueFull {
                capacity: self.config.queue_capacity,
            }),
            Err(PushError::Closed(_)) => Err(SubmitError::Closed),
            Err(PushError::Canceled(_)) => Err(SubmitError::Canceled),
        }
    }

    /// Deja de aceptar items, espera a que se procese todo lo encolado y en
    /// vuelo, y termina los workers. Idempotente; con llamadas concurrentes
    /// todas retornan después del join.
    pub fn shutdown(&self) {
        let _serial = self.shutdown_lock.lock();
        {
            let mut phase = self.shared.phase.lock();
            match *phase {
                PoolPhase::Stopped => return,
                PoolPhase::Idle => {
                    *phase = PoolPhase::Stopped;
                    drop(phase);
                    self.shared.queue.close();
                    let discarded = self.shared.queue.drain().len();
                    if discarded > 0 {
                        warn!(discarded, "shutdown sin workers: items descartados");
                    }
                    info!("pool detenido (nunca inició)");
                    return;
                }
                PoolPhase::Running => {
                    *phase = PoolPhase::Draining;
                    info!(pending = self.shared.queue.len(), "pool entrando en draining");
                }
                PoolPhase::Draining => {}
            }
        }
        self.shared.queue.close();

        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("un worker terminó con panic");
            }
        }

        *self.shared.phase.lock() = PoolPhase::Stopped;
        info!("pool detenido");
    }

    pub fn phase(&self) -> PoolPhase {
        *self.shared.phase.lock()
    }

    /// ¿Acepta nuevos items?
    pub fn is_accepting(&self) -> bool {
        !self.shared.queue.is_closed() && !self.shared.cancel.is_canceled()
    }

    /// Items esperando en la cola
    pub fn queue_depth(&self) -> usize {
        self.shared.queue.len()
    }

    /// Items que algún worker está procesando ahora mismo
    pub fn in_flight(&self) -> usize {
        self.shared.queue.in_progress()
    }

    /// (queue_depth, in_flight) en una sola lectura consistente
    pub fn load(&self) -> (usize, usize) {
        self.shared.queue.load()
    }

    pub fn worker_count(&self) -> usize {
        self.config.workers
    }

    pub fn capacity(&self) -> usize {
        self.config.queue_capacity
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Sin join: sólo evitar que los workers queden esperando para siempre
        self.shared.queue.close();
    }
}

/// Extrae el mensaje de un panic (`&str` o `String`)
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::item::{ItemId, Payload};
    use serde_json::{json, Value};
    use std::time::Instant;

    fn item(id: u64, task: &str) -> WorkItem {
        WorkItem::new(ItemId::new(id), Payload::new(task))
    }

    fn echo() -> Arc<dyn Processor> {
        Arc::new(|item: &WorkItem| -> Result<Value, ProcessingFault> {
            Ok(json!({"id": item.id().as_u64()}))
        })
    }

    fn pool(workers: usize, capacity: usize) -> WorkerPool {
        WorkerPool::new(
            PoolConfig {
                workers,
                queue_capacity: capacity,
                submit_timeout: Some(Duration::from_secs(5)),
            },
            CancellationToken::new(),
        )
    }

    fn collect(outputs: Vec<Receiver<WorkResult>>) -> Vec<WorkResult> {
        outputs.into_iter().flat_map(|rx| rx.into_iter()).collect()
    }

    #[test]
    fn test_phases() {
        let pool = pool(2, 8);
        assert_eq!(pool.phase(), PoolPhase::Idle);

        let _outputs = pool.start(echo()).unwrap();
        assert_eq!(pool.phase(), PoolPhase::Running);

        pool.shutdown();
        assert_eq!(pool.phase(), PoolPhase::Stopped);

        // Sin transiciones desde Stopped
        assert_eq!(pool.start(echo()).unwrap_err(), PoolError::Stopped);
        pool.shutdown();
        assert_eq!(pool.phase(), PoolPhase::Stopped);
    }

    #[test]
    fn test_start_twice_fails() {
        let pool = pool(1, 4);
        let _outputs = pool.start(echo()).unwrap();
        assert_eq!(pool.start(echo()).unwrap_err(), PoolError::AlreadyStarted);
        pool.shutdown();
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(pool(0, 4).start(echo()), Err(PoolError::InvalidConfig(_))));
        assert!(matches!(pool(2, 0).start(echo()), Err(PoolError::InvalidConfig(_))));
    }

    #[test]
    fn test_processes_everything_before_shutdown_returns() {
        let pool = pool(4, 16);
        let outputs = pool.start(echo()).unwrap();

        for i in 0..200 {
            pool.submit(item(i, "echo")).unwrap();
        }
        pool.shutdown();

        assert_eq!(pool.queue_depth(), 0);
        assert_eq!(pool.in_flight(), 0);

        let mut ids: Vec<u64> = collect(outputs).iter().map(|r| r.item_id.as_u64()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_submit_after_shutdown_is_closed() {
        let pool = pool(2, 4);
        let _outputs = pool.start(echo()).unwrap();
        pool.shutdown();

        assert_eq!(pool.submit(item(1, "echo")), Err(SubmitError::Closed));
        assert!(!pool.is_accepting());
    }

    #[test]
    fn test_backpressure_while_workers_paused() {
        // Sin start: nadie consume, la cola se llena
        let pool = pool(2, 3);
        for i in 0..3 {
            pool.submit_timeout(item(i, "echo"), Some(Duration::ZERO)).unwrap();
        }

        let start = Instant::now();
        let rejected = pool.submit_timeout(item(3, "echo"), Some(Duration::from_millis(40)));
        assert_eq!(rejected, Err(SubmitError::QueueFull { capacity: 3 }));
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(pool.queue_depth(), 3);

        // Al arrancar, los items encolados se procesan
        let outputs = pool.start(echo()).unwrap();
        pool.shutdown();
        assert_eq!(collect(outputs).len(), 3);
    }

    #[test]
    fn test_shutdown_from_idle_discards_queue() {
        let pool = pool(2, 4);
        pool.submit(item(1, "echo")).unwrap();
        pool.shutdown();

        assert_eq!(pool.phase(), PoolPhase::Stopped);
        assert_eq!(pool.queue_depth(), 0);
        assert_eq!(pool.submit(item(2, "echo")), Err(SubmitError::Closed));
    }

    #[test]
    fn test_panic_is_isolated() {
        let pool = pool(2, 16);
        let processor: Arc<dyn Processor> =
            Arc::new(|item: &WorkItem| -> Result<Value, ProcessingFault> {
                match item.task() {
                    "panic" => panic!("boom in {}", item.id()),
                    "fail" => Err(ProcessingFault::Failed("bad input".into())),
                    _ => Ok(Value::Null),
                }
            });
        let outputs = pool.start(processor).unwrap();

        pool.submit(item(1, "panic")).unwrap();
        pool.submit(item(2, "fail")).unwrap();
        for i in 3..23 {
            pool.submit(item(i, "ok")).unwrap();
        }
        pool.shutdown();

        let results = collect(outputs);
        assert_eq!(results.len(), 22);

        let panicked = results.iter().find(|r| r.item_id == ItemId::new(1)).unwrap();
        match &panicked.outcome {
            Err(ProcessingFault::Panicked(msg)) => assert!(msg.contains("boom")),
            other => panic!("expected panic fault, got {:?}", other),
        }

        let failed = results.iter().find(|r| r.item_id == ItemId::new(2)).unwrap();
        assert_eq!(failed.outcome, Err(ProcessingFault::Failed("bad input".into())));
        assert_eq!(results.iter().filter(|r| r.is_success()).count(), 20);
    }

    #[test]
    fn test_per_worker_order_follows_submission() {
        let pool = pool(1, 128);
        let outputs = pool.start(echo()).unwrap();
        for i in 0..100 {
            pool.submit(item(i, "echo")).unwrap();
        }
        pool.shutdown();

        let ids: Vec<u64> = collect(outputs).iter().map(|r| r.item_id.as_u64()).collect();
        assert_eq!(ids, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_cancel_rejects_and_drains() {
        let cancel = CancellationToken::new();
        let pool = WorkerPool::new(
            PoolConfig {
                workers: 2,
                queue_capacity: 64,
                submit_timeout: None,
            },
            cancel.clone(),
        );
        let slow: Arc<dyn Processor> = Arc::new(|_: &WorkItem| -> Result<Value, ProcessingFault> {
            thread::sleep(Duration::from_millis(5));
            Ok(Value::Null)
        });
        let outputs = pool.start(slow).unwrap();

        for i in 0..20 {
            pool.submit(item(i, "slow")).unwrap();
        }
        cancel.cancel();

        assert_eq!(pool.submit(item(99, "slow")), Err(SubmitError::Canceled));

        // Los workers cierran la cola por su cuenta
        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.phase() == PoolPhase::Running && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(pool.phase(), PoolPhase::Draining);

        pool.shutdown();
        // Lo que ya estaba encolado se procesó igual
        assert_eq!(collect(outputs).len(), 20);
    }

    #[test]
    fn test_concurrent_shutdown_waits_for_join() {
        let pool = Arc::new(pool(1, 32));
        let slow: Arc<dyn Processor> = Arc::new(|_: &WorkItem| -> Result<Value, ProcessingFault> {
            thread::sleep(Duration::from_millis(10));
            Ok(Value::Null)
        });
        let outputs = pool.start(slow).unwrap();
        for i in 0..20 {
            pool.submit(item(i, "slow")).unwrap();
        }

        let first = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.shutdown())
        };
        thread::sleep(Duration::from_millis(5));
        pool.shutdown();

        // El segundo shutdown no vuelve antes de que termine el drenado
        assert_eq!(pool.phase(), PoolPhase::Stopped);
        assert_eq!(pool.load(), (0, 0));
        assert_eq!(collect(outputs).len(), 20);
        first.join().unwrap();
    }

    #[test]
    fn test_running_item_counts_as_in_flight() {
        let pool = pool(1, 4);
        let (started_tx, started_rx) = channel::bounded::<()>(1);
        let (release_tx, release_rx) = channel::bounded::<()>(0);
        let processor: Arc<dyn Processor> = Arc::new(move |_: &WorkItem| -> Result<Value, ProcessingFault> {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
            Ok(Value::Null)
        });
        let outputs = pool.start(processor).unwrap();

        pool.submit(item(1, "block")).unwrap();
        started_rx.recv().unwrap();
        assert_eq!(pool.load(), (0, 1));

        release_tx.send(()).unwrap();
        pool.shutdown();
        assert_eq!(pool.load(), (0, 0));
        assert_eq!(collect(outputs).len(), 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
