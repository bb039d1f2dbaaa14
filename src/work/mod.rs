//! # Núcleo de Trabajo
//! src/work/mod.rs
//!
//! Cola acotada, pool de workers, fan-in y tipos compartidos.

pub mod aggregator;
pub mod cancel;
pub mod item;
pub mod pool;
pub mod processor;
pub mod queue;

pub use aggregator::{FanIn, TryRecv};
pub use cancel::CancellationToken;
pub use item::{ItemId, Payload, ProcessingFault, WorkItem, WorkResult};
pub use pool::{PoolConfig, PoolPhase, WorkerPool};
pub use processor::Processor;
pub use queue::{BoundedQueue, Pop, PushError};
