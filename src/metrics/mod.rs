//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Contadores compartidos del proceso:
//! - Items aceptados/rechazados por el dispatcher
//! - Resultados completados/fallidos
//! - Requests por código HTTP

pub mod store;

pub use store::CounterStore;
