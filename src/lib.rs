//! # Work Server
//! src/lib.rs
//!
//! Núcleo concurrente de procesamiento de requests con una API HTTP/JSON
//! mínima encima.
//!
//! ## Arquitectura
//!
//! - `work`: cola acotada, pool de workers, fan-in y cancelación
//! - `dispatch`: valida payloads y los encola con backpressure
//! - `commands`: tareas que ejecutan los workers
//! - `results`: consume el fan-in y guarda resultados recientes
//! - `metrics`: contadores compartidos
//! - `status`: health y estado del proceso
//! - `http`, `router`, `server`, `api`: la capa HTTP/1.0
//! - `app`: arma todo lo anterior
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use work_server::app::App;
//! use work_server::config::Config;
//! use work_server::server::Server;
//!
//! let config = Config::default();
//! let app = App::start(&config)?;
//! let server = Server::bind(config.address(), app.router(), app.counters(), config.max_connections)?;
//! server.run()?;
//! app.shutdown();
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod app;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod results;
pub mod router;
pub mod server;
pub mod status;
pub mod work;
