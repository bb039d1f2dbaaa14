//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones (un thread por conexión, con tope)
//! 3. Lee y parsea requests HTTP
//! 4. Las pasa al router y envía la respuesta

pub mod tcp;

pub use tcp::{Server, ShutdownHandle};
