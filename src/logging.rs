//! # Logging
//! src/logging.rs
//!
//! Inicializa `tracing-subscriber` una sola vez por proceso. `RUST_LOG` tiene
//! prioridad sobre el nivel configurado.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Construye el filtro: `RUST_LOG` si está definido, si no `level`
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Inicializa el logging (consola, texto o JSON). Llamarlo más de una vez no
/// tiene efecto.
pub fn init(level: &str, json: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = build_filter(level);

        let layer = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_filter(filter)
                .boxed()
        };

        // Puede haber un subscriber global previo (tests, embedders)
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("subscriber global ya inicializado");
        }

        tracing::info!(level, json, "logging inicializado");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        init("debug", false);
        init("info", true);
    }

    #[test]
    fn test_invalid_level_falls_back() {
        // Nunca falla aunque el nivel sea basura
        let _ = build_filter("!!not a level!!");
    }
}
