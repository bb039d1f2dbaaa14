//! # Work Server - Entry Point
//! src/main.rs
//!
//! 1. Carga `.env` (si existe)
//! 2. Parsea CLI / variables de entorno (`PORT` es obligatorio)
//! 3. Inicializa logging
//! 4. Arranca el pipeline y el servidor HTTP

use tracing::{error, info};
use work_server::app::App;
use work_server::config::Config;
use work_server::logging;
use work_server::server::Server;

fn main() -> anyhow::Result<()> {
    // Un .env ausente no es error
    dotenvy::dotenv().ok();

    let config = Config::new();
    logging::init(&config.log_level, config.log_json);

    if let Err(e) = config.validate() {
        error!(error = %e, "configuración inválida");
        std::process::exit(1);
    }
    config.log_summary();

    let app = App::start(&config)?;
    let server = Server::bind(
        config.address(),
        app.router(),
        app.counters(),
        config.max_connections,
    )?;

    let served = server.run();

    let report = app.shutdown();
    info!(recorded = report.recorded, "servidor detenido");

    served?;
    Ok(())
}
