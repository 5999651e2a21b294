//! # Job Server - Entry Point
//! src/main.rs

use anyhow::Context;
use job_server::config::Config;
use job_server::jobs::OperationRegistry;
use job_server::logging;
use job_server::server::Server;
use tracing::error;

fn main() {
    let config = Config::new();
    logging::init(config.log_format, &config.log_level);

    if let Err(e) = run(config) {
        error!("fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    config.validate().context("invalid configuration")?;
    config.log_summary();

    let registry = OperationRegistry::with_builtins(config.delay());
    let server = Server::new(config, registry).context("failed to start server")?;

    let served = server.run();
    let address = server.config().address();

    // El accept loop sólo termina con error; el último snapshot se escribe igual
    server.shutdown();
    served.with_context(|| format!("server on {} stopped", address))
}
