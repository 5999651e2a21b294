//! # Logging
//! src/logging.rs
//!
//! Inicialización de `tracing`. `RUST_LOG` tiene prioridad sobre el nivel
//! configurado.

use crate::config::LogFormat;
use tracing_subscriber::EnvFilter;

/// Instala el subscriber global
///
/// Llamadas posteriores no hacen nada.
pub fn init(format: LogFormat, level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true);

    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().with_target(false).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_noop() {
        init(LogFormat::Text, "debug");
        init(LogFormat::Json, "not a valid filter [");
        tracing::info!("still logging");
    }
}
