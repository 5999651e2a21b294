//! # Configuración del Servidor
//! src/config.rs
//!
//! Argumentos CLI con respaldo en variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./job_server --port 8080 \
//!   --workers 4 \
//!   --queue-capacity 1000 \
//!   --retention-secs 3600 \
//!   --jobs-storage ./data/jobs.json
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 WORKERS=8 LOG_FORMAT=json ./job_server
//! ```

use crate::error::ConfigError;
use crate::http::StatusCode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Formato de salida de los logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Código HTTP cuando se agota la capacidad de jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CapacityStatus {
    /// 503
    ServiceUnavailable,
    /// 500
    InternalError,
}

impl CapacityStatus {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CapacityStatus::ServiceUnavailable => StatusCode::ServiceUnavailable,
            CapacityStatus::InternalError => StatusCode::InternalServerError,
        }
    }
}

/// Configuración del servidor de jobs
#[derive(Debug, Clone, Parser)]
#[command(name = "job_server")]
#[command(about = "Servidor HTTP de operaciones asíncronas con ciclo de vida de jobs")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    // === Workers y capacidad ===
    /// Threads que ejecutan operaciones
    #[arg(long, default_value = "4", env = "WORKERS")]
    pub workers: usize,

    /// Capacidad de la cola de trabajo
    #[arg(long = "queue-capacity", default_value = "1000", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Máximo de jobs registrados a la vez
    #[arg(long = "max-jobs", default_value = "10000", env = "MAX_JOBS")]
    pub max_jobs: usize,

    /// Respuesta cuando no caben más jobs
    #[arg(
        long = "capacity-status",
        value_enum,
        default_value = "service-unavailable",
        env = "CAPACITY_STATUS"
    )]
    pub capacity_status: CapacityStatus,

    // === Endpoints ===
    /// Prefijo de los recursos de job
    #[arg(long = "jobs-path", default_value = "/jobs", env = "JOBS_PATH")]
    pub jobs_path: String,

    /// Prefijo de los endpoints de operaciones
    #[arg(long = "operations-path", default_value = "/operations", env = "OPERATIONS_PATH")]
    pub operations_path: String,

    /// Retry-After sugerido a clientes que consultan (0 = sin header)
    #[arg(long = "retry-after-secs", default_value = "5", env = "RETRY_AFTER_SECS")]
    pub retry_after_secs: u64,

    // === Retención y persistencia ===
    /// Segundos que se conserva un job terminado (0 = siempre)
    #[arg(long = "retention-secs", default_value = "3600", env = "JOBS_RETENTION_SECS")]
    pub retention_secs: u64,

    /// Periodo del hilo de mantenimiento
    #[arg(
        long = "cleanup-interval-secs",
        default_value = "60",
        env = "JOBS_CLEANUP_INTERVAL_SECS"
    )]
    pub cleanup_interval_secs: u64,

    /// Snapshot JSON de los jobs (sin valor = sólo en memoria)
    #[arg(long = "jobs-storage", env = "JOBS_STORAGE")]
    pub jobs_storage: Option<PathBuf>,

    /// Duración de la operación integrada `system.delay`
    #[arg(long = "delay-ms", default_value = "5000", env = "DELAY_MS")]
    pub delay_ms: u64,

    // === Logging ===
    #[arg(long = "log-format", value_enum, default_value = "text", env = "LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Filtro por defecto si `RUST_LOG` no está definido
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    /// Parsea argumentos CLI y entorno
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección para bind (host:port)
    ///
    /// ```rust
    /// use job_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::NoQueueCapacity);
        }
        if self.max_jobs == 0 {
            return Err(ConfigError::NoJobCapacity);
        }
        if self.cleanup_interval_secs == 0 {
            return Err(ConfigError::NoCleanupInterval);
        }

        for path in [&self.jobs_path, &self.operations_path] {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidPath(path.clone()));
            }
        }
        if self.jobs_path.trim_end_matches('/') == self.operations_path.trim_end_matches('/') {
            return Err(ConfigError::PathClash(self.jobs_path.clone()));
        }

        Ok(())
    }

    /// Registra un resumen de la configuración
    pub fn log_summary(&self) {
        info!(
            address = %self.address(),
            workers = self.workers,
            queue_capacity = self.queue_capacity,
            max_jobs = self.max_jobs,
            capacity_status = self.capacity_status.status_code().as_u16(),
            "server configuration"
        );
        info!(
            jobs_path = %self.jobs_path,
            operations_path = %self.operations_path,
            retry_after_secs = self.retry_after_secs,
            "endpoints"
        );
        info!(
            retention_secs = self.retention_secs,
            cleanup_interval_secs = self.cleanup_interval_secs,
            storage = ?self.jobs_storage,
            "maintenance"
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            workers: 4,
            queue_capacity: 1000,
            max_jobs: 10_000,
            capacity_status: CapacityStatus::ServiceUnavailable,
            jobs_path: "/jobs".to_string(),
            operations_path: "/operations".to_string(),
            retry_after_secs: 5,
            retention_secs: 3600,
            cleanup_interval_secs: 60,
            jobs_storage: None,
            delay_ms: 5000,
            log_format: LogFormat::Text,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.workers, 4);
        assert_eq!(config.jobs_path, "/jobs");
        assert!(config.jobs_storage.is_none());
    }

    #[test]
    fn test_address_custom() {
        let config = Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ..Config::default()
        };
        assert_eq!(config.address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_validate_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_defaults_match_cli_defaults() {
        let parsed = Config::try_parse_from(["job_server"]).unwrap();
        let default = Config::default();

        assert_eq!(parsed.port, default.port);
        assert_eq!(parsed.workers, default.workers);
        assert_eq!(parsed.max_jobs, default.max_jobs);
        assert_eq!(parsed.retention_secs, default.retention_secs);
        assert_eq!(parsed.capacity_status, default.capacity_status);
        assert_eq!(parsed.log_format, default.log_format);
    }

    #[test]
    fn test_parse_flags() {
        let config = Config::try_parse_from([
            "job_server",
            "--port",
            "9000",
            "--workers",
            "2",
            "--capacity-status",
            "internal-error",
            "--jobs-storage",
            "/tmp/jobs.json",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.workers, 2);
        assert_eq!(config.capacity_status.status_code(), StatusCode::InternalServerError);
        assert_eq!(config.jobs_storage, Some(PathBuf::from("/tmp/jobs.json")));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    // ==================== Validation ====================

    #[test]
    fn test_validate_zero_values() {
        let cases = [
            (Config { workers: 0, ..Config::default() }, ConfigError::NoWorkers),
            (Config { queue_capacity: 0, ..Config::default() }, ConfigError::NoQueueCapacity),
            (Config { max_jobs: 0, ..Config::default() }, ConfigError::NoJobCapacity),
            (
                Config { cleanup_interval_secs: 0, ..Config::default() },
                ConfigError::NoCleanupInterval,
            ),
        ];

        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn test_validate_paths() {
        let config = Config {
            jobs_path: "jobs".to_string(),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidPath("jobs".to_string())));

        let config = Config {
            operations_path: "/jobs/".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::PathClash(_))));
    }

    #[test]
    fn test_retention_zero_is_valid() {
        let config = Config {
            retention_secs: 0,
            retry_after_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}
