//! # Errores del Sistema de Jobs
//! src/error.rs
//!
//! Taxonomía de errores que el gestor de jobs devuelve a su llamador.
//! El gateway HTTP los traduce a códigos de estado (ver `jobs::handlers`).

use crate::jobs::types::JobStatus;
use thiserror::Error;
use uuid::Uuid;

/// Errores de las operaciones del `JobManager`
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Id desconocido o ya purgado (404)
    #[error("job not found: {0}")]
    NotFound(Uuid),

    /// Operación ilegal para el estado actual, p. ej. cancelar un job terminal (403)
    #[error("job {id} is already {status}")]
    Conflict { id: Uuid, status: JobStatus },

    /// Transición interna ilegal: bug en la integración del worker (500)
    #[error("invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },

    /// No se pudo reservar un job nuevo (503 o 500 según configuración)
    #[error("{resource} is full (capacity: {capacity})")]
    Capacity {
        resource: &'static str,
        capacity: usize,
    },
}

/// Errores al leer o escribir el snapshot de jobs en disco
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errores de validación de la configuración
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("workers must be >= 1")]
    NoWorkers,

    #[error("queue capacity must be >= 1")]
    NoQueueCapacity,

    #[error("max jobs must be >= 1")]
    NoJobCapacity,

    #[error("cleanup interval must be > 0")]
    NoCleanupInterval,

    #[error("endpoint path must start with '/': {0}")]
    InvalidPath(String),

    #[error("jobs path and operations path must differ: {0}")]
    PathClash(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_messages() {
        let id = Uuid::nil();

        let err = JobError::Conflict { id, status: JobStatus::Completed };
        assert!(err.to_string().contains("COMPLETED"));

        let err = JobError::InvalidTransition {
            id,
            from: JobStatus::Canceled,
            to: JobStatus::Completed,
        };
        assert!(err.to_string().contains("CANCELED -> COMPLETED"));

        let err = JobError::Capacity { resource: "work queue", capacity: 8 };
        assert_eq!(err.to_string(), "work queue is full (capacity: 8)");
    }

    #[test]
    fn test_storage_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: StorageError = io.into();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
