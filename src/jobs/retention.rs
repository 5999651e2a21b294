//! # Políticas de Retención
//! src/jobs/retention.rs
//!
//! Estrategias intercambiables para decidir qué jobs purgar.

use crate::jobs::types::Job;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Decide si un job debe purgarse en el instante `now`
pub trait RetentionPolicy: Send + Sync {
    fn should_purge(&self, job: &Job, now: DateTime<Utc>) -> bool;

    /// Nombre para logs
    fn describe(&self) -> String;
}

/// Nunca purga nada
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepForever;

impl RetentionPolicy for KeepForever {
    fn should_purge(&self, _job: &Job, _now: DateTime<Utc>) -> bool {
        false
    }

    fn describe(&self) -> String {
        "keep-forever".to_string()
    }
}

/// Purga jobs terminales que llevan más de `ttl` terminados
///
/// Los jobs PENDING o STARTED nunca se purgan.
#[derive(Debug, Clone, Copy)]
pub struct TerminalTtl {
    ttl: Duration,
}

impl TerminalTtl {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

impl RetentionPolicy for TerminalTtl {
    fn should_purge(&self, job: &Job, now: DateTime<Utc>) -> bool {
        if !job.is_terminal() {
            return false;
        }

        match (job.finished_at, chrono::Duration::from_std(self.ttl)) {
            (Some(finished_at), Ok(ttl)) => now - finished_at >= ttl,
            // TTL fuera de rango: efectivamente infinito
            (Some(_), Err(_)) => false,
            // Registro terminal sin finishedAt (snapshot antiguo): usar createdAt
            (None, Ok(ttl)) => now - job.created_at >= ttl,
            (None, Err(_)) => false,
        }
    }

    fn describe(&self) -> String {
        format!("terminal-ttl({}s)", self.ttl.as_secs())
    }
}

/// Construye la política a partir de la configuración (0 = conservar siempre)
pub fn from_secs(retention_secs: u64) -> Box<dyn RetentionPolicy> {
    if retention_secs == 0 {
        Box::new(KeepForever)
    } else {
        Box::new(TerminalTtl::new(Duration::from_secs(retention_secs)))
    }
}
