//! # Tipos y Estructuras para el Sistema de Jobs
//! src/jobs/types.rs
//!
//! Define el estado de un job, su snapshot serializable y la tabla de
//! transiciones legales:
//!
//! ```text
//! PENDING ──► STARTED ──► COMPLETED
//!    │           │
//!    ├───────────┼──► CANCELED
//!    └───────────┴──► FAILED
//! ```
//!
//! Ningún estado terminal (COMPLETED, CANCELED, FAILED) tiene salida.

use crate::error::JobError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Estado de un job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Job aceptado, esperando a un worker
    Pending,

    /// Un worker está ejecutando la operación
    Started,

    /// Operación terminada con éxito
    Completed,

    /// Cancelado explícitamente por el llamador
    Canceled,

    /// La operación falló
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Started,
        JobStatus::Completed,
        JobStatus::Canceled,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Started => "STARTED",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Canceled => "CANCELED",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Verifica si el estado es terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Canceled | JobStatus::Failed
        )
    }

    /// Verifica si un job en este estado puede ser cancelado
    pub fn is_cancelable(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Started)
    }

    /// Tabla de transiciones legales
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (*self, next),
            (JobStatus::Pending, JobStatus::Started)
                | (JobStatus::Started, JobStatus::Completed)
                | (JobStatus::Pending | JobStatus::Started, JobStatus::Canceled)
                | (JobStatus::Pending | JobStatus::Started, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown job status: {}", s))
    }
}

/// Snapshot de un job
///
/// Los llamadores siempre reciben copias; el registro vivo sólo existe
/// dentro del `JobStore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,

    /// Nombre calificado con puntos (p. ej. "virtualServer.provision")
    pub name: String,

    pub status: JobStatus,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Sólo se establece en STARTED -> COMPLETED
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Momento de entrada a cualquier estado terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_resource_location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Job {
    /// Crea un job nuevo en estado PENDING
    pub fn new(
        name: impl Into<String>,
        eta: Option<DateTime<Utc>>,
        retry_after_seconds: Option<u64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: JobStatus::Pending,
            created_at: now,
            started_at: None,
            completed_at: None,
            finished_at: None,
            eta,
            result_resource_location: None,
            retry_after_seconds,
            failure_reason: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// PENDING -> STARTED
    pub(crate) fn start(&mut self, now: DateTime<Utc>) -> Result<(), JobError> {
        self.check_transition(JobStatus::Started)?;
        self.status = JobStatus::Started;
        self.started_at = Some(now);
        Ok(())
    }

    /// STARTED -> COMPLETED
    pub(crate) fn complete(
        &mut self,
        location: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), JobError> {
        self.check_transition(JobStatus::Completed)?;
        self.completed_at = Some(now);
        self.result_resource_location = location;
        self.finish(JobStatus::Completed, now);
        Ok(())
    }

    /// PENDING | STARTED -> CANCELED
    pub(crate) fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), JobError> {
        self.check_transition(JobStatus::Canceled)?;
        self.finish(JobStatus::Canceled, now);
        Ok(())
    }

    /// PENDING | STARTED -> FAILED
    pub(crate) fn fail(&mut self, reason: String, now: DateTime<Utc>) -> Result<(), JobError> {
        self.check_transition(JobStatus::Failed)?;
        self.failure_reason = Some(reason);
        self.finish(JobStatus::Failed, now);
        Ok(())
    }

    fn check_transition(&self, to: JobStatus) -> Result<(), JobError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(JobError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            })
        }
    }

    fn finish(&mut self, status: JobStatus, now: DateTime<Utc>) {
        self.status = status;
        self.finished_at = Some(now);
        self.eta = None;
        self.retry_after_seconds = None;
        debug_assert!(self.invariants_hold(), "job {} left inconsistent", self.id);
    }

    /// Consistencia entre el estado y los campos opcionales
    pub fn invariants_hold(&self) -> bool {
        let completed = self.status == JobStatus::Completed;
        let started_ok = !matches!(self.status, JobStatus::Started | JobStatus::Completed)
            || self.started_at.is_some();

        self.completed_at.is_some() == completed
            && (self.result_resource_location.is_none() || completed)
            && self.finished_at.is_some() == self.is_terminal()
            && (!self.is_terminal() || (self.eta.is_none() && self.retry_after_seconds.is_none()))
            && started_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Job {
        Job::new("virtualServer.provision", None, Some(5), Utc::now())
    }

    #[test]
    fn test_job_status_serialization() {
        let json = serde_json::to_string(&JobStatus::Started).unwrap();
        assert_eq!(json, "\"STARTED\"");

        let parsed: JobStatus = serde_json::from_str("\"CANCELED\"").unwrap();
        assert_eq!(parsed, JobStatus::Canceled);
    }

    #[test]
    fn test_job_status_from_str() {
        assert_eq!("pending".parse::<JobStatus>(), Ok(JobStatus::Pending));
        assert_eq!("FAILED".parse::<JobStatus>(), Ok(JobStatus::Failed));
        assert!("running".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_transition_table() {
        use JobStatus::*;

        let legal = [
            (Pending, Started),
            (Pending, Canceled),
            (Pending, Failed),
            (Started, Completed),
            (Started, Canceled),
            (Started, Failed),
        ];

        for from in JobStatus::ALL {
            for to in JobStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for from in JobStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in JobStatus::ALL {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = pending();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.invariants_hold());

        job.start(Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::Started);
        assert!(job.started_at.is_some());

        job.complete(Some("/virtualServers/abc".to_string()), Utc::now())
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert!(job.finished_at.is_some());
        assert_eq!(job.retry_after_seconds, None);
        assert!(job.invariants_hold());
    }

    #[test]
    fn test_complete_from_pending_is_rejected() {
        let mut job = pending();
        let before = job.clone();

        let err = job.complete(None, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            JobError::InvalidTransition {
                id: job.id,
                from: JobStatus::Pending,
                to: JobStatus::Completed,
            }
        );
        assert_eq!(job, before);
    }

    #[test]
    fn test_cancel_clears_eta() {
        let mut job = Job::new("a.b", Some(Utc::now()), Some(5), Utc::now());
        job.cancel(Utc::now()).unwrap();

        assert_eq!(job.status, JobStatus::Canceled);
        assert!(job.eta.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_fail_records_reason() {
        let mut job = pending();
        job.start(Utc::now()).unwrap();
        job.fail("disk full".to_string(), Utc::now()).unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure_reason.as_deref(), Some("disk full"));
        assert!(job.fail("again".to_string(), Utc::now()).is_err());
    }

    #[test]
    fn test_json_uses_camel_case_and_iso_timestamps() {
        let job = pending();
        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(value["name"], "virtualServer.provision");
        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["retryAfterSeconds"], 5);
        assert!(value.get("createdAt").is_some());
        assert!(value.get("created_at").is_none());
        assert!(value.get("eta").is_none());

        let created = value["createdAt"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(created).is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut job = pending();
        job.start(Utc::now()).unwrap();

        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }
}
