//! # Gestor Central de Jobs
//! src/jobs/manager.rs
//!
//! Dueño único de los registros de jobs. Expone operaciones que nunca
//! bloquean: `create`, `get_status`, `cancel`, `purge` para el gateway y
//! `mark_started`, `mark_completed`, `mark_failed`, `update_eta` para los
//! workers. El trabajo real se delega a través de la `JobQueue`.

use crate::error::JobError;
use crate::jobs::queue::{EnqueueError, JobQueue, WorkItem};
use crate::jobs::retention::RetentionPolicy;
use crate::jobs::store::JobStore;
use crate::jobs::types::{Job, JobStatus};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Configuración del Job Manager
#[derive(Debug, Clone)]
pub struct JobManagerConfig {
    /// Máximo de registros vivos
    pub max_jobs: usize,

    /// Capacidad de la cola de trabajo
    pub queue_capacity: usize,

    /// Pista de polling para jobs no terminales (None = sin header)
    pub retry_after_secs: Option<u64>,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            max_jobs: 10_000,
            queue_capacity: 1000,
            retry_after_secs: Some(5),
        }
    }
}

impl JobManagerConfig {
    /// Crea una configuración desde el Config principal
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            max_jobs: config.max_jobs,
            queue_capacity: config.queue_capacity,
            retry_after_secs: (config.retry_after_secs > 0).then_some(config.retry_after_secs),
        }
    }
}

/// Gestor central de jobs
pub struct JobManager {
    config: JobManagerConfig,
    store: JobStore,
    queue: JobQueue,
}

impl JobManager {
    pub fn new(config: JobManagerConfig) -> Self {
        Self {
            store: JobStore::new(config.max_jobs),
            queue: JobQueue::new(config.queue_capacity),
            config,
        }
    }

    /// Cola de la que consumen los workers
    pub fn work_queue(&self) -> JobQueue {
        self.queue.clone()
    }

    pub fn config(&self) -> &JobManagerConfig {
        &self.config
    }

    /// Crea un job PENDING y encola su trabajo
    ///
    /// Sólo falla por capacidad: registros llenos o cola llena. Si la cola
    /// rechaza el trabajo el registro se retira para no dejar un PENDING huérfano.
    pub fn create(&self, name: &str, eta: Option<DateTime<Utc>>) -> Result<Job, JobError> {
        let job = Job::new(name, eta, self.config.retry_after_secs, Utc::now());
        let id = job.id;

        self.store.insert(job.clone())?;

        let item = WorkItem {
            job_id: id,
            name: job.name.clone(),
        };
        if let Err(e) = self.queue.try_enqueue(item) {
            self.store.remove(&id);
            let resource = match e {
                EnqueueError::Full(_) => "work queue",
                EnqueueError::Closed(_) => "work queue (closed)",
            };
            warn!(job_id = %id, name, resource, "job rejected");
            return Err(JobError::Capacity {
                resource,
                capacity: self.queue.max_capacity(),
            });
        }

        info!(job_id = %id, name, "job accepted");
        Ok(job)
    }

    /// Snapshot actual de un job
    pub fn get_status(&self, id: &Uuid) -> Result<Job, JobError> {
        self.store.get(id).ok_or(JobError::NotFound(*id))
    }

    /// Cancela un job PENDING o STARTED
    ///
    /// La cancelación es cooperativa: sólo cambia el registro, el worker
    /// debe observar el estado y detenerse.
    pub fn cancel(&self, id: &Uuid) -> Result<Job, JobError> {
        let job = self.store.update(id, |job| {
            if !job.status.is_cancelable() {
                return Err(JobError::Conflict {
                    id: job.id,
                    status: job.status,
                });
            }
            job.cancel(Utc::now())
        })?;

        info!(job_id = %id, name = %job.name, "job canceled");
        Ok(job)
    }

    /// PENDING -> STARTED
    pub fn mark_started(&self, id: &Uuid) -> Result<Job, JobError> {
        self.transition(id, JobStatus::Started, |job, now| job.start(now))
    }

    /// STARTED -> COMPLETED
    pub fn mark_completed(&self, id: &Uuid, location: Option<String>) -> Result<Job, JobError> {
        self.transition(id, JobStatus::Completed, move |job, now| {
            job.complete(location, now)
        })
    }

    /// PENDING | STARTED -> FAILED
    pub fn mark_failed(&self, id: &Uuid, reason: impl Into<String>) -> Result<Job, JobError> {
        let reason = reason.into();
        self.transition(id, JobStatus::Failed, move |job, now| job.fail(reason, now))
    }

    /// Actualiza el ETA de un job no terminal
    pub fn update_eta(&self, id: &Uuid, eta: Option<DateTime<Utc>>) -> Result<Job, JobError> {
        self.store.update(id, |job| {
            if job.is_terminal() {
                return Err(JobError::Conflict {
                    id: job.id,
                    status: job.status,
                });
            }
            job.eta = eta;
            Ok(())
        })
    }

    /// Elimina el registro; el id deja de resolverse
    pub fn purge(&self, id: &Uuid) -> Result<Job, JobError> {
        let job = self.store.remove(id).ok_or(JobError::NotFound(*id))?;
        info!(job_id = %id, name = %job.name, status = %job.status, "job purged");
        Ok(job)
    }

    /// Aplica una política de retención y purga lo que corresponda
    pub fn purge_expired(&self, policy: &dyn RetentionPolicy, now: DateTime<Utc>) -> Vec<Uuid> {
        let purged: Vec<Uuid> = self
            .store
            .remove_where(|job| policy.should_purge(job, now))
            .into_iter()
            .map(|job| job.id)
            .collect();

        if !purged.is_empty() {
            info!(count = purged.len(), policy = %policy.describe(), "expired jobs purged");
        }
        purged
    }

    /// Lista snapshots ordenados por creación, opcionalmente filtrados por estado
    pub fn list(&self, status: Option<JobStatus>) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|job| status.map_or(true, |s| job.status == s))
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Carga registros de un snapshot previo
    ///
    /// Los jobs que quedaron PENDING o STARTED perdieron su trabajo al
    /// reiniciar el proceso: se marcan FAILED. Los registros con campos
    /// inconsistentes con su estado se descartan.
    pub fn restore(&self, jobs: Vec<Job>) -> usize {
        let now = Utc::now();
        let mut restored = 0;

        for mut job in jobs {
            if !job.is_terminal() {
                if let Err(e) = job.fail("interrupted by restart".to_string(), now) {
                    error!(job_id = %job.id, error = %e, "could not fail interrupted job");
                    continue;
                }
                warn!(job_id = %job.id, name = %job.name, "job interrupted by restart");
            }
            if !job.invariants_hold() {
                warn!(job_id = %job.id, status = %job.status, "skipping inconsistent job record");
                continue;
            }
            self.store.insert_unchecked(job);
            restored += 1;
        }

        restored
    }

    fn transition<F>(&self, id: &Uuid, to: JobStatus, apply: F) -> Result<Job, JobError>
    where
        F: FnOnce(&mut Job, DateTime<Utc>) -> Result<(), JobError>,
    {
        let result = self.store.update(id, |job| apply(job, Utc::now()));

        match &result {
            Ok(job) => debug!(job_id = %id, name = %job.name, status = %to, "job transition"),
            Err(JobError::InvalidTransition { from, .. }) => {
                error!(job_id = %id, from = %from, to = %to, "invalid job transition rejected")
            }
            Err(_) => {}
        }
        result
    }
}
