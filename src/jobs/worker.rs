//! # Workers
//! src/jobs/worker.rs
//!
//! Pool de threads que consumen la `JobQueue`, ejecutan la operación
//! registrada bajo el nombre del job y reportan las transiciones al
//! `JobManager`.
//!
//! La cancelación es cooperativa: una operación larga consulta
//! `JobContext::is_canceled()` y retorna `OperationError::Canceled`.

use crate::error::JobError;
use crate::jobs::manager::JobManager;
use crate::jobs::queue::{JobQueue, WorkItem};
use crate::jobs::types::JobStatus;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

/// Resultado fallido de una operación
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// La operación observó la cancelación y se detuvo
    #[error("operation observed cancellation")]
    Canceled,

    #[error("{0}")]
    Failed(String),
}

/// Ubicación del recurso producido, si existe
pub type OperationResult = Result<Option<String>, OperationError>;

/// Unidad de trabajo ejecutable
pub trait Operation: Send + Sync {
    fn run(&self, ctx: &JobContext) -> OperationResult;
}

impl<F> Operation for F
where
    F: Fn(&JobContext) -> OperationResult + Send + Sync,
{
    fn run(&self, ctx: &JobContext) -> OperationResult {
        self(ctx)
    }
}

/// Registro nombre -> operación
#[derive(Default, Clone)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, operation: impl Operation + 'static) {
        self.operations.insert(name.to_string(), Arc::new(operation));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Nombres registrados, ordenados
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.keys().cloned().collect();
        names.sort();
        names
    }

    /// Registro con las operaciones integradas del servidor
    pub fn with_builtins(delay: Duration) -> Self {
        let mut registry = Self::new();
        registry.register("system.noop", NoopOperation);
        registry.register("system.delay", DelayOperation::new(delay));
        registry
    }
}

/// Vista de un job para la operación que lo ejecuta
pub struct JobContext {
    job_id: Uuid,
    name: String,
    manager: Arc<JobManager>,
}

impl JobContext {
    pub fn new(job_id: Uuid, name: impl Into<String>, manager: Arc<JobManager>) -> Self {
        Self {
            job_id,
            name: name.into(),
            manager,
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True si el job fue cancelado o purgado
    pub fn is_canceled(&self) -> bool {
        match self.manager.get_status(&self.job_id) {
            Ok(job) => job.status == JobStatus::Canceled,
            Err(_) => true,
        }
    }

    /// Publica un nuevo ETA (ignorado si el job ya terminó)
    pub fn set_eta(&self, eta: DateTime<Utc>) {
        if let Err(e) = self.manager.update_eta(&self.job_id, Some(eta)) {
            debug!(job_id = %self.job_id, error = %e, "eta update ignored");
        }
    }
}

/// Completa inmediatamente sin recurso resultante
pub struct NoopOperation;

impl Operation for NoopOperation {
    fn run(&self, _ctx: &JobContext) -> OperationResult {
        Ok(None)
    }
}

/// Simula trabajo largo durmiendo en pasos cortos
pub struct DelayOperation {
    duration: Duration,
    step: Duration,
}

impl DelayOperation {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            step: Duration::from_millis(50),
        }
    }
}

impl Operation for DelayOperation {
    fn run(&self, ctx: &JobContext) -> OperationResult {
        if let Ok(remaining) = chrono::Duration::from_std(self.duration) {
            ctx.set_eta(Utc::now() + remaining);
        }

        let mut elapsed = Duration::ZERO;
        while elapsed < self.duration {
            if ctx.is_canceled() {
                return Err(OperationError::Canceled);
            }
            let step = self.step.min(self.duration - elapsed);
            thread::sleep(step);
            elapsed += step;
        }

        Ok(None)
    }
}

/// Pool de workers
pub struct WorkerPool {
    queue: JobQueue,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Inicia `workers` threads consumiendo la cola del manager
    pub fn spawn(
        manager: Arc<JobManager>,
        registry: Arc<OperationRegistry>,
        workers: usize,
    ) -> Self {
        let queue = manager.work_queue();

        let handles = (0..workers)
            .map(|i| {
                let name = format!("worker-{}", i);
                let queue = queue.clone();
                let manager = Arc::clone(&manager);
                let registry = Arc::clone(&registry);

                thread::Builder::new()
                    .name(name.clone())
                    .spawn(move || worker_loop(&name, queue, manager, registry))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    error!(error = %e, "failed to spawn worker thread");
                    None
                }
            })
            .collect::<Vec<_>>();

        info!(workers = handles.len(), "worker pool started");
        Self { queue, handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Cierra la cola y espera a que los workers terminen
    pub fn shutdown(self) {
        self.queue.close();
        for handle in self.handles {
            if handle.join().is_err() {
                error!("worker thread panicked");
            }
        }
        info!("worker pool stopped");
    }
}

fn worker_loop(
    name: &str,
    queue: JobQueue,
    manager: Arc<JobManager>,
    registry: Arc<OperationRegistry>,
) {
    debug!(worker = name, "worker started");

    while let Some(item) = queue.dequeue() {
        let span = info_span!("job", worker = name, job_id = %item.job_id, name = %item.name);
        let _enter = span.enter();
        execute(&item, &manager, &registry);
    }

    debug!(worker = name, "worker exiting");
}

/// Ejecuta un item completo: STARTED, operación, y transición final
pub(crate) fn execute(item: &WorkItem, manager: &Arc<JobManager>, registry: &OperationRegistry) {
    let id = item.job_id;

    if let Ok(job) = manager.get_status(&id) {
        if job.status == JobStatus::Canceled {
            info!("job canceled before start, skipping");
            return;
        }
    }

    // Una cancelación puede ganar entre la consulta y el start
    match manager.mark_started(&id) {
        Ok(_) => {}
        Err(JobError::InvalidTransition { from: JobStatus::Canceled, .. }) => {
            info!("job canceled before start, skipping");
            return;
        }
        Err(JobError::NotFound(_)) => {
            warn!("job purged before start, skipping");
            return;
        }
        Err(e) => {
            error!(error = %e, "cannot start job");
            return;
        }
    }

    let outcome = match registry.get(&item.name) {
        Some(operation) => {
            let ctx = JobContext::new(id, item.name.clone(), Arc::clone(manager));
            panic::catch_unwind(AssertUnwindSafe(|| operation.run(&ctx)))
                .unwrap_or_else(|_| Err(OperationError::Failed("operation panicked".to_string())))
        }
        None => Err(OperationError::Failed(format!(
            "no operation registered for {}",
            item.name
        ))),
    };

    let reported = match outcome {
        Ok(location) => manager.mark_completed(&id, location),
        Err(OperationError::Canceled) => match manager.get_status(&id) {
            Ok(job) if job.status == JobStatus::Started => {
                warn!("operation reported cancellation but the job was not canceled");
                manager.mark_failed(&id, "operation stopped without cancellation")
            }
            _ => {
                info!("operation stopped after cancellation");
                return;
            }
        },
        Err(OperationError::Failed(reason)) => manager.mark_failed(&id, reason),
    };

    match reported {
        Ok(job) => info!(status = %job.status, "job finished"),
        Err(JobError::InvalidTransition { from: JobStatus::Canceled, to, .. }) => {
            warn!(outcome = %to, "job was canceled while running; outcome discarded")
        }
        Err(JobError::NotFound(_)) => warn!("job purged while running; outcome discarded"),
        Err(e) => error!(error = %e, "cannot record job outcome"),
    }
}
