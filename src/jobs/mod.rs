//! # Sistema de Jobs
//! src/jobs/mod.rs
//!
//! Ciclo de vida de operaciones asíncronas: el cliente crea un job, recibe
//! su id de inmediato y consulta el estado mientras un worker ejecuta la
//! operación fuera de banda.
//!
//! ```text
//! PENDING ──> STARTED ──> COMPLETED
//!    │           │
//!    └───────────┴──> CANCELED | FAILED
//! ```
//!
//! - `types`: estados, transiciones y snapshot `Job`
//! - `store`: registros con un lock por job
//! - `queue`: cola acotada hacia los workers
//! - `manager`: operaciones públicas del ciclo de vida
//! - `worker`: registro de operaciones y pool de threads
//! - `retention`, `maintenance`, `persistence`: purga periódica y snapshot
//! - `handlers`: endpoints HTTP

pub mod handlers;
pub mod maintenance;
pub mod manager;
pub mod persistence;
pub mod queue;
pub mod retention;
pub mod store;
pub mod types;
pub mod worker;

pub use handlers::JobsApi;
pub use maintenance::Maintenance;
pub use manager::{JobManager, JobManagerConfig};
pub use queue::{JobQueue, WorkItem};
pub use retention::{KeepForever, RetentionPolicy, TerminalTtl};
pub use types::{Job, JobStatus};
pub use worker::{
    JobContext, Operation, OperationError, OperationRegistry, OperationResult, WorkerPool,
};
