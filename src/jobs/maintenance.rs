//! # Mantenimiento
//! src/jobs/maintenance.rs
//!
//! Hilo de fondo que cada `interval` aplica la política de retención y,
//! si hay ruta configurada, guarda un snapshot del almacén en disco.

use crate::jobs::manager::JobManager;
use crate::jobs::persistence;
use crate::jobs::retention::RetentionPolicy;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

/// Handle del hilo de mantenimiento
pub struct Maintenance {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl Maintenance {
    pub fn spawn(
        manager: Arc<JobManager>,
        policy: Box<dyn RetentionPolicy>,
        interval: Duration,
        storage: Option<PathBuf>,
    ) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        info!(
            policy = %policy.describe(),
            interval_secs = interval.as_secs(),
            storage = ?storage,
            "maintenance started"
        );

        let handle = thread::Builder::new()
            .name("maintenance".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        run_once(&manager, policy.as_ref(), storage.as_deref());
                    }
                    // Señal explícita o handle descartado
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        // Último snapshot antes de salir
                        if let Some(path) = storage.as_deref() {
                            write_snapshot(&manager, path);
                        }
                        debug!("maintenance exiting");
                        break;
                    }
                }
            })?;

        Ok(Self { stop_tx, handle })
    }

    /// Despierta el hilo y espera a que termine
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            error!("maintenance thread panicked");
        }
        info!("maintenance stopped");
    }
}

/// Una pasada: retención y snapshot
pub fn run_once(manager: &JobManager, policy: &dyn RetentionPolicy, storage: Option<&Path>) {
    let purged = manager.purge_expired(policy, Utc::now());
    debug!(purged = purged.len(), remaining = manager.len(), "maintenance pass");

    if let Some(path) = storage {
        write_snapshot(manager, path);
    }
}

fn write_snapshot(manager: &JobManager, path: &Path) {
    let jobs = manager.list(None);
    match persistence::save_snapshot(path, &jobs) {
        Ok(()) => debug!(jobs = jobs.len(), path = %path.display(), "snapshot written"),
        Err(e) => error!(error = %e, path = %path.display(), "failed to write snapshot"),
    }
}
