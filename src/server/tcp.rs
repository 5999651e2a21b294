//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Un thread por conexión, un request por conexión. El servidor además es
//! dueño del `JobManager`, del pool de workers y del hilo de mantenimiento.

use crate::config::Config;
use crate::http::{request, Request, Response, StatusCode};
use crate::jobs::handlers::{self, JobsApi};
use crate::jobs::manager::{JobManager, JobManagerConfig};
use crate::jobs::worker::{OperationRegistry, WorkerPool};
use crate::jobs::{persistence, retention, Maintenance};
use crate::router::Router;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, field, info, info_span, warn};

/// Tamaño máximo aceptado para un request completo
const MAX_REQUEST_BYTES: usize = 1024 * 1024;

const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Servidor HTTP del gateway de jobs
pub struct Server {
    config: Config,
    router: Arc<Router>,
    manager: Arc<JobManager>,
    workers: WorkerPool,
    maintenance: Maintenance,
}

impl Server {
    /// Arma el manager, restaura el snapshot, arranca workers y mantenimiento
    pub fn new(config: Config, registry: OperationRegistry) -> io::Result<Self> {
        let manager = Arc::new(JobManager::new(JobManagerConfig::from_config(&config)));

        if let Some(path) = &config.jobs_storage {
            match persistence::load_snapshot(path) {
                Ok(jobs) => {
                    let restored = manager.restore(jobs);
                    info!(restored, path = %path.display(), "jobs restored from snapshot");
                }
                Err(e) => warn!(error = %e, path = %path.display(), "ignoring unreadable snapshot"),
            }
        }

        let registry = Arc::new(registry);
        info!(operations = ?registry.names(), "operations registered");

        let workers = WorkerPool::spawn(
            Arc::clone(&manager),
            Arc::clone(&registry),
            config.workers,
        );
        let maintenance = Maintenance::spawn(
            Arc::clone(&manager),
            retention::from_secs(config.retention_secs),
            config.cleanup_interval(),
            config.jobs_storage.clone(),
        )?;

        let api = Arc::new(JobsApi::new(
            Arc::clone(&manager),
            registry,
            &config.jobs_path,
            config.capacity_status.status_code(),
        ));
        let mut router = Router::new();
        handlers::register_routes(&mut router, api, &config.operations_path);

        Ok(Self {
            config,
            router: Arc::new(router),
            manager,
            workers,
            maintenance,
        })
    }

    pub fn manager(&self) -> &Arc<JobManager> {
        &self.manager
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Escucha en la dirección configurada
    pub fn run(&self) -> io::Result<()> {
        let address = self.config.address();
        let listener = TcpListener::bind(&address)?;
        info!(%address, "server listening");
        self.serve(listener)
    }

    /// Acepta conexiones del listener hasta que falle
    pub fn serve(&self, listener: TcpListener) -> io::Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let router = Arc::clone(&self.router);
                    let spawned = thread::Builder::new()
                        .name("conn".to_string())
                        .spawn(move || handle_connection(stream, &router));
                    if let Err(e) = spawned {
                        error!(error = %e, "failed to spawn connection thread");
                    }
                }
                Err(e) => warn!(error = %e, "failed to accept connection"),
            }
        }
        Ok(())
    }

    /// Detiene workers y mantenimiento (escribe el último snapshot)
    pub fn shutdown(self) {
        self.workers.shutdown();
        self.maintenance.stop();
        info!("server stopped");
    }
}

/// Atiende un request y cierra la conexión
pub fn handle_connection(mut stream: TcpStream, router: &Router) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let span = info_span!("request", %peer, method = field::Empty, path = field::Empty);
    let _enter = span.enter();
    let start = Instant::now();

    let response = match read_request(&mut stream) {
        Ok(None) => {
            debug!("connection closed without data");
            return;
        }
        Ok(Some(buffer)) => match Request::parse(&buffer) {
            Ok(request) => {
                span.record("method", request.method().as_str());
                span.record("path", request.path());
                router.route(&request)
            }
            Err(e) => {
                debug!(error = %e, "malformed request");
                Response::error(StatusCode::BadRequest, "bad_request", &e.to_string())
            }
        },
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            Response::error(StatusCode::BadRequest, "bad_request", &e.to_string())
        }
        Err(e) => {
            warn!(error = %e, "failed to read request");
            return;
        }
    };

    let written = stream
        .write_all(&response.to_bytes())
        .and_then(|_| stream.flush());
    if let Err(e) = written {
        warn!(error = %e, "failed to write response");
        return;
    }

    info!(
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_secs_f64() * 1000.0,
        "request handled"
    );
}

/// Lee hasta tener headers y body completos, o hasta EOF
fn read_request(stream: &mut TcpStream) -> io::Result<Option<Vec<u8>>> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;

    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);

        let expected = request::expected_len(&buffer);
        if buffer.len() > MAX_REQUEST_BYTES || expected.is_some_and(|n| n > MAX_REQUEST_BYTES) {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "request too large"));
        }
        if expected.is_some_and(|n| buffer.len() >= n) {
            break;
        }
    }

    Ok((!buffer.is_empty()).then_some(buffer))
}
