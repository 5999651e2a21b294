//! # Handlers HTTP para Jobs
//! src/jobs/handlers.rs
//!
//! Traduce requests del gateway a operaciones del `JobManager` y sus
//! resultados a códigos HTTP.
//!
//! | Ruta | Éxito | Errores |
//! |---|---|---|
//! | `POST/PUT/DELETE {operations}/{name}` | 202 + `Location` | 400, 404, 503/500 |
//! | `GET {jobs}/{id}` | 200, o 303 + `Location` si hay resultado | 404 |
//! | `DELETE {jobs}/{id}` | 200 | 403, 404 |
//! | `POST {jobs}/{id}/purge` | 204 | 404 |
//! | `GET {jobs}?status=` | 200 | 400 |

use crate::error::JobError;
use crate::http::{Method, Request, Response, StatusCode};
use crate::jobs::manager::JobManager;
use crate::jobs::types::{Job, JobStatus};
use crate::jobs::worker::OperationRegistry;
use crate::router::{PathParams, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Body opcional de creación
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubmitBody {
    #[serde(default)]
    eta: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct JobList {
    count: usize,
    jobs: Vec<Job>,
}

/// Endpoints de jobs sobre un manager compartido
pub struct JobsApi {
    manager: Arc<JobManager>,
    registry: Arc<OperationRegistry>,

    /// Prefijo de los recursos de job, sin '/' final
    jobs_path: String,

    /// Código para `JobError::Capacity` (503 o 500)
    capacity_status: StatusCode,
}

impl JobsApi {
    pub fn new(
        manager: Arc<JobManager>,
        registry: Arc<OperationRegistry>,
        jobs_path: &str,
        capacity_status: StatusCode,
    ) -> Self {
        Self {
            manager,
            registry,
            jobs_path: jobs_path.trim_end_matches('/').to_string(),
            capacity_status,
        }
    }

    /// URI del recurso de un job
    pub fn job_location(&self, id: &Uuid) -> String {
        format!("{}/{}", self.jobs_path, id)
    }

    /// `{operations}/{name}`: crea un job para la operación
    pub fn submit(&self, request: &Request, params: &PathParams) -> Response {
        let name = params.get("name").unwrap_or_default();

        if !self.registry.contains(name) {
            return Response::error(
                StatusCode::NotFound,
                "unknown_operation",
                &format!("unknown operation: {}", name),
            );
        }

        let eta = match requested_eta(request) {
            Ok(eta) => eta,
            Err(message) => return Response::error(StatusCode::BadRequest, "bad_request", &message),
        };

        match self.manager.create(name, eta) {
            Ok(job) => {
                let location = self.job_location(&job.id);
                Response::json(StatusCode::Accepted, &job).with_header("Location", &location)
            }
            Err(e) => self.error_response(&e),
        }
    }

    /// `GET {jobs}/{id}`
    pub fn status(&self, _request: &Request, params: &PathParams) -> Response {
        let job = match self.lookup(params, |manager, id| manager.get_status(id)) {
            Ok(job) => job,
            Err(response) => return response,
        };

        let mut response = match (job.status, job.result_resource_location.as_deref()) {
            (JobStatus::Completed, Some(location)) => {
                Response::json(StatusCode::SeeOther, &job).with_header("Location", location)
            }
            _ => Response::json(StatusCode::Ok, &job),
        };

        if let Some(secs) = job.retry_after_seconds {
            response.add_header("Retry-After", &secs.to_string());
        }
        response
    }

    /// `DELETE {jobs}/{id}`
    pub fn cancel(&self, _request: &Request, params: &PathParams) -> Response {
        match self.lookup(params, |manager, id| manager.cancel(id)) {
            Ok(job) => Response::json(StatusCode::Ok, &job),
            Err(response) => response,
        }
    }

    /// `POST {jobs}/{id}/purge`
    pub fn purge(&self, _request: &Request, params: &PathParams) -> Response {
        match self.lookup(params, |manager, id| manager.purge(id)) {
            Ok(_) => Response::new(StatusCode::NoContent),
            Err(response) => response,
        }
    }

    /// `GET {jobs}[?status=STATUS]`
    pub fn list(&self, request: &Request, _params: &PathParams) -> Response {
        let filter = match request.query_param("status") {
            Some(raw) => match raw.parse::<JobStatus>() {
                Ok(status) => Some(status),
                Err(message) => {
                    return Response::error(StatusCode::BadRequest, "bad_request", &message)
                }
            },
            None => None,
        };

        let jobs = self.manager.list(filter);
        Response::json(
            StatusCode::Ok,
            &JobList {
                count: jobs.len(),
                jobs,
            },
        )
    }

    /// Código HTTP y body para un error del manager
    pub fn error_response(&self, error: &JobError) -> Response {
        let message = error.to_string();

        match error {
            JobError::NotFound(_) => {
                Response::error(StatusCode::NotFound, "not_found", &message)
            }
            JobError::Conflict { .. } => {
                Response::error(StatusCode::Forbidden, "conflict", &message)
            }
            JobError::Capacity { .. } => {
                warn!(error = %error, "job rejected: capacity exhausted");
                let mut response =
                    Response::error(self.capacity_status, "capacity_exceeded", &message);
                if let Some(secs) = self.manager.config().retry_after_secs {
                    response.add_header("Retry-After", &secs.to_string());
                }
                response
            }
            JobError::InvalidTransition { .. } => {
                error!(error = %error, "invalid transition reached the gateway");
                Response::error(StatusCode::InternalServerError, "internal_error", &message)
            }
        }
    }

    /// Parsea el id del path y aplica `op`; un id malformado es 404
    fn lookup<F>(&self, params: &PathParams, op: F) -> Result<Job, Response>
    where
        F: FnOnce(&JobManager, &Uuid) -> Result<Job, JobError>,
    {
        let raw = params.get("id").unwrap_or_default();
        let Ok(id) = Uuid::parse_str(raw) else {
            debug!(id = raw, "malformed job id");
            return Err(Response::error(
                StatusCode::NotFound,
                "not_found",
                &format!("job not found: {}", raw),
            ));
        };

        op(&*self.manager, &id).map_err(|e| self.error_response(&e))
    }
}

/// ETA pedido por el cliente: `?eta=` tiene prioridad sobre el body JSON
fn requested_eta(request: &Request) -> Result<Option<DateTime<Utc>>, String> {
    if let Some(raw) = request.query_param("eta") {
        return DateTime::parse_from_rfc3339(raw)
            .map(|eta| Some(eta.with_timezone(&Utc)))
            .map_err(|e| format!("invalid eta '{}': {}", raw, e));
    }

    let body = request.body_str().ok_or("request body is not valid UTF-8")?;
    if body.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str::<SubmitBody>(body)
        .map(|parsed| parsed.eta)
        .map_err(|e| format!("invalid request body: {}", e))
}

/// Registra las rutas de jobs en el router
pub fn register_routes(router: &mut Router, api: Arc<JobsApi>, operations_path: &str) {
    let operations_path = operations_path.trim_end_matches('/');
    let jobs_path = api.jobs_path.clone();

    for method in [Method::POST, Method::PUT, Method::DELETE] {
        let api = Arc::clone(&api);
        router.register(method, &format!("{}/{{name}}", operations_path), move |req, params| {
            api.submit(req, params)
        });
    }

    let status_api = Arc::clone(&api);
    router.register(Method::GET, &format!("{}/{{id}}", jobs_path), move |req, params| {
        status_api.status(req, params)
    });

    let cancel_api = Arc::clone(&api);
    router.register(Method::DELETE, &format!("{}/{{id}}", jobs_path), move |req, params| {
        cancel_api.cancel(req, params)
    });

    let purge_api = Arc::clone(&api);
    router.register(Method::POST, &format!("{}/{{id}}/purge", jobs_path), move |req, params| {
        purge_api.purge(req, params)
    });

    router.register(Method::GET, &jobs_path, move |req, params| api.list(req, params));
}
