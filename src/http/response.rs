//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! ```
//! use job_server::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Accepted)
//!     .with_header("Location", "/jobs/42")
//!     .with_body(r#"{"status": "PENDING"}"#);
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.1 202 Accepted\r\n"));
//! ```

use super::StatusCode;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::error;

/// Respuesta HTTP completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// Un valor por nombre; `with_header` sobrescribe
    headers: HashMap<String, String>,

    body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el body y su `Content-Length`
    pub fn with_body(self, body: &str) -> Self {
        self.with_body_bytes(body.as_bytes().to_vec())
    }

    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.headers
            .insert("Content-Length".to_string(), body.len().to_string());
        self.body = body;
        self
    }

    /// Respuesta JSON con el valor serializado
    ///
    /// Si la serialización falla responde 500.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status)
                .with_header("Content-Type", "application/json")
                .with_body_bytes(body),
            Err(e) => {
                error!(error = %e, "failed to serialize response body");
                Self::error(
                    StatusCode::InternalServerError,
                    "internal_error",
                    "failed to serialize response",
                )
            }
        }
    }

    /// Error JSON: `{"error": code, "message": message}`
    ///
    /// ```
    /// use job_server::http::{Response, StatusCode};
    ///
    /// let response = Response::error(StatusCode::NotFound, "not_found", "job not found");
    /// assert_eq!(response.status(), StatusCode::NotFound);
    /// ```
    pub fn error(status: StatusCode, code: &str, message: &str) -> Self {
        let body = json!({ "error": code, "message": message }).to_string();
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(&body)
    }

    /// Serializa status line, headers y body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = format!("HTTP/1.1 {}\r\n", self.status).into_bytes();

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
        if !self.headers.contains_key("Content-Length") {
            result.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        }
        result.extend_from_slice(b"Connection: close\r\n\r\n");

        result.extend_from_slice(&self.body);
        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body parseado como JSON (útil en tests y logs)
    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}
