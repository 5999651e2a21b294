//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Códigos que usa el gateway de jobs:
//!
//! - **2xx**: 200, 202 (job aceptado), 204 (purga)
//! - **3xx**: 303 (job completado con recurso resultante)
//! - **4xx**: 400, 403 (cancelar job terminal), 404, 405
//! - **5xx**: 500, 503 (capacidad agotada)

use std::fmt;

/// Códigos de estado soportados por el servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,

    /// Job creado y encolado
    Accepted = 202,

    NoContent = 204,

    /// El job terminó y su resultado vive en `Location`
    SeeOther = 303,

    BadRequest = 400,

    /// Operación no permitida en el estado actual del job
    Forbidden = 403,

    NotFound = 404,

    /// Ruta conocida, método no soportado
    MethodNotAllowed = 405,

    InternalServerError = 500,

    /// Capacidad de jobs o de la cola agotada
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// ```
    /// use job_server::http::StatusCode;
    /// assert_eq!(StatusCode::Accepted.as_u16(), 202);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::SeeOther => "See Other",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    /// 3xx
    pub fn is_redirection(&self) -> bool {
        (300..400).contains(&self.as_u16())
    }

    /// 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    /// 5xx
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl fmt::Display for StatusCode {
    /// Formato: "202 Accepted"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
