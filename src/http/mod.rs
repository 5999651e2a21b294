//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Implementación mínima de HTTP/1.x sobre `TcpStream`, sin frameworks:
//!
//! - Parsing de requests (método, path, query, headers, body)
//! - Construcción de responses con body JSON
//! - Códigos de estado que usa el gateway de jobs
//!
//! Cada conexión atiende un único request y se cierra
//! (`Connection: close`).

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
