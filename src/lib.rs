//! # Job Server
//! src/lib.rs
//!
//! Servidor HTTP para operaciones de larga duración. Cada request a una
//! operación crea un job, responde `202 Accepted` con su ubicación y la
//! operación corre en un pool de workers; el cliente consulta, cancela o
//! purga el job por su id.
//!
//! ## Arquitectura
//!
//! - `http`: parsing de requests y construcción de responses
//! - `router`: despacho por método y patrón de path
//! - `server`: servidor TCP, un thread por conexión
//! - `jobs`: ciclo de vida, workers, retención y persistencia
//! - `config`, `logging`, `error`: configuración, tracing y errores
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use job_server::config::Config;
//! use job_server::jobs::OperationRegistry;
//! use job_server::server::Server;
//! use std::time::Duration;
//!
//! let config = Config::default();
//! let registry = OperationRegistry::with_builtins(Duration::from_secs(5));
//! let server = Server::new(config, registry).expect("server setup");
//! server.run().expect("server failed");
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod jobs;
pub mod logging;
pub mod router;
pub mod server;
