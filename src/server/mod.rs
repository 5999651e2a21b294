//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! 1. Escucha en un puerto
//! 2. Acepta conexiones, una por thread
//! 3. Lee y parsea el request
//! 4. Despacha al router y envía la respuesta

pub mod tcp;

pub use tcp::Server;
