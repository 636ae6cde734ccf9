//! # Thread Pool HTTP Server
//! src/lib.rs
//!
//! Servidor HTTP/1.1 concurrente construido directamente sobre sockets TCP:
//! acepta conexiones, las reparte a un pool acotado de worker threads,
//! parsea requests, aplica políticas de seguridad y protocolo y administra
//! el ciclo de vida de conexiones persistentes (keep-alive, idle timeout,
//! máximo de requests por conexión).
//!
//! ## Arquitectura
//!
//! - `http`: parsing de requests y serialización de responses
//! - `security`: validación de paths y del header Host
//! - `storage`: archivos servidos por GET y uploads recibidos por POST
//! - `server`: listener, cola de tareas, pool de workers y máquina de estados
//! - `config`, `logging`, `error`: configuración, tracing y errores por request
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use thread_pool_http::config::Config;
//! use thread_pool_http::server::Server;
//!
//! let server = Server::bind(Config::default()).expect("bind");
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod security;
pub mod server;
pub mod storage;
