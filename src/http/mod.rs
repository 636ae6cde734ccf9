//! # Módulo HTTP
//!
//! Implementa el subconjunto de HTTP/1.1 que necesita el servidor, sin usar
//! librerías de alto nivel:
//!
//! - Parsing incremental de requests (`request`)
//! - Construcción y escritura de responses con body en chunks (`response`)
//! - Headers ordenados y case-insensitive (`headers`)
//! - Códigos de estado (`status`)
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Date: Tue, 15 Oct 2025 10:30:00 GMT\r\n
//! Content-Type: text/html; charset=utf-8\r\n
//! Content-Length: 13\r\n
//! Connection: keep-alive\r\n
//! \r\n
//! <h1>Hola</h1>
//! ```

pub mod headers;
pub mod request;
pub mod response;
pub mod status;

// Re-exportamos los tipos principales para facilitar su uso
pub use headers::Headers;
pub use request::{Method, ParseError, ParseLimits, Request, RequestReader};
pub use response::{Body, Connection, Response};
pub use status::StatusCode;
