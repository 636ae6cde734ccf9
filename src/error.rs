//! # Errores por Request
//! src/error.rs
//!
//! Unifica los errores de parsing, validación y stores en un solo tipo que
//! sabe qué status produce, si obliga a cerrar la conexión y qué mensaje
//! genérico ve el cliente.

use crate::http::{ParseError, StatusCode};
use crate::security::SecurityError;
use crate::storage::StoreError;
use thiserror::Error;

pub type RequestResult<T> = Result<T, RequestError>;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unsupported HTTP version: {0}")]
    UnsupportedVersion(String),

    #[error("method not allowed: {0}")]
    UnsupportedMethod(String),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("invalid JSON body: {0}")]
    InvalidJson(String),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::Parse(_) => StatusCode::BadRequest,
            RequestError::Security(SecurityError::MissingHost) => StatusCode::BadRequest,
            RequestError::Security(_) => StatusCode::Forbidden,
            RequestError::Store(StoreError::NotFound) => StatusCode::NotFound,
            RequestError::Store(StoreError::UnsupportedType(_)) => {
                StatusCode::UnsupportedMediaType
            }
            RequestError::Store(StoreError::OutsideRoot) => StatusCode::Forbidden,
            RequestError::Store(StoreError::Io(_)) => StatusCode::InternalServerError,
            RequestError::UnsupportedVersion(_) => StatusCode::BadRequest,
            RequestError::UnsupportedMethod(_) => StatusCode::MethodNotAllowed,
            RequestError::UnsupportedContentType(_) => StatusCode::UnsupportedMediaType,
            RequestError::InvalidJson(_) => StatusCode::BadRequest,
        }
    }

    /// Errores de parsing, violaciones de seguridad y fallos internos
    /// terminan el ciclo keep-alive.
    pub fn forces_close(&self) -> bool {
        matches!(
            self,
            RequestError::Parse(_)
                | RequestError::Security(_)
                | RequestError::UnsupportedVersion(_)
                | RequestError::Store(StoreError::OutsideRoot)
                | RequestError::Store(StoreError::Io(_))
        )
    }

    /// Mensaje para el body de la respuesta. Nunca incluye paths ni detalles
    /// del sistema operativo.
    pub fn public_message(&self) -> &'static str {
        match self {
            RequestError::Parse(ParseError::HeadersTooLarge(_)) => "Request headers too large",
            RequestError::Parse(ParseError::BodyTooLarge(_)) => "Request body too large",
            RequestError::Parse(ParseError::MissingContentLength) => "Content-Length required",
            RequestError::Parse(ParseError::UnsupportedTransferEncoding(_)) => {
                "Transfer-Encoding not supported"
            }
            RequestError::Parse(_) => "Malformed request",
            RequestError::Security(SecurityError::MissingHost) => "Missing Host header",
            RequestError::Security(_) | RequestError::Store(StoreError::OutsideRoot) => {
                "Forbidden"
            }
            RequestError::Store(StoreError::NotFound) => "Not Found",
            RequestError::Store(StoreError::UnsupportedType(_)) => "Unsupported file type",
            RequestError::Store(StoreError::Io(_)) => "Internal Server Error",
            RequestError::UnsupportedVersion(_) => "Unsupported HTTP version",
            RequestError::UnsupportedMethod(_) => "Method Not Allowed",
            RequestError::UnsupportedContentType(_) => "Content-Type must be application/json",
            RequestError::InvalidJson(_) => "Invalid JSON body",
        }
    }
}
