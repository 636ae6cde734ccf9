//! # Stores de Archivos
//! src/storage/mod.rs
//!
//! Colaboradores externos del paso DISPATCH:
//!
//! - `FileStore`: abre archivos bajo la raíz servida (GET)
//! - `UploadStore`: persiste documentos JSON subidos (POST /upload)
//!
//! El servidor solo depende de los traits; las implementaciones de
//! filesystem son simples envoltorios de I/O.

pub mod files;
pub mod uploads;

pub use files::{ContentKind, FileStore, FsFileStore, StoredFile};
pub use uploads::{FsUploadStore, UploadReceipt, UploadStore};

use thiserror::Error;

/// Errores de los stores. Se convierten en respuestas HTTP, nunca terminan
/// la conexión por sí mismos (salvo `Io`).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("resource not found")]
    NotFound,

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// El path canónico (symlinks resueltos) quedó fuera de la raíz
    #[error("resolved path escapes the store root")]
    OutsideRoot,

    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
}
