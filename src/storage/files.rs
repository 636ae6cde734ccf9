//! # FileStore
//! src/storage/files.rs
//!
//! Abre archivos estáticos bajo una raíz y los clasifica por extensión.

use super::StoreError;
use crate::security::SafePath;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Archivo servido cuando el path apunta a un directorio
pub const INDEX_FILE: &str = "index.html";

/// Categoría de contenido según la extensión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Se muestra en el navegador con el Content-Type indicado
    Inline(&'static str),

    /// Se descarga como `application/octet-stream` + `Content-Disposition`
    Download,
}

impl ContentKind {
    /// Clasifica un path por su extensión; `None` si no está soportada
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" => Some(ContentKind::Inline("text/html; charset=utf-8")),
            "json" => Some(ContentKind::Inline("application/json")),
            "txt" | "png" | "jpg" | "jpeg" => Some(ContentKind::Download),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ContentKind::Inline(content_type) => content_type,
            ContentKind::Download => "application/octet-stream",
        }
    }

    pub fn is_download(&self) -> bool {
        matches!(self, ContentKind::Download)
    }
}

/// Archivo abierto y listo para transmitirse
#[derive(Debug)]
pub struct StoredFile {
    pub file: File,
    pub len: u64,
    /// Nombre del archivo (sin directorios), para `Content-Disposition`
    pub name: String,
    pub kind: ContentKind,
}

/// Colaborador de lectura para GET
pub trait FileStore: Send + Sync {
    fn open(&self, path: &SafePath) -> Result<StoredFile, StoreError>;
}

/// FileStore sobre el filesystem local
#[derive(Debug, Clone)]
pub struct FsFileStore {
    /// Raíz canónica
    root: PathBuf,
}

impl FsFileStore {
    /// La raíz debe existir; se guarda en forma canónica
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            root: fs::canonicalize(root)?,
        })
    }
}

impl FileStore for FsFileStore {
    fn open(&self, path: &SafePath) -> Result<StoredFile, StoreError> {
        let mut candidate = path.resolve(&self.root);
        if candidate.is_dir() {
            candidate.push(INDEX_FILE);
        }

        // Cualquier fallo al resolver (inexistente, ENOTDIR, permisos) es 404
        let canonical = fs::canonicalize(&candidate).map_err(|_| StoreError::NotFound)?;
        if !canonical.starts_with(&self.root) {
            return Err(StoreError::OutsideRoot);
        }

        let metadata = fs::metadata(&canonical).map_err(|_| StoreError::NotFound)?;
        if !metadata.is_file() {
            return Err(StoreError::NotFound);
        }

        let kind = ContentKind::from_path(&canonical).ok_or_else(|| {
            StoreError::UnsupportedType(
                canonical
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        })?;

        let file = File::open(&canonical)?;
        let name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(StoredFile {
            file,
            len: metadata.len(),
            name,
            kind,
        })
    }
}
