//! # Persistencia de Uploads
//! src/storage/uploads.rs
//!
//! Cada upload crea un archivo nuevo `upload_<fecha>_<id>.json` en el
//! directorio de uploads. Los archivos nunca se modifican después de creados,
//! así que no hay conflictos de escritura entre conexiones.

use super::StoreError;
use chrono::Local;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Intentos antes de rendirse ante colisiones de nombre
const MAX_NAME_ATTEMPTS: usize = 8;

/// Resultado de un upload exitoso
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    /// Identificador único del upload
    pub id: String,

    /// Nombre del archivo creado
    pub filename: String,

    /// Path público desde el que se puede recuperar (`GET`)
    pub filepath: String,
}

/// Colaborador de escritura para POST
pub trait UploadStore: Send + Sync {
    fn save(&self, document: &serde_json::Value) -> Result<UploadReceipt, StoreError>;
}

/// UploadStore sobre el filesystem local
#[derive(Debug, Clone)]
pub struct FsUploadStore {
    dir: PathBuf,
    public_prefix: String,
}

impl FsUploadStore {
    /// Crea el directorio si no existe
    pub fn new(dir: impl AsRef<Path>) -> io::Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            public_prefix: "/uploads".to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn new_id() -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S"), &suffix[..8])
    }
}

impl UploadStore for FsUploadStore {
    fn save(&self, document: &serde_json::Value) -> Result<UploadReceipt, StoreError> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let id = Self::new_id();
            let filename = format!("upload_{id}.json");

            // create_new garantiza que nunca pisamos un upload existente
            let file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&filename))
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StoreError::Io(e)),
            };

            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, document).map_err(io::Error::from)?;
            writer.flush()?;

            return Ok(UploadReceipt {
                filepath: format!("{}/{}", self.public_prefix, filename),
                id,
                filename,
            });
        }

        Err(StoreError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not allocate a unique upload name",
        )))
    }
}
