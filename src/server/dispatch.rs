//! # Dispatch de Requests
//! src/server/dispatch.rs
//!
//! Paso DISPATCH de la máquina de estados: un request ya validado se delega
//! al colaborador que corresponde.
//!
//! ```text
//! GET  /uploads/<name> → FileStore de uploads
//! GET  /<path>         → FileStore del sitio
//! POST /upload         → UploadStore
//! ```
//!
//! Los errores de los colaboradores vuelven como `RequestError` y la conexión
//! los convierte en respuestas (404, 415, 500); nunca terminan el worker.

use crate::config::Config;
use crate::error::{RequestError, RequestResult};
use crate::http::{Method, Request, Response, StatusCode};
use crate::security::SafePath;
use crate::storage::{FileStore, FsFileStore, FsUploadStore, StoreError, UploadStore};
use serde_json::json;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Path (relativo) que acepta uploads por POST
const UPLOAD_ROUTE: &str = "upload";

/// Prefijo bajo el cual se sirven los uploads por GET
const UPLOADS_MOUNT: &str = "uploads";

/// Despacha requests validados a los stores
#[derive(Clone)]
pub struct Dispatcher {
    site: Arc<dyn FileStore>,
    uploaded_files: Arc<dyn FileStore>,
    uploads: Arc<dyn UploadStore>,
}

impl Dispatcher {
    pub fn new(
        site: Arc<dyn FileStore>,
        uploaded_files: Arc<dyn FileStore>,
        uploads: Arc<dyn UploadStore>,
    ) -> Self {
        Self {
            site,
            uploaded_files,
            uploads,
        }
    }

    /// Stores de filesystem según la configuración. Crea el directorio de
    /// uploads si no existe; la raíz servida debe existir.
    pub fn from_config(config: &Config) -> io::Result<Self> {
        Self::for_directories(&config.root_dir, &config.uploads_dir)
    }

    pub fn for_directories(root: &Path, uploads_dir: &Path) -> io::Result<Self> {
        let uploads = FsUploadStore::new(uploads_dir)?;
        Ok(Self::new(
            Arc::new(FsFileStore::new(root)?),
            Arc::new(FsFileStore::new(uploads.dir())?),
            Arc::new(uploads),
        ))
    }

    /// Produce la respuesta para un request que ya pasó la validación
    pub fn dispatch(&self, request: &Request, path: &SafePath) -> RequestResult<Response> {
        match request.method() {
            Method::GET => self.get(path),
            Method::POST => self.post(request, path),
            Method::Other(token) => Err(RequestError::UnsupportedMethod(token.clone())),
        }
    }

    fn get(&self, path: &SafePath) -> RequestResult<Response> {
        let stored = match path.strip_segment(UPLOADS_MOUNT) {
            Some(rest) => self.uploaded_files.open(&rest)?,
            None => self.site.open(path)?,
        };

        let mut response = Response::new(StatusCode::Ok)
            .with_header("Content-Type", stored.kind.content_type())
            .with_file(stored.file, stored.len);
        if stored.kind.is_download() {
            response = response.with_attachment(&stored.name);
        }
        Ok(response)
    }

    fn post(&self, request: &Request, path: &SafePath) -> RequestResult<Response> {
        if path.relative() != Path::new(UPLOAD_ROUTE) {
            return Err(StoreError::NotFound.into());
        }

        let document: serde_json::Value = serde_json::from_slice(request.body())
            .map_err(|e| RequestError::InvalidJson(e.to_string()))?;

        let receipt = self.uploads.save(&document)?;
        tracing::info!(id = %receipt.id, filepath = %receipt.filepath, "upload stored");

        let body = json!({
            "status": "success",
            "message": "File created successfully",
            "id": receipt.id,
            "filepath": receipt.filepath,
        });
        Ok(Response::json(StatusCode::Created, &body).with_header("Location", &receipt.filepath))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Body;
    use crate::security::validate_path;
    use crate::storage::UploadReceipt;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Dispatcher) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("www");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(root.join("photo.png"), [0x89, b'P', b'N', b'G']).unwrap();
        fs::write(root.join("app.exe"), "MZ").unwrap();
        let dispatcher = Dispatcher::for_directories(&root, &dir.path().join("uploads")).unwrap();
        (dir, dispatcher)
    }

    fn request(raw: &str) -> Request {
        Request::parse(raw.as_bytes()).unwrap()
    }

    fn run(dispatcher: &Dispatcher, raw: &str) -> RequestResult<Response> {
        let request = request(raw);
        let path = validate_path(request.path()).unwrap();
        dispatcher.dispatch(&request, &path)
    }

    #[test]
    fn test_get_html_inline() {
        let (_dir, dispatcher) = fixture();
        let response = run(&dispatcher, "GET / HTTP/1.1\r\n\r\n").unwrap();

        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.header("Content-Type"), Some("text/html; charset=utf-8"));
        assert!(response.header("Content-Disposition").is_none());
        assert_eq!(response.body().len(), 13);
    }

    #[test]
    fn test_get_binary_as_attachment() {
        let (_dir, dispatcher) = fixture();
        let response = run(&dispatcher, "GET /photo.png HTTP/1.1\r\n\r\n").unwrap();

        assert_eq!(response.header("Content-Type"), Some("application/octet-stream"));
        assert_eq!(
            response.header("Content-Disposition"),
            Some("attachment; filename=\"photo.png\"")
        );
        assert!(matches!(response.body(), Body::File { len: 4, .. }));
    }

    #[test]
    fn test_get_missing_and_unsupported() {
        let (_dir, dispatcher) = fixture();

        let missing = run(&dispatcher, "GET /missing.html HTTP/1.1\r\n\r\n").unwrap_err();
        assert_eq!(missing.status(), StatusCode::NotFound);
        assert!(!missing.forces_close());

        let exe = run(&dispatcher, "GET /app.exe HTTP/1.1\r\n\r\n").unwrap_err();
        assert_eq!(exe.status(), StatusCode::UnsupportedMediaType);
    }

    #[test]
    fn test_post_upload_then_get() {
        let (_dir, dispatcher) = fixture();
        let body = r#"{"name":"widget","qty":3}"#;
        let raw = format!(
            "POST /upload HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );

        let response = run(&dispatcher, &raw).unwrap();
        assert_eq!(response.status(), StatusCode::Created);
        let location = response.header("Location").unwrap().to_string();
        assert!(location.starts_with("/uploads/upload_"));

        let fetched = run(&dispatcher, &format!("GET {location} HTTP/1.1\r\n\r\n")).unwrap();
        assert_eq!(fetched.status(), StatusCode::Ok);
        assert_eq!(fetched.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_post_invalid_json() {
        let (_dir, dispatcher) = fixture();
        let raw = "POST /upload HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 8\r\n\r\n{broken:";
        let err = run(&dispatcher, raw).unwrap_err();
        assert!(matches!(err, RequestError::InvalidJson(_)));
        assert_eq!(err.status(), StatusCode::BadRequest);
    }

    #[test]
    fn test_post_other_route_is_not_found() {
        let (_dir, dispatcher) = fixture();
        let raw = "POST /elsewhere HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}";
        assert_eq!(run(&dispatcher, raw).unwrap_err().status(), StatusCode::NotFound);
    }

    struct FailingUploads;

    impl UploadStore for FailingUploads {
        fn save(&self, _: &serde_json::Value) -> Result<UploadReceipt, StoreError> {
            Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk full at /var/x")))
        }
    }

    #[test]
    fn test_upload_store_failure_is_internal_error() {
        let (dir, _) = fixture();
        let site = Arc::new(FsFileStore::new(dir.path().join("www")).unwrap());
        let dispatcher = Dispatcher::new(site.clone(), site, Arc::new(FailingUploads));

        let raw = "POST /upload HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}";
        let err = run(&dispatcher, raw).unwrap_err();
        assert_eq!(err.status(), StatusCode::InternalServerError);
        assert!(err.forces_close());
    }
}
