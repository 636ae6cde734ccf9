//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor HTTP con soporte para argumentos CLI y
//! variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./thread_pool_http --port 8080 \
//!   --workers 10 \
//!   --queue-capacity 200 \
//!   --idle-timeout 30 \
//!   --max-requests 100
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 ROOT_DIR=./resources ./thread_pool_http
//! ```

use crate::http::ParseLimits;
use crate::security::authority;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Configuración del servidor HTTP/1.1
#[derive(Debug, Clone, Parser)]
#[command(name = "thread_pool_http")]
#[command(about = "Servidor HTTP/1.1 concurrente con pool de threads acotado")]
#[command(version)]
pub struct Config {
    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    // === Pool ===
    /// Número de worker threads
    #[arg(short, long, default_value = "10", env = "WORKERS")]
    pub workers: usize,

    /// Capacidad máxima de la cola de conexiones
    #[arg(long = "queue-capacity", default_value = "200", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Responder 503 cuando la cola está llena en vez de bloquear el accept
    #[arg(long = "reject-when-full", env = "REJECT_WHEN_FULL")]
    pub reject_when_full: bool,

    // === Conexiones ===
    /// Segundos de inactividad antes de cerrar una conexión
    #[arg(long = "idle-timeout", default_value = "30", env = "IDLE_TIMEOUT_SECS")]
    pub idle_timeout_secs: u64,

    /// Máximo de requests por conexión persistente
    #[arg(long = "max-requests", default_value = "100", env = "MAX_REQUESTS")]
    pub max_requests: usize,

    // === Archivos ===
    /// Directorio raíz servido por GET
    #[arg(long = "root", default_value = "./resources", env = "ROOT_DIR")]
    pub root_dir: PathBuf,

    /// Directorio donde se guardan los uploads
    #[arg(long = "uploads", default_value = "./resources/uploads", env = "UPLOADS_DIR")]
    pub uploads_dir: PathBuf,

    /// Tamaño de cada chunk al transmitir archivos (bytes)
    #[arg(long = "chunk-size", default_value = "8192", env = "CHUNK_SIZE")]
    pub chunk_size: usize,

    // === Límites ===
    /// Tamaño máximo de request line + headers
    #[arg(long = "max-header-bytes", default_value = "8192", env = "MAX_HEADER_BYTES")]
    pub max_header_bytes: usize,

    /// Tamaño máximo del body de un POST
    #[arg(long = "max-body-bytes", default_value = "10485760", env = "MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    // === Logging ===
    /// Archivo adicional donde escribir los logs
    #[arg(long = "log-file", env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use thread_pool_http::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        authority(&self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn parse_limits(&self) -> ParseLimits {
        ParseLimits {
            max_head_bytes: self.max_header_bytes,
            max_body_bytes: self.max_body_bytes,
        }
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("Workers must be >= 1".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("Queue capacity must be >= 1".to_string());
        }
        if self.idle_timeout_secs == 0 {
            return Err("Idle timeout must be > 0".to_string());
        }
        if self.max_requests == 0 {
            return Err("Max requests per connection must be >= 1".to_string());
        }
        if !(512..=1024 * 1024).contains(&self.chunk_size) {
            return Err("Chunk size must be between 512 bytes and 1 MiB".to_string());
        }
        if self.max_header_bytes < 256 {
            return Err("Max header bytes must be >= 256".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: 10,
            queue_capacity: 200,
            reject_when_full: false,
            idle_timeout_secs: 30,
            max_requests: 100,
            root_dir: PathBuf::from("./resources"),
            uploads_dir: PathBuf::from("./resources/uploads"),
            chunk_size: 8192,
            max_header_bytes: 8192,
            max_body_bytes: 10 * 1024 * 1024,
            log_file: None,
        }
    }
}
