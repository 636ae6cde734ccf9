//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! API para construir respuestas HTTP/1.1 y escribirlas en el socket.
//!
//! El body puede venir de memoria o de un archivo abierto; en ese caso se
//! transmite en chunks de tamaño fijo, así el tamaño del archivo no acota la
//! memoria usada. El `Content-Length` declarado siempre coincide con los bytes
//! escritos: si el archivo resulta más corto, la escritura falla y la conexión
//! debe cerrarse.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use thread_pool_http::http::{Connection, Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Content-Type", "application/json")
//!     .with_body(r#"{"message": "Hello"}"#);
//!
//! let mut wire = Vec::new();
//! response.write_to(&mut wire, Connection::Close, 8192).unwrap();
//! assert!(wire.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

use super::{Headers, StatusCode};
use std::fs::File;
use std::io::{self, Read, Write};
use std::time::SystemTime;

/// Valor del header `Server`
pub const SERVER_NAME: &str = concat!("thread-pool-http/", env!("CARGO_PKG_VERSION"));

/// Fuente del cuerpo de la respuesta
#[derive(Debug)]
pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    /// Archivo abierto con su tamaño al momento de abrirlo
    File { file: File, len: u64 },
}

impl Body {
    pub fn len(&self) -> u64 {
        match self {
            Body::Empty => 0,
            Body::Bytes(bytes) => bytes.len() as u64,
            Body::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decisión de persistencia que se anuncia en el header `Connection`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    KeepAlive { timeout_secs: u64, remaining: usize },
    Close,
}

/// Representa una respuesta HTTP/1.1 completa. Se consume al escribirse.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Body,
}

impl Response {
    /// Crea una nueva respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::Empty,
        }
    }

    /// Agrega un header (si ya existe, se sobrescribe)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Versión mutable de `with_header`
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name, value);
    }

    /// Establece el cuerpo de la respuesta desde un string
    pub fn with_body(self, body: &str) -> Self {
        self.with_body_bytes(body.as_bytes().to_vec())
    }

    /// Establece el cuerpo de la respuesta desde bytes
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = Body::Bytes(body);
        self
    }

    /// Usa un archivo abierto como cuerpo; se transmite en chunks
    pub fn with_file(mut self, file: File, len: u64) -> Self {
        self.body = Body::File { file, len };
        self
    }

    /// Marca la respuesta como descarga (`Content-Disposition: attachment`)
    pub fn with_attachment(self, filename: &str) -> Self {
        let safe: String = filename
            .chars()
            .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
            .collect();
        self.with_header(
            "Content-Disposition",
            &format!("attachment; filename=\"{safe}\""),
        )
    }

    /// Respuesta JSON con el status indicado
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(&value.to_string())
    }

    /// Respuesta de error con mensaje JSON: `{"error": "mensaje"}`
    ///
    /// El mensaje debe ser genérico: nunca incluir rutas del filesystem ni
    /// detalles internos.
    ///
    /// # Ejemplo
    /// ```
    /// use thread_pool_http::http::{Response, StatusCode};
    ///
    /// let response = Response::error(StatusCode::Forbidden, "Forbidden");
    /// assert_eq!(response.status(), StatusCode::Forbidden);
    /// ```
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Completa los headers obligatorios: Date, Server, Content-Type,
    /// Content-Length, Connection y Keep-Alive.
    fn prepare(&mut self, connection: Connection) {
        let len = self.body.len();
        self.headers
            .insert("Date", &httpdate::fmt_http_date(SystemTime::now()));
        self.headers.insert_default("Server", SERVER_NAME);
        self.headers
            .insert_default("Content-Type", "text/plain; charset=utf-8");
        self.headers.insert("Content-Length", &len.to_string());

        match connection {
            Connection::KeepAlive {
                timeout_secs,
                remaining,
            } => {
                self.headers.insert("Connection", "keep-alive");
                self.headers.insert(
                    "Keep-Alive",
                    &format!("timeout={timeout_secs}, max={remaining}"),
                );
            }
            Connection::Close => {
                self.headers.insert("Connection", "close");
                self.headers.remove("Keep-Alive");
            }
        }
    }

    /// Status line + headers + línea vacía
    fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {}\r\n", self.status);
        for (name, value) in self.headers.iter() {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        head.into_bytes()
    }

    /// Serializa y escribe la respuesta completa.
    ///
    /// Retorna la cantidad de bytes de body escritos, que siempre es igual
    /// al `Content-Length` declarado.
    pub fn write_to<W: Write>(
        mut self,
        out: &mut W,
        connection: Connection,
        chunk_size: usize,
    ) -> io::Result<u64> {
        self.prepare(connection);
        let mut wire = self.head_bytes();

        let written = match self.body {
            Body::Empty => {
                out.write_all(&wire)?;
                0
            }
            Body::Bytes(bytes) => {
                // Bodies en memoria viajan junto con los headers
                wire.extend_from_slice(&bytes);
                out.write_all(&wire)?;
                bytes.len() as u64
            }
            Body::File { mut file, len } => {
                out.write_all(&wire)?;
                stream_exact(&mut file, out, len, chunk_size.max(1))?
            }
        };

        out.flush()?;
        Ok(written)
    }
}

/// Copia exactamente `len` bytes de `source` en chunks de `chunk_size`
fn stream_exact<R: Read, W: Write>(
    source: &mut R,
    out: &mut W,
    len: u64,
    chunk_size: usize,
) -> io::Result<u64> {
    let mut buf = vec![0u8; chunk_size];
    let mut remaining = len;

    while remaining > 0 {
        let want = remaining.min(chunk_size as u64) as usize;
        let n = match source.read(&mut buf[..want]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("body source ended {remaining} bytes before Content-Length"),
                ))
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        out.write_all(&buf[..n])?;
        remaining -= n as u64;
    }

    Ok(len)
}
