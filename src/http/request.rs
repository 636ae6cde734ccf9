//! # Parsing de Requests HTTP/1.1
//! src/http/request.rs
//!
//! Parser HTTP/1.1 implementado desde cero sobre bytes crudos.
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /upload HTTP/1.1\r\n
//! Host: 127.0.0.1:8080\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 13\r\n
//! \r\n
//! {"ok": true}
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD SP TARGET SP VERSION`
//! 2. **Headers**: Pares `Name: Value` (uno por línea)
//! 3. **Empty Line**: `\r\n` que separa headers del body
//! 4. **Body**: exactamente `Content-Length` bytes
//!
//! El parser no filtra métodos ni versiones: eso le corresponde a la etapa de
//! validación de la conexión. `RequestReader` acumula lecturas del socket
//! hasta tener un mensaje completo.

use super::Headers;
use std::io::{self, Read};
use thiserror::Error;

/// Tamaño de cada lectura del socket
const READ_CHUNK: usize = 4096;

/// Métodos HTTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// POST - Enviar datos a un recurso
    POST,

    /// Cualquier otro token; se rechaza con 405 al validar
    Other(String),
}

impl Method {
    fn from_token(token: &str) -> Self {
        match token {
            "GET" => Method::GET,
            "POST" => Method::POST,
            other => Method::Other(other.to_string()),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::Other(token) => token,
        }
    }

    /// GET y POST son los únicos métodos que atiende el servidor
    pub fn is_supported(&self) -> bool {
        matches!(self, Method::GET | Method::POST)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Request line o headers con sintaxis inválida
    #[error("malformed request: {0}")]
    Malformed(String),

    /// El peer cerró o expiró el deadline antes de completar el mensaje
    #[error("incomplete request")]
    Incomplete,

    /// El bloque de headers supera el límite configurado
    #[error("request head exceeds {0} bytes")]
    HeadersTooLarge(usize),

    /// El body declarado supera el límite configurado
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    /// POST sin Content-Length
    #[error("POST request without Content-Length")]
    MissingContentLength,

    /// Transfer-Encoding (chunked) no está soportado
    #[error("unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),

    /// Error de I/O distinto de timeout/EOF (reset, etc.)
    #[error("i/o error while reading request: {0:?}")]
    Io(io::ErrorKind),
}

/// Límites aplicados al leer un request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    pub max_head_bytes: usize,
    pub max_body_bytes: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_head_bytes: 8192,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Request HTTP parseado. Inmutable una vez construido.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Target tal cual vino en la request line
    target: String,

    /// Path sin query ni fragmento (todavía percent-encoded)
    path: String,

    query: Option<String>,

    version: String,

    headers: Headers,

    body: Vec<u8>,
}

/// Request line + headers, antes de leer el body
struct RequestHead {
    method: Method,
    target: String,
    version: String,
    headers: Headers,
}

impl Request {
    /// Parsea un request completo desde un buffer
    ///
    /// El buffer debe contener el bloque de headers y al menos
    /// `Content-Length` bytes de body; los bytes sobrantes se ignoran.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use thread_pool_http::http::{Method, Request};
    ///
    /// let raw = b"GET /about.html?lang=es HTTP/1.1\r\nHost: localhost:8080\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.method(), &Method::GET);
    /// assert_eq!(request.path(), "/about.html");
    /// assert_eq!(request.query(), Some("lang=es"));
    /// assert_eq!(request.host(), Some("localhost:8080"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let buffer = skip_leading_crlf(buffer);
        let end = find_head_end(buffer).ok_or(ParseError::Incomplete)?;
        let head = parse_head(&buffer[..end])?;
        let len = body_length(&head, usize::MAX)?;

        let body_start = end + 4;
        if buffer.len() < body_start + len {
            return Err(ParseError::Incomplete);
        }

        Ok(Self::from_head(
            head,
            buffer[body_start..body_start + len].to_vec(),
        ))
    }

    fn from_head(head: RequestHead, body: Vec<u8>) -> Self {
        let (path, query) = split_target(&head.target);
        Request {
            method: head.method,
            path,
            query,
            target: head.target,
            version: head.version,
            headers: head.headers,
            body,
        }
    }

    // === Métodos públicos para acceder a los campos ===

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Obtiene un header específico (sin distinguir mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Valor crudo del header Host
    pub fn host(&self) -> Option<&str> {
        self.headers.get("Host")
    }

    /// Media type del Content-Type, sin parámetros y en minúsculas
    pub fn media_type(&self) -> Option<String> {
        self.headers.get("Content-Type").map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Indica si el cliente pidió mantener la conexión abierta.
    ///
    /// HTTP/1.1 es persistente salvo `Connection: close`; HTTP/1.0 solo con
    /// `Connection: keep-alive`.
    pub fn wants_keep_alive(&self) -> bool {
        let tokens: Vec<String> = self
            .headers
            .get("Connection")
            .map(|value| {
                value
                    .split(',')
                    .map(|t| t.trim().to_ascii_lowercase())
                    .collect()
            })
            .unwrap_or_default();

        if tokens.iter().any(|t| t == "close") {
            return false;
        }
        if self.version == "HTTP/1.1" {
            return true;
        }
        tokens.iter().any(|t| t == "keep-alive")
    }
}

/// Lector incremental de requests sobre un stream.
///
/// Conserva los bytes sobrantes entre ciclos, de modo que un segundo request
/// enviado en el mismo segmento TCP se procesa en el ciclo siguiente.
pub struct RequestReader<R> {
    inner: R,
    buffer: Vec<u8>,
    limits: ParseLimits,
}

impl<R: Read> RequestReader<R> {
    pub fn new(inner: R, limits: ParseLimits) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(READ_CHUNK),
            limits,
        }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Bytes ya recibidos que todavía no forman parte de un request procesado
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Bloquea hasta que llegue el primer byte de un request.
    ///
    /// Las líneas vacías (CRLF) entre requests se descartan sin contar como
    /// actividad. Retorna `Ok(false)` si el peer cerró la conexión sin enviar
    /// nada más. Los timeouts del socket se propagan tal cual para que el
    /// llamador los trate como cierre por inactividad.
    pub fn wait_for_data(&mut self) -> io::Result<bool> {
        loop {
            let skipped = self.buffer.len() - skip_leading_crlf(&self.buffer).len();
            self.buffer.drain(..skipped);
            if !self.buffer.is_empty() {
                return Ok(true);
            }

            match self.fill() {
                Ok(0) => return Ok(false),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Lee un request completo: headers y `Content-Length` bytes de body.
    pub fn read_request(&mut self) -> Result<Request, ParseError> {
        let end = loop {
            let skipped = self.buffer.len() - skip_leading_crlf(&self.buffer).len();
            self.buffer.drain(..skipped);

            if let Some(end) = find_head_end(&self.buffer) {
                if end + 4 > self.limits.max_head_bytes {
                    return Err(ParseError::HeadersTooLarge(self.limits.max_head_bytes));
                }
                break end;
            }
            if self.buffer.len() > self.limits.max_head_bytes {
                return Err(ParseError::HeadersTooLarge(self.limits.max_head_bytes));
            }
            self.fill_or_fail()?;
        };

        let head = parse_head(&self.buffer[..end])?;
        let len = body_length(&head, self.limits.max_body_bytes)?;

        let body_start = end + 4;
        while self.buffer.len() < body_start + len {
            self.fill_or_fail()?;
        }

        let body = self.buffer[body_start..body_start + len].to_vec();
        self.buffer.drain(..body_start + len);

        Ok(Request::from_head(head, body))
    }

    fn fill(&mut self) -> io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.inner.read(&mut chunk)?;
        self.buffer.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    fn fill_or_fail(&mut self) -> Result<(), ParseError> {
        loop {
            match self.fill() {
                Ok(0) => return Err(ParseError::Incomplete),
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) => return Err(ParseError::Incomplete),
                Err(e) => return Err(ParseError::Io(e.kind())),
            }
        }
    }
}

/// Un read con deadline vencido reporta `WouldBlock` en Unix y `TimedOut` en Windows
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn skip_leading_crlf(buffer: &[u8]) -> &[u8] {
    let skip = buffer
        .iter()
        .take_while(|b| **b == b'\r' || **b == b'\n')
        .count();
    &buffer[skip..]
}

/// Posición donde empieza el `\r\n\r\n` que cierra los headers
fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_head(head: &[u8]) -> Result<RequestHead, ParseError> {
    let text = std::str::from_utf8(head)
        .map_err(|_| ParseError::Malformed("request head is not valid UTF-8".to_string()))?;

    let mut lines = text.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let (method, target, version) = parse_request_line(request_line)?;

    let mut headers = Headers::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::Malformed(format!("header without colon: {line}")))?;

        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ParseError::Malformed(format!("invalid header name: {name}")));
        }
        headers.insert(name, value.trim());
    }

    Ok(RequestHead {
        method,
        target,
        version,
        headers,
    })
}

/// Formato: `GET /path?query HTTP/1.1`
fn parse_request_line(line: &str) -> Result<(Method, String, String), ParseError> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    // Debe tener exactamente 3 partes: METHOD TARGET VERSION
    let [method, target, version] = parts.as_slice() else {
        return Err(ParseError::Malformed(format!("invalid request line: {line}")));
    };

    let valid_token = method
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid_token {
        return Err(ParseError::Malformed(format!("invalid method token: {method}")));
    }

    if !version.starts_with("HTTP/") {
        return Err(ParseError::Malformed(format!("invalid version: {version}")));
    }

    Ok((
        Method::from_token(method),
        target.to_string(),
        version.to_string(),
    ))
}

fn body_length(head: &RequestHead, max_body: usize) -> Result<usize, ParseError> {
    if let Some(encoding) = head.headers.get("Transfer-Encoding") {
        return Err(ParseError::UnsupportedTransferEncoding(encoding.to_string()));
    }

    let len = match head.headers.get("Content-Length") {
        Some(value) => {
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseError::Malformed(format!(
                    "invalid Content-Length: {value}"
                )));
            }
            value
                .parse::<usize>()
                .map_err(|_| ParseError::BodyTooLarge(max_body))?
        }
        None if head.method == Method::POST => return Err(ParseError::MissingContentLength),
        None => 0,
    };

    if len > max_body {
        return Err(ParseError::BodyTooLarge(max_body));
    }
    Ok(len)
}

/// Separa path y query; descarta el fragmento
fn split_target(target: &str) -> (String, Option<String>) {
    let without_fragment = target.split('#').next().unwrap_or_default();
    match without_fragment.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (without_fragment.to_string(), None),
    }
}
