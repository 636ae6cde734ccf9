//! # Manejo de Conexiones
//! src/server/connection.rs
//!
//! Máquina de estados explícita que atiende una conexión aceptada de
//! principio a fin dentro de un worker:
//!
//! ```text
//! AwaitRequest → Parse → Validate → Dispatch → Respond ─┬─→ AwaitRequest (keep-alive)
//!                  │         │                    ↑     └─→ Close
//!                  └─────────┴── (error) ─────────┘
//! ```
//!
//! El estado por conexión (contador de requests, última actividad) vive en el
//! `ConnectionHandler`, que pertenece exclusivamente al worker que lo ejecuta.

use super::dispatch::Dispatcher;
use crate::error::{RequestError, RequestResult};
use crate::http::request::is_timeout;
use crate::http::{Connection, Method, ParseError, ParseLimits, Request, RequestReader, Response};
use crate::security::{validate_host, validate_path, HostPolicy, SafePath};
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Único media type aceptado en un POST
const JSON_MEDIA_TYPE: &str = "application/json";

/// Configuración compartida (solo lectura) por todas las conexiones
pub struct ConnectionContext {
    pub idle_timeout: Duration,
    pub max_requests: usize,
    pub chunk_size: usize,
    pub limits: ParseLimits,
    pub host_policy: HostPolicy,
    pub dispatcher: Dispatcher,
}

/// Motivo por el que terminó una conexión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// El cliente cerró sin enviar otro request
    PeerClosed,

    /// Venció el idle timeout esperando el siguiente request
    IdleTimeout,

    /// El request pidió `Connection: close` (o era HTTP/1.0 sin keep-alive)
    ClientRequested,

    /// Se alcanzó el máximo de requests por conexión
    RequestLimit,

    /// Un error del request obligó a cerrar
    RequestFailed,

    /// Falló la lectura o la escritura del socket
    IoError,
}

enum State {
    AwaitRequest,
    Parse,
    Validate(Request),
    Dispatch(Request, SafePath),
    Respond { response: Response, forced_close: bool },
    Close(CloseReason),
}

/// Resultado de una conexión terminada
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub requests: usize,
    pub reason: CloseReason,
}

/// Estado de una conexión, propiedad exclusiva del worker que la atiende
pub struct ConnectionHandler<'a, S> {
    ctx: &'a ConnectionContext,
    reader: RequestReader<S>,
    peer: String,
    request_count: usize,
    last_activity: Instant,
    should_close: bool,

    /// Método y path del request en curso, para el log
    current: Option<(String, String)>,

    /// Si el request en curso admite keep-alive
    client_keep_alive: bool,
}

impl<'a, S: Read + Write> ConnectionHandler<'a, S> {
    pub fn new(stream: S, peer: impl Into<String>, ctx: &'a ConnectionContext) -> Self {
        Self {
            ctx,
            reader: RequestReader::new(stream, ctx.limits),
            peer: peer.into(),
            request_count: 0,
            last_activity: Instant::now(),
            should_close: false,
            current: None,
            client_keep_alive: false,
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count
    }

    /// Ejecuta la máquina de estados hasta `Close`
    pub fn run(&mut self) -> ConnectionSummary {
        let mut state = State::AwaitRequest;
        loop {
            state = match self.step(state) {
                State::Close(reason) => {
                    return ConnectionSummary {
                        requests: self.request_count,
                        reason,
                    }
                }
                next => next,
            };
        }
    }

    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }

    fn step(&mut self, state: State) -> State {
        match state {
            State::AwaitRequest => self.await_request(),
            State::Parse => self.parse(),
            State::Validate(request) => self.validate(request),
            State::Dispatch(request, path) => self.dispatch(&request, &path),
            State::Respond {
                response,
                forced_close,
            } => self.respond(response, forced_close),
            State::Close(reason) => State::Close(reason),
        }
    }

    /// Espera el siguiente request con el idle timeout armado en el socket
    fn await_request(&mut self) -> State {
        self.current = None;
        self.client_keep_alive = false;

        match self.reader.wait_for_data() {
            Ok(true) => {
                self.last_activity = Instant::now();
                State::Parse
            }
            Ok(false) => State::Close(CloseReason::PeerClosed),
            Err(e) if is_timeout(&e) => {
                debug!(
                    peer = %self.peer,
                    idle_ms = self.last_activity.elapsed().as_millis() as u64,
                    "idle timeout"
                );
                State::Close(CloseReason::IdleTimeout)
            }
            Err(e) => {
                debug!(peer = %self.peer, error = %e, "read failed");
                State::Close(CloseReason::IoError)
            }
        }
    }

    fn parse(&mut self) -> State {
        match self.reader.read_request() {
            Ok(request) => State::Validate(request),
            Err(ParseError::Io(kind)) => {
                debug!(peer = %self.peer, ?kind, "read failed while parsing");
                State::Close(CloseReason::IoError)
            }
            Err(e) => self.fail(e.into()),
        }
    }

    fn validate(&mut self, request: Request) -> State {
        self.current = Some((
            request.method().as_str().to_string(),
            request.path().to_string(),
        ));
        self.client_keep_alive = request.wants_keep_alive();

        match self.check(&request) {
            Ok(path) => State::Dispatch(request, path),
            Err(e) => self.fail(e),
        }
    }

    /// Versión → Host → método → path → Content-Type (solo POST)
    fn check(&self, request: &Request) -> RequestResult<SafePath> {
        if !matches!(request.version(), "HTTP/1.1" | "HTTP/1.0") {
            return Err(RequestError::UnsupportedVersion(
                request.version().to_string(),
            ));
        }

        validate_host(request.host(), &self.ctx.host_policy)?;

        if !request.method().is_supported() {
            return Err(RequestError::UnsupportedMethod(
                request.method().as_str().to_string(),
            ));
        }

        let path = validate_path(request.path())?;

        if *request.method() == Method::POST {
            match request.media_type() {
                Some(media) if media == JSON_MEDIA_TYPE => {}
                other => return Err(RequestError::UnsupportedContentType(other.unwrap_or_default())),
            }
        }

        Ok(path)
    }

    fn dispatch(&mut self, request: &Request, path: &SafePath) -> State {
        match self.ctx.dispatcher.dispatch(request, path) {
            Ok(response) => State::Respond {
                response,
                forced_close: false,
            },
            Err(e) => self.fail(e),
        }
    }

    /// Convierte un error en la respuesta que recibe el cliente
    fn fail(&mut self, err: RequestError) -> State {
        let status = err.status();
        if status.is_server_error() {
            error!(peer = %self.peer, error = %err, "request failed");
        } else {
            warn!(peer = %self.peer, status = status.as_u16(), error = %err, "request rejected");
        }

        let mut response = Response::error(status, err.public_message());
        if matches!(err, RequestError::UnsupportedMethod(_)) {
            response.add_header("Allow", "GET, POST");
        }

        State::Respond {
            response,
            forced_close: err.forces_close(),
        }
    }

    fn respond(&mut self, response: Response, forced_close: bool) -> State {
        // Un request inválido también consume su lugar
        self.request_count += 1;

        let limit_reached = self.request_count >= self.ctx.max_requests;
        self.should_close = forced_close || !self.client_keep_alive || limit_reached;

        let connection = if self.should_close {
            Connection::Close
        } else {
            Connection::KeepAlive {
                timeout_secs: self.ctx.idle_timeout.as_secs(),
                remaining: self.ctx.max_requests - self.request_count,
            }
        };

        let status = response.status();
        let written = response.write_to(self.reader.get_mut(), connection, self.ctx.chunk_size);

        let (method, path) = self
            .current
            .take()
            .unwrap_or_else(|| ("-".to_string(), "-".to_string()));
        info!(
            peer = %self.peer,
            method = %method,
            path = %path,
            status = status.as_u16(),
            "request"
        );

        if let Err(e) = written {
            debug!(peer = %self.peer, error = %e, "write failed");
            return State::Close(CloseReason::IoError);
        }
        self.last_activity = Instant::now();

        if !self.should_close {
            State::AwaitRequest
        } else if forced_close {
            State::Close(CloseReason::RequestFailed)
        } else if !self.client_keep_alive {
            State::Close(CloseReason::ClientRequested)
        } else {
            State::Close(CloseReason::RequestLimit)
        }
    }
}

/// Atiende una conexión TCP completa y libera el socket al terminar
pub fn handle_connection(stream: TcpStream, peer: SocketAddr, ctx: &ConnectionContext) {
    if let Err(e) = stream
        .set_read_timeout(Some(ctx.idle_timeout))
        .and_then(|_| stream.set_write_timeout(Some(ctx.idle_timeout)))
    {
        warn!(peer = %peer, error = %e, "could not arm socket timeouts");
        return;
    }
    let _ = stream.set_nodelay(true);

    debug!(peer = %peer, "connection accepted");
    let mut handler = ConnectionHandler::new(stream, peer.to_string(), ctx);
    let summary = handler.run();

    // El socket se cierra aunque la última escritura haya fallado
    let stream = handler.into_inner();
    let _ = stream.shutdown(Shutdown::Both);

    debug!(
        peer = %peer,
        requests = summary.requests,
        reason = ?summary.reason,
        "connection closed"
    );
}
