//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Listener que acepta conexiones y las encola como tareas para el pool de
//! workers. El thread que acepta nunca atiende requests: solo encola.
//!
//! Si la cola está llena, según la configuración:
//! - se bloquea el accept hasta que haya lugar (por defecto), o
//! - se responde `503 Service Unavailable` y se cierra el socket.

use super::connection::{handle_connection, ConnectionContext};
use super::dispatch::Dispatcher;
use super::pool::ThreadPool;
use super::queue::SubmitError;
use crate::config::Config;
use crate::http::{Connection, Response, StatusCode};
use crate::security::HostPolicy;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Segundos sugeridos al cliente rechazado por cola llena
const RETRY_AFTER_SECS: &str = "5";

/// Pausa tras un error de accept
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Una conexión aceptada esperando worker
struct Task {
    stream: TcpStream,
    peer: SocketAddr,
}

/// Servidor HTTP/1.1 con pool de threads acotado
pub struct Server {
    config: Config,
    listener: TcpListener,
    local_addr: SocketAddr,
    context: Arc<ConnectionContext>,
    stopping: Arc<AtomicBool>,
}

/// Permite detener un servidor que está corriendo en otro thread
#[derive(Clone)]
pub struct ServerHandle {
    stopping: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ServerHandle {
    /// Detiene el accept loop. Las conexiones ya encoladas o en curso se
    /// terminan de atender antes de que `Server::run` retorne.
    pub fn shutdown(&self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        // Despertar el accept bloqueado con una conexión propia
        let _ = TcpStream::connect_timeout(&self.wake_addr, Duration::from_secs(1));
    }
}

impl Server {
    /// Hace bind y prepara los stores. No lanza workers todavía.
    pub fn bind(config: Config) -> io::Result<Self> {
        let listener = TcpListener::bind(config.address())?;
        let local_addr = listener.local_addr()?;

        let context = ConnectionContext {
            idle_timeout: config.idle_timeout(),
            max_requests: config.max_requests,
            chunk_size: config.chunk_size,
            limits: config.parse_limits(),
            host_policy: HostPolicy::for_server(&config.host, local_addr.port()),
            dispatcher: Dispatcher::from_config(&config)?,
        };

        Ok(Self {
            config,
            listener,
            local_addr,
            context: Arc::new(context),
            stopping: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Dirección real del listener (útil con puerto 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> ServerHandle {
        let mut wake_addr = self.local_addr;
        if wake_addr.ip().is_unspecified() {
            wake_addr.set_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        }
        ServerHandle {
            stopping: Arc::clone(&self.stopping),
            wake_addr,
        }
    }

    /// Detiene el servidor (con drenado de conexiones) al recibir Ctrl-C
    pub fn shutdown_on_interrupt(&self) -> Result<(), ctrlc::Error> {
        let handle = self.handle();
        ctrlc::set_handler(move || {
            info!("interrupt received, shutting down");
            handle.shutdown();
        })
    }

    /// Lanza el pool y acepta conexiones hasta `ServerHandle::shutdown`
    pub fn run(self) -> io::Result<()> {
        let context = Arc::clone(&self.context);
        let mut pool = ThreadPool::start(
            self.config.workers,
            self.config.queue_capacity,
            move |task: Task| handle_connection(task.stream, task.peer, &context),
        )?;

        info!(
            address = %self.local_addr,
            workers = pool.size(),
            queue_capacity = self.config.queue_capacity,
            root = %self.config.root_dir.display(),
            reject_when_full = self.config.reject_when_full,
            "server listening"
        );

        self.accept_loop(&pool, self.listener.incoming());

        info!("shutting down, draining connections");
        pool.shutdown();
        info!("server stopped");
        Ok(())
    }

    fn accept_loop<I>(&self, pool: &ThreadPool<Task>, incoming: I)
    where
        I: IntoIterator<Item = io::Result<TcpStream>>,
    {
        for stream in incoming {
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    // EMFILE/ENFILE persisten hasta que se libere algún socket
                    warn!(error = %e, "accept failed");
                    thread::sleep(ACCEPT_BACKOFF);
                    continue;
                }
            };
            let peer = match stream.peer_addr() {
                Ok(peer) => peer,
                Err(e) => {
                    debug!(error = %e, "peer vanished before enqueue");
                    continue;
                }
            };

            self.enqueue(pool, Task { stream, peer });
        }
    }

    fn enqueue(&self, pool: &ThreadPool<Task>, task: Task) {
        let submitted = if self.config.reject_when_full {
            pool.try_submit(task)
        } else {
            pool.submit(task)
        };

        match submitted {
            Ok(()) => {}
            Err(SubmitError::QueueFull(task)) => {
                let stats = pool.stats();
                warn!(
                    peer = %task.peer,
                    queued = stats.queued,
                    capacity = stats.capacity,
                    "queue full, rejecting connection"
                );
                self.reject(task);
            }
            Err(SubmitError::Closed(task)) => {
                debug!(peer = %task.peer, "pool closed, dropping connection");
            }
        }
    }

    /// Responde 503 desde el thread que acepta y cierra el socket
    fn reject(&self, task: Task) {
        let mut stream = task.stream;
        let _ = stream.set_write_timeout(Some(Duration::from_secs(1)));

        let response = Response::error(StatusCode::ServiceUnavailable, "Server busy")
            .with_header("Retry-After", RETRY_AFTER_SECS);
        if let Err(e) = response.write_to(&mut stream, Connection::Close, self.config.chunk_size) {
            debug!(peer = %task.peer, error = %e, "could not deliver 503");
        }
        let _ = stream.shutdown(Shutdown::Both);
    }
}
