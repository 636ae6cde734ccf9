//! Tests de integración para el servidor HTTP
//! tests/integration_test.rs
//!
//! Cada test levanta su propio servidor en un puerto efímero, con un
//! directorio raíz temporal, y lo maneja con clientes TCP crudos.

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use thread_pool_http::config::Config;
use thread_pool_http::server::{Server, ServerHandle};

/// Servidor corriendo en background; se detiene al salir de scope
struct TestServer {
    dir: TempDir,
    addr: SocketAddr,
    handle: ServerHandle,
    runner: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestServer {
    fn start() -> Self {
        Self::start_with(|_| {})
    }

    fn start_with(configure: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("www");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(root.join("about.html"), "<h1>about</h1>").unwrap();

        let mut config = Config {
            port: 0,
            workers: 4,
            queue_capacity: 16,
            idle_timeout_secs: 2,
            root_dir: root,
            uploads_dir: dir.path().join("uploads"),
            ..Config::default()
        };
        configure(&mut config);

        let server = Server::bind(config).unwrap();
        let addr = server.local_addr();
        let handle = server.handle();
        let runner = thread::spawn(move || server.run());

        TestServer {
            dir,
            addr,
            handle,
            runner: Some(runner),
        }
    }

    fn root(&self) -> std::path::PathBuf {
        self.dir.path().join("www")
    }

    fn host(&self) -> String {
        format!("localhost:{}", self.addr.port())
    }

    fn connect(&self) -> Client {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        Client {
            reader: BufReader::new(stream.try_clone().unwrap()),
            stream,
        }
    }

    fn get(&self, path: &str) -> String {
        format!("GET {path} HTTP/1.1\r\nHost: {}\r\n\r\n", self.host())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.shutdown();
        if let Some(runner) = self.runner.take() {
            let _ = runner.join();
        }
    }
}

struct RawResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl RawResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Cliente que puede leer varias respuestas de una misma conexión
struct Client {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Client {
    fn send(&mut self, raw: &str) {
        self.stream.write_all(raw.as_bytes()).unwrap();
    }

    fn read_response(&mut self) -> RawResponse {
        let mut status_line = String::new();
        self.reader.read_line(&mut status_line).unwrap();
        let status = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok())
            .unwrap_or_else(|| panic!("bad status line: {status_line:?}"));

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            self.reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            let (name, value) = line.split_once(':').unwrap();
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        let mut response = RawResponse {
            status,
            headers,
            body: Vec::new(),
        };
        let len: usize = response.header("Content-Length").unwrap().parse().unwrap();
        response.body = vec![0; len];
        self.reader.read_exact(&mut response.body).unwrap();
        response
    }

    fn request(&mut self, raw: &str) -> RawResponse {
        self.send(raw);
        self.read_response()
    }

    /// true si el servidor cerró la conexión (EOF o reset)
    fn is_closed(&mut self) -> bool {
        let mut buf = [0u8; 1];
        !matches!(self.reader.read(&mut buf), Ok(n) if n > 0)
    }
}

#[test]
fn test_example_scenario() {
    let server = TestServer::start();
    let mut client = server.connect();

    let about = client.request(&server.get("/about.html"));
    assert_eq!(about.status, 200);
    assert_eq!(about.header("Content-Type"), Some("text/html; charset=utf-8"));
    assert_eq!(about.header("Connection"), Some("keep-alive"));
    assert!(about.header("Date").is_some());
    assert_eq!(about.text(), "<h1>about</h1>");

    let traversal = client.request(&server.get("/../etc/passwd"));
    assert_eq!(traversal.status, 403);
    assert_eq!(traversal.header("Connection"), Some("close"));
    assert!(!traversal.text().contains("root:"));
    assert!(client.is_closed());
}

#[test]
fn test_max_requests_per_connection() {
    let server = TestServer::start_with(|c| c.max_requests = 3);
    let mut client = server.connect();

    for expected_remaining in [2, 1] {
        let response = client.request(&server.get("/"));
        assert_eq!(response.status, 200);
        assert_eq!(
            response.header("Keep-Alive"),
            Some(format!("timeout=2, max={expected_remaining}").as_str())
        );
    }

    let last = client.request(&server.get("/"));
    assert_eq!(last.status, 200);
    assert_eq!(last.header("Connection"), Some("close"));
    assert!(client.is_closed());
}

#[test]
fn test_idle_connection_is_closed_by_server() {
    let server = TestServer::start_with(|c| c.idle_timeout_secs = 1);
    let mut client = server.connect();

    let started = Instant::now();
    assert!(client.is_closed());
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(900), "closed too early: {waited:?}");
    assert!(waited < Duration::from_secs(8));
}

#[test]
fn test_idle_timeout_after_keep_alive_response() {
    let server = TestServer::start_with(|c| c.idle_timeout_secs = 1);
    let mut client = server.connect();

    assert_eq!(client.request(&server.get("/")).status, 200);
    assert!(client.is_closed());
}

#[test]
fn test_concurrent_gets_are_independent() {
    let server = TestServer::start_with(|c| c.workers = 4);
    for i in 0..8 {
        let body = format!("<p>{}</p>", i.to_string().repeat(5000));
        fs::write(server.root().join(format!("page{i}.html")), body).unwrap();
    }

    let clients: Vec<_> = (0..8)
        .map(|i| {
            let mut client = server.connect();
            let raw = format!(
                "GET /page{i}.html HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
                server.host()
            );
            thread::spawn(move || (i, client.request(&raw)))
        })
        .collect();

    for handle in clients {
        let (i, response) = handle.join().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.text(), format!("<p>{}</p>", i.to_string().repeat(5000)));
    }
}

#[test]
fn test_host_validation() {
    let server = TestServer::start();

    let mut missing = server.connect();
    let response = missing.request("GET / HTTP/1.1\r\n\r\n");
    assert_eq!(response.status, 400);

    let mut mismatch = server.connect();
    let response = mismatch.request("GET / HTTP/1.1\r\nHost: evil.example:80\r\n\r\n");
    assert_eq!(response.status, 403);
    assert_eq!(response.text(), "{\"error\":\"Forbidden\"}");

    let mut aliased = server.connect();
    let raw = format!("GET / HTTP/1.1\r\nHost: 127.0.0.1:{}\r\n\r\n", server.addr.port());
    assert_eq!(aliased.request(&raw).status, 200);
}

#[test]
fn test_method_not_allowed() {
    let server = TestServer::start();
    let mut client = server.connect();

    let raw = format!("PUT /index.html HTTP/1.1\r\nHost: {}\r\n\r\n", server.host());
    let response = client.request(&raw);
    assert_eq!(response.status, 405);
    assert_eq!(response.header("Allow"), Some("GET, POST"));

    // La conexión sigue abierta
    assert_eq!(client.request(&server.get("/")).status, 200);
}

fn post(server: &TestServer, content_type: &str, body: &str) -> String {
    format!(
        "POST /upload HTTP/1.1\r\nHost: {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n{}",
        server.host(),
        content_type,
        body.len(),
        body
    )
}

#[test]
fn test_upload_then_retrieve() {
    let server = TestServer::start();
    let mut client = server.connect();

    let created = client.request(&post(&server, "application/json", r#"{"item":"lamp","qty":2}"#));
    assert_eq!(created.status, 201);

    let receipt: serde_json::Value = serde_json::from_slice(&created.body).unwrap();
    assert_eq!(receipt["status"], "success");
    assert!(receipt["id"].as_str().is_some());
    let filepath = receipt["filepath"].as_str().unwrap().to_string();
    assert!(filepath.starts_with("/uploads/upload_") && filepath.ends_with(".json"));

    let fetched = client.request(&server.get(&filepath));
    assert_eq!(fetched.status, 200);
    let stored: serde_json::Value = serde_json::from_slice(&fetched.body).unwrap();
    assert_eq!(stored["item"], "lamp");
    assert_eq!(stored["qty"], 2);
}

#[test]
fn test_upload_rejections() {
    let server = TestServer::start();
    let mut client = server.connect();

    let wrong_type = client.request(&post(&server, "text/plain", "hello"));
    assert_eq!(wrong_type.status, 415);

    let malformed = client.request(&post(&server, "application/json", "{not json"));
    assert_eq!(malformed.status, 400);
    assert_eq!(malformed.header("Connection"), Some("keep-alive"));

    let uploads = fs::read_dir(server.dir.path().join("uploads")).unwrap().count();
    assert_eq!(uploads, 0);
}

#[test]
fn test_large_file_round_trip() {
    let server = TestServer::start_with(|c| c.chunk_size = 1024);

    // Contenido pseudo-aleatorio que no es múltiplo del chunk
    let mut seed: u32 = 0x9E37_79B9;
    let content: Vec<u8> = (0..300_001)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (seed & 0xFF) as u8
        })
        .collect();
    fs::write(server.root().join("photo.png"), &content).unwrap();

    let mut client = server.connect();
    let response = client.request(&server.get("/photo.png"));

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Length"), Some("300001"));
    assert_eq!(response.header("Content-Type"), Some("application/octet-stream"));
    assert_eq!(
        response.header("Content-Disposition"),
        Some("attachment; filename=\"photo.png\"")
    );
    assert!(response.body == content);
}

#[test]
fn test_not_found_and_unsupported_extension() {
    let server = TestServer::start();
    fs::write(server.root().join("tool.exe"), "MZ").unwrap();
    let mut client = server.connect();

    assert_eq!(client.request(&server.get("/missing.html")).status, 404);
    assert_eq!(client.request(&server.get("/tool.exe")).status, 415);
    assert_eq!(client.request(&server.get("/about.html")).status, 200);
}

#[test]
fn test_queue_full_rejects_with_503() {
    let server = TestServer::start_with(|c| {
        c.workers = 1;
        c.queue_capacity = 1;
        c.reject_when_full = true;
        c.idle_timeout_secs = 5;
    });

    // Ocupa el único worker con una conexión keep-alive
    let mut busy = server.connect();
    assert_eq!(busy.request(&server.get("/")).status, 200);

    // Llena la cola
    let mut queued = server.connect();

    // Excede la capacidad
    let mut rejected = server.connect();
    let mut raw = String::new();
    rejected.reader.read_to_string(&mut raw).unwrap();
    assert!(raw.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
    assert!(raw.contains("Retry-After: 5\r\n"));
    assert!(raw.contains("Connection: close\r\n"));

    // Al liberar el worker, la conexión encolada se atiende
    drop(busy);
    assert_eq!(queued.request(&server.get("/")).status, 200);
}
