//! # Thread Pool HTTP Server - Entry Point
//! src/main.rs
//!
//! Parsea la configuración (CLI + variables de entorno), inicializa el
//! logging y corre el servidor hasta que el proceso termina.

use thread_pool_http::config::Config;
use thread_pool_http::logging;
use thread_pool_http::server::Server;

fn main() {
    let config = Config::new();

    if let Err(e) = config.validate() {
        eprintln!("Configuración inválida: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = logging::init(config.log_file.as_deref()) {
        eprintln!("No se pudo inicializar el logging: {}", e);
        std::process::exit(1);
    }

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "could not start server");
            eprintln!("Error fatal: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.shutdown_on_interrupt() {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }

    // Esto bloquea el thread principal hasta Ctrl-C
    if let Err(e) = server.run() {
        tracing::error!(error = %e, "server terminated");
        eprintln!("Error fatal: {}", e);
        std::process::exit(1);
    }
}
