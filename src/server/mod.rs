//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Subsistema de manejo de conexiones:
//! 1. `tcp`: acepta conexiones y las encola como tareas
//! 2. `queue` / `pool`: cola acotada y workers pre-creados que la consumen
//! 3. `connection`: máquina de estados por conexión (keep-alive, timeouts)
//! 4. `dispatch`: delega requests válidos a los stores

pub mod connection;
pub mod dispatch;
pub mod pool;
pub mod queue;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use connection::{CloseReason, ConnectionContext, ConnectionHandler, ConnectionSummary};
pub use dispatch::Dispatcher;
pub use pool::{PoolStats, ThreadPool};
pub use queue::{SubmitError, TaskQueue};
pub use tcp::{Server, ServerHandle};
