//! # Pool de Worker Threads
//! src/server/pool.rs
//!
//! Conjunto fijo de threads creados una sola vez al arrancar. Cada worker
//! repite: desencolar (bloquea si no hay tareas) → ejecutar el handler →
//! volver a la cola. Un panic dentro del handler queda aislado en esa tarea:
//! se registra, la tarea se descarta (al hacer unwind se cierra su socket) y
//! el worker sigue atendiendo.

use super::queue::{SubmitError, TaskQueue};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Foto del estado del pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub active: usize,
    pub queued: usize,
    pub capacity: usize,
}

struct Worker {
    name: String,
    handle: Option<JoinHandle<()>>,
}

/// Pool de threads que procesa tareas de tipo `T`
pub struct ThreadPool<T: Send + 'static> {
    queue: Arc<TaskQueue<T>>,
    workers: Vec<Worker>,
    active: Arc<AtomicUsize>,
}

impl<T: Send + 'static> ThreadPool<T> {
    /// Crea la cola y lanza `size` workers antes de aceptar tareas
    pub fn start<H>(size: usize, capacity: usize, handler: H) -> io::Result<Self>
    where
        H: Fn(T) + Send + Sync + 'static,
    {
        let queue = Arc::new(TaskQueue::new(capacity));
        let handler = Arc::new(handler);
        let active = Arc::new(AtomicUsize::new(0));

        let mut pool = Self {
            queue,
            workers: Vec::with_capacity(size),
            active,
        };

        for i in 1..=size.max(1) {
            let name = format!("worker-{i}");
            let queue = Arc::clone(&pool.queue);
            let handler = Arc::clone(&handler);
            let active = Arc::clone(&pool.active);
            let thread_name = name.clone();

            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(&thread_name, &queue, handler.as_ref(), &active));

            match spawned {
                Ok(handle) => pool.workers.push(Worker {
                    name,
                    handle: Some(handle),
                }),
                Err(e) => {
                    // Detener los que sí arrancaron antes de propagar
                    pool.shutdown();
                    return Err(e);
                }
            }
        }

        info!(
            workers = pool.workers.len(),
            queue_capacity = pool.queue.capacity(),
            "thread pool started"
        );
        Ok(pool)
    }

    /// Encola una tarea bloqueando mientras la cola esté llena
    pub fn submit(&self, task: T) -> Result<(), SubmitError<T>> {
        self.queue.push(task)
    }

    /// Encola sin bloquear; `QueueFull` si no hay espacio
    pub fn try_submit(&self, task: T) -> Result<(), SubmitError<T>> {
        self.queue.try_push(task)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.workers.len(),
            active: self.active.load(Ordering::SeqCst),
            queued: self.queue.len(),
            capacity: self.queue.capacity(),
        }
    }

    /// Deja de aceptar tareas, espera a que se procesen las encoladas y las
    /// que están en curso, y une todos los workers.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.queue.close();

        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    error!(worker = %worker.name, "worker thread terminated abnormally");
                }
            }
        }
        info!(workers = self.workers.len(), "thread pool stopped");
        self.workers.clear();
    }
}

impl<T: Send + 'static> Drop for ThreadPool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<T, H>(name: &str, queue: &TaskQueue<T>, handler: &H, active: &AtomicUsize)
where
    H: Fn(T),
{
    debug!(worker = name, "worker started");

    while let Some(task) = queue.pop() {
        active.fetch_add(1, Ordering::SeqCst);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(task)));
        active.fetch_sub(1, Ordering::SeqCst);

        if let Err(payload) = outcome {
            error!(
                worker = name,
                panic = %panic_message(payload.as_ref()),
                "task panicked; its connection was dropped"
            );
        }
    }

    debug!(worker = name, "worker stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
