//! # Cola Acotada de Tareas
//! src/server/queue.rs
//!
//! Cola FIFO thread-safe con capacidad máxima. Es el único objeto que mutan
//! varios threads a la vez: un mutex protege el estado y dos condvars
//! despiertan a productores (hay espacio) y consumidores (hay tareas).

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Error al encolar; devuelve la tarea al llamador para que decida qué hacer
/// con ella (por ejemplo, responder 503 y cerrar el socket).
#[derive(Error)]
pub enum SubmitError<T> {
    #[error("task queue is full")]
    QueueFull(T),

    #[error("task queue is closed")]
    Closed(T),
}

impl<T> SubmitError<T> {
    pub fn into_inner(self) -> T {
        match self {
            SubmitError::QueueFull(task) | SubmitError::Closed(task) => task,
        }
    }
}

impl<T> fmt::Debug for SubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::QueueFull(_) => f.write_str("QueueFull(..)"),
            SubmitError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Cola FIFO acotada
pub struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,

    /// Se notifica cuando entra una tarea o se cierra la cola
    not_empty: Condvar,

    /// Se notifica cuando sale una tarea o se cierra la cola
    not_full: Condvar,

    capacity: usize,
}

impl<T> TaskQueue<T> {
    /// Crea una nueva cola con capacidad máxima (al menos 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    // Ninguna sección crítica ejecuta código de usuario, así que un mutex
    // envenenado sigue teniendo un estado consistente.
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encola bloqueando mientras la cola esté llena
    pub fn push(&self, task: T) -> Result<(), SubmitError<T>> {
        let mut state = self.lock();
        while state.items.len() >= self.capacity && !state.closed {
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.closed {
            return Err(SubmitError::Closed(task));
        }
        state.items.push_back(task);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Encola sin bloquear; falla con `QueueFull` si no hay espacio
    pub fn try_push(&self, task: T) -> Result<(), SubmitError<T>> {
        let mut state = self.lock();
        if state.closed {
            return Err(SubmitError::Closed(task));
        }
        if state.items.len() >= self.capacity {
            return Err(SubmitError::QueueFull(task));
        }
        state.items.push_back(task);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Desencola la tarea más antigua, bloqueando mientras la cola esté vacía.
    ///
    /// Retorna `None` solo cuando la cola está cerrada y ya no quedan tareas:
    /// las tareas encoladas antes del cierre se siguen entregando.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(task) = state.items.pop_front() {
                self.not_full.notify_one();
                return Some(task);
            }
            if state.closed {
                return None;
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Cierra la cola: rechaza nuevas tareas y despierta a todos los threads
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Retorna el tamaño actual de la cola
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
