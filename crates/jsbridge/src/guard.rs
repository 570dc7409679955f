//! Serialized access to one engine instance.
//!
//! The engine is single-threaded, so every operation against a context, from the
//! context itself or from any proxy derived from it, goes through the same
//! [`AccessGuard`]. The guard's slot also carries the open/closed state:
//! `Some(engine)` while open, `None` once closed. Because the engine is taken
//! out of the slot under the lock, it is destroyed at most once no matter how
//! many threads race to close it, and nothing can reach it afterwards.

use parking_lot::Mutex;

use crate::{
    engine::Engine,
    error::{Error, Result},
};

pub(crate) struct AccessGuard<E> {
    slot: Mutex<Option<E>>,
}

impl<E: Engine> AccessGuard<E> {
    pub(crate) fn new(engine: E) -> Self {
        Self {
            slot: Mutex::new(Some(engine)),
        }
    }

    /// Runs `f` with exclusive access to the engine.
    ///
    /// Blocks while another operation on the same context is in flight. The
    /// lock is released when `f` returns, on success and failure alike.
    pub(crate) fn with_engine<T>(&self, f: impl FnOnce(&mut E) -> Result<T>) -> Result<T> {
        let mut slot = self.slot.lock();
        let engine = slot.as_mut().ok_or(Error::Closed)?;
        f(engine)
    }

    /// Destroys the engine if it is still open. Returns whether this call did so.
    pub(crate) fn close(&self) -> bool {
        let mut slot = self.slot.lock();
        match slot.take() {
            Some(engine) => {
                engine.destroy();
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.slot.lock().is_none()
    }

    /// Takes the engine out without locking, for use from `Drop`.
    pub(crate) fn take_exclusive(&mut self) -> Option<E> {
        self.slot.get_mut().take()
    }
}
