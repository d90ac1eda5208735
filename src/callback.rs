//! A subscriber registry meant to be embedded as a single field, not
//! inherited from (§9 "dynamic dispatch / prototype mixins").

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque subscription handle returned by [`EventEmitter::subscribe`].
pub type Handle = u64;

/// A minimal publish/subscribe list. Components that need `add_callback` /
/// `remove_callback` hold one of these as a struct field and delegate to it,
/// rather than exposing subscriber state through inheritance.
pub struct EventEmitter<T> {
    next_handle: AtomicU64,
    subscribers: Vec<(Handle, Box<dyn Fn(&T) + Send + Sync>)>,
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            subscribers: Vec::new(),
        }
    }
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`. A subscription added while [`emit`](Self::emit)
    /// is running takes effect starting with the *next* emission (§5).
    pub fn subscribe<F>(&mut self, callback: F) -> Handle
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.subscribers.push((handle, Box::new(callback)));
        handle
    }

    /// Removes a subscription. Returns `false` if `handle` was not registered.
    pub fn unsubscribe(&mut self, handle: Handle) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(h, _)| *h != handle);
        self.subscribers.len() != before
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub fn count(&self) -> usize {
        self.subscribers.len()
    }

    /// Notifies every subscriber with `event`. A subscriber that panics is
    /// isolated — its panic is caught and logged, the rest still run
    /// (§7 Subscriber-fault).
    pub fn emit(&self, event: &T) {
        for (handle, callback) in &self.subscribers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(event))) {
                tracing::error!(
                    handle,
                    message = panic_message(&payload),
                    "subscriber callback panicked; isolating and continuing"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
