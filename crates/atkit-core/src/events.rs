//! Broadcast channel
//!
//! Synchronous multi-subscriber notification. `dispatch` calls every
//! registered listener in registration order on the caller's task before
//! returning; nothing is queued or persisted.
//!
//! Each `subscribe` call is its own registration. Registering the same
//! closure twice yields two registrations and two invocations per dispatch,
//! and each returned [`Unsubscribe`] removes only the registration that
//! produced it.
//!
//! Dispatch is not reentrant-safe: a listener that dispatches on the same
//! channel runs the nested dispatch to completion before the outer one
//! continues, so later listeners observe the payloads out of order. Listener
//! panics are not caught.

use std::sync::{Arc, Mutex, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

/// Multi-subscriber broadcast channel for payloads of type `T`
pub struct EventController<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Default for EventController<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventController<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Number of live registrations
    pub fn listener_count(&self) -> usize {
        self.registry
            .lock()
            .map(|r| r.listeners.len())
            .unwrap_or_else(|e| e.into_inner().listeners.len())
    }

    /// Invoke every registered listener with `payload`, in registration order
    ///
    /// The listener list is snapshotted first, so listeners may subscribe or
    /// unsubscribe while being called; the change applies to the next dispatch.
    pub fn dispatch(&self, payload: &T) {
        let listeners: Vec<Listener<T>> = {
            let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };

        for listener in listeners {
            listener(payload);
        }
    }
}

impl<T: 'static> EventController<T> {
    /// Register a listener; the returned handle removes this registration
    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener: Listener<T> = Arc::new(listener);
        let id = {
            let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, listener));
            id
        };

        let registry: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Unsubscribe::new(move || {
            if let Some(registry) = registry.upgrade() {
                let mut registry = registry.lock().unwrap_or_else(|e| e.into_inner());
                registry.listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }
}

/// Handle returned by `subscribe`
///
/// Dropping the handle does not unsubscribe; call [`Unsubscribe::unsubscribe`].
pub struct Unsubscribe {
    action: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Unsubscribe {
    fn new(action: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// Remove the registration. Calling it after the channel is gone is a no-op.
    pub fn unsubscribe(mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("pending", &self.action.is_some())
            .finish()
    }
}
