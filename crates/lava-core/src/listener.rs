//! Ordered listener list.
//!
//! Listeners are shared objects compared by pointer identity. They are
//! invoked in registration order, and in reverse registration order for
//! teardown notifications so that later listeners (which may depend on
//! earlier ones) are released first.

use parking_lot::Mutex;
use std::sync::Arc;

/// Shared handle to a listener object.
pub type Listener<T> = Arc<Mutex<T>>;

/// Ordered collection of listeners, keyed by pointer identity.
pub struct ListenerList<T: ?Sized> {
    listeners: Vec<Listener<T>>,
}

impl<T: ?Sized> Default for ListenerList<T> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<T: ?Sized> ListenerList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Returns false if it is already registered.
    pub fn add(&mut self, listener: Listener<T>) -> bool {
        if self.contains(&listener) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn remove(&mut self, listener: &Listener<T>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
        self.listeners.len() != before
    }

    /// Check whether a listener is registered.
    pub fn contains(&self, listener: &Listener<T>) -> bool {
        self.listeners.iter().any(|l| Arc::ptr_eq(l, listener))
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Check if no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Iterate over the listeners in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Listener<T>> {
        self.listeners.iter()
    }

    /// Remove all listeners.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Invoke `f` on every listener in registration order, stopping at the
    /// first error.
    pub fn try_for_each<E>(&self, mut f: impl FnMut(&mut T) -> Result<(), E>) -> Result<(), E> {
        for listener in &self.listeners {
            f(&mut *listener.lock())?;
        }
        Ok(())
    }

    /// Invoke `f` on every listener in reverse registration order.
    pub fn for_each_rev(&self, mut f: impl FnMut(&mut T)) {
        for listener in self.listeners.iter().rev() {
            f(&mut *listener.lock());
        }
    }
}
