//! Value — the observable cell behind a property.
//!
//! A [`Value`] caches the last accepted reading, optionally forwards writes
//! to a backing device, and reports changes to a single observer (the owning
//! property's thing). Clones share the same cell, so a device driver can keep
//! a handle and push sensor readings with
//! [`notify_of_external_update`](Value::notify_of_external_update).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value as JsonValue;

use crate::error::{ForwardError, WebThingError};
use crate::schema::json_eq;

type Forwarder = Arc<dyn Fn(&JsonValue) -> Result<(), ForwardError> + Send + Sync>;
pub(crate) type Observer = Arc<dyn Fn(&JsonValue) + Send + Sync>;

struct Inner {
    last: JsonValue,
    forwarder: Option<Forwarder>,
    observer: Option<Observer>,
}

/// Shared, observable value cell.
#[derive(Clone)]
pub struct Value {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Value")
            .field("last", &inner.last)
            .field("forwarder", &inner.forwarder.is_some())
            .field("observer", &inner.observer.is_some())
            .finish()
    }
}

impl Value {
    /// Create a value that is not backed by a device.
    #[must_use]
    pub fn new(initial: JsonValue) -> Self {
        Self::build(initial, None)
    }

    /// Create a value whose writes are pushed to a device through
    /// `forwarder` before being recorded.
    ///
    /// The forwarder is called with no lock held and may read the value.
    /// It runs on the writer's thread, so it should return promptly.
    #[must_use]
    pub fn with_forwarder<F>(initial: JsonValue, forwarder: F) -> Self
    where
        F: Fn(&JsonValue) -> Result<(), ForwardError> + Send + Sync + 'static,
    {
        Self::build(initial, Some(Arc::new(forwarder)))
    }

    fn build(initial: JsonValue, forwarder: Option<Forwarder>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                last: initial,
                forwarder,
                observer: None,
            })),
        }
    }

    /// The most recently accepted value.
    #[must_use]
    pub fn get(&self) -> JsonValue {
        self.lock().last.clone()
    }

    /// Forward `value` to the device, then record it.
    ///
    /// # Errors
    ///
    /// Returns [`WebThingError::Forward`] when the forwarder fails; the
    /// cached value is left untouched and no notification is emitted.
    pub fn set(&self, value: JsonValue) -> Result<(), WebThingError> {
        let forwarder = self.lock().forwarder.clone();
        if let Some(forwarder) = forwarder {
            forwarder(&value).map_err(WebThingError::Forward)?;
        }
        self.notify_of_external_update(value);
        Ok(())
    }

    /// Record a reading that did not go through the forwarder.
    ///
    /// Null readings and readings equal to the cached value are ignored.
    /// Returns whether the value changed (and the observer was called).
    pub fn notify_of_external_update(&self, value: JsonValue) -> bool {
        let mut inner = self.lock();
        if value.is_null() || json_eq(&inner.last, &value) {
            return false;
        }
        inner.last = value;
        // notified under the lock so observers see updates in write order
        if let Some(observer) = &inner.observer {
            observer(&inner.last);
        }
        true
    }

    /// Whether both handles share the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn observe(&self, observer: Observer) {
        self.lock().observer = Some(observer);
    }

    pub(crate) fn clear_observer(&self) {
        self.lock().observer = None;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
