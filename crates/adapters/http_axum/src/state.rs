//! Shared application state for axum handlers.

use std::sync::Arc;

use webthing_app::registry::ThingRegistry;
use webthing_app::thing_handle::ThingHandle;
use webthing_domain::error::{NotFoundError, WebThingError};

use crate::error::ApiError;

/// Application state shared across all axum handlers.
///
/// Generic over the registry to avoid dynamic dispatch. `Clone` is
/// implemented manually so the registry itself does not need to be
/// `Clone`; only the `Arc` is cloned.
pub struct AppState<R> {
    /// Things served by this router.
    pub registry: Arc<R>,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<R> AppState<R>
where
    R: ThingRegistry,
{
    pub fn new(registry: R) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Create the state from a registry already shared with other tasks.
    pub fn from_arc(registry: Arc<R>) -> Self {
        Self { registry }
    }

    /// Resolve the thing addressed by a request.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the index does not name a thing.
    pub fn thing(&self, index: Option<&str>) -> Result<ThingHandle, ApiError> {
        self.registry.thing(index).ok_or_else(|| {
            ApiError::from(WebThingError::NotFound(NotFoundError {
                entity: "thing",
                id: index.unwrap_or_default().to_string(),
            }))
        })
    }
}
