//! Path parameters shared by every thing route.
//!
//! The same handlers serve `/properties` and `/{thing_id}/properties`, so
//! the thing index is optional and read by name.

use std::collections::HashMap;

use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

const THING_ID: &str = "thing_id";

/// Captured path segments of a thing route.
#[derive(Debug, Default)]
pub struct ThingPath(HashMap<String, String>);

impl ThingPath {
    /// Index of the thing in a multi-thing server.
    #[must_use]
    pub fn thing_id(&self) -> Option<&str> {
        self.get(THING_ID)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl<S> FromRequestParts<S> for ThingPath
where
    S: Send + Sync,
{
    type Rejection = PathRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<HashMap<String, String>>::from_request_parts(parts, state).await {
            Ok(Path(params)) => Ok(Self(params)),
            Err(PathRejection::MissingPathParams(_)) => Ok(Self::default()),
            Err(err) => Err(err),
        }
    }
}
