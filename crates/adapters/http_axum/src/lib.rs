//! # webthing-adapter-http-axum
//!
//! HTTP and WebSocket adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the **REST API** of every hosted thing
//!   (`/`, `/properties`, `/actions`, `/events` and their per-name routes)
//! - Serve the **WebSocket protocol** on the thing's root path: push
//!   `propertyStatus` / `actionStatus` / `event` messages and accept
//!   `setProperty`, `requestAction` and `addEventSubscription` requests
//! - Decorate thing descriptions with transport details (`base`, the
//!   WebSocket `alternate` link, security definitions)
//! - Reject requests whose `Host` header is not one of the server's names
//! - Map domain errors into HTTP responses
//!
//! ## Routing
//! With a single thing, routes hang directly off the base path. With
//! several things, `/` lists every description and each thing lives under
//! `/{thing_id}`, its index in the registry.
//!
//! ## Dependency rule
//! Depends on `webthing-app` (registry, thing handle, channel subscriber)
//! and `webthing-domain` (descriptions and messages). Never leaks axum types
//! into the domain.

pub mod error;
pub mod extract;
pub mod host;
pub mod protocol;
pub mod router;
pub mod state;
pub mod ws;

#[allow(clippy::missing_errors_doc)]
pub mod actions;
#[allow(clippy::missing_errors_doc)]
pub mod events;
#[allow(clippy::missing_errors_doc)]
pub mod properties;
#[allow(clippy::missing_errors_doc)]
pub mod things;
