//! # webthing-domain
//!
//! Pure domain model of a web thing.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps, links
//! - Define **Values** (observable cells, optionally forwarding writes to a device)
//! - Define **Properties** (named, schema-validated attributes of a thing)
//! - Define **Actions** (invocation records with a forward-only lifecycle)
//! - Define **Events** (immutable, timestamped occurrences)
//! - Define the **Thing** aggregate and its subscriber fan-out
//! - Define the wire shapes of descriptions and notification messages
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! Subscribers are an opaque trait here; concrete sinks live in outer layers.

pub mod error;
pub mod id;
pub mod link;
pub mod time;

pub mod action;
pub mod description;
pub mod event;
pub mod message;
pub mod property;
pub mod schema;
pub mod subscriber;
pub mod thing;
pub mod value;
