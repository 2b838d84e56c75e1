//! Port definitions — traits that device adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the runtime and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod action;

pub use action::{ActionBehavior, ActionContext, ActionFactory, ActionFailure};
