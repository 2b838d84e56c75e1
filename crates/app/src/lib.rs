//! # webthing-app
//!
//! Application layer — **port definitions** and the shared runtime around
//! the domain [`Thing`](webthing_domain::thing::Thing).
//!
//! ## Responsibilities
//! - Define **port traits** device code implements:
//!   - `ActionBehavior` — the work behind an action, with optional cancellation
//!   - `ActionFactory` — builds a behavior for each requested action
//! - Provide the **`ThingHandle`**: one lock per thing, action task runner
//! - Provide the **registry** mapping external indices to things
//! - Provide a channel-backed **subscriber** for transports
//!
//! ## Dependency rule
//! Depends on `webthing-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod registry;
pub mod subscriber;
pub mod thing_handle;
