//! Action port — the work performed when a client requests an action.
//!
//! A thing registers one [`ActionFactory`] per action name. Every accepted
//! request gets a fresh [`ActionBehavior`] from the factory; the runtime
//! drives it and moves the action record through its lifecycle whatever
//! the outcome.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use webthing_domain::id::ActionId;

use crate::thing_handle::WeakThingHandle;

/// Error reported by failing action work.
pub type ActionFailure = Box<dyn std::error::Error + Send + Sync>;

/// Everything a behavior knows about the action it performs.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// The owning thing. Does not keep it alive.
    pub thing: WeakThingHandle,
    pub name: String,
    pub id: ActionId,
    /// Validated input, `None` when the request carried none.
    pub input: Option<JsonValue>,
}

/// The work behind one action instance.
#[async_trait]
pub trait ActionBehavior: Send + Sync {
    /// Perform the work. The action completes whether this succeeds or
    /// fails; a failure is only logged.
    async fn perform(&self, ctx: &ActionContext) -> Result<(), ActionFailure>;

    /// Interrupt in-flight work. Called when the action is removed.
    async fn cancel(&self) {}
}

/// Builds the behavior of each new action instance.
///
/// Implemented for every `Fn(&ActionContext) -> B` closure.
pub trait ActionFactory: Send + Sync {
    fn create(&self, ctx: &ActionContext) -> Box<dyn ActionBehavior>;
}

impl<F, B> ActionFactory for F
where
    F: Fn(&ActionContext) -> B + Send + Sync,
    B: ActionBehavior + 'static,
{
    fn create(&self, ctx: &ActionContext) -> Box<dyn ActionBehavior> {
        Box::new(self(ctx))
    }
}

/// Behavior of actions that have nothing to do.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBehavior;

#[async_trait]
impl ActionBehavior for NoopBehavior {
    async fn perform(&self, _ctx: &ActionContext) -> Result<(), ActionFailure> {
        Ok(())
    }
}
