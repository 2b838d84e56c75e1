//! Shared handle around a [`Thing`] — one lock per thing plus the action
//! task runner.
//!
//! Every operation takes the thing's lock for its whole duration, so
//! mutations and notification fan-out stay serialised per thing. Two things
//! run outside it: device forwarders, which may call back into the thing,
//! and action work, which runs on its own task and re-enters through a
//! [`WeakThingHandle`] to finish. The lock is never held across an `.await`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::{Map, Value as JsonValue};
use tokio::task::JoinHandle;

use webthing_domain::action::{Action, ActionDescription};
use webthing_domain::error::WebThingError;
use webthing_domain::event::{Event, EventDescription};
use webthing_domain::id::{ActionId, SubscriberId};
use webthing_domain::property::Property;
use webthing_domain::schema::{ActionMetadata, DataSchema};
use webthing_domain::subscriber::Subscriber;
use webthing_domain::thing::{Thing, ThingDescription};

use crate::ports::action::NoopBehavior;
use crate::ports::{ActionBehavior, ActionContext, ActionFactory};

struct State {
    thing: Thing,
    factories: HashMap<String, Arc<dyn ActionFactory>>,
    behaviors: HashMap<ActionId, Arc<dyn ActionBehavior>>,
}

/// Cloneable, thread-safe handle to a thing.
#[derive(Clone)]
pub struct ThingHandle {
    state: Arc<Mutex<State>>,
}

/// Non-owning handle, used by running actions to reach their thing.
#[derive(Clone)]
pub struct WeakThingHandle {
    state: Weak<Mutex<State>>,
}

impl fmt::Debug for ThingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThingHandle")
            .field("handles", &Arc::strong_count(&self.state))
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for WeakThingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakThingHandle")
            .field("alive", &(self.state.strong_count() > 0))
            .finish()
    }
}

impl WeakThingHandle {
    /// Get the thing back, unless it has been dropped.
    #[must_use]
    pub fn upgrade(&self) -> Option<ThingHandle> {
        self.state.upgrade().map(|state| ThingHandle { state })
    }
}

impl ThingHandle {
    #[must_use]
    pub fn new(thing: Thing) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                thing,
                factories: HashMap::new(),
                behaviors: HashMap::new(),
            })),
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakThingHandle {
        WeakThingHandle {
            state: Arc::downgrade(&self.state),
        }
    }

    /// Run `f` with shared access to the thing, under its lock.
    pub fn read<R>(&self, f: impl FnOnce(&Thing) -> R) -> R {
        f(&self.lock().thing)
    }

    /// Run `f` with exclusive access to the thing, under its lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut Thing) -> R) -> R {
        f(&mut self.lock().thing)
    }

    #[must_use]
    pub fn id(&self) -> String {
        self.read(|thing| thing.id().to_string())
    }

    #[must_use]
    pub fn title(&self) -> String {
        self.read(|thing| thing.title().to_string())
    }

    #[must_use]
    pub fn href(&self) -> String {
        self.read(Thing::href)
    }

    pub fn set_href_prefix(&self, prefix: &str) {
        self.write(|thing| thing.set_href_prefix(prefix));
    }

    pub fn set_ui_href(&self, href: &str) {
        self.write(|thing| thing.set_ui_href(href));
    }

    #[must_use]
    pub fn as_thing_description(&self) -> ThingDescription {
        self.read(Thing::as_thing_description)
    }

    #[must_use]
    pub fn get_property_descriptions(&self) -> BTreeMap<String, DataSchema> {
        self.read(Thing::get_property_descriptions)
    }

    #[must_use]
    pub fn get_action_descriptions(&self, name: Option<&str>) -> Vec<ActionDescription> {
        self.read(|thing| thing.get_action_descriptions(name))
    }

    #[must_use]
    pub fn get_event_descriptions(&self, name: Option<&str>) -> Vec<EventDescription> {
        self.read(|thing| thing.get_event_descriptions(name))
    }

    pub fn add_property(&self, property: Property) {
        self.write(|thing| thing.add_property(property));
    }

    pub fn remove_property(&self, name: &str) -> Option<Property> {
        self.write(|thing| thing.remove_property(name))
    }

    /// A handle to a property; its value cell is shared with the thing.
    #[must_use]
    pub fn find_property(&self, name: &str) -> Option<Property> {
        self.read(|thing| thing.find_property(name).cloned())
    }

    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.read(|thing| thing.has_property(name))
    }

    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<JsonValue> {
        self.read(|thing| thing.get_property(name))
    }

    #[must_use]
    pub fn get_properties(&self) -> Map<String, JsonValue> {
        self.read(Thing::get_properties)
    }

    /// Write a property; unknown names are ignored.
    ///
    /// Only the lookup happens under the thing's lock. The forwarder then
    /// runs unlocked, so it may read the thing or emit events.
    ///
    /// # Errors
    ///
    /// Returns [`WebThingError::Validation`] when the value is rejected and
    /// [`WebThingError::Forward`] when the device refuses it.
    pub fn set_property(&self, name: &str, value: JsonValue) -> Result<(), WebThingError> {
        match self.find_property(name) {
            Some(property) => property.set_value(value),
            None => Ok(()),
        }
    }

    /// Register an action type together with the factory building its work.
    pub fn add_available_action<F>(&self, name: &str, metadata: ActionMetadata, factory: F)
    where
        F: ActionFactory + 'static,
    {
        let mut state = self.lock();
        state.thing.add_available_action(name, metadata);
        state.factories.insert(name.to_string(), Arc::new(factory));
    }

    pub fn add_available_event(&self, name: &str, metadata: DataSchema) {
        self.write(|thing| thing.add_available_event(name, metadata));
    }

    /// Emit an event.
    pub fn add_event(&self, event: Event) {
        self.write(|thing| thing.add_event(event));
    }

    #[must_use]
    pub fn get_action(&self, name: &str, id: ActionId) -> Option<Action> {
        self.read(|thing| thing.get_action(name, id).cloned())
    }

    /// Create an action in the `created` state.
    ///
    /// Returns `None` when the name is unknown or the input is invalid;
    /// nothing is recorded then. The work begins with
    /// [`PendingAction::start`].
    #[must_use]
    pub fn perform_action(&self, name: &str, input: Option<JsonValue>) -> Option<PendingAction> {
        let (ctx, description, factory) = {
            let mut state = self.lock();
            let factory = state.factories.get(name).cloned();
            let action = match state.thing.create_action(name, input) {
                Ok(action) => action,
                Err(err) => {
                    tracing::debug!(action = name, error = %err, "action rejected");
                    return None;
                }
            };
            let ctx = ActionContext {
                thing: self.downgrade(),
                name: name.to_string(),
                id: action.id(),
                input: action.input().cloned(),
            };
            (ctx, action.as_action_description(), factory)
        };

        // built outside the lock so factories may use the thing
        let behavior: Arc<dyn ActionBehavior> = match factory {
            Some(factory) => Arc::from(factory.create(&ctx)),
            None => Arc::new(NoopBehavior),
        };
        {
            let mut state = self.lock();
            if state.thing.get_action(name, ctx.id).is_some() {
                state.behaviors.insert(ctx.id, behavior);
            }
        }

        Some(PendingAction {
            handle: self.clone(),
            ctx,
            description,
            started: false,
        })
    }

    /// Remove an action record and cancel its work.
    ///
    /// Returns `false` when no such action exists.
    pub async fn remove_action(&self, name: &str, id: ActionId) -> bool {
        let behavior = {
            let mut state = self.lock();
            if state.thing.remove_action(name, id).is_none() {
                return false;
            }
            state.behaviors.remove(&id)
        };
        if let Some(behavior) = behavior {
            behavior.cancel().await;
        }
        tracing::debug!(action = name, %id, "action removed");
        true
    }

    pub fn add_subscriber(&self, subscriber: Arc<dyn Subscriber>) {
        self.read(|thing| thing.add_subscriber(subscriber));
    }

    pub fn remove_subscriber(&self, id: SubscriberId) -> bool {
        self.read(|thing| thing.remove_subscriber(id))
    }

    pub fn add_event_subscriber(&self, name: &str, subscriber: Arc<dyn Subscriber>) -> bool {
        self.read(|thing| thing.add_event_subscriber(name, subscriber))
    }

    pub fn remove_event_subscriber(&self, name: &str, id: SubscriberId) -> bool {
        self.read(|thing| thing.remove_event_subscriber(name, id))
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.read(Thing::subscriber_count)
    }

    fn start(&self, ctx: &ActionContext) -> Option<Arc<dyn ActionBehavior>> {
        let mut state = self.lock();
        if let Err(err) = state.thing.start_action(&ctx.name, ctx.id) {
            tracing::debug!(action = %ctx.name, id = %ctx.id, error = %err, "action not started");
            return None;
        }
        tracing::debug!(action = %ctx.name, id = %ctx.id, "action started");
        Some(
            state
                .behaviors
                .get(&ctx.id)
                .cloned()
                .unwrap_or_else(|| Arc::new(NoopBehavior)),
        )
    }

    /// Forget an action that was created but never started.
    fn discard(&self, ctx: &ActionContext) {
        let mut state = self.lock();
        state.behaviors.remove(&ctx.id);
        if state.thing.remove_action(&ctx.name, ctx.id).is_some() {
            tracing::debug!(action = %ctx.name, id = %ctx.id, "unstarted action discarded");
        }
    }

    fn finish(&self, ctx: &ActionContext) {
        let mut state = self.lock();
        state.behaviors.remove(&ctx.id);
        match state.thing.finish_action(&ctx.name, ctx.id) {
            Ok(()) => tracing::debug!(action = %ctx.name, id = %ctx.id, "action completed"),
            Err(err) => {
                tracing::debug!(action = %ctx.name, id = %ctx.id, error = %err, "action not completed");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An action that has been created but not started.
///
/// Dropping it without calling [`start`](Self::start) removes the action
/// record again.
#[derive(Debug)]
pub struct PendingAction {
    handle: ThingHandle,
    ctx: ActionContext,
    description: ActionDescription,
    started: bool,
}

impl PendingAction {
    #[must_use]
    pub fn id(&self) -> ActionId {
        self.ctx.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.ctx.name
    }

    /// Description of the action in its `created` state.
    #[must_use]
    pub fn description(&self) -> &ActionDescription {
        &self.description
    }

    /// Move the action to `pending` and spawn its work.
    ///
    /// The status change happens before this returns. The spawned task
    /// completes the action exactly once when the work settles, whether it
    /// succeeded, failed or panicked. Must be called within a tokio runtime.
    pub fn start(mut self) -> JoinHandle<()> {
        self.started = true;
        let behavior = self.handle.start(&self.ctx);
        let thing = self.handle.downgrade();
        let ctx = self.ctx.clone();
        drop(self);

        tokio::spawn(async move {
            let Some(behavior) = behavior else {
                return;
            };

            let work = {
                let ctx = ctx.clone();
                tokio::spawn(async move { behavior.perform(&ctx).await })
            };
            match work.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(action = %ctx.name, id = %ctx.id, error = %err, "action failed");
                }
                Err(err) => {
                    tracing::warn!(action = %ctx.name, id = %ctx.id, error = %err, "action task aborted");
                }
            }

            if let Some(handle) = thing.upgrade() {
                handle.finish(&ctx);
            }
        })
    }
}

impl Drop for PendingAction {
    fn drop(&mut self) {
        if !self.started {
            self.handle.discard(&self.ctx);
        }
    }
}
