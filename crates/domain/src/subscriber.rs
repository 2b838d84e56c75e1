//! Subscribers and the two-tier fan-out hub.
//!
//! A thing keeps one global subscriber set (property and action status)
//! and one set per declared event name. Delivery is best effort: a failed
//! send to one subscriber is dropped and never reaches the notifier.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::id::SubscriberId;
use crate::message::Message;

/// Why a message could not be handed to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The subscriber's connection is gone.
    #[error("subscriber is closed")]
    Closed,
    /// The subscriber is not keeping up.
    #[error("subscriber buffer is full")]
    Full,
}

/// An opaque push-message sink.
///
/// Implementations must not block: `send` is called while the thing's
/// subscriber sets are locked.
pub trait Subscriber: Send + Sync {
    /// Stable identity, used for removal.
    fn id(&self) -> SubscriberId;

    /// Hand a message over for delivery.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] when the message cannot be queued.
    fn send(&self, message: &Message) -> Result<(), DeliveryError>;
}

type Members = HashMap<SubscriberId, Arc<dyn Subscriber>>;

#[derive(Default)]
struct Tiers {
    global: Members,
    events: BTreeMap<String, Members>,
}

/// Global and per-event subscriber sets of one thing.
#[derive(Default)]
pub struct SubscriberHub {
    tiers: Mutex<Tiers>,
}

impl std::fmt::Debug for SubscriberHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tiers = self.lock();
        f.debug_struct("SubscriberHub")
            .field("global", &tiers.global.len())
            .field("events", &tiers.events.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SubscriberHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber to the global set.
    pub fn add(&self, subscriber: Arc<dyn Subscriber>) {
        self.lock().global.insert(subscriber.id(), subscriber);
    }

    /// Remove a subscriber from the global set and from every event set.
    ///
    /// Returns whether it was subscribed anywhere.
    pub fn remove(&self, id: SubscriberId) -> bool {
        let mut tiers = self.lock();
        let mut found = tiers.global.remove(&id).is_some();
        for members in tiers.events.values_mut() {
            found |= members.remove(&id).is_some();
        }
        found
    }

    /// Declare an event name so it can be subscribed to.
    pub fn register_event(&self, name: impl Into<String>) {
        self.lock().events.entry(name.into()).or_default();
    }

    /// Subscribe to one event name. Unknown names are ignored and
    /// return `false`.
    pub fn add_event_subscriber(&self, name: &str, subscriber: Arc<dyn Subscriber>) -> bool {
        match self.lock().events.get_mut(name) {
            Some(members) => {
                members.insert(subscriber.id(), subscriber);
                true
            }
            None => false,
        }
    }

    /// Returns whether the subscriber was registered for that event.
    pub fn remove_event_subscriber(&self, name: &str, id: SubscriberId) -> bool {
        self.lock()
            .events
            .get_mut(name)
            .is_some_and(|members| members.remove(&id).is_some())
    }

    /// Send to every global subscriber. Returns how many accepted it.
    pub fn broadcast(&self, message: &Message) -> usize {
        deliver(self.lock().global.values(), message)
    }

    /// Send to the subscribers of one event name. Returns how many
    /// accepted it.
    pub fn publish_event(&self, name: &str, message: &Message) -> usize {
        self.lock()
            .events
            .get(name)
            .map_or(0, |members| deliver(members.values(), message))
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().global.len()
    }

    #[must_use]
    pub fn event_subscriber_count(&self, name: &str) -> usize {
        self.lock().events.get(name).map_or(0, HashMap::len)
    }

    fn lock(&self) -> MutexGuard<'_, Tiers> {
        self.tiers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn deliver<'a>(members: impl Iterator<Item = &'a Arc<dyn Subscriber>>, message: &Message) -> usize {
    members
        .filter(|subscriber| subscriber.send(message).is_ok())
        .count()
}
