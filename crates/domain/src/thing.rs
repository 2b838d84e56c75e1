//! Thing — the aggregate root owning properties, actions and events.
//!
//! A [`Thing`] mediates every mutation of its parts and fans notifications
//! out to its subscribers:
//!
//! - global subscribers receive `propertyStatus` and `actionStatus`
//! - per-event subscribers receive `event` messages for that name only
//!
//! The aggregate itself is not synchronised; callers sharing a thing across
//! tasks wrap it in a single lock so its operations stay serialised.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::action::{Action, ActionDescription, TransitionError};
use crate::error::{ActionRejected, NotFoundError, ValidationError, WebThingError};
use crate::event::{Event, EventDescription};
use crate::id::{ActionId, SubscriberId};
use crate::link::Link;
use crate::message::Message;
use crate::property::Property;
use crate::schema::{ActionMetadata, DataSchema};
use crate::subscriber::{Subscriber, SubscriberHub};

/// JSON-LD context advertised by every thing.
pub const THING_CONTEXT: &str = "https://webthings.io/schemas";

/// The discovery document of a thing.
///
/// The trailing optional fields are filled in by the transport, which
/// knows the host the description is served from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThingDescription {
    pub id: String,
    pub title: String,
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub at_type: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    pub properties: BTreeMap<String, DataSchema>,
    pub actions: BTreeMap<String, ActionMetadata>,
    pub events: BTreeMap<String, DataSchema>,
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub base: Option<String>,
    #[serde(
        rename = "securityDefinitions",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub security_definitions: Option<Map<String, JsonValue>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub security: Option<String>,
}

/// A web thing.
#[derive(Debug)]
pub struct Thing {
    id: String,
    title: String,
    types: Vec<String>,
    description: String,
    properties: HashMap<String, Property>,
    available_actions: BTreeMap<String, ActionMetadata>,
    actions: IndexMap<String, Vec<Action>>,
    available_events: BTreeMap<String, DataSchema>,
    events: VecDeque<Event>,
    event_history_limit: Option<usize>,
    subscribers: Arc<SubscriberHub>,
    href_prefix: String,
    ui_href: Option<String>,
}

impl Thing {
    /// Create a builder for constructing a [`Thing`].
    #[must_use]
    pub fn builder() -> ThingBuilder {
        ThingBuilder::default()
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn context(&self) -> &str {
        THING_CONTEXT
    }

    #[must_use]
    pub fn types(&self) -> &[String] {
        &self.types
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The thing's own path: its prefix, or `/` when mounted at the root.
    #[must_use]
    pub fn href(&self) -> String {
        if self.href_prefix.is_empty() {
            "/".to_string()
        } else {
            self.href_prefix.clone()
        }
    }

    #[must_use]
    pub fn ui_href(&self) -> Option<&str> {
        self.ui_href.as_deref()
    }

    pub fn set_ui_href(&mut self, href: impl Into<String>) {
        self.ui_href = Some(href.into());
    }

    /// Set the URL prefix of the thing and of every property and action it
    /// owns.
    pub fn set_href_prefix(&mut self, prefix: impl Into<String>) {
        self.href_prefix = prefix.into();
        for property in self.properties.values_mut() {
            property.set_href_prefix(self.href_prefix.clone());
        }
        for action in self.actions.values_mut().flatten() {
            action.set_href_prefix(self.href_prefix.clone());
        }
    }

    #[must_use]
    pub fn as_thing_description(&self) -> ThingDescription {
        let prefix = &self.href_prefix;

        let actions = self
            .available_actions
            .iter()
            .map(|(name, metadata)| {
                let mut metadata = metadata.clone();
                metadata.links = Some(vec![Link::new(
                    "action",
                    format!("{prefix}/actions/{name}"),
                )]);
                (name.clone(), metadata)
            })
            .collect();

        let events = self
            .available_events
            .iter()
            .map(|(name, metadata)| {
                let mut metadata = metadata.clone();
                metadata.links = Some(vec![Link::new(
                    "event",
                    format!("{prefix}/events/{name}"),
                )]);
                (name.clone(), metadata)
            })
            .collect();

        let mut links = vec![
            Link::new("properties", format!("{prefix}/properties")),
            Link::new("actions", format!("{prefix}/actions")),
            Link::new("events", format!("{prefix}/events")),
            Link::new("self", self.href()),
        ];
        if let Some(ui_href) = &self.ui_href {
            links.push(Link::new("alternate", ui_href.clone()).with_media_type("text/html"));
        }

        ThingDescription {
            id: self.id.clone(),
            title: self.title.clone(),
            context: THING_CONTEXT.to_string(),
            at_type: self.types.clone(),
            description: Some(self.description.clone()).filter(|d| !d.is_empty()),
            properties: self.get_property_descriptions(),
            actions,
            events,
            links,
            href: None,
            base: None,
            security_definitions: None,
            security: None,
        }
    }

    #[must_use]
    pub fn get_property_descriptions(&self) -> BTreeMap<String, DataSchema> {
        self.properties
            .iter()
            .map(|(name, property)| (name.clone(), property.as_property_description()))
            .collect()
    }

    /// Descriptions of every action instance, or only those of `name`.
    /// Action types come in registration order, instances in creation
    /// order. Unknown names yield an empty list.
    #[must_use]
    pub fn get_action_descriptions(&self, name: Option<&str>) -> Vec<ActionDescription> {
        match name {
            None => self
                .actions
                .values()
                .flatten()
                .map(Action::as_action_description)
                .collect(),
            Some(name) => self
                .actions
                .get(name)
                .into_iter()
                .flatten()
                .map(Action::as_action_description)
                .collect(),
        }
    }

    /// Descriptions of the event log, or only the entries named `name`.
    #[must_use]
    pub fn get_event_descriptions(&self, name: Option<&str>) -> Vec<EventDescription> {
        self.events
            .iter()
            .filter(|event| name.is_none_or(|name| event.name() == name))
            .map(Event::as_event_description)
            .collect()
    }

    /// Attach a property. Value changes are pushed to global subscribers
    /// as `propertyStatus` messages. A property with the same name is
    /// replaced.
    pub fn add_property(&mut self, mut property: Property) {
        property.set_href_prefix(self.href_prefix.clone());

        let hub = Arc::clone(&self.subscribers);
        let name = property.name().to_string();
        property.value().observe(Arc::new(move |value: &JsonValue| {
            hub.broadcast(&Message::property_status(name.clone(), value.clone()));
        }));

        let replacement = property.value().clone();
        if let Some(previous) = self.properties.insert(property.name().to_string(), property) {
            if !previous.value().ptr_eq(&replacement) {
                previous.value().clear_observer();
            }
        }
    }

    /// Detach a property; its value stops producing notifications.
    pub fn remove_property(&mut self, name: &str) -> Option<Property> {
        let property = self.properties.remove(name)?;
        property.value().clear_observer();
        Some(property)
    }

    #[must_use]
    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Current value of a property.
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<JsonValue> {
        self.find_property(name).map(Property::get_value)
    }

    /// Current value of every property, keyed by name.
    #[must_use]
    pub fn get_properties(&self) -> Map<String, JsonValue> {
        self.properties
            .iter()
            .map(|(name, property)| (name.clone(), property.get_value()))
            .collect()
    }

    /// Write a property. Writing an unknown name does nothing and succeeds.
    ///
    /// # Errors
    ///
    /// Propagates [`Property::set_value`] failures.
    pub fn set_property(&self, name: &str, value: JsonValue) -> Result<(), WebThingError> {
        match self.find_property(name) {
            Some(property) => property.set_value(value),
            None => Ok(()),
        }
    }

    /// Register an action type and start its (empty) instance list.
    pub fn add_available_action(&mut self, name: impl Into<String>, metadata: ActionMetadata) {
        let name = name.into();
        self.actions.entry(name.clone()).or_default();
        self.available_actions.insert(name, metadata);
    }

    #[must_use]
    pub fn available_action(&self, name: &str) -> Option<&ActionMetadata> {
        self.available_actions.get(name)
    }

    /// Validate `input` and record a new action in the `created` state.
    ///
    /// Global subscribers are told about the new action before it is
    /// appended to the instance list. Starting it is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`ActionRejected`] for unregistered names or invalid input;
    /// nothing is recorded in that case.
    pub fn create_action(
        &mut self,
        name: &str,
        input: Option<JsonValue>,
    ) -> Result<&Action, ActionRejected> {
        let metadata = self
            .available_actions
            .get(name)
            .ok_or_else(|| ActionRejected::UnknownAction(name.to_string()))?;
        metadata
            .validate_input(input.as_ref().unwrap_or(&JsonValue::Null))
            .map_err(|source| ActionRejected::InvalidInput {
                action: name.to_string(),
                source,
            })?;

        let mut action = Action::new(ActionId::new(), name, input);
        action.set_href_prefix(self.href_prefix.clone());
        self.action_notify(&action);

        let list = self.actions.entry(name.to_string()).or_default();
        let index = list.len();
        list.push(action);
        Ok(&list[index])
    }

    /// Move an action to `pending` and notify global subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`WebThingError::NotFound`] for unknown actions and
    /// [`WebThingError::Transition`] when the action already left `created`.
    pub fn start_action(&mut self, name: &str, id: ActionId) -> Result<(), WebThingError> {
        self.transition_action(name, id, Action::start)
    }

    /// Move an action to `completed` and notify global subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`WebThingError::NotFound`] for unknown actions and
    /// [`WebThingError::Transition`] unless the action is `pending`.
    pub fn finish_action(&mut self, name: &str, id: ActionId) -> Result<(), WebThingError> {
        self.transition_action(name, id, Action::finish)
    }

    fn transition_action(
        &mut self,
        name: &str,
        id: ActionId,
        step: fn(&mut Action) -> Result<(), TransitionError>,
    ) -> Result<(), WebThingError> {
        let action = self
            .actions
            .get_mut(name)
            .and_then(|list| list.iter_mut().find(|action| action.id() == id))
            .ok_or_else(|| NotFoundError {
                entity: "Action",
                id: format!("{name}/{id}"),
            })?;
        step(action)?;
        let message = Message::ActionStatus(action.as_action_description());
        self.subscribers.broadcast(&message);
        Ok(())
    }

    #[must_use]
    pub fn get_action(&self, name: &str, id: ActionId) -> Option<&Action> {
        self.actions
            .get(name)?
            .iter()
            .find(|action| action.id() == id)
    }

    /// Drop an action record. Returns the removed record, if it existed.
    pub fn remove_action(&mut self, name: &str, id: ActionId) -> Option<Action> {
        let list = self.actions.get_mut(name)?;
        let index = list.iter().position(|action| action.id() == id)?;
        Some(list.remove(index))
    }

    /// Register an event type that subscribers can follow.
    pub fn add_available_event(&mut self, name: impl Into<String>, metadata: DataSchema) {
        let name = name.into();
        self.subscribers.register_event(name.clone());
        self.available_events.insert(name, metadata);
    }

    /// Append to the event log and notify that event's subscribers.
    ///
    /// When a history limit is set the oldest entries are dropped first.
    pub fn add_event(&mut self, event: Event) {
        self.event_notify(&event);
        self.events.push_back(event);
        if let Some(limit) = self.event_history_limit {
            while self.events.len() > limit {
                self.events.pop_front();
            }
        }
    }

    pub fn add_subscriber(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.add(subscriber);
    }

    /// Remove a subscriber from the global set and every event set.
    pub fn remove_subscriber(&self, id: SubscriberId) -> bool {
        self.subscribers.remove(id)
    }

    /// Follow one event type. Unknown event names are ignored.
    pub fn add_event_subscriber(&self, name: &str, subscriber: Arc<dyn Subscriber>) -> bool {
        self.subscribers.add_event_subscriber(name, subscriber)
    }

    pub fn remove_event_subscriber(&self, name: &str, id: SubscriberId) -> bool {
        self.subscribers.remove_event_subscriber(name, id)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.subscriber_count()
    }

    /// Push a `propertyStatus` message to global subscribers.
    pub fn property_notify(&self, name: &str, value: JsonValue) -> usize {
        self.subscribers
            .broadcast(&Message::property_status(name, value))
    }

    /// Push an `actionStatus` message to global subscribers.
    pub fn action_notify(&self, action: &Action) -> usize {
        self.subscribers
            .broadcast(&Message::ActionStatus(action.as_action_description()))
    }

    /// Push an `event` message to the subscribers of that event.
    pub fn event_notify(&self, event: &Event) -> usize {
        self.subscribers.publish_event(
            event.name(),
            &Message::Event(event.as_event_description()),
        )
    }
}

/// Step-by-step builder for [`Thing`].
#[derive(Debug, Default)]
pub struct ThingBuilder {
    id: Option<String>,
    title: Option<String>,
    types: Vec<String>,
    description: Option<String>,
    event_history_limit: Option<usize>,
    ui_href: Option<String>,
}

impl ThingBuilder {
    /// The thing's unique id, ideally a URI.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a semantic `@type`.
    #[must_use]
    pub fn at_type(mut self, at_type: impl Into<String>) -> Self {
        self.types.push(at_type.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Keep at most `limit` events in the log.
    #[must_use]
    pub fn event_history_limit(mut self, limit: usize) -> Self {
        self.event_history_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn ui_href(mut self, href: impl Into<String>) -> Self {
        self.ui_href = Some(href.into());
        self
    }

    /// Consume the builder, validate, and return a [`Thing`].
    ///
    /// # Errors
    ///
    /// Returns [`WebThingError::Validation`] if `id` or `title` is missing
    /// or empty.
    pub fn build(self) -> Result<Thing, WebThingError> {
        let id = self.id.unwrap_or_default();
        if id.is_empty() {
            return Err(ValidationError::EmptyId.into());
        }
        let title = self.title.unwrap_or_default();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        Ok(Thing {
            id,
            title,
            types: self.types,
            description: self.description.unwrap_or_default(),
            properties: HashMap::new(),
            available_actions: BTreeMap::new(),
            actions: IndexMap::new(),
            available_events: BTreeMap::new(),
            events: VecDeque::new(),
            event_history_limit: self.event_history_limit,
            subscribers: Arc::new(SubscriberHub::new()),
            href_prefix: String::new(),
            ui_href: self.ui_href,
        })
    }
}
