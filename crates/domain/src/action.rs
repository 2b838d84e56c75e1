//! Action — the record of one invocation of a thing's action type.
//!
//! The record tracks the lifecycle `created → pending → completed`; the
//! work itself is driven from the application layer. Transitions only move
//! forward and are refused otherwise.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::description::Named;
use crate::id::ActionId;
use crate::time::{self, Timestamp};

/// Lifecycle state of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Created,
    Pending,
    Completed,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Pending => "pending",
            Self::Completed => "completed",
        })
    }
}

/// A refused status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move action from {from} to {to}")]
pub struct TransitionError {
    pub from: ActionStatus,
    pub to: ActionStatus,
}

/// Wire form of an action: `{name: {href, timeRequested, status, ...}}`.
pub type ActionDescription = Named<ActionBody>;

/// Body of an [`ActionDescription`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBody {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub input: Option<JsonValue>,
    pub href: String,
    #[serde(with = "time::wire")]
    pub time_requested: Timestamp,
    pub status: ActionStatus,
    #[serde(
        with = "time::wire_option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub time_completed: Option<Timestamp>,
}

/// One requested action.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    id: ActionId,
    name: String,
    input: Option<JsonValue>,
    status: ActionStatus,
    time_requested: Timestamp,
    time_completed: Option<Timestamp>,
    href_prefix: String,
}

impl Action {
    /// Create a record in the `created` state.
    ///
    /// A `null` input is treated as no input.
    #[must_use]
    pub fn new(id: ActionId, name: impl Into<String>, input: Option<JsonValue>) -> Self {
        Self {
            id,
            name: name.into(),
            input: input.filter(|input| !input.is_null()),
            status: ActionStatus::Created,
            time_requested: time::now(),
            time_completed: None,
            href_prefix: String::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ActionId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn input(&self) -> Option<&JsonValue> {
        self.input.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> ActionStatus {
        self.status
    }

    #[must_use]
    pub fn time_requested(&self) -> Timestamp {
        self.time_requested
    }

    #[must_use]
    pub fn time_completed(&self) -> Option<Timestamp> {
        self.time_completed
    }

    #[must_use]
    pub fn href(&self) -> String {
        format!("{}/actions/{}/{}", self.href_prefix, self.name, self.id)
    }

    pub fn set_href_prefix(&mut self, prefix: impl Into<String>) {
        self.href_prefix = prefix.into();
    }

    /// Move from `created` to `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] unless the action is `created`.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(ActionStatus::Created, ActionStatus::Pending)
    }

    /// Move from `pending` to `completed` and stamp the completion time.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] unless the action is `pending`.
    pub fn finish(&mut self) -> Result<(), TransitionError> {
        self.transition(ActionStatus::Pending, ActionStatus::Completed)?;
        self.time_completed = Some(time::now().max(self.time_requested));
        Ok(())
    }

    fn transition(&mut self, from: ActionStatus, to: ActionStatus) -> Result<(), TransitionError> {
        if self.status != from {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    #[must_use]
    pub fn as_action_description(&self) -> ActionDescription {
        Named::new(
            self.name.clone(),
            ActionBody {
                input: self.input.clone(),
                href: self.href(),
                time_requested: self.time_requested,
                status: self.status,
                time_completed: self.time_completed,
            },
        )
    }
}
