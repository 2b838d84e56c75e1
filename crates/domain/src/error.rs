//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts via `#[from]`.
//! Absence (unknown property, action, event or thing) is expressed with
//! `Option` on lookups, not with these errors; [`NotFoundError`] exists for
//! callers that need to turn an absence into a failure.

use crate::action::TransitionError;
use crate::schema::SchemaError;

/// Boxed error returned by device forwarders.
pub type ForwardError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for the webthing core.
#[derive(Debug, thiserror::Error)]
pub enum WebThingError {
    /// A caller-supplied value broke an invariant.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The addressed thing, property or action does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// An action was asked to move to a state it cannot reach.
    #[error("invalid action transition")]
    Transition(#[from] TransitionError),

    /// The backing device rejected a write.
    #[error("failed to forward value to device")]
    Forward(#[source] ForwardError),
}

/// Invariant violations detected before any state changes.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// A thing was built without an identifier.
    #[error("thing id must not be empty")]
    EmptyId,

    /// A thing was built without a title.
    #[error("thing title must not be empty")]
    EmptyTitle,

    /// A write was attempted on a property declared `readOnly`.
    #[error("property {property} is read-only")]
    ReadOnly { property: String },

    /// A written value does not satisfy the property schema.
    #[error("invalid value for property {property}")]
    Schema {
        property: String,
        #[source]
        source: SchemaError,
    },
}

/// Why a thing refused to create an action.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionRejected {
    /// No action type is registered under this name.
    #[error("unknown action {0}")]
    UnknownAction(String),

    /// The input does not satisfy the action's input schema.
    #[error("invalid input for action {action}")]
    InvalidInput {
        action: String,
        #[source]
        source: SchemaError,
    },
}

/// Lookup failure for a named entity.
#[derive(Debug, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_read_only_property_name() {
        let err = ValidationError::ReadOnly {
            property: "level".to_string(),
        };
        assert_eq!(err.to_string(), "property level is read-only");
    }

    #[test]
    fn should_display_not_found_entity_and_id() {
        let err = NotFoundError {
            entity: "Property",
            id: "brightness".to_string(),
        };
        assert_eq!(err.to_string(), "Property not found: brightness");
    }

    #[test]
    fn should_display_unknown_action_name() {
        let err = ActionRejected::UnknownAction("dim".to_string());
        assert_eq!(err.to_string(), "unknown action dim");
    }

    #[test]
    fn should_convert_validation_error_into_webthing_error() {
        let err: WebThingError = ValidationError::EmptyTitle.into();
        assert!(matches!(
            err,
            WebThingError::Validation(ValidationError::EmptyTitle)
        ));
    }
}
