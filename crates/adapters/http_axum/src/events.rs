//! JSON REST handlers for the event log.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use webthing_app::registry::ThingRegistry;
use webthing_domain::event::EventDescription;

use crate::error::ApiError;
use crate::extract::ThingPath;
use crate::state::AppState;

/// Possible responses from the list endpoints.
pub enum ListResponse {
    Ok(Json<Vec<EventDescription>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /events`
pub async fn list<R>(
    State(state): State<AppState<R>>,
    params: ThingPath,
) -> Result<ListResponse, ApiError>
where
    R: ThingRegistry,
{
    let thing = state.thing(params.thing_id())?;
    Ok(ListResponse::Ok(Json(thing.get_event_descriptions(None))))
}

/// `GET /events/{event_name}`
pub async fn list_named<R>(
    State(state): State<AppState<R>>,
    params: ThingPath,
) -> Result<ListResponse, ApiError>
where
    R: ThingRegistry,
{
    let thing = state.thing(params.thing_id())?;
    let name = params.get("event_name").unwrap_or_default();
    Ok(ListResponse::Ok(Json(thing.get_event_descriptions(Some(
        name,
    )))))
}
