//! JSON REST handlers for actions.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value as JsonValue;

use webthing_app::registry::ThingRegistry;
use webthing_app::thing_handle::ThingHandle;
use webthing_domain::action::ActionDescription;
use webthing_domain::error::{NotFoundError, WebThingError};
use webthing_domain::id::ActionId;

use crate::error::ApiError;
use crate::extract::ThingPath;
use crate::state::AppState;

const ACTION_NAME: &str = "action_name";
const ACTION_ID: &str = "action_id";

/// Possible responses from the list endpoints.
pub enum ListResponse {
    Ok(Json<Vec<ActionDescription>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<ActionDescription>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the request endpoints.
pub enum CreateResponse {
    Created(Json<ActionDescription>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the update endpoint.
pub enum UpdateResponse {
    Ok,
}

impl IntoResponse for UpdateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok => StatusCode::OK.into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /actions`
pub async fn list<R>(
    State(state): State<AppState<R>>,
    params: ThingPath,
) -> Result<ListResponse, ApiError>
where
    R: ThingRegistry,
{
    let thing = state.thing(params.thing_id())?;
    Ok(ListResponse::Ok(Json(thing.get_action_descriptions(None))))
}

/// `POST /actions` with a body `{"<action_name>": {"input": ...}}`.
pub async fn request<R>(
    State(state): State<AppState<R>>,
    params: ThingPath,
    Json(body): Json<JsonValue>,
) -> Result<CreateResponse, ApiError>
where
    R: ThingRegistry,
{
    let thing = state.thing(params.thing_id())?;
    let (name, input) = single_request(&body)?;
    perform(&thing, name, input)
}

/// `GET /actions/{action_name}`
pub async fn list_named<R>(
    State(state): State<AppState<R>>,
    params: ThingPath,
) -> Result<ListResponse, ApiError>
where
    R: ThingRegistry,
{
    let thing = state.thing(params.thing_id())?;
    let name = params.get(ACTION_NAME).unwrap_or_default();
    Ok(ListResponse::Ok(Json(
        thing.get_action_descriptions(Some(name)),
    )))
}

/// `POST /actions/{action_name}`; the body's only key must be the action
/// named in the path.
pub async fn request_named<R>(
    State(state): State<AppState<R>>,
    params: ThingPath,
    Json(body): Json<JsonValue>,
) -> Result<CreateResponse, ApiError>
where
    R: ThingRegistry,
{
    let thing = state.thing(params.thing_id())?;
    let expected = params.get(ACTION_NAME).unwrap_or_default();
    let (name, input) = single_request(&body)?;
    if name != expected {
        return Err(ApiError::bad_request(format!(
            "request body must contain {expected}"
        )));
    }
    perform(&thing, name, input)
}

/// `GET /actions/{action_name}/{action_id}`
pub async fn get<R>(
    State(state): State<AppState<R>>,
    params: ThingPath,
) -> Result<GetResponse, ApiError>
where
    R: ThingRegistry,
{
    let thing = state.thing(params.thing_id())?;
    let (name, id) = action_ref(&params)?;
    let action = thing
        .get_action(name, id)
        .ok_or_else(|| not_found(&id.to_string()))?;
    Ok(GetResponse::Ok(Json(action.as_action_description())))
}

/// `PUT /actions/{action_name}/{action_id}`: accepted, no effect.
pub async fn update<R>(
    State(state): State<AppState<R>>,
    params: ThingPath,
) -> Result<UpdateResponse, ApiError>
where
    R: ThingRegistry,
{
    state.thing(params.thing_id())?;
    Ok(UpdateResponse::Ok)
}

/// `DELETE /actions/{action_name}/{action_id}`: cancel and forget.
pub async fn delete<R>(
    State(state): State<AppState<R>>,
    params: ThingPath,
) -> Result<DeleteResponse, ApiError>
where
    R: ThingRegistry,
{
    let thing = state.thing(params.thing_id())?;
    let (name, id) = action_ref(&params)?;
    if thing.remove_action(name, id).await {
        Ok(DeleteResponse::NoContent)
    } else {
        Err(not_found(&id.to_string()))
    }
}

fn perform(
    thing: &ThingHandle,
    name: &str,
    input: Option<JsonValue>,
) -> Result<CreateResponse, ApiError> {
    let pending = thing
        .perform_action(name, input)
        .ok_or_else(|| ApiError::bad_request(format!("invalid request for action {name}")))?;
    let description = pending.description().clone();
    pending.start();
    Ok(CreateResponse::Created(Json(description)))
}

/// Split a `{"<name>": {"input": ...}}` body.
fn single_request(body: &JsonValue) -> Result<(&str, Option<JsonValue>), ApiError> {
    let object = body
        .as_object()
        .filter(|object| object.len() == 1)
        .ok_or_else(|| ApiError::bad_request("request body must contain exactly one action"))?;
    let (name, request) = object
        .iter()
        .next()
        .ok_or_else(|| ApiError::bad_request("request body must contain exactly one action"))?;
    Ok((name.as_str(), request.get("input").cloned()))
}

fn action_ref(params: &ThingPath) -> Result<(&str, ActionId), ApiError> {
    let name = params.get(ACTION_NAME).unwrap_or_default();
    let raw = params.get(ACTION_ID).unwrap_or_default();
    let id = raw.parse::<ActionId>().map_err(|_| not_found(raw))?;
    Ok((name, id))
}

fn not_found(id: &str) -> ApiError {
    ApiError::from(WebThingError::NotFound(NotFoundError {
        entity: "action",
        id: id.to_string(),
    }))
}
