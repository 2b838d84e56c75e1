//! JSON REST handlers for properties.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value as JsonValue};

use webthing_app::registry::ThingRegistry;
use webthing_domain::error::{NotFoundError, WebThingError};

use crate::error::ApiError;
use crate::extract::ThingPath;
use crate::state::AppState;

const PROPERTY_NAME: &str = "property_name";

/// Possible responses from the property endpoints.
pub enum PropertiesResponse {
    Ok(Json<Map<String, JsonValue>>),
}

impl IntoResponse for PropertiesResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /properties`
pub async fn list<R>(
    State(state): State<AppState<R>>,
    params: ThingPath,
) -> Result<PropertiesResponse, ApiError>
where
    R: ThingRegistry,
{
    let thing = state.thing(params.thing_id())?;
    Ok(PropertiesResponse::Ok(Json(thing.get_properties())))
}

/// `GET /properties/{property_name}`
pub async fn get<R>(
    State(state): State<AppState<R>>,
    params: ThingPath,
) -> Result<PropertiesResponse, ApiError>
where
    R: ThingRegistry,
{
    let thing = state.thing(params.thing_id())?;
    let name = params.get(PROPERTY_NAME).unwrap_or_default();
    let value = thing.get_property(name).ok_or_else(|| not_found(name))?;
    Ok(PropertiesResponse::Ok(Json(single(name, value))))
}

/// `PUT /properties/{property_name}`
///
/// The body must be `{"<property_name>": value}`; the response carries the
/// value actually recorded.
pub async fn put<R>(
    State(state): State<AppState<R>>,
    params: ThingPath,
    Json(body): Json<JsonValue>,
) -> Result<PropertiesResponse, ApiError>
where
    R: ThingRegistry,
{
    let thing = state.thing(params.thing_id())?;
    let name = params.get(PROPERTY_NAME).unwrap_or_default();
    let Some(value) = body.get(name) else {
        return Err(ApiError::bad_request(format!(
            "request body must contain {name}"
        )));
    };
    if !thing.has_property(name) {
        return Err(not_found(name));
    }

    thing.set_property(name, value.clone())?;

    let value = thing.get_property(name).unwrap_or_default();
    Ok(PropertiesResponse::Ok(Json(single(name, value))))
}

fn single(name: &str, value: JsonValue) -> Map<String, JsonValue> {
    let mut map = Map::new();
    map.insert(name.to_string(), value);
    map
}

fn not_found(name: &str) -> ApiError {
    ApiError::from(WebThingError::NotFound(NotFoundError {
        entity: "property",
        id: name.to_string(),
    }))
}
