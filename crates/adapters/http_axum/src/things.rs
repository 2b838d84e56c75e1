//! Thing description handlers and the WebSocket entry point.

use axum::Json;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::http::header::HOST;
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, json};

use webthing_app::registry::ThingRegistry;
use webthing_app::thing_handle::ThingHandle;
use webthing_domain::link::Link;
use webthing_domain::thing::ThingDescription;

use crate::error::ApiError;
use crate::extract::ThingPath;
use crate::state::AppState;

const SECURITY_SCHEME: &str = "nosec_sc";

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<ThingDescription>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the describe endpoint.
pub enum DescribeResponse {
    Ok(Json<ThingDescription>),
    Upgrade(Response),
}

impl IntoResponse for DescribeResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
            Self::Upgrade(response) => response,
        }
    }
}

/// `GET /` on a multi-thing server.
pub async fn list<R>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    uri: Uri,
) -> ListResponse
where
    R: ThingRegistry,
{
    let host = request_host(&headers, &uri);
    let descriptions = state
        .registry
        .things()
        .iter()
        .map(|thing| {
            let mut description = describe_for(thing, &host);
            description.href = Some(thing.href());
            description
        })
        .collect();
    ListResponse::Ok(Json(descriptions))
}

/// `GET /` or `GET /{thing_id}`: the thing description, or a WebSocket
/// session when the request asks for an upgrade.
pub async fn describe<R>(
    State(state): State<AppState<R>>,
    params: ThingPath,
    headers: HeaderMap,
    uri: Uri,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<DescribeResponse, ApiError>
where
    R: ThingRegistry,
{
    if let Ok(upgrade) = upgrade {
        let thing = state.registry.thing(params.thing_id());
        let response = upgrade.on_upgrade(move |socket| crate::ws::serve(socket, thing));
        return Ok(DescribeResponse::Upgrade(response));
    }

    let thing = state.thing(params.thing_id())?;
    let host = request_host(&headers, &uri);
    Ok(DescribeResponse::Ok(Json(describe_for(&thing, &host))))
}

/// The thing's description completed with the addresses it is reachable at.
fn describe_for(thing: &ThingHandle, host: &str) -> ThingDescription {
    let href = thing.href();
    let mut description = thing.as_thing_description();
    description
        .links
        .push(Link::new("alternate", format!("ws://{host}{href}")));
    description.base = Some(format!("http://{host}{href}"));

    let mut definitions = Map::new();
    definitions.insert(SECURITY_SCHEME.to_string(), json!({"scheme": "nosec"}));
    description.security_definitions = Some(definitions);
    description.security = Some(SECURITY_SCHEME.to_string());
    description
}

fn request_host(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.authority().map(|authority| authority.as_str()))
        .unwrap_or("localhost")
        .to_string()
}
