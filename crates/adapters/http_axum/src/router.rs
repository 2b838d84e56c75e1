//! Axum router assembly.

use std::sync::Arc;

use axum::Router;
use axum::http::header::{ACCEPT, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderName, Method};
use axum::middleware;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use webthing_app::registry::ThingRegistry;

use crate::host::{AllowedHosts, validate_host};
use crate::state::AppState;
use crate::{actions, events, properties, things};

/// How the router is mounted.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Path prefix of every route, without trailing slash. Empty for `/`.
    pub base_path: String,
    pub allowed_hosts: AllowedHosts,
}

impl ServerOptions {
    #[must_use]
    pub fn new(allowed_hosts: AllowedHosts) -> Self {
        Self {
            base_path: String::new(),
            allowed_hosts,
        }
    }

    #[must_use]
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = base_path.trim_end_matches('/').to_string();
        self
    }
}

/// Build the top-level axum [`Router`].
///
/// Mounts the registry's things under the base path, so their hrefs match
/// the routes, then adds host validation, CORS headers and a
/// [`TraceLayer`] logging each request.
pub fn build<R>(registry: Arc<R>, options: ServerOptions) -> Router
where
    R: ThingRegistry,
{
    registry.mount(&options.base_path);
    let multiple = registry.is_multiple();

    let routes = if multiple {
        Router::new()
            .route("/", get(things::list::<R>))
            .nest("/{thing_id}", thing_routes::<R>())
    } else {
        thing_routes::<R>()
    };
    let routes = if options.base_path.is_empty() {
        routes
    } else {
        Router::new().nest(&options.base_path, routes)
    };

    routes
        .layer(middleware::from_fn_with_state(
            Arc::new(options.allowed_hosts),
            validate_host,
        ))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::from_arc(registry))
}

/// Routes of one thing, relative to its href.
fn thing_routes<R>() -> Router<AppState<R>>
where
    R: ThingRegistry,
{
    Router::new()
        .route("/", get(things::describe::<R>))
        // Properties
        .route("/properties", get(properties::list::<R>))
        .route(
            "/properties/{property_name}",
            get(properties::get::<R>).put(properties::put::<R>),
        )
        // Actions
        .route(
            "/actions",
            get(actions::list::<R>).post(actions::request::<R>),
        )
        .route(
            "/actions/{action_name}",
            get(actions::list_named::<R>).post(actions::request_named::<R>),
        )
        .route(
            "/actions/{action_name}/{action_id}",
            get(actions::get::<R>)
                .put(actions::update::<R>)
                .delete(actions::delete::<R>),
        )
        // Events
        .route("/events", get(events::list::<R>))
        .route("/events/{event_name}", get(events::list_named::<R>))
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([
            ORIGIN,
            HeaderName::from_static("x-requested-with"),
            CONTENT_TYPE,
            ACCEPT,
        ])
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::POST,
            Method::DELETE,
        ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value as JsonValue, json};
    use tower::ServiceExt;

    use webthing_app::ports::ActionContext;
    use webthing_app::ports::action::NoopBehavior;
    use webthing_app::registry::{MultipleThings, SingleThing};
    use webthing_app::thing_handle::ThingHandle;
    use webthing_domain::event::Event;
    use webthing_domain::property::Property;
    use webthing_domain::schema::{ActionMetadata, DataSchema, JsonType};
    use webthing_domain::thing::Thing;
    use webthing_domain::value::Value;

    fn lamp() -> ThingHandle {
        let thing = ThingHandle::new(
            Thing::builder()
                .id("urn:dev:ops:lamp")
                .title("Lamp")
                .at_type("Light")
                .build()
                .unwrap(),
        );
        thing.add_property(Property::new(
            "brightness",
            Value::new(json!(50)),
            DataSchema::new(JsonType::Integer)
                .with_minimum(0)
                .with_maximum(100),
        ));
        thing.add_property(Property::new(
            "temperature",
            Value::new(json!(21.5)),
            DataSchema::new(JsonType::Number).read_only(),
        ));
        thing.add_available_action(
            "fade",
            ActionMetadata::new().with_input(
                DataSchema::new(JsonType::Object).with_property(
                    "level",
                    DataSchema::new(JsonType::Integer)
                        .with_minimum(0)
                        .with_maximum(100),
                    true,
                ),
            ),
            |_: &ActionContext| NoopBehavior,
        );
        thing.add_available_event("overheated", DataSchema::new(JsonType::Number));
        thing
    }

    fn sensor() -> ThingHandle {
        ThingHandle::new(
            Thing::builder()
                .id("urn:dev:ops:sensor")
                .title("Sensor")
                .build()
                .unwrap(),
        )
    }

    fn single_app(thing: ThingHandle) -> Router {
        build(
            Arc::new(SingleThing::new(thing)),
            ServerOptions::new(AllowedHosts::new(8888)),
        )
    }

    fn request(method: Method, uri: &str, body: Option<JsonValue>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("host", "localhost:8888");
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response<Body>) -> JsonValue {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn should_describe_thing_with_transport_details() {
        let app = single_app(lamp());

        let response = app
            .oneshot(request(Method::GET, "/", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["id"], "urn:dev:ops:lamp");
        assert_eq!(body["base"], "http://localhost:8888/");
        assert_eq!(body["security"], "nosec_sc");
        assert_eq!(body["securityDefinitions"]["nosec_sc"]["scheme"], "nosec");
        assert_eq!(
            body["properties"]["brightness"]["links"][0]["href"],
            "/properties/brightness"
        );
        let links = body["links"].as_array().unwrap();
        assert!(links.contains(&json!({"rel": "alternate", "href": "ws://localhost:8888/"})));
    }

    #[tokio::test]
    async fn should_reject_request_when_host_is_unknown() {
        let app = single_app(lamp());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("host", "evil.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn should_add_cors_headers_to_responses() {
        let app = single_app(lamp());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/properties")
                    .header("host", "localhost")
                    .header("origin", "http://dashboard.local")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }

    #[tokio::test]
    async fn should_list_property_values() {
        let app = single_app(lamp());

        let response = app
            .oneshot(request(Method::GET, "/properties", None))
            .await
            .unwrap();

        assert_eq!(
            json_body(response).await,
            json!({"brightness": 50, "temperature": 21.5})
        );
    }

    #[tokio::test]
    async fn should_return_not_found_when_property_is_unknown() {
        let app = single_app(lamp());

        let response = app
            .oneshot(request(Method::GET, "/properties/color", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_write_property_and_echo_new_value() {
        let thing = lamp();
        let app = single_app(thing.clone());

        let response = app
            .oneshot(request(
                Method::PUT,
                "/properties/brightness",
                Some(json!({"brightness": 75})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"brightness": 75}));
        assert_eq!(thing.get_property("brightness"), Some(json!(75)));
    }

    #[tokio::test]
    async fn should_return_bad_request_when_property_value_is_invalid() {
        let thing = lamp();
        let app = single_app(thing.clone());

        let response = app
            .oneshot(request(
                Method::PUT,
                "/properties/brightness",
                Some(json!({"brightness": 150})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(thing.get_property("brightness"), Some(json!(50)));
    }

    #[tokio::test]
    async fn should_return_bad_request_when_property_is_read_only() {
        let app = single_app(lamp());

        let response = app
            .oneshot(request(
                Method::PUT,
                "/properties/temperature",
                Some(json!({"temperature": 30})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_return_bad_request_when_body_misses_property() {
        let app = single_app(lamp());

        let response = app
            .oneshot(request(
                Method::PUT,
                "/properties/brightness",
                Some(json!({"on": true})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_create_action_when_requested() {
        let thing = lamp();
        let app = single_app(thing.clone());

        let response = app
            .oneshot(request(
                Method::POST,
                "/actions",
                Some(json!({"fade": {"input": {"level": 20}}})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["fade"]["status"], "created");
        assert_eq!(body["fade"]["input"], json!({"level": 20}));
        let href = body["fade"]["href"].as_str().unwrap();
        assert!(href.starts_with("/actions/fade/"));
        assert_eq!(thing.get_action_descriptions(Some("fade")).len(), 1);
    }

    #[tokio::test]
    async fn should_return_bad_request_when_body_names_several_actions() {
        let app = single_app(lamp());

        let response = app
            .oneshot(request(
                Method::POST,
                "/actions",
                Some(json!({"fade": {}, "blink": {}})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_return_bad_request_when_action_input_is_invalid() {
        let thing = lamp();
        let app = single_app(thing.clone());

        let response = app
            .oneshot(request(
                Method::POST,
                "/actions/fade",
                Some(json!({"fade": {"input": {"level": 150}}})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(thing.get_action_descriptions(None).is_empty());
    }

    #[tokio::test]
    async fn should_return_bad_request_when_body_names_another_action() {
        let app = single_app(lamp());

        let response = app
            .oneshot(request(
                Method::POST,
                "/actions/fade",
                Some(json!({"blink": {}})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_get_and_delete_action_by_id() {
        let thing = lamp();
        let pending = thing
            .perform_action("fade", Some(json!({"level": 10})))
            .unwrap();
        let id = pending.id();
        pending.start().await.unwrap();
        let uri = format!("/actions/fade/{id}");

        let response = single_app(thing.clone())
            .oneshot(request(Method::GET, &uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["fade"]["status"], "completed");

        let response = single_app(thing.clone())
            .oneshot(request(Method::DELETE, &uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = single_app(thing)
            .oneshot(request(Method::DELETE, &uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_return_not_found_when_action_id_is_malformed() {
        let app = single_app(lamp());

        let response = app
            .oneshot(request(Method::GET, "/actions/fade/not-a-uuid", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_accept_action_update_without_effect() {
        let app = single_app(lamp());

        let response = app
            .oneshot(request(
                Method::PUT,
                "/actions/fade/not-a-uuid",
                Some(json!({})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn should_list_events_by_name() {
        let thing = lamp();
        thing.add_event(Event::new("overheated", Some(json!(102))));
        thing.add_event(Event::new("rebooted", None));

        let response = single_app(thing.clone())
            .oneshot(request(Method::GET, "/events/overheated", None))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["overheated"]["data"], 102);

        let response = single_app(thing)
            .oneshot(request(Method::GET, "/events", None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_list_every_thing_when_hosting_several() {
        let registry = MultipleThings::new(vec![lamp(), sensor()], "Things");
        let app = build(
            Arc::new(registry),
            ServerOptions::new(AllowedHosts::new(8888)),
        );

        let response = app
            .oneshot(request(Method::GET, "/", None))
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body[0]["href"], "/0");
        assert_eq!(body[1]["href"], "/1");
        assert_eq!(body[1]["base"], "http://localhost:8888/1");
    }

    #[tokio::test]
    async fn should_route_by_thing_index_when_hosting_several() {
        let registry = MultipleThings::new(vec![lamp(), sensor()], "Things");
        let app = build(
            Arc::new(registry),
            ServerOptions::new(AllowedHosts::new(8888)),
        );

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/0/properties/brightness", None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await, json!({"brightness": 50}));

        let response = app
            .oneshot(request(Method::GET, "/7/properties", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_mount_routes_under_base_path() {
        let thing = lamp();
        let app = build(
            Arc::new(SingleThing::new(thing.clone())),
            ServerOptions::new(AllowedHosts::new(8888)).with_base_path("/lamp/"),
        );

        let response = app
            .oneshot(request(Method::GET, "/lamp/properties/brightness", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(thing.href(), "/lamp");
    }
}
