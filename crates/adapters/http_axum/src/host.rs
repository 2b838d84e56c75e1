//! `Host` header validation against DNS rebinding.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::HOST;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Names under which the server accepts requests.
#[derive(Debug, Clone)]
pub struct AllowedHosts {
    port: u16,
    hosts: HashSet<String>,
    disabled: bool,
}

impl AllowedHosts {
    /// Accept `localhost` with and without the listening port.
    #[must_use]
    pub fn new(port: u16) -> Self {
        let mut hosts = Self {
            port,
            hosts: HashSet::new(),
            disabled: false,
        };
        hosts.insert("localhost");
        hosts
    }

    /// Accept every host. Leaves the server open to DNS rebinding.
    #[must_use]
    pub fn any() -> Self {
        Self {
            port: 0,
            hosts: HashSet::new(),
            disabled: true,
        }
    }

    /// Also accept `host` and `host:port`.
    #[must_use]
    pub fn with_host(mut self, host: &str) -> Self {
        self.insert(host);
        self
    }

    /// Also accept the mDNS name of the machine, `name.local[:port]`.
    #[must_use]
    pub fn with_local_hostname(mut self, name: &str) -> Self {
        self.insert(&format!("{name}.local"));
        self
    }

    #[must_use]
    pub fn is_allowed(&self, host: Option<&str>) -> bool {
        self.disabled || host.is_some_and(|host| self.hosts.contains(&host.to_lowercase()))
    }

    fn insert(&mut self, host: &str) {
        let host = host.to_lowercase();
        if host.is_empty() {
            return;
        }
        self.hosts.insert(format!("{host}:{}", self.port));
        self.hosts.insert(host);
    }
}

/// Middleware answering `403 Forbidden` to requests for unknown hosts.
pub async fn validate_host(
    State(allowed): State<Arc<AllowedHosts>>,
    request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().authority().map(|authority| authority.as_str()));

    if allowed.is_allowed(host) {
        next.run(request).await
    } else {
        tracing::debug!(host = host.unwrap_or_default(), "rejected request for unknown host");
        (StatusCode::FORBIDDEN, "Forbidden").into_response()
    }
}
