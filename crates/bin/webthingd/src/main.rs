//! # webthingd — web thing daemon
//!
//! Composition root that wires the virtual things to the HTTP adapter and
//! starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialise logging
//! - Build the virtual things and start their drivers
//! - Assemble the registry (single lamp or every thing) and the axum router
//! - Bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use webthing_adapter_http_axum::host::AllowedHosts;
use webthing_adapter_http_axum::router::{self, ServerOptions};
use webthing_adapter_virtual::VirtualThings;
use webthing_app::registry::{MultipleThings, SingleThing};

use config::{Config, ThingsMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let things = VirtualThings::new(config.things.event_history_limit)
        .context("failed to build virtual things")?;
    let drivers = things.start();

    let options = server_options(&config);
    let app = match config.things.mode {
        ThingsMode::Single => router::build(Arc::new(SingleThing::new(things.lamp())), options),
        ThingsMode::Multiple => router::build(
            Arc::new(MultipleThings::new(
                things.things(),
                config.things.name.clone(),
            )),
            options,
        ),
    };

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(
        address = %bind_addr,
        base_path = %config.server.base_path,
        mode = ?config.things.mode,
        "webthingd listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    for driver in drivers {
        driver.abort();
    }
    tracing::info!("webthingd stopped");
    Ok(())
}

fn server_options(config: &Config) -> ServerOptions {
    let allowed_hosts = if config.server.disable_host_validation {
        tracing::warn!("host validation disabled");
        AllowedHosts::any()
    } else {
        let mut hosts = AllowedHosts::new(config.server.port).with_host(&config.server.host);
        if let Some(hostname) = &config.server.hostname {
            hosts = hosts.with_host(hostname);
        }
        if let Some(hostname) = system_hostname() {
            hosts = hosts.with_host(&hostname).with_local_hostname(&hostname);
        }
        hosts
    };
    ServerOptions::new(allowed_hosts).with_base_path(&config.server.base_path)
}

/// Name of the machine, if the platform exposes it.
fn system_hostname() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
}

/// Resolve when the process is asked to stop.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
