mod bootstrap;
mod health;
mod slack_api;
mod webhook;

use std::time::Duration;

use anyhow::Result;
use awebot_core::config::{AppConfig, LoadOptions};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use awebot_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);

    let runner = app.runner;
    let runner_task = tokio::spawn(async move { runner.start().await });

    let routes = health::router(health::HealthState::new(app.storage, app.sink_mode.as_str()))
        .merge(webhook::router(webhook::WebhookState::new(
            app.dispatcher,
            app.events,
            app.config.slack.signing_secret.clone(),
        )));

    if app.config.slack.signing_secret.is_none() {
        tracing::warn!(
            event_name = "system.server.unsigned_ingress",
            correlation_id = "bootstrap",
            "no signing secret configured; slack request signatures are not verified"
        );
    }

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        sink_mode = app.sink_mode.as_str(),
        "awebot-server listening"
    );

    axum::serve(listener, routes).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = grace.as_secs(),
        "draining queued slack events"
    );
    if tokio::time::timeout(grace, runner_task).await.is_err() {
        tracing::warn!(
            event_name = "system.server.drain_timeout",
            correlation_id = "shutdown",
            "event runner did not drain before the grace period elapsed"
        );
    }

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "could not listen for ctrl-c; shutting down");
    }
}
