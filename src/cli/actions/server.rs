use crate::{
    api::{self, ApiConfig},
    bus::{IdleSubscriber, LogPublisher},
    cli::telemetry,
    gateway::GatewayConfig,
};
use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub cors_origin: String,
    pub led_topic: String,
    pub temperature_topic: String,
    pub request_timeout: Duration,
    pub lockout_threshold: u32,
    pub lockout_cooldown: Duration,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let gateway_config = GatewayConfig::new()
        .with_lockout_threshold(args.lockout_threshold)
        .with_lockout_cooldown(args.lockout_cooldown);

    let api_config = ApiConfig::new()
        .with_cors_origin(args.cors_origin)
        .with_led_topic(args.led_topic)
        .with_temperature_topic(args.temperature_topic)
        .with_request_timeout(args.request_timeout);

    debug!(?gateway_config, ?api_config, "starting server");

    let result = api::new(
        args.port,
        args.dsn,
        &gateway_config,
        &api_config,
        Arc::new(LogPublisher),
        Arc::new(IdleSubscriber),
    )
    .await;

    telemetry::shutdown_tracer();

    result
}
