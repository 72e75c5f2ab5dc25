//! Map validated CLI matches to an [`Action`].

use crate::cli::actions::{Action, add_user, server};
use crate::cli::commands::{self, lockout, user};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;

/// Map validated CLI matches to a server or user action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if let Some((user::CMD_ADD_USER, sub_m)) = matches.subcommand() {
        let dsn = sub_m
            .get_one::<String>(commands::ARG_DSN)
            .cloned()
            .context("missing required argument: --dsn")?;
        let username = sub_m
            .get_one::<String>(user::ARG_USERNAME)
            .cloned()
            .context("missing required argument: --username")?;
        let password = sub_m
            .get_one::<String>(user::ARG_PASSWORD)
            .map(|password| SecretString::from(password.as_str()))
            .context("missing required argument: --password")?;

        return Ok(Action::AddUser(add_user::Args {
            dsn,
            username,
            password,
        }));
    }

    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(5000);
    let dsn = matches
        .get_one::<String>(commands::ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let cors_origin = matches
        .get_one::<String>(commands::ARG_CORS_ORIGIN)
        .cloned()
        .context("missing required argument: --cors-origin")?;
    let led_topic = matches
        .get_one::<String>(commands::ARG_LED_TOPIC)
        .cloned()
        .context("missing required argument: --led-topic")?;
    let temperature_topic = matches
        .get_one::<String>(commands::ARG_TEMPERATURE_TOPIC)
        .cloned()
        .context("missing required argument: --temperature-topic")?;
    let request_timeout = matches
        .get_one::<u64>(commands::ARG_REQUEST_TIMEOUT)
        .copied()
        .map(Duration::from_secs)
        .context("missing required argument: --request-timeout")?;
    let lockout_opts = lockout::Options::parse(matches)?;

    Ok(Action::Server(server::Args {
        port,
        dsn,
        cors_origin,
        led_topic,
        temperature_topic,
        request_timeout,
        lockout_threshold: lockout_opts.threshold,
        lockout_cooldown: lockout_opts.cooldown,
    }))
}
