use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub const ARG_LOCKOUT_THRESHOLD: &str = "lockout-threshold";
pub const ARG_LOCKOUT_COOLDOWN: &str = "lockout-cooldown";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOCKOUT_THRESHOLD)
                .long(ARG_LOCKOUT_THRESHOLD)
                .help("Failed verifications from one origin before it is blocked")
                .env("SENSORGATE_LOCKOUT_THRESHOLD")
                .default_value("4")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOCKOUT_COOLDOWN)
                .long(ARG_LOCKOUT_COOLDOWN)
                .help("Seconds an origin stays blocked, counted from its first failure (max 86400)")
                .env("SENSORGATE_LOCKOUT_COOLDOWN")
                .default_value("840")
                .value_parser(clap::value_parser!(u64).range(1..=86_400)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub threshold: u32,
    pub cooldown: Duration,
}

impl Options {
    /// # Errors
    /// Returns an error if either lockout argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let threshold = matches
            .get_one::<u32>(ARG_LOCKOUT_THRESHOLD)
            .copied()
            .context("missing required argument: --lockout-threshold")?;
        let cooldown = matches
            .get_one::<u64>(ARG_LOCKOUT_COOLDOWN)
            .copied()
            .map(Duration::from_secs)
            .context("missing required argument: --lockout-cooldown")?;

        Ok(Self {
            threshold,
            cooldown,
        })
    }
}
