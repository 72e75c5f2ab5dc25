pub mod lockout;
pub mod logging;
pub mod user;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_CORS_ORIGIN: &str = "cors-origin";
pub const ARG_LED_TOPIC: &str = "led-topic";
pub const ARG_TEMPERATURE_TOPIC: &str = "temperature-topic";
pub const ARG_REQUEST_TIMEOUT: &str = "request-timeout";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("sensorgate")
        .about("Sensor and actuator control behind an authentication gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("5000")
                .env("SENSORGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .env("SENSORGATE_DSN")
                .global(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long(ARG_CORS_ORIGIN)
                .help("Browser origin allowed to call the API")
                .env("SENSORGATE_CORS_ORIGIN")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_LED_TOPIC)
                .long(ARG_LED_TOPIC)
                .help("Topic LED commands are published on")
                .env("SENSORGATE_LED_TOPIC")
                .default_value("led"),
        )
        .arg(
            Arg::new(ARG_TEMPERATURE_TOPIC)
                .long(ARG_TEMPERATURE_TOPIC)
                .help("Topic temperature readings are received on")
                .env("SENSORGATE_TEMPERATURE_TOPIC")
                .default_value("temperature"),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT)
                .long(ARG_REQUEST_TIMEOUT)
                .help("Seconds a request may run before it is answered with 408")
                .env("SENSORGATE_REQUEST_TIMEOUT")
                .default_value("15")
                .value_parser(clap::value_parser!(u64).range(1..=300)),
        )
        .subcommand(user::add_user());

    let command = lockout::with_args(command);
    logging::with_args(command)
}
