use clap::{Arg, Command};

pub const CMD_ADD_USER: &str = "add-user";
pub const ARG_USERNAME: &str = "username";
pub const ARG_PASSWORD: &str = "password";

#[must_use]
pub fn add_user() -> Command {
    Command::new(CMD_ADD_USER)
        .about("Create a user allowed through the gateway")
        .arg(
            Arg::new(ARG_USERNAME)
                .short('u')
                .long(ARG_USERNAME)
                .help("3 to 16 letters, digits or hyphens")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("2 to 32 characters without spaces")
                .env("SENSORGATE_USER_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
}
