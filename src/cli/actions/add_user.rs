use crate::{
    gateway::{
        credentials::{valid_password, valid_username},
        digest_password,
    },
    store::{PgStore, StoreError, UserStore},
};
use anyhow::{Context, Result, bail};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
    pub username: String,
    pub password: SecretString,
}

/// Execute the add-user action.
/// # Errors
/// Returns an error if the credentials would never pass the gateway, the
/// database is unreachable or the user already exists.
pub async fn execute(args: Args) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;

    let store = PgStore::new(pool);
    store
        .ensure_schema()
        .await
        .context("Failed to apply database schema")?;

    register(&store, &args.username, &args.password).await
}

/// Validate and store a user the same way the gateway will later check it.
///
/// # Errors
/// Returns an error for names or passwords the gateway would reject, or if the store fails.
pub async fn register(
    users: &dyn UserStore,
    username: &str,
    password: &SecretString,
) -> Result<()> {
    if !valid_username(username) {
        bail!("username must be 3 to 16 letters, digits or hyphens");
    }
    if !valid_password(password.expose_secret()) {
        bail!("password must be 2 to 32 characters without spaces");
    }
    // The Basic pair is split on ':', a colon would make the password unusable.
    if password.expose_secret().contains(':') {
        bail!("password must not contain ':'");
    }

    match users
        .create_user(username, &digest_password(password.expose_secret()))
        .await
    {
        Ok(()) => {
            info!(user = username, "user created");
            Ok(())
        }
        Err(StoreError::Conflict(name)) => bail!("user {name} already exists"),
        Err(err) => Err(err).context("Failed to create user"),
    }
}
