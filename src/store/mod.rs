//! Storage seams for user records and sensor readings.
//!
//! The gateway only needs [`UserStore::find_user_by_name`]; handlers read
//! temperatures through [`SensorStore`] and the bus ingest task writes them. [`PgStore`] backs both with Postgres,
//! [`MemoryStore`] keeps everything in process.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

/// Number of readings returned by `/cmd/temps`.
pub const RECENT_TEMPERATURES: i64 = 60;

/// Persisted credential record. `password_digest` is the hex SHA-512 of the password.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredUserRecord {
    pub username: String,
    pub password_digest: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Temperature {
    pub value: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by exact name. `Ok(None)` means no such user.
    async fn find_user_by_name(&self, name: &str) -> Result<Option<StoredUserRecord>, StoreError>;

    /// Insert a user; the caller supplies the digest, the store never sees plaintext.
    async fn create_user(&self, name: &str, password_digest: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SensorStore: Send + Sync {
    async fn latest_temperature(&self) -> Result<Option<Temperature>, StoreError>;

    /// Newest first, at most `limit` readings.
    async fn recent_temperatures(&self, limit: i64) -> Result<Vec<Temperature>, StoreError>;

    /// Append one reading; it becomes the latest.
    async fn record_temperature(&self, value: f64) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
