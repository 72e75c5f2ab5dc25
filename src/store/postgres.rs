//! Postgres-backed store.

use super::{SensorStore, StoreError, StoredUserRecord, Temperature, UserStore};
use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row, postgres::PgRow};
use tracing::{Instrument, info_span};

const SCHEMA_SQL: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/db/sql/01_sensorgate.sql"
));

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema. Statements are `IF NOT EXISTS`, so this is safe on every start.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be applied.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "DDL");
        sqlx::Executor::execute(&self.pool, SCHEMA_SQL)
            .instrument(span)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_name(&self, name: &str) -> Result<Option<StoredUserRecord>, StoreError> {
        let query = "SELECT name, password FROM users WHERE name = $1 LIMIT 1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let row = sqlx::query(query)
            .bind(name)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        row.as_ref().map(user_from_row).transpose().map_err(Into::into)
    }

    async fn create_user(&self, name: &str, password_digest: &str) -> Result<(), StoreError> {
        let query = "INSERT INTO users (name, password) VALUES ($1, $2)";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        );
        sqlx::query(query)
            .bind(name)
            .bind(password_digest)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::Conflict(name.to_string())
                } else {
                    StoreError::Database(err)
                }
            })?;
        Ok(())
    }
}

#[async_trait]
impl SensorStore for PgStore {
    async fn latest_temperature(&self) -> Result<Option<Temperature>, StoreError> {
        let query = "SELECT value FROM temperatures ORDER BY id DESC LIMIT 1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let row = sqlx::query(query)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        row.as_ref()
            .map(temperature_from_row)
            .transpose()
            .map_err(Into::into)
    }

    async fn recent_temperatures(&self, limit: i64) -> Result<Vec<Temperature>, StoreError> {
        let query = "SELECT value FROM temperatures ORDER BY id DESC LIMIT $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let rows = sqlx::query(query)
            .bind(limit)
            .fetch_all(&self.pool)
            .instrument(span)
            .await?;

        rows.iter()
            .map(temperature_from_row)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    async fn record_temperature(&self, value: f64) -> Result<(), StoreError> {
        let query = "INSERT INTO temperatures (value) VALUES ($1)";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        );
        sqlx::query(query)
            .bind(value)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> Result<StoredUserRecord, sqlx::Error> {
    Ok(StoredUserRecord {
        username: row.try_get("name")?,
        password_digest: row.try_get("password")?,
    })
}

fn temperature_from_row(row: &PgRow) -> Result<Temperature, sqlx::Error> {
    Ok(Temperature {
        value: row.try_get("value")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        for statement in SCHEMA_SQL.split(';').map(str::trim) {
            if statement.is_empty() {
                continue;
            }
            let ddl = statement
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join(" ");
            if ddl.trim().is_empty() {
                continue;
            }
            assert!(
                ddl.contains("IF NOT EXISTS"),
                "statement is not idempotent: {ddl}"
            );
        }
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn decode_failures_are_database_errors() {
        let err = StoreError::from(sqlx::Error::ColumnNotFound("password".to_string()));
        assert!(matches!(
            err,
            StoreError::Database(sqlx::Error::ColumnNotFound(ref column)) if column == "password"
        ));
    }
}
