//! In-process store used by tests and local runs without Postgres.

use super::{SensorStore, StoreError, StoredUserRecord, Temperature, UserStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, StoredUserRecord>>,
    /// Oldest first; readers reverse.
    temperatures: RwLock<Vec<Temperature>>,
    unavailable: AtomicBool,
    lookups: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading without the availability check, for seeding.
    pub async fn push_temperature(&self, value: f64) {
        self.temperatures.write().await.push(Temperature { value });
    }

    /// Make every call fail with [`StoreError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `find_user_by_name` calls served so far.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_name(&self, name: &str) -> Result<Option<StoredUserRecord>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.users.read().await.get(name).cloned())
    }

    async fn create_user(&self, name: &str, password_digest: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let mut users = self.users.write().await;
        if users.contains_key(name) {
            return Err(StoreError::Conflict(name.to_string()));
        }
        users.insert(
            name.to_string(),
            StoredUserRecord {
                username: name.to_string(),
                password_digest: password_digest.to_string(),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl SensorStore for MemoryStore {
    async fn latest_temperature(&self) -> Result<Option<Temperature>, StoreError> {
        self.check_available()?;
        Ok(self.temperatures.read().await.last().copied())
    }

    async fn recent_temperatures(&self, limit: i64) -> Result<Vec<Temperature>, StoreError> {
        self.check_available()?;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .temperatures
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .copied()
            .collect())
    }

    async fn record_temperature(&self, value: f64) -> Result<(), StoreError> {
        self.check_available()?;
        self.push_temperature(value).await;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
