//! Per-origin failure counter with a fixed expiry window.
//!
//! Flow Overview:
//! 1) The first failed verification from an origin opens an entry that expires
//!    `cooldown` after that failure.
//! 2) Later failures increment the count; the expiry never moves.
//! 3) An origin whose live count reached the threshold is blocked.
//! 4) Expired entries count as absent and are dropped on access or by
//!    [`LockoutTracker::purge_expired`].
//!
//! The window is anchored to the first failure and does not slide.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub const DEFAULT_LOCKOUT_THRESHOLD: u32 = 4;
pub const DEFAULT_LOCKOUT_COOLDOWN: Duration = Duration::from_secs(14 * 60);
/// Longest accepted cooldown; larger values are clamped to it.
pub const MAX_LOCKOUT_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockoutEntry {
    failures: u32,
    expires_at: Instant,
}

impl LockoutEntry {
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug)]
pub struct LockoutTracker {
    threshold: u32,
    cooldown: Duration,
    entries: Mutex<HashMap<String, LockoutEntry>>,
}

impl Default for LockoutTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LOCKOUT_THRESHOLD, DEFAULT_LOCKOUT_COOLDOWN)
    }
}

impl LockoutTracker {
    /// `cooldown` is clamped to [`MAX_LOCKOUT_COOLDOWN`].
    #[must_use]
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown: cooldown.min(MAX_LOCKOUT_COOLDOWN),
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// True iff a live entry for `origin` reached the threshold.
    #[must_use]
    pub fn is_blocked(&self, origin: &str) -> bool {
        self.is_blocked_at(origin, Instant::now())
    }

    /// Count one failed verification and return the new live count.
    pub fn record_failure(&self, origin: &str) -> u32 {
        self.record_failure_at(origin, Instant::now())
    }

    /// Live failure count for `origin`, 0 when untracked or expired.
    #[must_use]
    pub fn failure_count(&self, origin: &str) -> u32 {
        self.failure_count_at(origin, Instant::now())
    }

    /// Snapshot of the live entry for `origin`.
    #[must_use]
    pub fn entry(&self, origin: &str) -> Option<LockoutEntry> {
        let now = Instant::now();
        self.entries()
            .get(origin)
            .filter(|entry| entry.is_live(now))
            .copied()
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// Number of entries physically held, live or not.
    #[must_use]
    pub fn tracked_origins(&self) -> usize {
        self.entries().len()
    }

    pub(crate) fn is_blocked_at(&self, origin: &str, now: Instant) -> bool {
        self.failure_count_at(origin, now) >= self.threshold
    }

    pub(crate) fn failure_count_at(&self, origin: &str, now: Instant) -> u32 {
        let mut entries = self.entries();
        match entries.get(origin) {
            Some(entry) if entry.is_live(now) => entry.failures,
            Some(_) => {
                entries.remove(origin);
                0
            }
            None => 0,
        }
    }

    pub(crate) fn record_failure_at(&self, origin: &str, now: Instant) -> u32 {
        // Creation and increment happen under one lock, so racing first
        // failures land in a single entry and no increment is lost.
        let mut entries = self.entries();
        let fresh = LockoutEntry {
            failures: 0,
            expires_at: self.expiry_from(now),
        };
        let entry = entries.entry(origin.to_string()).or_insert(fresh);
        if !entry.is_live(now) {
            *entry = fresh;
        }
        entry.failures = entry.failures.saturating_add(1);
        entry.failures
    }

    pub(crate) fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    fn expiry_from(&self, now: Instant) -> Instant {
        // Shrink the window rather than hand out an entry that is already
        // expired when the deadline is not representable.
        [self.cooldown, DEFAULT_LOCKOUT_COOLDOWN, Duration::from_secs(1)]
            .into_iter()
            .find_map(|window| now.checked_add(window))
            .unwrap_or(now)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, LockoutEntry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
