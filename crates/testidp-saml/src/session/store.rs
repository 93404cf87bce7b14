//! Pending request storage
//!
//! Tokens are single use: an entry is handed out once by `take` and is gone
//! afterwards. Expiry is checked lazily on every read; `cleanup_expired`
//! reclaims memory for entries nobody came back for.

use super::types::{PendingEntry, DEFAULT_PENDING_TTL_SECONDS};
use crate::models::IdentityDescriptor;
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Number of random bytes in a pending request token
pub const TOKEN_BYTES: usize = 32;

/// Store for requests waiting on the identity chooser
pub trait PendingRequestStore<H>: Send + Sync {
    /// Register a request and return its fresh token
    fn create(&self, descriptor: Arc<IdentityDescriptor>, request: Arc<H>) -> String;

    /// Look up a live entry without removing it
    fn get(&self, token: &str) -> Option<PendingEntry<H>>;

    /// Remove an entry; unknown tokens are ignored
    fn consume(&self, token: &str);

    /// Remove and return a live entry in one step
    fn take(&self, token: &str) -> Option<PendingEntry<H>>;

    /// Drop every expired entry, returning how many were removed
    fn cleanup_expired(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generate an unguessable hex token from the OS random source
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// In-memory pending request store
pub struct InMemoryPendingStore<H> {
    entries: RwLock<HashMap<String, PendingEntry<H>>>,
    ttl: Duration,
}

impl<H> Default for InMemoryPendingStore<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> InMemoryPendingStore<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(DEFAULT_PENDING_TTL_SECONDS))
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Place an entry under a caller-chosen token, replacing any previous one
    pub fn insert(&self, token: impl Into<String>, entry: PendingEntry<H>) {
        self.entries.write().insert(token.into(), entry);
    }
}

impl<H: Send + Sync> PendingRequestStore<H> for InMemoryPendingStore<H> {
    fn create(&self, descriptor: Arc<IdentityDescriptor>, request: Arc<H>) -> String {
        let entry = PendingEntry::with_ttl(descriptor, request, self.ttl);
        let mut entries = self.entries.write();
        let mut token = generate_token();
        while entries.contains_key(&token) {
            token = generate_token();
        }
        tracing::debug!(
            sp_entity_id = %entry.descriptor.entity_id,
            expires_at = %entry.expires_at,
            "Pending SSO request created"
        );
        entries.insert(token.clone(), entry);
        token
    }

    fn get(&self, token: &str) -> Option<PendingEntry<H>> {
        let now = Utc::now();
        self.entries
            .read()
            .get(token)
            .filter(|entry| !entry.is_expired_at(now))
            .cloned()
    }

    fn consume(&self, token: &str) {
        self.entries.write().remove(token);
    }

    fn take(&self, token: &str) -> Option<PendingEntry<H>> {
        let now = Utc::now();
        let entry = self.entries.write().remove(token)?;
        if entry.is_expired_at(now) {
            return None;
        }
        Some(entry)
    }

    fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - entries.len();

        if removed > 0 {
            tracing::debug!(removed, "Cleaned up expired pending SSO requests");
        }

        removed
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Periodically sweep expired entries from `store`.
///
/// Must be called from within a tokio runtime. The task runs until aborted.
pub fn spawn_cleanup_task<H: 'static>(
    store: Arc<dyn PendingRequestStore<H>>,
    interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            store.cleanup_expired();
        }
    })
}
