//! Pending request types for the two-step SSO flow
//!
//! A pending entry bridges the request that started a flow and the identity
//! choice that completes it.

use crate::models::IdentityDescriptor;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;

/// Default TTL for pending requests (10 minutes)
pub const DEFAULT_PENDING_TTL_SECONDS: i64 = 600;

/// A pending SSO request awaiting the operator's identity choice
pub struct PendingEntry<H> {
    /// Relying party the request came from
    pub descriptor: Arc<IdentityDescriptor>,
    pub created_at: DateTime<Utc>,
    /// Entry is retrievable only while `now < expires_at`
    pub expires_at: DateTime<Utc>,
    /// Opaque handle of the validated inbound request
    pub request: Arc<H>,
}

impl<H> Clone for PendingEntry<H> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            created_at: self.created_at,
            expires_at: self.expires_at,
            request: Arc::clone(&self.request),
        }
    }
}

impl<H> fmt::Debug for PendingEntry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingEntry")
            .field("sp_entity_id", &self.descriptor.entity_id)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl<H> PendingEntry<H> {
    /// Create a new entry with the default TTL
    pub fn new(descriptor: Arc<IdentityDescriptor>, request: Arc<H>) -> Self {
        Self::with_ttl(descriptor, request, Duration::seconds(DEFAULT_PENDING_TTL_SECONDS))
    }

    /// Create a new entry expiring `ttl` from now
    ///
    /// A TTL past the representable range saturates at the latest instant.
    pub fn with_ttl(descriptor: Arc<IdentityDescriptor>, request: Arc<H>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            descriptor,
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            request,
        }
    }

    /// Whether the entry is expired at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
