//! Pending request state for the two-step SSO flow

pub mod store;
pub mod types;

pub use store::{
    generate_token, spawn_cleanup_task, InMemoryPendingStore, PendingRequestStore, TOKEN_BYTES,
};
pub use types::{PendingEntry, DEFAULT_PENDING_TTL_SECONDS};
