//! SAML 2.0 test Identity Provider
//!
//! This crate provides the pieces of a SAML `IdP` meant for exercising
//! Service Providers during development:
//! - SP-initiated SSO over the HTTP-Redirect and HTTP-POST bindings
//! - An identity chooser listing statically configured test users
//! - Signed assertions with configurable `NameID` formats and attributes
//! - `IdP` metadata publishing and SP metadata parsing
//!
//! Pending requests live in memory only and are redeemable exactly once.

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod saml;
pub mod services;
pub mod session;

pub use error::{SamlError, SamlResult};
pub use handlers::metadata::SamlState;
pub use models::{AttributeScalar, AttributeValue, IdentityDescriptor, IdentityRecord, SpEndpoint};
pub use router::{create_saml_state, saml_router};
pub use saml::{parse_sp_metadata, ClaimAttribute, ClaimSet, SigningCredentials, SpMetadata};
pub use services::{
    AssertionBuilder, AssertionSigner, IdentityRegistry, RelyingPartyConfig, SignedResponse,
    SsoOrchestrator, ValidatedRequest,
};
pub use session::{
    spawn_cleanup_task, InMemoryPendingStore, PendingEntry, PendingRequestStore,
    DEFAULT_PENDING_TTL_SECONDS,
};
