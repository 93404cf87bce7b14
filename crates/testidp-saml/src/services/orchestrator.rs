//! SSO flow orchestration
//!
//! Ties the registry and the pending request store together:
//! `begin_flow` parks a validated request behind a token, `complete_flow`
//! redeems the token with the operator's identity choice.

use crate::error::{SamlError, SamlResult};
use crate::models::{IdentityDescriptor, IdentityRecord};
use crate::saml::attributes::ClaimSet;
use crate::services::registry::IdentityRegistry;
use crate::session::{PendingEntry, PendingRequestStore};
use std::sync::Arc;

/// Result of starting a flow
#[derive(Debug, Clone)]
pub struct BeginFlow {
    /// Single-use token identifying the pending request
    pub token: String,
    pub descriptor: Arc<IdentityDescriptor>,
}

impl BeginFlow {
    /// Identities the operator may choose from
    #[must_use]
    pub fn identities(&self) -> &[IdentityRecord] {
        &self.descriptor.identities
    }
}

/// Result of a completed flow, ready to be signed
pub struct CompletedFlow<H> {
    pub claims: ClaimSet,
    pub request: Arc<H>,
    pub descriptor: Arc<IdentityDescriptor>,
}

impl<H> std::fmt::Debug for CompletedFlow<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletedFlow")
            .field("claims", &self.claims)
            .field("sp_entity_id", &self.descriptor.entity_id)
            .finish_non_exhaustive()
    }
}

/// Two-step SSO flow over an opaque request handle `H`
pub struct SsoOrchestrator<H> {
    registry: Arc<IdentityRegistry>,
    store: Arc<dyn PendingRequestStore<H>>,
}

impl<H> Clone for SsoOrchestrator<H> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
        }
    }
}

impl<H> SsoOrchestrator<H> {
    pub fn new(registry: Arc<IdentityRegistry>, store: Arc<dyn PendingRequestStore<H>>) -> Self {
        Self { registry, store }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn PendingRequestStore<H>> {
        &self.store
    }

    /// Park `request` from `requester` and issue a token for the chooser.
    ///
    /// Nothing is stored when the requester is not registered.
    pub fn begin_flow(&self, requester: &str, request: H) -> SamlResult<BeginFlow> {
        let descriptor = self
            .registry
            .resolve(requester)
            .ok_or_else(|| SamlError::UnknownRequester(requester.to_string()))?;

        let token = self
            .store
            .create(Arc::clone(&descriptor), Arc::new(request));

        tracing::info!(
            sp_entity_id = %descriptor.entity_id,
            identities = descriptor.identities.len(),
            "SSO flow started"
        );

        Ok(BeginFlow { token, descriptor })
    }

    /// Pending request behind `token`, for rendering the chooser
    pub fn pending(&self, token: &str) -> SamlResult<PendingEntry<H>> {
        self.store
            .get(token)
            .ok_or(SamlError::InvalidOrExpiredToken)
    }

    /// Redeem `token` with the identity named `name`.
    ///
    /// An unknown name leaves the token usable. Once the claims are built the
    /// token is consumed, whatever happens to the response afterwards.
    pub fn complete_flow(&self, token: &str, name: &str) -> SamlResult<CompletedFlow<H>> {
        let entry = self.pending(token)?;

        let identity = self
            .registry
            .find_identity(&entry.descriptor, name)
            .ok_or_else(|| SamlError::UnknownIdentity {
                entity_id: entry.descriptor.entity_id.clone(),
                name: name.to_string(),
            })?;

        let claims = ClaimSet::for_identity(&entry.descriptor, identity);

        // A concurrent completion may have redeemed the token since `pending`.
        let entry = self
            .store
            .take(token)
            .ok_or(SamlError::InvalidOrExpiredToken)?;

        tracing::info!(
            sp_entity_id = %entry.descriptor.entity_id,
            user = %name,
            "SSO flow completed"
        );

        Ok(CompletedFlow {
            claims,
            request: entry.request,
            descriptor: entry.descriptor,
        })
    }
}
