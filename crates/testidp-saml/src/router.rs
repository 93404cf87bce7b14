//! SAML route definitions

use crate::handlers::metadata::SamlState;
use crate::handlers::{
    get_metadata, list_service_providers, show_login, sso_post, sso_redirect, submit_login,
};
use crate::saml::SigningCredentials;
use crate::services::{
    AssertionBuilder, IdentityRegistry, SamlRequestValidator, SsoOrchestrator, ValidatedRequest,
};
use crate::session::PendingRequestStore;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Create the IdP router (metadata, SSO, chooser and SP listing)
pub fn saml_router(state: SamlState) -> Router {
    Router::new()
        .route("/metadata", get(get_metadata))
        .route("/sso", get(sso_redirect).post(sso_post))
        .route("/login", get(show_login).post(submit_login))
        .route("/service-providers", get(list_service_providers))
        .with_state(state)
}

/// Create SAML state from configuration
#[must_use]
pub fn create_saml_state(
    base_url: String,
    idp_entity_id: String,
    registry: Arc<IdentityRegistry>,
    store: Arc<dyn PendingRequestStore<ValidatedRequest>>,
    credentials: SigningCredentials,
    assertion_validity: chrono::Duration,
) -> SamlState {
    let base_url = base_url.trim_end_matches('/').to_string();
    let validator = SamlRequestValidator::new(Arc::clone(&registry));
    let signer = AssertionBuilder::new(idp_entity_id.clone(), credentials.clone())
        .with_assertion_validity(assertion_validity);

    SamlState {
        base_url,
        idp_entity_id,
        orchestrator: SsoOrchestrator::new(registry, store),
        validator: Arc::new(validator),
        signer: Arc::new(signer),
        credentials,
    }
}
