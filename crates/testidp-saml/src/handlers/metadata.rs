//! SAML Metadata handler

use crate::error::SamlResult;
use crate::saml::SigningCredentials;
use crate::services::{
    AssertionSigner, MetadataGenerator, RequestValidator, SsoOrchestrator, ValidatedRequest,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Application state for SAML handlers
#[derive(Clone)]
pub struct SamlState {
    /// Public base URL, without trailing slash
    pub base_url: String,
    pub idp_entity_id: String,
    pub orchestrator: SsoOrchestrator<ValidatedRequest>,
    pub validator: Arc<dyn RequestValidator<Handle = ValidatedRequest>>,
    pub signer: Arc<dyn AssertionSigner<ValidatedRequest>>,
    pub credentials: SigningCredentials,
}

impl SamlState {
    #[must_use]
    pub fn sso_url(&self) -> String {
        format!("{}/sso", self.base_url)
    }
}

/// Return `IdP` metadata XML
pub async fn get_metadata(State(state): State<SamlState>) -> Response {
    match generate_metadata(&state) {
        Ok(xml) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/samlmetadata+xml")],
            xml,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

fn generate_metadata(state: &SamlState) -> SamlResult<String> {
    let generator = MetadataGenerator::new(
        state.idp_entity_id.clone(),
        state.sso_url(),
        state.credentials.clone(),
    );
    let xml = generator.generate()?;

    tracing::debug!(entity_id = %state.idp_entity_id, "SAML metadata requested");

    Ok(xml)
}
