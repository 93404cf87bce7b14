//! SAML SSO handlers for SP-initiated SSO
//!
//! Both bindings end in a redirect to the chooser page; the response is only
//! produced once an identity has been picked.

use crate::error::{SamlError, SamlResult};
use crate::handlers::metadata::SamlState;
use crate::models::{SsoPostForm, SsoRedirectQuery};
use crate::services::{Binding, InboundRequest};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form,
};

/// SP-initiated SSO via HTTP-Redirect binding
pub async fn sso_redirect(
    State(state): State<SamlState>,
    Query(query): Query<SsoRedirectQuery>,
) -> Response {
    match handle_sso(&state, Binding::Redirect, query.saml_request, query.relay_state) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "SSO redirect failed");
            e.into_response()
        }
    }
}

/// SP-initiated SSO via HTTP-POST binding
pub async fn sso_post(State(state): State<SamlState>, Form(form): Form<SsoPostForm>) -> Response {
    match handle_sso(&state, Binding::Post, form.saml_request, form.relay_state) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "SSO POST failed");
            e.into_response()
        }
    }
}

/// Validate the request, park it, and send the browser to the chooser
fn handle_sso(
    state: &SamlState,
    binding: Binding,
    saml_request: Option<String>,
    relay_state: Option<String>,
) -> SamlResult<Response> {
    let saml_request = saml_request
        .filter(|r| !r.is_empty())
        .ok_or(SamlError::MissingParameter("SAMLRequest"))?;

    let inbound = InboundRequest {
        binding,
        saml_request,
        relay_state: relay_state.filter(|rs| !rs.is_empty()),
    };
    let request = state.validator.validate(&inbound)?;
    let requester = state.validator.requester(&request).to_string();

    let flow = state.orchestrator.begin_flow(&requester, request)?;

    let location = format!("/login?request_id={}", urlencoding::encode(&flow.token));
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}
