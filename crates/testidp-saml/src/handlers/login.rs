//! Identity chooser handlers

use crate::error::{SamlError, SamlResult};
use crate::handlers::metadata::SamlState;
use crate::models::{generate_auto_submit_form, render_login_page, LoginForm, LoginQuery};
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    Form,
};

fn request_id(query: LoginQuery) -> SamlResult<String> {
    query
        .request_id
        .filter(|id| !id.is_empty())
        .ok_or(SamlError::MissingParameter("request_id"))
}

/// Render the chooser page for a pending request
pub async fn show_login(
    State(state): State<SamlState>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let result = request_id(query).and_then(|request_id| {
        let pending = state.orchestrator.pending(&request_id)?;
        Ok(render_login_page(
            &request_id,
            &pending.descriptor.entity_id,
            &pending.descriptor.identities,
        ))
    });

    match result {
        Ok(html) => Html(html).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Complete the flow with the chosen identity and post the response to the SP
pub async fn submit_login(
    State(state): State<SamlState>,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginForm>,
) -> Response {
    match handle_submit(&state, query, form) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Login submission failed");
            e.into_response()
        }
    }
}

fn handle_submit(state: &SamlState, query: LoginQuery, form: LoginForm) -> SamlResult<Response> {
    let request_id = request_id(query)?;
    let user = form
        .user
        .filter(|u| !u.is_empty())
        .ok_or(SamlError::MissingParameter("user"))?;

    let completed = state.orchestrator.complete_flow(&request_id, &user)?;

    // The token is already consumed; a signing failure leaves it that way.
    let signed = state
        .signer
        .sign(&completed.descriptor, &completed.request, &completed.claims)
        .inspect_err(|e| {
            tracing::error!(
                sp_entity_id = %completed.descriptor.entity_id,
                error = %e,
                "Failed to sign SAML Response"
            );
        })?;

    let html = generate_auto_submit_form(
        &signed.acs_url,
        &signed.saml_response,
        signed.relay_state.as_deref(),
    );
    Ok(Html(html).into_response())
}
