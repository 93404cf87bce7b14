//! Request and response types for the SAML HTTP endpoints

use crate::models::IdentityRecord;
use serde::{Deserialize, Serialize};

/// SSO redirect query parameters
#[derive(Debug, Deserialize)]
pub struct SsoRedirectQuery {
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

/// SSO POST form data
#[derive(Debug, Deserialize)]
pub struct SsoPostForm {
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

/// Query parameters of the chooser page
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub request_id: Option<String>,
}

/// Chooser page form submission
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub user: Option<String>,
}

/// Service Provider list response
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceProviderListResponse {
    pub items: Vec<ServiceProviderSummary>,
    pub total: usize,
}

/// One registered Service Provider
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceProviderSummary {
    pub entity_id: String,
    pub acs_urls: Vec<String>,
    pub name_id_format: String,
    pub users: Vec<String>,
}

/// Generate the HTML auto-submit form that POSTs the SAML Response to the SP
pub fn generate_auto_submit_form(
    acs_url: &str,
    saml_response: &str,
    relay_state: Option<&str>,
) -> String {
    let relay_input = relay_state
        .map(|rs| {
            format!(
                r#"<input type="hidden" name="RelayState" value="{}"/>"#,
                html_escape(rs)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>SAML SSO</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="POST" action="{}">
        <input type="hidden" name="SAMLResponse" value="{}"/>
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
        html_escape(acs_url),
        html_escape(saml_response),
        relay_input
    )
}

/// Render the chooser page listing the test users of the requesting SP
pub fn render_login_page(request_id: &str, sp_entity_id: &str, users: &[IdentityRecord]) -> String {
    let options: String = users
        .iter()
        .map(|user| {
            format!(
                r#"            <option value="{name}">{name} ({name_id})</option>
"#,
                name = html_escape(&user.name),
                name_id = html_escape(&user.name_id),
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>SAML Test IdP - Sign in</title>
</head>
<body>
    <h1>Sign in to {sp}</h1>
    <form method="POST" action="/login?request_id={request_id}">
        <label for="user">Test user</label>
        <select id="user" name="user">
{options}        </select>
        <input type="submit" value="Sign in"/>
    </form>
</body>
</html>"#,
        sp = html_escape(sp_entity_id),
        request_id = urlencoding::encode(request_id),
        options = options,
    )
}

/// HTML escape for XSS prevention
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
