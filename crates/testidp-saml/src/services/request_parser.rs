//! SAML `AuthnRequest` decoding and validation

use crate::error::{SamlError, SamlResult};
use crate::services::registry::IdentityRegistry;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use flate2::read::DeflateDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::sync::Arc;

/// Maximum allowed clock skew for `IssueInstant` validation (5 minutes)
const MAX_CLOCK_SKEW_SECS: i64 = 300;

/// Maximum age for an `AuthnRequest` (5 minutes)
const MAX_REQUEST_AGE_SECS: i64 = 300;

/// Maximum decompressed size for the HTTP-Redirect binding (64 KB)
const MAX_DECOMPRESSED_SIZE: u64 = 64 * 1024;

/// Maximum encoded size for `SAMLRequest` in HTTP-Redirect binding (128 KB)
const MAX_ENCODED_SIZE_REDIRECT: usize = 128 * 1024;

/// Maximum encoded size for `SAMLRequest` in HTTP-POST binding (512 KB)
const MAX_ENCODED_SIZE_POST: usize = 512 * 1024;

const MAX_REQUEST_ID_LENGTH: usize = 256;

const MAX_ISSUER_LENGTH: usize = 1024;

/// Maximum `RelayState` length accepted from SPs
pub const MAX_RELAY_STATE_LENGTH: usize = 1024;

/// SAML binding the request arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Query string, deflated then base64 encoded
    Redirect,
    /// Form field, base64 encoded
    Post,
}

/// Raw SSO request as received over HTTP
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub binding: Binding,
    pub saml_request: String,
    pub relay_state: Option<String>,
}

/// Parsed SAML `AuthnRequest`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAuthnRequest {
    pub id: String,
    pub issuer: String,
    pub assertion_consumer_service_url: Option<String>,
    pub name_id_policy_format: Option<String>,
    pub issue_instant: DateTime<Utc>,
}

/// `AuthnRequest` accepted by the validator, carried through the flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub request_id: String,
    pub issuer: String,
    pub assertion_consumer_service_url: Option<String>,
    pub name_id_policy_format: Option<String>,
    pub issue_instant: DateTime<Utc>,
    pub relay_state: Option<String>,
}

impl ValidatedRequest {
    fn from_parsed(parsed: ParsedAuthnRequest, relay_state: Option<String>) -> Self {
        Self {
            request_id: parsed.id,
            issuer: parsed.issuer,
            assertion_consumer_service_url: parsed.assertion_consumer_service_url,
            name_id_policy_format: parsed.name_id_policy_format,
            issue_instant: parsed.issue_instant,
            relay_state,
        }
    }
}

/// Turns inbound HTTP requests into request handles for the orchestrator
pub trait RequestValidator: Send + Sync {
    type Handle;

    /// Decode and check `request`, returning the handle and its issuer
    fn validate(&self, request: &InboundRequest) -> SamlResult<Self::Handle>;

    /// Entity ID of the relying party that sent the request
    fn requester<'a>(&self, handle: &'a Self::Handle) -> &'a str;
}

/// Validator for unsigned SAML 2.0 `AuthnRequest`s
pub struct SamlRequestValidator {
    registry: Arc<IdentityRegistry>,
}

impl SamlRequestValidator {
    pub fn new(registry: Arc<IdentityRegistry>) -> Self {
        Self { registry }
    }

    fn check_acs_url(&self, request: &ParsedAuthnRequest) -> SamlResult<()> {
        let Some(acs_url) = request.assertion_consumer_service_url.as_deref() else {
            return Ok(());
        };
        // Unknown issuers are reported by the orchestrator.
        let Some(descriptor) = self.registry.resolve(&request.issuer) else {
            return Ok(());
        };

        let allowed = descriptor.acs_urls();
        if !acs_url_matches(acs_url, &allowed)? {
            return Err(SamlError::AcsUrlMismatch {
                expected: allowed,
                actual: acs_url.to_string(),
            });
        }
        Ok(())
    }
}

impl RequestValidator for SamlRequestValidator {
    type Handle = ValidatedRequest;

    fn validate(&self, request: &InboundRequest) -> SamlResult<ValidatedRequest> {
        if let Some(rs) = &request.relay_state {
            if rs.len() > MAX_RELAY_STATE_LENGTH {
                return Err(SamlError::InvalidAuthnRequest(format!(
                    "RelayState exceeds maximum length ({MAX_RELAY_STATE_LENGTH} bytes)"
                )));
            }
        }

        let parsed = match request.binding {
            Binding::Redirect => RequestParser::parse_redirect(&request.saml_request)?,
            Binding::Post => RequestParser::parse_post(&request.saml_request)?,
        };

        tracing::info!(
            sp_entity_id = %parsed.issuer,
            request_id = %parsed.id,
            binding = ?request.binding,
            "SAML AuthnRequest received"
        );

        self.check_acs_url(&parsed)?;

        Ok(ValidatedRequest::from_parsed(
            parsed,
            request.relay_state.clone(),
        ))
    }

    fn requester<'a>(&self, handle: &'a ValidatedRequest) -> &'a str {
        &handle.issuer
    }
}

/// Normalize a URL for comparison (lowercase scheme/host, strip trailing slash)
fn normalize_url(url_str: &str) -> SamlResult<String> {
    let parsed = url::Url::parse(url_str)
        .map_err(|e| SamlError::InvalidAuthnRequest(format!("Invalid ACS URL format: {e}")))?;

    let mut normalized = format!(
        "{}://{}",
        parsed.scheme().to_lowercase(),
        parsed.host_str().unwrap_or("").to_lowercase()
    );

    if let Some(port) = parsed.port() {
        normalized.push(':');
        normalized.push_str(&port.to_string());
    }

    normalized.push_str(parsed.path().trim_end_matches('/'));

    if let Some(query) = parsed.query() {
        normalized.push('?');
        normalized.push_str(query);
    }

    Ok(normalized)
}

/// Check if an ACS URL matches any of the configured URLs (after normalization)
fn acs_url_matches(acs_url: &str, configured_urls: &[String]) -> SamlResult<bool> {
    let normalized_acs = normalize_url(acs_url)?;
    Ok(configured_urls
        .iter()
        .filter_map(|configured| normalize_url(configured).ok())
        .any(|configured| configured == normalized_acs))
}

/// Decoder for SAML `AuthnRequest` messages
pub struct RequestParser;

impl RequestParser {
    /// Parse an `AuthnRequest` from HTTP-Redirect binding (raw deflate + base64)
    pub fn parse_redirect(encoded_request: &str) -> SamlResult<ParsedAuthnRequest> {
        if encoded_request.len() > MAX_ENCODED_SIZE_REDIRECT {
            return Err(SamlError::InvalidAuthnRequest(format!(
                "Encoded SAMLRequest exceeds maximum size ({} > {} bytes)",
                encoded_request.len(),
                MAX_ENCODED_SIZE_REDIRECT
            )));
        }
        let decoded = STANDARD
            .decode(encoded_request)
            .map_err(|e| SamlError::InvalidAuthnRequest(format!("Base64 decode failed: {e}")))?;

        let mut xml = String::new();
        DeflateDecoder::new(&decoded[..])
            .take(MAX_DECOMPRESSED_SIZE)
            .read_to_string(&mut xml)
            .map_err(|e| SamlError::InvalidAuthnRequest(format!("Deflate decode failed: {e}")))?;

        if xml.len() as u64 >= MAX_DECOMPRESSED_SIZE {
            return Err(SamlError::InvalidAuthnRequest(
                "Decompressed AuthnRequest exceeds maximum size limit (64 KB)".to_string(),
            ));
        }

        Self::parse_xml(&xml)
    }

    /// Parse an `AuthnRequest` from HTTP-POST binding (base64 only)
    pub fn parse_post(encoded_request: &str) -> SamlResult<ParsedAuthnRequest> {
        if encoded_request.len() > MAX_ENCODED_SIZE_POST {
            return Err(SamlError::InvalidAuthnRequest(format!(
                "Encoded SAMLRequest exceeds maximum size ({} > {} bytes)",
                encoded_request.len(),
                MAX_ENCODED_SIZE_POST
            )));
        }
        // Form posts may wrap the base64 text.
        let compact: String = encoded_request
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let decoded = STANDARD
            .decode(compact)
            .map_err(|e| SamlError::InvalidAuthnRequest(format!("Base64 decode failed: {e}")))?;

        let xml = String::from_utf8(decoded)
            .map_err(|e| SamlError::InvalidAuthnRequest(format!("Invalid UTF-8: {e}")))?;

        Self::parse_xml(&xml)
    }

    /// Parse decoded `AuthnRequest` XML
    pub fn parse_xml(xml: &str) -> SamlResult<ParsedAuthnRequest> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut seen_root = false;
        let mut id = None;
        let mut issuer = None;
        let mut acs_url = None;
        let mut name_id_format = None;
        let mut in_issuer = false;
        let mut issue_instant_raw = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e) | Event::Empty(e)) => {
                    let local_name = e.local_name();
                    match local_name.as_ref() {
                        b"AuthnRequest" => {
                            seen_root = true;
                            for attr in e.attributes().flatten() {
                                let value = attr.unescape_value().unwrap_or_default().into_owned();
                                match attr.key.as_ref() {
                                    b"ID" => id = Some(value),
                                    b"IssueInstant" => issue_instant_raw = Some(value),
                                    b"AssertionConsumerServiceURL" => acs_url = Some(value),
                                    _ => {}
                                }
                            }
                        }
                        // Only the request's own Issuer, not one nested in an extension
                        b"Issuer" if issuer.is_none() => in_issuer = true,
                        b"NameIDPolicy" => {
                            name_id_format = e
                                .attributes()
                                .flatten()
                                .find(|attr| attr.key.as_ref() == b"Format")
                                .map(|attr| attr.unescape_value().unwrap_or_default().into_owned());
                        }
                        _ => {}
                    }
                }
                Ok(Event::Text(e)) if in_issuer => {
                    issuer = Some(e.unescape().unwrap_or_default().trim().to_string());
                }
                Ok(Event::End(e)) if e.local_name().as_ref() == b"Issuer" => {
                    in_issuer = false;
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(SamlError::InvalidAuthnRequest(format!(
                        "XML parse error: {e}"
                    )));
                }
                _ => {}
            }
        }

        if !seen_root {
            return Err(SamlError::InvalidAuthnRequest(
                "Not an AuthnRequest".to_string(),
            ));
        }

        let id =
            id.ok_or_else(|| SamlError::InvalidAuthnRequest("Missing ID attribute".to_string()))?;
        if id.len() > MAX_REQUEST_ID_LENGTH {
            return Err(SamlError::InvalidAuthnRequest(format!(
                "ID attribute exceeds maximum length of {MAX_REQUEST_ID_LENGTH} characters"
            )));
        }

        let issuer = issuer
            .filter(|i| !i.is_empty())
            .ok_or_else(|| SamlError::InvalidAuthnRequest("Missing Issuer element".to_string()))?;
        if issuer.len() > MAX_ISSUER_LENGTH {
            return Err(SamlError::InvalidAuthnRequest(format!(
                "Issuer exceeds maximum length of {MAX_ISSUER_LENGTH} characters"
            )));
        }

        let issue_instant_str = issue_instant_raw.ok_or_else(|| {
            SamlError::InvalidAuthnRequest("Missing IssueInstant attribute".to_string())
        })?;
        let issue_instant = DateTime::parse_from_rfc3339(&issue_instant_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                SamlError::InvalidAuthnRequest(format!("Invalid IssueInstant format: {e}"))
            })?;
        check_issue_instant(issue_instant, Utc::now())?;

        Ok(ParsedAuthnRequest {
            id,
            issuer,
            assertion_consumer_service_url: acs_url,
            name_id_policy_format: name_id_format,
            issue_instant,
        })
    }
}

fn check_issue_instant(issue_instant: DateTime<Utc>, now: DateTime<Utc>) -> SamlResult<()> {
    let age_secs = (now - issue_instant).num_seconds();

    if age_secs < -MAX_CLOCK_SKEW_SECS {
        return Err(SamlError::InvalidAuthnRequest(format!(
            "IssueInstant is in the future (skew: {}s exceeds {}s tolerance)",
            -age_secs, MAX_CLOCK_SKEW_SECS
        )));
    }

    if age_secs > MAX_REQUEST_AGE_SECS {
        return Err(SamlError::InvalidAuthnRequest(format!(
            "IssueInstant is too old (age: {age_secs}s exceeds {MAX_REQUEST_AGE_SECS}s maximum)"
        )));
    }

    Ok(())
}
