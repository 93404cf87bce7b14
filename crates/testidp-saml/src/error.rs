//! SAML-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type for SAML operations
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML-specific errors
#[derive(Debug, Error)]
pub enum SamlError {
    /// No relying party is registered under the request's issuer
    #[error("Unknown Service Provider: {0}")]
    UnknownRequester(String),

    /// Pending request token is missing, already used or past its expiry
    #[error("Invalid or expired request")]
    InvalidOrExpiredToken,

    /// The chosen identity is not configured for the requesting SP
    #[error("Unknown user '{name}' for Service Provider {entity_id}")]
    UnknownIdentity { entity_id: String, name: String },

    /// Invalid or malformed `AuthnRequest`
    #[error("Invalid AuthnRequest: {0}")]
    InvalidAuthnRequest(String),

    /// ACS URL mismatch
    #[error("ACS URL mismatch: expected one of {expected:?}, got {actual}")]
    AcsUrlMismatch {
        expected: Vec<String>,
        actual: String,
    },

    /// A required query or form parameter is absent
    #[error("Missing {0}")]
    MissingParameter(&'static str),

    /// Relying-party configuration is inconsistent (startup only)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// SP metadata document could not be parsed
    #[error("Invalid SP metadata: {0}")]
    InvalidSpMetadata(String),

    /// Certificate parsing error
    #[error("Certificate parsing error: {0}")]
    CertificateParseError(String),

    /// Private key error
    #[error("Private key error: {0}")]
    PrivateKeyError(String),

    /// Assertion generation failed
    #[error("Assertion generation failed: {0}")]
    AssertionGenerationFailed(String),

    /// Metadata generation failed
    #[error("Metadata generation failed: {0}")]
    MetadataGenerationFailed(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saml_status: Option<String>,
}

const STATUS_REQUESTER: &str = "urn:oasis:names:tc:SAML:2.0:status:Requester";
const STATUS_RESPONDER: &str = "urn:oasis:names:tc:SAML:2.0:status:Responder";

impl SamlError {
    /// Whether the failure was caused by the caller rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            SamlError::UnknownRequester(_)
            | SamlError::InvalidOrExpiredToken
            | SamlError::UnknownIdentity { .. }
            | SamlError::InvalidAuthnRequest(_)
            | SamlError::AcsUrlMismatch { .. }
            | SamlError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            SamlError::Configuration(_)
            | SamlError::InvalidSpMetadata(_)
            | SamlError::CertificateParseError(_)
            | SamlError::PrivateKeyError(_)
            | SamlError::AssertionGenerationFailed(_)
            | SamlError::MetadataGenerationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SamlError::UnknownRequester(_) => "unknown_sp",
            SamlError::InvalidOrExpiredToken => "invalid_request_id",
            SamlError::UnknownIdentity { .. } => "unknown_user",
            SamlError::InvalidAuthnRequest(_) => "invalid_request",
            SamlError::AcsUrlMismatch { .. } => "acs_url_mismatch",
            SamlError::MissingParameter(_) => "missing_parameter",
            SamlError::Configuration(_) => "configuration_error",
            SamlError::InvalidSpMetadata(_) => "invalid_sp_metadata",
            SamlError::CertificateParseError(_) => "certificate_parse_error",
            SamlError::PrivateKeyError(_) => "private_key_error",
            SamlError::AssertionGenerationFailed(_) => "assertion_generation_failed",
            SamlError::MetadataGenerationFailed(_) => "metadata_generation_failed",
        }
    }

    fn saml_status(&self) -> Option<&'static str> {
        match self {
            SamlError::UnknownRequester(_)
            | SamlError::InvalidAuthnRequest(_)
            | SamlError::AcsUrlMismatch { .. } => Some(STATUS_REQUESTER),
            SamlError::AssertionGenerationFailed(_) => Some(STATUS_RESPONDER),
            _ => None,
        }
    }
}

impl IntoResponse for SamlError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            SamlError::Configuration(msg) | SamlError::InvalidSpMetadata(msg) => {
                tracing::error!("SAML configuration error: {}", msg);
                "A configuration error occurred".to_string()
            }
            SamlError::CertificateParseError(msg) | SamlError::PrivateKeyError(msg) => {
                tracing::error!("SAML signing credentials error: {}", msg);
                "A signing credentials error occurred".to_string()
            }
            SamlError::AssertionGenerationFailed(msg) => {
                tracing::error!("SAML assertion generation failed: {}", msg);
                "Failed to create assertion".to_string()
            }
            SamlError::MetadataGenerationFailed(msg) => {
                tracing::error!("SAML metadata generation failed: {}", msg);
                "Failed to generate metadata".to_string()
            }
            SamlError::AcsUrlMismatch { .. } => {
                "ACS URL does not match any registered URL".to_string()
            }
            SamlError::InvalidAuthnRequest(_) => "Invalid SAML request".to_string(),
            // Safe user-facing messages (contain only client-provided IDs/values)
            SamlError::UnknownRequester(_)
            | SamlError::InvalidOrExpiredToken
            | SamlError::UnknownIdentity { .. }
            | SamlError::MissingParameter(_) => self.to_string(),
        };

        let body = ErrorResponse {
            error: self.error_code().to_string(),
            message,
            saml_status: self.saml_status().map(String::from),
        };

        (status, Json(body)).into_response()
    }
}
