//! SAML Assertion and Response builder with proper XML canonicalization

use crate::error::{SamlError, SamlResult};
use crate::models::IdentityDescriptor;
use crate::saml::attributes::{ClaimAttribute, ClaimSet, ATTRNAME_FORMAT_BASIC};
use crate::saml::SigningCredentials;
use crate::services::request_parser::ValidatedRequest;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use xml_canonicalization::Canonicalizer;

/// Default assertion lifetime (5 minutes)
pub const DEFAULT_ASSERTION_VALIDITY_SECONDS: i64 = 300;

/// Allowance for SP clocks running behind ours
const NOT_BEFORE_SKEW_MINUTES: i64 = 2;

const AUTHN_CONTEXT_CLASS: &str =
    "urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport";

/// A signed response ready to be posted to the SP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedResponse {
    pub acs_url: String,
    /// Base64-encoded `samlp:Response`
    pub saml_response: String,
    pub relay_state: Option<String>,
}

/// Produces the signed response for a completed flow
pub trait AssertionSigner<H>: Send + Sync {
    fn sign(
        &self,
        descriptor: &IdentityDescriptor,
        request: &H,
        claims: &ClaimSet,
    ) -> SamlResult<SignedResponse>;
}

/// Builder for SAML assertions and responses
pub struct AssertionBuilder {
    idp_entity_id: String,
    credentials: SigningCredentials,
    assertion_validity: Duration,
}

/// Values shared by the response and the assertion it wraps
struct ResponseContext<'a> {
    response_id: String,
    assertion_id: String,
    session_index: String,
    sp_entity_id: &'a str,
    acs_url: &'a str,
    in_response_to: &'a str,
    issue_instant: DateTime<Utc>,
    not_before: DateTime<Utc>,
    not_on_or_after: DateTime<Utc>,
}

impl AssertionBuilder {
    /// Create a new assertion builder
    pub fn new(idp_entity_id: String, credentials: SigningCredentials) -> Self {
        Self {
            idp_entity_id,
            credentials,
            assertion_validity: Duration::seconds(DEFAULT_ASSERTION_VALIDITY_SECONDS),
        }
    }

    #[must_use]
    pub fn with_assertion_validity(mut self, validity: Duration) -> Self {
        self.assertion_validity = validity;
        self
    }

    /// Build the signed `samlp:Response` XML answering `request`
    pub fn build_response(
        &self,
        descriptor: &IdentityDescriptor,
        request: &ValidatedRequest,
        claims: &ClaimSet,
    ) -> SamlResult<(String, String)> {
        let acs_url = request
            .assertion_consumer_service_url
            .as_deref()
            .or_else(|| descriptor.default_acs_url())
            .ok_or_else(|| {
                SamlError::AssertionGenerationFailed(format!(
                    "No ACS URL for Service Provider {}",
                    descriptor.entity_id
                ))
            })?;

        let now = Utc::now();
        let ctx = ResponseContext {
            response_id: format!("_resp_{}", Uuid::new_v4()),
            assertion_id: format!("_assert_{}", Uuid::new_v4()),
            session_index: format!("_session_{}", Uuid::new_v4()),
            sp_entity_id: &descriptor.entity_id,
            acs_url,
            in_response_to: &request.request_id,
            issue_instant: now,
            not_before: now - Duration::minutes(NOT_BEFORE_SKEW_MINUTES),
            not_on_or_after: now + self.assertion_validity,
        };

        let assertion = self.build_assertion_xml(&ctx, claims);
        let signed_assertion = self.sign_assertion(&assertion, &ctx.assertion_id)?;
        let response = self.wrap_in_response(&ctx, &signed_assertion);

        Ok((acs_url.to_string(), response))
    }

    fn build_assertion_xml(&self, ctx: &ResponseContext<'_>, claims: &ClaimSet) -> String {
        let issue_instant = format_instant(ctx.issue_instant);
        let not_before = format_instant(ctx.not_before);
        let not_on_or_after = format_instant(ctx.not_on_or_after);

        let mut xml = String::new();
        // xs/xsi are declared here once; AttributeValue elements only carry xsi:type.
        xml.push_str("<saml:Assertion xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" xmlns:xs=\"http://www.w3.org/2001/XMLSchema\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" ID=\"");
        xml.push_str(&xml_escape(&ctx.assertion_id));
        xml.push_str("\" Version=\"2.0\" IssueInstant=\"");
        xml.push_str(&issue_instant);
        xml.push_str("\"><saml:Issuer>");
        xml.push_str(&xml_escape(&self.idp_entity_id));
        xml.push_str("</saml:Issuer><saml:Subject><saml:NameID Format=\"");
        xml.push_str(&xml_escape(&claims.name_id_format));
        xml.push_str("\">");
        xml.push_str(&xml_escape(&claims.name_id));
        xml.push_str("</saml:NameID><saml:SubjectConfirmation Method=\"urn:oasis:names:tc:SAML:2.0:cm:bearer\"><saml:SubjectConfirmationData InResponseTo=\"");
        xml.push_str(&xml_escape(ctx.in_response_to));
        xml.push_str("\" NotOnOrAfter=\"");
        xml.push_str(&not_on_or_after);
        xml.push_str("\" Recipient=\"");
        xml.push_str(&xml_escape(ctx.acs_url));
        xml.push_str("\"/></saml:SubjectConfirmation></saml:Subject><saml:Conditions NotBefore=\"");
        xml.push_str(&not_before);
        xml.push_str("\" NotOnOrAfter=\"");
        xml.push_str(&not_on_or_after);
        xml.push_str("\"><saml:AudienceRestriction><saml:Audience>");
        xml.push_str(&xml_escape(ctx.sp_entity_id));
        xml.push_str("</saml:Audience></saml:AudienceRestriction></saml:Conditions><saml:AuthnStatement AuthnInstant=\"");
        xml.push_str(&issue_instant);
        xml.push_str("\" SessionIndex=\"");
        xml.push_str(&xml_escape(&ctx.session_index));
        xml.push_str("\"><saml:AuthnContext><saml:AuthnContextClassRef>");
        xml.push_str(AUTHN_CONTEXT_CLASS);
        xml.push_str("</saml:AuthnContextClassRef></saml:AuthnContext></saml:AuthnStatement>");
        xml.push_str(&build_attributes_xml(&claims.attributes));
        xml.push_str("</saml:Assertion>");
        xml
    }

    fn wrap_in_response(&self, ctx: &ResponseContext<'_>, signed_assertion: &str) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<samlp:Response xmlns:samlp=\"urn:oasis:names:tc:SAML:2.0:protocol\" xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" ID=\"");
        xml.push_str(&xml_escape(&ctx.response_id));
        xml.push_str("\" Version=\"2.0\" IssueInstant=\"");
        xml.push_str(&format_instant(ctx.issue_instant));
        xml.push_str("\" Destination=\"");
        xml.push_str(&xml_escape(ctx.acs_url));
        xml.push_str("\" InResponseTo=\"");
        xml.push_str(&xml_escape(ctx.in_response_to));
        xml.push_str("\"><saml:Issuer>");
        xml.push_str(&xml_escape(&self.idp_entity_id));
        xml.push_str("</saml:Issuer><samlp:Status><samlp:StatusCode Value=\"urn:oasis:names:tc:SAML:2.0:status:Success\"/></samlp:Status>");
        xml.push_str(signed_assertion);
        xml.push_str("</samlp:Response>");
        xml
    }

    /// Insert an enveloped signature right after the assertion's `Issuer`.
    ///
    /// No text is added around the signature, so removing it restores the
    /// exact bytes that were digested.
    fn sign_assertion(&self, assertion_xml: &str, assertion_id: &str) -> SamlResult<String> {
        let after_issuer = assertion_xml
            .find("</saml:Issuer>")
            .map(|pos| pos + "</saml:Issuer>".len())
            .ok_or_else(|| {
                SamlError::AssertionGenerationFailed("Cannot find Issuer".to_string())
            })?;

        let canonicalized_assertion = canonicalize_xml(assertion_xml)?;
        let digest = openssl::hash::hash(
            openssl::hash::MessageDigest::sha256(),
            canonicalized_assertion.as_bytes(),
        )
        .map_err(|e| SamlError::AssertionGenerationFailed(format!("Digest failed: {e}")))?;
        let digest_b64 = STANDARD.encode(digest);

        let mut signed_info = String::new();
        signed_info.push_str("<ds:SignedInfo xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">");
        signed_info.push_str(
            "<ds:CanonicalizationMethod Algorithm=\"http://www.w3.org/2001/10/xml-exc-c14n#\"/>",
        );
        signed_info.push_str(
            "<ds:SignatureMethod Algorithm=\"http://www.w3.org/2001/04/xmldsig-more#rsa-sha256\"/>",
        );
        signed_info.push_str("<ds:Reference URI=\"#");
        signed_info.push_str(&xml_escape(assertion_id));
        signed_info.push_str("\"><ds:Transforms>");
        signed_info.push_str(
            "<ds:Transform Algorithm=\"http://www.w3.org/2000/09/xmldsig#enveloped-signature\"/>",
        );
        signed_info
            .push_str("<ds:Transform Algorithm=\"http://www.w3.org/2001/10/xml-exc-c14n#\"/>");
        signed_info.push_str("</ds:Transforms>");
        signed_info
            .push_str("<ds:DigestMethod Algorithm=\"http://www.w3.org/2001/04/xmlenc#sha256\"/>");
        signed_info.push_str("<ds:DigestValue>");
        signed_info.push_str(&digest_b64);
        signed_info.push_str("</ds:DigestValue></ds:Reference></ds:SignedInfo>");

        let canonicalized_signed_info = canonicalize_xml(&signed_info)?;
        let signature = self
            .credentials
            .sign_sha256(canonicalized_signed_info.as_bytes())?;
        let certificate_base64 = self.credentials.certificate_base64_der()?;

        let mut signature_xml = String::new();
        signature_xml.push_str("<ds:Signature xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">");
        signature_xml.push_str(&signed_info);
        signature_xml.push_str("<ds:SignatureValue>");
        signature_xml.push_str(&STANDARD.encode(&signature));
        signature_xml.push_str("</ds:SignatureValue><ds:KeyInfo><ds:X509Data><ds:X509Certificate>");
        signature_xml.push_str(&certificate_base64);
        signature_xml.push_str("</ds:X509Certificate></ds:X509Data></ds:KeyInfo></ds:Signature>");

        let mut result = String::with_capacity(assertion_xml.len() + signature_xml.len());
        result.push_str(&assertion_xml[..after_issuer]);
        result.push_str(&signature_xml);
        result.push_str(&assertion_xml[after_issuer..]);
        Ok(result)
    }
}

impl AssertionSigner<ValidatedRequest> for AssertionBuilder {
    fn sign(
        &self,
        descriptor: &IdentityDescriptor,
        request: &ValidatedRequest,
        claims: &ClaimSet,
    ) -> SamlResult<SignedResponse> {
        let (acs_url, response_xml) = self.build_response(descriptor, request, claims)?;

        tracing::info!(
            sp_entity_id = %descriptor.entity_id,
            request_id = %request.request_id,
            acs_url = %acs_url,
            "SAML Response generated"
        );

        Ok(SignedResponse {
            acs_url,
            saml_response: STANDARD.encode(response_xml.as_bytes()),
            relay_state: request.relay_state.clone(),
        })
    }
}

fn build_attributes_xml(attributes: &[ClaimAttribute]) -> String {
    if attributes.is_empty() {
        return String::new();
    }

    let mut attrs = String::from("<saml:AttributeStatement>");
    for attr in attributes {
        let name = xml_escape(&attr.name);
        attrs.push_str("<saml:Attribute Name=\"");
        attrs.push_str(&name);
        attrs.push_str("\" FriendlyName=\"");
        attrs.push_str(&name);
        attrs.push_str("\" NameFormat=\"");
        attrs.push_str(ATTRNAME_FORMAT_BASIC);
        attrs.push_str("\">");
        for value in &attr.values {
            attrs.push_str("<saml:AttributeValue xsi:type=\"xs:string\">");
            attrs.push_str(&xml_escape(value));
            attrs.push_str("</saml:AttributeValue>");
        }
        attrs.push_str("</saml:Attribute>");
    }
    attrs.push_str("</saml:AttributeStatement>");
    attrs
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Apply Exclusive XML Canonicalization (C14N) to XML content.
pub(crate) fn canonicalize_xml(xml: &str) -> SamlResult<String> {
    let mut output = Vec::new();
    Canonicalizer::read_from_str(xml)
        .write_to_writer(&mut output)
        .canonicalize(false) // false = exclude comments
        .map_err(|e| {
            SamlError::AssertionGenerationFailed(format!("XML canonicalization failed: {e}"))
        })?;

    String::from_utf8(output).map_err(|e| {
        SamlError::AssertionGenerationFailed(format!("Canonicalized XML is not valid UTF-8: {e}"))
    })
}

/// XML escape special characters
pub(crate) fn xml_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}
