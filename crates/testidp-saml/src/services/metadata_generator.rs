//! IdP metadata generation

use crate::error::{SamlError, SamlResult};
use crate::saml::metadata::{HTTP_POST_BINDING, HTTP_REDIRECT_BINDING};
use crate::saml::nameid::NameIdFormat;
use crate::saml::SigningCredentials;
use crate::services::assertion_builder::xml_escape;

/// Builds the `EntityDescriptor` SPs import to trust this IdP
pub struct MetadataGenerator {
    entity_id: String,
    sso_url: String,
    credentials: SigningCredentials,
}

impl MetadataGenerator {
    pub fn new(entity_id: String, sso_url: String, credentials: SigningCredentials) -> Self {
        Self {
            entity_id,
            sso_url,
            credentials,
        }
    }

    /// Generate the metadata XML document
    pub fn generate(&self) -> SamlResult<String> {
        let certificate = self.credentials.certificate_base64_der().map_err(|e| {
            SamlError::MetadataGenerationFailed(format!("Cannot encode certificate: {e}"))
        })?;

        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<md:EntityDescriptor xmlns:md=\"urn:oasis:names:tc:SAML:2.0:metadata\" entityID=\"");
        xml.push_str(&xml_escape(&self.entity_id));
        xml.push_str("\">\n");
        xml.push_str("  <md:IDPSSODescriptor WantAuthnRequestsSigned=\"false\" protocolSupportEnumeration=\"urn:oasis:names:tc:SAML:2.0:protocol\">\n");
        xml.push_str("    <md:KeyDescriptor use=\"signing\">\n");
        xml.push_str("      <ds:KeyInfo xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">\n");
        xml.push_str("        <ds:X509Data>\n          <ds:X509Certificate>");
        xml.push_str(&certificate);
        xml.push_str("</ds:X509Certificate>\n        </ds:X509Data>\n");
        xml.push_str("      </ds:KeyInfo>\n    </md:KeyDescriptor>\n");
        for format in NameIdFormat::ALL {
            xml.push_str("    <md:NameIDFormat>");
            xml.push_str(format.uri());
            xml.push_str("</md:NameIDFormat>\n");
        }
        for binding in [HTTP_REDIRECT_BINDING, HTTP_POST_BINDING] {
            xml.push_str("    <md:SingleSignOnService Binding=\"");
            xml.push_str(binding);
            xml.push_str("\" Location=\"");
            xml.push_str(&xml_escape(&self.sso_url));
            xml.push_str("\"/>\n");
        }
        xml.push_str("  </md:IDPSSODescriptor>\n</md:EntityDescriptor>\n");

        Ok(xml)
    }
}
