//! SAML attribute mapping utilities

use crate::models::{AttributeValue, IdentityDescriptor, IdentityRecord};
use crate::saml::nameid::resolve_name_id_format;

/// `NameFormat` used for every emitted attribute
pub const ATTRNAME_FORMAT_BASIC: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:basic";

/// A resolved SAML attribute ready for assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimAttribute {
    pub name: String,
    pub values: Vec<String>,
}

/// Identity claims for one SAML Response.
///
/// Built fresh for every response and handed to the signer unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    pub name_id: String,
    pub name_id_format: String,
    pub attributes: Vec<ClaimAttribute>,
}

impl ClaimSet {
    /// Build the claims for `record` as configured on `descriptor`.
    #[must_use]
    pub fn for_identity(descriptor: &IdentityDescriptor, record: &IdentityRecord) -> Self {
        Self {
            name_id: record.name_id.clone(),
            name_id_format: resolve_name_id_format(&descriptor.name_id_format).to_string(),
            attributes: build_claim_attributes(record),
        }
    }

    /// Look up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&ClaimAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Convert a record's configured attributes into claim attributes.
///
/// A record without attributes yields an empty list.
#[must_use]
pub fn build_claim_attributes(record: &IdentityRecord) -> Vec<ClaimAttribute> {
    record
        .attributes
        .iter()
        .map(|(name, value)| ClaimAttribute {
            name: name.clone(),
            values: attribute_values(value),
        })
        .collect()
}

/// Convert one configured value into its ordered claim values.
///
/// Lists produce one value per element; anything else produces exactly one.
#[must_use]
pub fn attribute_values(value: &AttributeValue) -> Vec<String> {
    match value {
        AttributeValue::List(items) if !items.is_empty() => {
            items.iter().map(ToString::to_string).collect()
        }
        AttributeValue::List(_) => vec![String::new()],
        AttributeValue::Scalar(scalar) => vec![scalar.to_string()],
    }
}
