//! Relying-party descriptors and the test identities configured for them

use crate::saml::metadata::SpMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single configured attribute value.
///
/// Scalars keep their YAML type so that booleans and numbers can be rendered
/// the same way they were written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeScalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Null,
}

impl fmt::Display for AttributeScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeScalar::Bool(b) => write!(f, "{b}"),
            AttributeScalar::Integer(i) => write!(f, "{i}"),
            AttributeScalar::Float(x) => write!(f, "{x}"),
            AttributeScalar::String(s) => f.write_str(s),
            AttributeScalar::Null => Ok(()),
        }
    }
}

impl From<&str> for AttributeScalar {
    fn from(value: &str) -> Self {
        AttributeScalar::String(value.to_string())
    }
}

impl From<bool> for AttributeScalar {
    fn from(value: bool) -> Self {
        AttributeScalar::Bool(value)
    }
}

impl From<i64> for AttributeScalar {
    fn from(value: i64) -> Self {
        AttributeScalar::Integer(value)
    }
}

impl From<f64> for AttributeScalar {
    fn from(value: f64) -> Self {
        AttributeScalar::Float(value)
    }
}

/// Attribute value as configured: one scalar or an ordered list of scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    List(Vec<AttributeScalar>),
    Scalar(AttributeScalar),
}

impl From<AttributeScalar> for AttributeValue {
    fn from(value: AttributeScalar) -> Self {
        AttributeValue::Scalar(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Scalar(value.into())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Scalar(AttributeScalar::String(value))
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Scalar(value.into())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Scalar(value.into())
    }
}

impl AttributeValue {
    /// Build a list value from anything convertible to scalars.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<AttributeScalar>,
    {
        AttributeValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// A test identity that the operator can pick on the chooser page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Display name, unique within the owning descriptor
    pub name: String,
    /// Subject identifier emitted as the assertion's `NameID`
    pub name_id: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl IdentityRecord {
    pub fn new(name: impl Into<String>, name_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_id: name_id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute, replacing any previous value under the same name.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Where responses for a relying party are delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum SpEndpoint {
    /// A single ACS URL taken straight from configuration
    AcsUrl(String),
    /// SP metadata document loaded from disk
    Metadata(SpMetadata),
}

/// Registered relying party with its test identities.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityDescriptor {
    pub entity_id: String,
    pub endpoint: SpEndpoint,
    /// NameID format keyword (`email`, `persistent`, `transient`, `unspecified`)
    pub name_id_format: String,
    pub identities: Vec<IdentityRecord>,
}

impl IdentityDescriptor {
    /// ACS locations a request may ask the response to be delivered to.
    #[must_use]
    pub fn acs_urls(&self) -> Vec<String> {
        match &self.endpoint {
            SpEndpoint::AcsUrl(url) => vec![url.clone()],
            SpEndpoint::Metadata(metadata) => metadata
                .post_endpoints()
                .map(|acs| acs.location.clone())
                .collect(),
        }
    }

    /// ACS location used when the request does not name one.
    #[must_use]
    pub fn default_acs_url(&self) -> Option<&str> {
        match &self.endpoint {
            SpEndpoint::AcsUrl(url) => Some(url.as_str()),
            SpEndpoint::Metadata(metadata) => {
                metadata.default_endpoint().map(|acs| acs.location.as_str())
            }
        }
    }

    /// Display names in configuration order.
    pub fn identity_names(&self) -> impl Iterator<Item = &str> {
        self.identities.iter().map(|i| i.name.as_str())
    }
}
