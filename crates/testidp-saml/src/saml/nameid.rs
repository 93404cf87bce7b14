//! `NameID` format keywords and their SAML URIs

use std::fmt;
use std::str::FromStr;

/// Supported `NameID` formats
pub const NAMEID_FORMAT_EMAIL: &str = "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress";
pub const NAMEID_FORMAT_PERSISTENT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent";
pub const NAMEID_FORMAT_TRANSIENT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:transient";
pub const NAMEID_FORMAT_UNSPECIFIED: &str =
    "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified";

/// `NameID` format as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NameIdFormat {
    #[default]
    Email,
    Persistent,
    Transient,
    Unspecified,
}

impl NameIdFormat {
    pub const ALL: [NameIdFormat; 4] = [
        NameIdFormat::Email,
        NameIdFormat::Persistent,
        NameIdFormat::Transient,
        NameIdFormat::Unspecified,
    ];

    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            NameIdFormat::Email => "email",
            NameIdFormat::Persistent => "persistent",
            NameIdFormat::Transient => "transient",
            NameIdFormat::Unspecified => "unspecified",
        }
    }

    #[must_use]
    pub fn uri(self) -> &'static str {
        match self {
            NameIdFormat::Email => NAMEID_FORMAT_EMAIL,
            NameIdFormat::Persistent => NAMEID_FORMAT_PERSISTENT,
            NameIdFormat::Transient => NAMEID_FORMAT_TRANSIENT,
            NameIdFormat::Unspecified => NAMEID_FORMAT_UNSPECIFIED,
        }
    }

    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.keyword() == keyword)
    }

    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.uri() == uri)
    }
}

impl fmt::Display for NameIdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for NameIdFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_keyword(s).ok_or_else(|| format!("unknown NameID format '{s}'"))
    }
}

/// Map a configuration keyword to its `NameID` format URI.
///
/// Unknown and empty keywords fall back to the email address format.
#[must_use]
pub fn resolve_name_id_format(keyword: &str) -> &'static str {
    NameIdFormat::from_keyword(keyword).unwrap_or_default().uri()
}

/// Map a `NameID` format URI back to its configuration keyword.
///
/// Only the four supported URIs round-trip; anything else yields `email`.
#[must_use]
pub fn format_to_keyword(uri: &str) -> &'static str {
    NameIdFormat::from_uri(uri).unwrap_or_default().keyword()
}
