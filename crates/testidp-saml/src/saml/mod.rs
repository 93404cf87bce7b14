//! SAML-specific utilities

pub mod attributes;
pub mod metadata;
pub mod nameid;
pub mod signing;

pub use attributes::{
    attribute_values, build_claim_attributes, ClaimAttribute, ClaimSet, ATTRNAME_FORMAT_BASIC,
};
pub use metadata::{parse_sp_metadata, AcsEndpoint, SpMetadata};
pub use nameid::{
    format_to_keyword, resolve_name_id_format, NameIdFormat, NAMEID_FORMAT_EMAIL,
    NAMEID_FORMAT_PERSISTENT, NAMEID_FORMAT_TRANSIENT, NAMEID_FORMAT_UNSPECIFIED,
};
pub use signing::SigningCredentials;
