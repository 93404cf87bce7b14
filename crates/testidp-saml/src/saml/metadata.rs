//! Service Provider metadata parsing

use crate::error::{SamlError, SamlResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub const HTTP_POST_BINDING: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST";
pub const HTTP_REDIRECT_BINDING: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect";

/// One `AssertionConsumerService` element of an SP descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcsEndpoint {
    pub binding: String,
    pub location: String,
    pub index: u32,
    pub is_default: bool,
}

/// Parsed SP `EntityDescriptor`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpMetadata {
    pub entity_id: String,
    pub assertion_consumer_services: Vec<AcsEndpoint>,
}

impl SpMetadata {
    /// Endpoints usable for the HTTP-POST response binding.
    ///
    /// Falls back to every endpoint when none declares HTTP-POST.
    pub fn post_endpoints(&self) -> impl Iterator<Item = &AcsEndpoint> {
        let has_post = self
            .assertion_consumer_services
            .iter()
            .any(|acs| acs.binding == HTTP_POST_BINDING);
        self.assertion_consumer_services
            .iter()
            .filter(move |acs| !has_post || acs.binding == HTTP_POST_BINDING)
    }

    /// The endpoint flagged `isDefault`, otherwise the one with the lowest index.
    #[must_use]
    pub fn default_endpoint(&self) -> Option<&AcsEndpoint> {
        self.post_endpoints()
            .find(|acs| acs.is_default)
            .or_else(|| self.post_endpoints().min_by_key(|acs| acs.index))
    }
}

/// Parse an SP metadata document.
///
/// Only the first `EntityDescriptor`'s entity ID and its
/// `AssertionConsumerService` endpoints are extracted.
pub fn parse_sp_metadata(xml: &str) -> SamlResult<SpMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entity_id = None;
    let mut services = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                let local_name = e.local_name();
                match local_name.as_ref() {
                    b"EntityDescriptor" if entity_id.is_none() => {
                        entity_id = attribute(&e, "entityID")?;
                    }
                    b"AssertionConsumerService" => {
                        services.push(parse_acs(&e, services.len())?);
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SamlError::InvalidSpMetadata(format!("XML parse error: {e}")));
            }
            _ => {}
        }
    }

    let entity_id = entity_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SamlError::InvalidSpMetadata("Missing entityID".to_string()))?;

    if services.is_empty() {
        return Err(SamlError::InvalidSpMetadata(format!(
            "No AssertionConsumerService endpoint for {entity_id}"
        )));
    }

    Ok(SpMetadata {
        entity_id,
        assertion_consumer_services: services,
    })
}

fn parse_acs(e: &BytesStart<'_>, position: usize) -> SamlResult<AcsEndpoint> {
    let location = attribute(e, "Location")?.ok_or_else(|| {
        SamlError::InvalidSpMetadata("AssertionConsumerService without Location".to_string())
    })?;
    let binding = attribute(e, "Binding")?.unwrap_or_else(|| HTTP_POST_BINDING.to_string());
    let index = match attribute(e, "index")? {
        Some(raw) => raw.parse().map_err(|_| {
            SamlError::InvalidSpMetadata(format!("Invalid AssertionConsumerService index '{raw}'"))
        })?,
        None => u32::try_from(position).unwrap_or(u32::MAX),
    };
    let is_default = attribute(e, "isDefault")?.is_some_and(|v| v == "true" || v == "1");

    Ok(AcsEndpoint {
        binding,
        location,
        index,
        is_default,
    })
}

fn attribute(e: &BytesStart<'_>, name: &str) -> SamlResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr
            .map_err(|err| SamlError::InvalidSpMetadata(format!("Invalid attribute: {err}")))?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|err| SamlError::InvalidSpMetadata(format!("Invalid attribute: {err}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
