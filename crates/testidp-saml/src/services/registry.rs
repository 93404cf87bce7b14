//! Relying-party registry

use crate::error::{SamlError, SamlResult};
use crate::models::{IdentityDescriptor, IdentityRecord, SpEndpoint};
use crate::saml::metadata::SpMetadata;
use crate::saml::nameid::NameIdFormat;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Relying party as supplied by configuration, before validation
#[derive(Debug, Clone, Default)]
pub struct RelyingPartyConfig {
    pub entity_id: String,
    /// Direct ACS URL; ignored when `metadata` is present
    pub acs_url: Option<String>,
    pub metadata: Option<SpMetadata>,
    /// NameID format keyword; `email` when unset
    pub name_id_format: Option<String>,
    pub identities: Vec<IdentityRecord>,
}

/// Immutable lookup of relying parties by entity ID.
///
/// Built once at startup and shared behind an `Arc` without locking.
#[derive(Debug)]
pub struct IdentityRegistry {
    descriptors: Vec<Arc<IdentityDescriptor>>,
    by_entity_id: HashMap<String, Arc<IdentityDescriptor>>,
}

impl IdentityRegistry {
    /// Validate `configs` and build the registry.
    ///
    /// Fails on an empty or duplicate entity ID, a relying party with neither
    /// an ACS URL nor metadata, or duplicate identity names within one relying
    /// party.
    pub fn new(configs: Vec<RelyingPartyConfig>) -> SamlResult<Self> {
        let mut descriptors = Vec::with_capacity(configs.len());
        let mut by_entity_id = HashMap::with_capacity(configs.len());

        for (index, config) in configs.into_iter().enumerate() {
            let descriptor = Arc::new(Self::build_descriptor(index, config)?);
            if by_entity_id.contains_key(&descriptor.entity_id) {
                return Err(SamlError::Configuration(format!(
                    "service_providers[{index}]: duplicate entity_id '{}'",
                    descriptor.entity_id
                )));
            }
            by_entity_id.insert(descriptor.entity_id.clone(), Arc::clone(&descriptor));
            descriptors.push(descriptor);
        }

        tracing::info!(
            service_providers = descriptors.len(),
            "Identity registry initialized"
        );

        Ok(Self {
            descriptors,
            by_entity_id,
        })
    }

    fn build_descriptor(index: usize, config: RelyingPartyConfig) -> SamlResult<IdentityDescriptor> {
        let entity_id = config.entity_id.trim().to_string();
        if entity_id.is_empty() {
            return Err(SamlError::Configuration(format!(
                "service_providers[{index}]: entity_id is required"
            )));
        }

        let endpoint = match (config.metadata, config.acs_url) {
            (Some(metadata), _) => SpEndpoint::Metadata(metadata),
            (None, Some(acs_url)) if !acs_url.trim().is_empty() => SpEndpoint::AcsUrl(acs_url),
            _ => {
                return Err(SamlError::Configuration(format!(
                    "service_providers[{index}] ({entity_id}): either acs_url or metadata is required"
                )));
            }
        };

        let name_id_format = config
            .name_id_format
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| NameIdFormat::default().keyword().to_string());
        if NameIdFormat::from_keyword(&name_id_format).is_none() {
            tracing::warn!(
                sp_entity_id = %entity_id,
                name_id_format = %name_id_format,
                "Unknown name_id_format, falling back to email"
            );
        }

        let mut seen = HashSet::new();
        for identity in &config.identities {
            if !seen.insert(identity.name.as_str()) {
                return Err(SamlError::Configuration(format!(
                    "service_providers[{index}] ({entity_id}): duplicate user name '{}'",
                    identity.name
                )));
            }
        }

        Ok(IdentityDescriptor {
            entity_id,
            endpoint,
            name_id_format,
            identities: config.identities,
        })
    }

    /// Look up a relying party by entity ID
    #[must_use]
    pub fn resolve(&self, entity_id: &str) -> Option<Arc<IdentityDescriptor>> {
        self.by_entity_id.get(entity_id).cloned()
    }

    /// All relying parties in configuration order
    #[must_use]
    pub fn all_descriptors(&self) -> &[Arc<IdentityDescriptor>] {
        &self.descriptors
    }

    /// Find the identity named `name` among the descriptor's identities
    #[must_use]
    pub fn find_identity<'a>(
        &self,
        descriptor: &'a IdentityDescriptor,
        name: &str,
    ) -> Option<&'a IdentityRecord> {
        descriptor.identities.iter().find(|i| i.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
