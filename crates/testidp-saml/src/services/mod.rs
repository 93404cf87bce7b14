//! Business logic services for SAML operations

pub mod assertion_builder;
pub mod metadata_generator;
pub mod orchestrator;
pub mod registry;
pub mod request_parser;

pub use assertion_builder::{AssertionBuilder, AssertionSigner, SignedResponse};
pub use metadata_generator::MetadataGenerator;
pub use orchestrator::{BeginFlow, CompletedFlow, SsoOrchestrator};
pub use registry::{IdentityRegistry, RelyingPartyConfig};
pub use request_parser::{
    Binding, InboundRequest, RequestParser, RequestValidator, SamlRequestValidator,
    ValidatedRequest,
};
