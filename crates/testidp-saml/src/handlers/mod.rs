//! HTTP handlers for SAML endpoints

pub mod login;
pub mod metadata;
pub mod service_providers;
pub mod sso;

pub use login::{show_login, submit_login};
pub use metadata::get_metadata;
pub use service_providers::list_service_providers;
pub use sso::{sso_post, sso_redirect};
