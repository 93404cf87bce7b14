//! Configuration-level identity types and HTTP request/response types

pub mod identity;
pub mod responses;

pub use identity::*;
pub use responses::*;
