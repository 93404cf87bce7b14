//! SSO flow tests
//!
//! These tests verify:
//! - Token issuance, lookup and consumption
//! - Identity selection and claim mapping
//! - Routing through the axum router

pub mod common;
pub mod flow_tests;
pub mod http_tests;
pub mod store_tests;
