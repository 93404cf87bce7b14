//! Read-only listing of the registered Service Providers

use crate::handlers::metadata::SamlState;
use crate::models::{ServiceProviderListResponse, ServiceProviderSummary};
use axum::{extract::State, Json};

/// List every registered SP with its test users
pub async fn list_service_providers(
    State(state): State<SamlState>,
) -> Json<ServiceProviderListResponse> {
    let items: Vec<ServiceProviderSummary> = state
        .orchestrator
        .registry()
        .all_descriptors()
        .iter()
        .map(|descriptor| ServiceProviderSummary {
            entity_id: descriptor.entity_id.clone(),
            acs_urls: descriptor.acs_urls(),
            name_id_format: descriptor.name_id_format.clone(),
            users: descriptor.identity_names().map(String::from).collect(),
        })
        .collect();

    Json(ServiceProviderListResponse {
        total: items.len(),
        items,
    })
}
