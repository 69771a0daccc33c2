use async_trait::async_trait;
use deskform_core::AppResult;
use deskform_domain::{RequestTypeSummary, ServiceDeskSummary};

/// Port for discovering service desks and their request types.
#[async_trait]
pub trait ServiceDeskDirectory: Send + Sync {
    /// Lists every service desk visible to the account.
    async fn list_service_desks(&self) -> AppResult<Vec<ServiceDeskSummary>>;

    /// Lists the request types of one service desk, optionally limited to
    /// one portal group.
    async fn list_request_types(
        &self,
        service_desk_id: u64,
        group_id: Option<u64>,
    ) -> AppResult<Vec<RequestTypeSummary>>;
}
