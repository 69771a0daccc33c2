use std::sync::Arc;

use deskform_core::AppResult;
use deskform_domain::{RequestTypeSummary, ServiceDeskSummary};
use tracing::info;

use crate::directory_ports::ServiceDeskDirectory;

/// Finds the service desk and request type a form belongs to.
#[derive(Clone)]
pub struct DirectoryService {
    directory: Arc<dyn ServiceDeskDirectory>,
}

impl DirectoryService {
    /// Creates the service over a directory adapter.
    #[must_use]
    pub fn new(directory: Arc<dyn ServiceDeskDirectory>) -> Self {
        Self { directory }
    }

    /// Lists service desks ordered by project name.
    pub async fn service_desks(&self) -> AppResult<Vec<ServiceDeskSummary>> {
        let mut desks = self.directory.list_service_desks().await?;
        desks.sort_by(|left, right| left.project_name.cmp(&right.project_name));

        info!(desk_count = desks.len(), "service desks listed");
        Ok(desks)
    }

    /// Lists the request types of a service desk in portal order.
    pub async fn request_types(
        &self,
        service_desk_id: u64,
        group_id: Option<u64>,
    ) -> AppResult<Vec<RequestTypeSummary>> {
        let request_types = self
            .directory
            .list_request_types(service_desk_id, group_id)
            .await?;

        info!(
            service_desk_id,
            group_id = ?group_id,
            request_type_count = request_types.len(),
            "request types listed"
        );
        Ok(request_types)
    }
}
