//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_service_desk_client;
mod in_memory_service_desk;

pub use http_service_desk_client::{HttpServiceDeskClient, ServiceDeskCredentials};
pub use in_memory_service_desk::InMemoryServiceDesk;
