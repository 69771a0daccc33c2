//! Application services and ports.

#![forbid(unsafe_code)]

mod directory_ports;
mod directory_service;
mod form_model;
mod form_ports;

pub use directory_ports::ServiceDeskDirectory;
pub use directory_service::DirectoryService;
pub use form_model::FormModel;
pub use form_ports::{
    AutocompleteLookup, AutocompleteQuery, FormReference, FormSource, RequestSubmitter,
};
