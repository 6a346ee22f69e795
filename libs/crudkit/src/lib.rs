#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Generic CRUD services.
//!
//! A [`CrudService`] runs the create/read/update/delete pipeline for one
//! entity type on top of a row-filtered [`StorageProvider`](crudkit_db::StorageProvider).
//! Per-entity behavior is plugged in through [`ServiceHooks`]; validation
//! problems are collected in a shared [`ValidationSink`] that the request
//! layer keeps in sync through [`ApiValidation`].

pub mod config;
pub mod error;
pub mod hooks;
pub mod host;
pub mod pagination;
pub mod service;
pub mod validation;

pub use config::{CrudkitConfig, PaginationConfig, SchemaConfig, load_config};
pub use error::{AccessDenied, MappingError};
pub use hooks::{Operation, ServiceHooks};
pub use host::{ApiValidation, ValidationHost, format_key, local_redirect};
pub use pagination::{PageWindow, PaginatedList, PaginationView};
pub use service::CrudService;
pub use validation::{ValidationErrors, ValidationSink};

#[cfg(test)]
mod test_support;
