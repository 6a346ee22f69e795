use std::path::Path;

use anyhow::Context;
use crudkit_db::SchemaMode;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::Deserialize;

use crate::pagination::{DEFAULT_PAGE_SIZE, DEFAULT_VISIBLE_PAGES};

/// Environment prefix; nested keys are separated by `__`, e.g.
/// `CRUDKIT__PAGINATION__DEFAULT_PAGE_SIZE=20`.
pub const ENV_PREFIX: &str = "CRUDKIT__";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    pub default_page_size: u64,
    pub visible_pages: u64,
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            visible_pages: DEFAULT_VISIBLE_PAGES,
            max_page_size: 500,
        }
    }
}

impl PaginationConfig {
    /// Effective page size for a request: the default when absent, clamped
    /// to `1..=max_page_size`.
    #[must_use]
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    /// `migrate` adds missing hidden columns at startup, `verify` only
    /// checks for them.
    pub mode: SchemaMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrudkitConfig {
    pub pagination: PaginationConfig,
    pub schema: SchemaConfig,
}

/// Loads configuration from an optional YAML file, then overlays
/// `CRUDKIT__*` environment variables.
///
/// # Errors
/// Returns an error if the file cannot be parsed or a value has the wrong
/// shape.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<CrudkitConfig> {
    let mut figment = Figment::new();
    if let Some(path) = path {
        figment = figment.merge(Yaml::file(path));
    }
    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("invalid crudkit configuration")
}
