use crudkit::{PaginationConfig, SchemaConfig};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotesConfig {
    pub max_title_length: usize,
    pub max_body_length: usize,
    pub pagination: PaginationConfig,
    pub schema: SchemaConfig,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            max_title_length: 200,
            max_body_length: 10_000,
            pagination: PaginationConfig::default(),
            schema: SchemaConfig::default(),
        }
    }
}
