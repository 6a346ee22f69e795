use thiserror::Error;

/// Problems detected while registering or binding entity types.
///
/// These surface at startup (or when a service binds its collection), never
/// on the query path.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("entity type `{entity}` is not registered with the row filter policy")]
    Unregistered { entity: &'static str },

    #[error("entity type `{entity}` needs hidden column `{column}`, which storage does not provide")]
    MissingHiddenColumn {
        entity: &'static str,
        column: &'static str,
    },

    #[error("schema provisioning failed for `{entity}`: {message}")]
    Provisioning { entity: &'static str, message: String },
}

impl ConfigError {
    pub fn provisioning(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Provisioning {
            entity,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("no visible `{entity}` row with id {id}")]
    RowNotFound { entity: &'static str, id: String },

    #[error("cannot insert tenant-scoped `{entity}` without a caller tenant")]
    MissingTenant { entity: &'static str },

    #[error("key space exhausted for `{entity}`")]
    KeyExhausted { entity: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("storage engine error: {0}")]
    Engine(String),

    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

impl StorageError {
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }

    pub(crate) fn row_not_found(entity: &'static str, id: &impl std::fmt::Debug) -> Self {
        Self::RowNotFound {
            entity,
            id: format!("{id:?}"),
        }
    }
}
