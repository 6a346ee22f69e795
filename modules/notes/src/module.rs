use std::sync::Arc;

use anyhow::Context;
use arc_swap::ArcSwapOption;
use crudkit::{AccessDenied, CrudService, PaginatedList, PaginationView, ValidationSink};
use crudkit_db::{DbSession, RowFilterPolicy, SeaOrmEngine};
use crudkit_security::SecurityContext;
use sea_orm::DatabaseConnection;
use sea_orm_migration::{MigrationTrait, MigratorTrait};
use tracing::info;

use crate::config::NotesConfig;
use crate::domain::dto::{NoteDto, NoteSummary};
use crate::domain::hooks::notes_hooks;
use crate::infra::storage::entity::Model as Note;
use crate::infra::storage::migrations::Migrator;

/// Notes service bound to one caller.
pub type NoteService = CrudService<Note, NoteDto, DbSession<Note>>;

/// View name the pager links point at.
pub const LIST_VIEW: &str = "notes";

struct NotesState {
    engine: Arc<SeaOrmEngine<Note>>,
    policy: Arc<RowFilterPolicy>,
    config: NotesConfig,
}

pub struct NotesModule {
    state: ArcSwapOption<NotesState>,
}

impl Default for NotesModule {
    fn default() -> Self {
        Self {
            state: ArcSwapOption::from(None),
        }
    }
}

impl NotesModule {
    #[must_use]
    pub fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        info!("Providing notes database migrations");
        Migrator::migrations()
    }

    /// Runs migrations, then registers notes with the row filter policy
    /// (adding the hidden columns in `migrate` mode).
    ///
    /// # Errors
    /// Fails if migrations fail or the table cannot carry the hidden columns.
    pub async fn init(&self, db: DatabaseConnection, config: NotesConfig) -> anyhow::Result<()> {
        info!("Initializing notes module");

        Migrator::up(&db, None)
            .await
            .context("failed to run notes migrations")?;

        let engine = Arc::new(SeaOrmEngine::<Note>::new(db));
        let mut builder = RowFilterPolicy::builder().mode(config.schema.mode);
        builder
            .register::<Note>(engine.as_ref())
            .await
            .context("failed to register notes with the row filter policy")?;

        self.state.store(Some(Arc::new(NotesState {
            engine,
            policy: Arc::new(builder.build()),
            config,
        })));

        info!("Notes module initialized");
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.load().is_some()
    }

    /// Service for one request. Errors land in `validation`.
    ///
    /// # Errors
    /// Fails if [`init`](Self::init) has not completed.
    pub fn service(&self, ctx: SecurityContext, validation: ValidationSink) -> anyhow::Result<NoteService> {
        let state = self
            .state
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("notes module not initialized"))?;
        let session = DbSession::new(state.engine.clone(), state.policy.clone(), ctx);
        let hooks = notes_hooks(state.config.max_title_length, state.config.max_body_length);
        Ok(CrudService::new(session, validation, hooks))
    }

    /// One page of note summaries plus its pager view model. Missing paging
    /// arguments fall back to the configured defaults.
    ///
    /// # Errors
    /// [`AccessDenied`] if the caller may not list notes.
    pub async fn summary_page(
        &self,
        service: &NoteService,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<(PaginatedList<NoteSummary>, PaginationView), AccessDenied> {
        let pagination = self
            .state
            .load()
            .as_ref()
            .map(|state| state.config.pagination.clone())
            .unwrap_or_default();
        let size = pagination.page_size(page_size);
        let list = service
            .list_page(page.unwrap_or(1), size)
            .await?
            .map(NoteSummary::from);
        let view = list.view(LIST_VIEW, pagination.visible_pages);
        Ok((list, view))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn module_starts_uninitialized() {
        let module = NotesModule::default();
        assert!(!module.is_initialized());
        assert!(module
            .service(SecurityContext::anonymous(), ValidationSink::new())
            .is_err());
    }

    #[test]
    fn provides_migrations() {
        assert_eq!(NotesModule::migrations().len(), 1);
    }
}
