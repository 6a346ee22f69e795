#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use async_trait::async_trait;
use crudkit_db::{
    Capabilities, Capability, ChangeTracker, CommitOptions, ConfigError, DbSession, Entity,
    EntitySet, InMemoryEngine, Query, RowFilterPolicy, StorageError, StorageProvider,
};
use crudkit_security::SecurityContext;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{AccessDenied, MappingError};
use crate::hooks::ServiceHooks;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub body: String,
}

impl Article {
    pub fn new(id: i64, title: &str, body: &str) -> Self {
        Self {
            id,
            title: title.to_owned(),
            body: body.to_owned(),
        }
    }
}

impl Entity for Article {
    type Key = i64;
    const NAME: &'static str = "article";
    const CAPABILITIES: Capabilities =
        Capabilities::of(&[Capability::SoftDeletable, Capability::TenantScoped]);

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[derive(Debug, Clone)]
pub struct ArticleDto {
    pub id: Option<i64>,
    pub title: String,
    pub body: String,
}

impl ArticleDto {
    pub fn new(id: Option<i64>, title: &str) -> Self {
        Self {
            id,
            title: title.to_owned(),
            body: String::new(),
        }
    }
}

pub fn article_hooks() -> ServiceHooks<Article, ArticleDto> {
    ServiceHooks::new(|dto: ArticleDto| {
        if dto.title.len() > 200 {
            return Err(MappingError::field("Title", "value does not fit"));
        }
        Ok(Article {
            id: dto.id.unwrap_or_default(),
            title: dto.title,
            body: dto.body,
        })
    })
    .standardize(|mut article: Article| {
        article.title = article.title.trim().to_owned();
        article.body = article.body.trim().to_owned();
        article
    })
    .validate(|article: &Article, sink| {
        if article.title.is_empty() {
            sink.add_error("Title", "Title is required");
        }
    })
    .check_permission(|ctx: &SecurityContext, op| {
        if op.is_write() && ctx.is_anonymous() {
            return Err(AccessDenied::new("anonymous callers cannot write articles"));
        }
        Ok(())
    })
}

pub fn ctx_for_tenant(tenant: i64) -> SecurityContext {
    SecurityContext::builder()
        .subject_id(Uuid::new_v4())
        .tenant_id(tenant)
        .build()
}

pub async fn article_store() -> (Arc<InMemoryEngine<Article>>, Arc<RowFilterPolicy>) {
    let engine = Arc::new(InMemoryEngine::<Article>::new());
    let mut builder = RowFilterPolicy::builder();
    builder.register::<Article>(engine.as_ref()).await.unwrap();
    (engine, Arc::new(builder.build()))
}

/// Provider wrapper that counts the unit-of-work calls a service makes.
pub struct RecordingProvider<P> {
    inner: P,
    pub adds: usize,
    pub updates: usize,
    pub removes: usize,
    pub commits: usize,
    pub discards: usize,
}

impl<P> RecordingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            adds: 0,
            updates: 0,
            removes: 0,
            commits: 0,
            discards: 0,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<E: Entity, P: StorageProvider<E>> StorageProvider<E> for RecordingProvider<P> {
    fn security_context(&self) -> &SecurityContext {
        self.inner.security_context()
    }

    fn entity_set(&self) -> Result<EntitySet<E>, ConfigError> {
        self.inner.entity_set()
    }

    fn query(&self, set: &EntitySet<E>) -> Query<E> {
        self.inner.query(set)
    }

    async fn fetch(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<Vec<E>, StorageError> {
        self.inner.fetch(query, cancel).await
    }

    async fn count(&self, query: &Query<E>, cancel: &CancellationToken) -> Result<u64, StorageError> {
        self.inner.count(query, cancel).await
    }

    fn add(&mut self, entity: E) {
        self.adds += 1;
        self.inner.add(entity);
    }

    fn attach(&mut self, entity: E) {
        self.inner.attach(entity);
    }

    fn update(&mut self, entity: E) {
        self.updates += 1;
        self.inner.update(entity);
    }

    fn remove(&mut self, entity: E) {
        self.removes += 1;
        self.inner.remove(entity);
    }

    fn pending(&self) -> &ChangeTracker<E> {
        self.inner.pending()
    }

    fn discard_changes(&mut self) {
        self.discards += 1;
        self.inner.discard_changes();
    }

    async fn commit_with(
        &mut self,
        options: CommitOptions,
        cancel: &CancellationToken,
    ) -> Result<u64, StorageError> {
        self.commits += 1;
        self.inner.commit_with(options, cancel).await
    }
}

pub type ArticleProvider = RecordingProvider<DbSession<Article>>;

pub fn article_session(
    engine: &Arc<InMemoryEngine<Article>>,
    policy: &Arc<RowFilterPolicy>,
    ctx: SecurityContext,
) -> ArticleProvider {
    RecordingProvider::new(DbSession::new(engine.clone(), policy.clone(), ctx))
}
