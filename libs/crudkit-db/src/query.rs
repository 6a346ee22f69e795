use std::fmt;
use std::sync::Arc;

use crate::entity::Entity;
use crate::predicate::RowFilter;

/// Extra in-process predicate contributed by a caller (e.g. a service's
/// `query_extras` hook).
pub type EntityPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// A read request against one entity type.
///
/// Only a storage session can create a `Query`, and it always starts from the
/// session's row filter; callers can narrow it but never widen it.
pub struct Query<E: Entity> {
    row_filter: RowFilter,
    id: Option<E::Key>,
    predicates: Vec<EntityPredicate<E>>,
    offset: u64,
    limit: Option<u64>,
}

impl<E: Entity> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            row_filter: self.row_filter.clone(),
            id: self.id.clone(),
            predicates: self.predicates.clone(),
            offset: self.offset,
            limit: self.limit,
        }
    }
}

impl<E: Entity> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("entity", &E::NAME)
            .field("row_filter", &self.row_filter)
            .field("id", &self.id)
            .field("predicates", &self.predicates.len())
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .finish()
    }
}

impl<E: Entity> Query<E> {
    pub(crate) fn new(row_filter: RowFilter) -> Self {
        Self {
            row_filter,
            id: None,
            predicates: Vec::new(),
            offset: 0,
            limit: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: E::Key) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    #[must_use]
    pub fn filter_with(mut self, predicate: EntityPredicate<E>) -> Self {
        self.predicates.push(predicate);
        self
    }

    #[must_use]
    pub fn skip(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn take(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Same query without offset and limit, for counting.
    #[must_use]
    pub fn unpaged(&self) -> Self {
        let mut query = self.clone();
        query.offset = 0;
        query.limit = None;
        query
    }

    #[must_use]
    pub fn row_filter(&self) -> &RowFilter {
        &self.row_filter
    }

    #[must_use]
    pub fn id(&self) -> Option<&E::Key> {
        self.id.as_ref()
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    #[must_use]
    pub fn has_entity_predicates(&self) -> bool {
        !self.predicates.is_empty()
    }

    /// Id and caller predicates; the row filter is the engine's job.
    #[must_use]
    pub fn matches_entity(&self, entity: &E) -> bool {
        self.id.as_ref().is_none_or(|id| entity.id() == *id)
            && self.predicates.iter().all(|p| p(entity))
    }

    /// Applies offset and limit to an already filtered sequence.
    #[must_use]
    pub fn paginate<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        items.into_iter().skip(offset).take(limit).collect()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::test_support::Plain;

    fn plain(id: i64, label: &str) -> Plain {
        Plain {
            id,
            label: label.to_owned(),
        }
    }

    #[test]
    fn id_and_predicates_are_anded() {
        let query = Query::<Plain>::new(RowFilter::allow_all())
            .with_id(2)
            .filter(|p| p.label.starts_with('b'));

        assert!(query.matches_entity(&plain(2, "beta")));
        assert!(!query.matches_entity(&plain(2, "alpha")));
        assert!(!query.matches_entity(&plain(3, "beta")));
    }

    #[test]
    fn paginate_skips_then_takes() {
        let query = Query::<Plain>::new(RowFilter::allow_all()).skip(2).take(2);
        assert_eq!(query.paginate(vec![1, 2, 3, 4, 5]), vec![3, 4]);
        assert_eq!(query.unpaged().paginate(vec![1, 2, 3]), vec![1, 2, 3]);
    }
}
