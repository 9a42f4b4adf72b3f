//! Per-container column schema cache
//!
//! Entries never expire. They are replaced by an explicit refresh and
//! removed by invalidation (or when the container is dropped through
//! [`GridClient`](crate::client::GridClient)).

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use gridrest_domain::{ColumnDescriptor, Result};
use tracing::debug;

/// Where schemas come from on a cache miss
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn fetch_schema(&self, container: &str) -> Result<Vec<ColumnDescriptor>>;
}

/// Concurrent map of container name to column list
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: DashMap<String, Arc<[ColumnDescriptor]>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, container: &str) -> Option<Arc<[ColumnDescriptor]>> {
        self.entries.get(container).map(|entry| Arc::clone(entry.value()))
    }

    pub fn insert(
        &self,
        container: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
    ) -> Arc<[ColumnDescriptor]> {
        let columns: Arc<[ColumnDescriptor]> = columns.into();
        self.entries.insert(container.into(), Arc::clone(&columns));
        columns
    }

    /// Cached schema, fetching from `source` on a miss.
    ///
    /// Two concurrent misses for the same container may both fetch; the
    /// later insert wins.
    pub async fn get_or_fetch(
        &self,
        container: &str,
        source: &dyn SchemaSource,
    ) -> Result<Arc<[ColumnDescriptor]>> {
        if let Some(columns) = self.get(container) {
            return Ok(columns);
        }
        self.refresh(container, source).await
    }

    /// Fetch unconditionally and replace any cached entry.
    pub async fn refresh(
        &self,
        container: &str,
        source: &dyn SchemaSource,
    ) -> Result<Arc<[ColumnDescriptor]>> {
        let columns = source.fetch_schema(container).await?;
        debug!(container, columns = columns.len(), "Cached container schema");
        Ok(self.insert(container, columns))
    }

    /// Returns whether an entry was removed.
    pub fn invalidate(&self, container: &str) -> bool {
        self.entries.remove(container).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
