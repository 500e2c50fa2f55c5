use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;

/// A single key/value record as read back from a prefix snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub key: String,
    pub value: String,
}

/// The Get/Put/Delete/Watch surface the controller consumes from the
/// replicated metadata store. Watch itself is modeled as a periodic
/// [`MetaStoreClient::list`] snapshot diffed by the reconciler (§4.G) rather
/// than a push stream, since the store's own watch/lease/election machinery
/// is an external collaborator.
#[async_trait]
pub trait MetaStoreClient: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Snapshot every key under `prefix`, in key order.
    async fn list(&self, prefix: &str) -> Result<Vec<StoreEntry>, StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, String>,
}

/// In-memory [`MetaStoreClient`] used by tests and the `fmaster-cli serve`
/// default backend.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetaStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetaStoreClient for InMemoryMetaStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.entries.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoreEntry>, StoreError> {
        let guard = self.inner.read().await;
        let mut entries: Vec<StoreEntry> = guard
            .entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(key, value)| StoreEntry { key: key.clone(), value: value.clone() })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = InMemoryMetaStore::new();
        store.put("/group/sub/g1", "payload".to_string()).await.unwrap();
        assert_eq!(store.get("/group/sub/g1").await.unwrap(), Some("payload".to_string()));
    }

    #[tokio::test]
    async fn delete_then_get_is_none() {
        let store = InMemoryMetaStore::new();
        store.put("/group/sub/g1", "payload".to_string()).await.unwrap();
        store.delete("/group/sub/g1").await.unwrap();
        assert_eq!(store.get("/group/sub/g1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_filters_by_prefix_and_sorts() {
        let store = InMemoryMetaStore::new();
        store.put("/group/sub/g2", "b".to_string()).await.unwrap();
        store.put("/group/sub/g1", "a".to_string()).await.unwrap();
        store.put("/instance/business/x", "c".to_string()).await.unwrap();

        let entries = store.list("/group/").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "/group/sub/g1");
        assert_eq!(entries[1].key, "/group/sub/g2");
    }
}
