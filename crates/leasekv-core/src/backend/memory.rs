// # Memory KV Store
//
// In-memory implementation of KvStore.
//
// ## Purpose
//
// A fast backend with no persistence. Clones share the same map, so a test
// can hand one clone to a dispatcher and inspect the other afterwards.
//
// ## When to Use
//
// - Tests
// - Embedding the recorder in a long-lived process
//
// The hook binary accepts it, but every invocation starts empty and loses
// its writes on exit.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::kv_store::KvStore;

/// In-memory key-value store
///
/// # Example
///
/// ```rust,no_run
/// use leasekv_core::backend::MemoryKvStore;
/// use leasekv_core::traits::KvStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryKvStore::new();
///
///     store.put("DNSMASQ/10.0.0.2", b"{}").await?;
///     assert_eq!(store.get("DNSMASQ/10.0.0.2").await?, b"{}");
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    inner: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryKvStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of keys in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Check whether `key` is present
    pub async fn contains(&self, key: &str) -> bool {
        self.inner.read().await.contains_key(key)
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        let guard = self.inner.read().await;
        guard
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(key))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
