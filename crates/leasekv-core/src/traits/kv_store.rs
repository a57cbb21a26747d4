// # KV Store Trait
//
// Defines the interface for the key-value backend that lease records are
// mirrored into.
//
// ## Purpose
//
// The store is an opaque durable map keyed by string. Replication and
// consistency across nodes are the backend's own business; the recorder
// relies only on:
// - per-key last-write-wins on `put`
// - idempotent `delete`
// - listing keys by prefix
//
// ## Implementations
//
// - Consul HTTP KV: `leasekv-consul` crate
// - JSON file: [`crate::backend::FileKvStore`]
// - In-memory: [`crate::backend::MemoryKvStore`]
//
// ## Usage
//
// ```rust,ignore
// use leasekv_core::KvStore;
//
// async fn example(store: &dyn KvStore) -> leasekv_core::Result<()> {
//     store.put("DNSMASQ/10.0.0.2", b"{...}").await?;
//     let keys = store.list_keys("DNSMASQ/").await?;
//     store.delete("DNSMASQ/10.0.0.2").await?;
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for key-value backends
///
/// Every call is an independent operation against the store. There is no
/// transactional grouping across keys and no retry: a failed call returns
/// its error to the caller unchanged.
///
/// # Error Contract
///
/// - Transport/connectivity failures: [`crate::Error::StoreUnavailable`]
/// - Missing key on `get`: [`crate::Error::NotFound`]
/// - Store reachable but refusing: [`crate::Error::StoreRejected`]
#[async_trait]
pub trait KvStore: Send + Sync {
    /// List all keys currently stored under `prefix`
    ///
    /// Order is store-defined. An empty prefix space is `Ok(vec![])`.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, crate::Error>;

    /// Fetch the current value for `key`
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<u8>)`: The stored bytes
    /// - `Err(Error::NotFound)`: The key does not exist
    async fn get(&self, key: &str) -> Result<Vec<u8>, crate::Error>;

    /// Write or overwrite the value for `key`
    ///
    /// No optimistic-concurrency check is performed: last writer wins.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), crate::Error>;

    /// Remove `key`
    ///
    /// Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), crate::Error>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
