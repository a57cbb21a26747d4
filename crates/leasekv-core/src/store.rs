//! Lease store adapter
//!
//! [`LeaseStore`] binds a raw [`KvStore`] to the fixed `DNSMASQ/` namespace
//! and to the [`LeaseRecord`] codec. Keys are always `prefix + ip`, which is
//! what guarantees a single live record per IP address.

use tracing::{debug, trace};

use crate::error::Result;
use crate::record::LeaseRecord;
use crate::traits::KvStore;

/// Namespace prefix for every lease key
pub const KEY_PREFIX: &str = "DNSMASQ/";

/// Lease-level view over a key-value backend
pub struct LeaseStore {
    kv: Box<dyn KvStore>,
}

impl LeaseStore {
    pub fn new(kv: Box<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Store key for a lease IP
    pub fn key_for(ip: &str) -> String {
        format!("{}{}", KEY_PREFIX, ip)
    }

    /// Name of the underlying backend
    pub fn backend_name(&self) -> &'static str {
        self.kv.backend_name()
    }

    /// Write `record`, replacing any previous value for its IP
    ///
    /// Returns the key written.
    pub async fn put_lease(&self, record: &LeaseRecord) -> Result<String> {
        let key = Self::key_for(&record.ip);
        let value = record.encode()?;
        self.kv.put(&key, &value).await?;
        debug!("Stored lease {} ({} bytes)", key, value.len());
        Ok(key)
    }

    /// Remove the record for `ip`; succeeds when it is already gone
    ///
    /// Returns the key deleted.
    pub async fn delete_lease(&self, ip: &str) -> Result<String> {
        let key = Self::key_for(ip);
        self.kv.delete(&key).await?;
        debug!("Deleted lease {}", key);
        Ok(key)
    }

    /// Fetch and decode the record for `ip`
    pub async fn get_lease(&self, ip: &str) -> Result<LeaseRecord> {
        self.fetch(&Self::key_for(ip)).await
    }

    /// Fetch and decode every record under the prefix
    ///
    /// The first failing `get` or decode aborts the whole listing.
    pub async fn list_leases(&self) -> Result<Vec<LeaseRecord>> {
        let keys = self.kv.list_keys(KEY_PREFIX).await?;
        trace!("Listed {} keys under {}", keys.len(), KEY_PREFIX);

        let mut leases = Vec::with_capacity(keys.len());
        for key in keys {
            // Consul folder marker
            if key == KEY_PREFIX {
                continue;
            }
            leases.push(self.fetch(&key).await?);
        }
        Ok(leases)
    }

    async fn fetch(&self, key: &str) -> Result<LeaseRecord> {
        let bytes = self.kv.get(key).await?;
        LeaseRecord::decode(&bytes)
    }
}
