//! Test doubles and common utilities for contract tests
//!
//! These doubles record how the dispatcher talks to the store without
//! depending on any real backend.

#![allow(dead_code)]

use leasekv_core::error::{Error, Result};
use leasekv_core::traits::KvStore;
use leasekv_core::{EventKind, HookEvent, LeaseTarget, MemoryKvStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A KvStore that delegates to memory and counts every call
#[derive(Clone, Default)]
pub struct CountingKvStore {
    pub inner: MemoryKvStore,
    calls: Arc<AtomicUsize>,
}

impl CountingKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of KvStore calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl KvStore for CountingKvStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.record_call();
        self.inner.list_keys(prefix).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.record_call();
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.record_call();
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.record_call();
        self.inner.delete(key).await
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}

/// A KvStore whose every call fails as if the agent were down
#[derive(Clone, Default)]
pub struct UnreachableKvStore;

#[async_trait::async_trait]
impl KvStore for UnreachableKvStore {
    async fn list_keys(&self, _prefix: &str) -> Result<Vec<String>> {
        Err(Error::store_unavailable("connection refused"))
    }

    async fn get(&self, _key: &str) -> Result<Vec<u8>> {
        Err(Error::store_unavailable("connection refused"))
    }

    async fn put(&self, _key: &str, _value: &[u8]) -> Result<()> {
        Err(Error::store_unavailable("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(Error::store_unavailable("connection refused"))
    }

    fn backend_name(&self) -> &'static str {
        "unreachable"
    }
}

/// An `old` event for the given lease
pub fn old_event(mac: &str, ip: &str, hostname: &str) -> HookEvent {
    HookEvent::lease(EventKind::Old, LeaseTarget::new(mac, ip, hostname))
}

/// A `del` event for the given lease
pub fn del_event(mac: &str, ip: &str, hostname: &str) -> HookEvent {
    HookEvent::lease(EventKind::Del, LeaseTarget::new(mac, ip, hostname))
}
