//! Core traits for the lease recorder
//!
//! - [`KvStore`]: Raw key-value backend (Consul, file, memory)

pub mod kv_store;

pub use kv_store::KvStore;
