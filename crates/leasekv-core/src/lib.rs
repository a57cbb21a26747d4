// # leasekv-core
//
// Core library for mirroring DHCP lease events into a key-value store.
//
// ## Architecture Overview
//
// - **LeaseRecord**: The normalized representation of one lease, and its codec
// - **HookEvent / normalize**: Parsing a hook invocation and turning it into a record
// - **KvStore**: Trait for raw key-value backends (Consul, file, memory)
// - **LeaseStore**: Prefix + codec adapter over any KvStore
// - **Dispatcher**: Routes one event kind to the store calls that realize it
//
// ## Design Principles
//
// 1. **Single-shot**: One invocation processes exactly one event
// 2. **Fail-fast**: Store and codec errors propagate to the caller unchanged
// 3. **Library-first**: The hook binary is a thin layer over this crate
// 4. **Per-key consistency**: Last write wins, deletes are idempotent

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod record;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use backend::{FileKvStore, MemoryKvStore};
pub use config::{ConsulConfig, StoreConfig};
pub use dispatch::{Dispatcher, Disposition};
pub use error::{Error, Result};
pub use event::{EventKind, HookEnv, HookEvent, Invocation, LeaseTarget};
pub use record::{LeaseRecord, OrAbsent};
pub use store::{KEY_PREFIX, LeaseStore};
pub use traits::KvStore;
