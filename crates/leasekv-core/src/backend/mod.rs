// # KV Store Implementations
//
// Local implementations of the KvStore trait. The Consul backend lives in
// its own crate (`leasekv-consul`) so the core stays free of HTTP.

pub mod file;
pub mod memory;

pub use file::FileKvStore;
pub use memory::MemoryKvStore;
