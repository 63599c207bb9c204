// crates/orbis-store/src/lib.rs
//
// orbis-store: the read-optimized cache and the content gateway client.
//
// The cache is a denormalized mirror of ledger state: RocksDB in
// production, an in-memory twin for tests and degraded operation. The
// ledger stays authoritative: every document here is rebuilt from re-reads
// and can be dropped and resynced at any time.

pub mod cache;
pub mod content;
pub mod memory;

pub use cache::RocksCache;
pub use content::{ContentClient, ContentConfig};
pub use memory::MemoryCache;
