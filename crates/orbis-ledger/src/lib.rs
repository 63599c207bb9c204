// crates/orbis-ledger/src/lib.rs
//
// orbis-ledger: typed gateway to the authoritative ledger.
//
// The ledger is the append-only system of record for articles, proposals,
// stakes, and votes. This crate exposes its contract surface as typed calls
// over a JSON-RPC envelope, plus a cursor-based typed event feed. Nothing
// here caches or interprets; higher layers re-read through this gateway
// whenever an event says something changed.

pub mod client;
pub mod events;

pub use client::{LedgerClient, LedgerConfig};
pub use events::{EventFeed, EventSource, LedgerEvent};
