// crates/orbis-engine/src/lib.rs
//
// orbis-engine: the validation & reputation synchronization engine.
//
// Two cooperating components:
//
//   - LifecycleController drives articles and update proposals through
//     submission, automated scoring, and validator voting, writing results
//     back to the ledger.
//   - CacheSynchronizer keeps the denormalized read cache consistent
//     with ledger truth via idempotent re-read-based upserts, fed by both
//     synchronous write hints and asynchronous ledger events.
//
// Correctness rests on one rule: events are wake-up signals, not data.
// Every handler re-reads authoritative state before writing, so duplicated
// or out-of-order notifications converge instead of corrupting.

pub mod event_loop;
pub mod lifecycle;
pub mod sync;
pub mod testing;

pub use event_loop::{run_event_loop, EventLoopConfig};
pub use lifecycle::{LifecycleController, ProposalReceipt, SubmissionReceipt};
pub use sync::{CacheSynchronizer, ResyncReport};
