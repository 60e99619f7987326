//! Hash Map Module
//!
//! The primary key index: a chained hash table that resizes progressively.
//!
//! ## Responsibilities
//! - O(1) insertion by prepending to a bucket chain
//! - Lookups and removals driven by a caller-supplied equality test
//! - Spreading the cost of a resize over the operations that follow it
//!
//! ## Layout
//! ```text
//!            ┌──────────────────────────────┐
//!  current → │ b0 │ b1 │ b2 │ ... │ b(2n-1) │   inserts land here
//!            └──┬───────────────────────────┘
//!               ▼
//!            [entry] → [entry] → ∅            (chains link by slab key)
//!
//!            ┌──────────────────┐
//!  old     → │ b0 │ ... │ b(n-1)│   drained from `migrate_pos`, 128 entries
//!            └──────────────────┘   per operation, then dropped
//! ```
//!
//! Entries live in one slab shared by both generations; a bucket or a `next`
//! link is just a slab key, so moving an entry between generations only
//! rewrites two links.

mod map;
mod table;


pub use map::{Iter, ProgressiveMap};

/// Load factor (entries per bucket) at which a resize starts
pub const MAX_LOAD_FACTOR: usize = 8;

/// Max entries migrated from the old generation per map operation
pub const MIGRATION_WORK: usize = 128;

/// Bucket count of the first table allocated
pub const INITIAL_CAPACITY: usize = 4;
