//! Store Module
//!
//! The in-memory bucketed hash table and its per-key subscriber registry.
//!
//! ## Responsibilities
//! - Partition keys into buckets by their first character
//! - Let batches on disjoint buckets mutate in parallel
//! - Give `dump` and `snapshot` a consistent whole-table view
//! - Fan every write out to the key's subscribers
//!
//! ## Locking Protocol
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │    global RwLock<()>         │
//!                 │  read:  write/delete batches │
//!                 │  write: dump (SHOW)          │
//!                 └──────────────┬───────────────┘
//!                                │
//!   ┌──────────┬──────────┬──────┴───┬──────────┬──────────┐
//!   │ bucket a │ bucket b │   ...    │ bucket 0 │ bucket 9 │   RwLock<Bucket> each
//!   └──────────┴──────────┴──────────┴──────────┴──────────┘
//!   write batches: bucket write locks, ascending index
//!   read batches:  bucket read locks, ascending index, no global lock
//!   snapshot:      every bucket read lock, ascending index, no global lock
//!   (un)subscribe: one bucket write lock
//! ```

mod hash;
mod subscriber;
mod table;

pub use hash::{bucket_index, TABLE_SIZE};
pub use subscriber::{KeyRecord, NotificationSink, SinkId, SubscriberSet};
pub use table::{Bucket, BucketTable};
