//! # wmm-store
//!
//! Storage for the Watermelon Meow Meow event log.
//!
//! ## Overview
//!
//! All persistent state is one CSV object in a bucket. This crate provides:
//!
//! - [`ObjectStore`]: whole-object `get` / conditional `put`, with an
//!   in-memory bucket and a directory-backed bucket.
//! - [`codec`]: the CSV layout of the event log and effectiveness table.
//! - [`ObjectEventLog`]: the `EventLogStore` the append transaction writes
//!   through. Its versions are object ETags, so a write that raced another
//!   submitter fails with `WriteConflict` instead of dropping rows.
//! - [`seed_log`]: create the first log of a game.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wmm_store::{FsObjectStore, ObjectEventLog, DEFAULT_LOG_KEY};
//!
//! let bucket = Arc::new(FsObjectStore::new("./bucket"));
//! let store = ObjectEventLog::new(bucket, DEFAULT_LOG_KEY);
//! // Pass `Box::new(store)` to `wmm_core::AppendTransaction::new(...)`.
//! ```

pub mod codec;
pub mod log;
pub mod object;

pub use codec::{decode_effectiveness_table, decode_log, encode_log, LOG_COLUMNS};
pub use log::{
    load_effectiveness_table, seed_log, ObjectEventLog, SeedPlan, DEFAULT_EFFECTIVENESS_KEY,
    DEFAULT_LOG_KEY,
};
pub use object::{etag, FsObjectStore, InMemoryObjectStore, ObjectStore, Precondition, StoredObject};

// ── Tests ─────────────────────────────────────────────────────────────────────
