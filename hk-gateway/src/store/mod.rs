//! Key-value cache for refreshed upstream data.
//!
//! A small Redis-shaped store: string keys and hash keys, written through
//! batches that are applied atomically. An optional JSON snapshot on disk
//! lets the refresh timestamp survive restarts.

mod error;
mod kv;

pub use error::StoreError;
pub use kv::{Batch, KvStore};
