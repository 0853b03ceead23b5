//! Storage trait definition.
//!
//! Defines the interface UI-layer callers use to record and query read
//! progress, independent of the backing engine.

use crate::core::{NO_RECORD, ReadProgress, TopicId};
use crate::error::Result;
use serde::Serialize;

/// Durable per-topic read progress.
///
/// Implementations take `&self` for every operation so a single store can be
/// shared across threads behind an `Arc`; writes to the same topic resolve
/// last-write-wins.
pub trait ReadProgressStore: Send + Sync {
    /// Returns the last read reply for `topic`, or `None` if the topic has
    /// never been recorded.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn last_read_reply(&self, topic: TopicId) -> Result<Option<i64>>;

    /// Records that replies up to `reply` of `topic` have been read.
    ///
    /// Inserts the record or replaces it wholesale, stamping the current
    /// time. A subsequent [`last_read_reply`](Self::last_read_reply) returns
    /// exactly `reply`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidReplyIndex`](crate::Error::InvalidReplyIndex)
    /// without touching storage if `reply <= 0`, or a storage error if the
    /// write fails.
    fn set_last_read_reply(&self, topic: TopicId, reply: i64) -> Result<()>;

    /// Returns the full record for `topic`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn progress(&self, topic: TopicId) -> Result<Option<ReadProgress>>;

    /// Lists records, most recently read first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn list_progress(&self, limit: usize) -> Result<Vec<ReadProgress>>;

    /// Returns the number of topics with a record.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the count query fails.
    fn topic_count(&self) -> Result<usize>;

    /// Gets storage statistics.
    ///
    /// # Errors
    ///
    /// Returns a storage error if statistics cannot be gathered.
    fn stats(&self) -> Result<StoreStats>;

    /// Like [`last_read_reply`](Self::last_read_reply) but reports a missing
    /// record as [`NO_RECORD`] (`-1`).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn last_read_reply_or_sentinel(&self, topic: TopicId) -> Result<i64> {
        Ok(self.last_read_reply(topic)?.unwrap_or(NO_RECORD))
    }
}

/// Storage statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Number of topics with a record.
    pub topic_count: usize,
    /// Records carried over from the legacy schema (reply `0`).
    pub migrated_count: usize,
    /// Schema version.
    pub schema_version: u32,
    /// Database file size in bytes (if applicable).
    pub db_size: Option<u64>,
}
