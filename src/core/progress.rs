//! Per-topic read progress.
//!
//! A [`ReadProgress`] is the single row kept for a topic: the highest reply
//! index the local user has read and the wall-clock time of that read.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Identifier of a discussion topic.
pub type TopicId = i64;

/// Sentinel returned by [`last_read_reply_or_sentinel`] when a topic has
/// never been read.
///
/// [`last_read_reply_or_sentinel`]: crate::storage::ReadProgressStore::last_read_reply_or_sentinel
pub const NO_RECORD: i64 = -1;

/// Read progress for one topic.
///
/// # Examples
///
/// ```
/// use topic_progress::core::ReadProgress;
///
/// let progress = ReadProgress::new(42, 7, 1_700_000_000_000);
/// assert_eq!(progress.last_read_reply, 7);
/// assert!(!progress.is_migrated());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadProgress {
    /// Topic this record belongs to.
    pub topic_id: TopicId,

    /// Highest 1-based reply index read. Rows carried over from the legacy
    /// read/unread schema hold `0`.
    pub last_read_reply: i64,

    /// Milliseconds since the Unix epoch of the last update. `0` for
    /// migrated rows.
    pub last_read_time: i64,
}

impl ReadProgress {
    /// Creates a record.
    #[must_use]
    pub const fn new(topic_id: TopicId, last_read_reply: i64, last_read_time: i64) -> Self {
        Self {
            topic_id,
            last_read_reply,
            last_read_time,
        }
    }

    /// Returns true for rows produced by the legacy schema migration, which
    /// carry no real reply index.
    #[must_use]
    pub const fn is_migrated(&self) -> bool {
        self.last_read_reply == 0
    }
}

/// Checks the write-boundary precondition that reply indices are 1-based.
///
/// # Errors
///
/// Returns [`Error::InvalidReplyIndex`] when `reply <= 0`.
///
/// # Examples
///
/// ```
/// use topic_progress::core::validate_reply_index;
///
/// assert!(validate_reply_index(1).is_ok());
/// assert!(validate_reply_index(0).is_err());
/// ```
pub fn validate_reply_index(reply: i64) -> Result<i64> {
    if reply > 0 {
        Ok(reply)
    } else {
        Err(Error::InvalidReplyIndex { reply })
    }
}
