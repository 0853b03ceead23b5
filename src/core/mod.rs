//! Core domain models for topic-progress.
//!
//! Pure data types with no I/O dependencies: the per-topic read progress
//! record and the helpers that validate what may be written into it.

pub mod progress;

pub use progress::{NO_RECORD, ReadProgress, TopicId, validate_reply_index};
