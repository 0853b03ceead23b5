//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::core::{ReadProgress, TopicId};
use crate::error::Error;
use crate::storage::StoreStats;
use serde::Serialize;
use std::fmt::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats a status response.
#[must_use]
pub fn format_status(stats: &StoreStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_status_text(stats),
        OutputFormat::Json => format_json(stats),
    }
}

fn format_status_text(stats: &StoreStats) -> String {
    let mut output = String::new();
    output.push_str("Topic Progress Status\n");
    output.push_str("=====================\n\n");
    let _ = writeln!(output, "  Topics:        {}", stats.topic_count);
    let _ = writeln!(output, "  Migrated:      {}", stats.migrated_count);
    let _ = writeln!(output, "  Schema:        v{}", stats.schema_version);
    if let Some(size) = stats.db_size {
        let _ = writeln!(output, "  DB size:       {}", format_size(size));
    }
    output
}

/// Formats the result of a single-topic lookup.
#[must_use]
pub fn format_progress(
    topic: TopicId,
    progress: Option<&ReadProgress>,
    format: OutputFormat,
) -> String {
    match (format, progress) {
        (OutputFormat::Text, Some(p)) => format!("{}\n", p.last_read_reply),
        (OutputFormat::Text, None) => format!("No record for topic {topic}\n"),
        (OutputFormat::Json, Some(p)) => format_json(p),
        (OutputFormat::Json, None) => format_json(&serde_json::json!({
            "topic_id": topic,
            "last_read_reply": null,
        })),
    }
}

/// Formats a progress list.
#[must_use]
pub fn format_progress_list(records: &[ReadProgress], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_progress_list_text(records),
        OutputFormat::Json => format_json(&records),
    }
}

fn format_progress_list_text(records: &[ReadProgress]) -> String {
    if records.is_empty() {
        return "No topics recorded.\n".to_string();
    }

    let mut output = String::new();
    let _ = writeln!(output, "{:<12} {:<8} Last read (ms)", "Topic", "Reply");
    output.push_str(&"-".repeat(40));
    output.push('\n');

    for record in records {
        let time = if record.last_read_time == 0 {
            "-".to_string()
        } else {
            record.last_read_time.to_string()
        };
        let _ = writeln!(
            output,
            "{:<12} {:<8} {}",
            record.topic_id, record.last_read_reply, time
        );
    }

    output
}

/// Formats an error for display.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => format_json(&serde_json::json!({
            "error": error.to_string(),
            "storage": error.is_storage(),
        })),
    }
}

fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
