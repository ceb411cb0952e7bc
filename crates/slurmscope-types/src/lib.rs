//! Shared types for slurmscope
//!
//! This crate contains data structures used across multiple slurmscope crates.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

// ============================================================================
// Job Identity Types
// ============================================================================

/// Which of a job's two log files is meant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// stdout, written as the `out` suffix in path templates
    Out,
    /// stderr, written as the `err` suffix in path templates
    Err,
}

impl StreamKind {
    /// The suffix substituted for `{stream}` in path templates
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Out => "out",
            Self::Err => "err",
        }
    }

    /// Parse the template suffix form ("out" / "err")
    pub fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "out" => Some(Self::Out),
            "err" => Some(Self::Err),
            _ => None,
        }
    }

    /// The sibling stream of the same job
    pub fn sibling(self) -> Self {
        match self {
            Self::Out => Self::Err,
            Self::Err => Self::Out,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Composite job identity in the `name::id` wire format.
///
/// Not persisted anywhere; rebuilt from the wire string on every request.
/// The id part must be all digits. A name that itself contains `::` splits at
/// the first separator, so the leftover `::` lands in the id and fails the
/// digit check.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LogKey {
    pub name: String,
    pub id: String,
}

impl LogKey {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    /// Parse the `name::id` wire form. Returns `None` if the separator is
    /// missing or the id is not a non-empty run of ASCII digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let (name, id) = raw.split_once("::")?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self::new(name, id))
    }
}

impl fmt::Display for LogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.name, self.id)
    }
}

// ============================================================================
// Discovery Types
// ============================================================================

/// A discovered job's log pair, produced by the collector.
///
/// Computed on demand; staleness is owned by whatever caches these upstream.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobLogEntry {
    pub name: String,
    pub id: String,
    pub log_key: String,
    /// Modification time of stdout if it exists, else stderr
    pub updated: DateTime<Utc>,
    /// Combined size of whichever of stdout/stderr exist
    pub size_bytes: u64,
}

impl JobLogEntry {
    pub fn new(name: String, id: String, updated: DateTime<Utc>, size_bytes: u64) -> Self {
        let log_key = format!("{name}::{id}");
        Self {
            name,
            id,
            log_key,
            updated,
            size_bytes,
        }
    }

    /// Human-readable size for display
    pub fn size_display(&self) -> String {
        human_size(self.size_bytes)
    }
}

/// A job currently known to the scheduler (one `squeue` row).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunningJob {
    pub id: String,
    pub name: String,
    pub state: String,
    pub runtime: String,
    pub limit: String,
    pub nodes: String,
    pub reason: String,
    pub log_key: String,
}

// ============================================================================
// Tail Types
// ============================================================================

/// One event on the live-tail wire.
///
/// A consumer must treat `snapshot` as replacing everything it holds and
/// `append` as adding exactly one line.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TailEvent {
    /// Authoritative full tail of the file at open time
    Snapshot(String),
    /// One appended line, trailing newline included
    Append(String),
}

// ============================================================================
// Search Types
// ============================================================================

/// A line of surrounding context for a search match.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContextLine {
    /// 1-based line number
    pub line_number: usize,
    pub text: String,
}

/// A single matching line with its context window.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchMatch {
    /// 1-based line number
    pub line_number: usize,
    pub text: String,
    pub context_before: Vec<ContextLine>,
    pub context_after: Vec<ContextLine>,
}

/// Outcome of a log search.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchResponse {
    /// Matches with context, capped at the searcher's match limit
    pub matches: Vec<SearchMatch>,
    /// True match count, never capped
    pub total_matches: usize,
    /// Whether matches were dropped to stay under the cap
    pub truncated: bool,
}

// ============================================================================
// Formatting Helpers
// ============================================================================

/// Convert a byte count to a human-readable size string
pub fn human_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = size as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{value:.1}{unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1}TB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_key_parse() {
        let key = LogKey::parse("train1::42").unwrap();
        assert_eq!(key.name, "train1");
        assert_eq!(key.id, "42");
        assert_eq!(key.to_string(), "train1::42");
    }

    #[test]
    fn test_log_key_rejects_bad_input() {
        assert_eq!(LogKey::parse("no-separator"), None);
        assert_eq!(LogKey::parse("train1::abc"), None);
        assert_eq!(LogKey::parse("train1::"), None);
        assert_eq!(LogKey::parse("train1::12a"), None);
        // A name containing `::` mis-splits and fails the digit check
        assert_eq!(LogKey::parse("a::b::42"), None);
    }

    #[test]
    fn test_log_key_allows_empty_name() {
        let key = LogKey::parse("::42").unwrap();
        assert_eq!(key.name, "");
        assert_eq!(key.id, "42");
    }

    #[test]
    fn test_stream_kind_suffix_roundtrip() {
        assert_eq!(StreamKind::from_suffix("out"), Some(StreamKind::Out));
        assert_eq!(StreamKind::from_suffix("err"), Some(StreamKind::Err));
        assert_eq!(StreamKind::from_suffix("stdout"), None);
        assert_eq!(StreamKind::Out.sibling(), StreamKind::Err);
    }

    #[test]
    fn test_tail_event_wire_shape() {
        let snap = serde_json::to_string(&TailEvent::Snapshot("abc\n".to_string())).unwrap();
        assert_eq!(snap, r#"{"snapshot":"abc\n"}"#);
        let append = serde_json::to_string(&TailEvent::Append("line\n".to_string())).unwrap();
        assert_eq!(append, r#"{"append":"line\n"}"#);
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0.0B");
        assert_eq!(human_size(512), "512.0B");
        assert_eq!(human_size(2048), "2.0KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0MB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.0GB");
    }

    #[test]
    fn test_job_log_entry_builds_log_key() {
        let entry = JobLogEntry::new("train1".to_string(), "42".to_string(), Utc::now(), 10);
        assert_eq!(entry.log_key, "train1::42");
        assert_eq!(entry.size_display(), "10.0B");
    }
}
