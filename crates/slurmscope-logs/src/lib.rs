//! Log handling for slurmscope
//!
//! This crate turns one user-configured path template into three consistent
//! views (formatter, glob, identity matcher) and builds everything on top of
//! them: sandbox-safe path resolution, discovery of recent job log pairs,
//! live tail streaming, and full-text search with context.
//!
//! The filesystem is strictly read-only here. Jobs keep appending to their
//! log files while we read them, so nothing below assumes a stable length.

mod cache;
mod collect;
mod error;
mod pattern;
mod resolve;
mod search;
mod tail;

pub use cache::{RecentCache, bucket_key};
pub use collect::{DEFAULT_RECENT_LIMIT, collect_recent};
pub use error::LogError;
pub use pattern::{JobPathInfo, LogPattern};
pub use resolve::resolve;
pub use search::{MAX_CONTEXT_LINES, MAX_MATCHES, search_log};
pub use tail::{
    MAX_SNAPSHOT_BYTES, POLL_INTERVAL, TailHandle, TailPhase, TailSession, spawn_tail,
};

// Re-export types used in our public API
pub use slurmscope_types::{
    JobLogEntry, LogKey, SearchMatch, SearchResponse, StreamKind, TailEvent,
};
