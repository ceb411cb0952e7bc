use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::pattern::{JobPathInfo, LogPattern};
use slurmscope_types::{JobLogEntry, StreamKind};

/// Default cap on discovery results.
pub const DEFAULT_RECENT_LIMIT: usize = 200;

/// Discover recently updated job logs under `root`.
///
/// Walks the tree following the pattern's glob, extracts a job identity from
/// every matching regular file, and keeps the first file seen per (name, id).
/// That first file locates its stdout/stderr siblings: sizes are summed over
/// whichever exist and the updated time is stdout's mtime, falling back to
/// stderr's. A stat failure drops only that identity, never the whole scan.
///
/// Results are sorted by updated time descending and truncated to `limit`.
pub fn collect_recent(root: &Path, pattern: &LogPattern, limit: usize) -> Vec<JobLogEntry> {
    let mut entries = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for log_file in glob_walk(root, pattern.glob()) {
        let Some(info) = pattern.extract(root, &log_file) else {
            continue;
        };
        if !seen.insert((info.name.clone(), info.id.clone())) {
            continue;
        }

        let stdout_path = match info.stream {
            StreamKind::Out => log_file.clone(),
            StreamKind::Err => pattern.format_path(root, &info.name, &info.id, StreamKind::Out),
        };
        let stderr_path = pattern.format_path(root, &info.name, &info.id, StreamKind::Err);

        match stat_entry(&info, &stdout_path, &stderr_path) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) | Err(_) => {
                debug!(name = %info.name, id = %info.id, "skipping job with unreadable log files");
            }
        }
    }

    entries.sort_by(|a, b| b.updated.cmp(&a.updated));
    entries.truncate(limit);
    entries
}

/// Stat both sibling files and build the discovery entry.
///
/// `Ok(None)` means neither file exists any more (possible if it vanished
/// between the walk and the stat); `Err` is any other stat failure.
fn stat_entry(
    info: &JobPathInfo,
    stdout_path: &Path,
    stderr_path: &Path,
) -> io::Result<Option<JobLogEntry>> {
    let stdout_meta = metadata_if_exists(stdout_path)?;
    let stderr_meta = metadata_if_exists(stderr_path)?;

    let Some(primary) = stdout_meta.as_ref().or(stderr_meta.as_ref()) else {
        return Ok(None);
    };
    let updated: DateTime<Utc> = primary.modified()?.into();
    let size_bytes = stdout_meta.as_ref().map_or(0, |m| m.len())
        + stderr_meta.as_ref().map_or(0, |m| m.len());

    Ok(Some(JobLogEntry::new(
        info.name.clone(),
        info.id.clone(),
        updated,
        size_bytes,
    )))
}

fn metadata_if_exists(path: &Path) -> io::Result<Option<fs::Metadata>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Enumerate regular files under `root` matching a glob of `/`-separated
/// segments where `*` matches any run of characters within one segment.
fn glob_walk(root: &Path, glob: &str) -> Vec<PathBuf> {
    let segments: Vec<&str> = glob.split('/').collect();
    let mut found = Vec::new();
    walk(root, &segments, &mut found);
    found
}

fn walk(dir: &Path, segments: &[&str], found: &mut Vec<PathBuf>) {
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };
    let is_leaf = rest.is_empty();

    // Literal segments descend directly instead of scanning the directory.
    if !segment.contains('*') {
        let next = dir.join(segment);
        if is_leaf {
            if next.is_file() {
                found.push(next);
            }
        } else if next.is_dir() {
            walk(&next, rest, found);
        }
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !segment_matches(segment, file_name) {
            continue;
        }
        let path = entry.path();
        if is_leaf {
            // is_file follows symlinks, so only regular files survive
            if path.is_file() {
                found.push(path);
            }
        } else if path.is_dir() {
            walk(&path, rest, found);
        }
    }
}

/// Match one glob segment against one path component.
fn segment_matches(segment: &str, candidate: &str) -> bool {
    let parts: Vec<&str> = segment.split('*').collect();
    if parts.len() == 1 {
        return segment == candidate;
    }

    let mut rest = candidate;
    let last = parts.len() - 1;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 {
            let Some(stripped) = rest.strip_prefix(part) else {
                return false;
            };
            rest = stripped;
        } else if i == last {
            return rest.len() >= part.len() && rest.ends_with(part);
        } else if part.is_empty() {
            // consecutive wildcards collapse
        } else {
            let Some(at) = rest.find(part) else {
                return false;
            };
            rest = &rest[at + part.len()..];
        }
    }
    unreachable!("loop returns on the final part")
}
