use std::path::Path;

use regex::Regex;

use crate::error::LogError;
use slurmscope_types::{ContextLine, SearchMatch, SearchResponse};

/// Hard cap on returned matches. `total_matches` is never capped.
pub const MAX_MATCHES: usize = 500;

/// Upper clamp on requested context lines.
pub const MAX_CONTEXT_LINES: usize = 10;

/// Search a log file for a pattern and return matching lines with context.
///
/// The pattern compiles case-insensitively; with `use_regex` off it is
/// escaped and searched literally. The whole file is loaded up front (invalid
/// UTF-8 replaced) and matched in two passes: the first counts every matching
/// line, the second builds context windows for at most [`MAX_MATCHES`] of
/// them. Line numbers are 1-based and text is trimmed of trailing whitespace.
pub fn search_log(
    path: &Path,
    pattern: &str,
    context_lines: usize,
    use_regex: bool,
) -> Result<SearchResponse, LogError> {
    let source = if use_regex {
        pattern.to_string()
    } else {
        regex::escape(pattern)
    };
    let regex = Regex::new(&format!("(?i){source}"))?;

    let bytes = std::fs::read(path).map_err(|source| LogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = text.lines().collect();

    // First pass: every matching line index, for the true total.
    let matched: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| regex.is_match(line))
        .map(|(i, _)| i)
        .collect();
    let total_matches = matched.len();

    // Second pass: context windows for the capped prefix of matches.
    let context_lines = context_lines.min(MAX_CONTEXT_LINES);
    let mut matches = Vec::with_capacity(total_matches.min(MAX_MATCHES));
    for &idx in matched.iter().take(MAX_MATCHES) {
        let start = idx.saturating_sub(context_lines);
        let end = (idx + context_lines + 1).min(lines.len());
        matches.push(SearchMatch {
            line_number: idx + 1,
            text: lines[idx].trim_end().to_string(),
            context_before: (start..idx).map(|j| context_line(&lines, j)).collect(),
            context_after: (idx + 1..end).map(|j| context_line(&lines, j)).collect(),
        });
    }

    Ok(SearchResponse {
        matches,
        total_matches,
        truncated: total_matches > MAX_MATCHES,
    })
}

fn context_line(lines: &[&str], idx: usize) -> ContextLine {
    ContextLine {
        line_number: idx + 1,
        text: lines[idx].trim_end().to_string(),
    }
}
