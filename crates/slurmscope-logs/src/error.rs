use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the log core.
///
/// Negative lookups (bad key, escaping path, missing file) are deliberately
/// not errors; they come back as `None` so callers cannot tell them apart.
#[derive(Debug, Error)]
pub enum LogError {
    /// The configured path template is structurally invalid. Fatal at startup.
    #[error("invalid log pattern template: {0}")]
    InvalidTemplate(String),

    /// A search pattern failed to compile.
    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A target file could not be read.
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
