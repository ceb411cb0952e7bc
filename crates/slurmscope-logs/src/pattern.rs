use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::LogError;
use slurmscope_types::StreamKind;

/// Identity extracted from a log file path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobPathInfo {
    pub name: String,
    pub id: String,
    pub stream: StreamKind,
}

/// Compiled log path template.
///
/// A template like `{name}/job.{stream}.{id}` describes where a job's log
/// files live relative to the log root. Compiling it yields three views that
/// can never drift apart because they all derive from the same value:
///
/// - a formatter ([`format_rel`](Self::format_rel)) substituting concrete
///   name/id/stream values,
/// - a glob ([`glob`](Self::glob)) for discovering candidate files, each
///   placeholder widened to a single-segment `*`,
/// - an anchored extraction regex ([`extract`](Self::extract)) mapping a
///   discovered path back to its job identity.
///
/// `{id}` and `{stream}` are mandatory; `{name}` is optional and falls back
/// to the id during extraction. Immutable once compiled.
#[derive(Clone, Debug)]
pub struct LogPattern {
    template: String,
    glob: String,
    matcher: Regex,
    has_name: bool,
}

impl LogPattern {
    /// Compile a template string, validating required placeholders.
    pub fn compile(template: &str) -> Result<Self, LogError> {
        if !template.contains("{id}") {
            return Err(LogError::InvalidTemplate(
                "template must contain the {id} placeholder".to_string(),
            ));
        }
        if !template.contains("{stream}") {
            return Err(LogError::InvalidTemplate(
                "template must contain the {stream} placeholder".to_string(),
            ));
        }

        let glob = template
            .replace("{name}", "*")
            .replace("{id}", "*")
            .replace("{stream}", "*");

        // regex::escape turns `{name}` into `\{name\}`, so the placeholders
        // survive escaping and can be swapped for capture groups afterwards.
        let source = regex::escape(template)
            .replace(r"\{name\}", "(?P<name>[^/]+)")
            .replace(r"\{id\}", "(?P<id>[0-9]+)")
            .replace(r"\{stream\}", "(?P<stream>out|err)");
        let matcher = Regex::new(&format!("^{source}$"))
            .map_err(|e| LogError::InvalidTemplate(e.to_string()))?;

        Ok(Self {
            template: template.to_string(),
            glob,
            matcher,
            has_name: template.contains("{name}"),
        })
    }

    /// The raw template string this pattern was compiled from
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Glob form of the template, one `*` per placeholder
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// Whether the template carries a `{name}` placeholder
    pub fn has_name(&self) -> bool {
        self.has_name
    }

    /// Substitute concrete values into the template.
    ///
    /// One left-to-right pass: substituted values are never rescanned, so a
    /// name that happens to contain placeholder text stays verbatim and the
    /// extraction round trip holds.
    pub fn format_rel(&self, name: &str, id: &str, stream: StreamKind) -> String {
        let mut out = String::with_capacity(self.template.len() + name.len() + id.len());
        let mut rest = self.template.as_str();
        while let Some(at) = rest.find('{') {
            out.push_str(&rest[..at]);
            let tail = &rest[at..];
            let (value, token) = if tail.starts_with("{name}") {
                (name, "{name}")
            } else if tail.starts_with("{id}") {
                (id, "{id}")
            } else if tail.starts_with("{stream}") {
                (stream.suffix(), "{stream}")
            } else {
                // a lone brace is literal template text
                out.push('{');
                rest = &rest[at + 1..];
                continue;
            };
            out.push_str(value);
            rest = &rest[at + token.len()..];
        }
        out.push_str(rest);
        out
    }

    /// Substitute concrete values and join under `root`.
    ///
    /// No containment or existence checks happen here; see
    /// [`resolve`](crate::resolve::resolve) for the safe request path.
    pub fn format_path(&self, root: &Path, name: &str, id: &str, stream: StreamKind) -> PathBuf {
        root.join(self.format_rel(name, id, stream))
    }

    /// Extract the job identity from a path under `root`.
    ///
    /// Returns `None` when the path is not under `root` or does not match the
    /// template. Without a `{name}` placeholder the name falls back to the id.
    pub fn extract(&self, root: &Path, path: &Path) -> Option<JobPathInfo> {
        let rel = path.strip_prefix(root).ok()?;
        let rel = rel.to_str()?;
        let caps = self.matcher.captures(rel)?;
        let id = caps.name("id")?.as_str().to_string();
        let stream = StreamKind::from_suffix(caps.name("stream")?.as_str())?;
        let name = match caps.name("name") {
            Some(m) => m.as_str().to_string(),
            None => id.clone(),
        };
        Some(JobPathInfo { name, id, stream })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_requires_id_and_stream() {
        assert!(LogPattern::compile("{name}/job.{stream}.{id}").is_ok());
        assert!(matches!(
            LogPattern::compile("{name}/job.{stream}"),
            Err(LogError::InvalidTemplate(_))
        ));
        assert!(matches!(
            LogPattern::compile("{name}/job.{id}"),
            Err(LogError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_glob_derivation() {
        let pattern = LogPattern::compile("{name}/job.{stream}.{id}").unwrap();
        assert_eq!(pattern.glob(), "*/job.*.*");

        let flat = LogPattern::compile("slurm-{id}.{stream}").unwrap();
        assert_eq!(flat.glob(), "slurm-*.*");
    }

    #[test]
    fn test_format_and_extract_roundtrip() {
        let pattern = LogPattern::compile("{name}/job.{stream}.{id}").unwrap();
        assert_eq!(pattern.template(), "{name}/job.{stream}.{id}");
        let root = Path::new("/logs");

        let path = pattern.format_path(root, "train1", "42", StreamKind::Out);
        assert_eq!(path, PathBuf::from("/logs/train1/job.out.42"));

        let info = pattern.extract(root, &path).unwrap();
        assert_eq!(info.name, "train1");
        assert_eq!(info.id, "42");
        assert_eq!(info.stream, StreamKind::Out);
    }

    #[test]
    fn test_format_does_not_rescan_substituted_values() {
        let pattern = LogPattern::compile("{name}/job.{stream}.{id}").unwrap();
        let root = Path::new("/logs");

        // a name containing placeholder text stays verbatim
        let path = pattern.format_path(root, "{id}", "42", StreamKind::Out);
        assert_eq!(path, PathBuf::from("/logs/{id}/job.out.42"));
        let info = pattern.extract(root, &path).unwrap();
        assert_eq!(info.name, "{id}");
        assert_eq!(info.id, "42");

        let path = pattern.format_path(root, "a{stream}b", "7", StreamKind::Err);
        assert_eq!(path, PathBuf::from("/logs/a{stream}b/job.err.7"));
    }

    #[test]
    fn test_extract_without_name_falls_back_to_id() {
        let pattern = LogPattern::compile("slurm-{id}.{stream}").unwrap();
        assert!(!pattern.has_name());

        let root = Path::new("/logs");
        let info = pattern
            .extract(root, Path::new("/logs/slurm-1234.err"))
            .unwrap();
        assert_eq!(info.name, "1234");
        assert_eq!(info.id, "1234");
        assert_eq!(info.stream, StreamKind::Err);
    }

    #[test]
    fn test_extract_rejects_non_matching_paths() {
        let pattern = LogPattern::compile("{name}/job.{stream}.{id}").unwrap();
        let root = Path::new("/logs");

        // id must be digits only
        assert!(pattern.extract(root, Path::new("/logs/a/job.out.x1")).is_none());
        // stream must be the out/err alternation
        assert!(pattern.extract(root, Path::new("/logs/a/job.log.42")).is_none());
        // name must not span directories
        assert!(pattern.extract(root, Path::new("/logs/a/b/job.out.42")).is_none());
        // path must sit under the root
        assert!(pattern.extract(root, Path::new("/other/a/job.out.42")).is_none());
        // literal text is matched literally, not as regex
        let dotted = LogPattern::compile("x.y/{stream}.{id}").unwrap();
        assert!(dotted.extract(root, Path::new("/logs/xzy/out.42")).is_none());
        assert!(dotted.extract(root, Path::new("/logs/x.y/out.42")).is_some());
    }

    #[test]
    fn test_nested_template() {
        let pattern = LogPattern::compile("{name}/{id}/std{stream}").unwrap();
        assert_eq!(pattern.glob(), "*/*/std*");

        let root = Path::new("/logs");
        let path = pattern.format_path(root, "train1", "7", StreamKind::Err);
        assert_eq!(path, PathBuf::from("/logs/train1/7/stderr"));

        let info = pattern.extract(root, &path).unwrap();
        assert_eq!(info.name, "train1");
        assert_eq!(info.id, "7");
        assert_eq!(info.stream, StreamKind::Err);
    }
}
