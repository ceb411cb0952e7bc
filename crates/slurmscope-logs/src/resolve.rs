use std::path::{Path, PathBuf};

use crate::pattern::LogPattern;
use slurmscope_types::{LogKey, StreamKind};

/// Resolve a `name::id` log key to a real file under `root`.
///
/// The formatted path is canonicalized (following symlinks) and must land
/// inside the canonicalized root. Every failure collapses to `None` —
/// malformed key, non-numeric id, a path escaping the root, a missing or
/// non-regular file — so a caller can never learn why a lookup was refused.
pub fn resolve(
    root: &Path,
    pattern: &LogPattern,
    log_key: &str,
    stream: StreamKind,
) -> Option<PathBuf> {
    let key = LogKey::parse(log_key)?;
    let root = root.canonicalize().ok()?;
    let target = pattern
        .format_path(&root, &key.name, &key.id, stream)
        .canonicalize()
        .ok()?;
    if !target.starts_with(&root) {
        return None;
    }
    if !target.is_file() {
        return None;
    }
    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn pattern() -> LogPattern {
        LogPattern::compile("{name}/job.{stream}.{id}").unwrap()
    }

    #[test]
    fn test_resolve_existing_file() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("train1")).unwrap();
        fs::write(root.path().join("train1/job.out.42"), "hello\n").unwrap();

        let path = resolve(root.path(), &pattern(), "train1::42", StreamKind::Out).unwrap();
        assert!(path.ends_with("train1/job.out.42"));
        assert!(path.is_absolute());
    }

    #[test]
    fn test_resolve_missing_file() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve(root.path(), &pattern(), "train1::42", StreamKind::Out),
            None
        );
    }

    #[test]
    fn test_resolve_rejects_malformed_keys() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(resolve(root.path(), &pattern(), "nosep", StreamKind::Out), None);
        assert_eq!(
            resolve(root.path(), &pattern(), "train1::abc", StreamKind::Out),
            None
        );
    }

    #[test]
    fn test_resolve_contains_traversal() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("job.out.42"), "secret\n").unwrap();

        // A name full of `..` segments can format to a path that exists but
        // sits outside the root; it must resolve to nothing.
        let escape = format!("../{}::42", outside.path().file_name().unwrap().to_str().unwrap());
        assert_eq!(resolve(root.path(), &pattern(), &escape, StreamKind::Out), None);
        assert_eq!(
            resolve(root.path(), &pattern(), "../../etc::42", StreamKind::Out),
            None
        );
    }

    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("job.out.42"), "secret\n").unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("sneaky")).unwrap();

        // The symlinked directory exists under root, but canonicalization
        // lands the target outside of it.
        assert_eq!(
            resolve(root.path(), &pattern(), "sneaky::42", StreamKind::Out),
            None
        );
    }

    #[test]
    fn test_resolve_rejects_directory_target() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("train1/job.out.42")).unwrap();
        assert_eq!(
            resolve(root.path(), &pattern(), "train1::42", StreamKind::Out),
            None
        );
    }
}
