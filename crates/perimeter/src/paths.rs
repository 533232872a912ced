//! Path resolution and containment checks.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::verdict::Violation;

/// Canonicalize a working directory, or explain why it can't be.
pub(crate) fn resolve_working_dir(path: &Path) -> Result<PathBuf, Violation> {
    let unresolvable = |detail: String| Violation::UnresolvablePath {
        path: path.display().to_string(),
        detail,
    };

    if !path.is_absolute() {
        return Err(unresolvable("path is not absolute".to_string()));
    }

    let resolved = std::fs::canonicalize(path).map_err(|e| unresolvable(e.to_string()))?;
    if !resolved.is_dir() {
        return Err(unresolvable("not a directory".to_string()));
    }
    Ok(resolved)
}

/// Collapse `.` and `..` segments without touching the filesystem.
///
/// `..` never climbs above the root.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !path.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// A configured directory, kept both as declared and as resolved on disk.
///
/// A directory that doesn't exist yet is resolved through its longest
/// existing ancestor, so it still matches once created under a symlinked
/// parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchoredPath {
    declared: PathBuf,
    resolved: PathBuf,
}

impl AnchoredPath {
    /// Anchor an absolute directory.
    pub(crate) fn new(path: &Path) -> Self {
        let declared = normalize_lexically(path);
        let resolved = canonicalize_existing(&declared);
        Self { declared, resolved }
    }

    /// The path as written in the policy, normalized.
    pub fn declared(&self) -> &Path {
        &self.declared
    }

    /// The path with symlinks resolved.
    pub fn resolved(&self) -> &Path {
        &self.resolved
    }

    /// Whether `path` equals or lies beneath this directory.
    ///
    /// Comparison is per path component, so `/repo-other` is not inside `/repo`.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.resolved) || path.starts_with(&self.declared)
    }
}

/// Canonicalize the longest existing ancestor of `path` and re-attach the rest.
fn canonicalize_existing(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        let Ok(resolved) = std::fs::canonicalize(ancestor) else {
            continue;
        };
        return match path.strip_prefix(ancestor) {
            Ok(rest) if !rest.as_os_str().is_empty() => resolved.join(rest),
            _ => resolved,
        };
    }
    path.to_path_buf()
}

impl fmt::Display for AnchoredPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.declared.display())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/repoA/../repoB/./src")),
            PathBuf::from("/repoB/src")
        );
        assert_eq!(
            normalize_lexically(Path::new("/../../etc")),
            PathBuf::from("/etc")
        );
        assert_eq!(
            normalize_lexically(Path::new("a/../../b")),
            PathBuf::from("../b")
        );
    }

    #[test]
    fn test_contains_is_component_wise() {
        let root = AnchoredPath::new(Path::new("/nonexistent-perimeter/repo"));
        assert!(root.contains(Path::new("/nonexistent-perimeter/repo")));
        assert!(root.contains(Path::new("/nonexistent-perimeter/repo/src/lib.rs")));
        assert!(!root.contains(Path::new("/nonexistent-perimeter/repo-other")));
        assert!(!root.contains(Path::new("/nonexistent-perimeter")));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_root_resolves_through_symlinked_parent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let real = dir.path().join("real");
        std::fs::create_dir_all(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let root = AnchoredPath::new(&link.join("later/app"));
        assert_eq!(root.declared(), link.join("later/app").as_path());
        assert_eq!(
            root.resolved(),
            std::fs::canonicalize(&real).unwrap().join("later/app").as_path()
        );

        std::fs::create_dir_all(link.join("later/app/src")).unwrap();
        let cwd = resolve_working_dir(&link.join("later/app/src")).unwrap();
        assert!(root.contains(&cwd), "{}", cwd.display());
    }

    #[test]
    fn test_resolve_rejects_relative() {
        let err = resolve_working_dir(Path::new("relative/dir")).unwrap_err();
        assert!(err.to_string().contains("not absolute"));
    }

    #[test]
    fn test_resolve_rejects_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("gone");
        let err = resolve_working_dir(&missing).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("unresolvable working directory")
        );
    }

    #[test]
    fn test_resolve_collapses_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();

        let via_traversal = resolve_working_dir(&dir.path().join("a/../b")).unwrap();
        let direct = resolve_working_dir(&dir.path().join("b")).unwrap();
        assert_eq!(via_traversal, direct);
    }

    #[test]
    fn test_resolve_rejects_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        let err = resolve_working_dir(&file).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
