//! Allowed roots and the modes attached to them.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::paths::AnchoredPath;

/// How far an allowed root reaches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    /// Only the root's own tree.
    #[default]
    Strict,
    /// The root's tree plus its named companion directories.
    CrossAccess,
}

impl AccessMode {
    /// Name as written in policy files.
    pub fn as_str(self) -> &'static str {
        match self {
            AccessMode::Strict => "strict",
            AccessMode::CrossAccess => "cross-access",
        }
    }
}

/// What happens to requests outside every allowed root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    /// Out-of-boundary requests are denied.
    Enforcing,
    /// Out-of-boundary requests are allowed with a warning.
    Advisory,
    /// Out-of-boundary requests are allowed silently.
    Permissive,
}

impl EnforcementMode {
    /// Name as written in policy files.
    pub fn as_str(self) -> &'static str {
        match self {
            EnforcementMode::Enforcing => "enforcing",
            EnforcementMode::Advisory => "advisory",
            EnforcementMode::Permissive => "permissive",
        }
    }
}

impl fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directory tree in which commands are in-boundary.
#[derive(Clone, Debug)]
pub struct AllowedRoot {
    path: AnchoredPath,
    access: AccessMode,
    companions: Vec<AnchoredPath>,
}

impl AllowedRoot {
    pub(crate) fn new(path: AnchoredPath, access: AccessMode, companions: Vec<AnchoredPath>) -> Self {
        Self {
            path,
            access,
            companions,
        }
    }

    /// The root directory.
    pub fn path(&self) -> &AnchoredPath {
        &self.path
    }

    /// The root's access mode.
    pub fn access(&self) -> AccessMode {
        self.access
    }

    /// Companion directories (only ever non-empty for cross-access roots).
    pub fn companions(&self) -> &[AnchoredPath] {
        &self.companions
    }

    /// Whether `path` is inside this root or, for cross-access roots, inside
    /// one of its companions.
    pub fn admits(&self, path: &Path) -> bool {
        if self.path.contains(path) {
            return true;
        }
        self.access == AccessMode::CrossAccess && self.companions.iter().any(|c| c.contains(path))
    }

    /// Every directory this root admits, root first.
    pub fn admitted(&self) -> impl Iterator<Item = &AnchoredPath> {
        std::iter::once(&self.path).chain(self.companions.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchored(path: &str) -> AnchoredPath {
        AnchoredPath::new(Path::new(path))
    }

    #[test]
    fn test_strict_root_ignores_outside() {
        let root = AllowedRoot::new(anchored("/srv/perimeter-test/app"), AccessMode::Strict, vec![]);
        assert!(root.admits(Path::new("/srv/perimeter-test/app/src")));
        assert!(!root.admits(Path::new("/srv/perimeter-test/lib")));
    }

    #[test]
    fn test_cross_access_root_admits_companions() {
        let root = AllowedRoot::new(
            anchored("/srv/perimeter-test/app"),
            AccessMode::CrossAccess,
            vec![anchored("/srv/perimeter-test/framework")],
        );
        assert!(root.admits(Path::new("/srv/perimeter-test/framework/docs")));
        assert!(!root.admits(Path::new("/srv/perimeter-test/framework-old")));
        assert_eq!(root.admitted().count(), 2);
    }
}
