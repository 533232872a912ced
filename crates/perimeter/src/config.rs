//! Policy files.
//!
//! A policy file is TOML:
//!
//! ```toml
//! mode = "enforcing"          # enforcing | advisory | permissive
//! scan_arguments = false
//! default_patterns = true
//!
//! [[roots]]
//! path = "."                  # relative to the file's directory
//! access = "cross-access"     # strict | cross-access
//! companions = ["../FSI-AgentGov", "~/.claude"]
//!
//! [[patterns]]
//! name = "force-push-main"
//! regex = 'git\s+push\s+.*--force.*\bmain\b'
//! ```
//!
//! `~` is expanded against the home directory once, at load time.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::policy::{AccessMode, BoundaryPolicy, EnforcementMode, PolicyBuilder, PolicyError};

/// Environment variable naming the policy file.
pub const CONFIG_ENV: &str = "PERIMETER_CONFIG";

/// Errors loading a policy file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file couldn't be read.
    #[error("failed to read policy file {path:?}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// The file isn't valid policy TOML.
    #[error("failed to parse policy file {path:?}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// A `~` path was used but no home directory is known.
    #[error("cannot expand {0:?}: home directory unknown")]
    NoHome(String),
    /// The file parsed but describes an invalid policy.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Raw policy file contents.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFile {
    /// Enforcement mode. Required: a policy must say how it enforces.
    pub mode: EnforcementMode,
    /// Check absolute path arguments too.
    #[serde(default)]
    pub scan_arguments: bool,
    /// Include the built-in destructive patterns.
    #[serde(default = "default_true")]
    pub default_patterns: bool,
    /// Allowed roots, in order.
    #[serde(default)]
    pub roots: Vec<RootEntry>,
    /// Extra destructive patterns.
    #[serde(default)]
    pub patterns: Vec<PatternEntry>,
}

/// One `[[roots]]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootEntry {
    /// Root directory.
    pub path: String,
    /// Access mode, strict unless stated.
    #[serde(default)]
    pub access: AccessMode,
    /// Companion directories for cross-access roots.
    #[serde(default)]
    pub companions: Vec<String>,
}

/// One `[[patterns]]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternEntry {
    /// Name shown in verdict reasons.
    pub name: String,
    /// Regular expression, matched case-insensitively.
    pub regex: String,
}

fn default_true() -> bool {
    true
}

impl PolicyFile {
    /// Parse policy TOML.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Build the policy, resolving relative paths against `base_dir` and
    /// `~` against `home`.
    pub fn into_policy(
        self,
        base_dir: &Path,
        home: Option<&Path>,
    ) -> Result<BoundaryPolicy, ConfigError> {
        let mut builder = PolicyBuilder::new(self.mode).scan_arguments(self.scan_arguments);
        if let Some(home) = home {
            builder = builder.home(home);
        }
        if self.default_patterns {
            builder = builder.default_patterns();
        }

        for root in self.roots {
            let path = expand(&root.path, base_dir, home)?;
            let companions = root
                .companions
                .iter()
                .map(|c| expand(c, base_dir, home))
                .collect::<Result<Vec<_>, _>>()?;
            builder = builder.root(path, root.access, companions);
        }

        for pattern in self.patterns {
            builder = builder.pattern(pattern.name, pattern.regex);
        }

        Ok(builder.build()?)
    }
}

/// Read and build the policy at `path`.
pub fn load_policy(path: &Path, home: Option<&Path>) -> Result<BoundaryPolicy, ConfigError> {
    let read_err = |source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    };
    let path = std::fs::canonicalize(path).map_err(read_err)?;
    let text = std::fs::read_to_string(&path).map_err(read_err)?;
    let file = PolicyFile::parse(&text).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;

    let base_dir = path.parent().unwrap_or(Path::new("/"));
    let policy = file.into_policy(base_dir, home)?;
    info!(
        path = %path.display(),
        mode = %policy.mode(),
        roots = policy.roots().len(),
        patterns = policy.patterns().len(),
        "loaded boundary policy"
    );
    Ok(policy)
}

/// The current user's home directory, captured once when a policy is loaded.
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

fn expand(raw: &str, base_dir: &Path, home: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if raw == "~" || raw.starts_with("~/") {
        let home = home.ok_or_else(|| ConfigError::NoHome(raw.to_string()))?;
        return Ok(match raw.strip_prefix("~/") {
            Some(rest) => home.join(rest),
            None => home.to_path_buf(),
        });
    }
    let path = Path::new(raw);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(base_dir.join(path))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::policy::CommandGate;
    use crate::{InvocationRequest, VerdictKind};

    const SAMPLE: &str = r#"
mode = "enforcing"

[[roots]]
path = "."
access = "cross-access"
companions = ["../FSI-AgentGov", "~/.claude"]

[[patterns]]
name = "force-push-main"
regex = 'git\s+push\s+.*--force.*\bmain\b'
"#;

    #[test]
    fn test_parse_sample() {
        let file = PolicyFile::parse(SAMPLE).expect("parse");
        assert_eq!(file.mode, EnforcementMode::Enforcing);
        assert!(file.default_patterns);
        assert!(!file.scan_arguments);
        assert_eq!(file.roots.len(), 1);
        assert_eq!(file.roots[0].access, AccessMode::CrossAccess);
        assert_eq!(file.patterns[0].name, "force-push-main");
    }

    #[test]
    fn test_mode_is_required() {
        assert!(PolicyFile::parse("[[roots]]\npath = \"/srv\"\n").is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(PolicyFile::parse("mode = \"advisory\"\nstrictness = 3\n").is_err());
        assert!(PolicyFile::parse("mode = \"loose\"\n").is_err());
    }

    #[test]
    fn test_expand() {
        let base = Path::new("/work/Solutions");
        let home = Path::new("/home/ops");
        assert_eq!(
            expand("../FSI-AgentGov", base, Some(home)).unwrap(),
            PathBuf::from("/work/Solutions/../FSI-AgentGov")
        );
        assert_eq!(
            expand("~/.claude", base, Some(home)).unwrap(),
            PathBuf::from("/home/ops/.claude")
        );
        assert_eq!(expand("~", base, Some(home)).unwrap(), PathBuf::from("/home/ops"));
        assert_eq!(expand("/opt/x", base, None).unwrap(), PathBuf::from("/opt/x"));
        assert!(matches!(
            expand("~/.claude", base, None),
            Err(ConfigError::NoHome(_))
        ));
    }

    #[test]
    fn test_load_policy_resolves_relative_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let solutions = dir.path().join("FSI-AgentGov-Solutions");
        let framework = dir.path().join("FSI-AgentGov");
        let home = dir.path().join("home");
        std::fs::create_dir_all(solutions.join("scripts")).unwrap();
        std::fs::create_dir_all(&framework).unwrap();
        std::fs::create_dir_all(home.join(".claude")).unwrap();
        std::fs::create_dir_all(dir.path().join("elsewhere")).unwrap();

        let config = solutions.join("perimeter.toml");
        std::fs::write(&config, SAMPLE).unwrap();

        let policy = load_policy(&config, Some(&home)).expect("load");
        assert_eq!(policy.roots().len(), 1);
        assert_eq!(policy.roots()[0].companions().len(), 2);

        let check = |cwd: PathBuf, command: &str| {
            policy.evaluate(&InvocationRequest::shell(command, cwd)).kind
        };
        assert_eq!(check(solutions.join("scripts"), "ls"), VerdictKind::Allow);
        assert_eq!(check(framework.clone(), "ls"), VerdictKind::Allow);
        assert_eq!(check(home.join(".claude"), "ls"), VerdictKind::Allow);
        assert_eq!(check(dir.path().join("elsewhere"), "ls"), VerdictKind::Deny);
        assert_eq!(
            check(framework, "git push --force origin main"),
            VerdictKind::Deny
        );
    }

    #[test]
    fn test_load_policy_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_policy(&dir.path().join("absent.toml"), None).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_invalid_policy_surfaces_policy_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = dir.path().join("perimeter.toml");
        std::fs::write(&config, "mode = \"advisory\"\n").unwrap();
        let err = load_policy(&config, None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Policy(PolicyError::NoRoots(EnforcementMode::Advisory))
        ));
    }

    #[test]
    fn test_home_dir_is_absolute() {
        if let Some(home) = home_dir() {
            assert!(home.is_absolute(), "{}", home.display());
        }
    }
}
