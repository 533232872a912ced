//! Boundary policy evaluation and construction.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::handler::CommandGate;
use super::patterns::{DEFAULT_PATTERNS, DestructivePattern};
use super::root::{AccessMode, AllowedRoot, EnforcementMode};
use crate::paths::{AnchoredPath, normalize_lexically, resolve_working_dir};
use crate::request::InvocationRequest;
use crate::verdict::{Verdict, Violation};

/// Argument paths that never count as leaving the boundary.
const DEVICE_SINKS: &[&str] = &[
    "/dev/null",
    "/dev/stdin",
    "/dev/stdout",
    "/dev/stderr",
    "/dev/tty",
];

/// Errors building a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A destructive pattern failed to compile.
    #[error("invalid destructive pattern '{name}': {source}")]
    InvalidPattern {
        /// Pattern name.
        name: String,
        /// Compilation error.
        source: regex_lite::Error,
    },
    /// Two patterns share a name.
    #[error("duplicate destructive pattern '{0}'")]
    DuplicatePattern(String),
    /// A root or companion path is relative.
    #[error("allowed directory {0:?} is not an absolute path")]
    RelativeRoot(PathBuf),
    /// Companions were declared on a strict root.
    #[error("strict root {0:?} declares companions; use cross-access")]
    CompanionsOnStrictRoot(PathBuf),
    /// A non-permissive policy admits nothing.
    #[error("{0} policy has no allowed roots")]
    NoRoots(EnforcementMode),
}

/// The full set of rules the gate evaluates against.
///
/// Immutable once built. Share it behind an `Arc`, or a
/// [`PolicyHandle`](super::PolicyHandle) when it needs to be reloaded.
#[derive(Clone, Debug)]
pub struct BoundaryPolicy {
    mode: EnforcementMode,
    roots: Vec<AllowedRoot>,
    patterns: Vec<DestructivePattern>,
    scan_arguments: bool,
    home: Option<PathBuf>,
    unrestricted: bool,
}

impl BoundaryPolicy {
    /// Start building a policy in the given mode.
    pub fn builder(mode: EnforcementMode) -> PolicyBuilder {
        PolicyBuilder::new(mode)
    }

    /// A permissive policy with no roots and no patterns: every request is
    /// allowed, without resolving the working directory.
    ///
    /// Permissive policies from [`PolicyBuilder`] still resolve the working
    /// directory and deny when it can't be resolved.
    pub fn allow_all() -> Self {
        Self {
            mode: EnforcementMode::Permissive,
            roots: Vec::new(),
            patterns: Vec::new(),
            scan_arguments: false,
            home: None,
            unrestricted: true,
        }
    }

    /// The enforcement mode.
    pub fn mode(&self) -> EnforcementMode {
        self.mode
    }

    /// Allowed roots, in declaration order.
    pub fn roots(&self) -> &[AllowedRoot] {
        &self.roots
    }

    /// Destructive patterns, in evaluation order.
    pub fn patterns(&self) -> &[DestructivePattern] {
        &self.patterns
    }

    /// Whether absolute path arguments are checked against the roots.
    pub fn scans_arguments(&self) -> bool {
        self.scan_arguments
    }

    /// Whether `path` is inside any allowed root or admitted companion.
    pub fn admits(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| root.admits(path))
    }

    fn decide(&self, request: &InvocationRequest) -> Verdict {
        if !request.tool().is_shell() {
            return Verdict::allow();
        }

        let command = request.command().trim();
        if command.is_empty() || self.unrestricted {
            return Verdict::allow();
        }

        if let Some(pattern) = self.patterns.iter().find(|p| p.matches(command)) {
            return Violation::DestructivePattern {
                name: pattern.name().to_string(),
            }
            .into();
        }

        let cwd = match resolve_working_dir(request.working_dir()) {
            Ok(cwd) => cwd,
            Err(violation) => return violation.into(),
        };
        if !self.admits(&cwd) {
            return self.out_of_bounds(format!("working directory {}", cwd.display()));
        }

        if self.scan_arguments
            && let Some(argument) = self.first_foreign_argument(command)
        {
            return self.out_of_bounds(format!("argument {argument}"));
        }

        Verdict::allow()
    }

    fn out_of_bounds(&self, subject: String) -> Verdict {
        let expected = self.expected_roots();
        match self.mode {
            EnforcementMode::Enforcing => Violation::PolicyViolation { subject, expected }.into(),
            EnforcementMode::Advisory => {
                Violation::AdvisoryPolicyViolation { subject, expected }.into()
            }
            EnforcementMode::Permissive => Verdict::allow(),
        }
    }

    fn expected_roots(&self) -> String {
        let admitted: Vec<String> = self
            .roots
            .iter()
            .flat_map(AllowedRoot::admitted)
            .map(ToString::to_string)
            .collect();
        if admitted.is_empty() {
            "(none)".to_string()
        } else {
            admitted.join(", ")
        }
    }

    /// First path-like argument that lies outside the boundary.
    ///
    /// Tokens are split on whitespace with any redirect operator and
    /// surrounding quotes stripped; only absolute and `~/` paths are considered.
    fn first_foreign_argument(&self, command: &str) -> Option<String> {
        command
            .split_whitespace()
            .map(|token| redirect_target(token).trim_matches(|c| c == '"' || c == '\''))
            .filter(|token| !DEVICE_SINKS.contains(token))
            .find(|token| {
                self.argument_path(token)
                    .is_some_and(|path| !self.admits(&path))
            })
            .map(str::to_string)
    }

    fn argument_path(&self, token: &str) -> Option<PathBuf> {
        if token == "~" {
            return self.home.clone();
        }
        if let Some(rest) = token.strip_prefix("~/") {
            return self.home.as_ref().map(|home| normalize_lexically(&home.join(rest)));
        }
        if token.starts_with('/') {
            return Some(normalize_lexically(Path::new(token)));
        }
        None
    }
}

impl CommandGate for BoundaryPolicy {
    fn evaluate(&self, request: &InvocationRequest) -> Verdict {
        let verdict = self.decide(request);
        debug!(
            kind = verdict.kind.as_str(),
            violation = verdict.violation.unwrap_or("none"),
            cwd = %request.working_dir().display(),
            "boundary verdict"
        );
        verdict
    }
}

#[derive(Clone, Debug)]
struct RootSpec {
    path: PathBuf,
    access: AccessMode,
    companions: Vec<PathBuf>,
}

/// Builder for creating policies with a fluent API.
///
/// # Example
///
/// ```rust,ignore
/// let policy = PolicyBuilder::enforcing()
///     .cross_access_root("/work/FSI-AgentGov", ["/work/FSI-AgentGov-Solutions"])
///     .default_patterns()
///     .build()?;
/// ```
#[derive(Clone, Debug)]
pub struct PolicyBuilder {
    mode: EnforcementMode,
    roots: Vec<RootSpec>,
    patterns: Vec<(String, String)>,
    scan_arguments: bool,
    home: Option<PathBuf>,
}

impl PolicyBuilder {
    /// Create a builder for the given mode.
    pub fn new(mode: EnforcementMode) -> Self {
        Self {
            mode,
            roots: Vec::new(),
            patterns: Vec::new(),
            scan_arguments: false,
            home: None,
        }
    }

    /// Create a builder whose policy denies out-of-boundary requests.
    pub fn enforcing() -> Self {
        Self::new(EnforcementMode::Enforcing)
    }

    /// Create a builder whose policy warns on out-of-boundary requests.
    pub fn advisory() -> Self {
        Self::new(EnforcementMode::Advisory)
    }

    /// Create a builder whose policy only applies destructive patterns.
    pub fn permissive() -> Self {
        Self::new(EnforcementMode::Permissive)
    }

    /// Add a root that admits only its own tree.
    pub fn strict_root(self, path: impl Into<PathBuf>) -> Self {
        self.root(path, AccessMode::Strict, Vec::<PathBuf>::new())
    }

    /// Add a root that also admits the given companion directories.
    pub fn cross_access_root<I, P>(self, path: impl Into<PathBuf>, companions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.root(path, AccessMode::CrossAccess, companions)
    }

    /// Add a root with an explicit access mode.
    pub fn root<I, P>(mut self, path: impl Into<PathBuf>, access: AccessMode, companions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.roots.push(RootSpec {
            path: path.into(),
            access,
            companions: companions.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Add a named destructive pattern.
    pub fn pattern(mut self, name: impl Into<String>, regex: impl Into<String>) -> Self {
        self.patterns.push((name.into(), regex.into()));
        self
    }

    /// Add the built-in destructive patterns.
    pub fn default_patterns(mut self) -> Self {
        self.patterns.extend(
            DEFAULT_PATTERNS
                .iter()
                .map(|(name, regex)| (name.to_string(), regex.to_string())),
        );
        self
    }

    /// Also check absolute path arguments against the roots.
    pub fn scan_arguments(mut self, scan: bool) -> Self {
        self.scan_arguments = scan;
        self
    }

    /// Home directory used to expand `~/` arguments.
    pub fn home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Validate and build the policy.
    pub fn build(self) -> Result<BoundaryPolicy, PolicyError> {
        if self.roots.is_empty() && self.mode != EnforcementMode::Permissive {
            return Err(PolicyError::NoRoots(self.mode));
        }

        let mut roots = Vec::with_capacity(self.roots.len());
        for entry in self.roots {
            if entry.access == AccessMode::Strict && !entry.companions.is_empty() {
                return Err(PolicyError::CompanionsOnStrictRoot(entry.path));
            }
            let path = anchor(&entry.path)?;
            let companions = entry
                .companions
                .iter()
                .map(|c| anchor(c))
                .collect::<Result<Vec<_>, _>>()?;
            roots.push(AllowedRoot::new(path, entry.access, companions));
        }

        let mut seen = HashSet::new();
        let mut patterns = Vec::with_capacity(self.patterns.len());
        for (name, regex) in self.patterns {
            if !seen.insert(name.clone()) {
                return Err(PolicyError::DuplicatePattern(name));
            }
            patterns.push(DestructivePattern::new(name, regex)?);
        }

        Ok(BoundaryPolicy {
            mode: self.mode,
            roots,
            patterns,
            scan_arguments: self.scan_arguments,
            home: self.home,
            unrestricted: false,
        })
    }
}

/// The target of a redirect glued to its operator (`>out`, `2>>log`, `&>f`,
/// `<in`), or the token itself.
fn redirect_target(token: &str) -> &str {
    let rest = token.trim_start_matches(|c: char| c.is_ascii_digit());
    let rest = rest.strip_prefix('&').unwrap_or(rest);
    rest.strip_prefix(">>")
        .or_else(|| rest.strip_prefix('>'))
        .or_else(|| rest.strip_prefix('<'))
        .unwrap_or(token)
}

fn anchor(path: &Path) -> Result<AnchoredPath, PolicyError> {
    if !path.is_absolute() {
        return Err(PolicyError::RelativeRoot(path.to_path_buf()));
    }
    Ok(AnchoredPath::new(path))
}
