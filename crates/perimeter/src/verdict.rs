//! Verdicts returned by the gate.

use serde::Serialize;
use thiserror::Error;

/// The gating decision for a command.
///
/// Variants are ordered by severity: `Allow < Warn < Deny`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictKind {
    /// The command runs silently.
    Allow,
    /// The command runs, but the reason is surfaced to the operator.
    Warn,
    /// The command must not run.
    Deny,
}

impl VerdictKind {
    /// Lowercase string for JSON output (`"allow"`, `"warn"`, `"deny"`).
    pub fn as_str(self) -> &'static str {
        match self {
            VerdictKind::Allow => "allow",
            VerdictKind::Warn => "warn",
            VerdictKind::Deny => "deny",
        }
    }

    /// Uppercase label for human-readable output (`"ALLOW"`, `"WARN"`, `"DENY"`).
    pub fn label(self) -> &'static str {
        match self {
            VerdictKind::Allow => "ALLOW",
            VerdictKind::Warn => "WARN",
            VerdictKind::Deny => "DENY",
        }
    }
}

/// Why a request was not silently allowed.
///
/// The `Display` output is the operator-facing reason text.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Violation {
    /// The working directory could not be canonicalized.
    #[error("unresolvable working directory {path:?}: {detail}")]
    UnresolvablePath {
        /// The directory as submitted.
        path: String,
        /// What went wrong while resolving it.
        detail: String,
    },
    /// Outside every allowed root under an enforcing policy.
    #[error("{subject} is outside the allowed roots: {expected}")]
    PolicyViolation {
        /// What crossed the boundary (directory or argument).
        subject: String,
        /// The roots the policy admits.
        expected: String,
    },
    /// Outside every allowed root under an advisory policy.
    #[error("{subject} is outside the allowed roots (advisory): {expected}")]
    AdvisoryPolicyViolation {
        /// What crossed the boundary (directory or argument).
        subject: String,
        /// The roots the policy admits.
        expected: String,
    },
    /// The command matched a hard-blocked pattern.
    #[error("command matches destructive pattern '{name}'")]
    DestructivePattern {
        /// Name of the matched pattern.
        name: String,
    },
}

impl Violation {
    /// The verdict this violation surfaces as.
    pub fn kind(&self) -> VerdictKind {
        match self {
            Violation::AdvisoryPolicyViolation { .. } => VerdictKind::Warn,
            Violation::UnresolvablePath { .. }
            | Violation::PolicyViolation { .. }
            | Violation::DestructivePattern { .. } => VerdictKind::Deny,
        }
    }

    /// Stable snake_case class name for logs and JSON.
    pub fn class(&self) -> &'static str {
        match self {
            Violation::UnresolvablePath { .. } => "unresolvable_path",
            Violation::PolicyViolation { .. } => "policy_violation",
            Violation::AdvisoryPolicyViolation { .. } => "advisory_policy_violation",
            Violation::DestructivePattern { .. } => "destructive_pattern",
        }
    }
}

/// The result of evaluating one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// The decision.
    pub kind: VerdictKind,
    /// Human-readable explanation, absent for a silent allow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Violation class, absent for a silent allow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<&'static str>,
}

impl Verdict {
    /// A silent allow.
    pub fn allow() -> Self {
        Self {
            kind: VerdictKind::Allow,
            reason: None,
            violation: None,
        }
    }

    /// Returns true if the command may run (`Allow` or `Warn`).
    pub fn is_allowed(&self) -> bool {
        self.kind != VerdictKind::Deny
    }

    /// Returns true if the command must not run.
    pub fn is_denied(&self) -> bool {
        self.kind == VerdictKind::Deny
    }

    /// The reason text, if any.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl From<Violation> for Verdict {
    fn from(violation: Violation) -> Self {
        Self {
            kind: violation.kind(),
            reason: Some(violation.to_string()),
            violation: Some(violation.class()),
        }
    }
}
