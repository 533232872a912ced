//! Assistant hook protocol.
//!
//! The host runs the hook before each tool call, writing one JSON object to
//! its stdin:
//!
//! ```json
//! {"tool_name": "Bash", "tool_input": {"command": "ls"}, "cwd": "/work/repo"}
//! ```
//!
//! and reads one JSON object back from stdout:
//!
//! | verdict | output |
//! |---|---|
//! | `Allow` | `{"decision":"allow"}` |
//! | `Warn` | `{"decision":"allow","message":"..."}` |
//! | `Deny` | `{"decision":"block","reason":"..."}` |
//!
//! Input that can't be read or parsed is blocked, as is any payload arriving
//! while the policy is unavailable.

use std::io::Read;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::policy::CommandGate;
use crate::request::{InvocationRequest, ToolKind};
use crate::verdict::{Verdict, VerdictKind};

/// Longest command excerpt echoed back in a block reason, in characters.
const COMMAND_EXCERPT_CHARS: usize = 100;

/// Failures answering a hook payload. Each one becomes a block.
#[derive(Debug, Error)]
pub enum HookError {
    /// The payload isn't valid hook JSON.
    #[error("malformed hook input: {0}")]
    MalformedInput(#[from] serde_json::Error),
    /// The payload couldn't be read.
    #[error("cannot read hook input: {0}")]
    ReadInput(#[from] std::io::Error),
    /// No policy could be loaded.
    #[error("policy unavailable: {0}")]
    PolicyUnavailable(String),
}

/// Hook payload sent by the host.
#[derive(Debug, Default, Deserialize)]
pub struct HookInput {
    /// Host name of the tool being invoked (`Bash` for shell execution).
    #[serde(default)]
    pub tool_name: Option<String>,
    /// Tool arguments.
    #[serde(default)]
    pub tool_input: ToolInput,
    /// Directory the tool would run in.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Hook event (`PreToolUse`, `PostToolUse`).
    #[serde(default)]
    pub hook_event_name: Option<String>,
    /// Host session identifier, for logs.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// The subset of tool arguments the gate reads.
#[derive(Debug, Default, Deserialize)]
pub struct ToolInput {
    /// Shell command text.
    #[serde(default)]
    pub command: Option<String>,
}

impl HookInput {
    /// Turn the payload into a gate request.
    ///
    /// Returns `None` when there is no command to check. A missing `cwd`
    /// falls back to `fallback_cwd`; with neither, the request carries an
    /// empty directory, which the gate refuses to resolve.
    pub fn into_request(self, fallback_cwd: Option<PathBuf>) -> Option<InvocationRequest> {
        let command = self.tool_input.command.filter(|c| !c.is_empty())?;
        let tool = self
            .tool_name
            .as_deref()
            .map_or(ToolKind::Shell, ToolKind::from_host_name);
        let cwd = self.cwd.or(fallback_cwd).unwrap_or_default();
        Some(InvocationRequest::new(tool, command, cwd))
    }
}

/// The host-facing decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookDecision {
    /// Let the tool run.
    Allow,
    /// Stop the tool.
    Block,
}

/// Hook response written to stdout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HookOutput {
    /// The decision.
    pub decision: HookDecision,
    /// Why the tool was blocked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Warning shown to the operator while still allowing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HookOutput {
    /// A silent allow.
    pub fn allow() -> Self {
        Self {
            decision: HookDecision::Allow,
            reason: None,
            message: None,
        }
    }

    /// A block with the given reason.
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: HookDecision::Block,
            reason: Some(reason.into()),
            message: None,
        }
    }

    /// Render a gate verdict for the host.
    pub fn from_verdict(verdict: &Verdict, request: &InvocationRequest) -> Self {
        let reason = verdict.reason().unwrap_or("denied by policy");
        match verdict.kind {
            VerdictKind::Allow => Self::allow(),
            VerdictKind::Warn => Self {
                decision: HookDecision::Allow,
                reason: None,
                message: Some(format!("Boundary warning: {reason}")),
            },
            VerdictKind::Deny => Self::block(format!(
                "Boundary check failed: {reason}\nWorking directory: {}\nCommand: {}",
                request.working_dir().display(),
                excerpt(request.command()),
            )),
        }
    }

    /// Block because the payload couldn't be answered.
    pub fn from_error(error: &HookError) -> Self {
        Self::block(format!("Boundary check failed: {error}"))
    }

    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"decision":"block","reason":"failed to encode hook response"}"#.to_string()
        })
    }
}

/// Read a whole hook payload.
pub fn read_input(mut reader: impl Read) -> Result<String, HookError> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;
    Ok(raw)
}

/// Answer one pre-tool-use payload.
///
/// Empty input and payloads without a command are allowed; malformed JSON is
/// blocked.
pub fn respond(raw: &str, gate: &dyn CommandGate, fallback_cwd: Option<PathBuf>) -> HookOutput {
    if raw.trim().is_empty() {
        return HookOutput::allow();
    }

    let input: HookInput = match serde_json::from_str(raw).map_err(HookError::from) {
        Ok(input) => input,
        Err(error) => {
            warn!(%error, "blocking hook payload");
            return HookOutput::from_error(&error);
        }
    };

    let session = input.session_id.clone().unwrap_or_default();
    let Some(request) = input.into_request(fallback_cwd) else {
        return HookOutput::allow();
    };

    let verdict = gate.evaluate(&request);
    if verdict.kind != VerdictKind::Allow {
        warn!(
            session = %session,
            kind = verdict.kind.as_str(),
            reason = verdict.reason().unwrap_or_default(),
            "command flagged"
        );
    }
    HookOutput::from_verdict(&verdict, &request)
}

fn excerpt(command: &str) -> String {
    let mut chars = command.chars();
    let head: String = chars.by_ref().take(COMMAND_EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::policy::{BoundaryPolicy, PolicyBuilder};
    use serde_json::{Value, json};

    fn policy(root: &std::path::Path) -> BoundaryPolicy {
        PolicyBuilder::enforcing()
            .strict_root(root)
            .default_patterns()
            .build()
            .expect("build policy")
    }

    fn as_value(output: &HookOutput) -> Value {
        serde_json::from_str(&output.to_json()).expect("valid json")
    }

    #[test]
    fn test_empty_input_allows() {
        let output = respond("  \n", &BoundaryPolicy::allow_all(), None);
        assert_eq!(as_value(&output), json!({"decision": "allow"}));
    }

    #[test]
    fn test_malformed_input_blocks() {
        let output = respond("{not json", &BoundaryPolicy::allow_all(), None);
        assert_eq!(output.decision, HookDecision::Block);
        assert_eq!(
            output.reason.as_deref().map(|r| r.starts_with(
                "Boundary check failed: malformed hook input:"
            )),
            Some(true),
            "{output:?}"
        );
    }

    struct BrokenPipe;

    impl Read for BrokenPipe {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))
        }
    }

    #[test]
    fn test_read_input() {
        let raw = read_input(&b"{\"tool_input\": {}}"[..]).unwrap();
        assert_eq!(raw, r#"{"tool_input": {}}"#);

        let err = read_input(BrokenPipe).unwrap_err();
        assert!(matches!(err, HookError::ReadInput(_)));
        let output = HookOutput::from_error(&err);
        assert_eq!(output.decision, HookDecision::Block);
        assert_eq!(
            output.reason.as_deref(),
            Some("Boundary check failed: cannot read hook input: pipe closed")
        );
    }

    #[test]
    fn test_policy_unavailable_blocks() {
        let err = HookError::PolicyUnavailable("no policy file".into());
        assert_eq!(
            as_value(&HookOutput::from_error(&err)),
            json!({
                "decision": "block",
                "reason": "Boundary check failed: policy unavailable: no policy file",
            })
        );
    }

    #[test]
    fn test_missing_command_allows() {
        let raw = r#"{"tool_name": "Bash", "tool_input": {}}"#;
        assert_eq!(
            respond(raw, &BoundaryPolicy::allow_all(), None),
            HookOutput::allow()
        );
    }

    #[test]
    fn test_inside_and_outside() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let policy = policy(&repo);

        let inside = json!({
            "tool_name": "Bash",
            "tool_input": {"command": "ls"},
            "cwd": repo,
        });
        assert_eq!(
            respond(&inside.to_string(), &policy, None),
            HookOutput::allow()
        );

        let outside = json!({
            "tool_name": "Bash",
            "tool_input": {"command": "ls"},
            "cwd": dir.path(),
        });
        let output = respond(&outside.to_string(), &policy, None);
        assert_eq!(output.decision, HookDecision::Block);
        let reason = output.reason.unwrap();
        assert!(reason.starts_with("Boundary check failed:"), "{reason}");
        assert!(reason.contains("Command: ls"), "{reason}");
    }

    #[test]
    fn test_fallback_cwd_is_used() {
        let dir = tempfile::tempdir().expect("tempdir");
        let policy = policy(dir.path());
        let raw = r#"{"tool_name": "Bash", "tool_input": {"command": "ls"}}"#;

        assert_eq!(
            respond(raw, &policy, Some(dir.path().to_path_buf())),
            HookOutput::allow()
        );
        assert_eq!(respond(raw, &policy, None).decision, HookDecision::Block);
    }

    #[test]
    fn test_warn_allows_with_message() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let policy = PolicyBuilder::advisory().strict_root(&repo).build().unwrap();

        let raw = json!({"tool_input": {"command": "ls"}, "cwd": dir.path()});
        let value = as_value(&respond(&raw.to_string(), &policy, None));
        assert_eq!(value["decision"], "allow");
        assert!(value.get("reason").is_none());
        assert!(
            value["message"]
                .as_str()
                .unwrap()
                .starts_with("Boundary warning:")
        );
    }

    #[test]
    fn test_other_tools_pass_through() {
        let dir = tempfile::tempdir().expect("tempdir");
        let policy = policy(&dir.path().join("repo"));
        let raw = json!({"tool_name": "Write", "tool_input": {"command": "rm -rf /"}, "cwd": "/"});
        assert_eq!(
            respond(&raw.to_string(), &policy, None),
            HookOutput::allow()
        );
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(150);
        let out = excerpt(&long);
        assert_eq!(out.chars().count(), COMMAND_EXCERPT_CHARS + 3);
        assert!(out.ends_with("..."));
        assert_eq!(excerpt("ls"), "ls");
    }
}
