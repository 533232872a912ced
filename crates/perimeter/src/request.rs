//! Invocation requests submitted to the gate.

use std::path::{Path, PathBuf};

/// The tool asking the host to run something.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolKind {
    /// Shell execution (`Bash` in assistant hook payloads).
    Shell,
    /// Any other tool, identified by the host's name for it.
    Other(String),
}

impl ToolKind {
    /// Map a host tool name onto a tool kind.
    ///
    /// `Bash` and `Shell` (any case) are shell execution; everything else is
    /// kept verbatim.
    pub fn from_host_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("bash") || name.eq_ignore_ascii_case("shell") {
            ToolKind::Shell
        } else {
            ToolKind::Other(name.to_string())
        }
    }

    /// Returns true for shell execution.
    pub fn is_shell(&self) -> bool {
        matches!(self, ToolKind::Shell)
    }
}

/// A proposed command and the directory it would run in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationRequest {
    tool: ToolKind,
    command: String,
    working_dir: PathBuf,
}

impl InvocationRequest {
    /// Create a request for an arbitrary tool.
    pub fn new(tool: ToolKind, command: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            command: command.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Create a shell execution request.
    pub fn shell(command: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self::new(ToolKind::Shell, command, working_dir)
    }

    /// The tool that issued the request.
    pub fn tool(&self) -> &ToolKind {
        &self.tool
    }

    /// The command text, exactly as submitted.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The working directory, exactly as submitted (not yet resolved).
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}
