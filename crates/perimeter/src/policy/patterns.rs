//! Destructive command patterns.

use regex_lite::{Regex, RegexBuilder};

use super::PolicyError;

/// Patterns denied out of the box, as `(name, regex)` pairs.
///
/// All patterns are matched case-insensitively against the whole command.
pub const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    (
        "recursive-delete-root",
        r#"(?:^|[\s;&|(])\\?(?:\S*/)?rm\s+(?:-{1,2}[a-z-]+\s+)*["']?/\*?["']?(?:\s|[;&|)]|$)"#,
    ),
    (
        "recursive-delete-home",
        r#"(?:^|[\s;&|(])\\?(?:\S*/)?rm\s+(?:-{1,2}[a-z-]+\s+)*["']?(?:~|\$home|\$\{home\})/?\*?["']?(?:\s|[;&|)]|$)"#,
    ),
    ("excessive-traversal", r"(?:\.\./){4,}"),
    (
        "filesystem-format",
        r"(?:^|[\s;&|(])\\?(?:\S*/)?mkfs(?:\.[a-z0-9]+)?(?:\s|$)",
    ),
    (
        "raw-device-write",
        r#"(?:^|[\s;&|(])\\?(?:\S*/)?dd\s+.*\bof=["']?/dev/(?:sd|hd|vd|xvd|nvme|disk|mmcblk)"#,
    ),
    ("fork-bomb", r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:"),
];

/// A named command shape that is denied regardless of directory.
#[derive(Clone, Debug)]
pub struct DestructivePattern {
    name: String,
    source: String,
    regex: Regex,
}

impl DestructivePattern {
    /// Compile a named pattern.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Result<Self, PolicyError> {
        let name = name.into();
        let source = source.into();
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| PolicyError::InvalidPattern {
                name: name.clone(),
                source: e,
            })?;
        Ok(Self {
            name,
            source,
            regex,
        })
    }

    /// The pattern's name, used in verdict reasons.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The regex source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns true if the command has this shape.
    pub fn matches(&self, command: &str) -> bool {
        self.regex.is_match(command)
    }
}
