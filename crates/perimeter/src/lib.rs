//! Perimeter: working-directory boundary gate for assistant shell commands
//!
//! Before an automation assistant runs a shell command, Perimeter decides
//! whether the command's working directory lies inside the project's allowed
//! roots and whether the command has a known destructive shape. The answer is
//! a [`Verdict`]: allow, warn, or deny. Perimeter never runs or blocks the
//! command itself; the host enforces the verdict.

mod paths;
mod request;
mod verdict;

pub mod config;
pub mod hook;
pub mod policy;

pub use paths::AnchoredPath;
pub use policy::{BoundaryPolicy, CommandGate, EnforcementMode, PolicyBuilder, PolicyHandle};
pub use request::{InvocationRequest, ToolKind};
pub use verdict::{Verdict, VerdictKind, Violation};
