//! Boundary policies for shell command execution.
//!
//! A policy is an ordered list of allowed roots, an explicit enforcement
//! mode and a set of destructive command patterns. Evaluating a request
//! against it yields exactly one [`Verdict`](crate::Verdict).
//!
//! ## Evaluation order
//!
//! 1. Requests from tools other than the shell, and empty commands, are allowed.
//!    So is everything under [`BoundaryPolicy::allow_all`].
//! 2. A destructive pattern match is denied, whatever the directory or mode.
//! 3. The working directory is canonicalized; failure is denied in every mode.
//! 4. A directory outside every root is denied (enforcing), warned (advisory)
//!    or allowed (permissive).
//! 5. With argument scanning on, absolute path arguments get the same check.
//!
//! ## Example
//!
//! ```rust,ignore
//! use perimeter::policy::PolicyBuilder;
//! use perimeter::{CommandGate, InvocationRequest};
//!
//! let policy = PolicyBuilder::enforcing()
//!     .cross_access_root("/work/FSI-AgentGov", ["/work/FSI-AgentGov-Solutions"])
//!     .default_patterns()
//!     .build()?;
//!
//! let verdict = policy.evaluate(&InvocationRequest::shell("ls", "/tmp"));
//! assert!(verdict.is_denied());
//! ```

mod boundary;
mod handle;
mod handler;
mod patterns;
mod root;

pub use boundary::{BoundaryPolicy, PolicyBuilder, PolicyError};
pub use handle::PolicyHandle;
pub use handler::CommandGate;
pub use patterns::{DEFAULT_PATTERNS, DestructivePattern};
pub use root::{AccessMode, AllowedRoot, EnforcementMode};
