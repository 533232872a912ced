//! The gate trait.

use std::sync::Arc;

use crate::request::InvocationRequest;
use crate::verdict::Verdict;

/// Trait for anything that can rule on an invocation request.
///
/// Implementations must be deterministic, side-effect free and infallible:
/// internal failures are reported as a `Deny` verdict, never as a panic.
pub trait CommandGate: Send + Sync {
    /// Evaluate a request and return exactly one verdict.
    fn evaluate(&self, request: &InvocationRequest) -> Verdict;
}

// Implement CommandGate for Arc<dyn CommandGate> to allow dynamic dispatch
impl CommandGate for Arc<dyn CommandGate> {
    fn evaluate(&self, request: &InvocationRequest) -> Verdict {
        (**self).evaluate(request)
    }
}
