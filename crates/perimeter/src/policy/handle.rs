//! Shared, reloadable policy.

use std::sync::{Arc, RwLock};

use tracing::info;

use super::boundary::BoundaryPolicy;
use super::handler::CommandGate;
use crate::request::InvocationRequest;
use crate::verdict::Verdict;

/// A policy that can be replaced while requests are being evaluated.
///
/// Each evaluation works on a snapshot `Arc`, so a reload never exposes a
/// half-updated policy. Clones share the same slot.
#[derive(Clone, Debug)]
pub struct PolicyHandle {
    current: Arc<RwLock<Arc<BoundaryPolicy>>>,
}

impl PolicyHandle {
    /// Create a handle holding `policy`.
    pub fn new(policy: BoundaryPolicy) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(policy))),
        }
    }

    /// The policy in force right now.
    pub fn snapshot(&self) -> Arc<BoundaryPolicy> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Swap in a new policy, returning the one it replaced.
    pub fn replace(&self, policy: BoundaryPolicy) -> Arc<BoundaryPolicy> {
        let next = Arc::new(policy);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        info!(mode = %next.mode(), roots = next.roots().len(), "policy replaced");
        std::mem::replace(&mut *guard, next)
    }
}

impl CommandGate for PolicyHandle {
    fn evaluate(&self, request: &InvocationRequest) -> Verdict {
        self.snapshot().evaluate(request)
    }
}
