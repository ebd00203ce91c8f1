//! Generation gate: invocation-recency tracking for the orchestration loop
//!
//! Every user utterance starts a new *generation*. An in-flight invocation
//! holds the token it was stamped with and asks the gate, at each of its
//! check points, whether a newer invocation has begun since. The gate is a
//! cooperative cancellation signal only: it never interrupts in-flight I/O
//! and never undoes side effects issued before a conflict is observed.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generation stamp captured when an invocation begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InvocationToken {
    generation: u64,
}

impl InvocationToken {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// Process-wide generation counter, shared by all orchestrator invocations.
///
/// Starts at zero; every `begin_invocation` yields a value strictly greater
/// than any value handed out before.
#[derive(Debug, Default)]
pub struct GenerationGate {
    counter: AtomicU64,
}

impl GenerationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter and return a token for the new generation
    pub fn begin_invocation(&self) -> InvocationToken {
        let generation = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, "Began invocation");
        InvocationToken { generation }
    }

    /// True iff some invocation began after `token` was issued
    pub fn has_conflict(&self, token: InvocationToken) -> bool {
        let latest = self.counter.load(Ordering::SeqCst);
        let conflict = latest > token.generation;
        if conflict {
            tracing::info!(
                generation = token.generation,
                latest,
                "Concurrency conflict detected"
            );
        }
        conflict
    }

    /// Latest generation handed out (0 before the first invocation)
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}
