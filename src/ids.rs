//! Rule-instance identifier allocation.
//!
//! A single allocator is created per compilation pass and passed explicitly
//! to every builder — never ambient or global. Backed by an atomic so the
//! per-field phases may be parallelized without losing monotonicity;
//! determinism of the assigned ids comes from running assembly in stable
//! input order.

use std::sync::atomic::{AtomicI64, Ordering};

use formrule_types::RuleId;

/// Monotonic sequence generator for rule-instance ids, starting at 1.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicI64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: RuleId) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }

    /// Allocate the next id. Never returns the same value twice.
    pub fn next_id(&self) -> RuleId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
