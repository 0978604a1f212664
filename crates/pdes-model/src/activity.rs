//! Activity and work-group declarations.
//!
//! An activity is a task an element can perform; it owns an ordered list of
//! work groups, each a set of `(role, count)` requirements plus an
//! eligibility condition and, for time-driven activities, a duration sampler.
//! There is no activity class hierarchy: a single type carries an explicit
//! [`ExecutionKind`] tag and per-work-group optional durations.

use std::sync::Arc;

use pdes_core::ResourceTypeId;

use crate::{Condition, DurationSampler};

// ── ExecutionKind ─────────────────────────────────────────────────────────────

/// How an activity consumes simulated time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExecutionKind {
    /// Completes within the timestamp it starts at.
    Instant,

    /// Holds its resources for a sampled duration. When `interruptible`, a
    /// resource availability window closing mid-execution suspends the
    /// activity with its residual duration instead of overrunning.
    TimeDriven { interruptible: bool },
}

impl ExecutionKind {
    /// Non-interruptible time-driven execution (the common case).
    pub fn time_driven() -> Self {
        ExecutionKind::TimeDriven { interruptible: false }
    }

    /// Time-driven execution that suspends when a held resource expires.
    pub fn interruptible() -> Self {
        ExecutionKind::TimeDriven { interruptible: true }
    }

    pub fn is_time_driven(self) -> bool {
        matches!(self, ExecutionKind::TimeDriven { .. })
    }

    pub fn is_interruptible(self) -> bool {
        matches!(self, ExecutionKind::TimeDriven { interruptible: true })
    }
}

// ── WorkGroup ─────────────────────────────────────────────────────────────────

/// One concrete way of performing an activity: the roles and counts it needs,
/// who may use it, and how long it takes.
#[derive(Clone)]
pub struct WorkGroup {
    /// Selection priority; lower values are tried first, ties by declaration
    /// order.
    pub priority: u8,

    /// Required `(role, count)` pairs. Counts are at least 1.
    pub needs: Vec<(ResourceTypeId, u32)>,

    /// Eligibility predicate over the requesting element.
    pub condition: Arc<dyn Condition>,

    /// Duration sampler; present exactly when the owning activity is
    /// time-driven.
    pub duration: Option<Arc<dyn DurationSampler>>,
}

// ── Activity ──────────────────────────────────────────────────────────────────

/// A task an element can perform through one of several work groups.
///
/// Immutable after model construction.
#[derive(Clone)]
pub struct Activity {
    pub name: String,

    /// Queue priority; lower values are served first.
    pub priority: u8,

    pub kind: ExecutionKind,

    /// Work groups in declaration order. Selection order is by
    /// `(priority, declaration index)` — precomputed in the frozen model.
    pub workgroups: Vec<WorkGroup>,

    /// Post-use unavailability periods: after a resource caught for `role` is
    /// released, it stays unavailable for `duration` more time units.
    pub cancellation: Vec<(ResourceTypeId, u64)>,
}

impl Activity {
    /// The cancellation period declared for `role`, if any.
    pub fn cancellation_for(&self, role: ResourceTypeId) -> Option<u64> {
        self.cancellation
            .iter()
            .find(|(r, _)| *r == role)
            .map(|&(_, d)| d)
    }
}
