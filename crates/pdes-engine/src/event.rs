//! Discrete events and the future-event queue.
//!
//! # Why a sparse queue
//!
//! Most timestamps carry no events. `EventQueue` keys buckets by timestamp in
//! a `BTreeMap`, so the round loop pops the minimum timestamp in O(log W)
//! where W is the number of distinct future timestamps — the clock jumps
//! straight from one populated timestamp to the next instead of ticking
//! through empty ones.
//!
//! Events sharing a timestamp are deliberately unordered: causal dependency
//! within a timestamp is enforced by the two-phase barrier, not by intra-bucket
//! ordering, which is what makes the bucket shardable across workers.

use std::collections::BTreeMap;

use pdes_core::{ElementId, GeneratorId, ResourceId, ResourceTypeId, SimTime};

// ── DiscreteEvent ─────────────────────────────────────────────────────────────

/// A timestamped unit of work, executed by whichever worker its round shard
/// lands on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DiscreteEvent {
    /// A timetable window opens: `resource` provides `role` until `until`.
    RoleOn {
        resource: ResourceId,
        role:     ResourceTypeId,
        until:    SimTime,
    },

    /// A timetable window closes. Deferred, never dropped, while the resource
    /// is still legitimately held.
    RoleOff {
        resource: ResourceId,
        role:     ResourceTypeId,
    },

    /// A post-use cancellation window closes and capacity becomes visible
    /// again.
    CancelOff {
        resource: ResourceId,
        role:     ResourceTypeId,
    },

    /// A generator fires and requests new elements.
    GeneratorFire { generator: GeneratorId },

    /// An element requests the next activity of its flow.
    RequestActivity { element: ElementId },

    /// A time-driven execution completes. `serial` guards against stale
    /// events outliving their work item.
    FinishActivity { element: ElementId, serial: u32 },

    /// A held resource's availability window closes before the planned end of
    /// an interruptible execution.
    InterruptActivity { element: ElementId, serial: u32 },
}

// ── EventQueue ────────────────────────────────────────────────────────────────

/// The future-event list: timestamp buckets, popped in ascending order.
#[derive(Default)]
pub struct EventQueue {
    inner: BTreeMap<SimTime, Vec<DiscreteEvent>>,
    /// Cached total event count for O(1) `len()`.
    total: usize,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` at `ts`.
    pub fn push(&mut self, ts: SimTime, event: DiscreteEvent) {
        self.inner.entry(ts).or_default().push(event);
        self.total += 1;
    }

    /// The earliest timestamp with at least one queued event.
    pub fn next_time(&self) -> Option<SimTime> {
        self.inner.keys().next().copied()
    }

    /// Remove and return the earliest bucket.
    pub fn drain_next(&mut self) -> Option<(SimTime, Vec<DiscreteEvent>)> {
        let ts = self.next_time()?;
        let events = self.inner.remove(&ts)?;
        self.total -= events.len();
        Some((ts, events))
    }

    /// Total number of queued events across all future timestamps.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
