//! Runtime availability state of one resource.
//!
//! The per-(resource, role) state machine is `Unavailable → Available →
//! Unavailable → …`, driven by the timetable's `RoleOn`/`RoleOff` events,
//! with an orthogonal cancellation overlay that can suspend availability
//! without consuming a schedule slot.
//!
//! Counter bookkeeping: `counted` records which roles of this resource are
//! currently contributing to the global per-role availability counters. Every
//! counter mutation goes through an insert/remove on that set, so no sequence
//! of on/off/catch/release/cancel transitions can double-count — releasing
//! twice, or closing a window that a later `RoleOn` re-opened, are natural
//! no-ops.

use std::sync::Arc;

use pdes_core::{ResourceTypeId, SimTime, WorkItemId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::zone::ConflictZone;

/// A tentative claim on a resource. Several work items may book the same
/// resource simultaneously; exactly one converts its booking into the catch.
pub struct Booking {
    pub who:  WorkItemId,
    pub zone: Arc<ConflictZone>,
}

/// Outcome of releasing a caught resource.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The availability window is still open; the timestamp may be reused.
    Fresh,
    /// The window elapsed while the resource was held; the caller must not
    /// reuse the timestamp for scheduling.
    Stale,
}

/// Mutable runtime state of one resource, guarded by its own mutex in the
/// kernel registry.
#[derive(Default)]
pub struct ResourceState {
    /// Open availability windows: role → window end.
    pub avail: FxHashMap<ResourceTypeId, SimTime>,

    /// Roles currently contributing to the global availability counters.
    pub counted: FxHashSet<ResourceTypeId>,

    /// Tentative claims, in booking order.
    pub booked: Vec<Booking>,

    /// The exclusive hold: a resource is caught for at most one role at a
    /// time.
    pub caught: Option<(WorkItemId, ResourceTypeId)>,

    /// Cancellation overlay: role → overlay end.
    pub cancelled: FxHashMap<ResourceTypeId, SimTime>,

    /// A `RoleOff` that arrived while the resource was still held; finalized
    /// when the holder releases.
    pub deferred_off: Option<ResourceTypeId>,
}

impl ResourceState {
    /// `true` while the availability window for `role` is open at `now`.
    #[inline]
    pub fn window_open(&self, role: ResourceTypeId, now: SimTime) -> bool {
        self.avail.get(&role).is_some_and(|&end| end > now)
    }

    #[inline]
    pub fn is_cancelled(&self, role: ResourceTypeId) -> bool {
        self.cancelled.contains_key(&role)
    }

    /// `true` if `who` holds a tentative booking here.
    pub fn booked_by(&self, who: WorkItemId) -> bool {
        self.booked.iter().any(|b| b.who == who)
    }

    /// Can a new booking for `role` be placed at `now`?
    ///
    /// A caught resource is not bookable for any role — a resource serves at
    /// most one role at a time. Existing bookings by *other* work items do
    /// not block a new booking; they merge conflict zones instead.
    pub fn bookable(&self, role: ResourceTypeId, now: SimTime) -> bool {
        self.caught.is_none() && self.window_open(role, now) && !self.is_cancelled(role)
    }

    /// Drop `who`'s tentative booking, if any.
    pub fn unbook(&mut self, who: WorkItemId) {
        self.booked.retain(|b| b.who != who);
    }

    /// Clear the hold by `who` for `role`.
    ///
    /// Returns `None` when `who` does not hold the resource — releasing twice
    /// is a no-op and never touches the counters. `Stale` warns the caller
    /// that the availability window elapsed while the resource was held.
    pub fn release(
        &mut self,
        who:  WorkItemId,
        role: ResourceTypeId,
        now:  SimTime,
    ) -> Option<ReleaseOutcome> {
        if self.caught != Some((who, role)) {
            return None;
        }
        self.caught = None;
        if self.window_open(role, now) {
            Some(ReleaseOutcome::Fresh)
        } else {
            Some(ReleaseOutcome::Stale)
        }
    }
}
