//! Work items and the resource-acquisition protocol.
//!
//! A work item is one element's in-flight attempt to execute one activity.
//! Acquisition assembles a tentative [`Solution`] — bookings on every
//! resource the chosen work group needs — and converts it into committed
//! catches through a single consuming commit, or abandons it wholesale.
//!
//! Local resources (all roles in the booking manager's own partition) book
//! and commit directly: the manager's phase-2 exclusivity already serializes
//! them. A cross-partition resource instead merges the work item's conflict
//! zone with every current booker's zone before the booking counts, and the
//! commit runs under the zone's ordered gate stack (see [`crate::zone`]).

use std::sync::Arc;

use pdes_core::{ActivityId, ResourceId, ResourceTypeId, SimTime, WorkItemId};

use crate::engine::Shared;
use crate::guard;
use crate::resource::Booking;
use crate::zone::{ConflictZone, Gate};

// ── WorkItem ──────────────────────────────────────────────────────────────────

/// One element's in-flight activity request.
pub struct WorkItem {
    pub id:       WorkItemId,
    pub activity: ActivityId,

    /// Timestamp of the original request; re-queued (interrupted) items keep
    /// it, preserving their FIFO rank.
    pub arrival_ts: SimTime,

    /// Residual duration of an interrupted execution, consumed on restart.
    pub remaining: Option<u64>,

    /// Planned completion of the current execution.
    pub planned_end: SimTime,

    /// Committed catches of the current execution.
    pub caught: Vec<(ResourceId, ResourceTypeId)>,

    /// Conflict zone of the current acquisition attempt.
    pub zone: Arc<ConflictZone>,

    /// This work item's gate in the zone's stack.
    pub gate: Arc<Gate>,
}

impl WorkItem {
    pub fn new(id: WorkItemId, activity: ActivityId, arrival_ts: SimTime) -> Self {
        let gate = Gate::new();
        Self {
            id,
            activity,
            arrival_ts,
            remaining: None,
            planned_end: arrival_ts,
            caught: Vec::new(),
            zone: ConflictZone::singleton(id, Arc::clone(&gate)),
            gate,
        }
    }

    /// Leave the current zone and start the next acquisition attempt in a
    /// fresh singleton.
    pub fn reset_zone(&mut self) {
        ConflictZone::leave(&self.zone, self.id);
        self.zone = ConflictZone::singleton(self.id, Arc::clone(&self.gate));
    }
}

// ── Acquisition ───────────────────────────────────────────────────────────────

/// A committed hold on one resource.
pub struct CaughtResource {
    pub resource: ResourceId,
    pub role:     ResourceTypeId,
    /// End of the availability window at commit time; bounds interruptible
    /// executions.
    pub window_end: SimTime,
}

pub enum AcquireOutcome {
    Acquired(Vec<CaughtResource>),
    /// The race for a shared resource was lost, or capacity evaporated
    /// between the feasibility check and booking. The item stays queued.
    Lost,
}

/// The tentative solution: bookings collected so far.
///
/// Consumed exactly once — by [`commit`](Solution::commit) on success or
/// [`abandon`](Solution::abandon) on failure — so a released booking can
/// never be reused.
struct Solution {
    item:   WorkItemId,
    booked: Vec<(ResourceId, ResourceTypeId)>,
}

impl Solution {
    fn new(item: WorkItemId) -> Self {
        Self { item, booked: Vec::new() }
    }

    fn contains(&self, resource: ResourceId) -> bool {
        self.booked.iter().any(|&(r, _)| r == resource)
    }

    /// Re-validate every booking and convert them all into catches.
    ///
    /// Another work item may have finished booking first and taken a shared
    /// resource; in that case every partial claim is released and `None` is
    /// returned.
    fn commit(self, shared: &Shared, now: SimTime) -> Option<Vec<CaughtResource>> {
        let valid = self.booked.iter().all(|&(rid, role)| {
            let res = guard(&shared.resources[rid.index()]);
            res.caught.is_none()
                && res.window_open(role, now)
                && !res.is_cancelled(role)
                && res.booked_by(self.item)
        });
        if !valid {
            self.abandon(shared);
            return None;
        }

        let mut catches = Vec::with_capacity(self.booked.len());
        for &(rid, role) in &self.booked {
            let mut res = guard(&shared.resources[rid.index()]);
            res.caught = Some((self.item, role));
            res.unbook(self.item);
            if res.counted.remove(&role) {
                shared.counter(role).fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            }
            let window_end = res.avail.get(&role).copied().unwrap_or(SimTime::NEVER);
            catches.push(CaughtResource { resource: rid, role, window_end });
        }
        Some(catches)
    }

    /// Release every partial claim.
    fn abandon(self, shared: &Shared) {
        for &(rid, _) in &self.booked {
            guard(&shared.resources[rid.index()]).unbook(self.item);
        }
    }
}

/// Attempt to acquire every resource the chosen work group requires, as one
/// atomic solution.
pub(crate) fn try_acquire(
    shared:   &Shared,
    item:     WorkItemId,
    activity: ActivityId,
    wg_idx:   usize,
    now:      SimTime,
) -> AcquireOutcome {
    let zone = {
        let el = guard(&shared.elements[item.element.index()]);
        match el.work.as_ref() {
            Some(wi) if wi.id == item => Arc::clone(&wi.zone),
            _ => return AcquireOutcome::Lost,
        }
    };
    let needs = &shared.model.activities[activity.index()].workgroups[wg_idx].needs;

    // ── Booking scan ──────────────────────────────────────────────────────
    let mut solution = Solution::new(item);
    let mut cross = false;
    for &(role, count) in needs {
        let mut got = 0_u32;
        for &rid in &shared.model.providers_of_type[role.index()] {
            if got == count {
                break;
            }
            // A resource serves one role at a time, so one booking per
            // resource per solution.
            if solution.contains(rid) {
                continue;
            }
            let mut merge_zones = Vec::new();
            {
                let mut res = guard(&shared.resources[rid.index()]);
                if !res.bookable(role, now) {
                    continue;
                }
                if shared.model.resource_cross[rid.index()] {
                    cross = true;
                    merge_zones.extend(res.booked.iter().map(|b| Arc::clone(&b.zone)));
                }
                res.booked.push(Booking { who: item, zone: Arc::clone(&zone) });
            }
            // Union with every current booker before the booking counts.
            for other in merge_zones {
                ConflictZone::merge(&zone, &other);
            }
            solution.booked.push((rid, role));
            got += 1;
        }
        if got < count {
            // Capacity evaporated since the feasibility check.
            solution.abandon(shared);
            reset_zone(shared, item);
            return AcquireOutcome::Lost;
        }
    }

    // ── Ordered gate stack, validation, commit ────────────────────────────
    let stack = if cross {
        ConflictZone::acquire_stack(&zone)
    } else {
        Vec::new()
    };
    let committed = solution.commit(shared, now);
    for gate in stack.iter().rev() {
        gate.release();
    }

    match committed {
        Some(catches) => {
            ConflictZone::leave(&zone, item);
            AcquireOutcome::Acquired(catches)
        }
        None => {
            reset_zone(shared, item);
            AcquireOutcome::Lost
        }
    }
}

/// Leave the zone and reset the work item to a fresh singleton zone.
fn reset_zone(shared: &Shared, item: WorkItemId) {
    let mut el = guard(&shared.elements[item.element.index()]);
    if let Some(wi) = el.work.as_mut()
        && wi.id == item
    {
        wi.reset_zone();
    }
}
