//! Activity managers — the mutual-exclusion partitions of the model.
//!
//! Each manager owns a disjoint subset of activities and resource types (as
//! computed by the model builder) and the wait queue of work items that could
//! not yet be served. During phase 2 of every round, exactly one worker
//! re-scans each manager, so all queue and local-resource state is effectively
//! single-writer.
//!
//! # Queue ordering
//!
//! The queue is a `BTreeSet<QueueKey>`; the derived key order is the service
//! order: element-type priority, then activity priority, then arrival
//! timestamp, with the work-item id as the deterministic tie-break. Lower
//! values are served first.

use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use pdes_core::{ActivityId, ManagerId, SimTime, WorkItemId};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::engine::{RoundBuf, Shared};
use crate::guard;
use crate::workitem::{self, AcquireOutcome};

// ── QueueKey ──────────────────────────────────────────────────────────────────

/// Wait-queue entry. Field order *is* the service order — the derived `Ord`
/// compares element-type priority, activity priority, arrival, then the
/// unique work-item id (the trailing `activity` field is payload and is never
/// reached by comparisons).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct QueueKey {
    pub element_priority:  u8,
    pub activity_priority: u8,
    pub arrival:           SimTime,
    pub item:              WorkItemId,
    pub activity:          ActivityId,
}

// ── ServeOutcome ──────────────────────────────────────────────────────────────

enum ServeOutcome {
    /// Resources committed, execution started, item left the queue.
    Started,
    /// No work group is feasible for the item's activity right now.
    Infeasible,
    /// A feasible work group lost the race for a shared resource; the item
    /// stays queued for the next capacity notification.
    Lost,
    /// The queue entry no longer matches a live work item.
    Stale,
}

// ── ActivityManager ───────────────────────────────────────────────────────────

/// One lock partition: wait queue, capacity-dirty flag and the fresh-request
/// list evaluated when no full scan is due.
pub struct ActivityManager {
    pub id: ManagerId,

    queue: Mutex<BTreeSet<QueueKey>>,

    /// Set whenever capacity owned by this manager may have grown; cleared by
    /// the next scan, which then walks the whole queue.
    dirty: AtomicBool,

    /// Work items enqueued since the last scan. When the manager is not
    /// dirty, only these are evaluated.
    fresh: Mutex<Vec<QueueKey>>,
}

impl ActivityManager {
    pub fn new(id: ManagerId) -> Self {
        Self {
            id,
            queue: Mutex::new(BTreeSet::new()),
            dirty: AtomicBool::new(false),
            fresh: Mutex::new(Vec::new()),
        }
    }

    /// Queue a freshly requested (or re-queued interrupted) work item.
    pub fn enqueue(&self, key: QueueKey) {
        guard(&self.queue).insert(key);
        guard(&self.fresh).push(key);
    }

    /// Mark that capacity owned by this manager may have grown.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Number of queued work items.
    pub fn queue_len(&self) -> usize {
        guard(&self.queue).len()
    }

    /// Phase-2 entry point, called by exactly one worker per round.
    ///
    /// A capacity change triggers a full scan; otherwise only fresh requests
    /// are evaluated, in queue order.
    pub(crate) fn scan(&self, shared: &Shared, now: SimTime, buf: &mut RoundBuf) {
        let full = self.dirty.swap(false, Ordering::AcqRel);
        let mut fresh = std::mem::take(&mut *guard(&self.fresh));

        if full {
            self.full_scan(shared, now, buf);
        } else if !fresh.is_empty() {
            fresh.sort_unstable();
            trace!(manager = self.id.0, fresh = fresh.len(), "evaluating fresh requests");
            for key in fresh {
                let _ = self.try_serve(shared, now, key, buf);
            }
        }
    }

    /// Walk the whole queue in service order.
    ///
    /// Each activity is marked feasible/unfeasible at most once per scan, and
    /// the walk stops early once the provably-infeasible items cover the
    /// remaining queue.
    fn full_scan(&self, shared: &Shared, now: SimTime, buf: &mut RoundBuf) {
        let snapshot: Vec<QueueKey> = guard(&self.queue).iter().copied().collect();
        if snapshot.is_empty() {
            return;
        }
        trace!(manager = self.id.0, queued = snapshot.len(), "full queue scan");

        let total = snapshot.len();
        let mut memo: FxHashMap<ActivityId, bool> = FxHashMap::default();
        let mut infeasible = 0_usize;

        for key in snapshot {
            if memo.get(&key.activity) == Some(&false) {
                infeasible += 1;
                if infeasible == total {
                    break;
                }
                continue;
            }
            match self.try_serve(shared, now, key, buf) {
                ServeOutcome::Started => {
                    memo.insert(key.activity, true);
                }
                ServeOutcome::Infeasible => {
                    memo.insert(key.activity, false);
                    infeasible += 1;
                    if infeasible == total {
                        break;
                    }
                }
                ServeOutcome::Lost | ServeOutcome::Stale => {}
            }
        }
    }

    /// Evaluate one queued work item: feasibility, acquisition, start.
    fn try_serve(
        &self,
        shared: &Shared,
        now:    SimTime,
        key:    QueueKey,
        buf:    &mut RoundBuf,
    ) -> ServeOutcome {
        // The entry may have outlived its work item (served by an earlier
        // fresh-list pass, or the element finished).
        let element_type = {
            let el = guard(&shared.elements[key.item.element.index()]);
            match el.work.as_ref() {
                Some(wi) if wi.id == key.item && wi.caught.is_empty() => el.element_type,
                _ => {
                    guard(&self.queue).remove(&key);
                    return ServeOutcome::Stale;
                }
            }
        };

        let Some(wg_idx) =
            shared.find_feasible_workgroup(key.item.element, element_type, key.activity, now)
        else {
            return ServeOutcome::Infeasible;
        };

        match workitem::try_acquire(shared, key.item, key.activity, wg_idx, now) {
            AcquireOutcome::Acquired(catches) => {
                guard(&self.queue).remove(&key);
                shared.start_execution(key.item, key.activity, wg_idx, catches, now, buf);
                ServeOutcome::Started
            }
            AcquireOutcome::Lost => ServeOutcome::Lost,
        }
    }
}
