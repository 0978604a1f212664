//! Conflict zones — the lock-ordering groups that make cross-partition
//! resource acquisition deadlock-free.
//!
//! # How it works
//!
//! Every work item starts each acquisition attempt in a singleton zone of its
//! own. Whenever it books a cross-partition resource, its zone is merged with
//! the zone of every work item currently booking that resource, so by the
//! time any contender blocks, all work items that could ever contend are
//! provably in the same zone. The zone's member list is kept sorted by
//! `WorkItemId`, and the gate stack is always acquired in that canonical
//! order — any two contenders request the same lock sequence, ruling out the
//! hold-and-wait cycle.
//!
//! Zones form a reference-counted union-find: a merged-away zone keeps a
//! `forward` pointer to its absorber instead of rewriting every member's
//! handle. The receiver of a merge is always the zone whose minimum member id
//! is lower, so zone ownership follows a single global order and merge chains
//! cannot cycle. Within one acquisition attempt zones only grow; a work item
//! leaves its zone on commit or failure and resets to a fresh singleton.

use std::sync::{Arc, Condvar, Mutex};

use pdes_core::WorkItemId;

use crate::guard;

// ── Gate ──────────────────────────────────────────────────────────────────────

/// A binary semaphore with condvar wake-up.
///
/// One gate exists per work item; a contender acquiring a zone's stack blocks
/// here until the current holder finishes its commit-or-abort.
pub struct Gate {
    locked: Mutex<bool>,
    cv:     Condvar,
}

impl Gate {
    pub fn new() -> Arc<Gate> {
        Arc::new(Gate { locked: Mutex::new(false), cv: Condvar::new() })
    }

    pub fn acquire(&self) {
        let mut locked = guard(&self.locked);
        while *locked {
            locked = self.cv.wait(locked).expect("gate condvar poisoned");
        }
        *locked = true;
    }

    pub fn release(&self) {
        *guard(&self.locked) = false;
        self.cv.notify_all();
    }
}

// ── ConflictZone ──────────────────────────────────────────────────────────────

/// One member of a zone: a work item and its gate.
#[derive(Clone)]
pub struct ZoneMember {
    pub item: WorkItemId,
    pub gate: Arc<Gate>,
}

struct ZoneInner {
    /// Members sorted by `item`; drained when the zone is merged away.
    members: Vec<ZoneMember>,
    /// Set when this zone was absorbed into another.
    forward: Option<Arc<ConflictZone>>,
}

/// A dynamically grown equivalence class of potentially contending work items.
pub struct ConflictZone {
    inner: Mutex<ZoneInner>,
}

impl ConflictZone {
    /// A fresh zone containing only `item`.
    pub fn singleton(item: WorkItemId, gate: Arc<Gate>) -> Arc<ConflictZone> {
        Arc::new(ConflictZone {
            inner: Mutex::new(ZoneInner {
                members: vec![ZoneMember { item, gate }],
                forward: None,
            }),
        })
    }

    /// Follow forward pointers to the zone currently holding the members.
    pub fn root(zone: &Arc<ConflictZone>) -> Arc<ConflictZone> {
        let mut current = Arc::clone(zone);
        loop {
            let next = {
                let inner = guard(&current.inner);
                match &inner.forward {
                    None => return current.clone(),
                    Some(fwd) => Arc::clone(fwd),
                }
            };
            current = next;
        }
    }

    /// Snapshot of the root's member list, sorted by work-item id.
    pub fn members(zone: &Arc<ConflictZone>) -> Vec<ZoneMember> {
        let root = Self::root(zone);
        let inner = guard(&root.inner);
        inner.members.clone()
    }

    /// Union the zones of two work items.
    ///
    /// The receiver is the zone whose minimum member id is lower; the other
    /// zone's members move over and it becomes a forward pointer. Merging a
    /// zone with itself, or with a zone whose members all left, is a no-op.
    pub fn merge(a: &Arc<ConflictZone>, b: &Arc<ConflictZone>) {
        loop {
            let ra = Self::root(a);
            let rb = Self::root(b);
            if Arc::ptr_eq(&ra, &rb) {
                return;
            }

            // Lock in address order (stable within the process) to avoid a
            // merge-merge deadlock; decide the receiver by member id below.
            let (first, second) = if Arc::as_ptr(&ra) < Arc::as_ptr(&rb) {
                (&ra, &rb)
            } else {
                (&rb, &ra)
            };
            let mut g1 = guard(&first.inner);
            let mut g2 = guard(&second.inner);

            // A concurrent merge may have forwarded either side; retry.
            if g1.forward.is_some() || g2.forward.is_some() {
                drop(g2);
                drop(g1);
                continue;
            }

            let min1 = g1.members.first().map(|m| m.item);
            let min2 = g2.members.first().map(|m| m.item);
            let first_receives = match (min1, min2) {
                (Some(a), Some(b)) => a < b,
                (Some(_), None) => true,
                // An empty zone never receives; if both are empty the merge
                // is vacuous but still links them to keep roots converging.
                (None, _) => false,
            };

            let (mut recv, mut give, recv_arc) = if first_receives {
                (g1, g2, Arc::clone(first))
            } else {
                (g2, g1, Arc::clone(second))
            };
            let moved = std::mem::take(&mut give.members);
            give.forward = Some(recv_arc);
            recv.members.extend(moved);
            recv.members.sort_by_key(|m| m.item);
            recv.members.dedup_by_key(|m| m.item);
            return;
        }
    }

    /// Remove `item` from its zone at the end of an acquisition attempt.
    pub fn leave(zone: &Arc<ConflictZone>, item: WorkItemId) {
        let root = Self::root(zone);
        let mut inner = guard(&root.inner);
        inner.members.retain(|m| m.item != item);
    }

    /// Acquire every member gate of the (possibly still growing) zone in
    /// canonical order.
    ///
    /// If the zone gained members while the stack was being acquired, the
    /// partial stack is released and the acquisition restarts over the grown
    /// member list, so the all-or-nothing ordering discipline is preserved.
    /// Returns the acquired gates; release them in reverse order.
    pub fn acquire_stack(zone: &Arc<ConflictZone>) -> Vec<Arc<Gate>> {
        loop {
            let members = Self::members(zone);
            for m in &members {
                m.gate.acquire();
            }
            let after = Self::members(zone);
            let unchanged = after.len() == members.len()
                && after.iter().zip(&members).all(|(x, y)| x.item == y.item);
            if unchanged {
                return members.into_iter().map(|m| m.gate).collect();
            }
            for m in members.iter().rev() {
                m.gate.release();
            }
        }
    }
}
