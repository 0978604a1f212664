//! The simulation runner: shared kernel state, event execution, and the
//! two-phase round loop.
//!
//! # Round anatomy
//!
//! ```text
//! loop:
//!   ① Advance    — controller pops the minimum future timestamp and moves
//!                  the clock there (strictly forward; anything else is a
//!                  fatal causality violation).
//!   ② Phase 1    — the timestamp's events are sharded round-robin across
//!                  the worker pool and executed in parallel. New events,
//!                  element-spawn requests and notifications go to
//!                  per-worker buffers, never into live structures.
//!   ③ Barrier    — no worker starts phase 2 until every shard is done.
//!   ④ Phase 2    — each worker re-scans a disjoint round-robin subset of
//!                  activity managers, letting freed capacity serve queued
//!                  work items.
//!   ⑤ Merge      — back on the controller: verify the in-flight counter
//!                  returned to zero, fold worker buffers into the future
//!                  event list, create spawned elements, dispatch the
//!                  notification stream in deterministic order.
//! ```
//!
//! Create via [`SimulationBuilder`][crate::SimulationBuilder].

use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Barrier, Mutex};

use pdes_core::{
    ActivityId, ElementId, ElementRng, ElementTypeId, GeneratorId, KernelConfig, ResourceId,
    ResourceTypeId, SimTime, WorkItemId,
};
use pdes_model::{ConditionCtx, ExecutionKind, Model, Successor};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::event::{DiscreteEvent, EventQueue};
use crate::guard;
use crate::manager::{ActivityManager, QueueKey};
use crate::notify::{Listener, Notification};
use crate::resource::{ReleaseOutcome, ResourceState};
use crate::workitem::{CaughtResource, WorkItem};

// ── Round buffers ─────────────────────────────────────────────────────────────

/// Deterministic ordering key for buffered notifications:
/// (phase, shard slot, per-buffer sequence).
pub(crate) type NoteKey = (u8, u32, u32);

pub(crate) const PHASE_EVENTS: u8 = 0;
pub(crate) const PHASE_SCAN: u8 = 1;

/// Per-worker output buffer for one round.
///
/// Workers never mutate the future event list or the element table directly;
/// everything they produce lands here and is merged by the controller after
/// the round completes.
#[derive(Default)]
pub(crate) struct RoundBuf {
    pub events: Vec<(SimTime, DiscreteEvent)>,
    pub spawns: Vec<(u32, GeneratorId)>,
    pub notes:  Vec<(NoteKey, Notification)>,
    phase: u8,
    slot:  u32,
    seq:   u32,
}

impl RoundBuf {
    /// Set the ordering context for subsequent notes: the phase and the shard
    /// slot (event index in phase 1, manager index in phase 2).
    pub(crate) fn set_context(&mut self, phase: u8, slot: u32) {
        self.phase = phase;
        self.slot = slot;
    }

    pub(crate) fn push_note(&mut self, n: Notification) {
        self.notes.push(((self.phase, self.slot, self.seq), n));
        self.seq += 1;
    }

    pub(crate) fn schedule(&mut self, ts: SimTime, ev: DiscreteEvent) {
        self.events.push((ts, ev));
    }

    fn spawn(&mut self, generator: GeneratorId) {
        self.spawns.push((self.slot, generator));
    }

    fn reset_seq(&mut self) {
        self.seq = 0;
    }
}

// ── ElementState ──────────────────────────────────────────────────────────────

/// Mutable runtime state of one element, guarded by its own mutex in the
/// registry. Holds at most one in-flight work item — an element never
/// overlaps itself.
pub(crate) struct ElementState {
    pub element_type: ElementTypeId,
    pub rng:          ElementRng,
    /// Activity currently requested or executing; `None` after the flow ends.
    pub current: Option<ActivityId>,
    pub next_serial: u32,
    pub work: Option<WorkItem>,
    pub finished: bool,
}

// ── Shared ────────────────────────────────────────────────────────────────────

/// Everything the worker threads touch during a round.
///
/// Single-writer discipline: manager queues and local resource state are only
/// mutated by their owning manager's phase-2 worker or by phase-1 events,
/// which the barrier keeps apart. Cross-partition resources are the sole
/// exception and go through the conflict-zone protocol.
pub(crate) struct Shared {
    pub model:  Model,
    pub config: KernelConfig,

    pub resources: Vec<Mutex<ResourceState>>,
    /// Global available-count per resource type.
    pub counters: Vec<AtomicI64>,
    pub managers: Vec<ActivityManager>,
    /// Element registry; appended by the controller between rounds only.
    pub elements: Vec<Mutex<ElementState>>,
    /// Managers owning any role of each resource, precomputed.
    pub resource_managers: Vec<Vec<pdes_core::ManagerId>>,

    pub bufs:      Vec<Mutex<RoundBuf>>,
    pub barrier:   Barrier,
    pub in_flight: AtomicUsize,
    pub now:       AtomicU64,
    pub workers:   usize,
    /// Events of the round in progress; set by the controller before the
    /// broadcast, read-only for workers.
    pub batch: Vec<DiscreteEvent>,
}

impl Shared {
    #[inline]
    pub(crate) fn counter(&self, role: ResourceTypeId) -> &AtomicI64 {
        &self.counters[role.index()]
    }

    /// Flag every manager owning a role of `resource` for a full queue scan.
    fn mark_resource_dirty(&self, resource: ResourceId) {
        for m in &self.resource_managers[resource.index()] {
            self.managers[m.index()].mark_dirty();
        }
    }

    // ── Worker entry point ────────────────────────────────────────────────

    /// One worker's share of a round: its event shard, the barrier, then its
    /// manager subset.
    pub(crate) fn worker_round(&self, worker: usize) {
        let now = SimTime(self.now.load(Ordering::Acquire));

        {
            let mut buf = guard(&self.bufs[worker]);
            for (i, ev) in self.batch.iter().enumerate() {
                if i % self.workers != worker {
                    continue;
                }
                buf.set_context(PHASE_EVENTS, i as u32);
                self.in_flight.fetch_add(1, Ordering::SeqCst);
                self.execute_event(*ev, now, &mut buf);
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        }

        // All events at this timestamp finish before any manager re-scans.
        self.barrier.wait();

        {
            let mut buf = guard(&self.bufs[worker]);
            for (mi, manager) in self.managers.iter().enumerate() {
                if mi % self.workers != worker {
                    continue;
                }
                buf.set_context(PHASE_SCAN, mi as u32);
                manager.scan(self, now, &mut buf);
            }
        }
    }

    // ── Event execution ───────────────────────────────────────────────────

    fn execute_event(&self, ev: DiscreteEvent, now: SimTime, buf: &mut RoundBuf) {
        match ev {
            DiscreteEvent::RoleOn { resource, role, until } => {
                self.role_on(resource, role, until, now, buf);
            }
            DiscreteEvent::RoleOff { resource, role } => {
                self.role_off(resource, role, now, buf);
            }
            DiscreteEvent::CancelOff { resource, role } => {
                self.cancel_off(resource, role, now, buf);
            }
            DiscreteEvent::GeneratorFire { generator } => {
                buf.spawn(generator);
            }
            DiscreteEvent::RequestActivity { element } => {
                self.request_activity(element, now, buf);
            }
            DiscreteEvent::FinishActivity { element, serial } => {
                self.finish_activity(element, serial, now, buf);
            }
            DiscreteEvent::InterruptActivity { element, serial } => {
                self.interrupt_activity(element, serial, now, buf);
            }
        }
    }

    fn role_on(
        &self,
        resource: ResourceId,
        role:     ResourceTypeId,
        until:    SimTime,
        now:      SimTime,
        buf:      &mut RoundBuf,
    ) {
        {
            let mut res = guard(&self.resources[resource.index()]);
            res.avail.insert(role, until);
            if res.caught.is_none() && !res.is_cancelled(role) && res.counted.insert(role) {
                self.counter(role).fetch_add(1, Ordering::SeqCst);
            }
        }
        self.mark_resource_dirty(resource);
        buf.push_note(Notification::RoleOn { resource, role, until, at: now });
    }

    fn role_off(
        &self,
        resource: ResourceId,
        role:     ResourceTypeId,
        now:      SimTime,
        buf:      &mut RoundBuf,
    ) {
        let mut res = guard(&self.resources[resource.index()]);
        let Some(&end) = res.avail.get(&role) else {
            return;
        };
        // A later RoleOn extended the window; that window's own RoleOff is
        // already scheduled.
        if end > now {
            return;
        }
        if matches!(res.caught, Some((_, r)) if r == role) {
            // Still legitimately held: defer, never drop. Finalized when the
            // holder releases.
            res.deferred_off = Some(role);
            return;
        }
        res.avail.remove(&role);
        if res.counted.remove(&role) {
            self.counter(role).fetch_sub(1, Ordering::SeqCst);
        }
        buf.push_note(Notification::RoleOff { resource, role, at: now });
    }

    fn cancel_off(
        &self,
        resource: ResourceId,
        role:     ResourceTypeId,
        now:      SimTime,
        buf:      &mut RoundBuf,
    ) {
        let reopened = {
            let mut res = guard(&self.resources[resource.index()]);
            if res.cancelled.remove(&role).is_none() {
                return;
            }
            let open = res.caught.is_none() && res.window_open(role, now);
            if open && res.counted.insert(role) {
                self.counter(role).fetch_add(1, Ordering::SeqCst);
                true
            } else {
                false
            }
        };
        // Wait queues learn about returning capacity only now, at window
        // close — never at open.
        if reopened {
            self.mark_resource_dirty(resource);
        }
        buf.push_note(Notification::CancelClosed { resource, role, at: now });
    }

    fn request_activity(&self, element: ElementId, now: SimTime, buf: &mut RoundBuf) {
        let (key, manager) = {
            let mut el = guard(&self.elements[element.index()]);
            if el.finished {
                return;
            }
            let Some(activity) = el.current else { return };

            let serial = el.next_serial;
            el.next_serial += 1;
            let id = WorkItemId::new(element, serial);
            el.work = Some(WorkItem::new(id, activity, now));

            let act = &self.model.activities[activity.index()];
            let et = &self.model.element_types[el.element_type.index()];
            let key = QueueKey {
                element_priority:  et.priority,
                activity_priority: act.priority,
                arrival:           now,
                item:              id,
                activity,
            };
            (key, self.model.activity_manager[activity.index()])
        };
        buf.push_note(Notification::ActivityRequested { element, activity: key.activity, at: now });
        self.managers[manager.index()].enqueue(key);
    }

    fn finish_activity(&self, element: ElementId, serial: u32, now: SimTime, buf: &mut RoundBuf) {
        let mut el = guard(&self.elements[element.index()]);
        let Some(wi) = el.work.take_if(|wi| wi.id.serial == serial) else {
            return;
        };
        let activity = wi.activity;

        self.release_resources(wi.id, element, activity, wi.caught, now, buf);
        buf.push_note(Notification::ActivityFinished { element, activity, at: now });

        match self.model.flow(el.element_type).next(activity, &mut el.rng) {
            Successor::Activity(next) => {
                el.current = Some(next);
                buf.schedule(now, DiscreteEvent::RequestActivity { element });
            }
            Successor::Finish => {
                el.current = None;
                el.finished = true;
                buf.push_note(Notification::ElementFinished { element, at: now });
            }
        }
    }

    fn interrupt_activity(
        &self,
        element: ElementId,
        serial:  u32,
        now:     SimTime,
        buf:     &mut RoundBuf,
    ) {
        let key = {
            let mut el = guard(&self.elements[element.index()]);
            let et_id = el.element_type;
            let Some(wi) = el.work.as_mut() else { return };
            if wi.id.serial != serial || wi.caught.is_empty() {
                return;
            }

            let remaining = wi.planned_end.since(now);
            wi.remaining = Some(remaining);
            let activity = wi.activity;
            let caught = std::mem::take(&mut wi.caught);
            let item = wi.id;
            let arrival = wi.arrival_ts;
            wi.reset_zone();

            self.release_resources(item, element, activity, caught, now, buf);
            buf.push_note(Notification::ActivityInterrupted {
                element,
                activity,
                remaining,
                at: now,
            });

            let act = &self.model.activities[activity.index()];
            let et = &self.model.element_types[et_id.index()];
            QueueKey {
                element_priority:  et.priority,
                activity_priority: act.priority,
                arrival,
                item,
                activity,
            }
        };
        let manager = self.model.activity_manager[key.activity.index()];
        self.managers[manager.index()].enqueue(key);
    }

    /// Return every caught resource to the pool. Releasing an already
    /// released hold is a no-op — availability counters are never
    /// double-incremented.
    fn release_resources(
        &self,
        item:     WorkItemId,
        element:  ElementId,
        activity: ActivityId,
        caught:   Vec<(ResourceId, ResourceTypeId)>,
        now:      SimTime,
        buf:      &mut RoundBuf,
    ) {
        let act = &self.model.activities[activity.index()];
        for (rid, role) in caught {
            let mut res = guard(&self.resources[rid.index()]);
            let Some(outcome) = res.release(item, role, now) else {
                continue;
            };

            if let Some(deferred) = res.deferred_off.take() {
                // The window elapsed while the resource was held; finalize
                // the deferred close now. Stale: nothing returns to the pool.
                res.avail.remove(&deferred);
                drop(res);
                buf.push_note(Notification::ResourceReleased {
                    resource: rid,
                    role,
                    element,
                    at: now,
                });
                buf.push_note(Notification::RoleOff { resource: rid, role: deferred, at: now });
                continue;
            }

            if outcome == ReleaseOutcome::Stale {
                // Window already over; the pending RoleOff event finalizes it.
                drop(res);
                buf.push_note(Notification::ResourceReleased {
                    resource: rid,
                    role,
                    element,
                    at: now,
                });
                continue;
            }

            match act.cancellation_for(role) {
                Some(period) => {
                    let until = now.offset(period);
                    res.cancelled.insert(role, until);
                    drop(res);
                    buf.push_note(Notification::ResourceReleased {
                        resource: rid,
                        role,
                        element,
                        at: now,
                    });
                    buf.push_note(Notification::CancelOpened {
                        resource: rid,
                        role,
                        until,
                        at: now,
                    });
                    buf.schedule(until, DiscreteEvent::CancelOff { resource: rid, role });
                }
                None => {
                    let counted = res.counted.insert(role);
                    drop(res);
                    if counted {
                        self.counter(role).fetch_add(1, Ordering::SeqCst);
                        self.mark_resource_dirty(rid);
                    }
                    buf.push_note(Notification::ResourceReleased {
                        resource: rid,
                        role,
                        element,
                        at: now,
                    });
                }
            }
        }
    }

    // ── Phase-2 helpers ───────────────────────────────────────────────────

    /// First work group — in `(priority, declaration)` order — whose
    /// condition holds and whose required counts are covered by the current
    /// availability counters. Pure: no state changes until a commit.
    pub(crate) fn find_feasible_workgroup(
        &self,
        element:      ElementId,
        element_type: ElementTypeId,
        activity:     ActivityId,
        now:          SimTime,
    ) -> Option<usize> {
        let act = &self.model.activities[activity.index()];
        let ctx = ConditionCtx { now, element, element_type, activity };
        for &i in &self.model.wg_order[activity.index()] {
            let wg = &act.workgroups[i];
            if !wg.condition.check(&ctx) {
                continue;
            }
            let covered = wg
                .needs
                .iter()
                .all(|&(role, count)| self.counter(role).load(Ordering::SeqCst) >= count as i64);
            if covered {
                return Some(i);
            }
        }
        None
    }

    /// Begin executing a work item whose solution just committed: record the
    /// catches, fix the duration, and schedule the completion (or the
    /// interruption, if a held window closes first).
    pub(crate) fn start_execution(
        &self,
        item:     WorkItemId,
        activity: ActivityId,
        wg_idx:   usize,
        catches:  Vec<CaughtResource>,
        now:      SimTime,
        buf:      &mut RoundBuf,
    ) {
        let element = item.element;
        let act = &self.model.activities[activity.index()];

        let mut el = guard(&self.elements[element.index()]);
        let ElementState { work, rng, .. } = &mut *el;
        let Some(wi) = work.as_mut() else { return };
        if wi.id != item {
            return;
        }

        for c in &catches {
            buf.push_note(Notification::ResourceCaught {
                resource: c.resource,
                role:     c.role,
                element,
                at: now,
            });
        }

        let duration = match act.kind {
            ExecutionKind::Instant => 0,
            ExecutionKind::TimeDriven { .. } => match wi.remaining.take() {
                // An interrupted execution resumes with its residual time.
                Some(residual) => residual,
                None => act.workgroups[wg_idx]
                    .duration
                    .as_ref()
                    .map(|d| d.sample(rng))
                    .unwrap_or(0),
            },
        };
        wi.planned_end = now.offset(duration);
        wi.caught = catches.iter().map(|c| (c.resource, c.role)).collect();

        buf.push_note(Notification::ActivityStarted {
            element,
            activity,
            workgroup: wg_idx,
            at: now,
        });

        match act.kind {
            ExecutionKind::Instant => {
                buf.schedule(now, DiscreteEvent::FinishActivity { element, serial: item.serial });
            }
            ExecutionKind::TimeDriven { interruptible } => {
                let expiry = catches
                    .iter()
                    .map(|c| c.window_end)
                    .min()
                    .unwrap_or(SimTime::NEVER);
                if interruptible && expiry < wi.planned_end {
                    buf.schedule(
                        expiry,
                        DiscreteEvent::InterruptActivity { element, serial: item.serial },
                    );
                } else {
                    buf.schedule(
                        wi.planned_end,
                        DiscreteEvent::FinishActivity { element, serial: item.serial },
                    );
                }
            }
        }
    }
}

// ── RunState / KernelStats ────────────────────────────────────────────────────

/// Lifecycle of one simulation run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Initializing,
    Running,
    /// The clock reached the end timestamp; barriered in-flight work has
    /// finished and teardown notifications are being dispatched.
    Draining,
    Finished,
}

/// Counters accumulated over a run.
#[derive(Clone, Debug, Default)]
pub struct KernelStats {
    /// Rounds executed (several rounds may share a timestamp).
    pub rounds: u64,
    /// Discrete events executed across all rounds.
    pub events_executed: u64,
    /// Elements created by generators.
    pub elements_created: u64,
    /// Notifications dispatched to listeners.
    pub notifications: u64,
}

// ── Simulation ────────────────────────────────────────────────────────────────

/// A ready-to-run simulation: frozen model, runtime registries, worker pool.
pub struct Simulation {
    pub(crate) shared:    Shared,
    pub(crate) pool:      rayon::ThreadPool,
    pub(crate) events:    EventQueue,
    pub(crate) listeners: Vec<Box<dyn Listener>>,
    pub(crate) state:     RunState,
    pub(crate) stats:     KernelStats,
    pub(crate) clock:     SimTime,
}

impl Simulation {
    /// Current clock value.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stats(&self) -> &KernelStats {
        &self.stats
    }

    /// The frozen model this simulation executes.
    pub fn model(&self) -> &Model {
        &self.shared.model
    }

    /// Run from `start_ts` until the end timestamp.
    ///
    /// Returns the accumulated counters, or the first fatal error — a
    /// causality or barrier-protocol violation aborts the run immediately.
    pub fn run(&mut self) -> EngineResult<KernelStats> {
        if self.state != RunState::Initializing {
            return Err(EngineError::AlreadyFinished);
        }
        self.state = RunState::Running;
        debug!(
            start = %self.clock,
            end = %self.shared.config.end_ts,
            workers = self.shared.workers,
            "simulation starting"
        );
        self.dispatch(Notification::SimulationStarted { at: self.clock });

        while let Some(ts) = self.events.next_time() {
            if ts >= self.shared.config.end_ts {
                // Past the horizon: stop scheduling rounds, discard the rest.
                break;
            }
            if ts < self.clock {
                return Err(EngineError::Causality { at: ts, now: self.clock });
            }
            if ts > self.clock {
                self.clock = ts;
                self.shared.now.store(ts.0, Ordering::Release);
                self.dispatch(Notification::TimeAdvanced { to: ts });
            }

            let Some((_, batch)) = self.events.drain_next() else {
                break;
            };
            debug!(now = %self.clock, events = batch.len(), "round");
            self.stats.events_executed += batch.len() as u64;
            self.shared.batch = batch;

            {
                let shared = &self.shared;
                self.pool.broadcast(|ctx| shared.worker_round(ctx.index()));
            }

            if self.shared.in_flight.load(Ordering::SeqCst) != 0 {
                return Err(EngineError::Barrier(
                    "in-flight event counter non-zero after round".into(),
                ));
            }
            self.shared.batch.clear();
            self.merge_round()?;
            self.stats.rounds += 1;
        }

        self.state = RunState::Draining;
        let end = self.shared.config.end_ts;
        self.dispatch(Notification::SimulationEnded { at: end });
        self.state = RunState::Finished;
        debug!(rounds = self.stats.rounds, "simulation finished");
        Ok(self.stats.clone())
    }

    /// Fold worker buffers back into controller state: future events (with
    /// the causality check), element spawns, and the ordered notification
    /// stream.
    fn merge_round(&mut self) -> EngineResult<()> {
        let mut new_events: Vec<(SimTime, DiscreteEvent)> = Vec::new();
        let mut spawns: Vec<(u32, GeneratorId)> = Vec::new();
        let mut notes: Vec<(NoteKey, Notification)> = Vec::new();
        for buf in &self.shared.bufs {
            let mut b = guard(buf);
            new_events.append(&mut b.events);
            spawns.append(&mut b.spawns);
            notes.append(&mut b.notes);
            b.reset_seq();
        }

        for (ts, ev) in new_events {
            if ts < self.clock {
                return Err(EngineError::Causality { at: ts, now: self.clock });
            }
            self.events.push(ts, ev);
        }

        notes.sort_by_key(|(key, _)| *key);
        for (_, n) in notes {
            self.dispatch(n);
        }

        spawns.sort_unstable_by_key(|&(slot, _)| slot);
        for (_, generator) in spawns {
            let (element_type, count) = {
                let def = &self.shared.model.generators[generator.index()];
                (def.element_type, def.count)
            };
            let first = self.shared.model.flow(element_type).start();
            for _ in 0..count {
                let id = ElementId(self.shared.elements.len() as u32);
                self.shared.elements.push(Mutex::new(ElementState {
                    element_type,
                    rng: ElementRng::new(self.shared.config.seed, id),
                    current: Some(first),
                    next_serial: 0,
                    work: None,
                    finished: false,
                }));
                self.stats.elements_created += 1;
                self.dispatch(Notification::ElementStarted {
                    element: id,
                    element_type,
                    at: self.clock,
                });
                self.events.push(self.clock, DiscreteEvent::RequestActivity { element: id });
            }
        }

        Ok(())
    }

    fn dispatch(&mut self, n: Notification) {
        self.stats.notifications += 1;
        let kind = n.kind();
        for listener in &mut self.listeners {
            if listener.wants(kind) {
                listener.notify(&n);
            }
        }
    }
}
