//! The typed notification stream and its listeners.
//!
//! Every kernel state transition is published as a [`Notification`].
//! Listeners subscribe by overriding [`Listener::wants`]; this stream is the
//! only channel statistics views and other collaborators consume.
//!
//! Notifications produced by worker threads are buffered with deterministic
//! sort keys and dispatched by the controller between rounds, so the stream
//! order is reproducible for a given model, seed and thread count.

use std::sync::{Arc, Mutex};

use pdes_core::{ActivityId, ElementId, ElementTypeId, ResourceId, ResourceTypeId, SimTime};

// ── Notification ──────────────────────────────────────────────────────────────

/// A kernel state transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    SimulationStarted { at: SimTime },
    SimulationEnded { at: SimTime },
    TimeAdvanced { to: SimTime },

    ElementStarted {
        element:      ElementId,
        element_type: ElementTypeId,
        at:           SimTime,
    },
    ElementFinished { element: ElementId, at: SimTime },

    ActivityRequested {
        element:  ElementId,
        activity: ActivityId,
        at:       SimTime,
    },
    ActivityStarted {
        element:   ElementId,
        activity:  ActivityId,
        /// Index of the work group serving this execution.
        workgroup: usize,
        at:        SimTime,
    },
    /// A held resource expired mid-execution; the activity resumes later with
    /// `remaining` units left.
    ActivityInterrupted {
        element:   ElementId,
        activity:  ActivityId,
        remaining: u64,
        at:        SimTime,
    },
    ActivityFinished {
        element:  ElementId,
        activity: ActivityId,
        at:       SimTime,
    },

    ResourceCaught {
        resource: ResourceId,
        role:     ResourceTypeId,
        element:  ElementId,
        at:       SimTime,
    },
    ResourceReleased {
        resource: ResourceId,
        role:     ResourceTypeId,
        element:  ElementId,
        at:       SimTime,
    },

    RoleOn {
        resource: ResourceId,
        role:     ResourceTypeId,
        until:    SimTime,
        at:       SimTime,
    },
    RoleOff {
        resource: ResourceId,
        role:     ResourceTypeId,
        at:       SimTime,
    },
    CancelOpened {
        resource: ResourceId,
        role:     ResourceTypeId,
        until:    SimTime,
        at:       SimTime,
    },
    CancelClosed {
        resource: ResourceId,
        role:     ResourceTypeId,
        at:       SimTime,
    },
}

/// Fieldless discriminant of a [`Notification`], used for subscriptions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    SimulationStarted,
    SimulationEnded,
    TimeAdvanced,
    ElementStarted,
    ElementFinished,
    ActivityRequested,
    ActivityStarted,
    ActivityInterrupted,
    ActivityFinished,
    ResourceCaught,
    ResourceReleased,
    RoleOn,
    RoleOff,
    CancelOpened,
    CancelClosed,
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::SimulationStarted { .. } => NotificationKind::SimulationStarted,
            Notification::SimulationEnded { .. } => NotificationKind::SimulationEnded,
            Notification::TimeAdvanced { .. } => NotificationKind::TimeAdvanced,
            Notification::ElementStarted { .. } => NotificationKind::ElementStarted,
            Notification::ElementFinished { .. } => NotificationKind::ElementFinished,
            Notification::ActivityRequested { .. } => NotificationKind::ActivityRequested,
            Notification::ActivityStarted { .. } => NotificationKind::ActivityStarted,
            Notification::ActivityInterrupted { .. } => NotificationKind::ActivityInterrupted,
            Notification::ActivityFinished { .. } => NotificationKind::ActivityFinished,
            Notification::ResourceCaught { .. } => NotificationKind::ResourceCaught,
            Notification::ResourceReleased { .. } => NotificationKind::ResourceReleased,
            Notification::RoleOn { .. } => NotificationKind::RoleOn,
            Notification::RoleOff { .. } => NotificationKind::RoleOff,
            Notification::CancelOpened { .. } => NotificationKind::CancelOpened,
            Notification::CancelClosed { .. } => NotificationKind::CancelClosed,
        }
    }
}

// ── Listener ──────────────────────────────────────────────────────────────────

/// A subscriber to the notification stream.
///
/// `notify` is only ever called from the controller thread, between rounds,
/// and only for kinds the listener [`wants`](Listener::wants).
pub trait Listener {
    /// Subscription filter. The default accepts everything.
    fn wants(&self, kind: NotificationKind) -> bool {
        let _ = kind;
        true
    }

    fn notify(&mut self, notification: &Notification);
}

/// A [`Listener`] that ignores everything.
pub struct NoopListener;

impl Listener for NoopListener {
    fn wants(&self, _kind: NotificationKind) -> bool {
        false
    }

    fn notify(&mut self, _notification: &Notification) {}
}

// ── RecordingListener ─────────────────────────────────────────────────────────

/// Records every accepted notification into a shared log.
///
/// The listener itself moves into the simulation; keep the [`handle`]
/// (`Arc<Mutex<Vec<Notification>>>`) to read the stream afterwards.
///
/// [`handle`]: RecordingListener::handle
pub struct RecordingListener {
    log:    Arc<Mutex<Vec<Notification>>>,
    filter: Option<Vec<NotificationKind>>,
}

impl RecordingListener {
    /// Record every notification kind.
    pub fn new() -> Self {
        Self { log: Arc::new(Mutex::new(Vec::new())), filter: None }
    }

    /// Record only the listed kinds.
    pub fn filtered(kinds: &[NotificationKind]) -> Self {
        Self {
            log:    Arc::new(Mutex::new(Vec::new())),
            filter: Some(kinds.to_vec()),
        }
    }

    /// Shared handle to the recorded stream.
    pub fn handle(&self) -> Arc<Mutex<Vec<Notification>>> {
        Arc::clone(&self.log)
    }
}

impl Default for RecordingListener {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener for RecordingListener {
    fn wants(&self, kind: NotificationKind) -> bool {
        match &self.filter {
            None => true,
            Some(kinds) => kinds.contains(&kind),
        }
    }

    fn notify(&mut self, notification: &Notification) {
        let mut log = self.log.lock().expect("recording log poisoned");
        log.push(notification.clone());
    }
}
