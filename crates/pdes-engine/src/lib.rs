//! `pdes-engine` — the execution engine of the `rust_pdes` kernel.
//!
//! # Two-phase round loop
//!
//! ```text
//! while the future-event list has timestamps before end_ts:
//!   ① Advance  — the clock jumps to the minimum queued timestamp.
//!   ② Phase 1  — that timestamp's events run in parallel, sharded
//!                round-robin across a fixed rayon pool.
//!   ③ Barrier  — every shard finishes before any queue re-scan starts.
//!   ④ Phase 2  — each worker re-scans a disjoint subset of activity
//!                managers so freed capacity serves queued work items.
//!   ⑤ Merge    — the controller folds per-worker buffers into the event
//!                list, spawns new elements, and dispatches notifications
//!                in deterministic order.
//! ```
//!
//! Cross-partition resources — the only state shared between manager
//! partitions — are arbitrated by the [`zone`] module's conflict zones:
//! merged lock-ordering groups whose gate stacks are always acquired in one
//! canonical order, which is what rules out deadlock.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use pdes_core::{KernelConfig, SimTime};
//! use pdes_engine::{RecordingListener, SimulationBuilder};
//!
//! let recorder = RecordingListener::new();
//! let log = recorder.handle();
//! let mut sim = SimulationBuilder::new(model, KernelConfig::new(SimTime::ZERO, SimTime(100), 42))
//!     .listener(recorder)
//!     .build()?;
//! let stats = sim.run()?;
//! println!("{} notifications", log.lock().unwrap().len());
//! ```

pub mod builder;
pub mod engine;
pub mod error;
pub mod event;
pub mod manager;
pub mod notify;
pub mod resource;
pub mod workitem;
pub mod zone;


use std::sync::{Mutex, MutexGuard};

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use builder::SimulationBuilder;
pub use engine::{KernelStats, RunState, Simulation};
pub use error::{EngineError, EngineResult};
pub use event::{DiscreteEvent, EventQueue};
pub use manager::{ActivityManager, QueueKey};
pub use notify::{Listener, NoopListener, Notification, NotificationKind, RecordingListener};
pub use resource::{ReleaseOutcome, ResourceState};
pub use workitem::{CaughtResource, WorkItem};
pub use zone::{ConflictZone, Gate};

/// Lock a kernel mutex.
///
/// Poisoning means a worker panicked mid-round — a kernel defect of the same
/// class as a barrier violation, so it must surface, not be masked.
pub(crate) fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().expect("kernel state lock poisoned by a panicked worker")
}

/// Initialize the tracing subscriber for binaries and demos.
///
/// `level` is the default filter when `RUST_LOG` is unset.
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
