//! Fluent builder for constructing a [`Simulation`].

use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize};
use std::sync::{Barrier, Mutex};

use pdes_core::{KernelConfig, ManagerId, ResourceId};
use pdes_model::Model;

use crate::engine::{RoundBuf, RunState, Shared, Simulation};
use crate::error::{EngineError, EngineResult};
use crate::event::{DiscreteEvent, EventQueue};
use crate::manager::ActivityManager;
use crate::notify::Listener;
use crate::resource::ResourceState;
use crate::KernelStats;

/// Fluent builder for [`Simulation`].
///
/// # Required inputs
///
/// - a frozen [`Model`] from [`pdes_model::ModelBuilder`]
/// - a validated [`KernelConfig`]
///
/// # Example
///
/// ```rust,ignore
/// let model = builder.build()?;
/// let mut sim = SimulationBuilder::new(model, config)
///     .listener(RecordingListener::new())
///     .build()?;
/// let stats = sim.run()?;
/// ```
pub struct SimulationBuilder {
    model:     Model,
    config:    KernelConfig,
    listeners: Vec<Box<dyn Listener>>,
}

impl SimulationBuilder {
    pub fn new(model: Model, config: KernelConfig) -> Self {
        Self { model, config, listeners: Vec::new() }
    }

    /// Subscribe a listener to the notification stream.
    pub fn listener(mut self, listener: impl Listener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Validate the configuration, build the worker pool and runtime
    /// registries, and pre-schedule every timetable window and generator
    /// fire up to the run horizon.
    pub fn build(self) -> EngineResult<Simulation> {
        self.config.validate()?;
        let start = self.config.start_ts;
        let end = self.config.end_ts;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads.unwrap_or(0))
            .build()
            .map_err(|e| EngineError::ThreadPool(e.to_string()))?;
        let workers = pool.current_num_threads();

        // ── Runtime registries ────────────────────────────────────────────
        let resources: Vec<Mutex<ResourceState>> = self
            .model
            .resources
            .iter()
            .map(|_| Mutex::new(ResourceState::default()))
            .collect();
        let counters: Vec<AtomicI64> = self
            .model
            .resource_types
            .iter()
            .map(|_| AtomicI64::new(0))
            .collect();
        let managers: Vec<ActivityManager> = (0..self.model.manager_count)
            .map(|i| ActivityManager::new(ManagerId(i as u16)))
            .collect();
        let resource_managers: Vec<Vec<ManagerId>> = (0..self.model.resources.len())
            .map(|i| self.model.managers_of_resource(ResourceId(i as u32)))
            .collect();

        // ── Initial events: timetable windows and generator fires ─────────
        let mut events = EventQueue::new();
        for (ri, resource) in self.model.resources.iter().enumerate() {
            let rid = ResourceId(ri as u32);
            for entry in &resource.timetable {
                for ts in entry.cycle.times_until(end) {
                    if ts < start {
                        continue;
                    }
                    let until = ts.offset(entry.duration);
                    events.push(ts, DiscreteEvent::RoleOn { resource: rid, role: entry.role, until });
                    if until < end {
                        events.push(until, DiscreteEvent::RoleOff { resource: rid, role: entry.role });
                    }
                }
            }
        }
        for (gi, generator) in self.model.generators.iter().enumerate() {
            for ts in generator.cycle.times_until(end) {
                if ts < start {
                    continue;
                }
                events.push(
                    ts,
                    DiscreteEvent::GeneratorFire { generator: pdes_core::GeneratorId(gi as u16) },
                );
            }
        }

        let bufs: Vec<Mutex<RoundBuf>> =
            (0..workers).map(|_| Mutex::new(RoundBuf::default())).collect();

        let shared = Shared {
            model: self.model,
            config: self.config,
            resources,
            counters,
            managers,
            elements: Vec::new(),
            resource_managers,
            bufs,
            barrier: Barrier::new(workers),
            in_flight: AtomicUsize::new(0),
            now: AtomicU64::new(start.0),
            workers,
            batch: Vec::new(),
        };

        Ok(Simulation {
            shared,
            pool,
            events,
            listeners: self.listeners,
            state: RunState::Initializing,
            stats: KernelStats::default(),
            clock: start,
        })
    }
}
