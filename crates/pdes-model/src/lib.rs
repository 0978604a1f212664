//! `pdes-model` — the model-construction API for the `rust_pdes` kernel.
//!
//! Domain collaborators declare *what* a simulation contains — resource
//! types, time-scheduled resources, activities with their work groups,
//! element types with their activity flows, and generators — through
//! [`ModelBuilder`]. `build()` validates the whole graph, computes the
//! activity-manager partitions, and freezes everything into an immutable
//! [`Model`] that the engine executes.
//!
//! # Quick-start
//!
//! ```rust
//! use pdes_core::{Cycle, SimTime};
//! use pdes_model::{ExecutionKind, Fixed, Flow, ModelBuilder};
//!
//! let mut b = ModelBuilder::new();
//! let bed = b.new_resource_type("BED");
//! for name in ["bed-1", "bed-2"] {
//!     let r = b.new_resource(name);
//!     b.add_timetable_entry(r, Cycle::once(SimTime::ZERO), 1_000, bed);
//! }
//! let stay = b.new_activity("Stay", 0, ExecutionKind::time_driven());
//! b.new_workgroup(stay, 0, vec![(bed, 1)], Fixed(3));
//! let patient = b.new_element_type("patient", 0, Flow::sequence(&[stay]));
//! b.new_generator(patient, 3, Cycle::once(SimTime::ZERO));
//! let model = b.build().unwrap();
//! assert_eq!(model.manager_count, 1);
//! ```

pub mod activity;
pub mod builder;
pub mod condition;
pub mod element;
pub mod error;
pub mod flow;
pub mod resource;
pub mod sampler;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use activity::{Activity, ExecutionKind, WorkGroup};
pub use builder::{Model, ModelBuilder};
pub use condition::{Always, Condition, ConditionCtx};
pub use element::{ElementType, Generator};
pub use error::{ModelError, ModelResult};
pub use flow::{CompiledFlow, Flow, Successor};
pub use resource::{Resource, ResourceType, TimeTableEntry};
pub use sampler::{DurationSampler, Fixed};
