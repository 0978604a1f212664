//! `pdes-core` — foundational types for the `rust_pdes` simulation kernel.
//!
//! This crate is a dependency of every other `pdes-*` crate. It intentionally
//! has no `pdes-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                               |
//! |-------------|--------------------------------------------------------|
//! | [`ids`]     | `ElementId`, `ActivityId`, `ResourceId`, `WorkItemId`… |
//! | [`time`]    | `SimTime`, `KernelConfig`                              |
//! | [`cycle`]   | `Cycle` — periodic and table-driven fire schedules     |
//! | [`rng`]     | `ElementRng` (per-element), `KernelRng` (global)       |
//! | [`error`]   | `CoreError`, `CoreResult`                              |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                    |
//! |---------|-----------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public value types. |

pub mod cycle;
pub mod error;
pub mod ids;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use cycle::Cycle;
pub use error::{CoreError, CoreResult};
pub use ids::{
    ActivityId, ElementId, ElementTypeId, GeneratorId, ManagerId, ResourceId, ResourceTypeId,
    WorkItemId,
};
pub use rng::{ElementRng, KernelRng};
pub use time::{KernelConfig, SimTime};
