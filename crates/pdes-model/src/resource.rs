//! Resource and resource-type declarations.
//!
//! A `ResourceType` is a named role; a `Resource` is a concrete provider of
//! one or more roles, each through a timetable of availability windows. The
//! runtime availability state machine lives in the engine — these types only
//! describe the schedule.

use pdes_core::{Cycle, ResourceTypeId};

// ── ResourceType ──────────────────────────────────────────────────────────────

/// A named role a resource can play (e.g. `BED`, `NURSE`).
///
/// Ownership by an activity manager is computed at build time from the work
/// groups that require the role.
#[derive(Clone, Debug)]
pub struct ResourceType {
    pub name: String,
}

// ── TimeTableEntry ────────────────────────────────────────────────────────────

/// One availability rule of a resource: at every fire timestamp of `cycle`,
/// the resource provides `role` for `duration` time units.
#[derive(Clone, Debug)]
pub struct TimeTableEntry {
    pub cycle:    Cycle,
    pub duration: u64,
    pub role:     ResourceTypeId,
}

// ── Resource ──────────────────────────────────────────────────────────────────

/// A concrete, time-scheduled provider of one or more roles.
///
/// A resource providing roles owned by more than one activity manager is a
/// cross-partition resource; the engine detects this at build time and routes
/// its bookings through the conflict-zone protocol.
#[derive(Clone, Debug)]
pub struct Resource {
    pub name:      String,
    pub timetable: Vec<TimeTableEntry>,
}

impl Resource {
    /// Distinct roles this resource provides, sorted ascending.
    pub fn roles(&self) -> Vec<ResourceTypeId> {
        let mut roles: Vec<ResourceTypeId> =
            self.timetable.iter().map(|e| e.role).collect();
        roles.sort_unstable();
        roles.dedup();
        roles
    }
}
