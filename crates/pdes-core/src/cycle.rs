//! `Cycle` — repeating and table-driven fire schedules.
//!
//! A cycle answers one question: at which timestamps does something happen?
//! Resource timetable entries use cycles to open availability windows;
//! generators use them to create elements. Cycles are pure values — the
//! builder validates them once and the engine enumerates their fire times up
//! to the run horizon during initialization.

use crate::SimTime;

/// A schedule of fire timestamps.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cycle {
    /// Fires at `start`, `start + period`, `start + 2*period`, … strictly
    /// before `until`. Use [`SimTime::NEVER`] for an unbounded cycle.
    Periodic {
        start:  SimTime,
        period: u64,
        until:  SimTime,
    },

    /// Fires exactly at the listed timestamps. Kept sorted ascending by the
    /// model builder.
    Table(Vec<SimTime>),
}

impl Cycle {
    /// A cycle that fires exactly once, at `at`.
    pub fn once(at: SimTime) -> Self {
        Cycle::Table(vec![at])
    }

    /// An unbounded periodic cycle starting at `start`.
    pub fn every(start: SimTime, period: u64) -> Self {
        Cycle::Periodic { start, period, until: SimTime::NEVER }
    }

    /// `true` if the cycle can never fire.
    pub fn is_empty(&self) -> bool {
        match self {
            Cycle::Periodic { start, until, .. } => start >= until,
            Cycle::Table(ts) => ts.is_empty(),
        }
    }

    /// Enumerate every fire timestamp strictly before `horizon`, ascending.
    ///
    /// The horizon bounds unbounded periodic cycles, so the result is always
    /// finite for a finite horizon.
    pub fn times_until(&self, horizon: SimTime) -> Vec<SimTime> {
        match self {
            Cycle::Periodic { start, period, until } => {
                let stop = (*until).min(horizon);
                let mut out = Vec::new();
                let mut t = *start;
                while t < stop {
                    out.push(t);
                    // Saturating add: a period landing on NEVER terminates.
                    let next = t.offset(*period);
                    if next == t {
                        break;
                    }
                    t = next;
                }
                out
            }
            Cycle::Table(ts) => ts.iter().copied().filter(|&t| t < horizon).collect(),
        }
    }
}
