//! Simulation time model.
//!
//! # Design
//!
//! Time is a monotonically increasing `SimTime` counter in a fixed base unit
//! chosen by the model (minutes, hours — the kernel is agnostic). Using an
//! integer as the canonical unit means all schedule arithmetic is exact and
//! comparisons are O(1). The value `SimTime::NEVER` is reserved as the
//! "never happens" sentinel: it compares greater than every reachable
//! timestamp, so availability windows that never close and cycles that never
//! end are ordinary comparisons, not special cases.

use std::fmt;

// ── SimTime ───────────────────────────────────────────────────────────────────

/// An absolute simulation timestamp.
///
/// Stored as `u64`; `u64::MAX` is reserved for [`SimTime::NEVER`] and must not
/// be produced by timestamp arithmetic.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    /// Sentinel meaning "never": greater than every reachable timestamp.
    pub const NEVER: SimTime = SimTime(u64::MAX);

    /// Return the timestamp `n` units after `self`. Saturates at `NEVER`.
    #[inline]
    pub fn offset(self, n: u64) -> SimTime {
        SimTime(self.0.saturating_add(n))
    }

    /// Units elapsed from `earlier` to `self`.
    ///
    /// # Panics
    /// Panics in debug mode if `earlier > self`.
    #[inline]
    pub fn since(self, earlier: SimTime) -> u64 {
        self.0 - earlier.0
    }

    /// `true` if this is the [`NEVER`](SimTime::NEVER) sentinel.
    #[inline]
    pub fn is_never(self) -> bool {
        self == SimTime::NEVER
    }
}

impl std::ops::Add<u64> for SimTime {
    type Output = SimTime;
    #[inline]
    fn add(self, rhs: u64) -> SimTime {
        self.offset(rhs)
    }
}

impl std::ops::Sub for SimTime {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: SimTime) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_never() {
            write!(f, "t=never")
        } else {
            write!(f, "t{}", self.0)
        }
    }
}

// ── KernelConfig ──────────────────────────────────────────────────────────────

/// Top-level run configuration.
///
/// Built by the application and passed to the simulation builder; the kernel
/// is frozen once the run starts.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KernelConfig {
    /// Timestamp of the first clock value.
    pub start_ts: SimTime,

    /// Exclusive upper bound: no round executes at or after this timestamp.
    pub end_ts: SimTime,

    /// Master RNG seed. The same seed always produces identical results.
    pub seed: u64,

    /// Worker thread count for the executor pool. `None` uses all logical
    /// cores.
    pub num_threads: Option<usize>,
}

impl KernelConfig {
    /// A config running over `[start_ts, end_ts)` with the given seed and the
    /// default thread count.
    pub fn new(start_ts: SimTime, end_ts: SimTime, seed: u64) -> Self {
        Self { start_ts, end_ts, seed, num_threads: None }
    }

    /// Override the worker thread count.
    pub fn with_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> crate::CoreResult<()> {
        if self.end_ts <= self.start_ts {
            return Err(crate::CoreError::Config(format!(
                "end timestamp {} must be after start timestamp {}",
                self.end_ts, self.start_ts
            )));
        }
        if self.end_ts.is_never() {
            return Err(crate::CoreError::Config(
                "end timestamp must be finite".into(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(crate::CoreError::Config(
                "worker thread count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
