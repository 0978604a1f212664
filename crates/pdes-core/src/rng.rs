//! Deterministic per-element and kernel-level RNG wrappers.
//!
//! # Determinism strategy
//!
//! Each element gets its own independent `SmallRng` seeded by:
//!
//!   seed = global_seed XOR (element_id * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive element IDs uniformly across the seed space.
//! This means:
//!
//! - Elements never share RNG state, so draw sequences are independent of
//!   which worker thread serves an element and in what order.
//! - Adding elements at the end of a run does not disturb the streams of
//!   existing elements.
//!
//! The kernel consumes distribution objects through these wrappers; it never
//! implements sampling algorithms itself.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::ElementId;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

// ── ElementRng ────────────────────────────────────────────────────────────────

/// Per-element deterministic RNG.
///
/// Created when the element is created; every stochastic decision in the
/// element's lifecycle (workgroup durations, flow successors) draws from it.
pub struct ElementRng(SmallRng);

impl ElementRng {
    /// Seed deterministically from the run's global seed and an element ID.
    pub fn new(global_seed: u64, element: ElementId) -> Self {
        let seed = global_seed ^ (element.0 as u64).wrapping_mul(MIXING_CONSTANT);
        ElementRng(SmallRng::seed_from_u64(seed))
    }

    /// Expose the inner `SmallRng` for use with `rand` distribution types
    /// (`dist.sample(rng.inner())`).
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Sample from any `rand` distribution over `T`.
    #[inline]
    pub fn draw<T, D>(&mut self, dist: &D) -> T
    where
        D: rand::distributions::Distribution<T>,
    {
        dist.sample(&mut self.0)
    }
}

// ── KernelRng ─────────────────────────────────────────────────────────────────

/// Kernel-level RNG for draws not attached to any element.
///
/// Used only in single-threaded contexts (initialization, the controller
/// thread). Derive per-purpose children with [`KernelRng::child`] to keep
/// streams independent.
pub struct KernelRng(SmallRng);

impl KernelRng {
    pub fn new(seed: u64) -> Self {
        KernelRng(SmallRng::seed_from_u64(seed))
    }

    /// Derive a child RNG with a different seed offset.
    pub fn child(&mut self, offset: u64) -> KernelRng {
        let child_seed: u64 = self.0.r#gen::<u64>() ^ offset.wrapping_mul(MIXING_CONSTANT);
        KernelRng(SmallRng::seed_from_u64(child_seed))
    }

    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }
}
