//! Duration sampling — the narrow interface to the number-generation service.
//!
//! The kernel never implements distribution algorithms. A work group carries
//! a `DurationSampler` trait object; applications implement it over whatever
//! distribution types they use (typically `rand` distributions drawn through
//! [`ElementRng::draw`](pdes_core::ElementRng::draw)).

use pdes_core::ElementRng;

/// Draws an activity duration for one execution of a work group.
///
/// Called with the requesting element's own RNG so results are deterministic
/// regardless of thread scheduling.
pub trait DurationSampler: Send + Sync {
    fn sample(&self, rng: &mut ElementRng) -> u64;
}

/// A constant duration.
pub struct Fixed(pub u64);

impl DurationSampler for Fixed {
    #[inline]
    fn sample(&self, _rng: &mut ElementRng) -> u64 {
        self.0
    }
}

/// Any closure over the element RNG is a sampler.
impl<F> DurationSampler for F
where
    F: Fn(&mut ElementRng) -> u64 + Send + Sync,
{
    #[inline]
    fn sample(&self, rng: &mut ElementRng) -> u64 {
        self(rng)
    }
}
