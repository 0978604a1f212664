//! Work-group eligibility conditions.

use pdes_core::{ActivityId, ElementId, ElementTypeId, SimTime};

/// Read-only view of the requesting element passed to every condition check.
#[derive(Copy, Clone, Debug)]
pub struct ConditionCtx {
    /// Current simulation timestamp.
    pub now: SimTime,
    /// The element requesting the activity.
    pub element: ElementId,
    /// Its element type.
    pub element_type: ElementTypeId,
    /// The activity being requested.
    pub activity: ActivityId,
}

/// Eligibility predicate attached to a work group.
///
/// Checked every time the owning manager re-evaluates the requesting work
/// item, so implementations must be pure: same context, same answer, no side
/// effects. The engine may call conditions from several worker threads, hence
/// the `Send + Sync` bound.
pub trait Condition: Send + Sync {
    fn check(&self, ctx: &ConditionCtx) -> bool;
}

/// The always-true condition — the default for unconditional work groups.
pub struct Always;

impl Condition for Always {
    #[inline]
    fn check(&self, _ctx: &ConditionCtx) -> bool {
        true
    }
}

/// Any pure closure over the context is a condition.
impl<F> Condition for F
where
    F: Fn(&ConditionCtx) -> bool + Send + Sync,
{
    #[inline]
    fn check(&self, ctx: &ConditionCtx) -> bool {
        self(ctx)
    }
}
