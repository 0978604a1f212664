//! Element activity flows.
//!
//! A flow says which activity an element performs first and, after each
//! activity finishes, which activity (or the end of the element's life)
//! follows. Successors are drawn from a weighted table with the element's own
//! RNG, so flows are stochastic but reproducible.
//!
//! An activity with no declared transition implicitly finishes the flow.

use pdes_core::{ActivityId, ElementRng};
use rand::distributions::WeightedIndex;

use crate::{ModelError, ModelResult};

// ── Successor ─────────────────────────────────────────────────────────────────

/// What follows a finished activity.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Successor {
    Activity(ActivityId),
    /// The element's flow is complete; the element is destroyed.
    Finish,
}

// ── Flow (declaration) ────────────────────────────────────────────────────────

/// Declared transition table for one element type.
#[derive(Clone, Debug)]
pub struct Flow {
    /// The first activity every element of this type requests.
    pub start: ActivityId,

    /// Weighted successor lists per activity. Activities without an entry
    /// transition to [`Successor::Finish`].
    pub edges: Vec<(ActivityId, Vec<(Successor, f64)>)>,
}

impl Flow {
    /// A deterministic linear flow: `ids[0] → ids[1] → … → Finish`.
    ///
    /// # Panics
    /// Panics if `ids` is empty — a flow must request at least one activity.
    pub fn sequence(ids: &[ActivityId]) -> Flow {
        assert!(!ids.is_empty(), "a flow needs at least one activity");
        let edges = ids
            .windows(2)
            .map(|w| (w[0], vec![(Successor::Activity(w[1]), 1.0)]))
            .collect();
        Flow { start: ids[0], edges }
    }
}

// ── CompiledFlow ──────────────────────────────────────────────────────────────

/// A flow validated and compiled for execution: successor lists paired with
/// prebuilt weighted indices, plus a terminality proof.
pub struct CompiledFlow {
    start: ActivityId,
    /// Indexed by activity; `None` means "finish after this activity".
    table: Vec<Option<(Vec<Successor>, WeightedIndex<f64>)>>,
}

impl CompiledFlow {
    /// The activity every element of this type requests first.
    #[inline]
    pub fn start(&self) -> ActivityId {
        self.start
    }

    /// Draw the successor of `finished` with the element's RNG.
    pub fn next(&self, finished: ActivityId, rng: &mut ElementRng) -> Successor {
        match self.table.get(finished.index()).and_then(|e| e.as_ref()) {
            None => Successor::Finish,
            Some((succs, weights)) => succs[rng.draw(weights)],
        }
    }

    /// Compile and validate a declared flow against an activity count.
    ///
    /// Rejects unknown activities, non-positive weights, and — the terminal
    /// check — any activity reachable from the start that cannot reach
    /// [`Successor::Finish`] through some path.
    pub(crate) fn compile(
        flow:           &Flow,
        element_type:   &str,
        activity_count: usize,
        activity_name:  impl Fn(ActivityId) -> String,
    ) -> ModelResult<CompiledFlow> {
        let check = |a: ActivityId| -> ModelResult<()> {
            if a.index() >= activity_count {
                return Err(ModelError::UnknownActivity(a));
            }
            Ok(())
        };

        check(flow.start)?;

        let mut table: Vec<Option<(Vec<Successor>, WeightedIndex<f64>)>> =
            (0..activity_count).map(|_| None).collect();

        for (from, succs) in &flow.edges {
            check(*from)?;
            if table[from.index()].is_some() {
                return Err(ModelError::BadTransition {
                    element_type: element_type.to_string(),
                    reason:       format!("duplicate transitions for {}", activity_name(*from)),
                });
            }
            let mut targets = Vec::with_capacity(succs.len());
            let mut weights = Vec::with_capacity(succs.len());
            for &(succ, w) in succs {
                if let Successor::Activity(a) = succ {
                    check(a)?;
                }
                if !(w.is_finite() && w > 0.0) {
                    return Err(ModelError::BadTransition {
                        element_type: element_type.to_string(),
                        reason:       format!("non-positive weight {w}"),
                    });
                }
                targets.push(succ);
                weights.push(w);
            }
            let index = WeightedIndex::new(&weights).map_err(|e| ModelError::BadTransition {
                element_type: element_type.to_string(),
                reason:       e.to_string(),
            })?;
            table[from.index()] = Some((targets, index));
        }

        // Terminality: every activity reachable from the start must be able
        // to reach Finish. Fixpoint over "can finish".
        let mut can_finish: Vec<bool> = table
            .iter()
            .map(|entry| match entry {
                None => true,
                Some((succs, _)) => succs.iter().any(|s| *s == Successor::Finish),
            })
            .collect();
        loop {
            let mut changed = false;
            for (i, entry) in table.iter().enumerate() {
                if can_finish[i] {
                    continue;
                }
                let Some((succs, _)) = entry else { continue };
                let ok = succs.iter().any(|s| match s {
                    Successor::Finish => true,
                    Successor::Activity(a) => can_finish[a.index()],
                });
                if ok {
                    can_finish[i] = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        // Walk reachability from the start and demand terminality for every
        // visited activity.
        let mut visited = vec![false; activity_count];
        let mut stack = vec![flow.start];
        while let Some(a) = stack.pop() {
            if std::mem::replace(&mut visited[a.index()], true) {
                continue;
            }
            if !can_finish[a.index()] {
                return Err(ModelError::FlowNotTerminating {
                    element_type: element_type.to_string(),
                    activity:     activity_name(a),
                });
            }
            if let Some((succs, _)) = &table[a.index()] {
                for s in succs {
                    if let Successor::Activity(next) = s {
                        stack.push(*next);
                    }
                }
            }
        }

        Ok(CompiledFlow { start: flow.start, table })
    }
}
