//! Unit tests for pdes-core.

use crate::{Cycle, ElementId, ElementRng, KernelConfig, KernelRng, SimTime, WorkItemId};

// ── SimTime ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod time_tests {
    use super::*;

    #[test]
    fn offset_and_since_are_inverse() {
        let t = SimTime(100);
        assert_eq!(t.offset(25), SimTime(125));
        assert_eq!(SimTime(125).since(t), 25);
        assert_eq!(SimTime(125) - t, 25);
    }

    #[test]
    fn never_sorts_after_everything() {
        assert!(SimTime::NEVER > SimTime(u64::MAX - 1));
        assert!(SimTime::ZERO < SimTime::NEVER);
        assert!(SimTime::NEVER.is_never());
        assert!(!SimTime(42).is_never());
    }

    #[test]
    fn offset_saturates_at_never() {
        assert_eq!(SimTime(u64::MAX - 1).offset(10), SimTime::NEVER);
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(SimTime(7).to_string(), "t7");
        assert_eq!(SimTime::NEVER.to_string(), "t=never");
    }

    #[test]
    fn config_rejects_empty_interval() {
        let cfg = KernelConfig::new(SimTime(10), SimTime(10), 1);
        assert!(cfg.validate().is_err());
        let cfg = KernelConfig::new(SimTime(10), SimTime(5), 1);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_rejects_zero_threads() {
        let mut cfg = KernelConfig::new(SimTime::ZERO, SimTime(100), 1);
        cfg.num_threads = Some(0);
        assert!(cfg.validate().is_err());
        assert!(cfg.with_threads(2).validate().is_ok());
    }

    #[test]
    fn config_rejects_unbounded_end() {
        let cfg = KernelConfig::new(SimTime::ZERO, SimTime::NEVER, 1);
        assert!(cfg.validate().is_err());
    }
}

// ── Cycle ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod cycle_tests {
    use super::*;

    #[test]
    fn periodic_fires_until_horizon() {
        let c = Cycle::every(SimTime(2), 5);
        assert_eq!(
            c.times_until(SimTime(20)),
            vec![SimTime(2), SimTime(7), SimTime(12), SimTime(17)]
        );
    }

    #[test]
    fn periodic_respects_own_bound() {
        let c = Cycle::Periodic { start: SimTime(0), period: 10, until: SimTime(25) };
        assert_eq!(
            c.times_until(SimTime(1_000)),
            vec![SimTime(0), SimTime(10), SimTime(20)]
        );
    }

    #[test]
    fn once_fires_once() {
        let c = Cycle::once(SimTime(5));
        assert_eq!(c.times_until(SimTime(10)), vec![SimTime(5)]);
        assert_eq!(c.times_until(SimTime(5)), Vec::<SimTime>::new());
    }

    #[test]
    fn table_filters_past_horizon() {
        let c = Cycle::Table(vec![SimTime(1), SimTime(4), SimTime(9)]);
        assert_eq!(c.times_until(SimTime(5)), vec![SimTime(1), SimTime(4)]);
    }

    #[test]
    fn empty_detection() {
        assert!(Cycle::Table(vec![]).is_empty());
        assert!(Cycle::Periodic { start: SimTime(9), period: 1, until: SimTime(9) }.is_empty());
        assert!(!Cycle::every(SimTime::ZERO, 1).is_empty());
    }
}

// ── Ids ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod id_tests {
    use super::*;

    #[test]
    fn work_item_order_is_element_then_serial() {
        let a = WorkItemId::new(ElementId(1), 5);
        let b = WorkItemId::new(ElementId(2), 0);
        let c = WorkItemId::new(ElementId(2), 1);
        assert!(a < b && b < c);
    }

    #[test]
    fn invalid_is_default() {
        assert_eq!(ElementId::default(), ElementId::INVALID);
        assert_eq!(ElementId::INVALID.0, u32::MAX);
    }
}

// ── Rng ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod rng_tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = ElementRng::new(42, ElementId(7));
        let mut b = ElementRng::new(42, ElementId(7));
        for _ in 0..16 {
            assert_eq!(a.gen_range(0_u64..1_000_000), b.gen_range(0_u64..1_000_000));
        }
    }

    #[test]
    fn distinct_elements_distinct_streams() {
        let mut a = ElementRng::new(42, ElementId(0));
        let mut b = ElementRng::new(42, ElementId(1));
        let sa: Vec<u64> = (0..8).map(|_| a.gen_range(0_u64..u64::MAX)).collect();
        let sb: Vec<u64> = (0..8).map(|_| b.gen_range(0_u64..u64::MAX)).collect();
        assert_ne!(sa, sb);
    }

    #[test]
    fn kernel_rng_children_diverge() {
        let mut root = KernelRng::new(1);
        let mut c1 = root.child(1);
        let mut c2 = root.child(2);
        assert_ne!(
            c1.gen_range(0_u64..u64::MAX),
            c2.gen_range(0_u64..u64::MAX)
        );
    }

    #[test]
    fn gen_bool_extremes() {
        let mut rng = ElementRng::new(9, ElementId(3));
        assert!(!rng.gen_bool(0.0));
        assert!(rng.gen_bool(1.0));
        // Out-of-range probabilities are clamped, not panicking.
        assert!(rng.gen_bool(2.5));
    }
}
