//! Unit tests for pdes-model.

use pdes_core::{ActivityId, Cycle, ElementId, ElementRng, ResourceTypeId, SimTime};

use crate::{
    ExecutionKind, Fixed, Flow, ModelBuilder, ModelError, Successor,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// One activity, one role, one resource, one element type, one generator.
fn minimal_builder() -> ModelBuilder {
    let mut b = ModelBuilder::new();
    let role = b.new_resource_type("BED");
    let res = b.new_resource("bed-1");
    b.add_timetable_entry(res, Cycle::once(SimTime::ZERO), 100, role);
    let act = b.new_activity("Stay", 0, ExecutionKind::time_driven());
    b.new_workgroup(act, 0, vec![(role, 1)], Fixed(3));
    let et = b.new_element_type("patient", 0, Flow::sequence(&[act]));
    b.new_generator(et, 1, Cycle::once(SimTime::ZERO));
    b
}

// ── Builder validation ────────────────────────────────────────────────────────

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn minimal_model_builds() {
        let model = minimal_builder().build().unwrap();
        assert_eq!(model.manager_count, 1);
        assert_eq!(model.activities.len(), 1);
        assert!(!model.resource_cross[0]);
    }

    #[test]
    fn unknown_role_in_workgroup_rejected() {
        let mut b = ModelBuilder::new();
        let act = b.new_activity("A", 0, ExecutionKind::time_driven());
        b.new_workgroup(act, 0, vec![(ResourceTypeId(9), 1)], Fixed(1));
        b.new_element_type("e", 0, Flow::sequence(&[act]));
        assert!(matches!(
            b.build(),
            Err(ModelError::UnknownResourceType(ResourceTypeId(9)))
        ));
    }

    #[test]
    fn activity_without_workgroups_rejected() {
        let mut b = ModelBuilder::new();
        b.new_activity("A", 0, ExecutionKind::time_driven());
        assert!(matches!(b.build(), Err(ModelError::NoWorkGroups { .. })));
    }

    #[test]
    fn zero_requirement_count_rejected() {
        let mut b = ModelBuilder::new();
        let role = b.new_resource_type("R");
        let act = b.new_activity("A", 0, ExecutionKind::time_driven());
        b.new_workgroup(act, 0, vec![(role, 0)], Fixed(1));
        assert!(matches!(b.build(), Err(ModelError::ZeroCount { .. })));
    }

    #[test]
    fn time_driven_without_duration_rejected() {
        let mut b = ModelBuilder::new();
        let role = b.new_resource_type("R");
        let act = b.new_activity("A", 0, ExecutionKind::time_driven());
        b.new_workgroup_with(act, 0, vec![(role, 1)], std::sync::Arc::new(crate::Always), None);
        assert!(matches!(b.build(), Err(ModelError::MissingDuration { .. })));
    }

    #[test]
    fn instant_with_duration_rejected() {
        let mut b = ModelBuilder::new();
        let role = b.new_resource_type("R");
        let act = b.new_activity("A", 0, ExecutionKind::Instant);
        b.new_workgroup(act, 0, vec![(role, 1)], Fixed(1));
        assert!(matches!(b.build(), Err(ModelError::UnexpectedDuration { .. })));
    }

    #[test]
    fn zero_period_cycle_rejected() {
        let mut b = minimal_builder();
        let role = ResourceTypeId(0);
        let res = b.new_resource("bad");
        b.add_timetable_entry(
            res,
            Cycle::Periodic { start: SimTime::ZERO, period: 0, until: SimTime::NEVER },
            5,
            role,
        );
        assert!(matches!(b.build(), Err(ModelError::BadCycle { .. })));
    }

    #[test]
    fn zero_window_rejected() {
        let mut b = minimal_builder();
        let res = b.new_resource("bad");
        b.add_timetable_entry(res, Cycle::once(SimTime::ZERO), 0, ResourceTypeId(0));
        assert!(matches!(b.build(), Err(ModelError::ZeroWindow { .. })));
    }

    #[test]
    fn zero_count_generator_rejected() {
        let mut b = minimal_builder();
        b.new_generator(pdes_core::ElementTypeId(0), 0, Cycle::once(SimTime::ZERO));
        assert!(matches!(b.build(), Err(ModelError::ZeroGeneratorCount(_))));
    }
}

// ── Flow compilation ──────────────────────────────────────────────────────────

#[cfg(test)]
mod flow_tests {
    use super::*;

    #[test]
    fn sequence_chains_and_finishes() {
        let mut b = ModelBuilder::new();
        let role = b.new_resource_type("R");
        let a0 = b.new_activity("first", 0, ExecutionKind::time_driven());
        let a1 = b.new_activity("second", 0, ExecutionKind::time_driven());
        b.new_workgroup(a0, 0, vec![(role, 1)], Fixed(1));
        b.new_workgroup(a1, 0, vec![(role, 1)], Fixed(1));
        let et = b.new_element_type("e", 0, Flow::sequence(&[a0, a1]));
        let model = b.build().unwrap();

        let flow = model.flow(et);
        assert_eq!(flow.start(), a0);
        let mut rng = ElementRng::new(0, ElementId(0));
        assert_eq!(flow.next(a0, &mut rng), Successor::Activity(a1));
        assert_eq!(flow.next(a1, &mut rng), Successor::Finish);
    }

    #[test]
    fn non_terminating_cycle_rejected() {
        let mut b = ModelBuilder::new();
        let role = b.new_resource_type("R");
        let a0 = b.new_activity("loop-a", 0, ExecutionKind::time_driven());
        let a1 = b.new_activity("loop-b", 0, ExecutionKind::time_driven());
        b.new_workgroup(a0, 0, vec![(role, 1)], Fixed(1));
        b.new_workgroup(a1, 0, vec![(role, 1)], Fixed(1));
        // a0 → a1 → a0, no path to Finish anywhere.
        let flow = Flow {
            start: a0,
            edges: vec![
                (a0, vec![(Successor::Activity(a1), 1.0)]),
                (a1, vec![(Successor::Activity(a0), 1.0)]),
            ],
        };
        b.new_element_type("e", 0, flow);
        assert!(matches!(b.build(), Err(ModelError::FlowNotTerminating { .. })));
    }

    #[test]
    fn cycle_with_exit_accepted() {
        let mut b = ModelBuilder::new();
        let role = b.new_resource_type("R");
        let a0 = b.new_activity("retry", 0, ExecutionKind::time_driven());
        b.new_workgroup(a0, 0, vec![(role, 1)], Fixed(1));
        // a0 loops to itself with 0.9 weight but can also finish.
        let flow = Flow {
            start: a0,
            edges: vec![(
                a0,
                vec![(Successor::Activity(a0), 0.9), (Successor::Finish, 0.1)],
            )],
        };
        b.new_element_type("e", 0, flow);
        assert!(b.build().is_ok());
    }

    #[test]
    fn negative_weight_rejected() {
        let mut b = ModelBuilder::new();
        let role = b.new_resource_type("R");
        let a0 = b.new_activity("A", 0, ExecutionKind::time_driven());
        b.new_workgroup(a0, 0, vec![(role, 1)], Fixed(1));
        let flow = Flow {
            start: a0,
            edges: vec![(a0, vec![(Successor::Finish, -1.0)])],
        };
        b.new_element_type("e", 0, flow);
        assert!(matches!(b.build(), Err(ModelError::BadTransition { .. })));
    }

    #[test]
    fn unknown_start_rejected() {
        let mut b = ModelBuilder::new();
        b.new_element_type("e", 0, Flow::sequence(&[ActivityId(7)]));
        assert!(matches!(b.build(), Err(ModelError::UnknownActivity(_))));
    }
}

// ── Partitioning ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod partition_tests {
    use super::*;

    #[test]
    fn connected_activities_share_a_manager() {
        let mut b = ModelBuilder::new();
        let r0 = b.new_resource_type("R0");
        let a0 = b.new_activity("A0", 0, ExecutionKind::time_driven());
        let a1 = b.new_activity("A1", 0, ExecutionKind::time_driven());
        b.new_workgroup(a0, 0, vec![(r0, 1)], Fixed(1));
        b.new_workgroup(a1, 0, vec![(r0, 1)], Fixed(1));
        b.new_element_type("e", 0, Flow::sequence(&[a0]));
        let model = b.build().unwrap();

        assert_eq!(model.manager_count, 1);
        assert_eq!(model.activity_manager[0], model.activity_manager[1]);
        assert_eq!(model.rtype_manager[0], model.activity_manager[0]);
    }

    #[test]
    fn disjoint_activities_get_distinct_managers() {
        let mut b = ModelBuilder::new();
        let r0 = b.new_resource_type("R0");
        let r1 = b.new_resource_type("R1");
        let a0 = b.new_activity("A0", 0, ExecutionKind::time_driven());
        let a1 = b.new_activity("A1", 0, ExecutionKind::time_driven());
        b.new_workgroup(a0, 0, vec![(r0, 1)], Fixed(1));
        b.new_workgroup(a1, 0, vec![(r1, 1)], Fixed(1));
        b.new_element_type("e", 0, Flow::sequence(&[a0]));
        let model = b.build().unwrap();

        assert_eq!(model.manager_count, 2);
        assert_ne!(model.activity_manager[0], model.activity_manager[1]);
    }

    #[test]
    fn multi_role_resource_spanning_managers_is_cross() {
        let mut b = ModelBuilder::new();
        let r0 = b.new_resource_type("R0");
        let r1 = b.new_resource_type("R1");
        let a0 = b.new_activity("A0", 0, ExecutionKind::time_driven());
        let a1 = b.new_activity("A1", 0, ExecutionKind::time_driven());
        b.new_workgroup(a0, 0, vec![(r0, 1)], Fixed(1));
        b.new_workgroup(a1, 0, vec![(r1, 1)], Fixed(1));
        // One physical resource provides both roles.
        let shared = b.new_resource("shared");
        b.add_timetable_entry(shared, Cycle::once(SimTime::ZERO), 50, r0);
        b.add_timetable_entry(shared, Cycle::once(SimTime::ZERO), 50, r1);
        b.new_element_type("e", 0, Flow::sequence(&[a0]));
        let model = b.build().unwrap();

        assert_eq!(model.manager_count, 2);
        assert!(model.resource_cross[shared.index()]);
        assert_eq!(model.managers_of_resource(shared).len(), 2);
        assert_eq!(model.providers_of_type[r0.index()], vec![shared]);
        assert_eq!(model.providers_of_type[r1.index()], vec![shared]);
    }

    #[test]
    fn unreferenced_role_gets_own_manager() {
        let mut b = minimal_builder();
        b.new_resource_type("orphan");
        let model = b.build().unwrap();
        assert_eq!(model.manager_count, 2);
    }
}

// ── Work-group selection order ────────────────────────────────────────────────

#[cfg(test)]
mod workgroup_tests {
    use super::*;

    #[test]
    fn order_is_priority_then_declaration() {
        let mut b = ModelBuilder::new();
        let role = b.new_resource_type("R");
        let act = b.new_activity("A", 0, ExecutionKind::time_driven());
        b.new_workgroup(act, 2, vec![(role, 1)], Fixed(1)); // declared first, low priority
        b.new_workgroup(act, 1, vec![(role, 1)], Fixed(1));
        b.new_workgroup(act, 1, vec![(role, 2)], Fixed(1)); // same priority, later
        b.new_element_type("e", 0, Flow::sequence(&[act]));
        let model = b.build().unwrap();

        assert_eq!(model.wg_order[act.index()], vec![1, 2, 0]);
    }

    #[test]
    fn cancellation_lookup() {
        let mut b = ModelBuilder::new();
        let role = b.new_resource_type("R");
        let other = b.new_resource_type("S");
        let act = b.new_activity("A", 0, ExecutionKind::time_driven());
        b.new_workgroup(act, 0, vec![(role, 1)], Fixed(1));
        b.add_cancellation(act, role, 7);
        b.new_element_type("e", 0, Flow::sequence(&[act]));
        let model = b.build().unwrap();

        let a = model.activity(act);
        assert_eq!(a.cancellation_for(role), Some(7));
        assert_eq!(a.cancellation_for(other), None);
    }
}
