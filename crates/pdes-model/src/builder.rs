//! `ModelBuilder` — the construction context — and the frozen [`Model`].
//!
//! The builder hands out every identifier (there is no global counter
//! state), collects declarations, and validates the whole graph in one pass
//! at `build()`. Validation failures are descriptive and non-recoverable:
//! the kernel never runs a model it could not fully check.
//!
//! # Partitioning
//!
//! `build()` also computes the activity-manager partitions: two activities or
//! resource types belong to the same manager iff they are connected —
//! transitively — through a shared work group. Resource types no work group
//! references get a manager of their own. Manager identifiers are assigned in
//! first-encounter order over activities then resource types, so the same
//! declarations always produce the same partitions.

use std::sync::Arc;

use pdes_core::{
    ActivityId, Cycle, ElementTypeId, GeneratorId, ManagerId, ResourceId, ResourceTypeId,
};

use crate::{
    Activity, Always, CompiledFlow, Condition, DurationSampler, ElementType, ExecutionKind, Flow,
    Generator, ModelError, ModelResult, Resource, ResourceType, TimeTableEntry, WorkGroup,
};

// ── ModelBuilder ──────────────────────────────────────────────────────────────

/// Accumulates model declarations and freezes them into a [`Model`].
#[derive(Default)]
pub struct ModelBuilder {
    resource_types: Vec<ResourceType>,
    resources:      Vec<Resource>,
    activities:     Vec<Activity>,
    element_types:  Vec<ElementType>,
    generators:     Vec<Generator>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a role.
    pub fn new_resource_type(&mut self, name: impl Into<String>) -> ResourceTypeId {
        let id = ResourceTypeId(self.resource_types.len() as u16);
        self.resource_types.push(ResourceType { name: name.into() });
        id
    }

    /// Declare a resource with an empty timetable.
    pub fn new_resource(&mut self, name: impl Into<String>) -> ResourceId {
        let id = ResourceId(self.resources.len() as u32);
        self.resources.push(Resource { name: name.into(), timetable: Vec::new() });
        id
    }

    /// Add an availability rule to a resource: at every fire of `cycle`, the
    /// resource provides `role` for `duration` units.
    pub fn add_timetable_entry(
        &mut self,
        resource: ResourceId,
        cycle:    Cycle,
        duration: u64,
        role:     ResourceTypeId,
    ) {
        if let Some(r) = self.resources.get_mut(resource.index()) {
            r.timetable.push(TimeTableEntry { cycle, duration, role });
        }
    }

    /// Declare an activity with no work groups yet.
    pub fn new_activity(
        &mut self,
        name:     impl Into<String>,
        priority: u8,
        kind:     ExecutionKind,
    ) -> ActivityId {
        let id = ActivityId(self.activities.len() as u16);
        self.activities.push(Activity {
            name: name.into(),
            priority,
            kind,
            workgroups: Vec::new(),
            cancellation: Vec::new(),
        });
        id
    }

    /// Add an unconditional work group to a time-driven activity.
    pub fn new_workgroup(
        &mut self,
        activity: ActivityId,
        priority: u8,
        needs:    Vec<(ResourceTypeId, u32)>,
        duration: impl DurationSampler + 'static,
    ) {
        self.push_workgroup(activity, priority, needs, Arc::new(Always), Some(Arc::new(duration)));
    }

    /// Add a work group with an explicit condition and optional duration.
    /// Pass `None` for work groups of instantaneous activities.
    pub fn new_workgroup_with(
        &mut self,
        activity:  ActivityId,
        priority:  u8,
        needs:     Vec<(ResourceTypeId, u32)>,
        condition: Arc<dyn Condition>,
        duration:  Option<Arc<dyn DurationSampler>>,
    ) {
        self.push_workgroup(activity, priority, needs, condition, duration);
    }

    fn push_workgroup(
        &mut self,
        activity:  ActivityId,
        priority:  u8,
        needs:     Vec<(ResourceTypeId, u32)>,
        condition: Arc<dyn Condition>,
        duration:  Option<Arc<dyn DurationSampler>>,
    ) {
        if let Some(a) = self.activities.get_mut(activity.index()) {
            a.workgroups.push(WorkGroup { priority, needs, condition, duration });
        }
    }

    /// Declare a post-use unavailability period: after a resource caught for
    /// `role` by this activity is released, it stays unavailable for
    /// `duration` more units.
    pub fn add_cancellation(&mut self, activity: ActivityId, role: ResourceTypeId, duration: u64) {
        if let Some(a) = self.activities.get_mut(activity.index()) {
            a.cancellation.push((role, duration));
        }
    }

    /// Declare an element type with its activity flow.
    pub fn new_element_type(
        &mut self,
        name:     impl Into<String>,
        priority: u8,
        flow:     Flow,
    ) -> ElementTypeId {
        let id = ElementTypeId(self.element_types.len() as u16);
        self.element_types.push(ElementType { name: name.into(), priority, flow });
        id
    }

    /// Declare a generator creating `count` elements per fire of `cycle`.
    pub fn new_generator(
        &mut self,
        element_type: ElementTypeId,
        count:        u32,
        cycle:        Cycle,
    ) -> GeneratorId {
        let id = GeneratorId(self.generators.len() as u16);
        self.generators.push(Generator { element_type, count, cycle });
        id
    }

    // ── Freezing ──────────────────────────────────────────────────────────

    /// Validate every declaration and freeze the model.
    pub fn build(self) -> ModelResult<Model> {
        let rt_count = self.resource_types.len();
        let act_count = self.activities.len();

        let check_role = |r: ResourceTypeId| -> ModelResult<()> {
            if r.index() >= rt_count {
                return Err(ModelError::UnknownResourceType(r));
            }
            Ok(())
        };

        // ── Activities and work groups ────────────────────────────────────
        for a in &self.activities {
            if a.workgroups.is_empty() {
                return Err(ModelError::NoWorkGroups { activity: a.name.clone() });
            }
            for (i, wg) in a.workgroups.iter().enumerate() {
                if wg.needs.is_empty() {
                    return Err(ModelError::EmptyWorkGroup {
                        activity: a.name.clone(),
                        index:    i,
                    });
                }
                for &(role, count) in &wg.needs {
                    check_role(role)?;
                    if count == 0 {
                        return Err(ModelError::ZeroCount {
                            activity: a.name.clone(),
                            index:    i,
                            role,
                        });
                    }
                }
                match (a.kind.is_time_driven(), wg.duration.is_some()) {
                    (true, false) => {
                        return Err(ModelError::MissingDuration { activity: a.name.clone() });
                    }
                    (false, true) => {
                        return Err(ModelError::UnexpectedDuration { activity: a.name.clone() });
                    }
                    _ => {}
                }
            }
            for &(role, _) in &a.cancellation {
                check_role(role)?;
            }
        }

        // ── Resources and timetables ──────────────────────────────────────
        for r in &self.resources {
            for entry in &r.timetable {
                check_role(entry.role)?;
                if entry.duration == 0 {
                    return Err(ModelError::ZeroWindow { resource: r.name.clone() });
                }
                validate_cycle(&entry.cycle, &r.name)?;
            }
        }

        // ── Flows ─────────────────────────────────────────────────────────
        let activity_name = |a: ActivityId| {
            self.activities
                .get(a.index())
                .map(|act| act.name.clone())
                .unwrap_or_else(|| a.to_string())
        };
        let mut flows = Vec::with_capacity(self.element_types.len());
        for et in &self.element_types {
            flows.push(CompiledFlow::compile(&et.flow, &et.name, act_count, activity_name)?);
        }

        // ── Generators ────────────────────────────────────────────────────
        for (i, g) in self.generators.iter().enumerate() {
            if g.element_type.index() >= self.element_types.len() {
                return Err(ModelError::UnknownElementType(g.element_type));
            }
            if g.count == 0 {
                return Err(ModelError::ZeroGeneratorCount(GeneratorId(i as u16)));
            }
            validate_cycle(&g.cycle, "generator")?;
        }

        // ── Partitioning ──────────────────────────────────────────────────
        // Union-find over activities [0, A) and resource types [A, A + R),
        // joined through work-group requirements.
        let mut uf = UnionFind::new(act_count + rt_count);
        for (ai, a) in self.activities.iter().enumerate() {
            for wg in &a.workgroups {
                for &(role, _) in &wg.needs {
                    uf.union(ai, act_count + role.index());
                }
            }
        }

        let mut root_to_manager: Vec<Option<ManagerId>> = vec![None; act_count + rt_count];
        let mut manager_count = 0_usize;
        let mut assign = |uf: &mut UnionFind, node: usize| -> ManagerId {
            let root = uf.find(node);
            *root_to_manager[root].get_or_insert_with(|| {
                let id = ManagerId(manager_count as u16);
                manager_count += 1;
                id
            })
        };
        let activity_manager: Vec<ManagerId> =
            (0..act_count).map(|ai| assign(&mut uf, ai)).collect();
        let rtype_manager: Vec<ManagerId> =
            (0..rt_count).map(|ri| assign(&mut uf, act_count + ri)).collect();

        // ── Provider indexes and cross-partition detection ────────────────
        let mut providers_of_type: Vec<Vec<ResourceId>> = vec![Vec::new(); rt_count];
        let mut resource_roles: Vec<Vec<ResourceTypeId>> = Vec::with_capacity(self.resources.len());
        let mut resource_cross: Vec<bool> = Vec::with_capacity(self.resources.len());
        for (ri, r) in self.resources.iter().enumerate() {
            let roles = r.roles();
            for &role in &roles {
                providers_of_type[role.index()].push(ResourceId(ri as u32));
            }
            let mut managers: Vec<ManagerId> =
                roles.iter().map(|role| rtype_manager[role.index()]).collect();
            managers.sort_unstable();
            managers.dedup();
            resource_cross.push(managers.len() > 1);
            resource_roles.push(roles);
        }

        // ── Work-group selection order ────────────────────────────────────
        let wg_order: Vec<Vec<usize>> = self
            .activities
            .iter()
            .map(|a| {
                let mut order: Vec<usize> = (0..a.workgroups.len()).collect();
                order.sort_by_key(|&i| (a.workgroups[i].priority, i));
                order
            })
            .collect();

        Ok(Model {
            resource_types: self.resource_types,
            resources: self.resources,
            activities: self.activities,
            element_types: self.element_types,
            generators: self.generators,
            flows,
            activity_manager,
            rtype_manager,
            manager_count,
            providers_of_type,
            resource_roles,
            resource_cross,
            wg_order,
        })
    }
}

fn validate_cycle(cycle: &Cycle, context: &str) -> ModelResult<()> {
    match cycle {
        Cycle::Periodic { period, .. } if *period == 0 => Err(ModelError::BadCycle {
            context: context.to_string(),
            reason:  "period must be positive".into(),
        }),
        Cycle::Table(ts) if ts.windows(2).any(|w| w[0] > w[1]) => Err(ModelError::BadCycle {
            context: context.to_string(),
            reason:  "table timestamps must be sorted ascending".into(),
        }),
        _ => Ok(()),
    }
}

// ── Model ─────────────────────────────────────────────────────────────────────

/// A fully validated, frozen simulation model.
///
/// The engine reads it, never mutates it; everything derived at build time
/// (partitions, provider indexes, work-group orders, compiled flows) lives
/// here so the run needs no further graph analysis.
pub struct Model {
    pub resource_types: Vec<ResourceType>,
    pub resources:      Vec<Resource>,
    pub activities:     Vec<Activity>,
    pub element_types:  Vec<ElementType>,
    pub generators:     Vec<Generator>,

    /// Compiled flow per element type.
    pub flows: Vec<CompiledFlow>,

    /// Owning manager per activity.
    pub activity_manager: Vec<ManagerId>,
    /// Owning manager per resource type.
    pub rtype_manager: Vec<ManagerId>,
    /// Total number of manager partitions.
    pub manager_count: usize,

    /// Resources providing each role, sorted by resource id.
    pub providers_of_type: Vec<Vec<ResourceId>>,
    /// Distinct roles per resource, sorted.
    pub resource_roles: Vec<Vec<ResourceTypeId>>,
    /// `true` for resources whose roles span more than one manager.
    pub resource_cross: Vec<bool>,

    /// Work-group indices per activity, sorted by `(priority, declaration)`.
    pub wg_order: Vec<Vec<usize>>,
}

impl Model {
    #[inline]
    pub fn activity(&self, id: ActivityId) -> &Activity {
        &self.activities[id.index()]
    }

    #[inline]
    pub fn element_type(&self, id: ElementTypeId) -> &ElementType {
        &self.element_types[id.index()]
    }

    #[inline]
    pub fn flow(&self, element_type: ElementTypeId) -> &CompiledFlow {
        &self.flows[element_type.index()]
    }

    /// Managers owning any role of `resource`, deduplicated.
    pub fn managers_of_resource(&self, resource: ResourceId) -> Vec<ManagerId> {
        let mut out: Vec<ManagerId> = self.resource_roles[resource.index()]
            .iter()
            .map(|role| self.rtype_manager[role.index()])
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

// ── UnionFind ─────────────────────────────────────────────────────────────────

/// Minimal union-find with path halving, used only at build time.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Attach the higher root to the lower so roots are reproducible.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}
