use pdes_core::{ActivityId, ElementTypeId, GeneratorId, ResourceId, ResourceTypeId};
use thiserror::Error;

/// Model-definition errors. All are raised at build time — the kernel never
/// starts a run on an invalid graph.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown resource type {0}")]
    UnknownResourceType(ResourceTypeId),

    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),

    #[error("unknown activity {0}")]
    UnknownActivity(ActivityId),

    #[error("unknown element type {0}")]
    UnknownElementType(ElementTypeId),

    #[error("activity '{activity}' declares no work groups")]
    NoWorkGroups { activity: String },

    #[error("work group {index} of activity '{activity}' requires no resources")]
    EmptyWorkGroup { activity: String, index: usize },

    #[error("work group {index} of activity '{activity}' requires a zero count of {role}")]
    ZeroCount {
        activity: String,
        index:    usize,
        role:     ResourceTypeId,
    },

    #[error("time-driven activity '{activity}' has a work group without a duration")]
    MissingDuration { activity: String },

    #[error("instantaneous activity '{activity}' has a work group with a duration")]
    UnexpectedDuration { activity: String },

    #[error("invalid cycle on '{context}': {reason}")]
    BadCycle { context: String, reason: String },

    #[error("timetable entry on resource '{resource}' has zero duration")]
    ZeroWindow { resource: String },

    #[error("flow of element type '{element_type}' cannot terminate from activity '{activity}'")]
    FlowNotTerminating {
        element_type: String,
        activity:     String,
    },

    #[error("invalid transition table for element type '{element_type}': {reason}")]
    BadTransition {
        element_type: String,
        reason:       String,
    },

    #[error("generator {0} creates zero elements per fire")]
    ZeroGeneratorCount(GeneratorId),
}

pub type ModelResult<T> = Result<T, ModelError>;
