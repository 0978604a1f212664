//! Element types and generators.

use pdes_core::{Cycle, ElementTypeId};

use crate::Flow;

/// A category of active entities sharing a priority and an activity flow.
#[derive(Clone, Debug)]
pub struct ElementType {
    pub name: String,

    /// Queue priority for every element of this type; lower values are
    /// served first.
    pub priority: u8,

    pub flow: Flow,
}

/// Creates `count` elements of `element_type` at every fire timestamp of
/// `cycle`.
#[derive(Clone, Debug)]
pub struct Generator {
    pub element_type: ElementTypeId,
    pub count:        u32,
    pub cycle:        Cycle,
}
