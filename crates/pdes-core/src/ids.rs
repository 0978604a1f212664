//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony. The inner integer is `pub` to allow
//! direct indexing into registry `Vec`s via `id.index()`. Identifiers are
//! handed out by the model builder; there are no global counters.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }
    };
}

typed_id! {
    /// Index of an element (active entity) in the kernel registry.
    pub struct ElementId(u32);
}

typed_id! {
    /// Index of an element type. `u16` keeps queue keys compact.
    pub struct ElementTypeId(u16);
}

typed_id! {
    /// Index of an activity in the model's activity table.
    pub struct ActivityId(u16);
}

typed_id! {
    /// Index of a resource in the kernel registry.
    pub struct ResourceId(u32);
}

typed_id! {
    /// Index of a resource type (role).
    pub struct ResourceTypeId(u16);
}

typed_id! {
    /// Index of an activity-manager partition.
    pub struct ManagerId(u16);
}

typed_id! {
    /// Index of an element generator.
    pub struct GeneratorId(u16);
}

// ── WorkItemId ────────────────────────────────────────────────────────────────

/// Identity of one element's attempt to execute one activity.
///
/// The derived lexicographic order — element first, then the per-element
/// serial — is total and stable across runs; it is the canonical order used
/// for conflict-zone gate stacks and wait-queue tie-breaks.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkItemId {
    pub element: ElementId,
    pub serial:  u32,
}

impl WorkItemId {
    #[inline]
    pub fn new(element: ElementId, serial: u32) -> Self {
        Self { element, serial }
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkItem({}.{})", self.element.0, self.serial)
    }
}
