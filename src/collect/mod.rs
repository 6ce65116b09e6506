//! The two scans over the dump
//!
//! [`EntityCollector`] selects entities and collects their properties,
//! leaving references to other entities unresolved. [`ReferenceResolver`]
//! then scans again and fills in the labels of exactly those references.

pub mod collector;
pub mod registry;
pub mod resolver;

pub use collector::EntityCollector;
pub use registry::DeferredRegistry;
pub use resolver::ReferenceResolver;

use crate::types::{CoordinateTable, ItemMap};

/// Counters from the collecting pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Entities that passed selection and had a label
    pub matched: u64,
    /// Entities that passed selection but had no label
    pub unlabelled: u64,
    /// Records replaced by a later entity with the same key
    pub replaced: u64,
}

/// Output of the first pass, input to the second
#[derive(Debug, Clone, Default)]
pub struct CollectedItems {
    pub items: ItemMap,
    pub registry: DeferredRegistry,
    pub stats: CollectStats,
}

/// Output of the second pass
#[derive(Debug, Clone, Default)]
pub struct ResolvedItems {
    pub items: ItemMap,
    pub registry: DeferredRegistry,
    pub coordinates: CoordinateTable,
}
