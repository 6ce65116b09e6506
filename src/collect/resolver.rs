//! Second pass: fill in labels of referenced entities

use crate::collect::DeferredRegistry;
use crate::source::EntityProcessor;
use crate::types::{CoordinateTable, EntityRecord, ExtractConfig, ResolvedValue};
use crate::value;
use anyhow::Result;

/// Resolves every registered reference to its entity's label and records
/// the coordinates of referenced entities that have them.
pub struct ReferenceResolver<'a> {
    config: &'a ExtractConfig,
    registry: DeferredRegistry,
    coordinates: CoordinateTable,
    resolved: u64,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(config: &'a ExtractConfig, registry: DeferredRegistry) -> Self {
        ReferenceResolver {
            config,
            registry,
            coordinates: CoordinateTable::new(),
            resolved: 0,
        }
    }

    /// Number of labels set so far
    pub fn resolved(&self) -> u64 {
        self.resolved
    }

    pub fn finish(self) -> (DeferredRegistry, CoordinateTable) {
        (self.registry, self.coordinates)
    }

    fn resolve(&mut self, record: &EntityRecord) {
        if !self.registry.contains(&record.id) {
            return;
        }

        if let Some(label) = record.label(&self.config.label_language) {
            self.registry.resolve(&record.id, label);
            self.resolved += 1;
        }

        let coordinate = value::values_of(record, &self.config.coordinate_property)
            .into_iter()
            .find_map(|v| match v {
                ResolvedValue::Literal(text) => Some(text),
                ResolvedValue::Reference { .. } => None,
            });
        if let Some(coordinate) = coordinate {
            self.coordinates.insert(record.id.clone(), coordinate);
        }
    }
}

impl EntityProcessor for ReferenceResolver<'_> {
    fn process_item(&mut self, record: &EntityRecord) -> Result<()> {
        self.resolve(record);
        Ok(())
    }
}
