//! Two-pass extraction: collect, resolve, denormalize

use crate::collect::{CollectedItems, EntityCollector, ReferenceResolver, ResolvedItems};
use crate::denormalize::{Denormalizer, SubclassIndex};
use crate::source::EntitySource;
use crate::types::ExtractConfig;
use anyhow::{Context, Result};
use tracing::info;

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub items: usize,
    pub references: usize,
    pub unresolved: usize,
    pub coordinates: usize,
    pub enriched: usize,
}

impl RunSummary {
    pub fn of(resolved: &ResolvedItems, enriched: usize) -> Self {
        RunSummary {
            items: resolved.items.len(),
            references: resolved.registry.len(),
            unresolved: resolved.registry.unresolved().count(),
            coordinates: resolved.coordinates.len(),
            enriched,
        }
    }
}

pub struct Pipeline<'a> {
    config: &'a ExtractConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a ExtractConfig) -> Self {
        Pipeline { config }
    }

    /// First scan: select entities and collect their properties
    pub fn collect<S: EntitySource + ?Sized>(&self, source: &S) -> Result<CollectedItems> {
        let mut collector = EntityCollector::new(self.config);
        source
            .scan(&mut collector)
            .context("Failed to collect entities")?;
        let collected = collector.into_collected();

        info!(
            items = collected.items.len(),
            missing_labels = collected.registry.len(),
            unlabelled = collected.stats.unlabelled,
            replaced = collected.stats.replaced,
            "collected {} items and {} references with missing labels",
            collected.items.len(),
            collected.registry.len()
        );
        Ok(collected)
    }

    /// Second scan: resolve the labels of everything the first scan referenced
    pub fn resolve<S: EntitySource + ?Sized>(
        &self,
        source: &S,
        collected: CollectedItems,
    ) -> Result<ResolvedItems> {
        let CollectedItems { items, registry, .. } = collected;
        let mut resolver = ReferenceResolver::new(self.config, registry);
        source
            .scan(&mut resolver)
            .context("Failed to resolve references")?;
        let (registry, coordinates) = resolver.finish();

        info!(coordinates = coordinates.len(), "read {} coordinates", coordinates.len());
        info!(
            "{} of {} still missing",
            registry.unresolved().count(),
            registry.len()
        );
        Ok(ResolvedItems {
            items,
            registry,
            coordinates,
        })
    }

    /// Add the derived subclass property; returns how many records gained it
    pub fn denormalize(&self, resolved: &mut ResolvedItems, index: &SubclassIndex) -> usize {
        let enriched = Denormalizer::new(self.config, index).apply(&mut resolved.items);
        info!(enriched, field = %self.config.derived_field, "denormalized subclasses");
        enriched
    }

    /// Run both scans and the denormalization
    pub fn run<S: EntitySource + ?Sized>(
        &self,
        source: &S,
        index: &SubclassIndex,
    ) -> Result<(ResolvedItems, RunSummary)> {
        let collected = self.collect(source)?;
        let mut resolved = self.resolve(source, collected)?;
        let enriched = self.denormalize(&mut resolved, index);
        let summary = RunSummary::of(&resolved, enriched);
        Ok((resolved, summary))
    }
}
