//! # gndextract - Wikidata to GND-keyed JSON
//!
//! Extracts every Wikidata entity that has an occupation and a GND id,
//! together with a fixed set of its properties, and writes them as one
//! JSON object keyed by GND id.
//!
//! The dump is scanned twice. The first scan selects entities and collects
//! their properties; values that point at other entities are kept as ids.
//! The second scan looks up the labels of exactly those ids. Finally each
//! record's occupations are checked against a list of subclasses (e.g. of
//! "writer") to add a derived property.
//!
//! ## Modules
//!
//! - **source**: push-style scans over a (gzipped) JSON dump
//! - **collect**: the collecting and resolving passes
//! - **denormalize**: subclass index and derived occupations
//! - **writer**: the output document
//! - **aliases**: label/alias TSV export for instances of a class
//!
//! ## Quick Start
//!
//! ```rust
//! use gndextract::{ExtractConfig, ItemWriter, MemorySource, Pipeline, SubclassIndex};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let goethe = serde_json::from_value(json!({
//!     "type": "item",
//!     "id": "Q5879",
//!     "labels": {"en": {"language": "en", "value": "Johann Wolfgang von Goethe"}},
//!     "claims": {
//!         "P106": [{"mainsnak": {"datavalue": {"type": "wikibase-entityid", "value": {"id": "Q36180"}}}}],
//!         "P227": [{"mainsnak": {"datavalue": {"type": "string", "value": "118540238"}}}]
//!     }
//! }))?;
//! let writer = serde_json::from_value(json!({
//!     "type": "item",
//!     "id": "Q36180",
//!     "labels": {"en": {"language": "en", "value": "writer"}}
//! }))?;
//! let source = MemorySource::new(vec![goethe, writer]);
//!
//! let config = ExtractConfig::default();
//! let (resolved, _summary) = Pipeline::new(&config).run(&source, &SubclassIndex::default())?;
//!
//! let mut out = ItemWriter::new(Vec::new());
//! out.write_items(&resolved.items, &resolved.registry)?;
//! // {"118540238":{"id":"Q5879","name":"Johann Wolfgang von Goethe","occupation":"writer","sitelinks":[]}
//! // }
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::path::Path;
use tracing::info;

pub mod aliases;
pub mod collect;
pub mod denormalize;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod types;
pub mod value;
pub mod writer;

// Re-export commonly used types for convenience
pub use aliases::{AliasExporter, AliasFilter};
pub use collect::{CollectedItems, DeferredRegistry, EntityCollector, ReferenceResolver, ResolvedItems};
pub use denormalize::{Denormalizer, SubclassIndex};
pub use error::ExtractError;
pub use pipeline::{Pipeline, RunSummary};
pub use source::{DumpSource, EntityProcessor, EntitySource, MemorySource, ScanStats};
pub use types::{EntityRecord, ExtractConfig, ItemMap, ItemRecord, ResolvedValue};
pub use writer::ItemWriter;

/// Main entry point: run the full extraction over a dump file and write the result
pub fn extract_to_file(
    dump: &Path,
    subclasses: &Path,
    output: &Path,
    config: &ExtractConfig,
) -> Result<RunSummary> {
    let index = SubclassIndex::load(subclasses)?;
    let source = DumpSource::new(dump).with_progress_interval(config.progress_interval);

    let (resolved, summary) = Pipeline::new(config).run(&source, &index)?;

    let mut writer = ItemWriter::create(output)?;
    writer.write_items(&resolved.items, &resolved.registry)?;
    info!(path = %output.display(), items = summary.items, "wrote output");

    Ok(summary)
}
