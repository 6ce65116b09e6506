//! Label and alias export for all instances of a class
//!
//! Writes one TSV row per matching item: id, label, then every alias,
//! each quoted.

use crate::source::{EntityProcessor, EntitySource};
use crate::types::EntityRecord;
use anyhow::{Context, Result};
use std::io::Write;
use tracing::info;

/// Which items to export
#[derive(Debug, Clone)]
pub struct AliasFilter {
    /// "instance of"
    pub property: String,
    /// "human"
    pub value: String,
    pub language: String,
}

impl Default for AliasFilter {
    fn default() -> Self {
        AliasFilter {
            property: String::from("P31"),
            value: String::from("Q5"),
            language: String::from("en"),
        }
    }
}

pub struct AliasExporter<W: Write> {
    filter: AliasFilter,
    writer: W,
    scanned: u64,
    matched: u64,
    written: u64,
}

impl<W: Write> AliasExporter<W> {
    pub fn new(filter: AliasFilter, writer: W) -> Self {
        AliasExporter {
            filter,
            writer,
            scanned: 0,
            matched: 0,
            written: 0,
        }
    }

    /// Scan the source once, then flush
    pub fn export<S: EntitySource + ?Sized>(mut self, source: &S) -> Result<W> {
        source.scan(&mut self).context("Failed to export aliases")?;
        self.writer.flush().context("Failed to flush writer")?;
        info!(
            matched = self.matched,
            written = self.written,
            "found {} matching items after scanning {} items",
            self.matched,
            self.scanned
        );
        Ok(self.writer)
    }

    fn write_row(&mut self, record: &EntityRecord, label: &str) -> Result<()> {
        let mut row = format!("{}\t{}", tsv_quote(&record.id), tsv_quote(label));
        for alias in record.aliases(&self.filter.language) {
            row.push('\t');
            row.push_str(&tsv_quote(alias));
        }
        row.push('\n');
        self.writer
            .write_all(row.as_bytes())
            .with_context(|| format!("Failed to write row for {}", record.id))
    }
}

impl<W: Write> EntityProcessor for AliasExporter<W> {
    fn process_item(&mut self, record: &EntityRecord) -> Result<()> {
        self.scanned += 1;
        if !record.has_statement_value(&self.filter.property, &self.filter.value) {
            return Ok(());
        }
        self.matched += 1;

        let Some(label) = record.label(&self.filter.language) else {
            return Ok(());
        };
        self.write_row(record, label)?;
        self.written += 1;
        Ok(())
    }
}

/// Quote a TSV field: tabs and line breaks become spaces, quotes are doubled
pub fn tsv_quote(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if matches!(c, '\t' | '\r' | '\n') { ' ' } else { c })
        .collect();
    format!("\"{}\"", cleaned.replace('"', "\"\""))
}
