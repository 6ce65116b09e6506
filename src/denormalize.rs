//! Subclass denormalization
//!
//! Loads a list of subclasses (e.g. all subclasses of "writer") and adds a
//! derived property to every record listing which of its occupations are
//! among them.

use crate::error::ExtractError;
use crate::types::{ExtractConfig, ItemMap, ResolvedValue};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

// <http://www.wikidata.org/entity/Q36180>
static ENTITY_IRI_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<.+/(Q[0-9]+)>$").unwrap());

// "writer"@en
static EN_LABEL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^"(.+)"@en$"#).unwrap());

/// Subclass id to label, read from a SPARQL TSV export:
///
/// ```text
/// ?subclass	?subclassLabel
/// <http://www.wikidata.org/entity/Q36180>	"writer"@en
/// <http://www.wikidata.org/entity/Q49757>	"poet"@en
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubclassIndex {
    labels: HashMap<String, String>,
}

impl SubclassIndex {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
        let index = Self::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to read subclass file {}", path.display()))?;
        info!(path = %path.display(), subclasses = index.len(), "loaded subclass index");
        Ok(index)
    }

    /// Parse rows from a reader; rows that do not look like entries are skipped
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut labels = HashMap::new();
        for line in reader.lines() {
            let line = line.context("Failed to read line")?;
            if let Some((id, label)) = Self::parse_line(&line) {
                labels.insert(id, label);
            }
        }
        Ok(SubclassIndex { labels })
    }

    fn parse_line(line: &str) -> Option<(String, String)> {
        if !line.starts_with('<') {
            return None;
        }
        let mut columns = line.trim().split('\t');
        let Some(caps) = columns.next().and_then(|c| ENTITY_IRI_REGEX.captures(c)) else {
            debug!(line, "skipping subclass row without entity IRI");
            return None;
        };
        let id = caps[1].to_string();

        let label = match columns.next().and_then(|c| EN_LABEL_REGEX.captures(c)) {
            Some(caps) => caps[1].to_string(),
            None => {
                warn!(id = %id, "subclass row has no English label, using id");
                id.clone()
            }
        };
        Some((id, label))
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.labels.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<(String, String)> for SubclassIndex {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        SubclassIndex {
            labels: iter.into_iter().collect(),
        }
    }
}

/// Adds the derived subclass property to collected records
pub struct Denormalizer<'a> {
    config: &'a ExtractConfig,
    index: &'a SubclassIndex,
}

impl<'a> Denormalizer<'a> {
    pub fn new(config: &'a ExtractConfig, index: &'a SubclassIndex) -> Self {
        Denormalizer { config, index }
    }

    /// Returns the number of records that gained the derived property
    pub fn apply(&self, items: &mut ItemMap) -> usize {
        let mut enriched = 0;
        for item in items.values_mut() {
            let Some(values) = item.get(&self.config.occupation_field) else {
                continue;
            };
            let derived: Vec<ResolvedValue> = values
                .iter()
                .filter_map(|value| {
                    let id = value.reference_id()?;
                    let label = self.index.get(id)?;
                    Some(ResolvedValue::labelled(id, label))
                })
                .collect();

            if !derived.is_empty() {
                item.insert(self.config.derived_field.as_str(), derived);
                enriched += 1;
            }
        }
        enriched
    }
}
