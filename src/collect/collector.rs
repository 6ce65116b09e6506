//! First pass: select entities and collect their properties

use crate::collect::{CollectStats, CollectedItems, DeferredRegistry};
use crate::source::EntityProcessor;
use crate::types::{EntityRecord, ExtractConfig, ItemMap, ItemRecord, ResolvedValue};
use crate::value;
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

// Two-letter language wikis: "dewiki", "enwiki", ...
static WIKILANG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-z]{2})wiki$").unwrap());

/// Collects an [`ItemRecord`] for every entity that has the qualifying
/// property, the key property and a label.
///
/// Each key-property value becomes one output record. Referenced entities
/// are registered in the [`DeferredRegistry`] for the second pass.
pub struct EntityCollector<'a> {
    config: &'a ExtractConfig,
    items: ItemMap,
    registry: DeferredRegistry,
    stats: CollectStats,
}

impl<'a> EntityCollector<'a> {
    pub fn new(config: &'a ExtractConfig) -> Self {
        EntityCollector {
            config,
            items: ItemMap::new(),
            registry: DeferredRegistry::new(),
            stats: CollectStats::default(),
        }
    }

    pub fn items(&self) -> &ItemMap {
        &self.items
    }

    pub fn registry(&self) -> &DeferredRegistry {
        &self.registry
    }

    /// Hand off everything collected so far
    pub fn into_collected(self) -> CollectedItems {
        CollectedItems {
            items: self.items,
            registry: self.registry,
            stats: self.stats,
        }
    }

    fn collect(&mut self, record: &EntityRecord) {
        let config = self.config;
        if !record.has_statement(&config.qualifying_property)
            || !record.has_statement(&config.key_property)
        {
            return;
        }

        let Some(label) = record.label(&config.label_language) else {
            debug!(id = %record.id, "skipping entity without label");
            self.stats.unlabelled += 1;
            return;
        };
        self.stats.matched += 1;

        // An entity may carry several key values; each gets its own record
        for statement in record.statements(&config.key_property) {
            let Some(key) = value::extract_statement(statement) else {
                continue;
            };
            let item = self.build_item(record, label);
            if self.items.insert(key.raw().to_string(), item).is_some() {
                debug!(key = key.raw(), id = %record.id, "key already collected, replacing record");
                self.stats.replaced += 1;
            }
        }
    }

    fn build_item(&mut self, record: &EntityRecord, label: &str) -> ItemRecord {
        let mut item = ItemRecord::new();
        item.insert("id", vec![ResolvedValue::literal(record.id.as_str())]);
        item.insert("name", vec![ResolvedValue::literal(label)]);

        for (property, name) in &self.config.tracked_properties {
            let values = value::values_of(record, property);
            if values.is_empty() {
                continue;
            }
            for id in values.iter().filter_map(ResolvedValue::reference_id) {
                self.registry.register(id);
            }
            item.insert(name.as_str(), values);
        }

        let sitelinks = record
            .sitelinks
            .values()
            .filter_map(|link| WIKILANG_REGEX.captures(&link.site))
            .map(|caps| ResolvedValue::literal(&caps[1]))
            .collect();
        item.insert("sitelinks", sitelinks);

        item
    }
}

impl EntityProcessor for EntityCollector<'_> {
    fn process_item(&mut self, record: &EntityRecord) -> Result<()> {
        self.collect(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn item_ref(property: &str, id: &str) -> Value {
        json!({"mainsnak": {"snaktype": "value", "property": property,
            "datavalue": {"type": "wikibase-entityid", "value": {"entity-type": "item", "id": id}}}})
    }

    fn string(property: &str, text: &str) -> Value {
        json!({"mainsnak": {"snaktype": "value", "property": property,
            "datavalue": {"type": "string", "value": text}}})
    }

    fn entity(id: &str, label: Option<&str>, claims: Value) -> EntityRecord {
        let mut raw = json!({"type": "item", "id": id, "claims": claims});
        if let Some(label) = label {
            raw["labels"] = json!({"en": {"language": "en", "value": label}});
        }
        serde_json::from_value(raw).unwrap()
    }

    fn goethe() -> EntityRecord {
        let mut raw = json!({
            "type": "item",
            "id": "Q5879",
            "labels": {"en": {"language": "en", "value": "Johann Wolfgang von Goethe"}},
            "claims": {
                "P106": [item_ref("P106", "Q36180"), item_ref("P106", "Q49757")],
                "P227": [string("P227", "118540238")],
                "P19": [item_ref("P19", "Q1794")],
                "P569": [{"mainsnak": {"snaktype": "value", "property": "P569",
                    "datavalue": {"type": "time", "value": {"time": "+1749-08-28T00:00:00Z"}}}}]
            },
            "sitelinks": {
                "dewiki": {"site": "dewiki", "title": "Johann Wolfgang von Goethe"},
                "commonswiki": {"site": "commonswiki", "title": "Johann Wolfgang von Goethe"},
                "enwiki": {"site": "enwiki", "title": "Johann Wolfgang von Goethe"}
            }
        });
        raw["aliases"] = json!([]);
        serde_json::from_value(raw).unwrap()
    }

    fn collect(records: &[EntityRecord]) -> CollectedItems {
        let config = ExtractConfig::default();
        let mut collector = EntityCollector::new(&config);
        for record in records {
            collector.process_item(record).unwrap();
        }
        collector.into_collected()
    }

    #[test]
    fn test_collects_matching_entity() {
        let collected = collect(&[goethe()]);
        let item = collected.items.get("118540238").unwrap();

        assert_eq!(item.get("id").unwrap(), &[ResolvedValue::literal("Q5879")]);
        assert_eq!(
            item.get("name").unwrap(),
            &[ResolvedValue::literal("Johann Wolfgang von Goethe")]
        );
        assert_eq!(
            item.get("occupation").unwrap(),
            &[ResolvedValue::reference("Q36180"), ResolvedValue::reference("Q49757")]
        );
        assert_eq!(item.get("date_of_birth").unwrap(), &[ResolvedValue::literal("1749-08-28")]);
        assert!(!item.contains("gender"));
        assert_eq!(
            item.get("sitelinks").unwrap(),
            &[ResolvedValue::literal("de"), ResolvedValue::literal("en")]
        );

        let names: Vec<_> = item.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["id", "name", "occupation", "date_of_birth", "place_of_birth", "sitelinks"]);

        let registered: Vec<_> = collected.registry.ids().collect();
        assert_eq!(registered, vec!["Q36180", "Q49757", "Q1794"]);
        assert_eq!(collected.stats.matched, 1);
    }

    #[test]
    fn test_requires_key_property() {
        let record = entity("Q1", Some("someone"), json!({"P106": [item_ref("P106", "Q36180")]}));
        let collected = collect(&[record]);
        assert!(collected.items.is_empty());
        assert!(collected.registry.is_empty());
    }

    #[test]
    fn test_requires_qualifying_property() {
        let record = entity("Q1", Some("someone"), json!({"P227": [string("P227", "123")]}));
        assert!(collect(&[record]).items.is_empty());
    }

    #[test]
    fn test_requires_label() {
        let record = entity(
            "Q1",
            None,
            json!({"P106": [item_ref("P106", "Q36180")], "P227": [string("P227", "123")]}),
        );
        let collected = collect(&[record]);
        assert!(collected.items.is_empty());
        assert!(collected.registry.is_empty());
        assert_eq!(collected.stats.unlabelled, 1);
    }

    #[test]
    fn test_multiple_keys_produce_multiple_records() {
        let record = entity(
            "Q19004",
            Some("someone"),
            json!({
                "P106": [item_ref("P106", "Q36180")],
                "P227": [string("P227", "111"), string("P227", "222"),
                    {"mainsnak": {"snaktype": "somevalue", "property": "P227"}}]
            }),
        );
        let collected = collect(&[record]);
        assert_eq!(collected.items.keys().collect::<Vec<_>>(), vec!["111", "222"]);
        assert_eq!(collected.registry.len(), 1);
    }

    #[test]
    fn test_key_collision_last_wins() {
        let claims = |occupation: &str| {
            json!({"P106": [item_ref("P106", occupation)], "P227": [string("P227", "42")]})
        };
        let first = entity("Q1", Some("first"), claims("Q36180"));
        let other = entity("Q3", Some("other"), json!({"P106": [item_ref("P106", "Q1")], "P227": [string("P227", "7")]}));
        let second = entity("Q2", Some("second"), claims("Q49757"));

        let collected = collect(&[first, other, second]);
        assert_eq!(collected.items.len(), 2);
        // replaced record keeps its original position
        assert_eq!(collected.items.keys().collect::<Vec<_>>(), vec!["42", "7"]);
        assert_eq!(
            collected.items["42"].get("name").unwrap(),
            &[ResolvedValue::literal("second")]
        );
        assert_eq!(collected.stats.replaced, 1);
        // references of the replaced record stay registered
        assert!(collected.registry.contains("Q36180"));
    }

    #[test]
    fn test_collection_is_deterministic() {
        let records = vec![goethe(), entity("Q2", Some("x"), json!({"P106": [item_ref("P106", "Q1")], "P227": [string("P227", "9")]}))];
        let first = collect(&records);
        let second = collect(&records);
        assert_eq!(first.items, second.items);
        assert_eq!(first.registry, second.registry);
    }

    #[test]
    fn test_custom_tracked_properties() {
        let mut config = ExtractConfig::default();
        config.tracked_properties.clear();
        config.tracked_properties.insert("P19".to_string(), "birthplace".to_string());

        let mut collector = EntityCollector::new(&config);
        collector.process_item(&goethe()).unwrap();

        let item = &collector.items()["118540238"];
        assert!(!item.contains("occupation"));
        assert_eq!(item.get("birthplace").unwrap(), &[ResolvedValue::reference("Q1794")]);
        assert_eq!(collector.registry().ids().collect::<Vec<_>>(), vec!["Q1794"]);
    }
}
