use crate::collect::DeferredRegistry;
use crate::types::{ItemMap, ItemRecord};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A property as it appears in the output: one value collapses to a string
#[derive(Serialize)]
#[serde(untagged)]
enum Rendered<'a> {
    One(&'a str),
    Many(Vec<&'a str>),
}

/// Writes item records as one JSON object keyed by record key, with a
/// newline after each record so the file can be processed line by line:
///
/// ```text
/// {"118540238":{"id":"Q5879","name":"Johann Wolfgang von Goethe",...}
/// ,"118607626":{...}
/// }
/// ```
///
/// Any write failure is returned; a partially written document is not valid JSON.
pub struct ItemWriter<W: Write> {
    writer: W,
}

impl ItemWriter<BufWriter<File>> {
    /// Create a writer for a new file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(ItemWriter::new(BufWriter::new(file)))
    }
}

impl<W: Write> ItemWriter<W> {
    pub fn new(writer: W) -> Self {
        ItemWriter { writer }
    }

    /// Write the whole document; references display through `registry`
    pub fn write_items(&mut self, items: &ItemMap, registry: &DeferredRegistry) -> Result<()> {
        self.writer.write_all(b"{").context("Failed to write output")?;
        for (index, (key, item)) in items.iter().enumerate() {
            if index > 0 {
                self.writer.write_all(b",").context("Failed to write output")?;
            }
            serde_json::to_writer(&mut self.writer, key)
                .with_context(|| format!("Failed to write record {}", key))?;
            self.writer.write_all(b":").context("Failed to write output")?;
            serde_json::to_writer(&mut self.writer, &render(item, registry))
                .with_context(|| format!("Failed to write record {}", key))?;
            self.writer.write_all(b"\n").context("Failed to write output")?;
        }
        self.writer.write_all(b"}").context("Failed to write output")?;
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn render<'a>(item: &'a ItemRecord, registry: &'a DeferredRegistry) -> IndexMap<&'a str, Rendered<'a>> {
    item.iter()
        .map(|(name, values)| {
            let rendered = match values {
                [single] => Rendered::One(single.display(registry)),
                _ => Rendered::Many(values.iter().map(|v| v.display(registry)).collect()),
            };
            (name, rendered)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResolvedValue;
    use serde_json::{json, Value};

    fn write(items: &ItemMap, registry: &DeferredRegistry) -> String {
        let mut writer = ItemWriter::new(Vec::new());
        writer.write_items(items, registry).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    fn record(props: Vec<(&str, Vec<ResolvedValue>)>) -> ItemRecord {
        let mut item = ItemRecord::new();
        for (name, values) in props {
            item.insert(name, values);
        }
        item
    }

    #[test]
    fn test_single_and_multi_values() {
        let mut items = ItemMap::new();
        items.insert(
            "118540238".to_string(),
            record(vec![
                ("id", vec![ResolvedValue::literal("Q5879")]),
                ("occupation", vec![ResolvedValue::reference("Q36180"), ResolvedValue::reference("Q49757")]),
                ("sitelinks", vec![]),
            ]),
        );

        let mut registry = DeferredRegistry::new();
        registry.register("Q36180");
        registry.register("Q49757");
        registry.resolve("Q36180", "writer");

        let output = write(&items, &registry);
        assert_eq!(
            output,
            "{\"118540238\":{\"id\":\"Q5879\",\"occupation\":[\"writer\",\"Q49757\"],\"sitelinks\":[]}\n}"
        );
    }

    #[test]
    fn test_output_is_valid_json_in_insertion_order() {
        let mut items = ItemMap::new();
        items.insert("b".to_string(), record(vec![("name", vec![ResolvedValue::literal("Zoë \"Z\"")])]));
        items.insert("a".to_string(), record(vec![("name", vec![ResolvedValue::literal("Adam")])]));

        let output = write(&items, &DeferredRegistry::new());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("{\"b\":"));
        assert!(lines[1].starts_with(",\"a\":"));

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, json!({"b": {"name": "Zoë \"Z\""}, "a": {"name": "Adam"}}));
    }

    #[test]
    fn test_shared_reference_resolves_everywhere() {
        let mut items = ItemMap::new();
        items.insert("1".to_string(), record(vec![("award", vec![ResolvedValue::reference("Q1")])]));
        items.insert("2".to_string(), record(vec![("award", vec![ResolvedValue::reference("Q1")])]));

        let mut registry = DeferredRegistry::new();
        registry.register("Q1");
        let before: Value = serde_json::from_str(&write(&items, &registry)).unwrap();
        assert_eq!(before, json!({"1": {"award": "Q1"}, "2": {"award": "Q1"}}));

        registry.resolve("Q1", "Nobel Prize");
        let after: Value = serde_json::from_str(&write(&items, &registry)).unwrap();
        assert_eq!(after, json!({"1": {"award": "Nobel Prize"}, "2": {"award": "Nobel Prize"}}));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(write(&ItemMap::new(), &DeferredRegistry::new()), "{}");
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let mut items = ItemMap::new();
        items.insert("1".to_string(), record(vec![("id", vec![ResolvedValue::literal("Q1")])]));
        let mut writer = ItemWriter::new(FailingWriter);
        assert!(writer.write_items(&items, &DeferredRegistry::new()).is_err());
    }
}
