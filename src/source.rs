//! Entity sources: push-style scans over a dump
//!
//! A source hands every record to an [`EntityProcessor`], one at a time and
//! in a stable order. Sources can be scanned repeatedly; the two-pass
//! pipeline relies on both scans seeing the same records in the same order.

use crate::error::ExtractError;
use crate::types::{EntityRecord, RecordKind};
use anyhow::Result;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Per-record callbacks, one per record kind
pub trait EntityProcessor {
    fn process_item(&mut self, record: &EntityRecord) -> Result<()>;

    /// Property records are not used by any of our passes
    fn process_property(&mut self, _record: &EntityRecord) -> Result<()> {
        Ok(())
    }
}

/// Something that can replay a sequence of entity records
pub trait EntitySource {
    fn scan(&self, processor: &mut dyn EntityProcessor) -> Result<ScanStats>;
}

/// Counts from one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub items: u64,
    pub properties: u64,
    /// Records of any other kind (lexemes, ...)
    pub ignored: u64,
    pub elapsed: Duration,
}

/// Routes records to the right callback and keeps count
struct Dispatcher<'a> {
    processor: &'a mut dyn EntityProcessor,
    progress_interval: u64,
    started: Instant,
    stats: ScanStats,
}

impl<'a> Dispatcher<'a> {
    fn new(processor: &'a mut dyn EntityProcessor, progress_interval: u64) -> Self {
        Dispatcher {
            processor,
            progress_interval,
            started: Instant::now(),
            stats: ScanStats::default(),
        }
    }

    fn dispatch(&mut self, record: &EntityRecord) -> Result<()> {
        match record.kind {
            RecordKind::Item => {
                self.processor.process_item(record)?;
                self.stats.items += 1;
                if self.progress_interval > 0 && self.stats.items % self.progress_interval == 0 {
                    info!(
                        items = self.stats.items,
                        elapsed_secs = self.started.elapsed().as_secs(),
                        "scanning dump"
                    );
                }
            }
            RecordKind::Property => {
                self.processor.process_property(record)?;
                self.stats.properties += 1;
            }
            RecordKind::Other => {
                debug!(id = %record.id, "ignoring record of unknown kind");
                self.stats.ignored += 1;
            }
        }
        Ok(())
    }

    fn finish(mut self) -> ScanStats {
        self.stats.elapsed = self.started.elapsed();
        info!(
            items = self.stats.items,
            properties = self.stats.properties,
            ignored = self.stats.ignored,
            elapsed_secs = self.stats.elapsed.as_secs(),
            "scan complete"
        );
        self.stats
    }
}

/// A Wikidata JSON dump: one entity per line inside a `[` ... `]` array.
///
/// Files ending in `.gz` are decompressed on the fly. Every scan reopens
/// the file.
#[derive(Debug, Clone)]
pub struct DumpSource {
    path: PathBuf,
    progress_interval: u64,
}

impl DumpSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DumpSource {
            path: path.into(),
            progress_interval: 100_000,
        }
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Box<dyn BufRead>> {
        let file = File::open(&self.path).map_err(|e| ExtractError::io(&self.path, e))?;
        let gzipped = self
            .path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("gz"));

        Ok(if gzipped {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        })
    }
}

impl EntitySource for DumpSource {
    fn scan(&self, processor: &mut dyn EntityProcessor) -> Result<ScanStats> {
        let mut reader = self.open()?;
        let mut dispatcher = Dispatcher::new(processor, self.progress_interval);
        let mut buf = Vec::with_capacity(64 * 1024);
        let mut line_no = 0u64;

        info!(path = %self.path.display(), "scanning dump");
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| ExtractError::io(&self.path, e))?;
            if read == 0 {
                break;
            }
            line_no += 1;

            let Some(entity) = entity_bytes(&mut buf) else {
                continue;
            };
            let record: EntityRecord = simd_json::serde::from_slice(entity)
                .map_err(|e| ExtractError::dump_parse(&self.path, line_no, e.to_string()))?;
            dispatcher.dispatch(&record)?;
        }

        Ok(dispatcher.finish())
    }
}

/// The JSON object on a dump line, without the array punctuation around it
fn entity_bytes(line: &mut [u8]) -> Option<&mut [u8]> {
    let is_padding = |b: &u8| b.is_ascii_whitespace() || *b == b',';
    let start = line.iter().position(|b| !is_padding(b))?;
    let end = line.iter().rposition(|b| !is_padding(b))? + 1;
    let trimmed = &mut line[start..end];
    if matches!(&trimmed[..], b"[" | b"]" | b"[]") {
        return None;
    }
    Some(trimmed)
}

/// Records held in memory, mostly for tests and small inputs
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<EntityRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<EntityRecord>) -> Self {
        MemorySource { records }
    }
}

impl EntitySource for MemorySource {
    fn scan(&self, processor: &mut dyn EntityProcessor) -> Result<ScanStats> {
        let mut dispatcher = Dispatcher::new(processor, 0);
        for record in &self.records {
            dispatcher.dispatch(record)?;
        }
        Ok(dispatcher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[derive(Default)]
    struct Recorder {
        items: Vec<String>,
        properties: Vec<String>,
    }

    impl EntityProcessor for Recorder {
        fn process_item(&mut self, record: &EntityRecord) -> Result<()> {
            self.items.push(record.id.clone());
            Ok(())
        }

        fn process_property(&mut self, record: &EntityRecord) -> Result<()> {
            self.properties.push(record.id.clone());
            Ok(())
        }
    }

    const DUMP: &str = "[\n\
        {\"type\":\"item\",\"id\":\"Q1\",\"labels\":{},\"claims\":{}},\n\
        {\"type\":\"property\",\"id\":\"P31\",\"labels\":[]},\n\
        \n\
        {\"type\":\"lexeme\",\"id\":\"L7\"},\n\
        {\"type\":\"item\",\"id\":\"Q2\"}\n\
        ]\n";

    #[test]
    fn test_scan_plain_dump() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(DUMP.as_bytes()).unwrap();

        let source = DumpSource::new(file.path());
        let mut recorder = Recorder::default();
        let stats = source.scan(&mut recorder).unwrap();

        assert_eq!(recorder.items, vec!["Q1", "Q2"]);
        assert_eq!(recorder.properties, vec!["P31"]);
        assert_eq!(stats.items, 2);
        assert_eq!(stats.properties, 1);
        assert_eq!(stats.ignored, 1);
    }

    #[test]
    fn test_scan_is_repeatable() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(DUMP.as_bytes()).unwrap();
        let source = DumpSource::new(file.path());

        let mut first = Recorder::default();
        let mut second = Recorder::default();
        source.scan(&mut first).unwrap();
        source.scan(&mut second).unwrap();
        assert_eq!(first.items, second.items);
    }

    #[test]
    fn test_scan_gzipped_dump() {
        let file = tempfile::Builder::new().suffix(".json.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(file.as_file(), Compression::default());
        encoder.write_all(DUMP.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let mut recorder = Recorder::default();
        DumpSource::new(file.path()).scan(&mut recorder).unwrap();
        assert_eq!(recorder.items, vec!["Q1", "Q2"]);
    }

    #[test]
    fn test_malformed_line_aborts_scan() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(b"[\n{\"type\":\"item\",\"id\":\"Q1\"},\n{\"type\":\"item\",\n]\n")
            .unwrap();

        let mut recorder = Recorder::default();
        let err = DumpSource::new(file.path()).scan(&mut recorder).unwrap_err();
        let err = err.downcast::<ExtractError>().unwrap();
        assert!(matches!(err, ExtractError::DumpParse { line: 3, .. }));
        assert_eq!(recorder.items, vec!["Q1"]);
    }

    #[test]
    fn test_missing_dump_is_io_error() {
        let mut recorder = Recorder::default();
        let err = DumpSource::new("/nonexistent/latest-all.json")
            .scan(&mut recorder)
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<ExtractError>(), Some(ExtractError::Io { .. })));
    }

    #[test]
    fn test_entity_bytes_strips_array_punctuation() {
        let mut line = b"  {\"id\":\"Q1\"},\r\n".to_vec();
        assert_eq!(entity_bytes(&mut line).map(|b| b.to_vec()), Some(b"{\"id\":\"Q1\"}".to_vec()));
        assert_eq!(entity_bytes(&mut b"[\n".to_vec()), None);
        assert_eq!(entity_bytes(&mut b"\n".to_vec()), None);
    }
}
