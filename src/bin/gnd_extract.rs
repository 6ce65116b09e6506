//! gnd-extract: Extract GND-keyed person records from a Wikidata dump
//!
//! Usage:
//!   # Two-pass extraction with writer subclasses, timestamped output
//!   gnd-extract extract --dump latest-all.json.gz --subclasses wikidata_writer_subclasses.tsv
//!
//!   # Custom properties / output file
//!   gnd-extract extract --dump latest-all.json.gz --subclasses subclasses.tsv \
//!       --config properties.json --output gnditems.json
//!
//!   # Labels and aliases of all humans as TSV
//!   gnd-extract aliases --dump latest-all.json.gz

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gndextract::{AliasExporter, AliasFilter, DumpSource, ExtractConfig};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gnd-extract")]
#[command(about = "Extract GND-keyed person records from a Wikidata dump", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect matching entities, resolve their references, write JSON
    Extract {
        /// Wikidata JSON dump (optionally .gz)
        #[arg(long, value_name = "FILE")]
        dump: PathBuf,

        /// TSV of subclasses used for the derived occupation property
        #[arg(long, value_name = "FILE")]
        subclasses: PathBuf,

        /// Output file (default: gnditems_<date>_<time>.json)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// JSON file overriding the extraction config
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write labels and aliases of all humans as TSV
    Aliases {
        /// Wikidata JSON dump (optionally .gz)
        #[arg(long, value_name = "FILE")]
        dump: PathBuf,

        /// Output file
        #[arg(long, short = 'o', default_value = "wikidata_humans_walias.tsv")]
        output: PathBuf,

        /// Property an item must have
        #[arg(long, default_value = "P31")]
        property: String,

        /// Entity the property must point at
        #[arg(long, default_value = "Q5")]
        value: String,
    },
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    match args.command {
        Command::Extract {
            dump,
            subclasses,
            output,
            config,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => ExtractConfig::default(),
            };
            let output = output.unwrap_or_else(default_output);
            let summary = gndextract::extract_to_file(&dump, &subclasses, &output, &config)?;
            info!(
                items = summary.items,
                references = summary.references,
                unresolved = summary.unresolved,
                coordinates = summary.coordinates,
                enriched = summary.enriched,
                "done"
            );
        }
        Command::Aliases {
            dump,
            output,
            property,
            value,
        } => {
            let file = File::create(&output)
                .with_context(|| format!("Failed to create output file: {}", output.display()))?;
            let filter = AliasFilter {
                property,
                value,
                ..AliasFilter::default()
            };
            AliasExporter::new(filter, BufWriter::new(file)).export(&DumpSource::new(dump))?;
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gndextract=info,gnd_extract=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: &Path) -> Result<ExtractConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn default_output() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H:%M");
    PathBuf::from(format!("gnditems_{}.json", stamp))
}
