//! CLI definitions for adascal.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// adascal CLI.
#[derive(Parser)]
#[command(name = "adascal")]
#[command(about = "Batch extractor for ADAS calibration metadata")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    /// Working directory; relative paths in the configuration resolve here
    #[arg(short, long, global = true)]
    pub work_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Process the catalogue, or the subset listed in [run].manufacturers
    Run {
        /// Concurrent manufacturers (overrides [run].max_concurrent_manufacturers)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Skip OCR of calibration images
        #[arg(long)]
        no_ocr: bool,
    },

    /// Process a single manufacturer
    Manufacturer {
        /// Canonical manufacturer name from the catalogue
        name: String,

        /// Skip OCR of calibration images
        #[arg(long)]
        no_ocr: bool,
    },

    /// Summarise checkpoint completeness per manufacturer
    Status {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show which year / chassis tokens the rules accept, most recent first
    Classify {
        /// Canonical manufacturer name from the catalogue
        manufacturer: String,

        /// Raw year panel options
        #[arg(required = true)]
        tokens: Vec<String>,

        /// Model label, for per-model encoding overrides
        #[arg(long, default_value = "")]
        model: String,
    },

    /// Validate the configuration and the manufacturer catalogue
    Validate,
}
