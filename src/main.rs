//! adascal - ADAS calibration catalogue extractor
//!
//! Main entry point for the adascal CLI.

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use adascal_browser::{BrowserManager, BrowserManagerConfig};
use adascal_checkpoint::{CheckpointStore, FileCheckpointStore, RunReport};
use adascal_config::{Catalogue, Config, ConfigLoader, ConfigValidator};
use adascal_core::{classify_tokens, Orchestrator};
use adascal_ocr::TesseractRecognizer;
use adascal_protocols::TextRecognizer;

use cli::{Cli, Commands};

/// Initialize tracing with console and file output.
///
/// Log files are written to `logs_dir` with daily rotation.
fn init_tracing(logs_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(logs_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("adascal")
        .filename_suffix("log")
        .max_log_files(30)
        .build(logs_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes the file writer on drop; keep it for the whole run.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(work_dir) = &cli.work_dir {
        std::env::set_current_dir(work_dir)?;
    }
    let config = ConfigLoader::load_or_default(&cli.config)?;
    init_tracing(&config.paths.logs_dir())?;
    info!("adascal v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run { concurrency, no_ocr } => {
            let mut config = config;
            if let Some(limit) = concurrency {
                config.run.max_concurrent_manufacturers = limit;
            }
            if no_ocr {
                config.ocr.enabled = false;
            }
            let names = config.run.manufacturers.clone();
            run(config, names).await
        }
        Commands::Manufacturer { name, no_ocr } => {
            let mut config = config;
            if no_ocr {
                config.ocr.enabled = false;
            }
            run(config, vec![name]).await
        }
        Commands::Status { format } => status(&config, &format).await,
        Commands::Classify {
            manufacturer,
            tokens,
            model,
        } => classify(&config, &manufacturer, &model, &tokens),
        Commands::Validate => validate(&config),
    }
}

fn load_catalogue(config: &Config) -> Result<Catalogue, Box<dyn std::error::Error>> {
    let path = config.paths.catalogue();
    let catalogue = Catalogue::load(&path)?;
    info!(
        "Loaded {} manufacturers from {} ({} rows skipped)",
        catalogue.len(),
        path.display(),
        catalogue.skipped().len()
    );
    Ok(catalogue)
}

/// Run the named manufacturers (all when empty) against a live browser.
async fn run(config: Config, names: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let report = ConfigValidator::validate(&config)?;
    for warning in &report.warnings {
        warn!("{}: {}", warning.path, warning.message);
    }
    if !report.is_valid() {
        for e in &report.errors {
            error!("{}: {}", e.path, e.message);
        }
        return Err("invalid configuration".into());
    }

    let catalogue = load_catalogue(&config)?;
    let store = Arc::new(FileCheckpointStore::new(config.paths.results_dir()).await?);

    let manager = BrowserManager::new(BrowserManagerConfig {
        debug_port: config.browser.debug_port,
        viewport_width: config.browser.viewport_width,
        viewport_height: config.browser.viewport_height,
        profile_dir: Some(config.browser.profile_dir()),
        headless: config.browser.headless,
        chrome_path: config.browser.chrome_path.as_ref().map(Into::into),
        page_load: std::time::Duration::from_millis(config.browser.page_load_ms),
    });
    let provider = Arc::new(manager.provider().await?);

    let recognizer: Option<Arc<dyn TextRecognizer>> = if config.ocr.enabled {
        Some(Arc::new(TesseractRecognizer::from_config(&config.ocr)))
    } else {
        None
    };

    let cancel = CancellationToken::new();
    let orchestrator = Orchestrator::new(Arc::new(config), provider, store, recognizer)?
        .with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current manufacturers");
            cancel.cancel();
        }
    });

    let report: RunReport = orchestrator.run_selected(&catalogue, &names).await;
    manager.shutdown().await;

    if report.cancelled {
        info!("Run cancelled; rerun the same command to resume");
    }
    Ok(())
}

async fn status(config: &Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileCheckpointStore::new(config.paths.results_dir()).await?;
    let mut rows = Vec::new();
    for name in store.manufacturers().await? {
        let (total, complete) = store.load(&name).await?.counts();
        rows.push((name, total, complete));
    }

    if format == "json" {
        let json: Vec<_> = rows
            .iter()
            .map(|(name, total, complete)| {
                serde_json::json!({"manufacturer": name, "combinations": total, "complete": complete})
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("{:<24} {:>12} {:>10}", "MANUFACTURER", "COMBINATIONS", "COMPLETE");
    println!("{}", "-".repeat(48));
    for (name, total, complete) in &rows {
        println!("{:<24} {:>12} {:>10}", name, total, complete);
    }
    println!();
    println!("Total: {} manufacturers", rows.len());
    Ok(())
}

fn classify(
    config: &Config,
    manufacturer: &str,
    model: &str,
    tokens: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let catalogue = load_catalogue(config)?;
    let Some(entry) = catalogue.get(manufacturer) else {
        return Err(format!("unknown manufacturer '{}'", manufacturer).into());
    };

    let accepted = classify_tokens(entry, model, tokens);
    println!("{} ({}):", entry.name, entry.encoding_for(model));
    for token in &accepted {
        println!("  accept  {:<16} {:?}", token.raw, token.sort_key);
    }
    for raw in tokens {
        if !accepted.iter().any(|t| t.raw == raw.trim()) {
            println!("  reject  {}", raw);
        }
    }
    Ok(())
}

fn validate(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut result = ConfigValidator::validate(config)?;
    let catalogue = load_catalogue(config)?;
    result.extend(ConfigValidator::validate_catalogue(&catalogue));

    for warning in &result.warnings {
        println!("warning  {}: {}", warning.path, warning.message);
    }
    for e in &result.errors {
        println!("error    {}: {}", e.path, e.message);
    }
    if result.is_valid() {
        println!("Configuration OK ({} manufacturers)", catalogue.len());
        Ok(())
    } else {
        Err(format!("{} configuration errors", result.errors.len()).into())
    }
}
