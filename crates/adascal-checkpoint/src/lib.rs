//! # adascal checkpoint
//!
//! Resumable persistence of extracted results.
//!
//! ## Features
//!
//! - Per-manufacturer result files written with temp-file-then-rename
//! - Union merge on every save, so a slot once recorded is never lost
//! - Per-model token lists in a `_tokens.json` sidecar, so complete models
//!   are skipped without navigating
//! - Combined `all_results.json` export and a per-run report

pub mod error;
pub mod file_store;
pub mod report;
pub mod store;

pub use error::CheckpointError;
pub use file_store::FileCheckpointStore;
pub use report::{ReportEntry, ReportKind, RunReport};
pub use store::{CheckpointStore, MemoryCheckpointStore, ModelTokens};
