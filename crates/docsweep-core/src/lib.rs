//! Core types, configuration, and error handling for docsweep.
//!
//! This crate provides the shared foundation used by all other docsweep crates:
//! - [`DocsweepError`]: unified error type using `thiserror` and `miette`
//! - [`DocsweepConfig`]: configuration loaded from `.docsweep.toml`
//! - Shared types: [`Revision`], [`FileHistory`], [`LineRange`], [`Hunk`],
//!   [`DocumentedUnit`], [`UnitStatistic`], [`VcsKind`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{DocsweepConfig, ExecutableConfig, VcsConfig, CONFIG_FILE_NAME};
pub use error::{DocsweepError, FileRenamedError};
pub use types::{
    DocumentedUnit, FileHistory, HistoryEnd, HistoryEntry, Hunk, LineRange, OutputFormat,
    Revision, UnitKind, UnitStatistic, VcsKind,
};

/// A convenience `Result` type for docsweep operations.
pub type Result<T> = std::result::Result<T, DocsweepError>;
