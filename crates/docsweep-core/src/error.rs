use std::path::PathBuf;

use miette::Diagnostic;

use crate::types::VcsKind;

/// Errors that can occur across docsweep.
///
/// Library crates return this type directly; the binary renders it through
/// `miette` at the boundary. Only [`DocsweepError::VcsExecutable`] is fatal
/// for a whole run, every other variant concerns a single file.
///
/// # Examples
///
/// ```
/// use docsweep_core::DocsweepError;
///
/// let err = DocsweepError::Config("unknown vcs".into());
/// assert!(err.to_string().contains("unknown vcs"));
/// assert!(!err.is_fatal());
/// ```
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum DocsweepError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(docsweep::io))]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(docsweep::config))]
    Config(String),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(docsweep::config))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found on disk.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(docsweep::file_not_found))]
    FileNotFound(PathBuf),

    /// The file is not under version control, or has no recorded revisions.
    #[error("{} does not seem to be under version control", .0.display())]
    #[diagnostic(
        code(docsweep::not_tracked),
        help("commit the file, or pick the matching backend with --vcs")
    )]
    NotTracked(PathBuf),

    /// The path has no content at the given revision.
    #[error("{} does not exist in revision {revision}", .path.display())]
    #[diagnostic(code(docsweep::not_found))]
    NotFound {
        /// Repository-relative path that was looked up.
        path: PathBuf,
        /// Revision in which the path is absent.
        revision: String,
    },

    /// The version control executable is missing, unusable, or failed unexpectedly.
    #[error("{} is not usable as the {vcs} executable: {reason}", .executable.display())]
    #[diagnostic(
        code(docsweep::vcs_executable),
        help("check the executable path with --vcs-executable or in .docsweep.toml")
    )]
    VcsExecutable {
        /// Backend the executable was configured for.
        vcs: VcsKind,
        /// The configured executable.
        executable: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Source text could not be parsed.
    #[error("could not parse {}: {message} (line {line})", .path.display())]
    #[diagnostic(code(docsweep::parse))]
    Parse {
        /// File whose content failed to parse.
        path: PathBuf,
        /// First line with a syntax error (1-indexed).
        line: u32,
        /// Parser message.
        message: String,
    },

    /// The backend produced diff output that could not be understood.
    #[error("diff error: {0}")]
    #[diagnostic(code(docsweep::diff))]
    Diff(String),
}

impl DocsweepError {
    /// Whether this error should abort the whole run rather than a single file.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use docsweep_core::{DocsweepError, VcsKind};
    ///
    /// let err = DocsweepError::VcsExecutable {
    ///     vcs: VcsKind::Git,
    ///     executable: PathBuf::from("/nope/git"),
    ///     reason: "not found".into(),
    /// };
    /// assert!(err.is_fatal());
    /// assert!(!DocsweepError::NotTracked(PathBuf::from("a.py")).is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(self, DocsweepError::VcsExecutable { .. })
    }
}

/// A rename boundary reached while rename following was disabled.
///
/// Never raised: it is carried by
/// [`HistoryEnd::RenameBoundary`](crate::HistoryEnd::RenameBoundary) so callers
/// can still use the history collected up to the rename.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use docsweep_core::FileRenamedError;
///
/// let err = FileRenamedError {
///     path: PathBuf::from("new.py"),
///     previous_path: PathBuf::from("old.py"),
///     revision: "abc123".into(),
/// };
/// assert!(err.to_string().contains("old.py"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "{} was renamed from {} in revision {revision}",
    .path.display(),
    .previous_path.display()
)]
pub struct FileRenamedError {
    /// Path of the file from `revision` onwards.
    pub path: PathBuf,
    /// Path of the file before `revision`.
    pub previous_path: PathBuf,
    /// Revision that performed the rename.
    pub revision: String,
}
