//! Version control access for docsweep.
//!
//! Wraps an external version control executable behind the
//! [`VersionControl`] capability trait: enumerate the revisions of a file,
//! read a file at a revision, and diff a file between two adjacent
//! revisions. Two backends exist, [`git::GitBackend`] and
//! [`hg::MercurialBackend`], selected by [`open_backend`].

pub mod diff;
pub mod git;
pub mod hg;
mod process;

use std::path::{Path, PathBuf};

use docsweep_core::{
    DocsweepError, FileHistory, HistoryEntry, Hunk, Revision, VcsConfig, VcsKind,
};

pub use git::GitBackend;
pub use hg::MercurialBackend;

/// The capabilities docsweep needs from a version control system.
///
/// All paths taken by the capability methods are relative to [`root`](Self::root).
/// Implementations must agree exactly on [`Hunk`] coordinates so that range
/// tracking behaves the same for every backend.
pub trait VersionControl: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> VcsKind;

    /// Absolute, canonical repository root.
    fn root(&self) -> &Path;

    /// Express `path` relative to the repository root.
    ///
    /// # Errors
    ///
    /// Returns [`DocsweepError::FileNotFound`] if `path` does not exist and
    /// [`DocsweepError::NotTracked`] if it lies outside the repository.
    fn relative_path(&self, path: &Path) -> Result<PathBuf, DocsweepError> {
        let absolute = path
            .canonicalize()
            .map_err(|_| DocsweepError::FileNotFound(path.to_path_buf()))?;
        absolute
            .strip_prefix(self.root())
            .map(Path::to_path_buf)
            .map_err(|_| DocsweepError::NotTracked(path.to_path_buf()))
    }

    /// Revisions that changed `path`, newest first.
    ///
    /// Stops at the revision where the path came into existence. With
    /// `follow_renames` disabled it stops at the first rename instead and
    /// reports it through [`HistoryEnd::RenameBoundary`](docsweep_core::HistoryEnd::RenameBoundary).
    /// An untracked path yields an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`DocsweepError::VcsExecutable`] if the executable fails.
    fn enumerate_revisions(
        &self,
        path: &Path,
        follow_renames: bool,
    ) -> Result<FileHistory, DocsweepError>;

    /// Content of `path` at `revision`.
    ///
    /// # Errors
    ///
    /// Returns [`DocsweepError::NotFound`] if the path has no content in that
    /// revision, or [`DocsweepError::VcsExecutable`] if the executable fails.
    fn read_content(&self, path: &Path, revision: &Revision) -> Result<String, DocsweepError>;

    /// Hunks turning `old` into `new`, where `old` is the entry right after
    /// `new` in the enumerated history. `new_*` coordinates refer to `new`.
    ///
    /// # Errors
    ///
    /// Returns [`DocsweepError::NotFound`] if either side does not exist, or
    /// [`DocsweepError::VcsExecutable`] if the executable fails.
    fn diff_hunks(
        &self,
        new: &HistoryEntry,
        old: &HistoryEntry,
    ) -> Result<Vec<Hunk>, DocsweepError>;
}

/// Open the backend selected by `config` for the repository containing `path`.
///
/// # Errors
///
/// Returns [`DocsweepError::NotTracked`] if `path` is not inside a repository
/// of the configured kind, or [`DocsweepError::VcsExecutable`] if the
/// executable cannot be run.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use docsweep_core::{VcsConfig, VcsKind};
/// use docsweep_vcs::open_backend;
///
/// let vcs = open_backend(&VcsConfig::new(VcsKind::Git), Path::new("src/app.py")).unwrap();
/// let history = vcs.enumerate_revisions(Path::new("src/app.py"), true).unwrap();
/// println!("{} revisions", history.len());
/// ```
pub fn open_backend(
    config: &VcsConfig,
    path: &Path,
) -> Result<Box<dyn VersionControl>, DocsweepError> {
    match config.kind {
        VcsKind::Git => Ok(Box::new(GitBackend::open(&config.executable, path)?)),
        VcsKind::Mercurial => Ok(Box::new(MercurialBackend::open(&config.executable, path)?)),
    }
}

/// The closest existing directory at or above `path`.
pub(crate) fn nearest_directory(path: &Path) -> PathBuf {
    let mut candidate = if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent().map(Path::to_path_buf).unwrap_or_default()
    };
    while !candidate.as_os_str().is_empty() && !candidate.is_dir() {
        candidate = candidate.parent().map(Path::to_path_buf).unwrap_or_default();
    }
    if candidate.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        candidate
    }
}

/// Turn backend output naming a directory into a canonical root.
pub(crate) fn canonical_root(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim_end_matches(['\n', '\r']);
    if trimmed.is_empty() {
        return None;
    }
    PathBuf::from(trimmed).canonicalize().ok()
}
