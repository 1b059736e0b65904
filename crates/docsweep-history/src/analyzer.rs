//! Per-file docstring staleness analysis.

use std::path::{Path, PathBuf};

use docsweep_core::{DocsweepError, DocumentedUnit, FileHistory, UnitStatistic, VcsConfig};
use docsweep_units::extract_units;
use docsweep_vcs::{open_backend, VersionControl};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::tracker::{RangeTracker, WalkLimit};

/// Statistics for every documented unit of one file.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use docsweep_history::FileAnalysis;
///
/// let analysis = FileAnalysis {
///     path: PathBuf::from("app.py"),
///     revisions: 3,
///     units: vec![],
/// };
/// let json = serde_json::to_string(&analysis).unwrap();
/// assert!(json.contains("\"revisions\":3"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    /// The file as it was named by the caller.
    pub path: PathBuf,
    /// Number of revisions in the file's enumerated history.
    pub revisions: usize,
    /// One statistic per documented unit, in source order.
    pub units: Vec<UnitStatistic>,
}

/// Computes [`UnitStatistic`]s for files of one repository.
pub struct Analyzer<'a> {
    vcs: &'a dyn VersionControl,
    follow_renames: bool,
}

impl<'a> Analyzer<'a> {
    /// Create an analyzer that reads history through `vcs`.
    pub fn new(vcs: &'a dyn VersionControl, follow_renames: bool) -> Self {
        Self {
            vcs,
            follow_renames,
        }
    }

    /// Analyze the newest committed revision of `path`.
    ///
    /// For each documented unit the docstring range is tracked back to its
    /// newest modifying revision (or to where its history ends), then the
    /// body range is tracked over the strictly newer revisions only.
    ///
    /// # Errors
    ///
    /// - [`DocsweepError::NotTracked`] if the file has no history.
    /// - [`DocsweepError::Parse`] if the newest revision is not valid source.
    /// - [`DocsweepError::VcsExecutable`] if the backend fails.
    pub fn analyze(&self, path: &Path) -> Result<FileAnalysis, DocsweepError> {
        let relative = self.vcs.relative_path(path)?;
        let history = self
            .vcs
            .enumerate_revisions(&relative, self.follow_renames)?;
        let Some(tip) = history.tip() else {
            return Err(DocsweepError::NotTracked(path.to_path_buf()));
        };
        info!(
            path = %path.display(),
            revisions = history.len(),
            "analyzing file"
        );

        let content = self.vcs.read_content(&tip.path, &tip.revision)?;
        let units = extract_units(path, &content)?;
        let statistics = self.unit_statistics(&history, units)?;

        Ok(FileAnalysis {
            path: path.to_path_buf(),
            revisions: history.len(),
            units: statistics,
        })
    }

    fn unit_statistics(
        &self,
        history: &FileHistory,
        units: Vec<DocumentedUnit>,
    ) -> Result<Vec<UnitStatistic>, DocsweepError> {
        let mut tracker = RangeTracker::new(self.vcs, history);
        let mut statistics = Vec::with_capacity(units.len());

        for unit in units {
            let doc = tracker.track(unit.doc_range, WalkLimit::FirstModification)?;
            let doc_index = doc
                .modifying
                .first()
                .copied()
                .unwrap_or_else(|| doc.end.index());

            let body = tracker.track(unit.body_range, WalkLimit::Until(doc_index))?;
            let last_doc_revision = history.entries[doc_index].revision.clone();

            debug!(
                unit = %unit.qualified_name,
                doc_revision = %last_doc_revision,
                doc_end = ?doc.end,
                body_end = ?body.end,
                changes = body.modifying.len(),
                "unit analyzed"
            );

            statistics.push(UnitStatistic {
                truncated_by_rename: doc.end.truncated_by_rename()
                    || body.end.truncated_by_rename(),
                changes_since_count: body.modifying.len(),
                last_doc_revision,
                last_doc_revision_age: doc_index,
                unit,
            });
        }

        Ok(statistics)
    }
}

/// Open the backend described by `config` and analyze `path`.
///
/// Each call owns its backend handle, so calls for different files are
/// independent and may run concurrently.
///
/// # Errors
///
/// Everything [`open_backend`] and [`Analyzer::analyze`] can return.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use docsweep_core::{VcsConfig, VcsKind};
/// use docsweep_history::analyze_file;
///
/// let analysis = analyze_file(Path::new("app.py"), &VcsConfig::new(VcsKind::Git)).unwrap();
/// for stat in &analysis.units {
///     println!("{}: {} changes", stat.unit.qualified_name, stat.changes_since_count);
/// }
/// ```
pub fn analyze_file(path: &Path, config: &VcsConfig) -> Result<FileAnalysis, DocsweepError> {
    let vcs = open_backend(config, path)?;
    Analyzer::new(vcs.as_ref(), config.follow_renames).analyze(path)
}
