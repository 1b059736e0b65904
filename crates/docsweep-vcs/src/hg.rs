//! Mercurial backend driven through the `hg` executable.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use docsweep_core::{
    DocsweepError, FileHistory, FileRenamedError, HistoryEnd, HistoryEntry, Hunk, Revision,
    VcsKind,
};
use tracing::debug;

use crate::diff::parse_unified_diff;
use crate::process::{CommandOutput, Executable};
use crate::{canonical_root, nearest_directory, VersionControl};

/// Plain, locale-independent output with no pager or user aliases.
const HG_ENV: &[(&str, &str)] = &[("HGPLAIN", "1"), ("LC_ALL", "C")];

const FIELD_SEP: char = '\u{1f}';
const PAIR_SEP: char = '\u{1e}';
const ITEM_SEP: char = '\u{1d}';

/// A Mercurial working copy, accessed through the `hg` executable.
///
/// History is enumerated with `hg log --follow-first`, so merges contribute
/// only their first parent, matching the git backend's `--first-parent`.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use docsweep_vcs::{MercurialBackend, VersionControl};
///
/// let hg = MercurialBackend::open(Path::new("hg"), Path::new(".")).unwrap();
/// println!("repository at {}", hg.root().display());
/// ```
#[derive(Debug, Clone)]
pub struct MercurialBackend {
    hg: Executable,
    root: PathBuf,
}

impl MercurialBackend {
    /// Open the repository containing `path` using `executable`.
    ///
    /// # Errors
    ///
    /// Returns [`DocsweepError::NotTracked`] if `path` is not inside a
    /// Mercurial repository and [`DocsweepError::VcsExecutable`] if
    /// `executable` cannot be run or misbehaves.
    pub fn open(executable: &Path, path: &Path) -> Result<Self, DocsweepError> {
        let hg = Executable::new(VcsKind::Mercurial, executable, HG_ENV);
        let args: Vec<OsString> = vec![
            "--cwd".into(),
            nearest_directory(path).into(),
            "root".into(),
        ];
        let output = hg.run(&args)?;

        if output.success() {
            let root = canonical_root(&output.stdout)
                .ok_or_else(|| hg.malformed("root printed no repository root"))?;
            debug!(root = %root.display(), "opened mercurial repository");
            return Ok(Self { hg, root });
        }
        if output.stderr.contains("no repository found") {
            return Err(DocsweepError::NotTracked(path.to_path_buf()));
        }
        Err(hg.unexpected(&output))
    }

    fn command<I, S>(&self, args: I) -> Result<CommandOutput, DocsweepError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut full: Vec<OsString> = vec!["--cwd".into(), self.root.clone().into()];
        full.extend(args.into_iter().map(Into::into));
        self.hg.run(&full)
    }
}

impl VersionControl for MercurialBackend {
    fn kind(&self) -> VcsKind {
        VcsKind::Mercurial
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn enumerate_revisions(
        &self,
        path: &Path,
        follow_renames: bool,
    ) -> Result<FileHistory, DocsweepError> {
        let template = format!(
            "{{node}}{FIELD_SEP}{{file_copies % '{{source}}{PAIR_SEP}{{name}}{ITEM_SEP}'}}\\n"
        );
        let output = self.command([
            OsString::from("log"),
            "--follow-first".into(),
            "--template".into(),
            template.into(),
            "--".into(),
            hg_path(path),
        ])?;
        if !output.success() {
            if output.stderr.contains("cannot follow") {
                debug!(path = %path.display(), stderr = %output.stderr.trim(), "hg log found no history");
                return Ok(FileHistory {
                    entries: Vec::new(),
                    end: HistoryEnd::Created,
                });
            }
            return Err(self.hg.unexpected(&output));
        }

        let history = build_history(path, parse_log(&output.stdout), follow_renames);
        debug!(
            path = %path.display(),
            revisions = history.len(),
            truncated = history.truncated_by_rename(),
            "enumerated mercurial history"
        );
        Ok(history)
    }

    fn read_content(&self, path: &Path, revision: &Revision) -> Result<String, DocsweepError> {
        let output = self.command([
            OsString::from("cat"),
            "--rev".into(),
            revision.id.clone().into(),
            "--".into(),
            hg_path(path),
        ])?;
        if output.success() {
            return Ok(output.stdout);
        }
        if output.status == Some(1) || output.stderr.contains("no such file in") {
            return Err(DocsweepError::NotFound {
                path: path.to_path_buf(),
                revision: revision.id.clone(),
            });
        }
        Err(self.hg.unexpected(&output))
    }

    fn diff_hunks(
        &self,
        new: &HistoryEntry,
        old: &HistoryEntry,
    ) -> Result<Vec<Hunk>, DocsweepError> {
        let mut args = vec![
            OsString::from("diff"),
            "--git".into(),
            "--unified".into(),
            "0".into(),
            "--rev".into(),
            old.revision.id.clone().into(),
            "--rev".into(),
            new.revision.id.clone().into(),
            "--".into(),
            hg_path(&new.path),
        ];
        if old.path != new.path {
            args.push(hg_path(&old.path));
        }
        let output = self.command(args)?;
        if !output.success() {
            if output.stderr.contains("unknown revision") {
                return Err(DocsweepError::NotFound {
                    path: old.path.clone(),
                    revision: old.revision.id.clone(),
                });
            }
            return Err(self.hg.unexpected(&output));
        }

        let hunks: Vec<Hunk> = parse_unified_diff(&output.stdout)?
            .into_iter()
            .find(|file| file.new_path.as_deref() == Some(new.path.as_path()))
            .map(|file| file.hunks)
            .unwrap_or_default();
        debug!(
            new = %new.revision,
            old = %old.revision,
            hunks = hunks.len(),
            "diffed adjacent revisions"
        );
        Ok(hunks)
    }
}

/// Repository-relative path with forward slashes.
///
/// Plain file names are required: `--follow-first` refuses patterns.
fn hg_path(path: &Path) -> OsString {
    let joined = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    OsString::from(joined)
}

/// One `hg log` line: the node and the (source, destination) copies it records.
#[derive(Debug, PartialEq, Eq)]
struct LogRecord {
    node: String,
    copies: Vec<(PathBuf, PathBuf)>,
}

fn parse_log(stdout: &str) -> Vec<LogRecord> {
    stdout
        .lines()
        .filter_map(|line| {
            let (node, copies) = line.split_once(FIELD_SEP)?;
            let copies = copies
                .split(ITEM_SEP)
                .filter_map(|pair| {
                    let (source, name) = pair.split_once(PAIR_SEP)?;
                    Some((PathBuf::from(source), PathBuf::from(name)))
                })
                .collect();
            Some(LogRecord {
                node: node.trim().to_string(),
                copies,
            })
        })
        .filter(|record| !record.node.is_empty())
        .collect()
}

fn build_history(path: &Path, records: Vec<LogRecord>, follow_renames: bool) -> FileHistory {
    let mut entries = Vec::with_capacity(records.len());
    let mut current = path.to_path_buf();
    let mut crossed = false;

    for record in records {
        let entry = HistoryEntry {
            revision: Revision::new(record.node, entries.is_empty()),
            path: current.clone(),
            crossed_rename: crossed,
        };
        crossed = false;

        let source = record
            .copies
            .into_iter()
            .find(|(_, name)| *name == current)
            .map(|(source, _)| source);

        match source {
            Some(previous_path) if !follow_renames => {
                let boundary = FileRenamedError {
                    path: current,
                    previous_path,
                    revision: entry.revision.id.clone(),
                };
                entries.push(entry);
                return FileHistory {
                    entries,
                    end: HistoryEnd::RenameBoundary(boundary),
                };
            }
            Some(previous_path) => {
                entries.push(entry);
                current = previous_path;
                crossed = true;
            }
            None => entries.push(entry),
        }
    }

    FileHistory {
        entries,
        end: HistoryEnd::Created,
    }
}
