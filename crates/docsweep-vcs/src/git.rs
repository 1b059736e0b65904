//! Git backend driven through the `git` executable.

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

/// Exit status git uses for "no such repository/object".
const GIT_FATAL: i32 = 128;

/// A git working tree, accessed through the `git` executable.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use docsweep_vcs::{GitBackend, VersionControl};
///
/// let git = GitBackend::open(Path::new("git"), Path::new(".")).unwrap();
/// println!("repository at {}", git.root().display());
/// ```
#[derive(Debug, Clone)]
pub struct GitBackend {
    git: Executable,
    root: PathBuf,
}

/// How one commit touched the followed path.
#[derive(Debug, PartialEq, Eq)]
enum Change {
    Modified(PathBuf),
    Added(PathBuf),
    Deleted,
    Renamed { from: PathBuf, to: PathBuf },
    Unknown,
}

impl GitBackend {
    /// Open the repository containing `path` using `executable`.
    ///
    /// # Errors
    ///
    /// Returns [`DocsweepError::NotTracked`] if `path` is not inside a git
    /// working tree and [`DocsweepError::VcsExecutable`] if `executable`
    /// cannot be run or misbehaves.
    pub fn open(executable: &Path, path: &Path) -> Result<Self, DocsweepError> {
        let git = Executable::new(VcsKind::Git, executable, &[]);
        let mut args: Vec<OsString> = vec!["-C".into(), nearest_directory(path).into()];
        args.extend(["rev-parse", "--show-toplevel"].map(OsString::from));
        let output = git.run(&args)?;

        match output.status {
            Some(0) => {
                let root = canonical_root(&output.stdout)
                    .ok_or_else(|| git.malformed("rev-parse printed no repository root"))?;
                debug!(root = %root.display(), "opened git repository");
                Ok(Self { git, root })
            }
            Some(GIT_FATAL) => Err(DocsweepError::NotTracked(path.to_path_buf())),
            _ => Err(git.unexpected(&output)),
        }
    }

    /// Run a git subcommand from the repository root.
    fn command<I, S>(&self, args: I) -> Result<CommandOutput, DocsweepError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut full: Vec<OsString> = vec![
            "-c".into(),
            "core.quotePath=false".into(),
            "-C".into(),
            self.root.clone().into(),
            "--no-pager".into(),
        ];
        full.extend(args.into_iter().map(Into::into));
        self.git.run(&full)
    }
}

impl VersionControl for GitBackend {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn enumerate_revisions(
        &self,
        path: &Path,
        follow_renames: bool,
    ) -> Result<FileHistory, DocsweepError> {
        let output = self.command([
            OsString::from("log"),
            "--no-color".into(),
            "--follow".into(),
            "--first-parent".into(),
            "--name-status".into(),
            "--format=%x00%H".into(),
            "--".into(),
            path.into(),
        ])?;
        if !output.success() {
            // Unborn HEAD or a path git refuses to look at.
            if output.status == Some(GIT_FATAL) {
                debug!(path = %path.display(), stderr = %output.stderr.trim(), "git log found no history");
                return Ok(FileHistory {
                    entries: Vec::new(),
                    end: HistoryEnd::Created,
                });
            }
            return Err(self.git.unexpected(&output));
        }

        let records = parse_log(&output.stdout);
        let history = build_history(path, records, follow_renames);
        debug!(
            path = %path.display(),
            revisions = history.len(),
            truncated = history.truncated_by_rename(),
            "enumerated git history"
        );
        Ok(history)
    }

    fn read_content(&self, path: &Path, revision: &Revision) -> Result<String, DocsweepError> {
        let output = self.command(["cat-file".into(), "-p".into(), object_name(revision, path)])?;
        match output.status {
            Some(0) => Ok(output.stdout),
            Some(GIT_FATAL) => Err(DocsweepError::NotFound {
                path: path.to_path_buf(),
                revision: revision.id.clone(),
            }),
            _ => Err(self.git.unexpected(&output)),
        }
    }

    fn diff_hunks(
        &self,
        new: &HistoryEntry,
        old: &HistoryEntry,
    ) -> Result<Vec<Hunk>, DocsweepError> {
        let output = self.command([
            OsString::from("diff"),
            "--no-color".into(),
            "--no-ext-diff".into(),
            "--no-textconv".into(),
            "-U0".into(),
            object_name(&old.revision, &old.path),
            object_name(&new.revision, &new.path),
        ])?;
        match output.status {
            Some(0) => {}
            Some(GIT_FATAL) => {
                return Err(DocsweepError::NotFound {
                    path: old.path.clone(),
                    revision: old.revision.id.clone(),
                })
            }
            _ => return Err(self.git.unexpected(&output)),
        }

        let hunks: Vec<Hunk> = parse_unified_diff(&output.stdout)?
            .into_iter()
            .flat_map(|file| file.hunks)
            .collect();
        debug!(
            new = %new.revision,
            old = %old.revision,
            hunks = hunks.len(),
            "diffed adjacent revisions"
        );
        Ok(hunks)
    }
}

/// `<revision>:<path>` with forward slashes, as git expects.
fn object_name(revision: &Revision, path: &Path) -> OsString {
    let path = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    OsString::from(format!("{}:{path}", revision.id))
}

/// Split `git log --format=%x00%H --name-status` output into commit records.
fn parse_log(stdout: &str) -> Vec<(String, Change)> {
    stdout
        .split('\0')
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| {
            let mut lines = record.lines();
            let hash = lines.next()?.trim().to_string();
            if hash.is_empty() {
                return None;
            }
            let change = lines
                .map(str::trim_end)
                .find(|line| !line.is_empty())
                .map_or(Change::Unknown, parse_status);
            Some((hash, change))
        })
        .collect()
}

fn parse_status(line: &str) -> Change {
    let mut fields = line.split('\t');
    let status = fields.next().unwrap_or_default();
    let first = fields.next().map(PathBuf::from);
    let second = fields.next().map(PathBuf::from);

    match (status.chars().next(), first, second) {
        (Some('A'), Some(path), _) => Change::Added(path),
        (Some('D'), _, _) => Change::Deleted,
        (Some('R' | 'C'), Some(from), Some(to)) => Change::Renamed { from, to },
        (Some(_), Some(path), _) => Change::Modified(path),
        _ => Change::Unknown,
    }
}

fn build_history(path: &Path, records: Vec<(String, Change)>, follow_renames: bool) -> FileHistory {
    let mut entries = Vec::with_capacity(records.len());
    let mut current = path.to_path_buf();
    let mut crossed = false;

    for (hash, change) in records {
        let is_tip = entries.is_empty();
        let mut entry = HistoryEntry {
            revision: Revision::new(hash, is_tip),
            path: current.clone(),
            crossed_rename: crossed,
        };
        crossed = false;

        match change {
            Change::Deleted => break,
            Change::Added(added) => {
                entry.path = added;
                entries.push(entry);
                break;
            }
            Change::Modified(modified) => {
                entry.path = modified;
                current = entry.path.clone();
                entries.push(entry);
            }
            Change::Unknown => entries.push(entry),
            Change::Renamed { from, to } => {
                entry.path = to;
                if !follow_renames {
                    let boundary = FileRenamedError {
                        path: entry.path.clone(),
                        previous_path: from,
                        revision: entry.revision.id.clone(),
                    };
                    entries.push(entry);
                    return FileHistory {
                        entries,
                        end: HistoryEnd::RenameBoundary(boundary),
                    };
                }
                entries.push(entry);
                current = from;
                crossed = true;
            }
        }
    }

    FileHistory {
        entries,
        end: HistoryEnd::Created,
    }
}
