//! Following a line range backwards through a file's history.
//!
//! The walk keeps one live range expressed in the coordinates of the revision
//! it is currently looking at. For each transition from entry `i` to its
//! predecessor `i + 1` the diff hunks decide whether the range was touched,
//! and re-express it in the predecessor's coordinates:
//!
//! - a hunk that consumes a live line, or a pure deletion whose gap lies
//!   strictly between two live lines, modifies the range; a straddling hunk
//!   widens the range to its whole predecessor-side span,
//! - a hunk entirely above the range shifts it by `old_len - new_len`,
//! - a hunk entirely below it is ignored.
//!
//! Edits that only touch the line directly above or below the range do not
//! count as modifications.

use std::collections::HashMap;

use docsweep_core::{DocsweepError, FileHistory, HistoryEnd, Hunk, LineRange};
use docsweep_vcs::VersionControl;
use tracing::debug;

/// How far back a walk goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkLimit {
    /// Until the history runs out.
    Exhaustive,
    /// Stop right after the first modifying revision.
    FirstModification,
    /// Only consider transitions of entries newer than this index.
    Until(usize),
}

/// Why a walk stopped. Each variant carries the index of the entry it stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEnd {
    /// The oldest entry of the history, where the file came into existence.
    Creation(usize),
    /// The range has no lines in the predecessor: it was introduced here.
    Origin(usize),
    /// The oldest entry is an unfollowed rename; older history exists.
    RenameBoundary(usize),
    /// The [`WalkLimit`] was reached.
    Limit(usize),
}

impl WalkEnd {
    /// Index of the entry the walk stopped at.
    pub fn index(self) -> usize {
        match self {
            WalkEnd::Creation(i)
            | WalkEnd::Origin(i)
            | WalkEnd::RenameBoundary(i)
            | WalkEnd::Limit(i) => i,
        }
    }

    /// Whether the walk stopped because a rename was not followed.
    pub fn truncated_by_rename(self) -> bool {
        matches!(self, WalkEnd::RenameBoundary(_))
    }
}

/// Result of tracking one range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeHistory {
    /// Indices into the history of the revisions that modified the range, newest first.
    pub modifying: Vec<usize>,
    /// Where the walk ended.
    pub end: WalkEnd,
}

/// Outcome of translating a range across one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    /// The range in the predecessor's coordinates, `None` when no line of it existed there.
    pub range: Option<LineRange>,
    /// Whether any hunk modified the range.
    pub modified: bool,
}

/// Tracks line ranges of the newest revision through one file's history.
///
/// Diffs are fetched lazily and cached, so tracking many ranges of the same
/// file asks the backend for each adjacent pair at most once.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use docsweep_core::{LineRange, VcsConfig, VcsKind};
/// use docsweep_history::{RangeTracker, WalkLimit};
/// use docsweep_vcs::open_backend;
///
/// let vcs = open_backend(&VcsConfig::new(VcsKind::Git), Path::new("app.py")).unwrap();
/// let history = vcs.enumerate_revisions(Path::new("app.py"), true).unwrap();
/// let mut tracker = RangeTracker::new(vcs.as_ref(), &history);
/// let walk = tracker
///     .track(LineRange::new(3, 10).unwrap(), WalkLimit::Exhaustive)
///     .unwrap();
/// println!("modified in {} revisions", walk.modifying.len());
/// ```
pub struct RangeTracker<'a> {
    vcs: &'a dyn VersionControl,
    history: &'a FileHistory,
    /// Hunks between entry `i` and `i + 1`; `None` when the older side does not exist.
    hunks: HashMap<usize, Option<Vec<Hunk>>>,
}

impl<'a> RangeTracker<'a> {
    /// Create a tracker over `history`, using `vcs` for diffs.
    pub fn new(vcs: &'a dyn VersionControl, history: &'a FileHistory) -> Self {
        Self {
            vcs,
            history,
            hunks: HashMap::new(),
        }
    }

    /// Follow `range`, given in the coordinates of the newest entry, backwards.
    ///
    /// An empty history yields no modifying revisions and ends in
    /// [`WalkEnd::Creation`] at index 0.
    ///
    /// # Errors
    ///
    /// Returns [`DocsweepError::VcsExecutable`] or [`DocsweepError::Diff`] if
    /// a diff cannot be obtained. A missing predecessor is not an error; it
    /// ends the walk as a creation.
    pub fn track(
        &mut self,
        range: LineRange,
        limit: WalkLimit,
    ) -> Result<RangeHistory, DocsweepError> {
        let mut live = range;
        let mut modifying = Vec::new();
        let last = self.history.len().saturating_sub(1);

        let mut index = 0;
        let end = loop {
            if let WalkLimit::Until(stop) = limit {
                if index >= stop {
                    break WalkEnd::Limit(index);
                }
            }
            if index >= last {
                break match self.history.end {
                    HistoryEnd::Created => WalkEnd::Creation(index),
                    HistoryEnd::RenameBoundary(_) => WalkEnd::RenameBoundary(index),
                };
            }

            let Some(hunks) = self.hunks_before(index)? else {
                break WalkEnd::Creation(index);
            };
            let step = translate(live, hunks);
            debug!(index, live = %live, modified = step.modified, "range step");

            if step.modified {
                modifying.push(index);
            }
            let Some(next) = step.range else {
                break WalkEnd::Origin(index);
            };
            if step.modified && limit == WalkLimit::FirstModification {
                break WalkEnd::Limit(index);
            }
            live = next;
            index += 1;
        };

        Ok(RangeHistory { modifying, end })
    }

    /// Hunks turning entry `index + 1` into entry `index`.
    fn hunks_before(&mut self, index: usize) -> Result<Option<&[Hunk]>, DocsweepError> {
        if !self.hunks.contains_key(&index) {
            let new = &self.history.entries[index];
            let old = &self.history.entries[index + 1];
            let hunks = match self.vcs.diff_hunks(new, old) {
                Ok(hunks) => Some(hunks),
                Err(DocsweepError::NotFound { path, revision }) => {
                    debug!(path = %path.display(), %revision, "predecessor missing, treating as creation");
                    None
                }
                Err(e) => return Err(e),
            };
            self.hunks.insert(index, hunks);
        }
        Ok(self.hunks.get(&index).and_then(|hunks| hunks.as_deref()))
    }
}

/// Re-express `live` in the predecessor's coordinates. `hunks` must be
/// ordered by `new_start`.
pub(crate) fn translate(live: LineRange, hunks: &[Hunk]) -> Step {
    let start = i64::from(live.start);
    let end = i64::from(live.end);
    let mut start_shift = 0i64;
    let mut end_shift = 0i64;
    let mut fixed_start: Option<i64> = None;
    let mut fixed_end: Option<i64> = None;
    let mut modified = false;

    for hunk in hunks {
        let hunk_start = i64::from(hunk.new_start);

        if hunk.new_len == 0 {
            // The gap lies between new lines `hunk_start - 1` and `hunk_start`.
            if hunk_start <= start {
                start_shift += hunk.shift();
                end_shift += hunk.shift();
                continue;
            }
            if hunk_start > end {
                break;
            }
            modified = true;
            end_shift += hunk.shift();
            continue;
        }

        let hunk_end = hunk.new_end();
        if hunk_end < start {
            start_shift += hunk.shift();
            end_shift += hunk.shift();
            continue;
        }
        if hunk_start > end {
            break;
        }

        modified = true;
        if hunk_start <= start {
            fixed_start = Some(i64::from(hunk.old_start));
        }
        if hunk_end >= end {
            fixed_end = Some(hunk.old_end());
        } else {
            end_shift += hunk.shift();
        }
    }

    let new_start = fixed_start.unwrap_or(start + start_shift);
    let new_end = fixed_end.unwrap_or(end + end_shift);
    let range = match (u32::try_from(new_start), u32::try_from(new_end)) {
        (Ok(s), Ok(e)) => LineRange::new(s, e),
        _ => None,
    };
    Step { range, modified }
}
