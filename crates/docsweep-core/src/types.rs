use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FileRenamedError;

/// One historical snapshot of a file, addressed by an opaque identifier.
///
/// The identifier is whatever the backend produced (a git commit hash, a
/// Mercurial node) and is never interpreted outside that backend.
///
/// # Examples
///
/// ```
/// use docsweep_core::Revision;
///
/// let rev = Revision::new("3f2a9c1e", true);
/// assert!(rev.is_tip);
/// assert_eq!(rev.short_id(), "3f2a9c1e");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    /// Backend-specific revision identifier.
    pub id: String,
    /// Whether this is the newest revision of the file's history.
    pub is_tip: bool,
}

impl Revision {
    /// Create a revision from a backend identifier.
    pub fn new(id: impl Into<String>, is_tip: bool) -> Self {
        Self {
            id: id.into(),
            is_tip,
        }
    }

    /// The first 12 characters of the identifier, for display.
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(12)
            .map_or(self.id.len(), |(i, _)| i);
        &self.id[..end]
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_id())
    }
}

/// One element of a file's revision chain.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use docsweep_core::{HistoryEntry, Revision};
///
/// let entry = HistoryEntry {
///     revision: Revision::new("abc", false),
///     path: PathBuf::from("old.py"),
///     crossed_rename: true,
/// };
/// assert!(entry.crossed_rename);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// The revision.
    pub revision: Revision,
    /// Repository-relative path of the file in this revision.
    pub path: PathBuf,
    /// Whether stepping back into this revision crossed a rename, i.e. the
    /// next newer entry has a different path.
    pub crossed_rename: bool,
}

/// How a file's enumerated history ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEnd {
    /// The oldest entry is where the path came into existence.
    Created,
    /// The oldest entry performed a rename that was not followed. History
    /// older than it exists but was intentionally not enumerated.
    RenameBoundary(FileRenamedError),
}

/// The linear, newest-first revision chain of one file.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use docsweep_core::{FileHistory, HistoryEnd, HistoryEntry, Revision};
///
/// let history = FileHistory {
///     entries: vec![HistoryEntry {
///         revision: Revision::new("r0", true),
///         path: PathBuf::from("a.py"),
///         crossed_rename: false,
///     }],
///     end: HistoryEnd::Created,
/// };
/// assert_eq!(history.len(), 1);
/// assert_eq!(history.tip().unwrap().revision.id, "r0");
/// assert!(!history.truncated_by_rename());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHistory {
    /// Revisions that changed the file, newest first.
    pub entries: Vec<HistoryEntry>,
    /// What lies beyond the oldest entry.
    pub end: HistoryEnd,
}

impl FileHistory {
    /// Number of revisions in the chain.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain has no revisions at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The newest entry.
    pub fn tip(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    /// The entry at `index` (0 is the tip).
    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    /// Whether the chain stops at a rename that was not followed.
    pub fn truncated_by_rename(&self) -> bool {
        matches!(self.end, HistoryEnd::RenameBoundary(_))
    }
}

/// An inclusive, 1-indexed line range with `1 <= start <= end`.
///
/// # Examples
///
/// ```
/// use docsweep_core::LineRange;
///
/// let range = LineRange::new(3, 7).unwrap();
/// assert_eq!(range.len(), 5);
/// assert!(range.contains(3) && range.contains(7));
/// assert!(LineRange::new(0, 2).is_none());
/// assert!(LineRange::new(5, 4).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    /// First line.
    pub start: u32,
    /// Last line.
    pub end: u32,
}

impl LineRange {
    /// Create a range, returning `None` unless `1 <= start <= end`.
    pub fn new(start: u32, end: u32) -> Option<Self> {
        (start >= 1 && start <= end).then_some(Self { start, end })
    }

    /// Number of lines covered.
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Always `false`; a valid range covers at least one line.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `line` lies inside the range.
    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }

    /// Whether `other` lies entirely inside this range.
    pub fn encloses(&self, other: &LineRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One contiguous edit between two adjacent revisions.
///
/// Coordinates are 1-indexed. A side with length zero consumes no lines; its
/// start is the line *before which* the gap lies (so an insertion at the top
/// of a file has `old_start == 1`, `old_len == 0`). Unified diff headers
/// report the line *after which* the gap lies; use [`Hunk::from_unified`] to
/// convert.
///
/// # Examples
///
/// ```
/// use docsweep_core::Hunk;
///
/// // "@@ -5,0 +6,2 @@": two lines inserted after old line 5.
/// let hunk = Hunk::from_unified(5, 0, 6, 2);
/// assert_eq!(hunk.old_start, 6);
/// assert_eq!(hunk.new_start, 6);
/// assert!(hunk.is_insertion());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    /// Starting line in the older revision.
    pub old_start: u32,
    /// Number of lines in the older revision.
    pub old_len: u32,
    /// Starting line in the newer revision.
    pub new_start: u32,
    /// Number of lines in the newer revision.
    pub new_len: u32,
}

impl Hunk {
    /// Convert a unified diff hunk header into the gap-before convention.
    pub fn from_unified(old_start: u32, old_len: u32, new_start: u32, new_len: u32) -> Self {
        Self {
            old_start: if old_len == 0 { old_start + 1 } else { old_start },
            old_len,
            new_start: if new_len == 0 { new_start + 1 } else { new_start },
            new_len,
        }
    }

    /// Last line consumed on the newer side; `new_start - 1` when it consumes none.
    pub fn new_end(&self) -> i64 {
        i64::from(self.new_start) + i64::from(self.new_len) - 1
    }

    /// Last line consumed on the older side; `old_start - 1` when it consumes none.
    pub fn old_end(&self) -> i64 {
        i64::from(self.old_start) + i64::from(self.old_len) - 1
    }

    /// How far lines below this hunk move when going from newer to older.
    pub fn shift(&self) -> i64 {
        i64::from(self.old_len) - i64::from(self.new_len)
    }

    /// Lines were only added.
    pub fn is_insertion(&self) -> bool {
        self.old_len == 0 && self.new_len > 0
    }

    /// Lines were only removed.
    pub fn is_deletion(&self) -> bool {
        self.new_len == 0 && self.old_len > 0
    }
}

/// Kind of a documented code unit.
///
/// # Examples
///
/// ```
/// use docsweep_core::UnitKind;
///
/// assert_eq!(UnitKind::Method.to_string(), "method");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Module,
    Class,
    Function,
    Method,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Module => write!(f, "module"),
            UnitKind::Class => write!(f, "class"),
            UnitKind::Function => write!(f, "function"),
            UnitKind::Method => write!(f, "method"),
        }
    }
}

/// A module, class, function, or method that carries documentation.
///
/// # Examples
///
/// ```
/// use docsweep_core::{DocumentedUnit, LineRange, UnitKind};
///
/// let unit = DocumentedUnit {
///     qualified_name: "Parser.feed".into(),
///     kind: UnitKind::Method,
///     doc_range: LineRange::new(5, 5).unwrap(),
///     body_range: LineRange::new(4, 12).unwrap(),
/// };
/// assert!(unit.body_range.encloses(&unit.doc_range));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentedUnit {
    /// Dotted path from lexical nesting, e.g. `Class.method`.
    pub qualified_name: String,
    /// What kind of definition this is.
    pub kind: UnitKind,
    /// Lines of the documentation string.
    pub doc_range: LineRange,
    /// Lines of the whole definition, without trailing blank lines.
    pub body_range: LineRange,
}

/// Documentation staleness statistics for one unit at the tip revision.
///
/// # Examples
///
/// ```
/// use docsweep_core::{DocumentedUnit, LineRange, Revision, UnitKind, UnitStatistic};
///
/// let stat = UnitStatistic {
///     unit: DocumentedUnit {
///         qualified_name: "f".into(),
///         kind: UnitKind::Function,
///         doc_range: LineRange::new(2, 2).unwrap(),
///         body_range: LineRange::new(1, 3).unwrap(),
///     },
///     last_doc_revision: Revision::new("r0", false),
///     last_doc_revision_age: 2,
///     changes_since_count: 2,
///     truncated_by_rename: false,
/// };
/// assert!(stat.exceeds(1));
/// assert!(!stat.exceeds(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitStatistic {
    /// The unit as found in the tip revision.
    pub unit: DocumentedUnit,
    /// Newest revision that changed the documentation, or the revision where
    /// the history ends if it never changed.
    pub last_doc_revision: Revision,
    /// How many revisions of the file are newer than `last_doc_revision`.
    pub last_doc_revision_age: usize,
    /// Revisions newer than `last_doc_revision` that changed the body.
    pub changes_since_count: usize,
    /// Whether a walk stopped at a rename that was not followed.
    pub truncated_by_rename: bool,
}

impl UnitStatistic {
    /// Whether the body changed more than `max_changes` times since the
    /// documentation did.
    pub fn exceeds(&self, max_changes: usize) -> bool {
        self.changes_since_count > max_changes
    }
}

/// Supported version control backends.
///
/// # Examples
///
/// ```
/// use docsweep_core::VcsKind;
///
/// let kind: VcsKind = "hg".parse().unwrap();
/// assert_eq!(kind, VcsKind::Mercurial);
/// assert_eq!(kind.to_string(), "hg");
/// assert_eq!(VcsKind::Git.default_executable(), "git");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VcsKind {
    #[default]
    #[serde(rename = "git")]
    Git,
    #[serde(rename = "hg", alias = "mercurial")]
    Mercurial,
}

impl VcsKind {
    /// All backends, in the order they are listed to users.
    pub const ALL: [VcsKind; 2] = [VcsKind::Git, VcsKind::Mercurial];

    /// Executable name looked up on `PATH` when none is configured.
    pub fn default_executable(self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Mercurial => "hg",
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsKind::Git => write!(f, "git"),
            VcsKind::Mercurial => write!(f, "hg"),
        }
    }
}

impl FromStr for VcsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "git" => Ok(VcsKind::Git),
            "hg" | "mercurial" => Ok(VcsKind::Mercurial),
            other => Err(format!("unknown version control system: {other}")),
        }
    }
}

/// Output format for the command line reporter.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use docsweep_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "flake8".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Lint);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable per-unit summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// One linter diagnostic per unit over the threshold.
    Lint,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Lint => write!(f, "lint"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "lint" | "flake8" => Ok(OutputFormat::Lint),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
