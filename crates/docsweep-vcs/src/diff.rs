//! Unified diff parsing shared by both backends.

use std::path::PathBuf;

use docsweep_core::{DocsweepError, Hunk};

/// The hunks of a single file within a unified diff.
///
/// # Examples
///
/// ```
/// use docsweep_vcs::diff::parse_unified_diff;
///
/// let diff = "diff --git a/hello.py b/hello.py\n\
///             --- a/hello.py\n\
///             +++ b/hello.py\n\
///             @@ -2 +2,2 @@\n\
///             -    pass\n\
///             +    x = 1\n\
///             +    return x\n";
/// let files = parse_unified_diff(diff).unwrap();
/// assert_eq!(files.len(), 1);
/// assert_eq!(files[0].hunks.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileDiff {
    /// Path in the old version, `None` for a new file.
    pub old_path: Option<PathBuf>,
    /// Path in the new version, `None` for a deleted file.
    pub new_path: Option<PathBuf>,
    /// Hunks in file order, normalized with [`Hunk::from_unified`].
    pub hunks: Vec<Hunk>,
    /// Whether the diff marks the file as newly created.
    pub is_new_file: bool,
    /// Whether the diff marks the file as deleted.
    pub is_deleted_file: bool,
    /// Whether the diff records a rename.
    pub is_rename: bool,
}

/// Parse unified diff output into per-file hunk lists.
///
/// Understands `diff --git` headers, `rename from`/`rename to`, new and
/// deleted file markers, and `\ No newline at end of file`. Binary sections
/// are dropped.
///
/// # Errors
///
/// Returns [`DocsweepError::Diff`] if a hunk header is malformed.
///
/// # Examples
///
/// ```
/// use docsweep_vcs::diff::parse_unified_diff;
///
/// assert!(parse_unified_diff("").unwrap().is_empty());
/// ```
pub fn parse_unified_diff(input: &str) -> Result<Vec<FileDiff>, DocsweepError> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;
    let mut is_binary = false;
    // Lines still owed to the open hunk, so body lines that look like
    // headers ("--- x" as a removed "-- x") are not misread.
    let mut remaining_old = 0u32;
    let mut remaining_new = 0u32;

    for line in input.lines() {
        if remaining_old > 0 || remaining_new > 0 {
            match line.as_bytes().first() {
                Some(b'-') => remaining_old = remaining_old.saturating_sub(1),
                Some(b'+') => remaining_new = remaining_new.saturating_sub(1),
                Some(b' ') | None => {
                    remaining_old = remaining_old.saturating_sub(1);
                    remaining_new = remaining_new.saturating_sub(1);
                }
                Some(b'\\') => {}
                _ => {
                    return Err(DocsweepError::Diff(format!(
                        "hunk ended early before line: {line}"
                    )))
                }
            }
            continue;
        }

        if let Some(header) = line.strip_prefix("diff --git ") {
            if let Some(file) = current.take() {
                if !is_binary {
                    files.push(file);
                }
            }
            is_binary = false;
            let (old_path, new_path) = parse_git_header(header);
            current = Some(FileDiff {
                old_path,
                new_path,
                ..FileDiff::default()
            });
            continue;
        }

        // Plain unified diffs have no "diff --git" line.
        if line.starts_with("--- ") && current.is_none() {
            current = Some(FileDiff::default());
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if line.starts_with("Binary files ") && line.ends_with(" differ") {
            is_binary = true;
            continue;
        }

        if line.starts_with("new file mode") {
            file.is_new_file = true;
            continue;
        }

        if line.starts_with("deleted file mode") {
            file.is_deleted_file = true;
            continue;
        }

        if let Some(path) = line.strip_prefix("rename from ") {
            file.is_rename = true;
            file.old_path = Some(PathBuf::from(unquote(path)));
            continue;
        }

        if let Some(path) = line.strip_prefix("rename to ") {
            file.is_rename = true;
            file.new_path = Some(PathBuf::from(unquote(path)));
            continue;
        }

        if let Some(path) = line.strip_prefix("--- ") {
            file.old_path = parse_path(path);
            if file.old_path.is_none() {
                file.is_new_file = true;
            }
            continue;
        }

        if let Some(path) = line.strip_prefix("+++ ") {
            file.new_path = parse_path(path);
            if file.new_path.is_none() {
                file.is_deleted_file = true;
            }
            continue;
        }

        if line.starts_with("@@ ") {
            let (old_start, old_len, new_start, new_len) = parse_hunk_header(line)?;
            file.hunks
                .push(Hunk::from_unified(old_start, old_len, new_start, new_len));
            remaining_old = old_len;
            remaining_new = new_len;
        }
    }

    if let Some(file) = current.take() {
        if !is_binary {
            files.push(file);
        }
    }

    Ok(files)
}

fn unquote(raw: &str) -> &str {
    raw.trim_end_matches('\t').trim_matches('"')
}

fn strip_side_prefix(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

/// Parse a `---`/`+++` path, `None` for `/dev/null`.
fn parse_path(raw: &str) -> Option<PathBuf> {
    // Some tools append a tab and a timestamp.
    let raw = raw.split('\t').next().unwrap_or(raw);
    let normalized = unquote(raw);
    if normalized == "/dev/null" {
        return None;
    }
    Some(PathBuf::from(strip_side_prefix(normalized)))
}

/// Split `a/<old> b/<new>` from a `diff --git` line.
fn parse_git_header(header: &str) -> (Option<PathBuf>, Option<PathBuf>) {
    let header = header.trim();
    match header.rsplit_once(" b/").or_else(|| header.rsplit_once(" \"b/")) {
        Some((old, new)) => (
            Some(PathBuf::from(strip_side_prefix(unquote(old)))),
            Some(PathBuf::from(unquote(new))),
        ),
        None => (None, None),
    }
}

fn parse_hunk_header(line: &str) -> Result<(u32, u32, u32, u32), DocsweepError> {
    let inner = line
        .strip_prefix("@@ ")
        .and_then(|s| {
            let end = s.find(" @@")?;
            Some(&s[..end])
        })
        .ok_or_else(|| DocsweepError::Diff(format!("invalid hunk header: {line}")))?;

    let (old, new) = inner
        .split_once(' ')
        .ok_or_else(|| DocsweepError::Diff(format!("invalid hunk header: {line}")))?;

    let old = old
        .strip_prefix('-')
        .ok_or_else(|| DocsweepError::Diff(format!("invalid old range in hunk: {line}")))?;
    let new = new
        .strip_prefix('+')
        .ok_or_else(|| DocsweepError::Diff(format!("invalid new range in hunk: {line}")))?;

    let (old_start, old_len) = parse_range(old, line)?;
    let (new_start, new_len) = parse_range(new, line)?;

    Ok((old_start, old_len, new_start, new_len))
}

fn parse_range(range: &str, context: &str) -> Result<(u32, u32), DocsweepError> {
    let invalid = || DocsweepError::Diff(format!("invalid range in: {context}"));
    match range.split_once(',') {
        Some((start, count)) => Ok((
            start.parse().map_err(|_| invalid())?,
            count.parse().map_err(|_| invalid())?,
        )),
        None => Ok((range.parse().map_err(|_| invalid())?, 1)),
    }
}
