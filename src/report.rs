use std::fmt::Write;

use docsweep_core::{OutputFormat, UnitStatistic};
use docsweep_history::FileAnalysis;
use miette::{IntoDiagnostic, Result};

/// Diagnostic code used by the lint output.
pub const LINT_CODE: &str = "DOC100";

/// Render analysis results in the requested format.
///
/// `max_changes` only decides which units are flagged; the statistics
/// themselves are printed unchanged.
pub fn render(
    analyses: &[FileAnalysis],
    format: OutputFormat,
    max_changes: usize,
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(analyses, max_changes)),
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(analyses).into_diagnostic()?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Lint => Ok(render_lint(analyses, max_changes)),
    }
}

fn render_text(analyses: &[FileAnalysis], max_changes: usize) -> String {
    let mut out = String::new();
    for analysis in analyses {
        for stat in &analysis.units {
            let _ = writeln!(
                out,
                "{}:{} ({})",
                analysis.path.display(),
                stat.unit.qualified_name,
                stat.unit.kind
            );
            let _ = writeln!(out, "    docstring: {}", doc_change(analysis, stat));
            let flag = if stat.exceeds(max_changes) {
                "  [potentially outdated]"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "    code changes since: {}{flag}",
                stat.changes_since_count
            );
            if stat.truncated_by_rename {
                let _ = writeln!(out, "    note: history stops at a rename that was not followed");
            }
        }
    }
    out
}

fn doc_change(analysis: &FileAnalysis, stat: &UnitStatistic) -> String {
    let revision = stat.last_doc_revision.short_id();
    if stat.last_doc_revision_age + 1 == analysis.revisions && !stat.truncated_by_rename {
        format!("unchanged since creation in revision {revision}")
    } else {
        let age = stat.last_doc_revision_age;
        let plural = if age == 1 { "" } else { "s" };
        format!("last changed {age} revision{plural} ago, in revision {revision}")
    }
}

fn render_lint(analyses: &[FileAnalysis], max_changes: usize) -> String {
    let mut out = String::new();
    for analysis in analyses {
        for stat in analysis.units.iter().filter(|s| s.exceeds(max_changes)) {
            let count = stat.changes_since_count;
            let plural = if count == 1 { "" } else { "s" };
            let _ = writeln!(
                out,
                "{}:{}:1: {LINT_CODE} Potentially outdated docstring: {count} code change{plural} in {} since last docstring change",
                analysis.path.display(),
                stat.unit.doc_range.start,
                stat.unit.qualified_name,
            );
        }
    }
    out
}
