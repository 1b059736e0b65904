//! Line-range history tracking and docstring staleness analysis.
//!
//! [`tracker::RangeTracker`] follows a line range of the newest revision of
//! a file backwards through its history using only pairwise diffs.
//! [`analyzer::Analyzer`] runs it over the docstring and body of every
//! documented unit and produces one [`UnitStatistic`](docsweep_core::UnitStatistic)
//! per unit.

pub mod analyzer;
pub mod tracker;

pub use analyzer::{analyze_file, Analyzer, FileAnalysis};
pub use tracker::{RangeHistory, RangeTracker, WalkEnd, WalkLimit};
