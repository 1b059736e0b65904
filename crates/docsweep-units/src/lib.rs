//! Documented code unit extraction for docsweep.
//!
//! Parses one revision of a Python source file with tree-sitter and lists
//! every module, class, function, and method whose first statement is a
//! docstring, together with the line ranges of the docstring and of the
//! whole definition.

pub mod python;

pub use python::extract_units;
