//! Python documented-unit extraction over tree-sitter.

use std::path::Path;

use docsweep_core::{DocsweepError, DocumentedUnit, LineRange, UnitKind};
use tracing::debug;
use tree_sitter::{Node, Parser};

/// What a definition is nested in, which decides function vs. method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Enclosing {
    Module,
    Class,
    Function,
}

/// Extract every documented unit from one revision of a Python file.
///
/// Units are returned in source order. The module unit is named after the
/// file stem; nested units are named by their dotted lexical path without
/// the module name (`Class.method`, `outer.inner`). `body_range` starts at
/// the `def`/`class` line, so decorators are not part of it.
///
/// # Errors
///
/// Returns [`DocsweepError::Parse`] if `content` is not valid Python.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use docsweep_core::UnitKind;
/// use docsweep_units::extract_units;
///
/// let source = "class Greeter:\n    \"\"\"Says hello.\"\"\"\n\n    def greet(self):\n        \"\"\"Greet.\"\"\"\n        return 'hi'\n";
/// let units = extract_units(Path::new("greeter.py"), source).unwrap();
/// assert_eq!(units.len(), 2);
/// assert_eq!(units[1].qualified_name, "Greeter.greet");
/// assert_eq!(units[1].kind, UnitKind::Method);
/// assert_eq!((units[1].body_range.start, units[1].body_range.end), (4, 6));
/// ```
pub fn extract_units(path: &Path, content: &str) -> Result<Vec<DocumentedUnit>, DocsweepError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| parse_error(path, 1, format!("failed to set language: {e}")))?;

    let tree = parser
        .parse(content, None)
        .ok_or_else(|| parse_error(path, 1, "parser produced no syntax tree".into()))?;
    let root = tree.root_node();

    if root.has_error() {
        let (line, message) = match first_error(root) {
            Some(node) if node.is_missing() => (
                node.start_position().row as u32 + 1,
                format!("missing `{}`", node.kind()),
            ),
            Some(node) => (node.start_position().row as u32 + 1, "invalid syntax".into()),
            None => (1, "invalid syntax".into()),
        };
        return Err(parse_error(path, line, message));
    }

    let source = content.as_bytes();
    let lines: Vec<&str> = content.lines().collect();
    let mut units = Vec::new();

    if let Some(doc_range) = docstring(root, source).and_then(line_range) {
        let module_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let last = trim_trailing_blank(&lines, 1, lines.len() as u32).max(doc_range.end);
        if let Some(body_range) = LineRange::new(1, last) {
            units.push(DocumentedUnit {
                qualified_name: module_name,
                kind: UnitKind::Module,
                doc_range,
                body_range,
            });
        }
    }

    let mut scope = Vec::new();
    collect(root, source, &lines, &mut scope, Enclosing::Module, &mut units);

    debug!(path = %path.display(), units = units.len(), "extracted documented units");
    Ok(units)
}

fn parse_error(path: &Path, line: u32, message: String) -> DocsweepError {
    DocsweepError::Parse {
        path: path.to_path_buf(),
        line,
        message,
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}

/// Visit the statements under `node`, descending through compound
/// statements (`if`, `try`, `with`, ...) until definitions are found.
fn collect(
    node: Node,
    source: &[u8],
    lines: &[&str],
    scope: &mut Vec<String>,
    enclosing: Enclosing,
    units: &mut Vec<DocumentedUnit>,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let definition = match child.kind() {
            "function_definition" | "class_definition" => child,
            "decorated_definition" => match child.child_by_field_name("definition") {
                Some(definition) => definition,
                None => continue,
            },
            _ => {
                collect(child, source, lines, scope, enclosing, units);
                continue;
            }
        };
        visit_definition(definition, source, lines, scope, enclosing, units);
    }
}

fn visit_definition(
    node: Node,
    source: &[u8],
    lines: &[&str],
    scope: &mut Vec<String>,
    enclosing: Enclosing,
    units: &mut Vec<DocumentedUnit>,
) {
    let Some(name) = node
        .child_by_field_name("name")
        .and_then(|name| name.utf8_text(source).ok())
    else {
        return;
    };
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };

    let is_class = node.kind() == "class_definition";
    let kind = match (is_class, enclosing) {
        (true, _) => UnitKind::Class,
        (false, Enclosing::Class) => UnitKind::Method,
        (false, _) => UnitKind::Function,
    };

    scope.push(name.to_string());

    if let Some(doc_range) = docstring(body, source).and_then(line_range) {
        let start = node.start_position().row as u32 + 1;
        let end = trim_trailing_blank(lines, start, end_line(node)).max(doc_range.end);
        if let Some(body_range) = LineRange::new(start, end) {
            units.push(DocumentedUnit {
                qualified_name: scope.join("."),
                kind,
                doc_range,
                body_range,
            });
        }
    }

    let inner = if is_class {
        Enclosing::Class
    } else {
        Enclosing::Function
    };
    collect(body, source, lines, scope, inner, units);

    scope.pop();
}

/// The docstring statement of a module or block: a plain string literal,
/// possibly parenthesized, as the first statement. Comments before it are
/// allowed.
fn docstring<'tree>(node: Node<'tree>, source: &[u8]) -> Option<Node<'tree>> {
    let mut cursor = node.walk();
    let first = node
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment")?;
    if first.kind() != "expression_statement" || first.named_child_count() != 1 {
        return None;
    }
    let mut expression = first.named_child(0)?;
    while expression.kind() == "parenthesized_expression" && expression.named_child_count() == 1 {
        expression = expression.named_child(0)?;
    }
    let is_doc = match expression.kind() {
        "string" => is_plain_string(expression, source),
        "concatenated_string" => {
            let mut cursor = expression.walk();
            let parts: Vec<Node> = expression.named_children(&mut cursor).collect();
            parts
                .iter()
                .filter(|part| part.kind() != "comment")
                .all(|part| part.kind() == "string" && is_plain_string(*part, source))
        }
        _ => false,
    };
    is_doc.then_some(first)
}

/// A string literal that is neither an f-string nor a bytes literal.
fn is_plain_string(node: Node, source: &[u8]) -> bool {
    let Ok(text) = node.utf8_text(source) else {
        return false;
    };
    let prefix = text
        .find(['"', '\''])
        .map_or("", |quote| &text[..quote])
        .to_ascii_lowercase();
    !prefix.contains('f') && !prefix.contains('b')
}

fn line_range(node: Node) -> Option<LineRange> {
    LineRange::new(node.start_position().row as u32 + 1, end_line(node))
}

/// Last line a node occupies, 1-indexed.
fn end_line(node: Node) -> u32 {
    let end = node.end_position();
    let start = node.start_position();
    if end.column == 0 && end.row > start.row {
        end.row as u32
    } else {
        end.row as u32 + 1
    }
}

/// Move `end` up past blank lines, never above `start`.
fn trim_trailing_blank(lines: &[&str], start: u32, mut end: u32) -> u32 {
    while end > start
        && lines
            .get(end as usize - 1)
            .map_or(true, |line| line.trim().is_empty())
    {
        end -= 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#""""Module doc."""

import os


class Parser:
    """Parse things."""

    def feed(self, data):
        """Feed data."""
        return data

    def undocumented(self):
        return 1


@decorator
def helper(x):
    '''Help.

    More text.
    '''

    def inner():
        """Inner."""
        pass

    return inner


x = 1
"#;

    fn summary(units: &[DocumentedUnit]) -> Vec<(String, UnitKind, (u32, u32), (u32, u32))> {
        units
            .iter()
            .map(|u| {
                (
                    u.qualified_name.clone(),
                    u.kind,
                    (u.doc_range.start, u.doc_range.end),
                    (u.body_range.start, u.body_range.end),
                )
            })
            .collect()
    }

    #[test]
    fn extracts_nested_units_in_source_order() {
        let units = extract_units(Path::new("pkg/parser_mod.py"), SAMPLE).unwrap();
        assert_eq!(
            summary(&units),
            vec![
                ("parser_mod".into(), UnitKind::Module, (1, 1), (1, 31)),
                ("Parser".into(), UnitKind::Class, (7, 7), (6, 14)),
                ("Parser.feed".into(), UnitKind::Method, (10, 10), (9, 11)),
                ("helper".into(), UnitKind::Function, (19, 22), (18, 28)),
                ("helper.inner".into(), UnitKind::Function, (25, 25), (24, 26)),
            ]
        );
        assert!(units.iter().all(|u| u.body_range.encloses(&u.doc_range)));
    }

    #[test]
    fn module_body_excludes_trailing_blank_lines() {
        let source = "\"\"\"Doc.\"\"\"\nx = 1\n\n\n";
        let units = extract_units(Path::new("m.py"), source).unwrap();
        assert_eq!(summary(&units), vec![("m".into(), UnitKind::Module, (1, 1), (1, 2))]);
    }

    #[test]
    fn comments_may_precede_docstring() {
        let source = "# -*- coding: utf-8 -*-\n\"\"\"Doc.\"\"\"\n\ndef f():\n    # note\n    \"doc\"\n    return 1\n";
        let units = extract_units(Path::new("c.py"), source).unwrap();
        assert_eq!(
            summary(&units),
            vec![
                ("c".into(), UnitKind::Module, (2, 2), (1, 7)),
                ("f".into(), UnitKind::Function, (6, 6), (4, 7)),
            ]
        );
    }

    #[test]
    fn non_docstring_first_statements_are_ignored() {
        let source = "\
def formatted():
    f\"\"\"Not a docstring {1}.\"\"\"

def raw_bytes():
    b\"not a docstring\"

def late():
    x = 1
    \"\"\"Too late.\"\"\"

def call():
    print(\"hello\")
";
        let units = extract_units(Path::new("n.py"), source).unwrap();
        assert!(units.is_empty(), "unexpected units: {units:?}");
    }

    #[test]
    fn raw_and_concatenated_strings_are_docstrings() {
        let source = "\
def raw():
    r\"\"\"Raw \\d docs.\"\"\"

def joined():
    (\"first \"
     \"second\")
";
        let units = extract_units(Path::new("s.py"), source).unwrap();
        assert_eq!(
            summary(&units),
            vec![
                ("raw".into(), UnitKind::Function, (2, 2), (1, 2)),
                ("joined".into(), UnitKind::Function, (5, 6), (4, 6)),
            ]
        );

        let source = "def joined():\n    \"first \" \"second\"\n    return 1\n";
        let units = extract_units(Path::new("s.py"), source).unwrap();
        assert_eq!(summary(&units), vec![("joined".into(), UnitKind::Function, (2, 2), (1, 3))]);
    }

    #[test]
    fn one_line_definition() {
        let units = extract_units(Path::new("o.py"), "def f(): \"doc\"\n").unwrap();
        assert_eq!(summary(&units), vec![("f".into(), UnitKind::Function, (1, 1), (1, 1))]);
    }

    #[test]
    fn async_and_conditional_definitions() {
        let source = "\
import sys

if sys.version_info >= (3, 8):
    async def fetch():
        \"\"\"Fetch.\"\"\"
        return 1
";
        let units = extract_units(Path::new("a.py"), source).unwrap();
        assert_eq!(summary(&units), vec![("fetch".into(), UnitKind::Function, (5, 5), (4, 6))]);
    }

    #[test]
    fn method_inner_function_is_a_function() {
        let source = "\
class A:
    def m(self):
        def helper():
            \"\"\"Help.\"\"\"
        return helper
";
        let units = extract_units(Path::new("a.py"), source).unwrap();
        assert_eq!(
            summary(&units),
            vec![("A.m.helper".into(), UnitKind::Function, (4, 4), (3, 4))]
        );
    }

    #[test]
    fn syntax_error_reports_line() {
        let source = "\"\"\"Doc.\"\"\"\n\ndef ok():\n    pass\n\ndef broken(:\n    pass\n";
        let err = extract_units(Path::new("broken.py"), source).unwrap_err();
        match err {
            DocsweepError::Parse { path, line, .. } => {
                assert_eq!(path, Path::new("broken.py"));
                assert!(line >= 6, "error reported on line {line}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn empty_file_has_no_units() {
        assert!(extract_units(Path::new("empty.py"), "").unwrap().is_empty());
    }
}
