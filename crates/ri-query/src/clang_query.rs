use ri_core::{normalize_path, FileContainer, SourceLocation, SourceRange, SourceRangesContainer};
use ri_parser::{CompilerInvocation, ParserRegistry};
use tree_sitter::{Node, Parser};

use crate::error::QueryError;
use crate::matcher::{parse_matcher_expression, Evaluator, Matcher};
use crate::messages::SourceRangesAndDiagnosticsForQueryMessage;

/// Runs matcher queries over single files.
///
/// Only the main file is searched; includes are not expanded.
pub struct ClangQuery {
    parser: Parser,
}

impl ClangQuery {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Parse `query` and run it over `file`. A malformed query yields
    /// diagnostics and no ranges.
    #[tracing::instrument(skip_all, fields(file = %file.file_path))]
    pub fn find_locations(
        &mut self,
        file: &FileContainer,
        query: &str,
    ) -> Result<SourceRangesAndDiagnosticsForQueryMessage, QueryError> {
        match parse_matcher_expression(query) {
            Ok(matcher) => Ok(SourceRangesAndDiagnosticsForQueryMessage {
                source_ranges: self.run(&matcher, file)?,
                diagnostics: Vec::new(),
            }),
            Err(diagnostics) => {
                tracing::debug!(errors = diagnostics.len(), "query rejected");
                Ok(SourceRangesAndDiagnosticsForQueryMessage {
                    source_ranges: SourceRangesContainer::default(),
                    diagnostics,
                })
            }
        }
    }

    /// Run an already parsed matcher over `file`.
    pub fn run(
        &mut self,
        matcher: &Matcher,
        file: &FileContainer,
    ) -> Result<SourceRangesContainer, QueryError> {
        let path = normalize_path(&file.file_path);
        let language = CompilerInvocation::parse(&file.arguments, None)?.language_for(&path);
        self.parser
            .set_language(&ParserRegistry::grammar(language))
            .map_err(|e| QueryError::ParseFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        let tree = self
            .parser
            .parse(&file.content, None)
            .ok_or_else(|| QueryError::ParseFailed {
                path: path.clone(),
                reason: "parser returned no tree".to_string(),
            })?;

        let mut container = SourceRangesContainer::default();
        container.insert_file_path(&path);
        for node in Evaluator::new(&file.content).find_all(matcher, tree.root_node()) {
            let range = reported_range(node);
            let text = spanned_lines(&file.content, range);
            container.push(&path, range, text);
        }
        tracing::debug!(matches = container.ranges.len(), "query finished");
        Ok(container)
    }
}

impl Default for ClangQuery {
    fn default() -> Self {
        Self::new()
    }
}

fn location(point: tree_sitter::Point, offset: usize) -> SourceLocation {
    SourceLocation::new(point.row as u32 + 1, point.column as u32 + 1, offset as u32)
}

/// The node's range without a terminating `;`.
fn reported_range(node: Node<'_>) -> SourceRange {
    let start = location(node.start_position(), node.start_byte());
    let end = match node.child(node.child_count().saturating_sub(1)) {
        Some(last) if last.kind() == ";" && node.child_count() > 1 => {
            location(last.start_position(), last.start_byte())
        }
        _ => location(node.end_position(), node.end_byte()),
    };
    SourceRange::new(start, end)
}

/// The full lines `range` touches, without the final line break.
fn spanned_lines(content: &str, range: SourceRange) -> String {
    let start = (range.start.offset as usize).min(content.len());
    let end = (range.end.offset as usize).clamp(start, content.len());
    let line_start = content[..start].rfind('\n').map_or(0, |pos| pos + 1);
    let line_end = content[end..].find('\n').map_or(content.len(), |pos| end + pos);
    content[line_start..line_end].trim_end_matches('\r').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;

    fn file(path: &str, content: &str) -> FileContainer {
        FileContainer::new(path, content)
    }

    #[test]
    fn ranges_carry_lines_and_positions() {
        let source = "int f();\n\nint  g(int a) {\n  return a;\n}\n";
        let result = ClangQuery::new()
            .find_locations(&file("/src/a.cpp", source), "functionDecl(hasName(\"g\"))")
            .unwrap();

        assert!(result.diagnostics.is_empty());
        let ranges = &result.source_ranges.ranges;
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].range.start, SourceLocation::new(3, 1, 10));
        assert_eq!(ranges[0].range.end.line, 5);
        assert_eq!(ranges[0].range.end.column, 2);
        assert_eq!(ranges[0].text, "int  g(int a) {\n  return a;\n}");
        assert_eq!(result.source_ranges.path_of(&ranges[0]), Some("/src/a.cpp"));
    }

    #[test]
    fn declaration_range_stops_before_semicolon() {
        let result = ClangQuery::new()
            .find_locations(&file("/src/a.c", "int value = 1;\n"), "varDecl()")
            .unwrap();
        let range = result.source_ranges.ranges[0].range;
        assert_eq!(range.start.column, 1);
        assert_eq!(range.end.column, 14);
    }

    #[test]
    fn malformed_query_has_diagnostics_and_no_ranges() {
        let result = ClangQuery::new()
            .find_locations(&file("/src/a.cpp", "int f();\n"), "functionDecl(")
            .unwrap();
        assert!(result.source_ranges.is_empty());
        assert_eq!(result.diagnostics[0].message.error_type, ErrorType::ParserNoCloseParen);
    }

    #[test]
    fn language_switch_selects_grammar() {
        let source = "class Widget { int size; };\n";
        let as_cxx = file("/src/widget.h", source).with_arguments(vec!["-x".into(), "c++".into()]);
        let result = ClangQuery::new()
            .find_locations(&as_cxx, "cxxRecordDecl(hasName(\"Widget\"))")
            .unwrap();
        assert_eq!(result.source_ranges.ranges.len(), 1);
    }

    #[test]
    fn spanned_lines_clamp() {
        let content = "a\nbc\nd";
        let range = SourceRange::new(SourceLocation::new(2, 1, 2), SourceLocation::new(2, 3, 4));
        assert_eq!(spanned_lines(content, range), "bc");
        let past = SourceRange::new(SourceLocation::new(3, 1, 5), SourceLocation::new(9, 9, 99));
        assert_eq!(spanned_lines(content, past), "d");
    }
}
