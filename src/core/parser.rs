/// Directive parser — turns a raw template body into a directive tree.

use thiserror::Error;

use crate::schema::template::Verbosity;

#[derive(Debug, Error, PartialEq)]
pub enum SyntaxError {
    #[error("unclosed directive '{name}' opened on line {line}")]
    Unclosed { name: String, line: usize },
    #[error("close marker '{found}' on line {line} does not match open directive '{expected}'")]
    MismatchedClose {
        found: String,
        expected: String,
        line: usize,
    },
    #[error("close marker '{found}' on line {line} has no matching open directive")]
    UnexpectedClose { found: String, line: usize },
}

/// A node of a parsed template body.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, emitted as-is (whitespace and newlines preserved).
    Literal(String),
    /// Single value substitution: `{{name}}`.
    Placeholder(String),
    /// Children render iff `name` is truthy in scope: `{{#if name}}...{{/if}}`.
    Conditional { name: String, children: Vec<Node> },
    /// Children render once per element of the list `name` resolves to:
    /// `{{#name}}...{{/name}}`.
    Loop { name: String, children: Vec<Node> },
    /// Children render only when the active verbosity equals `level`:
    /// `[level]...[/level]`.
    Verbosity { level: Verbosity, children: Vec<Node> },
}

/// A parsed template body — a sequence of directive nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub nodes: Vec<Node>,
}

enum BlockKind {
    Conditional(String),
    Loop(String),
    Verbosity(Verbosity),
}

impl BlockKind {
    /// Opener name used in error messages.
    fn label(&self) -> String {
        match self {
            BlockKind::Conditional(name) => format!("{{{{#if {}}}}}", name),
            BlockKind::Loop(name) => format!("{{{{#{}}}}}", name),
            BlockKind::Verbosity(level) => format!("[{}]", level.as_str()),
        }
    }
}

struct BlockFrame {
    kind: BlockKind,
    line: usize,
    children: Vec<Node>,
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a template body into a directive tree. Pure function of its input.
///
/// Syntax:
/// - `{{name}}` → `Placeholder`
/// - `{{#if name}} ... {{/if}}` → `Conditional`
/// - `{{#name}} ... {{/name}}` → `Loop`
/// - `[concise] ... [/concise]` (likewise `detailed`, `expert`) → `Verbosity`
/// - Everything else → `Literal`
///
/// Directives nest; every opener must be closed at the same depth, and a
/// mismatched or missing close is a [`SyntaxError`]. A `{{...}}` marker whose
/// content is not a valid directive name (`[A-Za-z0-9_]+`) is not an error:
/// the marker falls through as literal text, so prose containing stray braces
/// stays renderable and a misspelled placeholder is visible verbatim in the
/// output. Bracketed text other than the three verbosity tags is literal,
/// which keeps markdown links and tables in bodies intact.
pub fn parse(body: &str) -> Result<Ast, SyntaxError> {
    let chars: Vec<char> = body.chars().collect();
    let len = chars.len();

    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<BlockFrame> = Vec::new();
    let mut literal_buf = String::new();
    let mut line = 1usize;
    let mut i = 0usize;

    macro_rules! sink {
        () => {
            match stack.last_mut() {
                Some(frame) => &mut frame.children,
                None => &mut root,
            }
        };
    }

    macro_rules! flush_literal {
        () => {
            if !literal_buf.is_empty() {
                let text = std::mem::take(&mut literal_buf);
                sink!().push(Node::Literal(text));
            }
        };
    }

    while i < len {
        if chars[i] == '{' && i + 1 < len && chars[i + 1] == '{' {
            // Locate the closing `}}` on the same line.
            let start = i + 2;
            let mut end = start;
            while end + 1 < len
                && !(chars[end] == '}' && chars[end + 1] == '}')
                && chars[end] != '\n'
            {
                end += 1;
            }
            let closed = end + 1 < len && chars[end] == '}' && chars[end + 1] == '}';
            if !closed {
                // Unterminated marker: fall through as literal.
                literal_buf.push_str("{{");
                i += 2;
                continue;
            }

            let content: String = chars[start..end].iter().collect();
            if let Some(rest) = content.strip_prefix('#') {
                if let Some(cond) = rest.strip_prefix("if ") {
                    let name = cond.trim();
                    if is_valid_name(name) {
                        flush_literal!();
                        stack.push(BlockFrame {
                            kind: BlockKind::Conditional(name.to_string()),
                            line,
                            children: Vec::new(),
                        });
                        i = end + 2;
                        continue;
                    }
                } else if rest != "if" && is_valid_name(rest) {
                    flush_literal!();
                    stack.push(BlockFrame {
                        kind: BlockKind::Loop(rest.to_string()),
                        line,
                        children: Vec::new(),
                    });
                    i = end + 2;
                    continue;
                }
            } else if let Some(close_name) = content.strip_prefix('/') {
                if is_valid_name(close_name) {
                    let found = format!("{{{{/{}}}}}", close_name);
                    flush_literal!();
                    let frame = match stack.pop() {
                        Some(frame) => frame,
                        None => return Err(SyntaxError::UnexpectedClose { found, line }),
                    };
                    let matches = match &frame.kind {
                        BlockKind::Conditional(_) => close_name == "if",
                        BlockKind::Loop(loop_name) => close_name == loop_name,
                        BlockKind::Verbosity(_) => false,
                    };
                    if !matches {
                        return Err(SyntaxError::MismatchedClose {
                            found,
                            expected: frame.kind.label(),
                            line,
                        });
                    }
                    let node = match frame.kind {
                        BlockKind::Conditional(name) => Node::Conditional {
                            name,
                            children: frame.children,
                        },
                        BlockKind::Loop(name) => Node::Loop {
                            name,
                            children: frame.children,
                        },
                        BlockKind::Verbosity(_) => unreachable!(),
                    };
                    sink!().push(node);
                    i = end + 2;
                    continue;
                }
            } else if is_valid_name(&content) {
                flush_literal!();
                sink!().push(Node::Placeholder(content));
                i = end + 2;
                continue;
            }

            // Not a recognizable directive: fall through as literal.
            literal_buf.push_str("{{");
            i += 2;
        } else if chars[i] == '[' {
            // Only the six exact verbosity tags are directives; any other
            // bracketed text is literal.
            let start = i + 1;
            let mut end = start;
            while end < len && chars[end] != ']' && chars[end] != '\n' && end - start <= 9 {
                end += 1;
            }
            if end < len && chars[end] == ']' {
                let content: String = chars[start..end].iter().collect();
                let (closing, level_str) = match content.strip_prefix('/') {
                    Some(rest) => (true, rest),
                    None => (false, content.as_str()),
                };
                if let Ok(level) = level_str.parse::<Verbosity>() {
                    if closing {
                        let found = format!("[/{}]", level.as_str());
                        flush_literal!();
                        let frame = match stack.pop() {
                            Some(frame) => frame,
                            None => return Err(SyntaxError::UnexpectedClose { found, line }),
                        };
                        match frame.kind {
                            BlockKind::Verbosity(open_level) if open_level == level => {
                                sink!().push(Node::Verbosity {
                                    level,
                                    children: frame.children,
                                });
                            }
                            _ => {
                                return Err(SyntaxError::MismatchedClose {
                                    found,
                                    expected: frame.kind.label(),
                                    line,
                                });
                            }
                        }
                    } else {
                        flush_literal!();
                        stack.push(BlockFrame {
                            kind: BlockKind::Verbosity(level),
                            line,
                            children: Vec::new(),
                        });
                    }
                    i = end + 1;
                    continue;
                }
            }
            literal_buf.push('[');
            i += 1;
        } else {
            if chars[i] == '\n' {
                line += 1;
            }
            literal_buf.push(chars[i]);
            i += 1;
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(SyntaxError::Unclosed {
            name: frame.kind.label(),
            line: frame.line,
        });
    }

    if !literal_buf.is_empty() {
        root.push(Node::Literal(literal_buf));
    }

    // An empty body is a single empty literal, not an empty tree.
    if root.is_empty() {
        root.push(Node::Literal(String::new()));
    }

    Ok(Ast { nodes: root })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_literal_only() {
        let ast = parse("All systems nominal.").unwrap();
        assert_eq!(
            ast.nodes,
            vec![Node::Literal("All systems nominal.".to_string())]
        );
    }

    #[test]
    fn parse_empty_body() {
        let ast = parse("").unwrap();
        assert_eq!(ast.nodes, vec![Node::Literal(String::new())]);
    }

    #[test]
    fn parse_placeholder() {
        let ast = parse("Hello {{name}}!").unwrap();
        assert_eq!(
            ast.nodes,
            vec![
                Node::Literal("Hello ".to_string()),
                Node::Placeholder("name".to_string()),
                Node::Literal("!".to_string()),
            ]
        );
    }

    #[test]
    fn parse_conditional() {
        let ast = parse("A{{#if warn}}B{{/if}}C").unwrap();
        assert_eq!(ast.nodes.len(), 3);
        assert_eq!(
            ast.nodes[1],
            Node::Conditional {
                name: "warn".to_string(),
                children: vec![Node::Literal("B".to_string())],
            }
        );
    }

    #[test]
    fn parse_loop() {
        let ast = parse("{{#items}}[{{n}}]{{/items}}").unwrap();
        assert_eq!(
            ast.nodes,
            vec![Node::Loop {
                name: "items".to_string(),
                children: vec![
                    Node::Literal("[".to_string()),
                    Node::Placeholder("n".to_string()),
                    Node::Literal("]".to_string()),
                ],
            }]
        );
    }

    #[test]
    fn parse_verbosity_sections() {
        let ast = parse("X[concise]Y[/concise][detailed]Z[/detailed]").unwrap();
        assert_eq!(ast.nodes.len(), 3);
        assert_eq!(
            ast.nodes[1],
            Node::Verbosity {
                level: Verbosity::Concise,
                children: vec![Node::Literal("Y".to_string())],
            }
        );
        assert_eq!(
            ast.nodes[2],
            Node::Verbosity {
                level: Verbosity::Detailed,
                children: vec![Node::Literal("Z".to_string())],
            }
        );
    }

    #[test]
    fn parse_nested_directives() {
        let ast = parse("{{#if ok}}{{#rows}}{{id}}\n{{/rows}}{{/if}}").unwrap();
        match &ast.nodes[0] {
            Node::Conditional { name, children } => {
                assert_eq!(name, "ok");
                assert!(matches!(&children[0], Node::Loop { name, .. } if name == "rows"));
            }
            other => panic!("expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn parse_preserves_whitespace_and_newlines() {
        let ast = parse("line one\n  line two\t\n").unwrap();
        assert_eq!(
            ast.nodes,
            vec![Node::Literal("line one\n  line two\t\n".to_string())]
        );
    }

    #[test]
    fn parse_unclosed_conditional_error() {
        let err = parse("{{#if a}}text").unwrap_err();
        assert!(matches!(err, SyntaxError::Unclosed { .. }));
    }

    #[test]
    fn parse_unclosed_loop_reports_name_and_line() {
        let err = parse("first line\n{{#rows}}never closed").unwrap_err();
        match err {
            SyntaxError::Unclosed { name, line } => {
                assert_eq!(name, "{{#rows}}");
                assert_eq!(line, 2);
            }
            other => panic!("expected Unclosed, got {:?}", other),
        }
    }

    #[test]
    fn parse_mismatched_close_error() {
        let err = parse("{{#rows}}text{{/if}}").unwrap_err();
        assert!(matches!(err, SyntaxError::MismatchedClose { .. }));
    }

    #[test]
    fn parse_unexpected_close_error() {
        let err = parse("text{{/if}}").unwrap_err();
        assert!(matches!(err, SyntaxError::UnexpectedClose { .. }));
    }

    #[test]
    fn parse_verbosity_mismatch_error() {
        let err = parse("[concise]text[/detailed]").unwrap_err();
        assert!(matches!(err, SyntaxError::MismatchedClose { .. }));
    }

    #[test]
    fn parse_verbosity_close_across_brace_block_error() {
        // The open `{{#if a}}` frame is what the close collides with, so
        // the error names the mismatch rather than a missing opener.
        let err = parse("{{#if a}}[/concise]{{/if}}").unwrap_err();
        match err {
            SyntaxError::MismatchedClose { found, expected, .. } => {
                assert_eq!(found, "[/concise]");
                assert_eq!(expected, "{{#if a}}");
            }
            other => panic!("expected MismatchedClose, got {:?}", other),
        }
    }

    #[test]
    fn invalid_placeholder_chars_fall_through_as_literal() {
        let ast = parse("see {{bad-name!}} here").unwrap();
        assert_eq!(
            ast.nodes,
            vec![Node::Literal("see {{bad-name!}} here".to_string())]
        );
    }

    #[test]
    fn unterminated_marker_falls_through_as_literal() {
        let ast = parse("oops {{name").unwrap();
        assert_eq!(ast.nodes, vec![Node::Literal("oops {{name".to_string())]);
    }

    #[test]
    fn non_verbosity_brackets_are_literal() {
        let ast = parse("[link](https://example.com) and [NOTE]").unwrap();
        assert_eq!(
            ast.nodes,
            vec![Node::Literal(
                "[link](https://example.com) and [NOTE]".to_string()
            )]
        );
    }

    #[test]
    fn empty_braces_are_literal() {
        let ast = parse("a {{}} b").unwrap();
        assert_eq!(ast.nodes, vec![Node::Literal("a {{}} b".to_string())]);
    }

    #[test]
    fn loop_named_if_is_parsed_as_conditional_keyword() {
        // `{{#if}}` without a condition name is not a directive at all.
        let ast = parse("x{{#if}}y").unwrap();
        assert_eq!(ast.nodes, vec![Node::Literal("x{{#if}}y".to_string())]);
    }
}
