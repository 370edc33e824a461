/// Renderer — evaluates a directive tree against a context and verbosity.

use crate::core::parser::{Ast, Node};
use crate::schema::template::Verbosity;
use crate::schema::value::{Context, Value};

/// Render a parsed tree against a context at the given verbosity.
///
/// Rendering never fails: a placeholder with no value in scope emits the
/// inline marker `{{MISSING: name}}` so partially populated contexts still
/// produce inspectable output, and a loop over a missing or non-list value
/// runs zero iterations. Output is byte-identical for identical inputs.
pub fn render(ast: &Ast, context: &Context, verbosity: Verbosity) -> String {
    let mut out = String::new();
    let mut scopes: Vec<&Context> = vec![context];
    render_nodes(&ast.nodes, &mut scopes, verbosity, &mut out);
    out
}

/// Innermost-scope-first lookup. Loop element keys shadow outer context keys.
fn lookup<'a>(scopes: &[&'a Context], name: &str) -> Option<&'a Value> {
    scopes.iter().rev().find_map(|scope| scope.get(name))
}

fn render_nodes(nodes: &[Node], scopes: &mut Vec<&Context>, verbosity: Verbosity, out: &mut String) {
    for node in nodes {
        match node {
            Node::Literal(text) => out.push_str(text),
            Node::Placeholder(name) => match lookup(scopes, name) {
                Some(value) => out.push_str(&value.to_string()),
                None => {
                    out.push_str("{{MISSING: ");
                    out.push_str(name);
                    out.push_str("}}");
                }
            },
            Node::Conditional { name, children } => {
                let truthy = lookup(scopes, name).is_some_and(Value::is_truthy);
                if truthy {
                    render_nodes(children, scopes, verbosity, out);
                }
            }
            Node::Loop { name, children } => {
                let items = lookup(scopes, name).and_then(Value::as_list).unwrap_or(&[]);
                for element in items {
                    scopes.push(element);
                    render_nodes(children, scopes, verbosity, out);
                    scopes.pop();
                }
            }
            Node::Verbosity { level, children } => {
                if *level == verbosity {
                    render_nodes(children, scopes, verbosity, out);
                }
            }
        }
    }
}
