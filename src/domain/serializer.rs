//! Serializer: renders nodes back into script text.
//!
//! Blocks put every child on its own line, one tab deeper than the block.
//! Anonymous nodes drop the `name <op>` prefix. Output depends only on the
//! forest, never on hash order or the source files.

use std::fmt;

use crate::domain::entities::{Define, Forest, Node, Value};

pub const INDENT: &str = "\t";

/// Rendering switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Write `@name = value` lines for the define table before the nodes.
    pub emit_defines: bool,
}

/// Render a single node without a trailing newline.
pub fn render_node(node: &Node) -> String {
    node.to_string()
}

/// Render a forest, one top-level statement per line.
pub fn render_forest(forest: &Forest, options: RenderOptions) -> String {
    let mut out = String::new();
    if options.emit_defines {
        for define in &forest.defines {
            out.push_str(&define.to_string());
            out.push('\n');
        }
    }
    for root in &forest.roots {
        out.push_str(&render_node(root));
        out.push('\n');
    }
    out
}

struct Indented<'a> {
    node: &'a Node,
    depth: usize,
}

impl Indented<'_> {
    fn indent(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            f.write_str(INDENT)?;
        }
        Ok(())
    }
}

impl fmt::Display for Indented<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.indent(f)?;
        let name = self.node.name();
        match (&self.node.value, name) {
            (Value::Number { op, value }, Some(name)) => write!(f, "{name} {op} {value}"),
            (Value::Number { value, .. }, None) => write!(f, "{value}"),
            (Value::Text(text), Some(name)) => write!(f, "{name} = {text}"),
            (Value::Text(text), None) => f.write_str(text),
            (Value::Block(children), name) => {
                match name {
                    Some(name) => writeln!(f, "{name} = {{")?,
                    None => writeln!(f, "{{")?,
                }
                for child in children {
                    writeln!(
                        f,
                        "{}",
                        Indented {
                            node: child,
                            depth: self.depth + 1,
                        }
                    )?;
                }
                self.indent(f)?;
                f.write_str("}")
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let top = Indented {
            node: self,
            depth: 0,
        };
        fmt::Display::fmt(&top, f)
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} = {}", self.name, self.value)
    }
}
