//! Renders an AST back to notation text.
//!
//! A primitive used as an argument is parenthesised whenever it carries
//! annotations or arguments of its own, so that parsing the output yields a
//! structurally equal tree.

use crate::ast::{Node, Prim};
use std::fmt::{self, Write};

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, self, false)
    }
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_prim(f, self, false)
    }
}

/// Renders `node` as notation text.
pub fn to_notation(node: &Node) -> String {
    node.to_string()
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &Node, as_argument: bool) -> fmt::Result {
    match node {
        Node::Bytes { value, .. } => f.write_str(value),
        Node::Int { value, .. } => write!(f, "{value}"),
        Node::String { value, .. } => write_string(f, value),
        Node::Prim(prim) => write_prim(f, prim, as_argument),
        Node::Sequence { elements, .. } => {
            if elements.is_empty() {
                return f.write_str("{}");
            }
            f.write_str("{ ")?;
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ; ")?;
                }
                write_node(f, element, false)?;
            }
            f.write_str(" }")
        }
    }
}

fn write_prim(f: &mut fmt::Formatter<'_>, prim: &Prim, as_argument: bool) -> fmt::Result {
    let wrap = as_argument && !(prim.annotations.is_empty() && prim.arguments.is_empty());
    if wrap {
        f.write_char('(')?;
    }
    f.write_str(&prim.prim)?;
    for annotation in &prim.annotations {
        write!(f, " {}", annotation.value)?;
    }
    for argument in &prim.arguments {
        f.write_char(' ')?;
        write_node(f, argument, true)?;
    }
    if wrap {
        f.write_char(')')?;
    }
    Ok(())
}

fn write_string(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\u{8}' => f.write_str("\\b")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}
