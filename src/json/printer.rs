//! AST to canonical JSON.
//!
//! | node                          | JSON                                            |
//! |-------------------------------|-------------------------------------------------|
//! | `Bytes(0xAB)`                 | `{"bytes": "AB"}`                               |
//! | `Int(1)`                      | `{"int": "1"}`                                  |
//! | `String(x)`                   | `{"string": "x"}`                               |
//! | `Prim(name, annots, args)`    | `{"prim": name, "annots": [...], "args": [...]}` |
//! | `Sequence(elements)`          | `[...]`                                         |
//!
//! `annots` and `args` are omitted when empty.

use crate::ast::{Node, Prim};
use crate::error::MichelineError;
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::ser::PrettyFormatter;

/// Whitespace settings for [`print`]. The structure of the output never
/// depends on them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonFormat {
    /// Written at the start of every line after the first.
    pub prefix: String,
    /// Written once per nesting level. Empty together with `prefix` means
    /// compact output.
    pub indent: String,
}

impl JsonFormat {
    pub fn compact() -> Self {
        Self::default()
    }

    pub fn pretty(indent: &str) -> Self {
        Self {
            prefix: String::new(),
            indent: indent.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    fn is_compact(&self) -> bool {
        self.prefix.is_empty() && self.indent.is_empty()
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Node::Bytes { value, .. } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("bytes", value.strip_prefix("0x").unwrap_or(value))?;
                map.end()
            }
            Node::Int { value, .. } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("int", &value.to_string())?;
                map.end()
            }
            Node::String { value, .. } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("string", value)?;
                map.end()
            }
            Node::Prim(prim) => prim.serialize(serializer),
            Node::Sequence { elements, .. } => {
                let mut seq = serializer.serialize_seq(Some(elements.len()))?;
                for element in elements {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
        }
    }
}

impl Serialize for Prim {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = 1
            + usize::from(!self.annotations.is_empty())
            + usize::from(!self.arguments.is_empty());
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("prim", &self.prim)?;
        if !self.annotations.is_empty() {
            let annots: Vec<&str> = self.annotations.iter().map(|a| a.value.as_str()).collect();
            map.serialize_entry("annots", &annots)?;
        }
        if !self.arguments.is_empty() {
            map.serialize_entry("args", &self.arguments)?;
        }
        map.end()
    }
}

/// Prints `node` as canonical JSON bytes.
pub fn print(node: &Node, format: &JsonFormat) -> Result<Vec<u8>, MichelineError> {
    let mut out = Vec::new();
    if format.is_compact() {
        serde_json::to_writer(&mut out, node).map_err(MichelineError::Serialize)?;
        return Ok(out);
    }

    let formatter = PrettyFormatter::with_indent(format.indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    node.serialize(&mut serializer).map_err(MichelineError::Serialize)?;

    if format.prefix.is_empty() {
        return Ok(out);
    }
    // Newlines inside JSON strings are escaped, so every raw '\n' is layout.
    let mut prefixed = Vec::with_capacity(out.len());
    for byte in out {
        prefixed.push(byte);
        if byte == b'\n' {
            prefixed.extend_from_slice(format.prefix.as_bytes());
        }
    }
    Ok(prefixed)
}

/// Like [`print`], returning a `String`.
pub fn print_to_string(node: &Node, format: &JsonFormat) -> Result<String, MichelineError> {
    let bytes = print(node, format)?;
    String::from_utf8(bytes)
        .map_err(|err| MichelineError::Serialize(serde_json::Error::custom(err)))
}

/// Translates `node` into a `serde_json::Value`.
pub fn to_value(node: &Node) -> Result<serde_json::Value, MichelineError> {
    serde_json::to_value(node).map_err(MichelineError::Serialize)
}
