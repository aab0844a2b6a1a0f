//! Canonical JSON back to an AST, validating the shape on the way.
//!
//! Nodes read from JSON carry default positions since JSON has no source
//! offsets.

use crate::ast::{Annotation, AnnotationKind, Node, Position, Prim};
use crate::error::{JsonError, MichelineError};
use crate::lexer::is_annotation_char;
use crate::parser::DEFAULT_MAX_DEPTH;
use log::trace;
use num_bigint::BigInt;
use serde::de::{Deserialize, Deserializer, Error as _};
use serde_json::{Map, Value};

const NODE_KEYS: [&str; 4] = ["bytes", "int", "string", "prim"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    pub max_depth: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Reads a node from an already decoded JSON value.
pub fn read(value: &Value) -> Result<Node, MichelineError> {
    read_with_options(value, ReaderOptions::default())
}

pub fn read_with_options(value: &Value, options: ReaderOptions) -> Result<Node, MichelineError> {
    let reader = Reader {
        max_depth: options.max_depth,
    };
    Ok(reader.read_node(value, "$", 1)?)
}

/// Decodes raw JSON bytes and reads a node from them.
pub fn read_slice(bytes: &[u8]) -> Result<Node, MichelineError> {
    read_slice_with_options(bytes, ReaderOptions::default())
}

/// Decodes raw JSON bytes under `options.max_depth`.
///
/// serde_json's own recursion limit is lifted; instead the raw bytes are
/// checked against the node limit before anything is decoded.
pub fn read_slice_with_options(
    bytes: &[u8],
    options: ReaderOptions,
) -> Result<Node, MichelineError> {
    // A node at depth d sits inside at most 2d containers: a prim object and
    // its `args` array per level.
    if exceeds_container_depth(bytes, options.max_depth.saturating_mul(2)) {
        return Err(JsonError::NestingTooDeep {
            path: "$".to_string(),
            limit: options.max_depth,
        }
        .into());
    }

    let syntax = |err: serde_json::Error| JsonError::Syntax {
        message: err.to_string(),
    };
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    deserializer.disable_recursion_limit();
    let value = Value::deserialize(&mut deserializer).map_err(syntax)?;
    deserializer.end().map_err(syntax)?;
    read_with_options(&value, options)
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        read(&value).map_err(D::Error::custom)
    }
}

struct Reader {
    max_depth: usize,
}

impl Reader {
    fn read_node(&self, value: &Value, path: &str, depth: usize) -> Result<Node, JsonError> {
        if depth > self.max_depth {
            return Err(JsonError::NestingTooDeep {
                path: path.to_string(),
                limit: self.max_depth,
            });
        }

        match value {
            Value::Array(items) => {
                let elements = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.read_node(item, &format!("{path}[{i}]"), depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Node::Sequence {
                    position: Position::default(),
                    elements,
                })
            }
            Value::Object(object) => self.read_object(object, path, depth),
            other => Err(JsonError::UnexpectedValue {
                path: path.to_string(),
                found: value_type(other).to_string(),
            }),
        }
    }

    fn read_object(
        &self,
        object: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> Result<Node, JsonError> {
        let present: Vec<&str> = NODE_KEYS
            .into_iter()
            .filter(|key| object.contains_key(*key))
            .collect();
        let key = match present.as_slice() {
            [] => {
                return Err(JsonError::MissingNodeKey {
                    path: path.to_string(),
                })
            }
            [key] => *key,
            keys => {
                return Err(JsonError::AmbiguousNodeKey {
                    path: path.to_string(),
                    keys: keys
                        .iter()
                        .map(|k| format!("`{k}`"))
                        .collect::<Vec<_>>()
                        .join(", "),
                })
            }
        };

        let is_prim = key == "prim";
        let allowed = |k: &str| k == key || (is_prim && (k == "annots" || k == "args"));
        if let Some(extra) = object.keys().find(|k| !allowed(k.as_str())) {
            return Err(JsonError::UnexpectedKey {
                path: path.to_string(),
                key: extra.clone(),
            });
        }

        let key_path = format!("{path}.{key}");
        let position = Position::default();
        match key {
            "bytes" => {
                let digits = expect_str(&object[key], &key_path)?;
                if !is_hex(digits) {
                    return Err(JsonError::InvalidBytes {
                        path: key_path,
                        value: digits.to_string(),
                    });
                }
                Ok(Node::Bytes {
                    position,
                    value: format!("0x{digits}"),
                })
            }
            "int" => {
                let text = expect_str(&object[key], &key_path)?;
                let value = parse_int(text).ok_or_else(|| JsonError::InvalidInt {
                    path: key_path.clone(),
                    value: text.to_string(),
                })?;
                Ok(Node::Int { position, value })
            }
            "string" => Ok(Node::String {
                position,
                value: expect_str(&object[key], &key_path)?.to_string(),
            }),
            _ => self.read_prim(object, path, depth).map(Node::Prim),
        }
    }

    fn read_prim(
        &self,
        object: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> Result<Prim, JsonError> {
        let prim_path = format!("{path}.prim");
        let name = expect_str(&object["prim"], &prim_path)?;
        if !is_identifier(name) {
            return Err(JsonError::InvalidPrim {
                path: prim_path,
                value: name.to_string(),
            });
        }
        trace!("[Reading] Prim ({name}) at {path}");

        let mut annotations = Vec::new();
        if let Some(annots) = object.get("annots") {
            let annots_path = format!("{path}.annots");
            for (i, annot) in expect_array(annots, &annots_path)?.iter().enumerate() {
                let annot_path = format!("{annots_path}[{i}]");
                let value = expect_str(annot, &annot_path)?;
                let kind = AnnotationKind::from_annotation(value)
                    .filter(|_| value.chars().skip(1).all(is_annotation_char));
                let Some(kind) = kind else {
                    return Err(JsonError::InvalidAnnotation {
                        path: annot_path,
                        value: value.to_string(),
                    });
                };
                annotations.push(Annotation {
                    position: Position::default(),
                    kind,
                    value: value.to_string(),
                });
            }
        }

        let mut arguments = Vec::new();
        if let Some(args) = object.get("args") {
            let args_path = format!("{path}.args");
            for (i, arg) in expect_array(args, &args_path)?.iter().enumerate() {
                arguments.push(self.read_node(arg, &format!("{args_path}[{i}]"), depth + 1)?);
            }
        }

        Ok(Prim {
            position: Position::default(),
            prim: name.to_string(),
            annotations,
            arguments,
        })
    }
}

fn expect_str<'v>(value: &'v Value, path: &str) -> Result<&'v str, JsonError> {
    value.as_str().ok_or_else(|| JsonError::ExpectedString {
        path: path.to_string(),
    })
}

fn expect_array<'v>(value: &'v Value, path: &str) -> Result<&'v [Value], JsonError> {
    value.as_array().map(Vec::as_slice).ok_or_else(|| JsonError::ExpectedArray {
        path: path.to_string(),
    })
}

fn is_hex(digits: &str) -> bool {
    !digits.is_empty() && digits.len() % 2 == 0 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Accepts canonical decimals only: `0` or `-?[1-9][0-9]*`. Anything else
/// would print back differently.
fn parse_int(text: &str) -> Option<BigInt> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let canonical = match digits.as_bytes() {
        [] => false,
        [b'0'] => digits.len() == text.len(),
        [first, rest @ ..] => {
            matches!(first, b'1'..=b'9') && rest.iter().all(u8::is_ascii_digit)
        }
    };
    if !canonical {
        return None;
    }
    text.parse().ok()
}

/// Whether any point of `bytes` is nested in more than `limit` arrays or
/// objects. Brackets inside strings are skipped.
fn exceeds_container_depth(bytes: &[u8], limit: usize) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for &byte in bytes {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
