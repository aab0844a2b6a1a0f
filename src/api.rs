use crate::ast::Node;
use crate::error::MichelineError;
use crate::json::{self, JsonFormat};
use crate::parser::{ParseOptions, Parser};
use crate::printer::to_notation;
use log::debug;
use std::path::Path;

/// Parses notation text into a single node.
///
/// # Errors
/// Returns a lexical or syntax error carrying the offending span.
pub fn parse(source: &str) -> Result<Node, MichelineError> {
    parse_with_options(source, ParseOptions::default())
}

/// Parses notation text with explicit [`ParseOptions`].
///
/// # Errors
/// Returns a lexical or syntax error, or `NestingTooDeep` once
/// `options.max_depth` is exceeded.
pub fn parse_with_options(source: &str, options: ParseOptions) -> Result<Node, MichelineError> {
    debug!(
        "parsing {} ({} bytes, max depth {})",
        options.source_name,
        source.len(),
        options.max_depth
    );
    Parser::with_options(source, options).parse()
}

/// Reads and parses a notation file. The path is used as the source name in
/// diagnostics.
///
/// # Errors
/// Returns `MichelineError::Io` if the file cannot be read, otherwise the
/// same errors as [`parse`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<Node, MichelineError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| MichelineError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let options = ParseOptions {
        source_name: path.display().to_string(),
        ..ParseOptions::default()
    };
    parse_with_options(&source, options)
}

/// Converts notation text to canonical JSON.
///
/// # Errors
/// Returns any parse error, or `MichelineError::Serialize` if emitting fails.
pub fn to_json(source: &str, format: &JsonFormat) -> Result<String, MichelineError> {
    let node = parse(source)?;
    let out = json::print_to_string(&node, format)?;
    debug!("converted {} bytes of notation to {} bytes of JSON", source.len(), out.len());
    Ok(out)
}

/// Converts raw canonical JSON bytes to a node.
///
/// # Errors
/// Returns `JsonError::Syntax` for malformed JSON, or a structural error
/// naming the offending path.
pub fn from_json(bytes: &[u8]) -> Result<Node, MichelineError> {
    let node = json::read_slice(bytes)?;
    debug!("read a {} node from {} bytes of JSON", node.kind_name(), bytes.len());
    Ok(node)
}

/// Converts raw canonical JSON bytes (such as a contract's `code` or
/// `storage` field) to notation text.
///
/// # Errors
/// Same as [`from_json`].
pub fn micheline_of_json(bytes: &[u8]) -> Result<String, MichelineError> {
    from_json(bytes).map(|node| to_notation(&node))
}
