use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum MichelineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lexer(#[from] LexerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Json(#[from] JsonError),

    #[error("Failed to read {path}")]
    #[diagnostic(code(io::read))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize JSON")]
    #[diagnostic(code(json::serialize))]
    Serialize(#[source] serde_json::Error),
}

/// Errors raised while turning notation text into tokens.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum LexerError {
    #[error("Unexpected character `{found}`")]
    #[diagnostic(
        code(lexer::unexpected_character),
        help("Only literals, identifiers, annotations, `{{`, `}}`, `(`, `)` and `;` are allowed.")
    )]
    UnexpectedCharacter {
        #[source_code]
        src: NamedSource<String>,
        #[label("not recognized")]
        span: SourceSpan,
        found: char,
    },

    #[error("Unterminated string literal")]
    #[diagnostic(
        code(lexer::unterminated_string),
        help("Close the string with a double quote.")
    )]
    UnterminatedString {
        #[source_code]
        src: NamedSource<String>,
        #[label("string starts here")]
        span: SourceSpan,
    },

    #[error("Unterminated block comment")]
    #[diagnostic(code(lexer::unterminated_comment), help("Close the comment with `*/`."))]
    UnterminatedComment {
        #[source_code]
        src: NamedSource<String>,
        #[label("comment starts here")]
        span: SourceSpan,
    },

    #[error("Invalid escape sequence `\\{found}`")]
    #[diagnostic(
        code(lexer::invalid_escape),
        help("Supported escapes are \\\", \\\\, \\n, \\t, \\r and \\b.")
    )]
    InvalidEscape {
        #[source_code]
        src: NamedSource<String>,
        #[label("unknown escape")]
        span: SourceSpan,
        found: char,
    },

    #[error("Invalid bytes: {value}")]
    #[diagnostic(
        code(lexer::invalid_bytes),
        help("Byte literals are `0x` followed by a non-empty, even number of hex digits.")
    )]
    InvalidBytes {
        #[source_code]
        src: NamedSource<String>,
        #[label("malformed byte literal")]
        span: SourceSpan,
        value: String,
    },

    #[error("Invalid number: {value}")]
    #[diagnostic(code(lexer::invalid_int))]
    InvalidInt {
        #[source_code]
        src: NamedSource<String>,
        #[label("not a decimal integer")]
        span: SourceSpan,
        value: String,
    },

    #[error("Unexpected annotation: ({value})")]
    #[diagnostic(
        code(lexer::invalid_annotation),
        help("Annotations start with `:`, `@` or `%`.")
    )]
    InvalidAnnotation {
        #[source_code]
        src: NamedSource<String>,
        #[label("unknown annotation prefix")]
        span: SourceSpan,
        value: String,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParserError {
    #[error("Expected {expected}, but received {found}")]
    #[diagnostic(
        code(parser::unexpected_token),
        help("The parser found a token it did not expect in this position.")
    )]
    UnexpectedToken {
        #[source_code]
        src: NamedSource<String>,
        #[label("Expected {expected}, but found this")]
        span: SourceSpan,
        found: String,
        expected: String,
    },

    #[error("Unexpected end of input, expected {expected}")]
    #[diagnostic(
        code(parser::unexpected_eof),
        help("The input ended unexpectedly. The parser expected more tokens.")
    )]
    UnexpectedEof {
        #[source_code]
        src: NamedSource<String>,
        #[label("Input ended here")]
        span: SourceSpan,
        expected: String,
    },

    #[error("Annotation after argument of `{prim}`")]
    #[diagnostic(
        code(parser::annotation_after_argument),
        help("Annotations must immediately follow the primitive name, before any argument.")
    )]
    AnnotationAfterArgument {
        #[source_code]
        src: NamedSource<String>,
        #[label("misplaced annotation")]
        span: SourceSpan,
        prim: String,
    },

    #[error("Trailing separator in sequence")]
    #[diagnostic(
        code(parser::trailing_separator),
        help("`;` separates sequence elements and may not follow the last one.")
    )]
    TrailingSeparator {
        #[source_code]
        src: NamedSource<String>,
        #[label("remove this `;`")]
        span: SourceSpan,
    },

    #[error("Nesting too deep (limit is {limit})")]
    #[diagnostic(code(parser::nesting_too_deep))]
    NestingTooDeep {
        #[source_code]
        src: NamedSource<String>,
        #[label("limit exceeded here")]
        span: SourceSpan,
        limit: usize,
    },
}

/// Shape violations found while reading canonical JSON. `path` locates the
/// offending value, e.g. `$.args[1].int`.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum JsonError {
    #[error("Invalid JSON: {message}")]
    #[diagnostic(code(json::syntax))]
    Syntax { message: String },

    #[error("{path}: object has none of the keys `bytes`, `int`, `string`, `prim`")]
    #[diagnostic(code(json::missing_node_key))]
    MissingNodeKey { path: String },

    #[error("{path}: object has more than one of the keys {keys}")]
    #[diagnostic(code(json::ambiguous_node_key))]
    AmbiguousNodeKey { path: String, keys: String },

    #[error("{path}: unexpected key `{key}`")]
    #[diagnostic(code(json::unexpected_key))]
    UnexpectedKey { path: String, key: String },

    #[error("{path}: expected a string")]
    #[diagnostic(code(json::expected_string))]
    ExpectedString { path: String },

    #[error("{path}: expected an array")]
    #[diagnostic(code(json::expected_array))]
    ExpectedArray { path: String },

    #[error("{path}: expected an object or an array, found {found}")]
    #[diagnostic(code(json::unexpected_value))]
    UnexpectedValue { path: String, found: String },

    #[error("{path}: invalid bytes ({value})")]
    #[diagnostic(
        code(json::invalid_bytes),
        help("`bytes` holds a non-empty, even number of hex digits without a `0x` prefix.")
    )]
    InvalidBytes { path: String, value: String },

    #[error("{path}: invalid number ({value})")]
    #[diagnostic(code(json::invalid_int))]
    InvalidInt { path: String, value: String },

    #[error("{path}: invalid primitive name ({value})")]
    #[diagnostic(code(json::invalid_prim))]
    InvalidPrim { path: String, value: String },

    #[error("{path}: invalid annotation ({value})")]
    #[diagnostic(code(json::invalid_annotation))]
    InvalidAnnotation { path: String, value: String },

    #[error("{path}: nesting too deep (limit is {limit})")]
    #[diagnostic(code(json::nesting_too_deep))]
    NestingTooDeep { path: String, limit: usize },
}
