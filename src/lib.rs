//! Parsing of Micheline notation and its lossless mapping to and from the
//! canonical JSON encoding used by Tezos RPCs.

pub mod api;
pub mod ast;
pub mod error;
pub mod json;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod utils;

pub use api::{from_json, micheline_of_json, parse, parse_file, parse_with_options, to_json};
pub use ast::{Annotation, AnnotationKind, Node, Position, Prim};
pub use error::MichelineError;
