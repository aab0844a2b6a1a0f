use crate::ast::*;
use crate::error::{LexerError, MichelineError, ParserError};
use crate::lexer::{Scanner, Token, TokenKind};
use log::trace;
use num_bigint::BigInt;

/// Default bound on how deeply nodes may nest before parsing or reading fails.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Errors unwind boxed, so every nesting level only carries a pointer for them.
type ParseResult<T> = Result<T, Box<MichelineError>>;

/// Settings for a single parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Name shown in diagnostics.
    pub source_name: String,
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            source_name: "input.tz".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A recursive descent parser over a single token of lookahead.
///
/// One parser handles one buffer: [`Parser::parse`] consumes it and returns
/// exactly one node.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    token: Token,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source_text: &'a str) -> Self {
        Self::with_options(source_text, ParseOptions::default())
    }

    pub fn with_options(source_text: &'a str, options: ParseOptions) -> Self {
        Self {
            scanner: Scanner::new_with_name(source_text, options.source_name),
            token: Token::new(TokenKind::Eof, String::new(), 0, 0),
            depth: 0,
            max_depth: options.max_depth,
        }
    }

    // === Main Parsing Methods ===

    pub fn parse(mut self) -> Result<Node, MichelineError> {
        self.parse_input().map_err(|err| *err)
    }

    /// Input ::= Node EOF
    fn parse_input(&mut self) -> ParseResult<Node> {
        self.next()?;
        let node = self.parse_node()?;
        if self.token.kind != TokenKind::Eof {
            return Err(self.unexpected(TokenKind::Eof.name()));
        }
        Ok(node)
    }

    /// Node ::= Bytes | String | Int | Prim | Sequence | "(" Node ")"
    fn parse_node(&mut self) -> ParseResult<Node> {
        self.enter()?;
        let node = match self.token.kind {
            TokenKind::Bytes => self.parse_bytes(),
            TokenKind::String => self.parse_string(),
            TokenKind::Int => self.parse_int(),
            TokenKind::Identifier => self.parse_prim().map(Node::Prim),
            TokenKind::OpenBrace => self.parse_sequence(),
            TokenKind::OpenParen => {
                self.next()?;
                let node = self.parse_node()?;
                self.expect(TokenKind::CloseParen, "')'")?;
                Ok(node)
            }
            _ => Err(self.unexpected("a node")),
        }?;
        self.depth -= 1;
        Ok(node)
    }

    fn parse_bytes(&mut self) -> ParseResult<Node> {
        trace!("[Parsing] Bytes ({})", self.token.text);
        let token = self.expect(TokenKind::Bytes, "bytes")?;
        let position = Position::new(token.pos_start, token.pos_end - 1);

        let digits = token.text.strip_prefix("0x").unwrap_or_default();
        if digits.is_empty()
            || digits.len() % 2 != 0
            || !digits.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(self.invalid_bytes(token, position));
        }

        Ok(Node::Bytes {
            position,
            value: token.text,
        })
    }

    fn parse_string(&mut self) -> ParseResult<Node> {
        trace!("[Parsing] String");
        let token = self.expect(TokenKind::String, "string")?;
        Ok(Node::String {
            // Covers both quotes.
            position: Position::new(token.pos_start, token.pos_end - 1),
            value: token.text,
        })
    }

    fn parse_int(&mut self) -> ParseResult<Node> {
        trace!("[Parsing] Int ({})", self.token.text);
        let token = self.expect(TokenKind::Int, "integer")?;
        let position = Position::new(token.pos_start, token.pos_end - 1);
        match token.text.parse::<BigInt>() {
            Ok(value) => Ok(Node::Int { position, value }),
            Err(_) => Err(self.invalid_int(token, position)),
        }
    }

    /// Sequence ::= "{" [ Node { ";" Node } ] "}"
    fn parse_sequence(&mut self) -> ParseResult<Node> {
        trace!("[Parsing|IN] Sequence");
        let begin = self.expect(TokenKind::OpenBrace, "'{'")?;

        let mut elements = Vec::new();
        if self.token.kind != TokenKind::CloseBrace {
            loop {
                elements.push(self.parse_node()?);
                if self.token.kind != TokenKind::Semi {
                    break;
                }
                let semi = self.expect(TokenKind::Semi, "';'")?;
                if self.token.kind == TokenKind::CloseBrace {
                    return Err(self.trailing_separator(semi.pos_start));
                }
            }
        }
        let end = self.expect(TokenKind::CloseBrace, "';' or '}'")?;

        trace!("[Parsing|OUT] Sequence ({} elements)", elements.len());
        Ok(Node::Sequence {
            position: Position::new(begin.pos_start, end.pos_start),
            elements,
        })
    }

    /// Prim ::= Identifier { Annotation } { Node }
    ///
    /// Arguments are taken for as long as the current token can start a node.
    fn parse_prim(&mut self) -> ParseResult<Prim> {
        trace!("[Parsing|IN] Prim ({})", self.token.text);
        let identifier = self.expect(TokenKind::Identifier, "identifier")?;

        // Annotations can only appear right after the identifier.
        let mut annotations = Vec::new();
        while self.token.kind == TokenKind::Annot {
            annotations.push(self.parse_annotation()?);
        }

        let mut arguments = Vec::new();
        while self.token.kind.starts_node() {
            arguments.push(self.parse_node()?);
        }

        if self.token.kind == TokenKind::Annot {
            return Err(self.annotation_after_argument(identifier.text));
        }

        let end = if annotations.is_empty() && arguments.is_empty() {
            identifier.pos_end - 1
        } else {
            self.token.pos_start
        };

        trace!("[Parsing|OUT] Prim ({})", identifier.text);
        Ok(Prim {
            position: Position::new(identifier.pos_start, end),
            prim: identifier.text,
            annotations,
            arguments,
        })
    }

    /// Annotation ::= ":" Ident | "@" Ident | "%" Ident
    fn parse_annotation(&mut self) -> ParseResult<Annotation> {
        let token = self.expect(TokenKind::Annot, "annotation")?;
        let position = Position::new(token.pos_start, token.pos_end - 1);
        let Some(kind) = AnnotationKind::from_annotation(&token.text) else {
            return Err(self.invalid_annotation(token, position));
        };
        Ok(Annotation {
            position,
            kind,
            value: token.text,
        })
    }

    // === Token Helper Methods ===

    fn next(&mut self) -> ParseResult<()> {
        self.token = self
            .scanner
            .scan()
            .map_err(|err| Box::new(MichelineError::from(err)))?;
        trace!(
            "[Scanner] ({}) with text ({})",
            self.token.kind,
            self.token.text
        );
        Ok(())
    }

    /// Consumes the current token if it has the given kind and returns it.
    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.token.kind != kind {
            return Err(self.unexpected(expected));
        }
        let token = self.token.clone();
        self.next()?;
        Ok(token)
    }

    fn enter(&mut self) -> ParseResult<()> {
        if self.depth >= self.max_depth {
            return Err(self.nesting_too_deep());
        }
        self.depth += 1;
        Ok(())
    }

    fn current_span(&self) -> miette::SourceSpan {
        (self.token.pos_start, self.token.pos_end - self.token.pos_start).into()
    }

    // === Error Builders ===

    #[cold]
    fn unexpected(&self, expected: &str) -> Box<MichelineError> {
        let err = if self.token.kind == TokenKind::Eof {
            ParserError::UnexpectedEof {
                src: self.scanner.named_source(),
                span: (self.scanner.source_len(), 0).into(),
                expected: expected.to_string(),
            }
        } else {
            ParserError::UnexpectedToken {
                src: self.scanner.named_source(),
                span: self.current_span(),
                found: self.token.kind.name().to_string(),
                expected: expected.to_string(),
            }
        };
        Box::new(err.into())
    }

    #[cold]
    fn nesting_too_deep(&self) -> Box<MichelineError> {
        Box::new(
            ParserError::NestingTooDeep {
                src: self.scanner.named_source(),
                span: self.current_span(),
                limit: self.max_depth,
            }
            .into(),
        )
    }

    #[cold]
    fn trailing_separator(&self, offset: usize) -> Box<MichelineError> {
        Box::new(
            ParserError::TrailingSeparator {
                src: self.scanner.named_source(),
                span: (offset, 1).into(),
            }
            .into(),
        )
    }

    #[cold]
    fn annotation_after_argument(&self, prim: String) -> Box<MichelineError> {
        Box::new(
            ParserError::AnnotationAfterArgument {
                src: self.scanner.named_source(),
                span: self.current_span(),
                prim,
            }
            .into(),
        )
    }

    #[cold]
    fn invalid_bytes(&self, token: Token, position: Position) -> Box<MichelineError> {
        Box::new(
            LexerError::InvalidBytes {
                src: self.scanner.named_source(),
                span: position.source_span(),
                value: token.text,
            }
            .into(),
        )
    }

    #[cold]
    fn invalid_int(&self, token: Token, position: Position) -> Box<MichelineError> {
        Box::new(
            LexerError::InvalidInt {
                src: self.scanner.named_source(),
                span: position.source_span(),
                value: token.text,
            }
            .into(),
        )
    }

    #[cold]
    fn invalid_annotation(&self, token: Token, position: Position) -> Box<MichelineError> {
        Box::new(
            LexerError::InvalidAnnotation {
                src: self.scanner.named_source(),
                span: position.source_span(),
                value: token.text,
            }
            .into(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Report;

    fn parse_ok(source: &str) -> Node {
        match Parser::new(source).parse() {
            Ok(node) => node,
            Err(err) => {
                let report = Report::from(err);
                panic!("{:?}", report);
            }
        }
    }

    fn parse_err(source: &str) -> MichelineError {
        match Parser::new(source).parse() {
            Ok(node) => panic!("expected {source:?} to fail, got {node:?}"),
            Err(err) => err,
        }
    }

    fn int(value: i64) -> BigInt {
        BigInt::from(value)
    }

    fn as_prim(node: &Node) -> &Prim {
        match node {
            Node::Prim(prim) => prim,
            other => panic!("expected a prim, got {other:?}"),
        }
    }

    #[test]
    fn test_literals() {
        assert!(matches!(parse_ok("0xAB"), Node::Bytes { ref value, .. } if value == "0xAB"));
        assert!(matches!(parse_ok("-12"), Node::Int { ref value, .. } if *value == int(-12)));
        assert!(matches!(parse_ok(r#""tez""#), Node::String { ref value, .. } if value == "tez"));
    }

    #[test]
    fn test_prim_takes_all_following_arguments() {
        let node = parse_ok("foo 1 2");
        let prim = as_prim(&node);
        assert_eq!(prim.prim, "foo");
        assert!(prim.annotations.is_empty());
        assert_eq!(prim.arguments.len(), 2);
        assert!(matches!(prim.arguments[0], Node::Int { ref value, .. } if *value == int(1)));
        assert!(matches!(prim.arguments[1], Node::Int { ref value, .. } if *value == int(2)));
    }

    #[test]
    fn test_siblings_inside_sequence() {
        let node = parse_ok("{ foo ; bar }");
        let Node::Sequence { elements, .. } = node else {
            panic!("expected a sequence");
        };
        assert_eq!(elements.len(), 2);
        assert_eq!(as_prim(&elements[0]).prim, "foo");
        assert!(as_prim(&elements[0]).arguments.is_empty());
        assert_eq!(as_prim(&elements[1]).prim, "bar");
        assert!(as_prim(&elements[1]).arguments.is_empty());
    }

    #[test]
    fn test_nested_prim_argument_is_greedy() {
        let node = parse_ok("foo { } bar 1");
        let prim = as_prim(&node);
        assert_eq!(prim.arguments.len(), 2);
        assert!(matches!(prim.arguments[0], Node::Sequence { ref elements, .. } if elements.is_empty()));
        let bar = as_prim(&prim.arguments[1]);
        assert_eq!(bar.prim, "bar");
        assert_eq!(bar.arguments.len(), 1);
    }

    #[test]
    fn test_parenthesised_argument() {
        let node = parse_ok("Pair (Pair 1 2) 3");
        let pair = as_prim(&node);
        assert_eq!(pair.arguments.len(), 2);
        assert_eq!(as_prim(&pair.arguments[0]).arguments.len(), 2);
        assert!(matches!(pair.arguments[1], Node::Int { .. }));
    }

    #[test]
    fn test_annotations_follow_identifier() {
        let node = parse_ok("foo %a 1");
        let prim = as_prim(&node);
        assert_eq!(prim.annotations.len(), 1);
        assert_eq!(prim.annotations[0].kind, AnnotationKind::FieldAnnotation);
        assert_eq!(prim.annotations[0].value, "%a");
        assert_eq!(prim.annotations[0].position, Position::new(4, 5));
        assert_eq!(prim.arguments.len(), 1);
    }

    #[test]
    fn test_multiple_annotation_kinds() {
        let node = parse_ok("pair :point @p %x");
        let kinds: Vec<_> = as_prim(&node).annotations.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AnnotationKind::TypeAnnotation,
                AnnotationKind::VariableAnnotation,
                AnnotationKind::FieldAnnotation,
            ]
        );
    }

    #[test]
    fn test_annotation_after_argument_is_rejected() {
        let err = parse_err("foo 1 %a");
        assert!(matches!(
            err,
            MichelineError::Parser(ParserError::AnnotationAfterArgument { ref prim, .. }) if prim == "foo"
        ));
    }

    #[test]
    fn test_annotation_after_annotated_argument_bearing_prim() {
        let err = parse_err("{ foo :t %a 1 2 @v }");
        assert!(matches!(
            err,
            MichelineError::Parser(ParserError::AnnotationAfterArgument { .. })
        ));
    }

    #[test]
    fn test_annotation_binds_to_innermost_prim() {
        let node = parse_ok("foo bar %a");
        let foo = as_prim(&node);
        assert!(foo.annotations.is_empty());
        assert_eq!(as_prim(&foo.arguments[0]).annotations[0].value, "%a");
    }

    #[test]
    fn test_bytes_validation() {
        assert!(matches!(parse_err("0xA"), MichelineError::Lexer(LexerError::InvalidBytes { .. })));
        assert!(matches!(parse_err("0x"), MichelineError::Lexer(LexerError::InvalidBytes { .. })));
        assert!(matches!(parse_err("0xZZ"), MichelineError::Lexer(LexerError::InvalidBytes { .. })));
        assert!(matches!(parse_ok("0xabCD"), Node::Bytes { .. }));
    }

    #[test]
    fn test_sequence_separator() {
        let node = parse_ok("{ 1 ; 2 }");
        let Node::Sequence { elements, position } = node else {
            panic!("expected a sequence");
        };
        assert_eq!(position, Position::new(0, 8));
        assert_eq!(elements.len(), 2);

        let err = parse_err("{ 1 ; 2 ; }");
        assert!(matches!(err, MichelineError::Parser(ParserError::TrailingSeparator { .. })));
    }

    #[test]
    fn test_missing_separator() {
        let err = parse_err("{ 1 2 }");
        assert!(matches!(
            err,
            MichelineError::Parser(ParserError::UnexpectedToken { ref expected, ref found, .. })
                if expected == "';' or '}'" && found == "integer"
        ));
    }

    #[test]
    fn test_empty_sequences() {
        assert!(matches!(parse_ok("{}"), Node::Sequence { ref elements, .. } if elements.is_empty()));
        assert!(matches!(parse_err("{ ; }"), MichelineError::Parser(ParserError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_err(""), MichelineError::Parser(ParserError::UnexpectedEof { .. })));
        assert!(matches!(parse_err("  # nothing"), MichelineError::Parser(ParserError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_truncated_input() {
        let err = parse_err("{ Pair 1 2 ; ");
        assert!(matches!(err, MichelineError::Parser(ParserError::UnexpectedEof { .. })));
        let err = parse_err("(Pair 1 2");
        assert!(matches!(
            err,
            MichelineError::Parser(ParserError::UnexpectedEof { ref expected, .. }) if expected == "')'"
        ));
    }

    #[test]
    fn test_trailing_tokens() {
        let err = parse_err("1 2");
        assert!(matches!(
            err,
            MichelineError::Parser(ParserError::UnexpectedToken { ref expected, .. }) if expected == "end of input"
        ));
        assert!(matches!(parse_err("Unit }"), MichelineError::Parser(ParserError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_large_integer_keeps_precision() {
        let node = parse_ok("123456789012345678901234567890");
        let Node::Int { value, .. } = node else {
            panic!("expected an int");
        };
        assert_eq!(value.to_string(), "123456789012345678901234567890");
        assert_eq!(value, "123456789012345678901234567890".parse::<BigInt>().unwrap());
    }

    #[test]
    fn test_literal_positions() {
        let node = parse_ok(r#"{ 0xAB ; "ab" ; -10 }"#);
        let Node::Sequence { elements, .. } = node else {
            panic!("expected a sequence");
        };
        let positions: Vec<_> = elements.iter().map(Node::position).collect();
        assert_eq!(
            positions,
            vec![Position::new(2, 5), Position::new(9, 12), Position::new(16, 18)]
        );
    }

    #[test]
    fn test_prim_positions() {
        // No arguments: ends on the identifier's last character.
        assert_eq!(parse_ok("Unit").position(), Position::new(0, 3));
        // With arguments: ends where the argument scan stopped.
        assert_eq!(parse_ok("Pair 1 2").position(), Position::new(0, 8));
        let node = parse_ok("{ Some 1 ; None }");
        let Node::Sequence { elements, .. } = node else {
            panic!("expected a sequence");
        };
        assert_eq!(elements[0].position(), Position::new(2, 9));
        assert_eq!(elements[1].position(), Position::new(11, 14));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}{}", "{".repeat(20), "}".repeat(20));
        let options = ParseOptions {
            max_depth: 10,
            ..ParseOptions::default()
        };
        let err = Parser::with_options(&deep, options).parse().unwrap_err();
        assert!(matches!(
            err,
            MichelineError::Parser(ParserError::NestingTooDeep { limit: 10, .. })
        ));

        let options = ParseOptions {
            max_depth: 20,
            ..ParseOptions::default()
        };
        assert!(Parser::with_options(&deep, options).parse().is_ok());
    }

    #[test]
    fn test_default_nesting_limit_fails_cleanly() {
        let depth = DEFAULT_MAX_DEPTH + 1;
        let deep = format!("{}{}", "{".repeat(depth), "}".repeat(depth));
        let err = Parser::new(&deep).parse().unwrap_err();
        assert!(matches!(
            err,
            MichelineError::Parser(ParserError::NestingTooDeep { limit: DEFAULT_MAX_DEPTH, .. })
        ));

        let chain = vec!["a"; DEFAULT_MAX_DEPTH + 1].join(" ");
        let err = Parser::new(&chain).parse().unwrap_err();
        assert!(matches!(err, MichelineError::Parser(ParserError::NestingTooDeep { .. })));
    }

    #[test]
    fn test_default_nesting_limit_is_reachable() {
        let chain = vec!["a"; DEFAULT_MAX_DEPTH].join(" ");
        let mut node = &parse_ok(&chain);
        let mut depth = 1;
        while let Some(inner) = as_prim(node).arguments.first() {
            node = inner;
            depth += 1;
        }
        assert_eq!(depth, DEFAULT_MAX_DEPTH);

        let braces = format!(
            "{}{}",
            "{".repeat(DEFAULT_MAX_DEPTH),
            "}".repeat(DEFAULT_MAX_DEPTH)
        );
        assert!(Parser::new(&braces).parse().is_ok());
    }

    #[test]
    fn test_invalid_literal_span_covers_token() {
        let err = parse_err("{ 0xABC }");
        let MichelineError::Lexer(LexerError::InvalidBytes { span, .. }) = err else {
            panic!("expected invalid bytes");
        };
        assert_eq!((span.offset(), span.len()), (2, 5));
    }

    #[test]
    fn test_contract_script() {
        let source = r#"
            { parameter (or (int %decrement) (int %increment)) ;
              storage int ;
              code { UNPAIR ;
                     IF_LEFT { SWAP ; SUB } { ADD } ;
                     NIL operation ;
                     PAIR } }
        "#;
        let node = parse_ok(source);
        let Node::Sequence { elements, .. } = node else {
            panic!("expected a sequence");
        };
        let names: Vec<_> = elements.iter().map(|e| as_prim(e).prim.as_str()).collect();
        assert_eq!(names, vec!["parameter", "storage", "code"]);
        let or = as_prim(&as_prim(&elements[0]).arguments[0]);
        assert_eq!(or.prim, "or");
        assert_eq!(as_prim(&or.arguments[1]).annotations[0].value, "%increment");
    }
}
