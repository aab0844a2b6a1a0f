use crate::error::LexerError;
use miette::NamedSource;
use std::fmt;

/// Represents the different kinds of tokens that the scanner can produce.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    /// Represents the end of the input. Returned once the buffer is exhausted.
    Eof,

    // == Literals ==
    /// A primitive name such as `Pair`, `DUP` or `string`.
    Identifier,
    /// A decimal integer, optionally negative: `-42`.
    Int,
    /// A double quoted string. The token text holds the decoded contents.
    String,
    /// A byte literal: `0x` followed by hex digits.
    Bytes,
    /// A type (`:`), variable (`@`) or field (`%`) annotation.
    Annot,

    // == Punctuation ==
    /// Left Brace: `{`
    OpenBrace,
    /// Right Brace: `}`
    CloseBrace,
    /// Left Parenthesis: `(`
    OpenParen,
    /// Right Parenthesis: `)`
    CloseParen,
    /// Semicolon: `;` (separates sequence elements)
    Semi,
}

impl TokenKind {
    /// Human readable name, used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of input",
            TokenKind::Identifier => "identifier",
            TokenKind::Int => "integer",
            TokenKind::String => "string",
            TokenKind::Bytes => "bytes",
            TokenKind::Annot => "annotation",
            TokenKind::OpenBrace => "'{'",
            TokenKind::CloseBrace => "'}'",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::Semi => "';'",
        }
    }

    /// Whether a token of this kind can begin a node.
    pub fn starts_node(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::Int
                | TokenKind::String
                | TokenKind::Bytes
                | TokenKind::OpenBrace
                | TokenKind::OpenParen
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A token with its kind, text and byte span (`pos_end` is exclusive).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos_start: usize,
    pub pos_end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: String, pos_start: usize, pos_end: usize) -> Token {
        Token {
            kind,
            text,
            pos_start,
            pos_end,
        }
    }
}

/// Produces tokens one at a time from a notation buffer.
pub struct Scanner<'a> {
    input: &'a str,
    name: String,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    position: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::new_with_name(input, "input.tz".to_string())
    }

    pub fn new_with_name(input: &'a str, name: String) -> Self {
        Self {
            input,
            name,
            chars: input.char_indices().peekable(),
            position: 0,
        }
    }

    /// Collects every token up to and including `Eof`.
    pub fn scan_all(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Returns the next token, skipping whitespace and comments.
    pub fn scan(&mut self) -> Result<Token, LexerError> {
        self.skip_trivia()?;
        let start_pos = self.position;

        let Some(c) = self.advance() else {
            return Ok(Token::new(TokenKind::Eof, String::new(), start_pos, start_pos));
        };

        let (kind, text) = match c {
            '{' => (TokenKind::OpenBrace, c.to_string()),
            '}' => (TokenKind::CloseBrace, c.to_string()),
            '(' => (TokenKind::OpenParen, c.to_string()),
            ')' => (TokenKind::CloseParen, c.to_string()),
            ';' => (TokenKind::Semi, c.to_string()),
            '"' => (TokenKind::String, self.read_string(start_pos)?),
            ':' | '@' | '%' => (TokenKind::Annot, self.read_annotation(c)),
            '0' if self.peek() == Some('x') => (TokenKind::Bytes, self.read_bytes()),
            c if c.is_ascii_digit() => (TokenKind::Int, self.read_int(c)),
            '-' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                (TokenKind::Int, self.read_int(c))
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                (TokenKind::Identifier, self.read_identifier(c))
            }
            found => {
                return Err(LexerError::UnexpectedCharacter {
                    src: self.named_source(),
                    span: (start_pos, found.len_utf8()).into(),
                    found,
                })
            }
        };

        Ok(Token::new(kind, text, start_pos, self.position))
    }

    pub(crate) fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.name.clone(), self.input.to_string())
    }

    pub(crate) fn source_len(&self) -> usize {
        self.input.len()
    }

    fn advance(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    fn skip_trivia(&mut self) -> Result<(), LexerError> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else if c == '#' {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
            } else if c == '/' && self.peek_second() == Some('*') {
                self.skip_block_comment()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<(), LexerError> {
        let start_pos = self.position;
        self.advance();
        self.advance();
        while let Some(c) = self.advance() {
            if c == '*' && self.peek() == Some('/') {
                self.advance();
                return Ok(());
            }
        }
        Err(LexerError::UnterminatedComment {
            src: self.named_source(),
            span: (start_pos, 2).into(),
        })
    }

    fn read_string(&mut self, start_pos: usize) -> Result<String, LexerError> {
        let mut value = String::new();
        while let Some(c) = self.advance() {
            match c {
                '"' => return Ok(value),
                '\\' => {
                    let escape_pos = self.position - 1;
                    let Some(escaped) = self.advance() else {
                        break;
                    };
                    let decoded = match escaped {
                        '"' => '"',
                        '\\' => '\\',
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        'b' => '\u{8}',
                        found => {
                            return Err(LexerError::InvalidEscape {
                                src: self.named_source(),
                                span: (escape_pos, 1 + found.len_utf8()).into(),
                                found,
                            })
                        }
                    };
                    value.push(decoded);
                }
                c => value.push(c),
            }
        }
        Err(LexerError::UnterminatedString {
            src: self.named_source(),
            span: (start_pos, 1).into(),
        })
    }

    fn read_annotation(&mut self, prefix: char) -> String {
        let mut annot = String::from(prefix);
        while let Some(c) = self.peek() {
            if is_annotation_char(c) {
                annot.push(c);
                self.advance();
            } else {
                break;
            }
        }
        annot
    }

    // The run after `0x` is taken whole; the parser decides whether it is hex.
    fn read_bytes(&mut self) -> String {
        let mut bytes = String::from("0");
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() {
                bytes.push(c);
                self.advance();
            } else {
                break;
            }
        }
        bytes
    }

    fn read_int(&mut self, first_char: char) -> String {
        let mut number = String::from(first_char);
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                number.push(c);
                self.advance();
            } else {
                break;
            }
        }
        number
    }

    fn read_identifier(&mut self, first_char: char) -> String {
        let mut ident = String::from(first_char);
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }
}

/// Characters allowed after an annotation's prefix.
pub(crate) fn is_annotation_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '%' | '@')
}
