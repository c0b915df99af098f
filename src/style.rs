//! Inline `style` attribute handling.
//!
//! A `style` attribute holds a CSS declaration list (`fill:red;stroke:blue`).
//! The tokenizer here covers the lexical vocabulary of a CSS scanner, but the
//! parser on top of it is deliberately lenient: anything before a colon is a
//! property name, everything up to the next semicolon is its value, and the
//! first malformed declaration ends the list.

use tracing::trace;

use crate::ast::{Attribute, AttributeSet};

/// Lexical class of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Whitespace and comments
    Whitespace,
    Ident,
    /// An identifier immediately followed by `(`, e.g. `url(`
    Function,
    /// `@name`
    AtKeyword,
    /// `#name`
    Hash,
    /// A quoted string, quotes included
    String,
    Number,
    Percentage,
    /// A number with a unit suffix, e.g. `10px`
    Dimension,
    Colon,
    Semicolon,
    Comma,
    Slash,
    Minus,
    Plus,
    Dot,
    Star,
    Greater,
    Equal,
    Exclamation,
    Pipe,
    /// `~=`
    Includes,
    /// `|=`
    DashMatch,
    /// `<!--`
    Cdo,
    /// `-->`
    Cdc,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    /// Unrecognized input, including unterminated strings
    Invalid,
}

/// A classified slice of the source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// The exact source text of this token.
    pub text: &'a str,
    /// Byte offset of `text` in the source.
    pub offset: usize,
}

/// Split a declaration list into tokens.
///
/// The tokens cover the input with no gaps, so concatenating every `text`
/// reproduces the source. Tokenizing never fails.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = tokenizer.next_token() {
        tokens.push(token);
    }
    tokens
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        let start = self.pos;
        let c = self.peek()?;

        let kind = match c {
            c if is_whitespace(c) => {
                self.consume_whitespace_and_comments();
                TokenKind::Whitespace
            }
            '/' if self.rest().starts_with("/*") => {
                self.consume_whitespace_and_comments();
                TokenKind::Whitespace
            }
            '"' | '\'' => self.consume_string(c),
            '0'..='9' => self.consume_numeric(),
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.consume_numeric(),
            '-' if self.rest().starts_with("-->") => {
                self.pos += 3;
                TokenKind::Cdc
            }
            '-' if self.starts_ident() => self.consume_ident_like(),
            '#' => {
                self.bump();
                if self.peek().is_some_and(is_name_char) || self.starts_escape() {
                    self.consume_name();
                    TokenKind::Hash
                } else {
                    TokenKind::Invalid
                }
            }
            '@' => {
                self.bump();
                if self.starts_ident() {
                    self.consume_name();
                    TokenKind::AtKeyword
                } else {
                    TokenKind::Invalid
                }
            }
            '<' if self.rest().starts_with("<!--") => {
                self.pos += 4;
                TokenKind::Cdo
            }
            '~' if self.rest().starts_with("~=") => {
                self.pos += 2;
                TokenKind::Includes
            }
            '|' if self.rest().starts_with("|=") => {
                self.pos += 2;
                TokenKind::DashMatch
            }
            c if is_name_start(c) || self.starts_escape() => self.consume_ident_like(),
            c => {
                self.bump();
                match c {
                    ':' => TokenKind::Colon,
                    ';' => TokenKind::Semicolon,
                    ',' => TokenKind::Comma,
                    '/' => TokenKind::Slash,
                    '-' => TokenKind::Minus,
                    '+' => TokenKind::Plus,
                    '.' => TokenKind::Dot,
                    '*' => TokenKind::Star,
                    '>' => TokenKind::Greater,
                    '=' => TokenKind::Equal,
                    '!' => TokenKind::Exclamation,
                    '|' => TokenKind::Pipe,
                    '{' => TokenKind::LeftBrace,
                    '}' => TokenKind::RightBrace,
                    '[' => TokenKind::LeftBracket,
                    ']' => TokenKind::RightBracket,
                    '(' => TokenKind::LeftParen,
                    ')' => TokenKind::RightParen,
                    _ => TokenKind::Invalid,
                }
            }
        };

        Some(Token {
            kind,
            text: &self.input[start..self.pos],
            offset: start,
        })
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// A backslash followed by anything but a newline.
    fn starts_escape(&self) -> bool {
        self.peek() == Some('\\') && self.peek_at(1).is_some_and(|c| c != '\n')
    }

    fn starts_ident(&self) -> bool {
        match self.peek() {
            Some('-') => match self.peek_at(1) {
                Some(c) if is_name_start(c) || c == '-' => true,
                Some('\\') => self.peek_at(2).is_some_and(|c| c != '\n'),
                _ => false,
            },
            Some(c) if is_name_start(c) => true,
            _ => self.starts_escape(),
        }
    }

    fn consume_whitespace_and_comments(&mut self) {
        loop {
            if self.peek().is_some_and(is_whitespace) {
                self.bump();
            } else if self.rest().starts_with("/*") {
                match self.rest()[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => self.pos = self.input.len(),
                }
            } else {
                break;
            }
        }
    }

    fn consume_name(&mut self) {
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.bump();
            } else if self.starts_escape() {
                self.bump();
                self.bump();
            } else {
                break;
            }
        }
    }

    fn consume_ident_like(&mut self) -> TokenKind {
        if self.peek() == Some('-') {
            self.bump();
        }
        self.consume_name();
        if self.peek() == Some('(') {
            self.bump();
            TokenKind::Function
        } else {
            TokenKind::Ident
        }
    }

    fn consume_numeric(&mut self) -> TokenKind {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }

        if self.peek() == Some('%') {
            self.bump();
            TokenKind::Percentage
        } else if self.starts_ident() {
            self.consume_name();
            TokenKind::Dimension
        } else {
            TokenKind::Number
        }
    }

    fn consume_string(&mut self, quote: char) -> TokenKind {
        self.bump();
        while let Some(c) = self.bump() {
            match c {
                c if c == quote => return TokenKind::String,
                '\\' => {
                    self.bump();
                }
                '\n' => return TokenKind::Invalid,
                _ => {}
            }
        }
        TokenKind::Invalid
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

/// One `property: value` pair of a declaration list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration<'a> {
    pub property: &'a str,
    pub value: &'a str,
}

/// Parse a declaration list into `property: value` pairs.
///
/// Parsing is best effort: when a property name is not followed by a colon,
/// the declarations read so far are returned and the rest is dropped.
pub fn parse_declarations(input: &str) -> Vec<Declaration<'_>> {
    DeclarationParser::new(input).parse()
}

struct DeclarationParser<'a> {
    input: &'a str,
    tokens: Vec<Token<'a>>,
    index: usize,
}

impl<'a> DeclarationParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            tokens: tokenize(input),
            index: 0,
        }
    }

    fn parse(mut self) -> Vec<Declaration<'a>> {
        let mut declarations = Vec::new();

        loop {
            self.skip_space();
            let Some(name) = self.next() else {
                break;
            };

            self.skip_space();
            if !self.test(TokenKind::Colon) {
                break;
            }

            self.skip_space();
            if !self.has_next() {
                break;
            }

            let value = self.consume_value();
            declarations.push(Declaration {
                property: name.text,
                value,
            });
        }

        declarations
    }

    /// Consume tokens up to and including the next semicolon. The returned
    /// value excludes the semicolon and any trailing whitespace.
    fn consume_value(&mut self) -> &'a str {
        let start = self.tokens[self.index].offset;
        let mut end = start;

        while let Some(token) = self.next() {
            match token.kind {
                TokenKind::Semicolon => break,
                TokenKind::Whitespace => {}
                _ => end = token.offset + token.text.len(),
            }
        }

        &self.input[start..end]
    }

    fn has_next(&self) -> bool {
        self.index < self.tokens.len()
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.index).copied()?;
        self.index += 1;
        Some(token)
    }

    /// Consume the next token if it has the given kind.
    fn test(&mut self, kind: TokenKind) -> bool {
        match self.tokens.get(self.index) {
            Some(token) if token.kind == kind => {
                self.index += 1;
                true
            }
            _ => false,
        }
    }

    fn skip_space(&mut self) {
        while self.test(TokenKind::Whitespace) {}
    }
}

/// Fold an element's `style` attribute into plain attributes.
///
/// The `style` attribute is removed and each of its declarations becomes an
/// attribute named after the property. An attribute that already exists on
/// the element wins over a declaration for the same name, and only the first
/// of several declarations for one property is kept. Properties that are not
/// valid XML names (`-inkscape-font-specification`) are dropped.
pub fn merge_style(attributes: AttributeSet) -> AttributeSet {
    if !attributes.contains("style") {
        return attributes;
    }
    let style = attributes.get("style").unwrap_or_default();

    let mut merged: AttributeSet = attributes
        .iter()
        .filter(|a| !a.name.matches("style"))
        .cloned()
        .collect();

    for decl in parse_declarations(style) {
        if attributes.contains(decl.property) || merged.contains(decl.property) {
            trace!(property = decl.property, "style declaration shadowed by attribute");
            continue;
        }
        if !is_xml_name(decl.property) {
            trace!(property = decl.property, "style property is not an attribute name");
            continue;
        }
        merged.push(Attribute::new(decl.property, decl.value));
    }

    merged
}

/// Whether `name` can be written as an XML attribute name.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let start = |c: char| c.is_alphabetic() || c == '_' || c == ':';
    start(first) && chars.all(|c| start(c) || c.is_alphanumeric() || matches!(c, '-' | '.' | '\u{B7}'))
}
