use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::ast::{LiteralKind, Token, TokenKind, operators::OPERATOR_KEYWORDS};
use crate::literal;

/// Longest unquoted temporal or GUID literal the lexer tries to recognise.
const LITERAL_WINDOW: usize = 64;

static GUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}")
        .expect("static pattern")
});

static DATE_TIME_OFFSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{1,2}:\d{1,2}(?::\d{1,2}(?:\.\d+)?)?(?:Z|z|[+-]\d{2}:\d{2})?")
        .expect("static pattern")
});

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("static pattern"));

static TIME_OF_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,2}:\d{1,2}:\d{1,2}(?:\.\d+)?").expect("static pattern")
});

/// Errors raised while splitting text into tokens. Positions are 0-based
/// character offsets into `text`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("Invalid character '{ch}' at position {position} in '{text}'.")]
    InvalidCharacter {
        ch: char,
        position: usize,
        text: String,
    },

    #[error("There is an unterminated string literal at position {position} in '{text}'.")]
    UnterminatedStringLiteral { position: usize, text: String },

    #[error("Invalid escape sequence '{sequence}' at position {position} in '{text}'.")]
    InvalidEscapeSequence {
        sequence: String,
        position: usize,
        text: String,
    },

    #[error("Unbalanced bracket expression at position {position} in '{text}'.")]
    UnbalancedBracket { position: usize, text: String },
}

impl LexError {
    pub fn position(&self) -> usize {
        match self {
            LexError::InvalidCharacter { position, .. }
            | LexError::UnterminatedStringLiteral { position, .. }
            | LexError::InvalidEscapeSequence { position, .. }
            | LexError::UnbalancedBracket { position, .. } => *position,
        }
    }
}

/// Which token rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    /// Filter, orderby, compute, apply, path segments
    Expression,
    /// `$search`: words, quoted phrases, `AND`/`OR`/`NOT`, parentheses
    Search,
}

/// Single forward pass over a string, one token at a time.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    mode: LexMode,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            mode: LexMode::Expression,
        }
    }

    pub fn for_search(input: &str) -> Self {
        Lexer {
            mode: LexMode::Search,
            ..Lexer::new(input)
        }
    }

    /// The full input, for error messages.
    pub fn text(&self) -> String {
        self.input.iter().collect()
    }

    /// Offset of the next unread character.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Continues lexing from `position`.
    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.input.len());
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn slice(&self, start: usize) -> String {
        self.input[start..self.position].iter().collect()
    }

    fn invalid_character(&self, position: usize) -> LexError {
        LexError::InvalidCharacter {
            ch: self.input.get(position).copied().unwrap_or('\0'),
            position,
            text: self.text(),
        }
    }

    /// Returns the next token without consuming it.
    pub fn peek_token(&mut self) -> Result<Token, LexError> {
        let saved = self.position;
        let token = self.next_token();
        self.position = saved;
        token
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        match self.mode {
            LexMode::Expression => self.next_expression_token(),
            LexMode::Search => self.next_search_token(),
        }
    }

    fn single(&mut self, kind: TokenKind) -> Result<Token, LexError> {
        let start = self.position;
        self.advance();
        Ok(Token::new(kind, self.slice(start), start))
    }

    fn next_expression_token(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let Some(ch) = self.current_char() else {
            return Ok(Token::end(start));
        };

        match ch {
            '(' => self.single(TokenKind::OpenParen),
            ')' => self.single(TokenKind::CloseParen),
            ',' => self.single(TokenKind::Comma),
            '/' => self.single(TokenKind::Slash),
            ':' => self.single(TokenKind::Colon),
            '=' => self.single(TokenKind::Equal),
            '*' => self.single(TokenKind::Star),
            ';' => self.single(TokenKind::Semicolon),
            '\'' => {
                self.read_quoted()?;
                Ok(Token::new(
                    TokenKind::Literal(LiteralKind::String),
                    self.slice(start),
                    start,
                ))
            }
            '[' | '{' => {
                self.read_bracketed()?;
                Ok(Token::new(TokenKind::Bracketed, self.slice(start), start))
            }
            '@' => {
                self.advance();
                if !self.current_char().is_some_and(is_identifier_start) {
                    return Err(self.invalid_character(start));
                }
                self.read_name();
                Ok(Token::new(TokenKind::ParameterAlias, self.slice(start), start))
            }
            '$' => {
                self.advance();
                if !self.current_char().is_some_and(is_identifier_start) {
                    return Err(self.invalid_character(start));
                }
                self.read_name();
                Ok(Token::new(TokenKind::Identifier, self.slice(start), start))
            }
            '-' => {
                if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                    self.read_number(start)
                } else if self.matches_word(1, "INF") {
                    self.position += 4;
                    Ok(Token::new(
                        TokenKind::Literal(LiteralKind::Double),
                        self.slice(start),
                        start,
                    ))
                } else {
                    self.single(TokenKind::Minus)
                }
            }
            c if c.is_ascii_hexdigit() => {
                if let Some(kind) = self.try_unquoted_literal() {
                    return Ok(Token::new(TokenKind::Literal(kind), self.slice(start), start));
                }
                if c.is_ascii_digit() {
                    self.read_number(start)
                } else {
                    self.read_word(start)
                }
            }
            c if is_identifier_start(c) => self.read_word(start),
            _ => Err(self.invalid_character(start)),
        }
    }

    fn next_search_token(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let Some(ch) = self.current_char() else {
            return Ok(Token::end(start));
        };

        match ch {
            '(' => self.single(TokenKind::OpenParen),
            ')' => self.single(TokenKind::CloseParen),
            '"' => {
                self.read_phrase()?;
                Ok(Token::new(TokenKind::SearchTerm, self.slice(start), start))
            }
            _ => {
                while let Some(c) = self.current_char() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '"') {
                        break;
                    }
                    self.advance();
                }
                let word = self.slice(start);
                let kind = if matches!(word.as_str(), "AND" | "OR" | "NOT") {
                    TokenKind::Operator
                } else {
                    TokenKind::SearchTerm
                };
                Ok(Token::new(kind, word, start))
            }
        }
    }

    fn matches_word(&self, offset: usize, word: &str) -> bool {
        let len = word.chars().count();
        word.chars()
            .enumerate()
            .all(|(i, c)| self.peek_char(offset + i) == Some(c))
            && !self.peek_char(offset + len).is_some_and(is_identifier_part)
    }

    /// Recognises GUID, date, date-time-offset and time-of-day literals at the
    /// current position and consumes them.
    fn try_unquoted_literal(&mut self) -> Option<LiteralKind> {
        let window: String = self.input[self.position..]
            .iter()
            .take(LITERAL_WINDOW)
            .collect();
        let candidates: [(&Regex, LiteralKind); 4] = [
            (&GUID, LiteralKind::Guid),
            (&DATE_TIME_OFFSET, LiteralKind::DateTimeOffset),
            (&DATE, LiteralKind::Date),
            (&TIME_OF_DAY, LiteralKind::TimeOfDay),
        ];
        for (pattern, kind) in candidates {
            if let Some(found) = pattern.find(&window) {
                // The patterns are ASCII-only, so byte length equals char count.
                let len = found.end();
                let next = window[len..].chars().next();
                if next.is_some_and(|c| is_identifier_part(c) || c == '.' || c == ':') {
                    continue;
                }
                self.position += len;
                return Some(kind);
            }
        }
        None
    }

    fn read_name(&mut self) {
        while let Some(ch) = self.current_char() {
            if is_identifier_part(ch) {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Identifier with optional dotted segments and a trailing `.*`.
    fn read_identifier(&mut self) {
        self.read_name();
        while self.current_char() == Some('.') {
            match self.peek_char(1) {
                Some('*') => {
                    self.position += 2;
                    return;
                }
                Some(c) if is_identifier_start(c) => {
                    self.advance();
                    self.read_name();
                }
                _ => return,
            }
        }
    }

    fn read_word(&mut self, start: usize) -> Result<Token, LexError> {
        self.read_identifier();
        let word = self.slice(start);

        if self.current_char() == Some('\'') {
            let kind = match word.as_str() {
                "duration" => LiteralKind::Duration,
                "binary" | "X" => LiteralKind::Binary,
                "geography" => LiteralKind::Geography,
                "geometry" => LiteralKind::Geometry,
                _ => LiteralKind::Typed,
            };
            self.read_quoted()?;
            return Ok(Token::new(TokenKind::Literal(kind), self.slice(start), start));
        }

        let kind = match word.as_str() {
            "true" | "false" => TokenKind::Literal(LiteralKind::Boolean),
            "null" => TokenKind::Literal(LiteralKind::Null),
            "INF" | "NaN" => TokenKind::Literal(LiteralKind::Double),
            w if OPERATOR_KEYWORDS.contains(&w) => TokenKind::Operator,
            _ => TokenKind::Identifier,
        };
        Ok(Token::new(kind, word, start))
    }

    /// Single-quoted text; a doubled quote stands for one quote.
    fn read_quoted(&mut self) -> Result<(), LexError> {
        let start = self.position;
        self.advance();
        loop {
            match self.current_char() {
                None => {
                    return Err(LexError::UnterminatedStringLiteral {
                        position: start,
                        text: self.text(),
                    });
                }
                Some('\'') if self.peek_char(1) == Some('\'') => self.position += 2,
                Some('\'') => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => self.advance(),
            }
        }
    }

    /// Double-quoted search phrase with `\"` and `\\` escapes.
    fn read_phrase(&mut self) -> Result<(), LexError> {
        let start = self.position;
        self.advance();
        loop {
            match self.current_char() {
                None => {
                    return Err(LexError::UnterminatedStringLiteral {
                        position: start,
                        text: self.text(),
                    });
                }
                Some('\\') => match self.peek_char(1) {
                    Some('\\') | Some('"') => self.position += 2,
                    other => {
                        let mut sequence = String::from('\\');
                        sequence.extend(other);
                        return Err(LexError::InvalidEscapeSequence {
                            sequence,
                            position: self.position,
                            text: self.text(),
                        });
                    }
                },
                Some('"') => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => self.advance(),
            }
        }
    }

    /// Balanced JSON array/object, skipping over JSON strings.
    fn read_bracketed(&mut self) -> Result<(), LexError> {
        let start = self.position;
        let mut depth = 0usize;
        let mut in_string = false;
        while let Some(ch) = self.current_char() {
            self.advance();
            if in_string {
                match ch {
                    '\\' => self.advance(),
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match ch {
                '"' => in_string = true,
                '[' | '{' => depth += 1,
                ']' | '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(LexError::UnbalancedBracket {
            position: start,
            text: self.text(),
        })
    }

    fn read_number(&mut self, start: usize) -> Result<Token, LexError> {
        let mut fractional = false;
        self.read_digits();

        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            fractional = true;
            self.advance();
            self.read_digits();
        }

        if matches!(self.current_char(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_char(1), Some('+' | '-')));
            if self.peek_char(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                fractional = true;
                self.position += 1 + sign;
                self.read_digits();
            }
        }

        let suffix = match self.current_char() {
            Some(c @ ('L' | 'l' | 'M' | 'm' | 'F' | 'f' | 'D' | 'd'))
                if !self.peek_char(1).is_some_and(is_identifier_part) =>
            {
                Some(c.to_ascii_uppercase())
            }
            _ => None,
        };
        if suffix.is_some() {
            self.advance();
        }

        if self.current_char().is_some_and(is_identifier_part) {
            return Err(self.invalid_character(self.position));
        }

        let text = self.slice(start);
        let kind = match suffix {
            Some('L') if fractional => return Err(self.invalid_character(self.position - 1)),
            Some('L') => LiteralKind::Int64,
            Some('M') => LiteralKind::Decimal,
            Some('F') => LiteralKind::Single,
            Some('D') => LiteralKind::Double,
            _ if fractional => literal::infer_fractional_kind(&text),
            _ => literal::infer_integral_kind(&text),
        };
        Ok(Token::new(TokenKind::Literal(kind), text, start))
    }

    fn read_digits(&mut self) {
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, LexError>;

    /// Yields tokens up to, but not including, the end token. Stops after
    /// the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.position > self.input.len() {
            return None;
        }
        match self.next_token() {
            Ok(token) if token.kind == TokenKind::End => {
                self.position = self.input.len() + 1;
                None
            }
            Ok(token) => Some(Ok(token)),
            Err(e) => {
                self.position = self.input.len() + 1;
                Some(Err(e))
            }
        }
    }
}

/// Splits an expression into tokens.
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(text).collect()
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

#[test]
fn test_operator_keywords() {
    let mut lexer = Lexer::new("Price gt 5 and not Active");
    let kinds: Vec<TokenKind> = std::iter::from_fn(|| {
        let token = lexer.next_token().unwrap();
        (token.kind != TokenKind::End).then_some(token.kind)
    })
    .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Identifier,
            TokenKind::Operator,
            TokenKind::Literal(LiteralKind::Int32),
            TokenKind::Operator,
            TokenKind::Operator,
            TokenKind::Identifier,
        ]
    );
}

#[test]
fn test_positions() {
    let tokens = tokenize("Name eq 'Bob'").unwrap();
    let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
    assert_eq!(positions, vec![0, 5, 8]);
}

#[test]
fn test_search_keywords_are_case_sensitive() {
    let mut lexer = Lexer::for_search("foo AND bar and");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::SearchTerm);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Operator);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::SearchTerm);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::SearchTerm);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
}
