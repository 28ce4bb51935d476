//! # Free-Text Search
//!
//! `$search` has its own small grammar over the search mode of the
//! [lexer](crate::lexer):
//!
//! ```text
//! search  := or
//! or      := and ("OR" and)*
//! and     := not (["AND"] not)*       juxtaposed terms are AND-ed
//! not     := "NOT" not | primary
//! primary := word | "phrase" | "(" or ")"
//! ```
//!
//! Keywords are recognised in upper case only; `and`, `or` and `not` are
//! ordinary search words.

use crate::{
    ast::{SearchExpr, Token, TokenKind},
    lexer::Lexer,
    parser::ParseError,
    settings::ParserSettings,
};

pub struct SearchParser {
    lexer: Lexer,
    current_token: Token,
    max_depth: usize,
    depth: usize,
}

impl SearchParser {
    pub fn new(text: &str, settings: &ParserSettings) -> Result<Self, ParseError> {
        let mut lexer = Lexer::for_search(text);
        let current_token = lexer.next_token()?;
        Ok(SearchParser {
            lexer,
            current_token,
            max_depth: settings.max_depth,
            depth: 0,
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        self.current_token.is_operator(keyword)
    }

    /// Whether the current token can begin an operand.
    fn starts_operand(&self) -> bool {
        matches!(
            self.current_token.kind,
            TokenKind::SearchTerm | TokenKind::OpenParen
        ) || self.is_keyword("NOT")
    }

    fn expression_expected(&self) -> ParseError {
        ParseError::ExpressionExpected {
            position: self.current_token.position,
            found: self.current_token.text.clone(),
            text: self.lexer.text(),
        }
    }

    /// Each nesting level, chained operator and `NOT` counts once.
    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::TooDeep);
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    pub fn parse(&mut self) -> Result<SearchExpr, ParseError> {
        let expr = self.parse_or()?;
        if self.current_token.kind != TokenKind::End {
            return Err(ParseError::CloseParenOrOperatorExpected {
                position: self.current_token.position,
                found: self.current_token.text.clone(),
                text: self.lexer.text(),
            });
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<SearchExpr, ParseError> {
        self.enter()?;
        let mut left = self.parse_and()?;
        let mut levels = 1;
        while self.is_keyword("OR") {
            self.advance()?;
            self.enter()?;
            levels += 1;
            let right = self.parse_and()?;
            left = SearchExpr::Or(Box::new(left), Box::new(right));
        }
        self.leave(levels);
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<SearchExpr, ParseError> {
        let mut left = self.parse_not()?;
        let mut levels = 0;
        loop {
            if self.is_keyword("AND") {
                self.advance()?;
            } else if !self.starts_operand() {
                break;
            }
            self.enter()?;
            levels += 1;
            let right = self.parse_not()?;
            left = SearchExpr::And(Box::new(left), Box::new(right));
        }
        self.leave(levels);
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<SearchExpr, ParseError> {
        if !self.is_keyword("NOT") {
            return self.parse_primary();
        }
        self.advance()?;
        self.enter()?;
        let operand = self.parse_not()?;
        self.leave(1);
        Ok(SearchExpr::Not(Box::new(operand)))
    }

    fn parse_primary(&mut self) -> Result<SearchExpr, ParseError> {
        match self.current_token.kind {
            TokenKind::SearchTerm => {
                let term = unquote_phrase(&self.current_token.text);
                self.advance()?;
                Ok(SearchExpr::Term(term))
            }
            TokenKind::OpenParen => {
                self.advance()?;
                let inner = self.parse_or()?;
                if self.current_token.kind != TokenKind::CloseParen {
                    return Err(ParseError::CloseParenOrOperatorExpected {
                        position: self.current_token.position,
                        found: self.current_token.text.clone(),
                        text: self.lexer.text(),
                    });
                }
                self.advance()?;
                Ok(inner)
            }
            _ => Err(self.expression_expected()),
        }
    }
}

/// Strips phrase quotes and resolves `\"` and `\\`.
fn unquote_phrase(text: &str) -> String {
    let Some(inner) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) else {
        return text.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.extend(chars.next());
        } else {
            out.push(c);
        }
    }
    out
}

/// Parses a `$search` value.
///
/// # Examples
///
/// ```
/// use odata_uri::ast::SearchExpr;
/// use odata_uri::search::parse_search;
/// use odata_uri::ParserSettings;
///
/// let expr = parse_search("blue OR green", &ParserSettings::default()).unwrap();
/// assert!(matches!(expr, SearchExpr::Or(..)));
/// ```
pub fn parse_search(text: &str, settings: &ParserSettings) -> Result<SearchExpr, ParseError> {
    SearchParser::new(text, settings)?.parse()
}
