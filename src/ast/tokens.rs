/// Literal categories recognised by the lexer.
///
/// The lexer only classifies; turning the raw text into a [`Value`](crate::Value)
/// is the job of the [literal parser](crate::literal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Null,
    Boolean,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    /// Single-quoted string, `''` escapes a quote
    String,
    Date,
    TimeOfDay,
    DateTimeOffset,
    /// `duration'P1DT2H'`
    Duration,
    Guid,
    /// `binary'..'` or `X'..'`
    Binary,
    /// `geography'SRID=4326;POINT(1 2)'`
    Geography,
    /// `geometry'POINT(1 2)'`
    Geometry,
    /// Qualified type name followed by a quoted value, e.g. `NS.Color'Red'`
    Typed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Name, qualified name (`NS.Type`), `$`-name (`$it`, `$count`) or
    /// namespace wildcard (`NS.*`)
    Identifier,
    Literal(LiteralKind),
    /// Operator keyword (`eq`, `and`, `not`, ... or `AND`/`OR`/`NOT` in
    /// search mode)
    Operator,
    /// `@name`
    ParameterAlias,
    /// JSON array or object, brackets included
    Bracketed,
    /// Search word or quoted search phrase
    SearchTerm,
    OpenParen,
    CloseParen,
    Comma,
    Slash,
    Colon,
    Equal,
    Star,
    Semicolon,
    Minus,
    End,
}

/// A lexical token: kind, raw source text, and the 0-based character offset
/// where it starts.
///
/// # Examples
/// ```text
/// Name eq 'Bob'
/// ^    ^  ^
/// |    |  Literal(String) "'Bob'" @ 8
/// |    Operator "eq" @ 5
/// Identifier "Name" @ 0
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            position,
        }
    }

    pub fn end(position: usize) -> Self {
        Token::new(TokenKind::End, "", position)
    }

    pub fn is_operator(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == keyword
    }

    pub fn is_identifier(&self, name: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == name
    }

    /// Identifiers plus operator keywords, which are ordinary names where
    /// only a name can appear (select paths, parameter names).
    pub fn is_name(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Operator)
    }
}
