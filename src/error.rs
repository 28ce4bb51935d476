//! Crate-level error type.
//!
//! Each component returns its own error enum; [`Error`] gathers them for
//! callers that drive a whole request through [`UriParser`](crate::UriParser)
//! and only care about the broad [`ErrorKind`].

use thiserror::Error;

use crate::{
    alias::AliasError, binder::BindError, lexer::LexError, literal::LiteralError, options::QueryOptionError,
    parser::ParseError, path::PathError,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Literal(#[from] LiteralError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Alias(#[from] AliasError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    QueryOption(#[from] QueryOptionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid character, unterminated string, bad escape
    Lexical,
    /// Unexpected token, missing operator or parenthesis, malformed literal
    Syntax,
    /// Incompatible operands, unknown properties, no applicable function
    Type,
    /// Illegal or unknown path segment
    SemanticPath,
    /// Circular or too deep alias chain
    Alias,
    /// Invalid scalar or duplicate query option
    QueryOption,
}

fn parse_kind(error: &ParseError) -> ErrorKind {
    match error {
        ParseError::Lex(_) => ErrorKind::Lexical,
        _ => ErrorKind::Syntax,
    }
}

fn bind_kind(error: &BindError) -> ErrorKind {
    match error {
        BindError::Parse(e) => parse_kind(e),
        BindError::Literal(_) => ErrorKind::Syntax,
        BindError::Alias(_) => ErrorKind::Alias,
        BindError::Option(_) => ErrorKind::QueryOption,
        _ => ErrorKind::Type,
    }
}

impl Error {
    /// Broad category of the failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use odata_uri::alias::AliasError;
    /// use odata_uri::{Error, ErrorKind};
    ///
    /// let err = Error::from(AliasError::TooDeep);
    /// assert_eq!(err.kind(), ErrorKind::Alias);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Lex(_) => ErrorKind::Lexical,
            Error::Literal(_) => ErrorKind::Syntax,
            Error::Parse(e) => parse_kind(e),
            Error::Alias(_) => ErrorKind::Alias,
            Error::Bind(e) => bind_kind(e),
            Error::Path(PathError::Parse(e)) => parse_kind(e),
            Error::Path(PathError::Bind(e)) => match bind_kind(e) {
                // Unmatched operation parameters are a path problem.
                ErrorKind::Type if matches!(e, BindError::NoMatchingOperation { .. }) => ErrorKind::SemanticPath,
                kind => kind,
            },
            Error::Path(_) => ErrorKind::SemanticPath,
            Error::QueryOption(_) => ErrorKind::QueryOption,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
