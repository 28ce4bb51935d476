//! # Syntax Trees
//!
//! Untyped trees produced by the lexer and parsers, before any schema
//! knowledge is applied.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (literals, paths, calls, lambdas, operators)
//! - **[operators]** - Binary and unary operators with their keywords
//! - **[query]** - Syntax of the structured options (`$orderby`, `$select`,
//!   `$expand`, `$compute`, `$apply`, `$search`)
//!
//! ## Grammar
//!
//! Precedence, lowest to highest:
//!
//! ```text
//! or < and < not < eq ne < gt ge lt le has in < add sub < mul div mod < - < primary
//! ```
//!
//! Primary expressions are literals, parameter aliases, `/`-separated paths,
//! function calls, `any`/`all` lambdas and parenthesized expressions:
//!
//! ```text
//! Name eq 'Bob' and Orders/any(o: o/Amount gt 100)
//! year(Birthday) ge 1990
//! Color has NS.Color'Red,Green'
//! ID in (1, 2, 3)
//! ```
pub mod expressions;
pub mod operators;
pub mod query;
pub mod tokens;

pub use expressions::{Expr, FunctionArg, LambdaKind, Literal};
pub use operators::{BinOp, UnaryOp};
pub use query::{
    AggregateItem, AggregateMethod, ComputeItem, Direction, ExpandItem, ExpandOptions,
    OrderByItem, SearchExpr, SelectItem, Transformation,
};
pub use tokens::{LiteralKind, Token, TokenKind};
