use crate::ast::{BinOp, LiteralKind, UnaryOp};

/// A literal as it appeared in the source: its lexical category and raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub text: String,
}

impl Literal {
    pub fn new(kind: LiteralKind, text: impl Into<String>) -> Self {
        Literal {
            kind,
            text: text.into(),
        }
    }
}

/// Function argument; `name` is set for `name=value` arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArg {
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambdaKind {
    Any,
    All,
}

/// Untyped syntax tree for filter, orderby, compute and apply expressions.
///
/// Produced by the [parser](crate::parser) and consumed by the
/// [binder](crate::binder). Every node owns its children.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 'hello'
    /// 2012-09-01
    /// NS.Color'Red'
    /// ```
    Literal(Literal),

    /// Property or navigation reference, optionally relative to a parent path
    ///
    /// # Examples
    /// ```text
    /// Name             // Path { parent: None, name: "Name" }
    /// Address/City     // Path { parent: Some(Path("Address")), name: "City" }
    /// ```
    Path {
        parent: Option<Box<Expr>>,
        name: String,
    },

    /// Qualified type name used as a path segment (cast)
    ///
    /// # Example
    /// ```text
    /// NS.Manager/Budget
    /// ```
    TypeSegment {
        parent: Option<Box<Expr>>,
        name: String,
    },

    /// `$count` applied to a collection path
    Count(Box<Expr>),

    /// Built-in or model function call
    ///
    /// # Examples
    /// ```text
    /// startswith(Name, 'A')
    /// Orders/NS.Total(tax=1)
    /// ```
    FunctionCall {
        parent: Option<Box<Expr>>,
        name: String,
        args: Vec<FunctionArg>,
    },

    /// `any`/`all` over a collection path
    ///
    /// # Example
    /// ```text
    /// Orders/any(o: o/Amount gt 100)
    /// ```
    Lambda {
        kind: LambdaKind,
        source: Box<Expr>,
        variable: Option<String>,
        body: Option<Box<Expr>>,
    },

    /// Lambda variable, `$it` or `$this`
    RangeVariable(String),

    /// `@name`
    Alias(String),

    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// `( expr )`
    Parenthesized(Box<Expr>),

    /// `(a, b, c)` or a JSON array of primitives
    Collection(Vec<Expr>),

    /// JSON object or nested array
    Json(serde_json::Value),
}

impl Expr {
    pub fn path(name: impl Into<String>) -> Self {
        Expr::Path {
            parent: None,
            name: name.into(),
        }
    }

    pub fn literal(kind: LiteralKind, text: impl Into<String>) -> Self {
        Expr::Literal(Literal::new(kind, text))
    }

    /// Strips any number of enclosing parentheses.
    pub fn unparenthesized(&self) -> &Expr {
        match self {
            Expr::Parenthesized(inner) => inner.unparenthesized(),
            other => other,
        }
    }
}
