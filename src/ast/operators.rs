/// Binary operators, in the order of the grammar's precedence levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Logical
    /// Logical OR (`or`)
    Or,
    /// Logical AND (`and`)
    And,

    // Equality
    /// Equal (`eq`)
    Equal,
    /// Not equal (`ne`)
    NotEqual,

    // Relational
    /// Greater than (`gt`)
    GreaterThan,
    /// Greater than or equal (`ge`)
    GreaterEqual,
    /// Less than (`lt`)
    LessThan,
    /// Less than or equal (`le`)
    LessEqual,
    /// Enumeration flag test (`has`)
    Has,
    /// Collection membership (`in`)
    In,

    // Arithmetic
    /// Addition (`add`)
    Add,
    /// Subtraction (`sub`)
    Subtract,
    /// Multiplication (`mul`)
    Multiply,
    /// Division (`div`)
    Divide,
    /// Modulo (`mod`)
    Modulo,
}

impl BinOp {
    pub fn from_keyword(keyword: &str) -> Option<BinOp> {
        Some(match keyword {
            "or" => BinOp::Or,
            "and" => BinOp::And,
            "eq" => BinOp::Equal,
            "ne" => BinOp::NotEqual,
            "gt" => BinOp::GreaterThan,
            "ge" => BinOp::GreaterEqual,
            "lt" => BinOp::LessThan,
            "le" => BinOp::LessEqual,
            "has" => BinOp::Has,
            "in" => BinOp::In,
            "add" => BinOp::Add,
            "sub" => BinOp::Subtract,
            "mul" => BinOp::Multiply,
            "div" => BinOp::Divide,
            "mod" => BinOp::Modulo,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Equal => "eq",
            BinOp::NotEqual => "ne",
            BinOp::GreaterThan => "gt",
            BinOp::GreaterEqual => "ge",
            BinOp::LessThan => "lt",
            BinOp::LessEqual => "le",
            BinOp::Has => "has",
            BinOp::In => "in",
            BinOp::Add => "add",
            BinOp::Subtract => "sub",
            BinOp::Multiply => "mul",
            BinOp::Divide => "div",
            BinOp::Modulo => "mod",
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::Or | BinOp::And)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinOp::Equal | BinOp::NotEqual)
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinOp::GreaterThan | BinOp::GreaterEqual | BinOp::LessThan | BinOp::LessEqual
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide | BinOp::Modulo
        )
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation (`-`)
    Negate,
    /// Logical negation (`not`)
    Not,
}

/// Keywords the lexer reports as [`TokenKind::Operator`](crate::ast::TokenKind::Operator)
/// in expression mode.
pub const OPERATOR_KEYWORDS: [&str; 16] = [
    "eq", "ne", "gt", "ge", "lt", "le", "and", "or", "not", "has", "in", "add", "sub", "mul",
    "div", "mod",
];

/// Keywords of the free-text search grammar. Case-sensitive.
pub const SEARCH_KEYWORDS: [&str; 3] = ["AND", "OR", "NOT"];
