//! Syntax of the structured query options, before binding.

use crate::ast::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// One `$orderby` item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expression: Expr,
    pub direction: Direction,
}

/// One `$compute` item or `compute(...)` transformation item.
///
/// # Example
/// ```text
/// Price mul Quantity as Total
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeItem {
    pub expression: Expr,
    pub alias: String,
}

/// Aggregation methods of `aggregate(... with method as alias)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateMethod {
    Sum,
    Min,
    Max,
    Average,
    CountDistinct,
    /// Model-defined method, by qualified name
    Custom(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateItem {
    /// `expr with method as alias`
    Expression {
        expression: Expr,
        method: AggregateMethod,
        alias: String,
    },
    /// `$count as alias`
    Count { alias: String },
}

/// `$apply` transformation, in pipeline order.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformation {
    Filter(Expr),
    Compute(Vec<ComputeItem>),
    Aggregate(Vec<AggregateItem>),
    GroupBy {
        /// Grouping paths, each a `/`-separated property path
        properties: Vec<Expr>,
        aggregate: Option<Vec<AggregateItem>>,
    },
}

/// One `$select` item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// `NS.*`
    NamespaceWildcard(String),
    /// `Address/City`, `NS.Employee/Budget`, `NS.Action`
    Path(Vec<String>),
}

/// One `$expand` item with its nested options.
///
/// # Example
/// ```text
/// Orders($filter=Amount gt 10;$top=5)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandItem {
    /// Path segments; the last one is a navigation property, `*` for all
    pub path: Vec<String>,
    /// `/$ref` suffix
    pub reference: bool,
    pub options: ExpandOptions,
}

/// Raw nested options of an expand item, parsed lazily by the clause binder
/// because their meaning depends on the navigation target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpandOptions {
    pub filter: Option<String>,
    pub order_by: Option<String>,
    pub select: Option<String>,
    pub expand: Option<String>,
    pub top: Option<String>,
    pub skip: Option<String>,
    pub count: Option<String>,
    pub search: Option<String>,
    pub levels: Option<String>,
    pub compute: Option<String>,
}

/// `$search` syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchExpr {
    /// Word or phrase (quotes removed, escapes resolved)
    Term(String),
    And(Box<SearchExpr>, Box<SearchExpr>),
    Or(Box<SearchExpr>, Box<SearchExpr>),
    Not(Box<SearchExpr>),
}
