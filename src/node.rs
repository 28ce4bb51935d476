//! # Bound Query Nodes
//!
//! The typed trees produced by the [binder](crate::binder). Every node knows
//! its [`TypeRef`] except `null` literals and open (dynamic) property
//! accesses, whose type is only known at evaluation time.

use crate::{
    ast::{AggregateMethod, BinOp, Direction, LambdaKind, UnaryOp},
    model::{Primitive, TypeRef},
    value::Value,
};

/// A lambda variable, `$it` or `$this`, with the type of the element it
/// ranges over.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeVariable {
    pub name: String,
    pub type_ref: TypeRef,
    /// Entity set or singleton the variable ranges over, when known
    pub navigation_source: Option<String>,
}

impl RangeVariable {
    pub fn it(type_ref: TypeRef, navigation_source: Option<String>) -> Self {
        RangeVariable {
            name: "$it".to_string(),
            type_ref,
            navigation_source,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Constant {
        value: Value,
        /// `None` for `null`
        type_ref: Option<TypeRef>,
        /// Source text of the literal
        text: String,
    },

    BinaryOperator {
        op: BinOp,
        left: Box<QueryNode>,
        right: Box<QueryNode>,
        type_ref: Option<TypeRef>,
    },

    UnaryOperator {
        op: UnaryOp,
        operand: Box<QueryNode>,
        type_ref: Option<TypeRef>,
    },

    /// Implicit conversion inserted for promotion or untyped values
    Convert {
        source: Box<QueryNode>,
        type_ref: TypeRef,
    },

    /// Declared structural property, single- or collection-valued
    PropertyAccess {
        source: Box<QueryNode>,
        property: String,
        type_ref: TypeRef,
    },

    /// Undeclared property of an open type
    OpenPropertyAccess {
        source: Box<QueryNode>,
        name: String,
    },

    Navigation {
        source: Box<QueryNode>,
        property: String,
        type_ref: TypeRef,
        navigation_source: Option<String>,
    },

    /// Reference to a `$compute` alias
    ComputedReference {
        name: String,
        type_ref: Option<TypeRef>,
    },

    /// Built-in function
    FunctionCall {
        name: String,
        arguments: Vec<QueryNode>,
        type_ref: Option<TypeRef>,
    },

    /// Model function, optionally bound to `source`
    OperationCall {
        /// Qualified operation name
        name: String,
        source: Option<Box<QueryNode>>,
        parameters: Vec<(String, QueryNode)>,
        type_ref: Option<TypeRef>,
    },

    /// `cast(x, T)`; `source` is `None` when the range variable is cast
    Cast {
        source: Option<Box<QueryNode>>,
        type_ref: TypeRef,
    },

    /// `isof(x, T)`
    IsOf {
        source: Option<Box<QueryNode>>,
        target: TypeRef,
    },

    /// `@name`; `value` is `None` when the alias was never given a value
    ParameterAlias {
        name: String,
        type_ref: Option<TypeRef>,
        value: Option<Box<QueryNode>>,
    },

    RangeVariable(RangeVariable),

    Lambda {
        kind: LambdaKind,
        source: Box<QueryNode>,
        variable: Option<RangeVariable>,
        body: Option<Box<QueryNode>>,
    },

    /// `left in right`
    In {
        left: Box<QueryNode>,
        right: Box<QueryNode>,
    },

    Collection {
        items: Vec<QueryNode>,
        type_ref: TypeRef,
    },

    /// `path/$count`
    Count {
        source: Box<QueryNode>,
    },

    /// Type segment inside an expression, e.g. `NS.Manager/Budget`
    TypeCast {
        source: Box<QueryNode>,
        type_ref: TypeRef,
    },

    /// Word or phrase of `$search`; combined with `and`/`or`/`not` operator
    /// nodes
    SearchTerm(String),
}

impl QueryNode {
    /// Resolved type, `None` for `null` literals and open properties.
    pub fn type_ref(&self) -> Option<TypeRef> {
        let boolean = || Some(TypeRef::boolean(false));
        match self {
            QueryNode::Constant { type_ref, .. }
            | QueryNode::BinaryOperator { type_ref, .. }
            | QueryNode::UnaryOperator { type_ref, .. }
            | QueryNode::ComputedReference { type_ref, .. }
            | QueryNode::FunctionCall { type_ref, .. }
            | QueryNode::OperationCall { type_ref, .. }
            | QueryNode::ParameterAlias { type_ref, .. } => type_ref.clone(),
            QueryNode::Convert { type_ref, .. }
            | QueryNode::PropertyAccess { type_ref, .. }
            | QueryNode::Navigation { type_ref, .. }
            | QueryNode::Cast { type_ref, .. }
            | QueryNode::Collection { type_ref, .. }
            | QueryNode::TypeCast { type_ref, .. } => Some(type_ref.clone()),
            QueryNode::RangeVariable(variable) => Some(variable.type_ref.clone()),
            QueryNode::OpenPropertyAccess { .. } => None,
            QueryNode::IsOf { .. }
            | QueryNode::Lambda { .. }
            | QueryNode::In { .. }
            | QueryNode::SearchTerm(_) => boolean(),
            QueryNode::Count { .. } => Some(TypeRef::primitive(Primitive::Int64, false)),
        }
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self, QueryNode::Constant { value: Value::Null, .. })
    }

    /// Navigation source of entity-valued nodes.
    pub fn navigation_source(&self) -> Option<&str> {
        match self {
            QueryNode::Navigation {
                navigation_source, ..
            } => navigation_source.as_deref(),
            QueryNode::RangeVariable(variable) => variable.navigation_source.as_deref(),
            QueryNode::TypeCast { source, .. } => source.navigation_source(),
            _ => None,
        }
    }

    pub fn constant(value: Value, type_ref: Option<TypeRef>, text: impl Into<String>) -> Self {
        QueryNode::Constant {
            value,
            type_ref,
            text: text.into(),
        }
    }

    /// Wraps `self` in a conversion unless it already has `target`'s type.
    pub fn convert_to(self, target: &TypeRef) -> QueryNode {
        match self.type_ref() {
            Some(current) if current == *target => self,
            _ => QueryNode::Convert {
                source: Box::new(self),
                type_ref: target.clone(),
            },
        }
    }
}

/// Bound `$filter`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub expression: QueryNode,
    pub range_variable: RangeVariable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderingNode {
    pub expression: QueryNode,
    pub direction: Direction,
}

/// Bound `$orderby`, most significant item first.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub items: Vec<OrderingNode>,
    pub range_variable: RangeVariable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedNode {
    pub expression: QueryNode,
    pub alias: String,
    pub type_ref: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeClause {
    pub items: Vec<ComputedNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchClause {
    pub expression: QueryNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateNode {
    Expression {
        expression: QueryNode,
        method: AggregateMethod,
        alias: String,
        type_ref: Option<TypeRef>,
    },
    Count {
        alias: String,
    },
}

impl AggregateNode {
    pub fn alias(&self) -> &str {
        match self {
            AggregateNode::Expression { alias, .. } | AggregateNode::Count { alias } => alias,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformationNode {
    Filter(QueryNode),
    Compute(Vec<ComputedNode>),
    Aggregate(Vec<AggregateNode>),
    GroupBy {
        properties: Vec<QueryNode>,
        aggregate: Option<Vec<AggregateNode>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyClause {
    pub transformations: Vec<TransformationNode>,
}

/// `$levels`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Levels {
    Max,
    Count(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectedItem {
    /// `*`
    Wildcard,
    /// `NS.*`: every operation of the namespace
    NamespaceWildcard(String),
    /// Structural property path, possibly through complex properties and
    /// type casts
    Property {
        path: Vec<String>,
        type_ref: Option<TypeRef>,
    },
    /// Navigation property selected without being expanded
    Navigation { path: Vec<String> },
    /// Bound operation
    Operation(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedItem {
    /// Segments leading to the navigation property, type casts included
    pub path: Vec<String>,
    pub navigation_property: String,
    /// Qualified name of the target entity type
    pub target_type: String,
    pub navigation_source: Option<String>,
    /// Expanded with `/$ref`
    pub reference: bool,
    pub filter: Option<FilterClause>,
    pub order_by: Option<OrderByClause>,
    pub select_expand: Option<Box<SelectExpandClause>>,
    pub top: Option<i64>,
    pub skip: Option<i64>,
    pub count: Option<bool>,
    pub search: Option<SearchClause>,
    pub levels: Option<Levels>,
    pub compute: Option<ComputeClause>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectExpandClause {
    /// No `$select`, or `$select=*`
    pub all_selected: bool,
    pub selected: Vec<SelectedItem>,
    pub expanded: Vec<ExpandedItem>,
}
