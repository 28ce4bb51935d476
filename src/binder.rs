//! # Semantic Binder
//!
//! Turns untyped [`Expr`] trees into typed [`QueryNode`] trees against a
//! [`Model`]. The binder is a tree walker: each syntax node is bound in a
//! [`BindContext`] that holds the range variables in scope (`$it` first,
//! then one per enclosing lambda).
//!
//! Binding resolves:
//!
//! - identifiers to declared, navigation or open properties, or to `$compute`
//!   aliases
//! - built-in calls to one overload of the [function table](crate::functions)
//!   and model calls to an operation
//! - operator operands to compatible types, inserting [`QueryNode::Convert`]
//!   where a side is promoted
//! - `@alias` references through the shared [`AliasTable`]
//!
//! `null` literals bypass type checks and bind without a type.

use std::cell::Cell;

use thiserror::Error;
use tracing::trace;

use crate::{
    alias::{AliasError, AliasTable},
    ast::{BinOp, Expr, FunctionArg, LambdaKind, Literal, LiteralKind, SearchExpr, UnaryOp},
    functions::{self, OverloadMatch},
    literal::{self, LiteralError},
    model::{Model, Operation, Primitive, TypeKind, TypeRef},
    node::{FilterClause, QueryNode, RangeVariable},
    options::QueryOptionError,
    parser::{ParseError, Parser},
    settings::ParserSettings,
    value::Value,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Literal(#[from] LiteralError),

    #[error(transparent)]
    Alias(#[from] AliasError),

    #[error("Could not find a property named '{property}' on type '{type_name}'.")]
    PropertyNotDeclared { type_name: String, property: String },

    #[error("The property '{property}' cannot be accessed on a value of type '{type_name}'.")]
    PropertyOnNonStructured { type_name: String, property: String },

    #[error(
        "A binary operator with incompatible types was detected. Found operand types '{left}' and '{right}' for operator kind '{op}'."
    )]
    IncompatibleOperands {
        op: String,
        left: String,
        right: String,
    },

    #[error(
        "A unary operator with an incompatible type was detected. Found operand type '{operand}' for operator kind '{op}'."
    )]
    IncompatibleOperand { op: String, operand: String },

    #[error(
        "The left operand type '{left}' of the 'in' operator is not compatible with the collection element type '{element}' of the right operand."
    )]
    CollectionElementMismatch { left: String, element: String },

    #[error("The right operand of the 'in' operator must be a collection; found '{found}'.")]
    NotACollectionOperand { found: String },

    #[error(
        "The 'has' operator requires operands of the same enumeration type; found '{left}' and '{right}'."
    )]
    HasOperands { left: String, right: String },

    #[error("An unknown function with name '{name}' was found.")]
    UnknownFunction { name: String },

    #[error(
        "No function signature for the function with name '{name}' matches the specified arguments. The function signatures considered are: {signatures}."
    )]
    NoApplicableFunction { name: String, signatures: String },

    #[error("Enumeration type value can only be casted to or from string.")]
    CastEnum,

    #[error("Cast or IsOf Function must have a type in its arguments.")]
    CastMissingType,

    #[error("The type '{name}' is not defined in the model.")]
    UnknownType { name: String },

    #[error("The type '{target}' is not related to the type '{source_type}'.")]
    InvalidTypeCast { source_type: String, target: String },

    #[error("The '{segment}' segment can only follow a collection; found '{found}'.")]
    NotACollection { segment: String, found: String },

    #[error("The range variable '{name}' is not in scope.")]
    RangeVariableNotInScope { name: String },

    #[error("The expression of type '{found}' is not a boolean expression.")]
    NotBoolean { found: String },

    #[error("The parameter '{parameter}' of '{operation}' expects '{expected}' but was given '{found}'.")]
    ParameterTypeMismatch {
        operation: String,
        parameter: String,
        expected: String,
        found: String,
    },

    #[error("Cannot convert the value of parameter alias '@{name}' of type '{found}' to the expected type '{expected}'.")]
    AliasConversion {
        name: String,
        expected: String,
        found: String,
    },

    #[error("No operation '{name}' accepts the parameters '{parameters}'.")]
    NoMatchingOperation { name: String, parameters: String },

    #[error("Built-in function '{name}' does not accept named parameters.")]
    NamedArgumentsNotAllowed { name: String },

    #[error("The collection items of types '{first}' and '{second}' have no common type.")]
    MixedCollection { first: String, second: String },

    #[error("The aggregation alias or computed property '{name}' is declared more than once.")]
    DuplicateAlias { name: String },

    #[error(transparent)]
    Option(#[from] QueryOptionError),

    #[error("Cannot order by an expression of type '{found}'.")]
    NotSortable { found: String },

    #[error("'{path}' is not a valid select path: {reason}.")]
    SelectPath { path: String, reason: String },

    #[error("'{path}' is not a valid expand path: {reason}.")]
    ExpandPath { path: String, reason: String },

    #[error("The option '{option}' is not allowed on an expanded reference.")]
    InvalidExpandOption { option: String },

    #[error("The request exceeds the maximum expand depth of {max}.")]
    ExpandTooDeep { max: usize },

    #[error("The request exceeds the maximum number of expanded items ({max}).")]
    ExpandTooMany { max: usize },

    #[error("The aggregation method '{method}' cannot be applied to a value of type '{found}'.")]
    AggregateType { method: String, found: String },
}

/// Range variables in scope while binding.
#[derive(Debug, Clone)]
pub struct BindContext {
    range_variables: Vec<RangeVariable>,
}

impl BindContext {
    pub fn new(it: RangeVariable) -> Self {
        BindContext {
            range_variables: vec![it],
        }
    }

    /// Context for a lambda body: `variable` joins the enclosing scope.
    pub fn with_range_variable(&self, variable: RangeVariable) -> Self {
        let mut range_variables = self.range_variables.clone();
        range_variables.push(variable);
        BindContext { range_variables }
    }

    /// `$it`
    pub fn it(&self) -> &RangeVariable {
        &self.range_variables[0]
    }

    /// `$this`: the innermost range variable
    pub fn this(&self) -> &RangeVariable {
        self.range_variables.last().unwrap_or(self.it())
    }

    pub fn find(&self, name: &str) -> Option<&RangeVariable> {
        self.range_variables.iter().rev().find(|v| v.name == name)
    }

    /// Lambda variable names, for nested parsers.
    pub fn names(&self) -> Vec<String> {
        self.range_variables
            .iter()
            .skip(1)
            .map(|v| v.name.clone())
            .collect()
    }
}

/// Binds syntax trees of one request.
pub struct Binder<'a> {
    model: &'a dyn Model,
    settings: &'a ParserSettings,
    aliases: &'a AliasTable,
    computed: Vec<(String, Option<TypeRef>)>,
    /// Nesting of `bind` calls, alias values included
    depth: Cell<usize>,
}

fn name_of(type_ref: Option<&TypeRef>) -> String {
    type_ref.map_or_else(|| "<null>".to_string(), TypeRef::full_name)
}

fn boolean_node_type(nullable: bool) -> Option<TypeRef> {
    Some(TypeRef::boolean(nullable))
}

impl<'a> Binder<'a> {
    pub fn new(model: &'a dyn Model, settings: &'a ParserSettings, aliases: &'a AliasTable) -> Self {
        Binder {
            model,
            settings,
            aliases,
            computed: Vec::new(),
            depth: Cell::new(0),
        }
    }

    /// Makes `$compute` aliases resolvable as identifiers.
    pub fn with_computed(mut self, items: impl IntoIterator<Item = (String, Option<TypeRef>)>) -> Self {
        self.computed.extend(items);
        self
    }

    /// A binder that also sees `items` as computed aliases.
    pub fn scope(&self, items: impl IntoIterator<Item = (String, Option<TypeRef>)>) -> Binder<'a> {
        let mut computed = self.computed.clone();
        computed.extend(items);
        Binder {
            model: self.model,
            settings: self.settings,
            aliases: self.aliases,
            computed,
            depth: Cell::new(self.depth.get()),
        }
    }

    pub fn computed_aliases(&self) -> &[(String, Option<TypeRef>)] {
        &self.computed
    }

    pub fn model(&self) -> &'a dyn Model {
        self.model
    }

    pub fn settings(&self) -> &'a ParserSettings {
        self.settings
    }

    pub fn aliases(&self) -> &'a AliasTable {
        self.aliases
    }

    /// Parses `text` with the range variables of `ctx` in scope and binds it.
    pub fn bind_text(&self, text: &str, ctx: &BindContext) -> Result<QueryNode, BindError> {
        let expr = Parser::new(text, self.settings)?
            .with_range_variables(ctx.names())
            .parse()?;
        self.bind(&expr, ctx)
    }

    /// Binds `text` as a `$filter` over elements of `it`.
    pub fn bind_filter(&self, text: &str, it: RangeVariable) -> Result<FilterClause, BindError> {
        let ctx = BindContext::new(it.clone());
        let expr = Parser::new(text, self.settings)?.parse()?;
        let expression = self.bind_boolean(&expr, &ctx)?;
        Ok(FilterClause {
            expression,
            range_variable: it,
        })
    }

    /// Binds an expression that has to be boolean (or untyped).
    pub fn bind_boolean(&self, expr: &Expr, ctx: &BindContext) -> Result<QueryNode, BindError> {
        let node = self.bind(expr, ctx)?;
        match node.type_ref() {
            Some(t) if !t.is_boolean() && !t.is_untyped() => Err(BindError::NotBoolean {
                found: t.full_name(),
            }),
            _ => Ok(node),
        }
    }

    pub fn bind(&self, expr: &Expr, ctx: &BindContext) -> Result<QueryNode, BindError> {
        let depth = self.depth.get() + 1;
        if depth > self.settings.max_depth {
            return Err(ParseError::TooDeep.into());
        }
        self.depth.set(depth);
        let node = self.bind_expr(expr, ctx);
        self.depth.set(depth - 1);
        node
    }

    fn bind_expr(&self, expr: &Expr, ctx: &BindContext) -> Result<QueryNode, BindError> {
        match expr {
            Expr::Literal(literal) => self.bind_literal(literal),
            Expr::Alias(name) => self.bind_alias(name, None, ctx),
            Expr::Path { parent, name } => {
                if parent.is_none() {
                    if let Some((alias, type_ref)) = self.computed.iter().find(|(a, _)| a == name) {
                        return Ok(QueryNode::ComputedReference {
                            name: alias.clone(),
                            type_ref: type_ref.clone(),
                        });
                    }
                }
                let source = self.bind_parent(parent.as_deref(), ctx)?;
                self.bind_member(source, name)
            }
            Expr::TypeSegment { parent, name } => {
                let source = self.bind_parent(parent.as_deref(), ctx)?;
                self.bind_type_segment(source, name)
            }
            Expr::Count(source) => {
                let source = self.bind(source, ctx)?;
                match source.type_ref() {
                    Some(t) if t.is_collection() => Ok(QueryNode::Count {
                        source: Box::new(source),
                    }),
                    other => Err(BindError::NotACollection {
                        segment: "$count".to_string(),
                        found: name_of(other.as_ref()),
                    }),
                }
            }
            Expr::FunctionCall { parent, name, args } => {
                self.bind_call(parent.as_deref(), name, args, ctx)
            }
            Expr::Lambda {
                kind,
                source,
                variable,
                body,
            } => self.bind_lambda(*kind, source, variable.as_deref(), body.as_deref(), ctx),
            Expr::RangeVariable(name) => {
                let variable = match name.as_str() {
                    "$it" => Some(ctx.it()),
                    "$this" => Some(ctx.this()),
                    other => ctx.find(other),
                };
                variable
                    .cloned()
                    .map(QueryNode::RangeVariable)
                    .ok_or_else(|| BindError::RangeVariableNotInScope { name: name.clone() })
            }
            Expr::BinaryOp { op, left, right } => self.bind_binary(*op, left, right, ctx),
            Expr::UnaryOp { op, operand } => self.bind_unary(*op, operand, ctx),
            Expr::Parenthesized(inner) => self.bind(inner, ctx),
            Expr::Collection(items) => {
                let items = items
                    .iter()
                    .map(|item| self.bind(item, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                self.collection(items)
            }
            Expr::Json(value) => Ok(QueryNode::constant(
                Value::Json(value.clone()),
                Some(TypeRef::untyped()),
                value.to_string(),
            )),
        }
    }

    fn bind_parent(&self, parent: Option<&Expr>, ctx: &BindContext) -> Result<QueryNode, BindError> {
        match parent {
            Some(parent) => self.bind(parent, ctx),
            None => Ok(QueryNode::RangeVariable(ctx.it().clone())),
        }
    }

    pub fn bind_literal(&self, literal: &Literal) -> Result<QueryNode, BindError> {
        if literal.kind == LiteralKind::Typed {
            let prefix = literal::split_typed(&literal.text).map_or(literal.text.as_str(), |(p, _)| p);
            let enum_type = self
                .model
                .enum_type(prefix)
                .ok_or_else(|| BindError::UnknownType {
                    name: prefix.to_string(),
                })?;
            let value = literal::parse_enum(&literal.text, enum_type, self.settings.case_insensitive)?;
            return Ok(QueryNode::constant(
                value,
                Some(enum_type.type_ref(false)),
                literal.text.clone(),
            ));
        }
        let (value, type_ref) = literal::parse_literal(literal)?;
        Ok(QueryNode::constant(value, type_ref, literal.text.clone()))
    }

    /// Binds `@name`. With a `hint` the alias node takes the hinted type; the
    /// value keeps its own and is checked by the caller.
    pub fn bind_alias(
        &self,
        name: &str,
        hint: Option<&TypeRef>,
        ctx: &BindContext,
    ) -> Result<QueryNode, BindError> {
        let value = self.aliases.resolve_with(name, |text| {
            let node = self.bind_text(text, ctx)?;
            // `@a=@b` binds `@a` to whatever `@b` holds.
            Ok::<_, BindError>(match node {
                QueryNode::ParameterAlias {
                    value: Some(inner), ..
                } => *inner,
                other => other,
            })
        })?;
        let type_ref = match (hint, &value) {
            (Some(hint), _) => Some(hint.clone()),
            (None, Some(value)) => value.type_ref(),
            (None, None) => None,
        };
        Ok(QueryNode::ParameterAlias {
            name: name.to_string(),
            type_ref,
            value: value.map(Box::new),
        })
    }

    /// Property, navigation or open property `name` of `source`.
    fn bind_member(&self, source: QueryNode, name: &str) -> Result<QueryNode, BindError> {
        let ci = self.settings.case_insensitive;
        let source_type = source.type_ref();
        let Some(source_type) = source_type.filter(|t| !t.is_untyped()) else {
            return Ok(QueryNode::OpenPropertyAccess {
                source: Box::new(source),
                name: name.to_string(),
            });
        };
        let Some(type_name) = source_type.structured_name() else {
            return Err(BindError::PropertyOnNonStructured {
                type_name: source_type.full_name(),
                property: name.to_string(),
            });
        };

        if let Some(property) = self.model.find_property(type_name, name, ci) {
            return Ok(QueryNode::PropertyAccess {
                property: property.name.clone(),
                type_ref: property.type_ref.clone(),
                source: Box::new(source),
            });
        }
        if let Some(navigation) = self.model.find_navigation(type_name, name, ci) {
            let navigation_source = self.navigation_target(&source, &navigation.name);
            return Ok(QueryNode::Navigation {
                property: navigation.name.clone(),
                type_ref: navigation.type_ref(),
                navigation_source,
                source: Box::new(source),
            });
        }
        if self.model.is_open(type_name) {
            return Ok(QueryNode::OpenPropertyAccess {
                source: Box::new(source),
                name: name.to_string(),
            });
        }
        Err(BindError::PropertyNotDeclared {
            type_name: type_name.to_string(),
            property: name.to_string(),
        })
    }

    fn navigation_target(&self, source: &QueryNode, property: &str) -> Option<String> {
        let set = self.model.find_navigation_source(source.navigation_source()?)?;
        set.binding_target(property).map(str::to_string)
    }

    /// `NS.Derived` applied to a structured single value or collection.
    fn bind_type_segment(&self, source: QueryNode, name: &str) -> Result<QueryNode, BindError> {
        let target = self
            .model
            .structured_type(name)
            .ok_or_else(|| BindError::UnknownType {
                name: name.to_string(),
            })?;
        let source_type = source.type_ref();
        let element = source_type
            .as_ref()
            .map(|t| t.element_type().unwrap_or(t).clone());
        if let Some(current) = element.as_ref().and_then(TypeRef::structured_name) {
            if !self.model.derives_from(&target.name, current)
                && !self.model.derives_from(current, &target.name)
            {
                return Err(BindError::InvalidTypeCast {
                    source_type: current.to_string(),
                    target: target.name.clone(),
                });
            }
        }
        let single = target.type_ref(element.as_ref().is_none_or(|e| e.nullable));
        let type_ref = match source_type {
            Some(t) if t.is_collection() => TypeRef::collection(single.with_nullable(false)),
            _ => single,
        };
        Ok(QueryNode::TypeCast {
            source: Box::new(source),
            type_ref,
        })
    }

    fn bind_lambda(
        &self,
        kind: LambdaKind,
        source: &Expr,
        variable: Option<&str>,
        body: Option<&Expr>,
        ctx: &BindContext,
    ) -> Result<QueryNode, BindError> {
        let keyword = match kind {
            LambdaKind::Any => "any",
            LambdaKind::All => "all",
        };
        let source = self.bind(source, ctx)?;
        let element = match source.type_ref() {
            Some(t) if t.is_collection() => t.element_type().cloned().unwrap_or_else(TypeRef::untyped),
            Some(t) if t.is_untyped() => TypeRef::untyped(),
            None => TypeRef::untyped(),
            Some(other) => {
                return Err(BindError::NotACollection {
                    segment: keyword.to_string(),
                    found: other.full_name(),
                });
            }
        };
        let variable = variable.map(|name| RangeVariable {
            name: name.to_string(),
            type_ref: element,
            navigation_source: source.navigation_source().map(str::to_string),
        });
        let body = match (&variable, body) {
            (Some(v), Some(body)) => {
                let inner = ctx.with_range_variable(v.clone());
                Some(Box::new(self.bind_boolean(body, &inner)?))
            }
            _ => None,
        };
        Ok(QueryNode::Lambda {
            kind,
            source: Box::new(source),
            variable,
            body,
        })
    }

    fn collection(&self, items: Vec<QueryNode>) -> Result<QueryNode, BindError> {
        let mut element: Option<TypeRef> = None;
        let mut nullable = false;
        for item in &items {
            let Some(t) = item.type_ref() else {
                nullable = true;
                continue;
            };
            element = Some(match element {
                None => t,
                Some(current) if current.same_definition(&t) => current,
                Some(current) => match (current.as_primitive(), t.as_primitive()) {
                    (Some(a), Some(b)) if b.can_promote_to(a) => current,
                    (Some(a), Some(b)) if a.can_promote_to(b) => t,
                    _ => {
                        return Err(BindError::MixedCollection {
                            first: current.full_name(),
                            second: t.full_name(),
                        });
                    }
                },
            });
        }
        let element = element.unwrap_or_else(TypeRef::untyped);
        let items = items
            .into_iter()
            .map(|item| match item.type_ref() {
                Some(t) if !t.same_definition(&element) => item.convert_to(&element.with_nullable(t.nullable)),
                _ => item,
            })
            .collect();
        Ok(QueryNode::Collection {
            items,
            type_ref: TypeRef::collection(element.with_nullable(nullable || element.nullable)),
        })
    }

    fn bind_unary(&self, op: UnaryOp, operand: &Expr, ctx: &BindContext) -> Result<QueryNode, BindError> {
        let operand = self.bind(operand, ctx)?;
        let operand_type = operand.type_ref();
        let ok = match (&operand_type, op) {
            (None, _) => true,
            (Some(t), _) if t.is_untyped() => true,
            (Some(t), UnaryOp::Not) => t.is_boolean(),
            (Some(t), UnaryOp::Negate) => t.is_numeric() || t.is_primitive(Primitive::Duration),
        };
        if !ok {
            return Err(BindError::IncompatibleOperand {
                op: match op {
                    UnaryOp::Not => "Not",
                    UnaryOp::Negate => "Negate",
                }
                .to_string(),
                operand: name_of(operand_type.as_ref()),
            });
        }
        let type_ref = match op {
            UnaryOp::Not => boolean_node_type(operand_type.as_ref().is_none_or(|t| t.nullable)),
            UnaryOp::Negate => operand_type,
        };
        Ok(QueryNode::UnaryOperator {
            op,
            operand: Box::new(operand),
            type_ref,
        })
    }

    fn bind_binary(&self, op: BinOp, left: &Expr, right: &Expr, ctx: &BindContext) -> Result<QueryNode, BindError> {
        if op == BinOp::In {
            return self.bind_in(left, right, ctx);
        }
        let left = self.bind(left, ctx)?;
        let right = self.bind(right, ctx)?;
        let (left, right) = self.enum_operands(left, right)?;

        if op == BinOp::Has {
            return self.bind_has(left, right);
        }

        let (lt, rt) = (left.type_ref(), right.type_ref());
        let incompatible = || BindError::IncompatibleOperands {
            op: operator_name(op).to_string(),
            left: name_of(lt.as_ref()),
            right: name_of(rt.as_ref()),
        };
        let nullable = lt.as_ref().is_none_or(|t| t.nullable) || rt.as_ref().is_none_or(|t| t.nullable);

        // Untyped sides (null, open properties) take whatever the other side is.
        let (Some(l), Some(r)) = (lt.clone().filter(|t| !t.is_untyped()), rt.clone().filter(|t| !t.is_untyped())) else {
            let known = lt.clone().or(rt.clone()).filter(|t| !t.is_untyped());
            let type_ref = if op.is_arithmetic() {
                known.map(|t| t.with_nullable(true))
            } else {
                if op.is_logical() && known.as_ref().is_some_and(|t| !t.is_boolean()) {
                    return Err(incompatible());
                }
                boolean_node_type(true)
            };
            return Ok(binary(op, left, right, type_ref));
        };

        if op.is_logical() {
            if !l.is_boolean() || !r.is_boolean() {
                return Err(incompatible());
            }
            return Ok(binary(op, left, right, boolean_node_type(nullable)));
        }

        if op.is_equality() || op.is_relational() {
            if l.same_definition(&r) {
                if !comparable(&l, op) {
                    return Err(incompatible());
                }
                return Ok(binary(op, left, right, boolean_node_type(nullable)));
            }
            if l.is_entity() && r.is_entity() && op.is_equality() {
                return Ok(binary(op, left, right, boolean_node_type(nullable)));
            }
            let (left, right, _) = self
                .promote_numeric(left, right, &l, &r)
                .ok_or_else(incompatible)?;
            return Ok(binary(op, left, right, boolean_node_type(nullable)));
        }

        // Arithmetic
        if let Some(result) = temporal_arithmetic(op, &l, &r) {
            return Ok(binary(op, left, right, Some(TypeRef::primitive(result, nullable))));
        }
        let (left, right, common) = self
            .promote_numeric(left, right, &l, &r)
            .ok_or_else(incompatible)?;
        Ok(binary(op, left, right, Some(TypeRef::primitive(common, nullable))))
    }

    /// Brings two numeric operands to a common type. A Single or Double
    /// literal next to a Decimal is re-read as a Decimal.
    fn promote_numeric(
        &self,
        left: QueryNode,
        right: QueryNode,
        l: &TypeRef,
        r: &TypeRef,
    ) -> Option<(QueryNode, QueryNode, Primitive)> {
        let (a, b) = (l.as_primitive()?, r.as_primitive()?);
        if !a.is_numeric() || !b.is_numeric() {
            return None;
        }
        if a == b {
            return Some((left, right, a));
        }
        if b.can_promote_to(a) {
            return Some((left, right.convert_to(&TypeRef::primitive(a, r.nullable)), a));
        }
        if a.can_promote_to(b) {
            return Some((left.convert_to(&TypeRef::primitive(b, l.nullable)), right, b));
        }
        if a == Primitive::Decimal {
            return Some((left, decimal_literal(right)?, a));
        }
        if b == Primitive::Decimal {
            return Some((decimal_literal(left)?, right, b));
        }
        None
    }

    /// A string literal next to an enumeration operand becomes a member of
    /// that enumeration.
    fn enum_operands(&self, left: QueryNode, right: QueryNode) -> Result<(QueryNode, QueryNode), BindError> {
        let left_enum = left.type_ref().and_then(|t| t.enum_name().map(str::to_string));
        let right_enum = right.type_ref().and_then(|t| t.enum_name().map(str::to_string));
        match (left_enum, right_enum) {
            (Some(name), None) => {
                let right = self.string_to_enum(right, &name)?;
                Ok((left, right))
            }
            (None, Some(name)) => {
                let left = self.string_to_enum(left, &name)?;
                Ok((left, right))
            }
            _ => Ok((left, right)),
        }
    }

    fn string_to_enum(&self, node: QueryNode, enum_name: &str) -> Result<QueryNode, BindError> {
        let QueryNode::Constant {
            value: Value::String(_),
            text,
            ..
        } = &node
        else {
            return Ok(node);
        };
        let Some(enum_type) = self.model.enum_type(enum_name) else {
            return Ok(node);
        };
        let value = literal::parse_enum(text, enum_type, self.settings.case_insensitive)?;
        Ok(QueryNode::constant(value, Some(enum_type.type_ref(false)), text.clone()))
    }

    fn bind_has(&self, left: QueryNode, right: QueryNode) -> Result<QueryNode, BindError> {
        let (lt, rt) = (left.type_ref(), right.type_ref());
        match (lt.as_ref().and_then(TypeRef::enum_name), rt.as_ref().and_then(TypeRef::enum_name)) {
            (Some(a), Some(b)) if a == b => {
                let nullable = lt.as_ref().is_some_and(|t| t.nullable);
                Ok(binary(BinOp::Has, left, right, boolean_node_type(nullable)))
            }
            (Some(_), None) if right.is_null_literal() => {
                Ok(binary(BinOp::Has, left, right, boolean_node_type(true)))
            }
            _ => Err(BindError::HasOperands {
                left: name_of(lt.as_ref()),
                right: name_of(rt.as_ref()),
            }),
        }
    }

    fn bind_in(&self, left: &Expr, right: &Expr, ctx: &BindContext) -> Result<QueryNode, BindError> {
        let left = self.bind(left, ctx)?;
        // `x in (1)` parses as a parenthesized value
        let right = match right {
            Expr::Parenthesized(inner) => self.collection(vec![self.bind(inner, ctx)?])?,
            other => self.bind(other, ctx)?,
        };
        let right_type = right.type_ref();
        let element = match right_type.as_ref() {
            Some(t) if t.is_collection() => t.element_type().cloned(),
            None => None,
            Some(t) if t.is_untyped() => None,
            Some(other) => {
                return Err(BindError::NotACollectionOperand {
                    found: other.full_name(),
                });
            }
        };
        let left_type = left.type_ref().filter(|t| !t.is_untyped());

        let (left, right) = match (left_type, element.filter(|e| !e.is_untyped())) {
            (Some(l), Some(e)) if !l.same_definition(&e) => {
                if let Some(enum_name) = l.enum_name() {
                    (left, self.enum_collection(right, enum_name, &e, &l)?)
                } else {
                    let mismatch = || BindError::CollectionElementMismatch {
                        left: l.full_name(),
                        element: e.full_name(),
                    };
                    let (a, b) = (
                        l.as_primitive().ok_or_else(mismatch)?,
                        e.as_primitive().ok_or_else(mismatch)?,
                    );
                    if a.can_promote_to(b) {
                        (left.convert_to(&e.with_nullable(l.nullable)), right)
                    } else if b.can_promote_to(a) {
                        (left, convert_items(right, &l))
                    } else {
                        return Err(mismatch());
                    }
                }
            }
            _ => (left, right),
        };
        Ok(QueryNode::In {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// String items of a literal collection tested against an enum value.
    fn enum_collection(
        &self,
        right: QueryNode,
        enum_name: &str,
        element: &TypeRef,
        left: &TypeRef,
    ) -> Result<QueryNode, BindError> {
        let QueryNode::Collection { items, .. } = right else {
            return Err(BindError::CollectionElementMismatch {
                left: left.full_name(),
                element: element.full_name(),
            });
        };
        if !element.is_string() {
            return Err(BindError::CollectionElementMismatch {
                left: left.full_name(),
                element: element.full_name(),
            });
        }
        let items = items
            .into_iter()
            .map(|item| self.string_to_enum(item, enum_name))
            .collect::<Result<Vec<_>, _>>()?;
        self.collection(items)
    }

    fn bind_call(
        &self,
        parent: Option<&Expr>,
        name: &str,
        args: &[FunctionArg],
        ctx: &BindContext,
    ) -> Result<QueryNode, BindError> {
        if parent.is_none() {
            match name {
                "cast" | "isof" => return self.bind_cast(name, args, ctx),
                _ => {}
            }
            if let Some(signatures) = functions::lookup(name) {
                return self.bind_builtin(name, signatures, args, ctx);
            }
        }

        let operations = self.find_functions(name);
        if operations.is_empty() {
            return Err(BindError::UnknownFunction {
                name: name.to_string(),
            });
        }
        let source = match parent {
            Some(parent) => Some(self.bind(parent, ctx)?),
            None => None,
        };
        self.bind_operation(name, &operations, source, args, ctx)
    }

    fn find_functions(&self, name: &str) -> Vec<&'a Operation> {
        if !name.contains('.') && !self.settings.unqualified_operations {
            return Vec::new();
        }
        self.model
            .find_operations(name, self.settings.case_insensitive)
            .into_iter()
            .filter(|op| op.is_function())
            .collect()
    }

    fn bind_builtin(
        &self,
        name: &str,
        signatures: &'static [functions::FunctionSignature],
        args: &[FunctionArg],
        ctx: &BindContext,
    ) -> Result<QueryNode, BindError> {
        if args.iter().any(|a| a.name.is_some()) {
            return Err(BindError::NamedArgumentsNotAllowed {
                name: name.to_string(),
            });
        }
        let arguments = args
            .iter()
            .map(|a| self.bind(&a.value, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        let types: Vec<Option<TypeRef>> = arguments.iter().map(QueryNode::type_ref).collect();

        let signature = match functions::select_overload(signatures, |s| s.parameters.as_slice(), &types) {
            OverloadMatch::Found(signature) => signature,
            OverloadMatch::NoMatch | OverloadMatch::Ambiguous => {
                return Err(BindError::NoApplicableFunction {
                    name: name.to_string(),
                    signatures: functions::describe(signatures),
                });
            }
        };
        trace!(function = name, signature = %signature, "overload selected");

        let arguments = arguments
            .into_iter()
            .zip(&signature.parameters)
            .map(|(arg, param)| match arg.type_ref() {
                Some(t) if t.same_definition(param) => arg,
                _ => arg.convert_to(param),
            })
            .collect();
        Ok(QueryNode::FunctionCall {
            name: name.to_string(),
            arguments,
            type_ref: Some(signature.return_type.clone()),
        })
    }

    /// `cast(T)`, `cast(x, T)`, `isof(T)`, `isof(x, T)`
    fn bind_cast(&self, name: &str, args: &[FunctionArg], ctx: &BindContext) -> Result<QueryNode, BindError> {
        let (source, type_arg) = match args {
            [type_arg] => (None, type_arg),
            [source, type_arg] => (Some(self.bind(&source.value, ctx)?), type_arg),
            _ => return Err(BindError::CastMissingType),
        };
        let type_name = match type_arg.value.unparenthesized() {
            Expr::TypeSegment { parent: None, name } => name.clone(),
            Expr::Literal(Literal {
                kind: LiteralKind::String,
                text,
            }) => literal::unquote(text).unwrap_or_default(),
            _ => return Err(BindError::CastMissingType),
        };
        let target = self
            .model
            .resolve_type(&type_name)
            .ok_or(BindError::CastMissingType)?;

        if name == "isof" {
            return Ok(QueryNode::IsOf {
                source: source.map(Box::new),
                target,
            });
        }

        let source_type = match &source {
            Some(node) => node.type_ref(),
            None => Some(ctx.it().type_ref.clone()),
        };
        let from_enum = source_type.as_ref().is_some_and(|t| t.enum_name().is_some());
        let to_enum = target.enum_name().is_some();
        let source_is_string = source_type.as_ref().is_none_or(|t| t.is_string() || t.is_untyped());
        if (from_enum && !target.is_string()) || (to_enum && !source_is_string) {
            return Err(BindError::CastEnum);
        }
        Ok(QueryNode::Cast {
            source: source.map(Box::new),
            type_ref: target,
        })
    }

    fn bind_operation(
        &self,
        name: &str,
        candidates: &[&'a Operation],
        source: Option<QueryNode>,
        args: &[FunctionArg],
        ctx: &BindContext,
    ) -> Result<QueryNode, BindError> {
        let binding_type = match &source {
            Some(node) => node.type_ref(),
            None => Some(ctx.it().type_ref.clone()),
        };
        let arg_names: Vec<&str> = args.iter().filter_map(|a| a.name.as_deref()).collect();
        let operation = candidates
            .iter()
            .filter(|op| match (&op.binding, &binding_type) {
                (Some(binding), Some(actual)) => self.accepts_binding(binding, actual),
                (Some(_), None) => false,
                (None, _) => source.is_none(),
            })
            .find(|op| {
                op.parameters.len() == args.len()
                    && op
                        .parameters
                        .iter()
                        .all(|p| arg_names.iter().any(|n| self.names_match(&p.name, n)))
            })
            .ok_or_else(|| BindError::NoMatchingOperation {
                name: name.to_string(),
                parameters: arg_names.join(","),
            })?;

        if args.iter().any(|a| a.name.is_none()) {
            return Err(BindError::NoMatchingOperation {
                name: name.to_string(),
                parameters: String::new(),
            });
        }

        let mut parameters = Vec::with_capacity(args.len());
        for parameter in &operation.parameters {
            let Some(arg) = args
                .iter()
                .find(|a| a.name.as_deref().is_some_and(|n| self.names_match(&parameter.name, n)))
            else {
                continue;
            };
            let node = self.bind_parameter_value(&arg.value, &operation.name, &parameter.name, &parameter.type_ref, ctx)?;
            parameters.push((parameter.name.clone(), node));
        }

        trace!(operation = %operation.name, "operation selected");
        let source = match (&operation.binding, source) {
            (Some(_), None) => Some(QueryNode::RangeVariable(ctx.it().clone())),
            (_, source) => source,
        };
        Ok(QueryNode::OperationCall {
            name: operation.name.clone(),
            source: source.map(Box::new),
            parameters,
            type_ref: operation.return_type.clone(),
        })
    }

    fn names_match(&self, declared: &str, requested: &str) -> bool {
        crate::model::names_match(declared, requested, self.settings.case_insensitive)
    }

    /// Whether a value of type `actual` can be passed as binding parameter
    /// of type `binding`.
    pub fn accepts_binding(&self, binding: &TypeRef, actual: &TypeRef) -> bool {
        match (&binding.kind, &actual.kind) {
            (TypeKind::Collection(b), TypeKind::Collection(a)) => self.accepts_binding(b, a),
            (TypeKind::Collection(_), _) | (_, TypeKind::Collection(_)) => false,
            _ => match (binding.structured_name(), actual.structured_name()) {
                (Some(b), Some(a)) => self.model.derives_from(a, b),
                _ => binding.same_definition(actual),
            },
        }
    }

    /// Binds an operation parameter or key value of type `expected`.
    ///
    /// Literals are read directly as `expected` when they fit, so `1` can
    /// fill an `Edm.Int16` parameter. Alias values are not re-read: an alias
    /// whose value has a wider type than the parameter fails.
    pub fn bind_parameter_value(
        &self,
        expr: &Expr,
        operation: &str,
        parameter: &str,
        expected: &TypeRef,
        ctx: &BindContext,
    ) -> Result<QueryNode, BindError> {
        match expr.unparenthesized() {
            Expr::Literal(lit) if lit.kind != LiteralKind::Null && lit.kind != LiteralKind::Typed => {
                if let Some(node) = self.literal_as(lit, expected) {
                    return Ok(node);
                }
            }
            Expr::Alias(name) => {
                let node = self.bind_alias(name, Some(expected), ctx)?;
                if let QueryNode::ParameterAlias {
                    value: Some(value), ..
                } = &node
                {
                    if let Some(found) = value.type_ref() {
                        if functions::conversion_cost(Some(&found), expected).is_none()
                            && !(found.is_untyped() || expected.is_untyped())
                        {
                            return Err(BindError::AliasConversion {
                                name: name.clone(),
                                expected: expected.full_name(),
                                found: found.full_name(),
                            });
                        }
                    }
                }
                return Ok(node);
            }
            _ => {}
        }

        let node = self.bind(expr, ctx)?;
        let node = match expected.enum_name() {
            Some(enum_name) => self.string_to_enum(node, enum_name)?,
            None => node,
        };
        match node.type_ref() {
            None => Ok(node),
            Some(found) if found.is_untyped() || expected.is_untyped() => Ok(node),
            Some(found) if found.same_definition(expected) => Ok(node),
            Some(found) if functions::conversion_cost(Some(&found), expected).is_some() => {
                Ok(node.convert_to(expected))
            }
            Some(found) if self.accepts_binding(expected, &found) => Ok(node),
            Some(found) => Err(BindError::ParameterTypeMismatch {
                operation: operation.to_string(),
                parameter: parameter.to_string(),
                expected: expected.full_name(),
                found: found.full_name(),
            }),
        }
    }

    fn literal_as(&self, lit: &Literal, expected: &TypeRef) -> Option<QueryNode> {
        if let Some(enum_name) = expected.enum_name() {
            let enum_type = self.model.enum_type(enum_name)?;
            let value = literal::parse_enum(&lit.text, enum_type, self.settings.case_insensitive).ok()?;
            return Some(QueryNode::constant(value, Some(enum_type.type_ref(false)), lit.text.clone()));
        }
        expected.as_primitive()?;
        let value = literal::try_parse(&lit.text, expected).ok()?;
        Some(QueryNode::constant(
            value,
            Some(expected.with_nullable(false)),
            lit.text.clone(),
        ))
    }

    /// `$search` tree as query nodes.
    pub fn bind_search(&self, expr: &SearchExpr) -> QueryNode {
        match expr {
            SearchExpr::Term(term) => QueryNode::SearchTerm(term.clone()),
            SearchExpr::And(left, right) | SearchExpr::Or(left, right) => {
                let op = if matches!(expr, SearchExpr::And(..)) {
                    BinOp::And
                } else {
                    BinOp::Or
                };
                binary(
                    op,
                    self.bind_search(left),
                    self.bind_search(right),
                    boolean_node_type(false),
                )
            }
            SearchExpr::Not(operand) => QueryNode::UnaryOperator {
                op: UnaryOp::Not,
                operand: Box::new(self.bind_search(operand)),
                type_ref: boolean_node_type(false),
            },
        }
    }
}

fn binary(op: BinOp, left: QueryNode, right: QueryNode, type_ref: Option<TypeRef>) -> QueryNode {
    QueryNode::BinaryOperator {
        op,
        left: Box::new(left),
        right: Box::new(right),
        type_ref,
    }
}

fn operator_name(op: BinOp) -> &'static str {
    match op {
        BinOp::Or => "Or",
        BinOp::And => "And",
        BinOp::Equal => "Equal",
        BinOp::NotEqual => "NotEqual",
        BinOp::GreaterThan => "GreaterThan",
        BinOp::GreaterEqual => "GreaterThanOrEqual",
        BinOp::LessThan => "LessThan",
        BinOp::LessEqual => "LessThanOrEqual",
        BinOp::Has => "Has",
        BinOp::In => "In",
        BinOp::Add => "Add",
        BinOp::Subtract => "Subtract",
        BinOp::Multiply => "Multiply",
        BinOp::Divide => "Divide",
        BinOp::Modulo => "Modulo",
    }
}

/// Whether two values of type `t` can be compared with `op`.
fn comparable(t: &TypeRef, op: BinOp) -> bool {
    match &t.kind {
        TypeKind::Primitive(p) => {
            !(p.is_spatial() || *p == Primitive::Stream)
                && (op.is_equality() || *p != Primitive::Binary)
        }
        TypeKind::Enum(_) | TypeKind::Untyped => true,
        TypeKind::Entity(_) | TypeKind::Complex(_) => op.is_equality(),
        TypeKind::Collection(_) => false,
    }
}

/// Result type of date/time arithmetic, `None` when `op` is not one of the
/// temporal forms.
fn temporal_arithmetic(op: BinOp, l: &TypeRef, r: &TypeRef) -> Option<Primitive> {
    use Primitive::*;
    let (a, b) = (l.as_primitive()?, r.as_primitive()?);
    match (op, a, b) {
        (BinOp::Add | BinOp::Subtract, DateTimeOffset, Duration) => Some(DateTimeOffset),
        (BinOp::Add | BinOp::Subtract, Date, Duration) => Some(Date),
        (BinOp::Add | BinOp::Subtract, Duration, Duration) => Some(Duration),
        (BinOp::Add, Duration, DateTimeOffset) => Some(DateTimeOffset),
        (BinOp::Add, Duration, Date) => Some(Date),
        (BinOp::Subtract, DateTimeOffset, DateTimeOffset) => Some(Duration),
        (BinOp::Subtract, Date, Date) => Some(Duration),
        _ => None,
    }
}

/// A Single or Double literal re-read as Decimal.
fn decimal_literal(node: QueryNode) -> Option<QueryNode> {
    let QueryNode::Constant {
        value: Value::Single(_) | Value::Double(_),
        text,
        ..
    } = &node
    else {
        return None;
    };
    let decimal = TypeRef::primitive(Primitive::Decimal, false);
    let digits = text.trim_end_matches(['f', 'F', 'd', 'D']);
    let value = literal::try_parse(digits, &decimal).ok()?;
    Some(QueryNode::constant(value, Some(decimal), text.clone()))
}

fn convert_items(collection: QueryNode, element: &TypeRef) -> QueryNode {
    match collection {
        QueryNode::Collection { items, type_ref } => {
            let nullable = type_ref.element_type().is_some_and(|e| e.nullable);
            QueryNode::Collection {
                items: items
                    .into_iter()
                    .map(|item| {
                        if item.is_null_literal() {
                            item
                        } else {
                            item.convert_to(&element.with_nullable(false))
                        }
                    })
                    .collect(),
                type_ref: TypeRef::collection(element.with_nullable(nullable)),
            }
        }
        other => other,
    }
}
