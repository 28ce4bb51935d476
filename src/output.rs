//! JSON rendering of bound trees and resolved paths.
//!
//! Meant for diagnostics and snapshot-style tests: every node becomes an
//! object tagged with `"kind"`, types are rendered by their qualified name.
//! Object keys come out sorted.
//!
//! # Examples
//!
//! ```
//! use odata_uri::model::{Primitive, TypeRef};
//! use odata_uri::node::QueryNode;
//! use odata_uri::output::to_json;
//! use odata_uri::Value;
//!
//! let node = QueryNode::constant(Value::Int32(42), Some(TypeRef::primitive(Primitive::Int32, false)), "42");
//! assert_eq!(
//!     to_json(&node),
//!     r#"{"kind":"constant","text":"42","type":"Edm.Int32","value":42}"#
//! );
//! ```

use serde_json::{Value as Json, json};

use crate::{
    ast::{BinOp, Direction, LambdaKind, UnaryOp},
    model::TypeRef,
    node::{FilterClause, OrderByClause, QueryNode, RangeVariable},
    path::{ODataPath, PathSegment},
    value::Value,
};

/// Types that have a JSON rendering.
pub trait ToJson {
    fn to_json_value(&self) -> Json;
}

pub fn to_json(value: &impl ToJson) -> String {
    value.to_json_value().to_string()
}

/// Two-space indented rendering.
pub fn to_json_pretty(value: &impl ToJson) -> String {
    // Serializing a `serde_json::Value` cannot fail.
    serde_json::to_string_pretty(&value.to_json_value()).unwrap_or_default()
}

fn type_name(type_ref: Option<&TypeRef>) -> Json {
    type_ref.map_or(Json::Null, |t| Json::String(t.full_name()))
}

fn operator(op: BinOp) -> &'static str {
    op.keyword()
}

fn parameters(items: &[(String, QueryNode)]) -> Json {
    items
        .iter()
        .map(|(name, node)| (name.clone(), node.to_json_value()))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

impl ToJson for Value {
    fn to_json_value(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Boolean(b) => json!(b),
            Value::Byte(n) => json!(n),
            Value::SByte(n) => json!(n),
            Value::Int16(n) => json!(n),
            Value::Int32(n) => json!(n),
            Value::Int64(n) => json!(n),
            Value::Single(n) => json!(n),
            Value::Double(n) => json!(n),
            Value::String(s) => json!(s),
            Value::Enum { value, text, .. } => json!({ "name": text, "value": value }),
            Value::Collection(items) => Json::Array(items.iter().map(ToJson::to_json_value).collect()),
            Value::Json(json) => json.clone(),
            // Decimals and the temporal types keep their literal form.
            other => Json::String(other.to_literal()),
        }
    }
}

impl ToJson for RangeVariable {
    fn to_json_value(&self) -> Json {
        json!({
            "name": self.name,
            "type": self.type_ref.full_name(),
            "source": self.navigation_source,
        })
    }
}

impl ToJson for QueryNode {
    fn to_json_value(&self) -> Json {
        let boxed = |node: &Option<Box<QueryNode>>| node.as_ref().map_or(Json::Null, |n| n.to_json_value());
        match self {
            QueryNode::Constant {
                value,
                type_ref,
                text,
            } => json!({
                "kind": "constant",
                "value": value.to_json_value(),
                "type": type_name(type_ref.as_ref()),
                "text": text,
            }),
            QueryNode::BinaryOperator {
                op,
                left,
                right,
                type_ref,
            } => json!({
                "kind": "binary",
                "operator": operator(*op),
                "left": left.to_json_value(),
                "right": right.to_json_value(),
                "type": type_name(type_ref.as_ref()),
            }),
            QueryNode::UnaryOperator { op, operand, type_ref } => json!({
                "kind": "unary",
                "operator": match op {
                    UnaryOp::Negate => "-",
                    UnaryOp::Not => "not",
                },
                "operand": operand.to_json_value(),
                "type": type_name(type_ref.as_ref()),
            }),
            QueryNode::Convert { source, type_ref } => json!({
                "kind": "convert",
                "source": source.to_json_value(),
                "type": type_ref.full_name(),
            }),
            QueryNode::PropertyAccess {
                source,
                property,
                type_ref,
            } => json!({
                "kind": "property",
                "name": property,
                "source": source.to_json_value(),
                "type": type_ref.full_name(),
            }),
            QueryNode::OpenPropertyAccess { source, name } => json!({
                "kind": "openProperty",
                "name": name,
                "source": source.to_json_value(),
            }),
            QueryNode::Navigation {
                source,
                property,
                type_ref,
                navigation_source,
            } => json!({
                "kind": "navigation",
                "name": property,
                "source": source.to_json_value(),
                "type": type_ref.full_name(),
                "navigationSource": navigation_source,
            }),
            QueryNode::ComputedReference { name, type_ref } => json!({
                "kind": "computed",
                "name": name,
                "type": type_name(type_ref.as_ref()),
            }),
            QueryNode::FunctionCall {
                name,
                arguments,
                type_ref,
            } => json!({
                "kind": "function",
                "name": name,
                "arguments": arguments.iter().map(ToJson::to_json_value).collect::<Vec<_>>(),
                "type": type_name(type_ref.as_ref()),
            }),
            QueryNode::OperationCall {
                name,
                source,
                parameters: params,
                type_ref,
            } => json!({
                "kind": "operation",
                "name": name,
                "source": boxed(source),
                "parameters": parameters(params),
                "type": type_name(type_ref.as_ref()),
            }),
            QueryNode::Cast { source, type_ref } => json!({
                "kind": "cast",
                "source": boxed(source),
                "type": type_ref.full_name(),
            }),
            QueryNode::IsOf { source, target } => json!({
                "kind": "isof",
                "source": boxed(source),
                "target": target.full_name(),
            }),
            QueryNode::ParameterAlias {
                name,
                type_ref,
                value,
            } => json!({
                "kind": "alias",
                "name": format!("@{name}"),
                "type": type_name(type_ref.as_ref()),
                "value": boxed(value),
            }),
            QueryNode::RangeVariable(variable) => json!({
                "kind": "rangeVariable",
                "variable": variable.to_json_value(),
            }),
            QueryNode::Lambda {
                kind,
                source,
                variable,
                body,
            } => json!({
                "kind": match kind {
                    LambdaKind::Any => "any",
                    LambdaKind::All => "all",
                },
                "source": source.to_json_value(),
                "variable": variable.as_ref().map_or(Json::Null, ToJson::to_json_value),
                "body": boxed(body),
            }),
            QueryNode::In { left, right } => json!({
                "kind": "in",
                "left": left.to_json_value(),
                "right": right.to_json_value(),
            }),
            QueryNode::Collection { items, type_ref } => json!({
                "kind": "collection",
                "items": items.iter().map(ToJson::to_json_value).collect::<Vec<_>>(),
                "type": type_ref.full_name(),
            }),
            QueryNode::Count { source } => json!({
                "kind": "count",
                "source": source.to_json_value(),
            }),
            QueryNode::TypeCast { source, type_ref } => json!({
                "kind": "typeCast",
                "source": source.to_json_value(),
                "type": type_ref.full_name(),
            }),
            QueryNode::SearchTerm(term) => json!({ "kind": "searchTerm", "text": term }),
        }
    }
}

impl ToJson for FilterClause {
    fn to_json_value(&self) -> Json {
        json!({
            "expression": self.expression.to_json_value(),
            "rangeVariable": self.range_variable.to_json_value(),
        })
    }
}

impl ToJson for OrderByClause {
    fn to_json_value(&self) -> Json {
        let items: Vec<Json> = self
            .items
            .iter()
            .map(|item| {
                json!({
                    "expression": item.expression.to_json_value(),
                    "direction": match item.direction {
                        Direction::Ascending => "asc",
                        Direction::Descending => "desc",
                    },
                })
            })
            .collect();
        json!({ "items": items, "rangeVariable": self.range_variable.to_json_value() })
    }
}

impl ToJson for PathSegment {
    fn to_json_value(&self) -> Json {
        match self {
            PathSegment::EntitySet { name, type_ref } => {
                json!({ "kind": "entitySet", "name": name, "type": type_ref.full_name() })
            }
            PathSegment::Singleton { name, type_ref } => {
                json!({ "kind": "singleton", "name": name, "type": type_ref.full_name() })
            }
            PathSegment::Key {
                keys,
                type_ref,
                navigation_source,
            } => json!({
                "kind": "key",
                "keys": parameters(keys),
                "type": type_ref.full_name(),
                "navigationSource": navigation_source,
            }),
            PathSegment::Navigation {
                property,
                type_ref,
                navigation_source,
            } => json!({
                "kind": "navigation",
                "name": property,
                "type": type_ref.full_name(),
                "navigationSource": navigation_source,
            }),
            PathSegment::NavigationLink {
                property,
                type_ref,
                navigation_source,
            } => json!({
                "kind": "navigationLink",
                "name": property,
                "type": type_ref.full_name(),
                "navigationSource": navigation_source,
            }),
            PathSegment::Reference => json!({ "kind": "ref" }),
            PathSegment::Property { name, type_ref } => {
                json!({ "kind": "property", "name": name, "type": type_ref.full_name() })
            }
            PathSegment::DynamicProperty { name } => json!({ "kind": "dynamicProperty", "name": name }),
            PathSegment::TypeCast { type_ref } => json!({ "kind": "typeCast", "type": type_ref.full_name() }),
            PathSegment::Operation {
                name,
                parameters: params,
                type_ref,
                navigation_source,
            } => json!({
                "kind": "operation",
                "name": name,
                "parameters": parameters(params),
                "type": type_name(type_ref.as_ref()),
                "navigationSource": navigation_source,
            }),
            PathSegment::OperationImport {
                name,
                operation,
                parameters: params,
                type_ref,
                navigation_source,
            } => json!({
                "kind": "operationImport",
                "name": name,
                "operation": operation,
                "parameters": parameters(params),
                "type": type_name(type_ref.as_ref()),
                "navigationSource": navigation_source,
            }),
            PathSegment::Value => json!({ "kind": "value" }),
            PathSegment::Count => json!({ "kind": "count" }),
            PathSegment::Each {
                type_ref,
                navigation_source,
            } => json!({
                "kind": "each",
                "type": type_ref.full_name(),
                "navigationSource": navigation_source,
            }),
            PathSegment::Filter {
                expression,
                type_ref,
                single,
            } => json!({
                "kind": "filter",
                "expression": expression.to_json_value(),
                "type": type_ref.full_name(),
                "single": single,
            }),
            PathSegment::Metadata => json!({ "kind": "metadata" }),
            PathSegment::Batch => json!({ "kind": "batch" }),
        }
    }
}

impl ToJson for ODataPath {
    fn to_json_value(&self) -> Json {
        json!({
            "segments": self.segments.iter().map(ToJson::to_json_value).collect::<Vec<_>>(),
            "type": type_name(self.type_ref.as_ref()),
            "navigationSource": self.navigation_source,
        })
    }
}
