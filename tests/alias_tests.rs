// tests/alias_tests.rs

mod common;

use odata_uri::alias::AliasTable;
use odata_uri::binder::{BindError, Binder};
use odata_uri::node::QueryNode;
use odata_uri::{AliasError, ParserSettings, Value};

use common::{context, model, with_binder};

// ============================================================================
// Table
// ============================================================================

#[test]
fn test_from_pairs_keeps_only_aliases() {
    let table = AliasTable::from_pairs([("@a", Some("1")), ("$top", Some("2")), ("b", Some("3")), ("@c", None)], 8);
    let names: Vec<&str> = table.names().collect();
    assert_eq!(names, vec!["a", "c"]);
    assert_eq!(table.raw_value("a"), Some("1"));
    assert_eq!(table.raw_value("c"), None);
    assert!(table.contains("c"));
}

#[test]
fn test_redeclaration_replaces_value() {
    let mut table = AliasTable::new(8);
    table.declare("@a", Some("1"));
    table.declare("a", Some("2"));
    assert_eq!(table.raw_value("a"), Some("2"));
}

#[test]
fn test_text_chain_depth() {
    let table = AliasTable::from_pairs([("@a", Some("@b")), ("@b", Some("@c")), ("@c", Some("1"))], 2);
    assert_eq!(table.resolve_text("a").unwrap_err(), AliasError::TooDeep);
    assert_eq!(table.resolve_text("b").unwrap(), Some("1"));
    assert_eq!(table.resolve_text("missing").unwrap(), None);
}

// ============================================================================
// Binding through the binder
// ============================================================================

fn alias_value(node: &QueryNode) -> Option<&QueryNode> {
    match node {
        QueryNode::ParameterAlias { value, .. } => value.as_deref(),
        other => panic!("Expected alias, got {other:?}"),
    }
}

#[test]
fn test_alias_chain_binds_final_value() {
    let node = with_binder(&[("@a", "@b"), ("@b", "18")], |b| b.bind_text("@a", &context())).unwrap();
    assert!(matches!(
        alias_value(&node),
        Some(QueryNode::Constant {
            value: Value::Int32(18),
            ..
        })
    ));
}

#[test]
fn test_circular_aliases() {
    let err = with_binder(&[("@a", "@b"), ("@b", "@a")], |b| b.bind_text("Age gt @a", &context())).unwrap_err();
    assert_eq!(err, BindError::Alias(AliasError::Circular { name: "a".to_string() }));
}

#[test]
fn test_self_reference() {
    let err = with_binder(&[("@a", "@a")], |b| b.bind_text("@a", &context())).unwrap_err();
    assert_eq!(err, BindError::Alias(AliasError::Circular { name: "a".to_string() }));
}

#[test]
fn test_chain_deeper_than_limit() {
    let model = model();
    let settings = ParserSettings::default().with_max_alias_depth(2);
    let table = AliasTable::from_pairs(
        [("@a", Some("@b")), ("@b", Some("@c")), ("@c", Some("1"))],
        settings.max_alias_depth,
    );
    let binder = Binder::new(&model, &settings, &table);
    assert_eq!(
        binder.bind_text("@a", &context()).unwrap_err(),
        BindError::Alias(AliasError::TooDeep)
    );
}

#[test]
fn test_undeclared_alias_has_no_value() {
    let node = with_binder(&[], |b| b.bind_text("@missing", &context())).unwrap();
    assert_eq!(
        node,
        QueryNode::ParameterAlias {
            name: "missing".to_string(),
            type_ref: None,
            value: None,
        }
    );
}

#[test]
fn test_alias_is_bound_once() {
    with_binder(&[("@a", "Name")], |b| {
        b.bind_text("@a eq 'x' and @a ne 'y'", &context()).unwrap();
        assert!(b.aliases().cached("a").is_some());
        assert!(b.aliases().cached("b").is_none());
    });
}

#[test]
fn test_alias_value_may_reference_properties() {
    let node = with_binder(&[("@a", "Address/City")], |b| b.bind_text("@a", &context())).unwrap();
    assert!(matches!(
        alias_value(&node),
        Some(QueryNode::PropertyAccess { property, .. }) if property == "City"
    ));
}
