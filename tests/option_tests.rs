// tests/option_tests.rs

mod common;

use odata_uri::binder::BindError;
use odata_uri::model::{Primitive, TypeRef};
use odata_uri::node::{QueryNode, SelectedItem};
use odata_uri::path::PathError;
use odata_uri::{AliasError, EdmModel, Error, ErrorKind, ParserSettings, QueryOptionError, UriParser, Value};
use url::Url;

use common::model;

fn parser<'a>(model: &'a EdmModel, path: &str, pairs: &[(&'a str, &'a str)]) -> UriParser<'a> {
    from_parts(model, ParserSettings::default(), path, pairs).unwrap_or_else(|e| panic!("{e}"))
}

fn from_parts<'a>(
    model: &'a EdmModel,
    settings: ParserSettings,
    path: &str,
    pairs: &[(&'a str, &'a str)],
) -> Result<UriParser<'a>, Error> {
    UriParser::from_parts(model, settings, path, pairs.iter().copied())
}

fn url(text: &str) -> Url {
    Url::parse(text).unwrap()
}

// ============================================================================
// Collecting options
// ============================================================================

#[test]
fn test_duplicate_option() {
    let model = model();
    let err = from_parts(&model, ParserSettings::default(), "People", &[("$top", "1"), ("$top", "2")]).err();
    assert_eq!(
        err,
        Some(Error::QueryOption(QueryOptionError::Duplicate {
            name: "$top".to_string(),
        }))
    );
}

#[test]
fn test_case_insensitive_option_names() {
    let model = model();
    let settings = ParserSettings::default().with_case_insensitive(true);
    let p = from_parts(&model, settings.clone(), "People", &[("$TOP", "5")]).unwrap();
    assert_eq!(p.option("$top"), Some("5"));
    assert_eq!(p.parse_top().unwrap(), Some(5));

    let err = from_parts(&model, settings, "People", &[("$Top", "1"), ("$top", "2")]).err();
    assert_eq!(
        err,
        Some(Error::QueryOption(QueryOptionError::Duplicate {
            name: "$top".to_string(),
        }))
    );
}

#[test]
fn test_unsupported_option() {
    let model = model();
    let err = parser(&model, "People", &[("$TOP", "5")]).parse_uri().unwrap_err();
    assert_eq!(
        err,
        Error::QueryOption(QueryOptionError::Unsupported {
            name: "$TOP".to_string(),
        })
    );
    assert_eq!(err.kind(), ErrorKind::QueryOption);
}

#[test]
fn test_custom_options() {
    let model = model();
    let uri = parser(&model, "People", &[("x-trace", "on"), ("$top", "1")])
        .parse_uri()
        .unwrap();
    assert_eq!(uri.custom_options.get("x-trace").map(String::as_str), Some("on"));
    assert!(!uri.custom_options.contains_key("$top"));
}

// ============================================================================
// Scalar options
// ============================================================================

#[test]
fn test_scalar_options() {
    let model = model();
    let p = parser(
        &model,
        "People",
        &[
            ("$top", "10"),
            ("$skip", "20"),
            ("$count", "true"),
            ("$index", "-3"),
            ("$skiptoken", "abc"),
            ("$deltatoken", "42"),
        ],
    );
    assert_eq!(p.parse_top().unwrap(), Some(10));
    assert_eq!(p.parse_skip().unwrap(), Some(20));
    assert_eq!(p.parse_count().unwrap(), Some(true));
    assert_eq!(p.parse_index().unwrap(), Some(-3));
    assert_eq!(p.parse_skip_token(), Some("abc"));
    assert_eq!(p.parse_delta_token(), Some("42"));
}

#[test]
fn test_absent_options() {
    let model = model();
    let uri = parser(&model, "People", &[]).parse_uri().unwrap();
    assert_eq!(uri.top, None);
    assert_eq!(uri.filter, None);
    assert_eq!(uri.select_expand, None);
    assert!(uri.parameter_aliases.is_empty());
}

#[test]
fn test_invalid_scalars() {
    let model = model();
    assert_eq!(
        parser(&model, "People", &[("$count", "yes")]).parse_count().unwrap_err(),
        Error::QueryOption(QueryOptionError::InvalidCount {
            value: "yes".to_string(),
        })
    );
    assert_eq!(
        parser(&model, "People", &[("$skip", "-1")]).parse_skip().unwrap_err(),
        Error::QueryOption(QueryOptionError::InvalidSkip {
            value: "-1".to_string(),
        })
    );
    assert!(parser(&model, "People", &[("$index", "1.5")]).parse_index().is_err());
}

#[test]
fn test_scalar_from_alias() {
    let model = model();
    let p = parser(&model, "People", &[("$top", "@t"), ("@t", "@u"), ("@u", "7")]);
    assert_eq!(p.parse_top().unwrap(), Some(7));

    let p = parser(&model, "People", &[("$top", "@missing")]);
    assert_eq!(p.parse_top().unwrap(), None);

    let p = parser(&model, "People", &[("$top", "@t"), ("@t", "@t")]);
    assert!(matches!(
        p.parse_top().unwrap_err(),
        Error::Alias(AliasError::Circular { .. })
    ));
}

// ============================================================================
// $id
// ============================================================================

#[test]
fn test_entity_id_without_root() {
    let model = model();
    let p = parser(&model, "People", &[("$id", "http://host/service/People(1)")]);
    assert_eq!(p.parse_entity_id().unwrap(), Some(url("http://host/service/People(1)")));

    let p = parser(&model, "People", &[("$id", "People(1)")]);
    assert_eq!(
        p.parse_entity_id().unwrap_err(),
        Error::QueryOption(QueryOptionError::InvalidEntityId {
            value: "People(1)".to_string(),
        })
    );
}

#[test]
fn test_relative_entity_id_joins_service_root() {
    let model = model();
    let p = UriParser::new(
        &model,
        ParserSettings::default(),
        &url("http://host/service"),
        &url("http://host/service/$entity?$id=People(1)"),
    )
    .unwrap();
    assert_eq!(p.parse_entity_id().unwrap(), Some(url("http://host/service/People(1)")));
}

// ============================================================================
// Requests relative to a service root
// ============================================================================

#[test]
fn test_request_is_decoded() {
    let model = model();
    let p = UriParser::new(
        &model,
        ParserSettings::default(),
        &url("http://host/service/"),
        &url("http://host/service/People?$filter=Name%20eq%20'A%26B'&$top=2"),
    )
    .unwrap();
    assert_eq!(p.option("$filter"), Some("Name eq 'A&B'"));
    assert_eq!(p.parse_top().unwrap(), Some(2));

    let filter = p.parse_filter().unwrap().unwrap();
    let QueryNode::BinaryOperator { right, .. } = filter.expression else {
        panic!("Expected comparison");
    };
    assert!(matches!(*right, QueryNode::Constant { value: Value::String(ref s), .. } if s == "A&B"));
}

#[test]
fn test_service_root_itself() {
    let model = model();
    let p = UriParser::new(
        &model,
        ParserSettings::default(),
        &url("http://host/service"),
        &url("http://host/service"),
    )
    .unwrap();
    assert!(p.parse_path().unwrap().is_empty());
}

#[test]
fn test_request_outside_service_root() {
    let model = model();
    let err = UriParser::new(
        &model,
        ParserSettings::default(),
        &url("http://host/service"),
        &url("http://other/People"),
    )
    .err();
    assert!(matches!(
        err,
        Some(Error::QueryOption(QueryOptionError::NotUnderServiceRoot { .. }))
    ));
}

// ============================================================================
// Whole requests
// ============================================================================

#[test]
fn test_compute_aliases_are_visible() {
    let model = model();
    let uri = parser(
        &model,
        "People",
        &[
            ("$compute", "Price mul 2 as Twice"),
            ("$filter", "Twice gt 10"),
            ("$orderby", "Twice desc"),
            ("$select", "Name,Twice"),
        ],
    )
    .parse_uri()
    .unwrap();

    assert_eq!(uri.compute.unwrap().items[0].alias, "Twice");
    assert!(uri.filter.is_some());
    assert_eq!(uri.order_by.unwrap().items.len(), 1);
    assert_eq!(
        uri.select_expand.unwrap().selected[1],
        SelectedItem::Property {
            path: vec!["Twice".to_string()],
            type_ref: Some(TypeRef::primitive(Primitive::Decimal, true)),
        }
    );
}

#[test]
fn test_compute_alias_unknown_without_compute() {
    let model = model();
    let err = parser(&model, "People", &[("$filter", "Twice gt 10")])
        .parse_uri()
        .unwrap_err();
    assert!(matches!(err, Error::Bind(BindError::PropertyNotDeclared { .. })));
}

#[test]
fn test_bound_aliases_are_reported() {
    let model = model();
    let uri = parser(
        &model,
        "People",
        &[("$filter", "Age gt @a"), ("@a", "18"), ("@unused", "1")],
    )
    .parse_uri()
    .unwrap();
    let names: Vec<&str> = uri.parameter_aliases.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["a"]);
}

#[test]
fn test_aliases_bound_by_apply_are_reported() {
    let model = model();
    let uri = parser(&model, "People", &[("$apply", "filter(Age gt @a)"), ("@a", "18")])
        .parse_uri()
        .unwrap();
    assert!(uri.apply.is_some());
    assert!(uri.parameter_aliases.contains_key("a"));
}

#[test]
fn test_deeply_nested_expand_is_rejected_by_default() {
    let model = model();
    let levels = 3000;
    let expand = format!("{}Friends{}", "Friends($expand=".repeat(levels), ")".repeat(levels));
    let err = parser(&model, "People", &[("$expand", expand.as_str())])
        .parse_select_and_expand()
        .unwrap_err();
    assert_eq!(err, Error::Bind(BindError::ExpandTooDeep { max: 32 }));

    let expand = format!("{}Friends{}", "Friends($expand=".repeat(31), ")".repeat(31));
    let clause = parser(&model, "People", &[("$expand", expand.as_str())])
        .parse_select_and_expand()
        .unwrap()
        .unwrap();
    assert_eq!(clause.expanded.len(), 1);
}

#[test]
fn test_alias_shared_between_path_and_filter() {
    let model = model();
    let p = parser(&model, "People(@id)/Friends", &[("$filter", "ID eq @id"), ("@id", "3")]);
    let uri = p.parse_uri().unwrap();
    assert!(uri.filter.is_some());
    assert!(p.aliases().cached("id").is_some());
}

#[test]
fn test_select_on_primitive() {
    let model = model();
    let err = parser(&model, "People(1)/Name", &[("$select", "Name")])
        .parse_uri()
        .unwrap_err();
    assert_eq!(
        err,
        Error::QueryOption(QueryOptionError::NotApplicable {
            option: "$select".to_string(),
            type_name: "Edm.String".to_string(),
        })
    );
}

// ============================================================================
// Error kinds
// ============================================================================

fn kind_of(path: &str, pairs: &[(&str, &str)]) -> ErrorKind {
    let model = model();
    UriParser::from_parts(&model, ParserSettings::default(), path, pairs.iter().copied())
        .and_then(|p| p.parse_uri())
        .unwrap_err()
        .kind()
}

#[test]
fn test_error_kinds() {
    assert_eq!(kind_of("People", &[("$filter", "Name eq 'x")]), ErrorKind::Lexical);
    assert_eq!(kind_of("People", &[("$filter", "Name eq")]), ErrorKind::Syntax);
    assert_eq!(kind_of("People", &[("$filter", "Nope eq 1")]), ErrorKind::Type);
    assert_eq!(kind_of("Nope", &[]), ErrorKind::SemanticPath);
    assert_eq!(kind_of("People(1)/NS.HasDog(x=true)", &[]), ErrorKind::SemanticPath);
    assert_eq!(kind_of("People(1)/$count", &[]), ErrorKind::SemanticPath);
    assert_eq!(
        kind_of("People", &[("$filter", "Age gt @a"), ("@a", "@a")]),
        ErrorKind::Alias
    );
    assert_eq!(kind_of("People", &[("$top", "-1")]), ErrorKind::QueryOption);
    assert_eq!(
        kind_of("People", &[("$expand", "MyDog($top=x)")]),
        ErrorKind::QueryOption
    );
}

#[test]
fn test_path_errors_keep_their_source() {
    let model = model();
    let err = parser(&model, "People(1)/$count", &[]).parse_uri().unwrap_err();
    assert_eq!(
        err,
        Error::Path(PathError::CountNotAllowed {
            segment: "People(1)".to_string(),
        })
    );
}
