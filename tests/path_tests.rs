// tests/path_tests.rs

mod common;

use odata_uri::alias::AliasTable;
use odata_uri::binder::BindError;
use odata_uri::model::{Primitive, TypeRef};
use odata_uri::node::QueryNode;
use odata_uri::output::ToJson;
use odata_uri::path::{resolve_path, ODataPath, PathError, PathSegment};
use odata_uri::{ParserSettings, Value};
use rstest::rstest;

use common::{model, people, person};

fn resolve_with(settings: &ParserSettings, aliases: &[(&str, &str)], path: &str) -> Result<ODataPath, PathError> {
    let model = model();
    let table = AliasTable::from_pairs(aliases.iter().map(|(n, v)| (*n, Some(*v))), settings.max_alias_depth);
    resolve_path(path, &model, settings, &table)
}

fn resolve(path: &str) -> Result<ODataPath, PathError> {
    resolve_with(&ParserSettings::default(), &[], path)
}

fn resolve_ok(path: &str) -> ODataPath {
    resolve(path).unwrap_or_else(|e| panic!("{path}: {e}"))
}

/// Segment kinds, for compact assertions on the shape of a path.
fn kinds(path: &ODataPath) -> Vec<&'static str> {
    path.segments
        .iter()
        .map(|segment| match segment {
            PathSegment::EntitySet { .. } => "entitySet",
            PathSegment::Singleton { .. } => "singleton",
            PathSegment::Key { .. } => "key",
            PathSegment::Navigation { .. } => "navigation",
            PathSegment::NavigationLink { .. } => "navigationLink",
            PathSegment::Reference => "ref",
            PathSegment::Property { .. } => "property",
            PathSegment::DynamicProperty { .. } => "dynamicProperty",
            PathSegment::TypeCast { .. } => "typeCast",
            PathSegment::Operation { .. } => "operation",
            PathSegment::OperationImport { .. } => "operationImport",
            PathSegment::Value => "value",
            PathSegment::Count => "count",
            PathSegment::Each { .. } => "each",
            PathSegment::Filter { .. } => "filter",
            PathSegment::Metadata => "metadata",
            PathSegment::Batch => "batch",
        })
        .collect()
}

fn key_values(path: &ODataPath) -> Vec<(String, Value)> {
    path.segments
        .iter()
        .find_map(|segment| match segment {
            PathSegment::Key { keys, .. } => Some(
                keys.iter()
                    .map(|(name, node)| match node {
                        QueryNode::Constant { value, .. } => (name.clone(), value.clone()),
                        other => panic!("Expected constant key, got {other:?}"),
                    })
                    .collect(),
            ),
            _ => None,
        })
        .expect("path has a key segment")
}

// ============================================================================
// Roots
// ============================================================================

#[test]
fn test_empty_path() {
    let path = resolve_ok("");
    assert!(path.is_empty());
    assert_eq!(path.type_ref, None);
    assert!(resolve_ok("/").is_empty());
}

#[test]
fn test_entity_set() {
    let path = resolve_ok("People");
    assert_eq!(kinds(&path), vec!["entitySet"]);
    assert_eq!(path.type_ref, Some(people()));
    assert_eq!(path.navigation_source.as_deref(), Some("People"));
    assert_eq!(path.element_type(), Some(&person()));
}

#[test]
fn test_singleton() {
    let path = resolve_ok("Boss/Name");
    assert_eq!(kinds(&path), vec!["singleton", "property"]);
    assert_eq!(path.type_ref, Some(TypeRef::string(true)));
    assert_eq!(path.navigation_source, None);
}

#[test]
fn test_unknown_root() {
    assert_eq!(
        resolve("Nope").unwrap_err(),
        PathError::UnknownRoot {
            segment: "Nope".to_string(),
        }
    );
}

#[test]
fn test_metadata_and_batch() {
    assert_eq!(kinds(&resolve_ok("$metadata")), vec!["metadata"]);
    assert_eq!(kinds(&resolve_ok("$batch")), vec!["batch"]);
    assert_eq!(
        resolve("$metadata/People").unwrap_err(),
        PathError::MustBeLeaf {
            segment: "$metadata".to_string(),
            next: "People".to_string(),
        }
    );
    assert_eq!(
        resolve("People/$metadata").unwrap_err(),
        PathError::MustBeOnly {
            segment: "$metadata".to_string(),
        }
    );
}

#[test]
fn test_empty_segment() {
    assert_eq!(resolve("People//Name").unwrap_err(), PathError::EmptySegment);
}

// ============================================================================
// Keys
// ============================================================================

#[test]
fn test_key_in_parentheses() {
    let path = resolve_ok("People(1)");
    assert_eq!(kinds(&path), vec!["entitySet", "key"]);
    assert_eq!(path.type_ref, Some(person()));
    assert_eq!(key_values(&path), vec![("ID".to_string(), Value::Int32(1))]);
    assert_eq!(resolve_ok("People(ID=1)"), path);
}

#[test]
fn test_key_errors() {
    assert_eq!(
        resolve("People(1,2)").unwrap_err(),
        PathError::KeyCount {
            segment: "People(1,2)".to_string(),
            type_name: "NS.Person".to_string(),
            expected: 1,
        }
    );
    assert_eq!(
        resolve("People(Foo=1)").unwrap_err(),
        PathError::UnknownKey {
            name: "Foo".to_string(),
            type_name: "NS.Person".to_string(),
        }
    );
    assert!(matches!(
        resolve("Boss(1)").unwrap_err(),
        PathError::KeyNotAllowed { .. }
    ));
    assert!(matches!(
        resolve("People(1)/Name(2)").unwrap_err(),
        PathError::KeyNotAllowed { .. }
    ));
}

#[rstest]
#[case("People(ID)")]
#[case("People(ID add 1)")]
#[case("People(ID=ID)")]
#[case("People(-ID)")]
#[case("People/ID")]
fn test_key_value_must_be_literal(#[case] path: &str) {
    let err = resolve(path).unwrap_err();
    assert!(
        matches!(&err, PathError::KeyNotLiteral { key, .. } if key == "ID"),
        "{path}: {err:?}"
    );
}

#[rstest]
#[case("People(1)")]
#[case("People(ID=1)")]
#[case("People(-1)")]
#[case("People/1")]
fn test_key_value_literal_forms(#[case] path: &str) {
    assert_eq!(kinds(&resolve_ok(path)), vec!["entitySet", "key"]);
}

#[test]
fn test_key_value_from_alias() {
    let path = resolve_with(&ParserSettings::default(), &[("@id", "3")], "People(@id)").unwrap();
    assert_eq!(kinds(&path), vec!["entitySet", "key"]);
}

#[test]
fn test_key_as_segment() {
    let path = resolve_ok("People/1");
    assert_eq!(kinds(&path), vec!["entitySet", "key"]);
    assert_eq!(key_values(&path), vec![("ID".to_string(), Value::Int32(1))]);

    let path = resolve_ok("Things/abc");
    assert_eq!(key_values(&path), vec![("Code".to_string(), Value::String("abc".to_string()))]);
}

#[test]
fn test_key_as_segment_disabled() {
    let settings = ParserSettings::default().with_key_as_segment(false);
    assert_eq!(
        resolve_with(&settings, &[], "People/1").unwrap_err(),
        PathError::SegmentNotFound {
            segment: "1".to_string(),
            type_name: "NS.Person".to_string(),
        }
    );
}

#[test]
fn test_key_from_alias() {
    let path = resolve_with(&ParserSettings::default(), &[("@id", "7")], "People(@id)").unwrap();
    assert_eq!(kinds(&path), vec!["entitySet", "key"]);
}

// ============================================================================
// Properties, navigation and type casts
// ============================================================================

#[test]
fn test_navigation_follows_bindings() {
    let path = resolve_ok("People(1)/MyDog/Owner");
    assert_eq!(kinds(&path), vec!["entitySet", "key", "navigation", "navigation"]);
    assert_eq!(path.navigation_source.as_deref(), Some("People"));
    let PathSegment::Navigation { navigation_source, .. } = &path.segments[2] else {
        panic!("Expected navigation");
    };
    assert_eq!(navigation_source.as_deref(), Some("Dogs"));
}

#[test]
fn test_collection_navigation_with_key() {
    let path = resolve_ok("People(1)/Friends(2)/Name");
    assert_eq!(kinds(&path), vec!["entitySet", "key", "navigation", "key", "property"]);
}

#[test]
fn test_complex_property_path() {
    let path = resolve_ok("People(1)/Address/City");
    assert_eq!(kinds(&path), vec!["entitySet", "key", "property", "property"]);
    assert_eq!(path.type_ref, Some(TypeRef::string(true)));
}

#[test]
fn test_unknown_segment() {
    assert_eq!(
        resolve("People(1)/Nope").unwrap_err(),
        PathError::SegmentNotFound {
            segment: "Nope".to_string(),
            type_name: "NS.Person".to_string(),
        }
    );
    assert!(matches!(
        resolve("People(1)/Name/Length").unwrap_err(),
        PathError::SegmentNotAllowed { .. }
    ));
}

#[test]
fn test_open_type_dynamic_property() {
    let path = resolve_ok("Things('x')/Extra");
    assert_eq!(kinds(&path), vec!["entitySet", "key", "dynamicProperty"]);
    assert_eq!(path.type_ref, None);
    // Anything may follow a dynamic property.
    assert_eq!(kinds(&resolve_ok("Things('x')/Extra/More")).len(), 4);
}

#[test]
fn test_type_cast() {
    let path = resolve_ok("People/NS.Employee");
    assert_eq!(kinds(&path), vec!["entitySet", "typeCast"]);
    assert_eq!(
        path.type_ref,
        Some(TypeRef::collection(TypeRef::entity("NS.Employee", false)))
    );

    let path = resolve_ok("People(1)/NS.Employee/Budget");
    assert_eq!(path.type_ref, Some(TypeRef::primitive(Primitive::Decimal, true)));

    assert_eq!(
        resolve("People/NS.Dog").unwrap_err(),
        PathError::UnrelatedTypeCast {
            target: "NS.Dog".to_string(),
            type_name: "NS.Person".to_string(),
        }
    );
}

// ============================================================================
// $ref, $value and $count
// ============================================================================

#[test]
fn test_navigation_link() {
    let path = resolve_ok("People(1)/MyDog/$ref");
    assert_eq!(kinds(&path), vec!["entitySet", "key", "navigationLink"]);
    assert_eq!(kinds(&resolve_ok("People(1)/$ref")), vec!["entitySet", "key", "ref"]);
}

#[test]
fn test_ref_errors() {
    assert!(matches!(
        resolve("People(1)/Name/$ref").unwrap_err(),
        PathError::RefNotAllowed { .. }
    ));
    assert!(matches!(
        resolve("People/$ref(1)").unwrap_err(),
        PathError::RefWithKey { .. }
    ));
    assert!(matches!(
        resolve("People(1)/$ref/Name").unwrap_err(),
        PathError::MustBeLeaf { .. }
    ));
}

#[test]
fn test_value() {
    assert_eq!(
        kinds(&resolve_ok("People(1)/Name/$value")),
        vec!["entitySet", "key", "property", "value"]
    );
    assert_eq!(
        resolve("People(1)/Address/$value").unwrap_err(),
        PathError::ValueNotAllowed {
            segment: "Address".to_string(),
        }
    );
}

#[test]
fn test_count() {
    assert_eq!(kinds(&resolve_ok("People/$count")), vec!["entitySet", "count"]);
    assert_eq!(
        kinds(&resolve_ok("People(1)/Emails/$count")),
        vec!["entitySet", "key", "property", "count"]
    );
    assert_eq!(
        resolve("People(1)/$count").unwrap_err(),
        PathError::CountNotAllowed {
            segment: "People(1)".to_string(),
        }
    );
}

// ============================================================================
// $each and $filter
// ============================================================================

#[test]
fn test_each_with_action() {
    let path = resolve_ok("People/$each/NS.Raise");
    assert_eq!(kinds(&path), vec!["entitySet", "each", "operation"]);
    assert_eq!(
        resolve("People/$each/NS.Raise/Name").unwrap_err(),
        PathError::MustBeLeaf {
            segment: "NS.Raise".to_string(),
            next: "Name".to_string(),
        }
    );
}

#[test]
fn test_each_on_entity_set() {
    let path = resolve_ok("People/$each");
    assert_eq!(kinds(&path), vec!["entitySet", "each"]);
}

#[test]
fn test_each_after_key_as_segment() {
    assert_eq!(
        resolve("People/1/$each").unwrap_err(),
        PathError::EachOnSingleEntity {
            segment: "1".to_string(),
        }
    );
}

#[test]
fn test_each_errors() {
    assert_eq!(
        resolve("Boss/$each").unwrap_err(),
        PathError::EachOnSingleton {
            segment: "Boss".to_string(),
        }
    );
    assert_eq!(
        resolve("People(1)/$each").unwrap_err(),
        PathError::EachOnSingleEntity {
            segment: "People(1)".to_string(),
        }
    );
    assert_eq!(
        resolve("People(1)/Emails/$each").unwrap_err(),
        PathError::EachOnNonEntities {
            segment: "Emails".to_string(),
        }
    );
    assert_eq!(
        resolve("People/$each/$each").unwrap_err(),
        PathError::AfterEach {
            segment: "$each".to_string(),
        }
    );
}

#[test]
fn test_filter_segment() {
    let path = resolve_ok("People/$filter(Age gt 30)/$count");
    assert_eq!(kinds(&path), vec!["entitySet", "filter", "count"]);
    let PathSegment::Filter { single, type_ref, .. } = &path.segments[1] else {
        panic!("Expected filter");
    };
    assert!(!single);
    assert_eq!(type_ref, &people());
}

#[test]
fn test_filter_segment_errors() {
    assert!(matches!(
        resolve("People(1)/$filter(Age gt 30)").unwrap_err(),
        PathError::FilterOnSingle { .. }
    ));
    assert_eq!(
        resolve("People/$filter()").unwrap_err(),
        PathError::FilterWithoutExpression
    );
    assert!(matches!(
        resolve("People/$filter(Name)").unwrap_err(),
        PathError::Bind(BindError::NotBoolean { .. })
    ));
}

// ============================================================================
// Operations
// ============================================================================

#[test]
fn test_operation_import() {
    let path = resolve_ok("TopPeople(count=5)/$count");
    assert_eq!(kinds(&path), vec!["operationImport", "count"]);
    let PathSegment::OperationImport { operation, parameters, .. } = &path.segments[0] else {
        panic!("Expected operation import");
    };
    assert_eq!(operation, "NS.TopPeople");
    assert!(matches!(parameters[0].1, QueryNode::Constant { value: Value::Int32(5), .. }));
}

#[test]
fn test_bound_function() {
    let path = resolve_ok("People(1)/NS.HasDog(inOffice=true)");
    assert_eq!(kinds(&path), vec!["entitySet", "key", "operation"]);
    assert_eq!(path.type_ref, Some(TypeRef::boolean(false)));
    assert_eq!(
        resolve("People(1)/NS.HasDog(inOffice=true)/$value").unwrap_err(),
        PathError::NotComposable {
            operation: "NS.HasDog".to_string(),
        }
    );
}

#[test]
fn test_composable_function_keeps_source() {
    let path = resolve_ok("People/NS.ByAge(age=3)/$count");
    assert_eq!(kinds(&path), vec!["entitySet", "operation", "count"]);
    let PathSegment::Operation { navigation_source, .. } = &path.segments[1] else {
        panic!("Expected operation");
    };
    assert_eq!(navigation_source.as_deref(), Some("People"));
    assert_eq!(
        kinds(&resolve_ok("People/NS.ByAge(age=3)/NS.Employee")),
        vec!["entitySet", "operation", "typeCast"]
    );
}

#[test]
fn test_function_parameter_alias() {
    let settings = ParserSettings::default();
    assert_eq!(
        resolve_with(&settings, &[("@a", "3")], "People/NS.ByAge(age=@a)").unwrap_err(),
        PathError::Bind(BindError::AliasConversion {
            name: "a".to_string(),
            expected: "Edm.Int16".to_string(),
            found: "Edm.Int32".to_string(),
        })
    );
}

#[test]
fn test_function_parameter_mismatch() {
    assert_eq!(
        resolve("People(1)/NS.HasDog(other=true)").unwrap_err(),
        PathError::Bind(BindError::NoMatchingOperation {
            name: "NS.HasDog".to_string(),
            parameters: "other".to_string(),
        })
    );
}

#[test]
fn test_unqualified_bound_function() {
    assert_eq!(
        kinds(&resolve_ok("People(1)/HasDog(inOffice=false)")),
        vec!["entitySet", "key", "operation"]
    );
    let settings = ParserSettings::default().with_unqualified_operations(false);
    assert!(matches!(
        resolve_with(&settings, &[], "People(1)/HasDog(inOffice=false)").unwrap_err(),
        PathError::SegmentNotFound { .. }
    ));
}

// ============================================================================
// Case-insensitive names
// ============================================================================

#[test]
fn test_case_insensitive_names() {
    let settings = ParserSettings::default().with_case_insensitive(true);
    let path = resolve_with(&settings, &[], "people(1)/mydog/name").unwrap();
    assert_eq!(kinds(&path), vec!["entitySet", "key", "navigation", "property"]);
    assert!(resolve("people(1)").is_err());
}

// ============================================================================
// JSON output
// ============================================================================

#[test]
fn test_path_json() {
    let json = resolve_ok("People(1)/MyDog").to_json_value();
    assert_eq!(json["type"], "NS.Dog");
    assert_eq!(json["navigationSource"], "Dogs");
    assert_eq!(json["segments"][0]["kind"], "entitySet");
    assert_eq!(json["segments"][1]["kind"], "key");
    assert_eq!(json["segments"][1]["keys"]["ID"]["value"], 1);
    assert_eq!(json["segments"][2]["kind"], "navigation");
}
