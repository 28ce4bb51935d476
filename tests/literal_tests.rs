// tests/literal_tests.rs

use chrono::{NaiveDate, NaiveTime, TimeDelta, Timelike};
use odata_uri::ast::LiteralKind;
use odata_uri::literal::{
    format_binary, format_date, format_date_time_offset, format_duration, format_time_of_day,
    infer_fractional_kind, infer_integral_kind, parse_binary, parse_date, parse_date_time_offset, parse_duration, parse_enum, parse_guid, parse_spatial,
    parse_time_of_day, try_parse, unquote, LiteralError,
};
use odata_uri::model::{EnumType, Primitive, TypeRef};
use odata_uri::Value;
use rstest::rstest;
use rust_decimal::Decimal;
use std::str::FromStr;

fn primitive(p: Primitive) -> TypeRef {
    TypeRef::primitive(p, true)
}

fn color() -> EnumType {
    EnumType::new("NS.Color")
        .flags()
        .with_member("Red", 1)
        .with_member("Green", 2)
        .with_member("Blue", 4)
}

// ============================================================================
// Typed parsing
// ============================================================================

#[rstest]
#[case("12", Primitive::Int16, Value::Int16(12))]
#[case("-7", Primitive::SByte, Value::SByte(-7))]
#[case("255", Primitive::Byte, Value::Byte(255))]
#[case("42L", Primitive::Int64, Value::Int64(42))]
#[case("true", Primitive::Boolean, Value::Boolean(true))]
#[case("2.5", Primitive::Double, Value::Double(2.5))]
#[case("2.5F", Primitive::Single, Value::Single(2.5))]
#[case("'O''Neil'", Primitive::String, Value::String("O'Neil".to_string()))]
#[case("null", Primitive::Int32, Value::Null)]
fn test_try_parse(#[case] text: &str, #[case] target: Primitive, #[case] expected: Value) {
    assert_eq!(try_parse(text, &primitive(target)).unwrap(), expected);
}

#[test]
fn test_try_parse_decimal() {
    let expected = Value::Decimal(Decimal::from_str("1.5").unwrap());
    assert_eq!(try_parse("1.5", &primitive(Primitive::Decimal)).unwrap(), expected);
    assert_eq!(try_parse("1.5M", &primitive(Primitive::Decimal)).unwrap(), expected);
}

#[test]
fn test_try_parse_special_floats() {
    let Value::Double(inf) = try_parse("INF", &primitive(Primitive::Double)).unwrap() else {
        panic!("Expected double");
    };
    assert!(inf.is_infinite() && inf > 0.0);
    let Value::Double(nan) = try_parse("NaN", &primitive(Primitive::Double)).unwrap() else {
        panic!("Expected double");
    };
    assert!(nan.is_nan());
}

#[rstest]
#[case("'abc'", Primitive::Int32)]
#[case("abc", Primitive::Boolean)]
#[case("abc", Primitive::String)]
#[case("12:00", Primitive::TimeOfDay)]
#[case("x", Primitive::Guid)]
fn test_wrong_type(#[case] text: &str, #[case] target: Primitive) {
    assert!(matches!(
        try_parse(text, &primitive(target)).unwrap_err(),
        LiteralError::WrongType { .. }
    ));
}

#[rstest]
#[case("70000", Primitive::Int16)]
#[case("256", Primitive::Byte)]
#[case("1e40", Primitive::Single)]
#[case("1e400", Primitive::Double)]
#[case("-1e400", Primitive::Double)]
#[case("1e400D", Primitive::Double)]
#[case("2012-13-45", Primitive::Date)]
#[case("25:00:00", Primitive::TimeOfDay)]
fn test_malformed(#[case] text: &str, #[case] target: Primitive) {
    assert!(matches!(
        try_parse(text, &primitive(target)).unwrap_err(),
        LiteralError::Malformed { .. }
    ));
}

#[test]
fn test_untyped_target_keeps_text() {
    assert_eq!(
        try_parse("'x'", &TypeRef::untyped()).unwrap(),
        Value::String("x".to_string())
    );
}

// ============================================================================
// Dates and times
// ============================================================================

#[test]
fn test_date() {
    assert_eq!(
        try_parse("2012-09-01", &primitive(Primitive::Date)).unwrap(),
        Value::Date(NaiveDate::from_ymd_opt(2012, 9, 1).unwrap())
    );
}

#[rstest]
#[case("2012-09-01")]
#[case("0001-01-01")]
#[case("9999-12-31")]
#[case("2000-02-29")]
fn test_date_round_trip(#[case] text: &str) {
    let date = parse_date(text).unwrap();
    assert_eq!(format_date(&date), text);
    assert_eq!(parse_date(&format_date(&date)).unwrap(), date);
}

#[rstest]
#[case("19:30:5.005", "19:30:05.005")]
#[case("00:00:00", "00:00:00")]
#[case("23:59:59.999", "23:59:59.999")]
#[case("10:20:30.1239", "10:20:30.123")]
#[case("7:5:3.5", "07:05:03.500")]
fn test_time_of_day_round_trip(#[case] text: &str, #[case] canonical: &str) {
    let time = parse_time_of_day(text).unwrap();
    assert_eq!(format_time_of_day(&time), canonical);
    assert_eq!(parse_time_of_day(canonical).unwrap(), time);
}

#[test]
fn test_time_of_day_keeps_milliseconds() {
    let time = parse_time_of_day("19:30:5.005").unwrap();
    assert_eq!(time.second(), 5);
    assert_eq!(time.nanosecond(), 5_000_000);
}

#[test]
fn test_time_of_day_truncates_to_milliseconds() {
    let time = parse_time_of_day("10:20:30.1239").unwrap();
    assert_eq!(time, NaiveTime::from_hms_milli_opt(10, 20, 30, 123).unwrap());
    assert_eq!(time.nanosecond(), 123_000_000);
}

#[test]
fn test_time_of_day_requires_seconds() {
    assert!(parse_time_of_day("10:20").is_err());
}

#[test]
fn test_date_time_offset() {
    let value = parse_date_time_offset("2012-09-01T10:00:00+02:00").unwrap();
    assert_eq!(value.offset().local_minus_utc(), 7200);
    assert_eq!(format_date_time_offset(&value), "2012-09-01T10:00:00+02:00");

    let utc = parse_date_time_offset("2012-09-01T10:00Z").unwrap();
    assert_eq!(format_date_time_offset(&utc), "2012-09-01T10:00:00Z");
}

#[test]
fn test_date_time_offset_limits() {
    assert!(matches!(
        parse_date_time_offset("2012-09-01T10:00:00+15:00").unwrap_err(),
        LiteralError::Malformed { .. }
    ));
    assert!(matches!(
        parse_date_time_offset("2012-09-01 10:00:00Z").unwrap_err(),
        LiteralError::WrongType { .. }
    ));
}

// ============================================================================
// Durations, binary, guid
// ============================================================================

#[test]
fn test_duration() {
    let duration = parse_duration("P1DT2H30M").unwrap();
    assert_eq!(duration, TimeDelta::seconds(86_400 + 2 * 3_600 + 30 * 60));
    assert_eq!(format_duration(&duration), "P1DT2H30M");

    let negative = parse_duration("-PT10M").unwrap();
    assert_eq!(negative, TimeDelta::minutes(-10));
    assert_eq!(format_duration(&negative), "-PT10M");

    assert_eq!(parse_duration("PT0.5S").unwrap(), TimeDelta::milliseconds(500));
    assert_eq!(format_duration(&TimeDelta::zero()), "PT0S");
}

#[rstest]
#[case("P")]
#[case("PT")]
#[case("P1DT")]
fn test_duration_without_components(#[case] text: &str) {
    assert!(matches!(
        parse_duration(text).unwrap_err(),
        LiteralError::Malformed { .. }
    ));
}

#[test]
fn test_duration_literal_forms() {
    let target = primitive(Primitive::Duration);
    let expected = Value::Duration(TimeDelta::hours(1));
    assert_eq!(try_parse("duration'PT1H'", &target).unwrap(), expected);
    assert_eq!(try_parse("'PT1H'", &target).unwrap(), expected);
}

#[test]
fn test_binary() {
    assert_eq!(parse_binary("AQID").unwrap(), vec![1, 2, 3]);
    assert_eq!(parse_binary("-_8").unwrap(), vec![0xfb, 0xff]);
    assert_eq!(format_binary(&[0xfb, 0xff]), "-_8=");
    assert!(parse_binary("***").is_err());
    assert_eq!(
        try_parse("binary'AQID'", &primitive(Primitive::Binary)).unwrap(),
        Value::Binary(vec![1, 2, 3])
    );
}

#[test]
fn test_guid() {
    let text = "01234567-89AB-cdef-0123-456789abcdef";
    assert_eq!(
        parse_guid(text).unwrap().hyphenated().to_string(),
        "01234567-89ab-cdef-0123-456789abcdef"
    );
    assert!(parse_guid("0123456789abcdef0123456789abcdef").is_err());
}

#[rstest]
#[case("01234567-89AB-cdef-0123-456789abcdef")]
#[case("00000000-0000-0000-0000-000000000000")]
#[case("FFFFFFFF-ffff-FFFF-ffff-FFFFFFFFFFFF")]
fn test_guid_round_trip(#[case] text: &str) {
    let guid = parse_guid(text).unwrap();
    let canonical = guid.to_string();
    assert_eq!(canonical, text.to_ascii_lowercase());
    assert_eq!(parse_guid(&canonical).unwrap(), guid);
}

// ============================================================================
// Spatial
// ============================================================================

#[test]
fn test_spatial_with_srid() {
    let value = parse_spatial("SRID=4326;POINT(1 2)", true).unwrap();
    assert_eq!(
        value,
        Value::Spatial {
            primitive: Primitive::GeographyPoint,
            srid: Some(4326),
            wkt: "POINT(1 2)".to_string(),
        }
    );
    assert_eq!(value.to_literal(), "geography'SRID=4326;POINT(1 2)'");
}

#[test]
fn test_spatial_shapes() {
    assert!(matches!(
        parse_spatial("LINESTRING(1 2, 3 4)", false).unwrap(),
        Value::Spatial {
            primitive: Primitive::GeometryLineString,
            srid: None,
            ..
        }
    ));
    assert!(matches!(
        parse_spatial("POINT EMPTY", false).unwrap(),
        Value::Spatial {
            primitive: Primitive::GeometryPoint,
            ..
        }
    ));
    assert!(matches!(
        parse_spatial("POINT 1 2", true).unwrap_err(),
        LiteralError::Malformed { .. }
    ));
    assert!(matches!(
        parse_spatial("CIRCLE(1)", true).unwrap_err(),
        LiteralError::WrongType { .. }
    ));
}

#[test]
fn test_spatial_promotes_to_abstract_type() {
    let value = try_parse("geography'POINT(1 2)'", &primitive(Primitive::Geography)).unwrap();
    assert!(matches!(value, Value::Spatial { primitive: Primitive::GeographyPoint, .. }));
    assert!(try_parse("geography'POINT(1 2)'", &primitive(Primitive::GeographyPolygon)).is_err());
}

// ============================================================================
// Numeric kind inference
// ============================================================================

#[rstest]
#[case("2147483647", LiteralKind::Int32)]
#[case("-2147483649", LiteralKind::Int64)]
#[case("99999999999999999999", LiteralKind::Decimal)]
fn test_infer_integral(#[case] text: &str, #[case] expected: LiteralKind) {
    assert_eq!(infer_integral_kind(text), expected);
}

#[rstest]
#[case("1.5", LiteralKind::Single)]
#[case("3.14159265358979", LiteralKind::Double)]
#[case("1.00000000000000000001", LiteralKind::Decimal)]
fn test_infer_fractional(#[case] text: &str, #[case] expected: LiteralKind) {
    assert_eq!(infer_fractional_kind(text), expected);
}

// ============================================================================
// Enumerations
// ============================================================================

fn enum_text(value: Value) -> String {
    match value {
        Value::Enum { text, .. } => text,
        other => panic!("Expected enum, got {other:?}"),
    }
}

#[test]
fn test_flags_are_combined_in_declaration_order() {
    let value = parse_enum("NS.Color'Green,Red'", &color(), false).unwrap();
    assert!(matches!(value, Value::Enum { value: 3, .. }));
    assert_eq!(enum_text(value), "Red,Green");
}

#[rstest]
#[case("'Blue'", "Blue")]
#[case("'5'", "Red,Blue")]
#[case("'8'", "8")]
fn test_enum_canonical_text(#[case] text: &str, #[case] expected: &str) {
    assert_eq!(enum_text(parse_enum(text, &color(), false).unwrap()), expected);
}

#[test]
fn test_enum_rejections() {
    let size = EnumType::new("NS.Size").with_member("S", 0).with_member("M", 1);
    assert!(matches!(
        parse_enum("'S,M'", &size, false).unwrap_err(),
        LiteralError::InvalidEnumConstant { .. }
    ));
    assert!(matches!(
        parse_enum("NS.Other'Red'", &color(), false).unwrap_err(),
        LiteralError::WrongType { .. }
    ));
    assert!(matches!(
        parse_enum("'Purple'", &color(), false).unwrap_err(),
        LiteralError::InvalidEnumConstant { .. }
    ));
    assert!(parse_enum("'Red,'", &color(), false).is_err());
}

#[test]
fn test_enum_case_sensitivity() {
    assert!(parse_enum("'red'", &color(), false).is_err());
    assert_eq!(enum_text(parse_enum("'red'", &color(), true).unwrap()), "Red");
}

// ============================================================================
// Text helpers
// ============================================================================

#[test]
fn test_unquote() {
    assert_eq!(unquote("'it''s'").as_deref(), Some("it's"));
    assert_eq!(unquote("''").as_deref(), Some(""));
    assert_eq!(unquote("'"), None);
    assert_eq!(unquote("abc"), None);
}

#[test]
fn test_to_literal() {
    assert_eq!(Value::String("O'Neil".to_string()).to_literal(), "'O''Neil'");
    assert_eq!(
        Value::Duration(TimeDelta::minutes(90)).to_literal(),
        "duration'PT1H30M'"
    );
    assert_eq!(
        Value::Enum {
            type_name: "NS.Color".to_string(),
            value: 3,
            text: "Red,Green".to_string(),
        }
        .to_literal(),
        "NS.Color'Red,Green'"
    );
}
