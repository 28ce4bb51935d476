//! # Literal Values
//!
//! Pure conversions from literal text to [`Value`]s. Nothing here touches
//! parser state; every function is total over its input and reports one of
//! three failures:
//!
//! - [`LiteralError::WrongType`] - the text is not a literal of the requested
//!   type at all (`'abc'` for `Edm.Int32`)
//! - [`LiteralError::Malformed`] - the text has the right shape but an invalid
//!   value (`2012-13-45` for `Edm.Date`)
//! - [`LiteralError::InvalidEnumConstant`] - an enumeration literal that names
//!   no member and is not a usable underlying value
//!
//! ## Formats
//!
//! ```text
//! Edm.Date             2012-09-01
//! Edm.TimeOfDay        19:30:05.005        (millisecond precision)
//! Edm.DateTimeOffset   2012-09-01T10:00:00.5+02:00
//! Edm.Guid             01234567-89ab-cdef-0123-456789abcdef
//! Edm.Duration         duration'P1DT2H30M'
//! Edm.Binary           binary'AQID'        (base64url)
//! Edm.Geography*       geography'SRID=4326;POINT(1 2)'
//! enumeration          NS.Color'Red,Green' or 'Red' or '3'
//! ```

use std::str::FromStr;
use std::sync::LazyLock;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, Timelike,
};
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::ast::{Literal, LiteralKind};
use crate::model::{EnumType, Primitive, TypeKind, TypeRef};
use crate::value::Value;

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("static pattern"));

static TIME_OF_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{1,2}):(\d{1,2})(?:\.(\d+))?$").expect("static pattern")
});

static DATE_TIME_OFFSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})T(\d{1,2}):(\d{1,2})(?::(\d{1,2})(?:\.(\d+))?)?(Z|z|([+-])(\d{2}):(\d{2}))$",
    )
    .expect("static pattern")
});

static GUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}$")
        .expect("static pattern")
});

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-)?P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.(\d+))?S)?)?$")
        .expect("static pattern")
});

static SRID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i:SRID)=(\d+);").expect("static pattern"));

static BINARY: LazyLock<GeneralPurpose> = LazyLock::new(|| {
    GeneralPurpose::new(
        &alphabet::URL_SAFE,
        GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
    )
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("The literal '{text}' is not a valid {expected} literal.")]
    WrongType { text: String, expected: String },

    #[error("The literal '{text}' is malformed: {reason}.")]
    Malformed { text: String, reason: String },

    #[error("The string '{text}' is not a valid enumeration type constant.")]
    InvalidEnumConstant { text: String },
}

fn wrong_type(text: &str, expected: impl ToString) -> LiteralError {
    LiteralError::WrongType {
        text: text.to_string(),
        expected: expected.to_string(),
    }
}

fn malformed(text: &str, reason: impl Into<String>) -> LiteralError {
    LiteralError::Malformed {
        text: text.to_string(),
        reason: reason.into(),
    }
}

/// Type of an unsuffixed integer literal: the narrowest of Int32, Int64 and
/// Decimal that holds it.
pub fn infer_integral_kind(text: &str) -> LiteralKind {
    if text.parse::<i32>().is_ok() {
        LiteralKind::Int32
    } else if text.parse::<i64>().is_ok() {
        LiteralKind::Int64
    } else {
        LiteralKind::Decimal
    }
}

/// Type of an unsuffixed fractional literal: Single when the value survives
/// a 32-bit round trip, else Double when it survives a 64-bit one, else
/// Decimal.
pub fn infer_fractional_kind(text: &str) -> LiteralKind {
    let Some(exact) = parse_decimal(text) else {
        return LiteralKind::Double;
    };
    let survives = |repr: String| parse_decimal(&repr).is_some_and(|d| d == exact);
    match (text.parse::<f32>(), text.parse::<f64>()) {
        (Ok(single), _) if single.is_finite() && survives(single.to_string()) => LiteralKind::Single,
        (_, Ok(double)) if double.is_finite() && survives(double.to_string()) => LiteralKind::Double,
        _ => LiteralKind::Decimal,
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(text).ok()
    } else {
        Decimal::from_str(text).ok()
    }
}

fn strip_suffix_ci<'a>(text: &'a str, suffix: char) -> &'a str {
    text.strip_suffix(suffix)
        .or_else(|| text.strip_suffix(suffix.to_ascii_lowercase()))
        .unwrap_or(text)
}

/// Removes the quotes of a single-quoted literal and collapses doubled quotes.
pub fn unquote(text: &str) -> Option<String> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    if text.len() < 2 {
        return None;
    }
    Some(inner.replace("''", "'"))
}

/// Splits `prefix'body'` into the prefix and the quoted part.
pub fn split_typed(text: &str) -> Option<(&str, &str)> {
    let quote = text.find('\'')?;
    Some((&text[..quote], &text[quote..]))
}

/// Value and type of a literal the lexer has already classified.
///
/// Returns `None` as the type for `null`. Qualified [`LiteralKind::Typed`]
/// literals need the model and are handled by [`parse_enum`].
pub fn parse_literal(literal: &Literal) -> Result<(Value, Option<TypeRef>), LiteralError> {
    let text = literal.text.as_str();
    let typed = |value: Value, primitive: Primitive| Ok((value, Some(TypeRef::primitive(primitive, false))));
    match literal.kind {
        LiteralKind::Null => Ok((Value::Null, None)),
        LiteralKind::Boolean => typed(parse_boolean(text)?, Primitive::Boolean),
        LiteralKind::Int32 => typed(parse_integral(text, Primitive::Int32)?, Primitive::Int32),
        LiteralKind::Int64 => typed(parse_integral(text, Primitive::Int64)?, Primitive::Int64),
        LiteralKind::Single => typed(parse_floating(text, Primitive::Single)?, Primitive::Single),
        LiteralKind::Double => typed(parse_floating(text, Primitive::Double)?, Primitive::Double),
        LiteralKind::Decimal => typed(parse_decimal_literal(text)?, Primitive::Decimal),
        LiteralKind::String => {
            let s = unquote(text).ok_or_else(|| wrong_type(text, Primitive::String))?;
            typed(Value::String(s), Primitive::String)
        }
        LiteralKind::Date => typed(Value::Date(parse_date(text)?), Primitive::Date),
        LiteralKind::TimeOfDay => typed(Value::TimeOfDay(parse_time_of_day(text)?), Primitive::TimeOfDay),
        LiteralKind::DateTimeOffset => typed(
            Value::DateTimeOffset(parse_date_time_offset(text)?),
            Primitive::DateTimeOffset,
        ),
        LiteralKind::Guid => typed(Value::Guid(parse_guid(text)?), Primitive::Guid),
        LiteralKind::Duration => {
            let body = quoted_body(text, "duration").ok_or_else(|| wrong_type(text, Primitive::Duration))?;
            typed(Value::Duration(parse_duration(&body)?), Primitive::Duration)
        }
        LiteralKind::Binary => {
            let body = quoted_body(text, "binary")
                .or_else(|| quoted_body(text, "X"))
                .ok_or_else(|| wrong_type(text, Primitive::Binary))?;
            typed(Value::Binary(parse_binary(&body)?), Primitive::Binary)
        }
        LiteralKind::Geography | LiteralKind::Geometry => {
            let geography = literal.kind == LiteralKind::Geography;
            let prefix = if geography { "geography" } else { "geometry" };
            let body = quoted_body(text, prefix).ok_or_else(|| wrong_type(text, prefix))?;
            let value = parse_spatial(&body, geography)?;
            let Value::Spatial { primitive, .. } = &value else {
                return Err(malformed(text, "not a spatial value"));
            };
            let primitive = *primitive;
            typed(value, primitive)
        }
        LiteralKind::Typed => Err(wrong_type(text, "primitive")),
    }
}

fn quoted_body(text: &str, prefix: &str) -> Option<String> {
    let (found, quoted) = split_typed(text)?;
    if found != prefix {
        return None;
    }
    unquote(quoted)
}

/// Parses `text` as a literal of `expected`.
///
/// Enumeration targets need the enumeration definition; use
/// [`parse_enum`] for those.
///
/// # Examples
///
/// ```
/// use odata_uri::literal::try_parse;
/// use odata_uri::model::{Primitive, TypeRef};
/// use odata_uri::Value;
///
/// let int16 = TypeRef::primitive(Primitive::Int16, false);
/// assert_eq!(try_parse("12", &int16).unwrap(), Value::Int16(12));
/// assert!(try_parse("70000", &int16).is_err());
/// ```
pub fn try_parse(text: &str, expected: &TypeRef) -> Result<Value, LiteralError> {
    let text = text.trim();
    if text == "null" {
        return Ok(Value::Null);
    }
    let primitive = match &expected.kind {
        TypeKind::Primitive(p) => *p,
        TypeKind::Untyped => return Ok(Value::String(unquote(text).unwrap_or_else(|| text.to_string()))),
        _ => return Err(wrong_type(text, expected)),
    };
    match primitive {
        Primitive::Boolean => parse_boolean(text),
        p if p.is_integral() => parse_integral(text, p),
        Primitive::Single | Primitive::Double => parse_floating(text, primitive),
        Primitive::Decimal => parse_decimal_literal(text),
        Primitive::String => unquote(text)
            .map(Value::String)
            .ok_or_else(|| wrong_type(text, primitive)),
        Primitive::Date => parse_date(text).map(Value::Date),
        Primitive::TimeOfDay => parse_time_of_day(text).map(Value::TimeOfDay),
        Primitive::DateTimeOffset => parse_date_time_offset(text).map(Value::DateTimeOffset),
        Primitive::Guid => parse_guid(text).map(Value::Guid),
        Primitive::Duration => {
            let body = quoted_body(text, "duration")
                .or_else(|| unquote(text))
                .ok_or_else(|| wrong_type(text, primitive))?;
            parse_duration(&body).map(Value::Duration)
        }
        Primitive::Binary => {
            let body = quoted_body(text, "binary")
                .or_else(|| quoted_body(text, "X"))
                .ok_or_else(|| wrong_type(text, primitive))?;
            parse_binary(&body).map(Value::Binary)
        }
        p if p.is_spatial() => {
            let prefix = if p.is_geography() { "geography" } else { "geometry" };
            let body = quoted_body(text, prefix).ok_or_else(|| wrong_type(text, p))?;
            let value = parse_spatial(&body, p.is_geography())?;
            match &value {
                Value::Spatial { primitive: found, .. } if found.can_promote_to(p) => Ok(value),
                _ => Err(wrong_type(text, p)),
            }
        }
        _ => Err(wrong_type(text, primitive)),
    }
}

fn parse_boolean(text: &str) -> Result<Value, LiteralError> {
    match text {
        "true" => Ok(Value::Boolean(true)),
        "false" => Ok(Value::Boolean(false)),
        _ => Err(wrong_type(text, Primitive::Boolean)),
    }
}

fn parse_integral(text: &str, target: Primitive) -> Result<Value, LiteralError> {
    let digits = if target == Primitive::Int64 {
        strip_suffix_ci(text, 'L')
    } else {
        text
    };
    let digits_only = digits.strip_prefix('-').unwrap_or(digits);
    if digits_only.is_empty() || !digits_only.bytes().all(|b| b.is_ascii_digit()) {
        return Err(wrong_type(text, target));
    }
    let n: i128 = digits
        .parse()
        .map_err(|_| malformed(text, format!("out of range for {target}")))?;
    let out_of_range = || malformed(text, format!("out of range for {target}"));
    Ok(match target {
        Primitive::Byte => Value::Byte(u8::try_from(n).map_err(|_| out_of_range())?),
        Primitive::SByte => Value::SByte(i8::try_from(n).map_err(|_| out_of_range())?),
        Primitive::Int16 => Value::Int16(i16::try_from(n).map_err(|_| out_of_range())?),
        Primitive::Int32 => Value::Int32(i32::try_from(n).map_err(|_| out_of_range())?),
        _ => Value::Int64(i64::try_from(n).map_err(|_| out_of_range())?),
    })
}

fn parse_floating(text: &str, target: Primitive) -> Result<Value, LiteralError> {
    let body = match target {
        Primitive::Single => strip_suffix_ci(text, 'F'),
        _ => strip_suffix_ci(text, 'D'),
    };
    let special = match body {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => None,
    };
    let looks_numeric = body
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
        && body.bytes().any(|b| b.is_ascii_digit());
    let value = match special {
        Some(v) => v,
        None if looks_numeric => body
            .parse::<f64>()
            .map_err(|_| malformed(text, format!("not a valid {target}")))?,
        None => return Err(wrong_type(text, target)),
    };
    if special.is_none() && !value.is_finite() {
        return Err(malformed(text, format!("out of range for {target}")));
    }
    if target == Primitive::Single {
        // Narrowing to f32 is the point of a Single literal.
        #[allow(clippy::cast_possible_truncation)]
        let single = value as f32;
        if value.is_finite() && !single.is_finite() {
            return Err(malformed(text, "out of range for Edm.Single"));
        }
        Ok(Value::Single(single))
    } else {
        Ok(Value::Double(value))
    }
}

fn parse_decimal_literal(text: &str) -> Result<Value, LiteralError> {
    let body = strip_suffix_ci(text, 'M');
    if !body.bytes().any(|b| b.is_ascii_digit()) {
        return Err(wrong_type(text, Primitive::Decimal));
    }
    parse_decimal(body)
        .map(Value::Decimal)
        .ok_or_else(|| malformed(text, "not a valid Edm.Decimal"))
}

/// `YYYY-MM-DD`.
pub fn parse_date(text: &str) -> Result<NaiveDate, LiteralError> {
    let caps = DATE
        .captures(text)
        .ok_or_else(|| wrong_type(text, Primitive::Date))?;
    let number = |i: usize| caps[i].parse::<u32>().unwrap_or(u32::MAX);
    let year = caps[1]
        .parse::<i32>()
        .map_err(|_| malformed(text, "invalid year"))?;
    NaiveDate::from_ymd_opt(year, number(2), number(3))
        .ok_or_else(|| malformed(text, "month or day out of range"))
}

/// `HH:MM:SS[.fraction]`; the fraction is truncated to milliseconds.
pub fn parse_time_of_day(text: &str) -> Result<NaiveTime, LiteralError> {
    let caps = TIME_OF_DAY
        .captures(text)
        .ok_or_else(|| wrong_type(text, Primitive::TimeOfDay))?;
    let number = |i: usize| caps[i].parse::<u32>().unwrap_or(u32::MAX);
    let millis = caps.get(4).map_or(0, |m| fraction(m.as_str(), 3));
    NaiveTime::from_hms_milli_opt(number(1), number(2), number(3), millis)
        .ok_or_else(|| malformed(text, "hour, minute or second out of range"))
}

/// Leading `digits` digits of a fraction, right-padded with zeros.
fn fraction(text: &str, digits: usize) -> u32 {
    let mut padded: String = text.chars().take(digits).collect();
    while padded.len() < digits {
        padded.push('0');
    }
    padded.parse().unwrap_or(0)
}

/// ISO 8601 subset: `YYYY-MM-DDTHH:MM[:SS[.fraction]]` followed by `Z` or
/// `+HH:MM`/`-HH:MM`.
pub fn parse_date_time_offset(text: &str) -> Result<DateTime<FixedOffset>, LiteralError> {
    let caps = DATE_TIME_OFFSET
        .captures(text)
        .ok_or_else(|| wrong_type(text, Primitive::DateTimeOffset))?;
    let number = |i: usize| {
        caps.get(i)
            .map_or(0, |m| m.as_str().parse::<u32>().unwrap_or(u32::MAX))
    };
    let year = caps[1]
        .parse::<i32>()
        .map_err(|_| malformed(text, "invalid year"))?;
    let date = NaiveDate::from_ymd_opt(year, number(2), number(3))
        .ok_or_else(|| malformed(text, "month or day out of range"))?;
    let nanos = caps.get(7).map_or(0, |m| fraction(m.as_str(), 9));
    let time = NaiveTime::from_hms_nano_opt(number(4), number(5), number(6), nanos)
        .ok_or_else(|| malformed(text, "hour, minute or second out of range"))?;

    let offset_seconds = match caps.get(9) {
        None => 0,
        Some(sign) => {
            let minutes = i32::try_from(number(10) * 60 + number(11)).unwrap_or(i32::MAX);
            if sign.as_str() == "-" { -minutes * 60 } else { minutes * 60 }
        }
    };
    let offset = FixedOffset::east_opt(offset_seconds)
        .filter(|_| offset_seconds.abs() <= 14 * 3600)
        .ok_or_else(|| malformed(text, "offset out of range"))?;
    NaiveDateTime::new(date, time)
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| malformed(text, "date-time out of range"))
}

/// Canonical, case-insensitive `8-4-4-4-12` hex form only.
pub fn parse_guid(text: &str) -> Result<Uuid, LiteralError> {
    if !GUID.is_match(text) {
        return Err(wrong_type(text, Primitive::Guid));
    }
    Uuid::parse_str(text).map_err(|e| malformed(text, e.to_string()))
}

/// ISO 8601 day-time duration, e.g. `P1DT2H30M5.5S` or `-PT10M`.
pub fn parse_duration(text: &str) -> Result<TimeDelta, LiteralError> {
    let caps = DURATION
        .captures(text)
        .ok_or_else(|| wrong_type(text, Primitive::Duration))?;
    let has_date = caps.get(2).is_some();
    let has_time = caps.get(3).is_some() || caps.get(4).is_some() || caps.get(5).is_some();
    if !has_date && !has_time || text.ends_with('T') {
        return Err(malformed(text, "a duration needs at least one component"));
    }
    let number = |i: usize| -> Result<i64, LiteralError> {
        caps.get(i).map_or(Ok(0), |m| {
            m.as_str()
                .parse::<i64>()
                .map_err(|_| malformed(text, "component out of range"))
        })
    };
    let seconds = number(2)?
        .checked_mul(86_400)
        .and_then(|s| s.checked_add(number(3).ok()?.checked_mul(3_600)?))
        .and_then(|s| s.checked_add(number(4).ok()?.checked_mul(60)?))
        .and_then(|s| s.checked_add(number(5).ok()?))
        .ok_or_else(|| malformed(text, "component out of range"))?;
    let nanos = caps.get(6).map_or(0, |m| fraction(m.as_str(), 9));
    let delta = TimeDelta::try_seconds(seconds)
        .and_then(|d| d.checked_add(&TimeDelta::nanoseconds(i64::from(nanos))))
        .ok_or_else(|| malformed(text, "duration out of range"))?;
    Ok(if caps.get(1).is_some() { -delta } else { delta })
}

pub fn parse_binary(text: &str) -> Result<Vec<u8>, LiteralError> {
    BINARY
        .decode(text)
        .map_err(|e| malformed(text, e.to_string()))
}

/// Well-known text with an optional `SRID=n;` prefix.
pub fn parse_spatial(text: &str, geography: bool) -> Result<Value, LiteralError> {
    let (srid, wkt) = match SRID.captures(text) {
        Some(caps) => {
            let srid = caps[1]
                .parse::<u32>()
                .map_err(|_| malformed(text, "invalid SRID"))?;
            (Some(srid), &text[caps[0].len()..])
        }
        None => (None, text),
    };
    let wkt = wkt.trim();
    let keyword: String = wkt
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    let shape = match keyword.as_str() {
        "POINT" => 0,
        "LINESTRING" => 1,
        "POLYGON" => 2,
        "MULTIPOINT" => 3,
        "MULTILINESTRING" => 4,
        "MULTIPOLYGON" => 5,
        "GEOMETRYCOLLECTION" | "COLLECTION" => 6,
        _ => return Err(wrong_type(text, if geography { "Edm.Geography" } else { "Edm.Geometry" })),
    };
    let rest = wkt[keyword.len()..].trim();
    if !(rest.eq_ignore_ascii_case("EMPTY") || balanced_coordinates(rest)) {
        return Err(malformed(text, "invalid well-known text"));
    }
    let family = if geography {
        [
            Primitive::GeographyPoint,
            Primitive::GeographyLineString,
            Primitive::GeographyPolygon,
            Primitive::GeographyMultiPoint,
            Primitive::GeographyMultiLineString,
            Primitive::GeographyMultiPolygon,
            Primitive::GeographyCollection,
        ]
    } else {
        [
            Primitive::GeometryPoint,
            Primitive::GeometryLineString,
            Primitive::GeometryPolygon,
            Primitive::GeometryMultiPoint,
            Primitive::GeometryMultiLineString,
            Primitive::GeometryMultiPolygon,
            Primitive::GeometryCollection,
        ]
    };
    Ok(Value::Spatial {
        primitive: family[shape],
        srid,
        wkt: wkt.to_string(),
    })
}

fn balanced_coordinates(text: &str) -> bool {
    if !text.starts_with('(') || !text.ends_with(')') {
        return false;
    }
    let mut depth: i32 = 0;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            c if c.is_ascii_digit() || c.is_ascii_alphabetic() => {}
            ' ' | ',' | '.' | '-' | '+' => {}
            _ => return false,
        }
    }
    depth == 0
}

/// Parses an enumeration literal against `enum_type`.
///
/// Accepts `NS.Type'members'` and bare `'members'`, where `members` is a
/// comma-separated list of member names or underlying values. Several
/// members are OR-ed together, which only a flags enumeration allows.
/// Underlying values need not name a declared member.
///
/// # Examples
///
/// ```
/// use odata_uri::literal::parse_enum;
/// use odata_uri::model::EnumType;
///
/// let color = EnumType::new("NS.Color")
///     .flags()
///     .with_member("Red", 1)
///     .with_member("Green", 2);
///
/// let a = parse_enum("NS.Color'Green,Red'", &color, false).unwrap();
/// let b = parse_enum("'Red,Green'", &color, false).unwrap();
/// assert_eq!(a, b);
/// ```
pub fn parse_enum(text: &str, enum_type: &EnumType, case_insensitive: bool) -> Result<Value, LiteralError> {
    let invalid = || LiteralError::InvalidEnumConstant {
        text: text.to_string(),
    };
    let (prefix, quoted) = split_typed(text).ok_or_else(invalid)?;
    if !prefix.is_empty() && prefix != enum_type.name {
        return Err(wrong_type(text, &enum_type.name));
    }
    let inner = quoted
        .strip_prefix('\'')
        .and_then(|q| q.strip_suffix('\''))
        .filter(|inner| quoted.len() >= 2 && !inner.contains('\''))
        .ok_or_else(invalid)?;
    let tokens: Vec<&str> = inner.split(',').map(str::trim).collect();
    if tokens.iter().any(|t| t.is_empty()) {
        return Err(invalid());
    }
    if tokens.len() > 1 && !enum_type.is_flags {
        return Err(invalid());
    }

    let mut combined: i64 = 0;
    for token in tokens {
        let value = match enum_type.member(token, case_insensitive) {
            Some(member) => member.value,
            None => parse_underlying(token, enum_type.underlying).ok_or_else(invalid)?,
        };
        combined |= value;
    }

    Ok(Value::Enum {
        type_name: enum_type.name.clone(),
        value: combined,
        text: enum_text(enum_type, combined),
    })
}

fn parse_underlying(token: &str, underlying: Primitive) -> Option<i64> {
    let digits = token.strip_prefix('-').unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match parse_integral(token, underlying).ok()? {
        Value::Byte(n) => Some(i64::from(n)),
        other => other.as_i64(),
    }
}

/// Canonical text of an enumeration value: member names in declaration
/// order when they account for every bit, else the number.
fn enum_text(enum_type: &EnumType, value: i64) -> String {
    if let Some(member) = enum_type.members.iter().find(|m| m.value == value) {
        return member.name.clone();
    }
    if enum_type.is_flags {
        let mut covered = 0;
        let names: Vec<&str> = enum_type
            .members
            .iter()
            .filter(|m| m.value != 0 && m.value & value == m.value)
            .inspect(|m| covered |= m.value)
            .map(|m| m.name.as_str())
            .collect();
        if covered == value && !names.is_empty() {
            return names.join(",");
        }
    }
    value.to_string()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_time_of_day(time: &NaiveTime) -> String {
    let millis = time.nanosecond() / 1_000_000;
    if millis == 0 {
        time.format("%H:%M:%S").to_string()
    } else {
        format!("{}.{millis:03}", time.format("%H:%M:%S"))
    }
}

pub fn format_date_time_offset(value: &DateTime<FixedOffset>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn format_duration(duration: &TimeDelta) -> String {
    let sign = if *duration < TimeDelta::zero() { "-" } else { "" };
    let duration = duration.abs();
    let total = duration.num_seconds();
    let nanos = duration.subsec_nanos();
    let (days, hours, minutes, seconds) = (
        total / 86_400,
        total % 86_400 / 3_600,
        total % 3_600 / 60,
        total % 60,
    );
    let mut out = format!("{sign}P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || nanos > 0 || days == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 || nanos > 0 || (hours == 0 && minutes == 0) {
            if nanos > 0 {
                let frac = format!("{nanos:09}");
                out.push_str(&format!("{seconds}.{}S", frac.trim_end_matches('0')));
            } else {
                out.push_str(&format!("{seconds}S"));
            }
        }
    }
    out
}

pub fn format_binary(bytes: &[u8]) -> String {
    BINARY.encode(bytes)
}
