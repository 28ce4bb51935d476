use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::model::Primitive;

/// A constant value produced by the literal parser.
///
/// Each variant corresponds to one primitive type of the model, plus the
/// enumeration, spatial and collection forms a literal can take.
///
/// # Examples
///
/// ```
/// use odata_uri::Value;
///
/// let count = Value::Int32(42);
/// let name = Value::String("Alice".to_string());
/// let list = Value::Collection(vec![Value::Int32(1), Value::Int32(2)]);
///
/// assert_eq!(count.as_i64(), Some(42));
/// assert!(!name.is_null());
/// assert_eq!(list.to_literal(), "[1,2]");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(u8),
    SByte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Guid(Uuid),
    Date(NaiveDate),
    TimeOfDay(NaiveTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Duration(TimeDelta),
    Binary(Vec<u8>),

    /// Enumeration constant. `value` is the combined underlying value and may
    /// not match any declared member.
    Enum {
        type_name: String,
        value: i64,
        text: String,
    },

    /// Well-known-text spatial literal
    Spatial {
        primitive: Primitive,
        srid: Option<u32>,
        wkt: String,
    },

    Collection(Vec<Value>),

    /// Complex or untyped JSON payload used as a parameter value
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integral view of any integer-typed value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(n) => Some(i64::from(*n)),
            Value::SByte(n) => Some(i64::from(*n)),
            Value::Int16(n) => Some(i64::from(*n)),
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Literal text that the literal parser would accept back.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Byte(n) => n.to_string(),
            Value::SByte(n) => n.to_string(),
            Value::Int16(n) => n.to_string(),
            Value::Int32(n) => n.to_string(),
            Value::Int64(n) => n.to_string(),
            Value::Single(n) => n.to_string(),
            Value::Double(n) => n.to_string(),
            Value::Decimal(n) => n.to_string(),
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Guid(g) => g.hyphenated().to_string(),
            Value::Date(d) => crate::literal::format_date(d),
            Value::TimeOfDay(t) => crate::literal::format_time_of_day(t),
            Value::DateTimeOffset(dt) => crate::literal::format_date_time_offset(dt),
            Value::Duration(d) => format!("duration'{}'", crate::literal::format_duration(d)),
            Value::Binary(bytes) => format!("binary'{}'", crate::literal::format_binary(bytes)),
            Value::Enum {
                type_name, text, ..
            } => format!("{type_name}'{text}'"),
            Value::Spatial {
                primitive,
                srid,
                wkt,
            } => {
                let prefix = if primitive.is_geography() {
                    "geography"
                } else {
                    "geometry"
                };
                match srid {
                    Some(srid) => format!("{prefix}'SRID={srid};{wkt}'"),
                    None => format!("{prefix}'{wkt}'"),
                }
            }
            Value::Collection(items) => {
                let items: Vec<String> = items.iter().map(Value::to_literal).collect();
                format!("[{}]", items.join(","))
            }
            Value::Json(json) => json.to_string(),
        }
    }
}
