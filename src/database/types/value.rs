//! Values crossing the driver boundary
//!
//! Adapters decode result columns into [`SqlValue`], prepared statements bind
//! them, and the quoter turns them into literals via [`SqlValue::to_literal`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single column value or bound parameter
///
/// Temporal and UUID variants hold their canonical text form so that every
/// backend can render them without a type-specific codec.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    UnsignedBigInt(u64),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Json(JsonValue),
    Uuid(String),
    /// `YYYY-MM-DD`
    Date(String),
    /// `HH:MM:SS`
    Time(String),
    /// `YYYY-MM-DD HH:MM:SS`
    DateTime(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Integer view used by count helpers; numeric strings are accepted
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Bool(flag) => Some(i64::from(*flag)),
            SqlValue::Int(n) => Some(i64::from(*n)),
            SqlValue::BigInt(n) => Some(*n),
            SqlValue::UnsignedBigInt(n) => i64::try_from(*n).ok(),
            SqlValue::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Unquoted textual form, as sent to the quoting subsystem
    ///
    /// Returns `None` for NULL only. Booleans become `1`/`0` and binary data
    /// is interpreted lossily as UTF-8.
    pub fn to_literal(&self) -> Option<String> {
        let text = match self {
            SqlValue::Null => return None,
            SqlValue::Bool(flag) => u8::from(*flag).to_string(),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::BigInt(n) => n.to_string(),
            SqlValue::UnsignedBigInt(n) => n.to_string(),
            SqlValue::Double(n) => n.to_string(),
            SqlValue::Decimal(n) => n.to_string(),
            SqlValue::String(text)
            | SqlValue::Uuid(text)
            | SqlValue::Date(text)
            | SqlValue::Time(text)
            | SqlValue::DateTime(text) => text.clone(),
            SqlValue::Bytes(raw) => String::from_utf8_lossy(raw).into_owned(),
            SqlValue::Json(doc) => doc.to_string(),
        };
        Some(text)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bytes(raw) => write!(f, "<binary:{} bytes>", raw.len()),
            other => f.write_str(&other.to_literal().unwrap_or_default()),
        }
    }
}

macro_rules! sql_value_from {
    ($($source:ty => |$v:ident| $body:expr;)*) => {
        $(
            impl From<$source> for SqlValue {
                fn from($v: $source) -> Self {
                    $body
                }
            }
        )*
    };
}

sql_value_from! {
    bool => |v| SqlValue::Bool(v);
    i32 => |v| SqlValue::Int(v);
    i64 => |v| SqlValue::BigInt(v);
    u32 => |v| SqlValue::BigInt(i64::from(v));
    u64 => |v| SqlValue::UnsignedBigInt(v);
    usize => |v| SqlValue::UnsignedBigInt(v as u64);
    f64 => |v| SqlValue::Double(v);
    Decimal => |v| SqlValue::Decimal(v);
    String => |v| SqlValue::String(v);
    &str => |v| SqlValue::String(v.to_owned());
    &String => |v| SqlValue::String(v.clone());
    Vec<u8> => |v| SqlValue::Bytes(v);
    JsonValue => |v| SqlValue::Json(v);
    uuid::Uuid => |v| SqlValue::Uuid(v.hyphenated().to_string());
    chrono::NaiveDate => |v| SqlValue::Date(v.format("%Y-%m-%d").to_string());
    chrono::NaiveTime => |v| SqlValue::Time(v.format("%H:%M:%S").to_string());
    chrono::NaiveDateTime => |v| SqlValue::DateTime(v.format(DATETIME_FORMAT).to_string());
    chrono::DateTime<chrono::Utc> => |v| SqlValue::DateTime(v.naive_utc().format(DATETIME_FORMAT).to_string());
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_forms() {
        assert_eq!(SqlValue::from(100).to_literal().as_deref(), Some("100"));
        assert_eq!(SqlValue::from(true).to_literal().as_deref(), Some("1"));
        assert_eq!(SqlValue::from("Foo").to_literal().as_deref(), Some("Foo"));
        assert_eq!(SqlValue::Null.to_literal(), None);
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<i32> = None;
        assert!(SqlValue::from(none).is_null());
        assert_eq!(SqlValue::from(Some("x")), SqlValue::String("x".to_string()));
    }

    #[test]
    fn test_as_i64_parses_strings() {
        assert_eq!(SqlValue::from(" 42 ").as_i64(), Some(42));
        assert_eq!(SqlValue::from("abc").as_i64(), None);
        assert_eq!(SqlValue::UnsignedBigInt(u64::MAX).as_i64(), None);
    }

    #[test]
    fn test_temporal_values_use_canonical_text() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let stamp = date.and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(SqlValue::from(date), SqlValue::Date("2024-01-15".into()));
        assert_eq!(SqlValue::from(stamp).to_string(), "2024-01-15 10:30:00");
        assert_eq!(SqlValue::Bytes(vec![1, 2]).to_string(), "<binary:2 bytes>");
    }
}
