//! SQL scalar values and column type handles.
//!
//! The index never interprets values beyond ordering them. Ordering is owned
//! by [`SqlType`]: every column of an index carries a type handle and all key
//! comparisons are routed through it.
//!
//! # Null ordering
//!
//! `NULL` sorts before every non-null value of the same type and compares
//! equal to another `NULL`. A descending index column inverts the whole
//! ordering, so nulls move to the end.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single column value of a table row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true for SQL `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Rank used when a value does not belong to the column's type.
    const fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) | Self::Double(_) => 2,
            Self::Text(_) => 3,
            Self::Bytes(_) => 4,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Bytes(b) => write!(f, "X'{}'", hex(b)),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02X}");
        out
    })
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Collation applied to text columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Collation {
    /// Byte-wise ordering of the UTF-8 encoding.
    #[default]
    Binary,
    /// Ordering that ignores letter case.
    CaseInsensitive,
}

/// Type handle of an indexed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Boolean,
    Integer,
    Double,
    Text(Collation),
    Bytes,
}

impl SqlType {
    /// Three-way comparison of two values of this type.
    ///
    /// Side-effect free and total. Integers and doubles compare numerically
    /// with each other. Values that do not belong to this type are ordered by
    /// a fixed cross-type rank so the result stays total.
    #[must_use]
    pub fn compare(self, a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
            (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
            (Value::Double(x), Value::Double(y)) => compare_doubles(*x, *y),
            (Value::Integer(x), Value::Double(y)) => compare_integer_double(*x, *y),
            (Value::Double(x), Value::Integer(y)) => compare_integer_double(*y, *x).reverse(),
            (Value::Text(x), Value::Text(y)) => self.compare_text(x, y),
            (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
            _ => a.type_rank().cmp(&b.type_rank()),
        }
    }

    fn compare_text(self, a: &str, b: &str) -> Ordering {
        match self {
            Self::Text(Collation::CaseInsensitive) => a
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(b.chars().flat_map(char::to_lowercase)),
            _ => a.cmp(b),
        }
    }
}

/// Numeric order of two doubles. Signed zeros are equal so that both stay
/// equal to integer zero; NaNs fall back to `total_cmp`.
#[allow(clippy::float_cmp)]
fn compare_doubles(x: f64, y: f64) -> Ordering {
    if x == y { Ordering::Equal } else { x.total_cmp(&y) }
}

/// Exact order of an integer against a double, without rounding the integer.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn compare_integer_double(i: i64, d: f64) -> Ordering {
    // -2^63 and 2^63 are exact in f64.
    const LOWER: f64 = i64::MIN as f64;
    const UPPER: f64 = -(i64::MIN as f64);

    if d.is_nan() {
        return if d.is_sign_negative() { Ordering::Greater } else { Ordering::Less };
    }
    if d >= UPPER {
        return Ordering::Less;
    }
    if d < LOWER {
        return Ordering::Greater;
    }
    let whole = d.trunc();
    // `whole` lies in [-2^63, 2^63) and is integral, so the cast is exact.
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(d - whole)).unwrap_or(Ordering::Equal),
        unequal => unequal,
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Integer => write!(f, "BIGINT"),
            Self::Double => write!(f, "DOUBLE"),
            Self::Text(Collation::Binary) => write!(f, "VARCHAR"),
            Self::Text(Collation::CaseInsensitive) => write!(f, "VARCHAR_IGNORECASE"),
            Self::Bytes => write!(f, "VARBINARY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nulls_sort_first() {
        let ty = SqlType::Integer;
        assert_eq!(ty.compare(&Value::Null, &Value::Integer(i64::MIN)), Ordering::Less);
        assert_eq!(ty.compare(&Value::Integer(0), &Value::Null), Ordering::Greater);
        assert_eq!(ty.compare(&Value::Null, &Value::Null), Ordering::Equal);
    }

    #[test]
    fn test_numeric_promotion() {
        let ty = SqlType::Double;
        assert_eq!(ty.compare(&Value::Integer(2), &Value::Double(2.5)), Ordering::Less);
        assert_eq!(ty.compare(&Value::Double(3.0), &Value::Integer(3)), Ordering::Equal);
    }

    #[test]
    fn test_mixed_numerics_compare_exactly_past_f64_precision() {
        let ty = SqlType::Double;
        let two_53 = 1_i64 << 53;
        #[allow(clippy::cast_precision_loss)]
        let as_double = two_53 as f64;

        assert_eq!(ty.compare(&Value::Integer(two_53 + 1), &Value::Double(as_double)), Ordering::Greater);
        assert_eq!(ty.compare(&Value::Double(as_double), &Value::Integer(two_53 + 1)), Ordering::Less);
        assert_eq!(ty.compare(&Value::Double(as_double), &Value::Integer(two_53)), Ordering::Equal);
        assert_eq!(ty.compare(&Value::Integer(two_53 - 1), &Value::Double(as_double)), Ordering::Less);

        assert_eq!(ty.compare(&Value::Integer(-3), &Value::Double(-2.5)), Ordering::Less);
        assert_eq!(ty.compare(&Value::Integer(-2), &Value::Double(-2.5)), Ordering::Greater);
        assert_eq!(ty.compare(&Value::Integer(0), &Value::Double(-0.0)), Ordering::Equal);
        assert_eq!(ty.compare(&Value::Double(-0.0), &Value::Double(0.0)), Ordering::Equal);

        assert_eq!(ty.compare(&Value::Integer(i64::MAX), &Value::Double(9.223_372_036_854_776e18)), Ordering::Less);
        assert_eq!(ty.compare(&Value::Integer(i64::MIN), &Value::Double(-9.223_372_036_854_776e18)), Ordering::Equal);
        assert_eq!(ty.compare(&Value::Integer(i64::MIN), &Value::Double(f64::NEG_INFINITY)), Ordering::Greater);
        assert_eq!(ty.compare(&Value::Integer(i64::MAX), &Value::Double(f64::INFINITY)), Ordering::Less);
        assert_eq!(ty.compare(&Value::Integer(i64::MAX), &Value::Double(f64::NAN)), Ordering::Less);
    }

    #[test]
    fn test_case_insensitive_collation() {
        let ci = SqlType::Text(Collation::CaseInsensitive);
        let bin = SqlType::Text(Collation::Binary);

        assert_eq!(ci.compare(&"apple".into(), &"Banana".into()), Ordering::Less);
        assert_eq!(bin.compare(&"apple".into(), &"Banana".into()), Ordering::Greater);
        assert_eq!(ci.compare(&"abc".into(), &"ABC".into()), Ordering::Equal);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::from("x").to_string(), "'x'");
        assert_eq!(Value::Bytes(vec![0xAB, 0x01]).to_string(), "X'AB01'");
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }
}
