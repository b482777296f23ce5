use crate::error::VgateError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A column value handed to a vindex, or produced by a reverse mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    Text(String),
    Binary(Vec<u8>),
}

impl Value {
    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int64(_) => 1,
            Value::Uint64(_) => 2,
            Value::Float64(_) => 3,
            Value::Text(_) => 4,
            Value::Binary(_) => 5,
        }
    }

    /// Integral conversion used by numeric vindexes.
    ///
    /// Text and binary values are parsed as a signed integer first and then as
    /// an unsigned one; a `0x` prefix selects base 16.
    pub fn to_u64(&self) -> Result<u64, VgateError> {
        match self {
            Value::Uint64(v) => Ok(*v),
            Value::Int64(v) => signed_to_u64(*v),
            Value::Text(s) => parse_integral(s),
            Value::Binary(b) => match std::str::from_utf8(b) {
                Ok(s) => parse_integral(s),
                Err(_) => Err(could_not_parse(&String::from_utf8_lossy(b))),
            },
            Value::Null | Value::Float64(_) => Err(could_not_parse(&self.to_string())),
        }
    }
}

fn signed_to_u64(v: i64) -> Result<u64, VgateError> {
    u64::try_from(v).map_err(|_| {
        VgateError::Conversion(format!(
            "negative number cannot be converted to unsigned: {v}"
        ))
    })
}

fn parse_integral(raw: &str) -> Result<u64, VgateError> {
    let s = raw.trim();
    let (digits, radix, negative) = split_radix(s);
    if let Ok(v) = i64::from_str_radix(digits, radix) {
        return signed_to_u64(if negative { -v } else { v });
    }
    if !negative && let Ok(v) = u64::from_str_radix(digits, radix) {
        return Ok(v);
    }
    Err(could_not_parse(raw))
}

fn split_radix(s: &str) -> (&str, u32, bool) {
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    match rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16, negative),
        None => (rest, 10, negative),
    }
}

fn could_not_parse(raw: &str) -> VgateError {
    VgateError::Conversion(format!("could not parse value: '{raw}'"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Uint64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Binary(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank_cmp = self.kind_rank().cmp(&other.kind_rank());
        if rank_cmp != Ordering::Equal {
            return rank_cmp;
        }

        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Uint64(a), Value::Uint64(b)) => a.cmp(b),
            (Value::Float64(a), Value::Float64(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Binary(a), Value::Binary(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use crate::error::VgateError;

    #[test]
    fn unsigned_and_positive_signed_convert() {
        assert_eq!(Value::Uint64(u64::MAX).to_u64().expect("u64"), u64::MAX);
        assert_eq!(Value::Int64(42).to_u64().expect("i64"), 42);
        assert_eq!(Value::from("1234").to_u64().expect("text"), 1234);
        assert_eq!(Value::from("0x10").to_u64().expect("hex text"), 16);
        assert_eq!(
            Value::from("18446744073709551615").to_u64().expect("max text"),
            u64::MAX
        );
        assert_eq!(Value::Binary(b"7".to_vec()).to_u64().expect("binary"), 7);
    }

    #[test]
    fn negative_and_non_integral_values_fail() {
        let err = Value::Int64(-1).to_u64().expect_err("negative");
        assert_eq!(
            err.to_string(),
            "negative number cannot be converted to unsigned: -1"
        );
        let err = Value::from("-5").to_u64().expect_err("negative text");
        assert!(matches!(err, VgateError::Conversion(_)));
        let err = Value::from("abcd").to_u64().expect_err("garbage");
        assert_eq!(err.to_string(), "could not parse value: 'abcd'");
        assert!(Value::Float64(1.5).to_u64().is_err());
        assert!(Value::Null.to_u64().is_err());
    }

    #[test]
    fn ordering_groups_by_kind() {
        let mut values = vec![
            Value::from("b"),
            Value::Uint64(3),
            Value::Null,
            Value::Int64(-1),
            Value::from("a"),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Int64(-1),
                Value::Uint64(3),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }
}
