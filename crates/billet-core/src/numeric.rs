//! Explicit numeric coercion for values read from the store
//!
//! SQLite columns are dynamically typed, so a `REAL` column can hand back an
//! integer, a real, text (e.g. rows written by another client as `'12.50'`) or
//! NULL. Analytics never sums a column directly: every amount is read as a
//! [`WireNumber`] and converted with [`WireNumber::to_f64`], which either
//! yields a finite number or fails with [`Error::InvalidNumber`].

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};

use crate::error::{Error, Result};

/// A numeric column value exactly as the store returned it
#[derive(Debug, Clone, PartialEq)]
pub enum WireNumber {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl WireNumber {
    /// Coerce to a finite `f64`
    ///
    /// NULL and blank text count as zero. Text must parse as a finite decimal
    /// number; anything else is an `InvalidNumber` error naming `field`.
    pub fn to_f64(&self, field: &'static str) -> Result<f64> {
        match self {
            Self::Null => Ok(0.0),
            Self::Integer(i) => Ok(*i as f64),
            Self::Real(r) if r.is_finite() => Ok(*r),
            Self::Real(r) => Err(Error::InvalidNumber {
                field,
                value: r.to_string(),
            }),
            Self::Text(s) => parse_number(field, s),
        }
    }
}

impl From<f64> for WireNumber {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<i64> for WireNumber {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for WireNumber {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl FromSql for WireNumber {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::Null),
            ValueRef::Integer(i) => Ok(Self::Integer(i)),
            ValueRef::Real(r) => Ok(Self::Real(r)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| Self::Text(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

/// Parse a textual number, treating blank input as zero
pub fn parse_number(field: &'static str, raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}
