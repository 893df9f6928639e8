// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cell values and column data types.

extern crate alloc;

use alloc::string::{String, ToString};
use core::fmt;

use ordered_float::OrderedFloat;

/// The data type of a [`Column`](crate::Column).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    /// UTF-8 text.
    String,
    /// 64-bit floating point.
    Real,
    /// 64-bit signed integer.
    Integer,
    /// `true` / `false`.
    Boolean,
}

impl DataType {
    /// Returns the host-facing name of this type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Real => "Real",
            Self::Integer => "Integer",
            Self::Boolean => "Boolean",
        }
    }

    /// Returns `true` for [`DataType::Real`] and [`DataType::Integer`].
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Real | Self::Integer)
    }

    /// Parse a literal into a value of this type.
    ///
    /// Surrounding whitespace is ignored for non-string types. Text is never coerced across
    /// types: `"0.0"` parses as a `Real` but not as an `Integer`.
    pub fn parse(self, text: &str) -> Result<Value, ValueParseError> {
        let err = || ValueParseError {
            text: text.to_string(),
            data_type: self,
        };
        match self {
            Self::String => Ok(Value::String(text.to_string())),
            Self::Real => text
                .trim()
                .parse::<f64>()
                .map(Value::real)
                .map_err(|_| err()),
            Self::Integer => text
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| err()),
            Self::Boolean => {
                let t = text.trim();
                if t.eq_ignore_ascii_case("true") {
                    Ok(Value::Boolean(true))
                } else if t.eq_ignore_ascii_case("false") {
                    Ok(Value::Boolean(false))
                } else {
                    Err(err())
                }
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A literal could not be coerced to the requested [`DataType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse `{text}` as {data_type}")]
pub struct ValueParseError {
    /// The offending text (or the display form of the offending value).
    pub text: String,
    /// The type the text was parsed or cast to.
    pub data_type: DataType,
}

/// A single cell.
///
/// `Real` wraps its float in [`OrderedFloat`] so values can be hashed, compared and used as
/// grouping keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Missing value. Sorts before everything else.
    #[default]
    Null,
    /// Text value.
    String(String),
    /// Floating point value.
    Real(OrderedFloat<f64>),
    /// Integer value.
    Integer(i64),
    /// Boolean value.
    Boolean(bool),
}

impl Value {
    /// Create a [`Value::Real`].
    pub const fn real(v: f64) -> Self {
        Self::Real(OrderedFloat(v))
    }

    /// Returns `true` for [`Value::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the type of this value, or `None` for [`Value::Null`].
    pub const fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::String(_) => Some(DataType::String),
            Self::Real(_) => Some(DataType::Real),
            Self::Integer(_) => Some(DataType::Integer),
            Self::Boolean(_) => Some(DataType::Boolean),
        }
    }

    /// Returns the numeric value of a `Real` or `Integer`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(v.0),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns the text of a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if this value can live in a column of type `ty`.
    pub fn fits(&self, ty: DataType) -> bool {
        self.data_type().is_none_or(|t| t == ty)
    }

    /// Convert this value to another type.
    ///
    /// Nulls stay null. Numbers widen from `Integer` to `Real`, and a `Real` narrows to an
    /// `Integer` only when it has no fractional part. Anything can become a `String`; strings
    /// are parsed with [`DataType::parse`].
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the round trip check rejects values that do not fit"
    )]
    pub fn cast(&self, to: DataType) -> Result<Self, ValueParseError> {
        let err = || ValueParseError {
            text: self.to_string(),
            data_type: to,
        };
        match (self, to) {
            (Self::Null, _) => Ok(Self::Null),
            (v, t) if v.data_type() == Some(t) => Ok(v.clone()),
            (v, DataType::String) => Ok(Self::String(v.to_string())),
            (Self::String(s), t) => t.parse(s),
            (Self::Integer(i), DataType::Real) => Ok(Self::real(*i as f64)),
            (Self::Real(r), DataType::Integer) => {
                let i = r.0 as i64;
                if i as f64 == r.0 {
                    Ok(Self::Integer(i))
                } else {
                    Err(err())
                }
            }
            (Self::Boolean(b), DataType::Integer) => Ok(Self::Integer(i64::from(*b))),
            (Self::Boolean(b), DataType::Real) => Ok(Self::real(if *b { 1.0 } else { 0.0 })),
            _ => Err(err()),
        }
    }
}

/// Nulls render as the empty string; reals use Rust's shortest round-trip form, so `1.0`
/// renders as `1`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::String(s) => f.write_str(s),
            Self::Real(v) => write!(f, "{}", v.0),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::real(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
