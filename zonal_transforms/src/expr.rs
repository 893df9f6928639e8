// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Calculated-column expressions.
//!
//! Expressions reference columns by [`ColumnSignature`]. They can be built directly:
//!
//! ```ignore
//! let zone = Expression::column(category).split(".", 1);
//! let ratio = Expression::count_over(fine) / Expression::count_over(coarse);
//! ```
//!
//! or parsed from the host's textual syntax, where `[Column Name]` references are resolved
//! against a frame at parse time:
//!
//! ```text
//! Split([Category], '.', 2)
//! Count() OVER ([Lot], [Wafer], [Circle], [Bin]) / Count() OVER ([Lot], [Wafer], [Circle])
//! Real(SN([Value], 0))
//! ```

extern crate alloc;

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::ops;

use hashbrown::HashMap;
use pest::Parser as _;
use pest::error::InputLocation;
use smallvec::SmallVec;
use zonal_core::{DataType, Value};

use crate::error::Error;
use crate::frame::Frame;
use crate::signature::ColumnSignature;

use grammar::{ExpressionParser, Rule};

/// Errors in the shape of an expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    /// The text does not match the expression grammar.
    #[error("syntax error at {position}: {message}")]
    Syntax {
        /// Byte offset in the source text.
        position: usize,
        /// What the parser expected.
        message: String,
    },
    /// A function name is not known.
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    /// A function was called with the wrong number of arguments.
    #[error("`{function}` takes {expected} arguments, found {found}")]
    Arity {
        /// The function.
        function: String,
        /// Expected argument count.
        expected: usize,
        /// Supplied argument count.
        found: usize,
    },
    /// A function argument has the wrong form.
    #[error("invalid argument to `{function}`: {reason}")]
    InvalidArgument {
        /// The function.
        function: String,
        /// What is wrong.
        reason: &'static str,
    },
    /// An arithmetic operator was applied to a non-numeric operand.
    #[error("operator `{operator}` needs numeric operands, found {found}")]
    NonNumeric {
        /// The operator symbol.
        operator: &'static str,
        /// Type of the offending operand.
        found: DataType,
    },
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/` (always real-valued; division by zero yields null)
    Div,
}

impl BinaryOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

/// A per-row expression over the columns of a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A constant. A null literal is typed `Real`.
    Literal(Value),
    /// The value of a column.
    Column(ColumnSignature),
    /// Part `part` (1-based) of the input's text split on `delimiter`; null if there is no such
    /// part.
    Split {
        /// Text to split. Non-string values are split on their display form.
        input: Box<Expression>,
        /// Delimiter, matched literally.
        delimiter: String,
        /// 1-based index of the part to keep.
        part: usize,
    },
    /// The input, with nulls replaced by `fallback` (cast to the input's type).
    SubstituteNull {
        /// Primary value.
        input: Box<Expression>,
        /// Used where `input` is null.
        fallback: Box<Expression>,
    },
    /// The input converted to another type.
    Cast {
        /// Value to convert.
        input: Box<Expression>,
        /// Target type.
        to: DataType,
    },
    /// The number of rows sharing this row's values in `partition` (the whole table when empty).
    CountOver(Vec<ColumnSignature>),
    /// Arithmetic on two numeric operands. Nulls propagate.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expression>,
        /// Right operand.
        rhs: Box<Expression>,
    },
}

impl Expression {
    /// A constant expression.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// A column reference.
    pub const fn column(sig: ColumnSignature) -> Self {
        Self::Column(sig)
    }

    /// `Count() OVER (partition…)`.
    pub fn count_over(partition: impl IntoIterator<Item = ColumnSignature>) -> Self {
        Self::CountOver(partition.into_iter().collect())
    }

    /// `Split(self, delimiter, part)`.
    pub fn split(self, delimiter: impl Into<String>, part: usize) -> Self {
        Self::Split {
            input: Box::new(self),
            delimiter: delimiter.into(),
            part,
        }
    }

    /// `SN(self, fallback)`.
    pub fn substitute_null(self, fallback: Self) -> Self {
        Self::SubstituteNull {
            input: Box::new(self),
            fallback: Box::new(fallback),
        }
    }

    /// Convert to `to`.
    pub fn cast(self, to: DataType) -> Self {
        Self::Cast {
            input: Box::new(self),
            to,
        }
    }

    /// Combine two expressions with an operator.
    pub fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Parse the host's expression syntax, resolving `[Column]` references against `frame`.
    pub fn parse(text: &str, frame: &Frame) -> Result<Self, Error> {
        let mut pairs =
            ExpressionParser::parse(Rule::expression, text).map_err(syntax_error)?;
        let sum = pairs
            .next()
            .and_then(|e| e.into_inner().next())
            .ok_or_else(|| ExpressionError::Syntax {
                position: 0,
                message: "empty expression".into(),
            })?;
        Lowering { frame }.lower(sum)
    }

    /// Append every signature this expression reads to `out`.
    pub fn collect_signatures(&self, out: &mut Vec<ColumnSignature>) {
        match self {
            Self::Literal(_) => {}
            Self::Column(sig) => out.push(*sig),
            Self::CountOver(partition) => out.extend(partition.iter().copied()),
            Self::Split { input, .. } | Self::Cast { input, .. } => input.collect_signatures(out),
            Self::SubstituteNull { input, fallback } => {
                input.collect_signatures(out);
                fallback.collect_signatures(out);
            }
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_signatures(out);
                rhs.collect_signatures(out);
            }
        }
    }

    /// Returns the type this expression produces against `frame`.
    pub fn data_type(&self, frame: &Frame) -> Result<DataType, Error> {
        Ok(match self {
            Self::Literal(v) => v.data_type().unwrap_or(DataType::Real),
            Self::Column(sig) => frame.require(*sig)?.data_type,
            Self::Split { .. } => DataType::String,
            Self::SubstituteNull { input, .. } => input.data_type(frame)?,
            Self::Cast { to, .. } => *to,
            Self::CountOver(_) => DataType::Integer,
            Self::Binary { op, lhs, rhs } => {
                let l = lhs.data_type(frame)?;
                let r = rhs.data_type(frame)?;
                for t in [l, r] {
                    if !t.is_numeric() {
                        return Err(ExpressionError::NonNumeric {
                            operator: op.symbol(),
                            found: t,
                        }
                        .into());
                    }
                }
                match (op, l, r) {
                    (BinaryOp::Div, _, _) => DataType::Real,
                    (_, DataType::Integer, DataType::Integer) => DataType::Integer,
                    _ => DataType::Real,
                }
            }
        })
    }

    /// Evaluate for every row of `frame`.
    pub fn evaluate(&self, frame: &Frame) -> Result<Vec<Value>, Error> {
        let n = frame.row_count();
        match self {
            Self::Literal(v) => Ok(vec![v.clone(); n]),
            Self::Column(sig) => Ok(frame.require(*sig)?.values.clone()),
            Self::Split {
                input,
                delimiter,
                part,
            } => {
                let vals = input.evaluate(frame)?;
                Ok(vals
                    .iter()
                    .map(|v| match v {
                        Value::Null => Value::Null,
                        Value::String(s) => split_part(s, delimiter, *part),
                        other => split_part(&other.to_string(), delimiter, *part),
                    })
                    .collect())
            }
            Self::SubstituteNull { input, fallback } => {
                let ty = input.data_type(frame)?;
                let mut vals = input.evaluate(frame)?;
                let fallback = fallback.evaluate(frame)?;
                for (v, f) in vals.iter_mut().zip(fallback) {
                    if v.is_null() {
                        *v = f.cast(ty)?;
                    }
                }
                Ok(vals)
            }
            Self::Cast { input, to } => input
                .evaluate(frame)?
                .iter()
                .map(|v| v.cast(*to).map_err(Error::from))
                .collect(),
            Self::CountOver(partition) => {
                let cols = partition
                    .iter()
                    .map(|sig| frame.require(*sig).map(|c| &c.values))
                    .collect::<Result<Vec<_>, _>>()?;
                let key = |row: usize| -> SmallVec<[&Value; 4]> {
                    cols.iter().map(|c| &c[row]).collect()
                };
                let mut counts: HashMap<SmallVec<[&Value; 4]>, i64> = HashMap::new();
                for row in 0..n {
                    *counts.entry(key(row)).or_default() += 1;
                }
                Ok((0..n)
                    .map(|row| Value::Integer(counts.get(&key(row)).copied().unwrap_or(0)))
                    .collect())
            }
            Self::Binary { op, lhs, rhs } => {
                let ty = self.data_type(frame)?;
                let l = lhs.evaluate(frame)?;
                let r = rhs.evaluate(frame)?;
                Ok(l.iter()
                    .zip(&r)
                    .map(|(a, b)| arithmetic(*op, ty, a, b))
                    .collect())
            }
        }
    }
}

fn split_part(s: &str, delimiter: &str, part: usize) -> Value {
    if delimiter.is_empty() || part == 0 {
        return Value::Null;
    }
    s.split(delimiter)
        .nth(part - 1)
        .map_or(Value::Null, |p| Value::String(p.to_string()))
}

fn arithmetic(op: BinaryOp, ty: DataType, a: &Value, b: &Value) -> Value {
    if let (DataType::Integer, Value::Integer(x), Value::Integer(y)) = (ty, a, b) {
        let out = match op {
            BinaryOp::Add => x.checked_add(*y),
            BinaryOp::Sub => x.checked_sub(*y),
            BinaryOp::Mul => x.checked_mul(*y),
            BinaryOp::Div => None,
        };
        return out.map_or(Value::Null, Value::Integer);
    }
    let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
        return Value::Null;
    };
    match op {
        BinaryOp::Add => Value::real(x + y),
        BinaryOp::Sub => Value::real(x - y),
        BinaryOp::Mul => Value::real(x * y),
        BinaryOp::Div if y == 0.0 => Value::Null,
        BinaryOp::Div => Value::real(x / y),
    }
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl ops::$trait for Expression {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                Self::binary($op, self, rhs)
            }
        }
    };
}

binary_operator!(Add, add, BinaryOp::Add);
binary_operator!(Sub, sub, BinaryOp::Sub);
binary_operator!(Mul, mul, BinaryOp::Mul);
binary_operator!(Div, div, BinaryOp::Div);

mod grammar {
    #![allow(missing_docs, unreachable_pub, reason = "generated by pest_derive")]

    #[derive(Debug, pest_derive::Parser)]
    #[grammar = "expr.pest"]
    pub(super) struct ExpressionParser;
}

type Pair<'i> = pest::iterators::Pair<'i, Rule>;

fn syntax_error(err: pest::error::Error<Rule>) -> ExpressionError {
    let position = match err.location {
        InputLocation::Pos(p) => p,
        InputLocation::Span((start, _)) => start,
    };
    ExpressionError::Syntax {
        position,
        message: err.variant.message().into_owned(),
    }
}

/// The grammar guarantees the shape of every pair; this covers the impossible remainder.
fn malformed(pair: &Pair<'_>) -> ExpressionError {
    ExpressionError::Syntax {
        position: pair.as_span().start(),
        message: alloc::format!("unexpected {:?}", pair.as_rule()),
    }
}

/// Drop one of each doubled `close` inside a delimited literal.
fn unescape(pair: Pair<'_>, close: &str) -> String {
    let body = pair.into_inner().next().map_or("", |p| p.as_str());
    let doubled = alloc::format!("{close}{close}");
    body.replace(&doubled, close)
}

/// Turns parse pairs into [`Expression`]s, resolving column names against a frame.
struct Lowering<'a> {
    frame: &'a Frame,
}

impl Lowering<'_> {
    fn lower(&self, pair: Pair<'_>) -> Result<Expression, Error> {
        match pair.as_rule() {
            Rule::sum | Rule::product => self.fold(pair),
            Rule::unary => self.unary(pair),
            Rule::count => self.count(pair),
            Rule::call => self.call(pair),
            Rule::keyword => Ok(match pair.as_str().to_ascii_lowercase().as_str() {
                "true" => Expression::literal(true),
                "false" => Expression::literal(false),
                _ => Expression::Literal(Value::Null),
            }),
            Rule::column => Ok(Expression::column(self.column(pair)?)),
            Rule::string => Ok(Expression::literal(unescape(pair, "'"))),
            Rule::number => number(&pair).map_err(Error::from),
            _ => Err(malformed(&pair).into()),
        }
    }

    fn column(&self, pair: Pair<'_>) -> Result<ColumnSignature, Error> {
        Ok(self.frame.signature(&unescape(pair, "]"))?)
    }

    /// A left-associative chain `operand (op operand)*`.
    fn fold(&self, pair: Pair<'_>) -> Result<Expression, Error> {
        let bad = malformed(&pair);
        let mut inner = pair.into_inner();
        let mut lhs = self.lower(inner.next().ok_or_else(|| bad.clone())?)?;
        while let Some(op) = inner.next() {
            let op = match op.as_str() {
                "+" => BinaryOp::Add,
                "-" => BinaryOp::Sub,
                "*" => BinaryOp::Mul,
                _ => BinaryOp::Div,
            };
            let rhs = self.lower(inner.next().ok_or_else(|| bad.clone())?)?;
            lhs = Expression::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&self, pair: Pair<'_>) -> Result<Expression, Error> {
        let bad = malformed(&pair);
        let mut negate = false;
        let mut operand = None;
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::neg => negate = !negate,
                _ => operand = Some(p),
            }
        }
        let e = self.lower(operand.ok_or(bad)?)?;
        if !negate {
            return Ok(e);
        }
        Ok(match e {
            Expression::Literal(Value::Integer(i)) => Expression::literal(-i),
            Expression::Literal(Value::Real(r)) => Expression::literal(-r.0),
            e => Expression::literal(0_i64) - e,
        })
    }

    fn count(&self, pair: Pair<'_>) -> Result<Expression, Error> {
        let partition = match pair.into_inner().next() {
            Some(over) => over
                .into_inner()
                .map(|c| self.column(c))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        Ok(Expression::CountOver(partition))
    }

    fn call(&self, pair: Pair<'_>) -> Result<Expression, Error> {
        let bad = malformed(&pair);
        let mut inner = pair.into_inner();
        let name = inner.next().ok_or(bad)?.as_str();
        let args = inner.map(|a| self.lower(a)).collect::<Result<Vec<_>, _>>()?;
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "split" => {
                let [input, delim, part] = arguments(name, args)?;
                let invalid = |reason| ExpressionError::InvalidArgument {
                    function: name.to_string(),
                    reason,
                };
                let Expression::Literal(Value::String(delimiter)) = delim else {
                    return Err(invalid("delimiter must be a string literal").into());
                };
                let part = match part {
                    Expression::Literal(Value::Integer(p)) if p >= 1 => {
                        usize::try_from(p).map_err(|_| invalid("part is too large"))?
                    }
                    _ => return Err(invalid("part must be a positive integer literal").into()),
                };
                Ok(input.split(delimiter, part))
            }
            "sn" => {
                let [input, fallback] = arguments(name, args)?;
                Ok(input.substitute_null(fallback))
            }
            "real" | "integer" | "string" => {
                let [input] = arguments(name, args)?;
                let to = match lower.as_str() {
                    "real" => DataType::Real,
                    "integer" => DataType::Integer,
                    _ => DataType::String,
                };
                Ok(input.cast(to))
            }
            // `Count()` itself is its own rule; reaching here means it had arguments.
            "count" => {
                arguments::<0>(name, args)?;
                Ok(Expression::CountOver(Vec::new()))
            }
            _ => Err(ExpressionError::UnknownFunction(name.to_string()).into()),
        }
    }
}

fn arguments<const N: usize>(
    function: &str,
    args: Vec<Expression>,
) -> Result<[Expression; N], ExpressionError> {
    let found = args.len();
    args.try_into().map_err(|_| ExpressionError::Arity {
        function: function.to_string(),
        expected: N,
        found,
    })
}

fn number(pair: &Pair<'_>) -> Result<Expression, ExpressionError> {
    let text = pair.as_str();
    let invalid = || ExpressionError::Syntax {
        position: pair.as_span().start(),
        message: alloc::format!("invalid number `{text}`"),
    };
    if text.contains('.') {
        text.parse::<f64>()
            .map(Expression::literal)
            .map_err(|_| invalid())
    } else {
        text.parse::<i64>()
            .map(Expression::literal)
            .map_err(|_| invalid())
    }
}
