// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Table reshaping for Zonal.
//!
//! This crate provides:
//! - a small step IR ([`TransformStep`]) covering pivot, unpivot, value replacement and
//!   calculated columns,
//! - a lazily built transform chain ([`FlowBuilder`], [`Flow`]) that evaluates each step as it is
//!   appended and tracks column identity with [`ColumnSignature`]s, and
//! - a key-join merge ([`add_columns`]) that widens a registered table with a flow result.
//!
//! Columns are referenced by signature rather than by name once a chain has started: pivots and
//! unpivots invent names, signatures survive them.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod document;
mod error;
mod expr;
mod flow;
mod frame;
mod merge;
mod ops;
mod signature;
mod transform;

pub use error::{ConfigurationError, Error};
pub use expr::{BinaryOp, Expression, ExpressionError};
pub use flow::{Flow, FlowBuilder};
pub use frame::{Frame, FrameColumn};
pub use merge::{AddColumnsSettings, MergeSummary, add_columns};
pub use signature::ColumnSignature;
pub use transform::{
    AggregateOp, ColumnAggregation, EMPTY_CATEGORY_LABEL, NamingExpression, TransformStep,
};
