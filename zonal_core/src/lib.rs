// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `zonal_core`: typed in-memory tables and the table registry boundary.
//!
//! This crate provides:
//! - cell values and their types ([`Value`], [`DataType`])
//! - named, typed columns collected into a [`Table`]
//! - the [`TableRegistry`] trait hosts implement to own tables by name, plus an in-memory
//!   [`Document`] implementation
//!
//! Reshaping lives in `zonal_transforms`; this crate only stores and validates data.

#![no_std]

extern crate alloc;

mod document;
mod table;
mod value;

pub use document::{Document, RegistryError, TableRegistry};
pub use table::{Column, ColumnNotFound, Table, TableError};
pub use value::{DataType, Value, ValueParseError};
