// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform chains bound to a source table.
//!
//! A [`FlowBuilder`] evaluates each step as it is appended, so the caller can inspect the
//! intermediate [`Frame`] (and look up signatures of the columns a step invented) before choosing
//! the next step. [`FlowBuilder::build`] freezes the chain into an immutable [`Flow`].
//!
//! Nothing here touches a table registry. A flow's result stays virtual until it is turned into a
//! [`Table`] or realized into a registry.

extern crate alloc;

use alloc::vec::Vec;

use tracing::trace;
use zonal_core::{ColumnNotFound, Table};

use crate::error::Error;
use crate::frame::Frame;
use crate::ops;
use crate::signature::{ColumnSignature, FlowId, SignatureMinter};
use crate::transform::TransformStep;

/// Incrementally builds and evaluates a [`Flow`].
#[derive(Debug, Clone)]
pub struct FlowBuilder<'a> {
    source: &'a Table,
    minter: SignatureMinter,
    steps: Vec<TransformStep>,
    result: Frame,
}

impl<'a> FlowBuilder<'a> {
    /// Start a chain on `source`. Every source column gets a signature.
    pub fn new(source: &'a Table) -> Self {
        let mut minter = SignatureMinter::new(FlowId::next());
        let result = Frame::from_table(source, &mut minter);
        Self {
            source,
            minter,
            steps: Vec::new(),
            result,
        }
    }

    /// Returns the table this chain reads from.
    pub fn source(&self) -> &'a Table {
        self.source
    }

    /// Returns the steps appended so far.
    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }

    /// Returns the result of the steps appended so far.
    pub fn result(&self) -> &Frame {
        &self.result
    }

    /// Resolve a column of the current result by name.
    pub fn resolve(&self, name: &str) -> Result<ColumnSignature, ColumnNotFound> {
        self.result.signature(name)
    }

    /// Append `step` and evaluate it against the current result.
    ///
    /// On error the chain is left exactly as it was.
    pub fn add(&mut self, step: TransformStep) -> Result<&Frame, Error> {
        let mut minter = self.minter.clone();
        let next = ops::apply(&step, &self.result, &mut minter)?;
        trace!(position = self.steps.len(), step = step.kind(), "appended step");
        self.minter = minter;
        self.result = next;
        self.steps.push(step);
        Ok(&self.result)
    }

    /// Freeze the chain.
    pub fn build(self) -> Flow<'a> {
        Flow {
            source: self.source,
            flow: self.minter.flow(),
            steps: self.steps,
            result: self.result,
        }
    }
}

/// An immutable, evaluated transform chain.
#[derive(Debug, Clone)]
pub struct Flow<'a> {
    source: &'a Table,
    flow: FlowId,
    steps: Vec<TransformStep>,
    result: Frame,
}

impl<'a> Flow<'a> {
    /// Returns the table this flow reads from.
    pub fn source(&self) -> &'a Table {
        self.source
    }

    /// Returns the steps in evaluation order.
    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }

    /// Returns the evaluated result.
    pub fn result(&self) -> &Frame {
        &self.result
    }

    /// Consume the flow, keeping only its result.
    pub fn into_result(self) -> Frame {
        self.result
    }

    /// Re-run every step from the source table.
    ///
    /// Signatures are minted in the same order as the first run, so the returned frame equals
    /// [`Flow::result`] as long as the source table is unchanged.
    pub fn evaluate(&self) -> Result<Frame, Error> {
        let mut minter = SignatureMinter::new(self.flow);
        let mut frame = Frame::from_table(self.source, &mut minter);
        for step in &self.steps {
            frame = ops::apply(step, &frame, &mut minter)?;
        }
        Ok(frame)
    }

    /// Copy the result into a new table called `name`.
    pub fn to_table(&self, name: &str) -> Result<Table, Error> {
        Ok(self.result.to_table(name)?)
    }
}
