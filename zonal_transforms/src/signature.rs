// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stable column identity across a flow.
//!
//! Pivots and unpivots invent column names, so later steps cannot reliably find earlier columns
//! by name. Instead every column of an evaluated frame carries a [`ColumnSignature`] that is
//! minted once, when the column first appears, and travels unchanged through every step that
//! passes the column along.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

static NEXT_FLOW: AtomicU32 = AtomicU32::new(1);

/// Identifies the flow a signature was minted by.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct FlowId(u32);

impl FlowId {
    pub(crate) fn next() -> Self {
        Self(NEXT_FLOW.fetch_add(1, Ordering::Relaxed))
    }
}

/// An opaque handle to one logical column of one flow.
///
/// Two signatures are equal iff they denote the same logical column. Signatures from different
/// flows never compare equal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnSignature {
    flow: FlowId,
    serial: u32,
}

impl fmt::Display for ColumnSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.flow.0, self.serial)
    }
}

/// Mints signatures for a single flow.
///
/// Serials are handed out in evaluation order, so re-running the same steps from the same source
/// with a fresh minter for the same flow reproduces the same signatures.
#[derive(Debug, Clone)]
pub(crate) struct SignatureMinter {
    flow: FlowId,
    next: u32,
}

impl SignatureMinter {
    pub(crate) fn new(flow: FlowId) -> Self {
        Self { flow, next: 0 }
    }

    pub(crate) fn flow(&self) -> FlowId {
        self.flow
    }

    pub(crate) fn mint(&mut self) -> ColumnSignature {
        let sig = ColumnSignature {
            flow: self.flow,
            serial: self.next,
        };
        self.next += 1;
        sig
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minters_for_different_flows_never_collide() {
        let mut a = SignatureMinter::new(FlowId::next());
        let mut b = SignatureMinter::new(FlowId::next());
        let a0 = a.mint();
        let b0 = b.mint();
        assert_ne!(a0, b0);
        assert_ne!(a0, a.mint());
    }

    #[test]
    fn replaying_a_minter_reproduces_signatures() {
        let flow = FlowId::next();
        let mut first = SignatureMinter::new(flow);
        let mut second = SignatureMinter::new(flow);
        for _ in 0..3 {
            assert_eq!(first.mint(), second.mint());
        }
    }
}
