// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Writing flow results into a [`TableRegistry`].

use tracing::info;
use zonal_core::{Table, TableRegistry};

use crate::error::Error;
use crate::flow::Flow;

impl Flow<'_> {
    /// Register this flow's result as `name`, replacing any table already registered under it.
    pub fn realize<'r, R: TableRegistry + ?Sized>(
        &self,
        registry: &'r mut R,
        name: &str,
    ) -> Result<&'r Table, Error> {
        let table = self.to_table(name)?;
        let replaced = registry.contains_table(name);
        let table = registry.create_or_replace(table)?;
        info!(
            table = name,
            rows = table.row_count(),
            columns = table.columns().len(),
            replaced,
            "realized flow result"
        );
        Ok(table)
    }
}
