// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pipeline driver.

extern crate alloc;

use alloc::string::ToString;

use tracing::{debug, info};
use zonal_core::{RegistryError, Table, TableRegistry};
use zonal_transforms::{AddColumnsSettings, ConfigurationError, Error, add_columns};

use crate::config::PipelineConfig;
use crate::expansion::{CategoryExpansion, Expanded};

/// Expands every configured category pair of a base table and merges the results into one
/// registered output table.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a driver, validating `config` first.
    pub fn new(config: PipelineConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline against `base`, creating or replacing the output table in `registry`.
    ///
    /// Every configured column is looked up before any flow is built. The output table is only
    /// created once the first category pair has expanded successfully, and each later pair is
    /// merged in a single step, so a failing pair leaves the output table as the previous pair
    /// left it.
    pub fn run<R: TableRegistry + ?Sized>(
        &self,
        base: &Table,
        registry: &mut R,
    ) -> Result<(), Error> {
        let config = &self.config;
        info!(
            base = base.name(),
            output = %config.output_table,
            pairs = config.title_columns.len(),
            "starting pipeline"
        );
        self.check_columns(base)?;

        let mut pairs = config.pairs();
        let Some((title, value)) = pairs.next() else {
            return Err(ConfigurationError::EmptyList("title columns").into());
        };
        let first = self.expand(base, title, value)?;
        let rows = first
            .flow()
            .realize(registry, &config.output_table)?
            .row_count();

        for (title, value) in pairs {
            let expanded = self.expand(base, title, value)?;
            let settings = AddColumnsSettings::new(
                config.primary_keys.iter().map(AsRef::<str>::as_ref),
                expanded.keys().iter().copied(),
            )?;
            let output = registry
                .get_table_mut(&config.output_table)
                .ok_or_else(|| RegistryError::TableNotFound(config.output_table.clone()))?;
            let summary = add_columns(output, expanded.result(), &settings)?;
            debug_assert_eq!(output.row_count(), rows, "merges never change the row count");
            debug!(
                title,
                matched = summary.matched,
                columns_added = summary.columns_added,
                "merged category"
            );
        }

        let columns = registry
            .get_table(&config.output_table)
            .map_or(0, |t| t.columns().len());
        info!(output = %config.output_table, rows, columns, "pipeline finished");
        Ok(())
    }

    /// Run the pipeline against the table registered as `base`.
    ///
    /// The base table is copied first, so the output may replace it.
    pub fn run_from_registry<R: TableRegistry + ?Sized>(
        &self,
        registry: &mut R,
        base: &str,
    ) -> Result<(), Error> {
        let table = registry
            .get_table(base)
            .ok_or_else(|| RegistryError::TableNotFound(base.to_string()))?
            .clone();
        self.run(&table, registry)
    }

    fn check_columns(&self, base: &Table) -> Result<(), Error> {
        let config = &self.config;
        for name in config.primary_keys.iter().chain(&config.title_columns) {
            base.require_column(name)?;
        }
        match &config.normalize {
            Some(normalize) => {
                base.require_column(&normalize.bin_column)?;
            }
            None => {
                for name in &config.value_columns {
                    base.require_column(name)?;
                }
            }
        }
        Ok(())
    }

    fn expand<'a>(&self, base: &'a Table, title: &str, value: &str) -> Result<Expanded<'a>, Error> {
        let config = &self.config;
        let expanded = CategoryExpansion::new(&config.primary_keys, title, value, config.measure)
            .with_normalize(config.normalize.as_ref())
            .run(base)?;
        debug!(
            title,
            rows = expanded.result().row_count(),
            areas = expanded.area_columns().count(),
            "expanded category"
        );
        Ok(expanded)
    }
}
