// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Example binary for `zonal_pipeline`.
//!
//! Builds a synthetic wafer-die table, runs the category expansion over it and prints the
//! resulting zone profile table. Pass a path to a JSON `PipelineConfig` to override the default
//! configuration; set `RUST_LOG=debug` to follow each transform step.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use zonal_core::{DataType, Document, Table, TableError, TableRegistry, Value};
use zonal_pipeline::{AggregateOp, Pipeline, PipelineConfig};

const BASE_TABLE: &str = "Dies";

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(message) => {
                error!(%path, %message, "could not read configuration");
                return ExitCode::FAILURE;
            }
        },
        None => PipelineConfig::new(
            ["Lot", "Wafer", "Bin"],
            ["Circle", "Segment"],
            ["CirclePct", "SegmentPct"],
            AggregateOp::Avg,
            "Zone Profiles",
        ),
    };

    let mut document = Document::new();
    let registered = dies()
        .map_err(|e| e.to_string())
        .and_then(|base| document.add_table(base).map_err(|e| e.to_string()));
    if let Err(message) = registered {
        error!(%message, "could not register the base table");
        return ExitCode::FAILURE;
    }

    let output = config.output_table.clone();
    let result = Pipeline::new(config).and_then(|p| p.run_from_registry(&mut document, BASE_TABLE));
    if let Err(err) = result {
        error!(%err, "pipeline failed");
        return ExitCode::FAILURE;
    }

    info!(tables = ?document.table_names(), "document updated");
    if let Some(table) = document.get_table(&output) {
        println!("{table}");
    }
    ExitCode::SUCCESS
}

fn load_config(path: &str) -> Result<PipelineConfig, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

/// Two lots of three wafers, each die binned and assigned to a circle and a segment.
fn dies() -> Result<Table, TableError> {
    let circles = ["Center", "Donut", "Edge"];
    let mut rows = Vec::new();
    for lot in ["A113", "A114"] {
        for wafer in 1..=3_i64 {
            for (index, circle) in circles.iter().cycle().take(24).enumerate() {
                let die = index as i64;
                let bin = 1 + (die * 7 + wafer) % 4;
                // Some dies sit outside every segment.
                let segment = (die % 5 != 4).then_some(1 + (die + wafer) % 4);
                rows.push(vec![
                    Value::from(lot),
                    Value::Integer(wafer),
                    Value::Integer(bin),
                    Value::from(*circle),
                    Value::real(((die * 13 + wafer * 5) % 100) as f64 / 100.0),
                    Value::from(segment),
                    Value::real(((die * 29 + wafer * 3) % 100) as f64 / 100.0),
                ]);
            }
        }
    }
    let schema = [
        ("Lot", DataType::String),
        ("Wafer", DataType::Integer),
        ("Bin", DataType::Integer),
        ("Circle", DataType::String),
        ("CirclePct", DataType::Real),
        ("Segment", DataType::Integer),
        ("SegmentPct", DataType::Real),
    ];
    Table::from_rows(BASE_TABLE, &schema, rows)
}
