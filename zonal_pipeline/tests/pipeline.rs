// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end runs of the category expansion pipeline against an in-memory registry.

use rstest::{fixture, rstest};
use zonal_core::{ColumnNotFound, DataType, Document, Table, TableRegistry, Value};
use zonal_pipeline::{AggregateOp, CategoryExpansion, Error, Pipeline, PipelineConfig};
use zonal_transforms::{AddColumnsSettings, add_columns};

const OUTPUT: &str = "Zone Profiles";

/// Two lots, three wafers, two bins; every die has a circle and a segment.
#[fixture]
fn dies() -> Table {
    let circles = ["Center", "Donut", "Edge"];
    let mut rows = Vec::new();
    for (lot, wafers) in [("L1", 1..=2), ("L2", 1..=1)] {
        for wafer in wafers {
            for bin in 1..=2_i64 {
                for (i, circle) in circles.iter().enumerate() {
                    // L2 never has Edge dies in bin 2.
                    if lot == "L2" && bin == 2 && *circle == "Edge" {
                        continue;
                    }
                    let seed = wafer * 10 + bin * 3 + i as i64;
                    rows.push(vec![
                        Value::from(lot),
                        Value::Integer(wafer),
                        Value::Integer(bin),
                        Value::from(*circle),
                        Value::real((seed % 7) as f64 / 7.0),
                        Value::Integer(seed % 3 + 1),
                        Value::real((seed % 5) as f64 / 5.0),
                    ]);
                }
            }
        }
    }
    Table::from_rows(
        "Dies",
        &[
            ("Lot", DataType::String),
            ("Wafer", DataType::Integer),
            ("Bin", DataType::Integer),
            ("Circle", DataType::String),
            ("CirclePct", DataType::Real),
            ("Segment", DataType::Integer),
            ("SegmentPct", DataType::Real),
        ],
        rows,
    )
    .unwrap()
}

fn config(titles: &str, values: &str) -> PipelineConfig {
    PipelineConfig::from_csv("Lot,Wafer,Bin", titles, values, "Avg", OUTPUT).unwrap()
}

fn names(table: &Table) -> Vec<&str> {
    table.column_names().collect()
}

#[rstest]
fn single_pair_produces_one_row_per_key(dies: Table) {
    let mut doc = Document::new();
    Pipeline::new(config("Circle", "CirclePct"))
        .unwrap()
        .run(&dies, &mut doc)
        .unwrap();

    let out = doc.get_table(OUTPUT).unwrap();
    assert_eq!(
        names(out),
        [
            "Lot",
            "Wafer",
            "Bin",
            "CirclePct.Center",
            "CirclePct.Donut",
            "CirclePct.Edge",
        ]
    );
    // (L1, 1..2, 1..2) and (L2, 1, 1..2).
    assert_eq!(out.row_count(), 6);

    let edge = out.require_column("CirclePct.Edge").unwrap();
    for row in 0..out.row_count() {
        let lot = out.value(row, "Lot").unwrap();
        let bin = out.value(row, "Bin").unwrap();
        let cell = edge.get(row).unwrap();
        if lot == &Value::from("L2") && bin == &Value::Integer(2) {
            assert_eq!(cell, &Value::real(0.0));
        } else {
            assert!(!cell.is_null());
        }
    }
}

#[rstest]
fn later_pairs_widen_without_adding_rows(dies: Table) {
    let mut single = Document::new();
    Pipeline::new(config("Circle", "CirclePct"))
        .unwrap()
        .run(&dies, &mut single)
        .unwrap();
    let mut both = Document::new();
    Pipeline::new(config("Circle,Segment", "CirclePct,SegmentPct"))
        .unwrap()
        .run(&dies, &mut both)
        .unwrap();

    let single = single.get_table(OUTPUT).unwrap();
    let both = both.get_table(OUTPUT).unwrap();
    assert_eq!(both.row_count(), single.row_count());
    assert_eq!(
        names(both),
        [
            "Lot",
            "Wafer",
            "Bin",
            "CirclePct.Center",
            "CirclePct.Donut",
            "CirclePct.Edge",
            "SegmentPct.1",
            "SegmentPct.2",
            "SegmentPct.3",
        ]
    );
    for name in names(single) {
        assert_eq!(both.column(name), single.column(name), "{name}");
    }
}

#[rstest]
fn rerunning_replaces_the_output_table(dies: Table) {
    let pipeline = Pipeline::new(config("Circle,Segment", "CirclePct,SegmentPct")).unwrap();
    let mut doc = Document::new();
    doc.add_table(Table::new(OUTPUT, vec![]).unwrap()).unwrap();

    pipeline.run(&dies, &mut doc).unwrap();
    let first = doc.get_table(OUTPUT).unwrap().clone();
    pipeline.run(&dies, &mut doc).unwrap();

    assert_eq!(doc.get_table(OUTPUT), Some(&first));
    assert_eq!(doc.len(), 1);
}

#[rstest]
fn run_from_registry_reads_the_base_table(dies: Table) {
    let mut doc = Document::new();
    doc.add_table(dies.clone()).unwrap();
    let pipeline = Pipeline::new(config("Segment", "SegmentPct")).unwrap();
    pipeline.run_from_registry(&mut doc, "Dies").unwrap();

    let mut direct = Document::new();
    pipeline.run(&dies, &mut direct).unwrap();
    assert_eq!(doc.get_table(OUTPUT), direct.get_table(OUTPUT));
    assert_eq!(doc.table_names(), ["Dies", OUTPUT]);
    assert!(matches!(
        pipeline.run_from_registry(&mut doc, "Wafers"),
        Err(Error::Registry(_))
    ));
}

#[rstest]
fn missing_columns_abort_before_the_output_exists(dies: Table) {
    let mut doc = Document::new();
    let err = Pipeline::new(config("Circle,Ring", "CirclePct,RingPct"))
        .unwrap()
        .run(&dies, &mut doc)
        .unwrap_err();
    assert_eq!(
        err,
        Error::ColumnNotFound(ColumnNotFound {
            table: "Dies".into(),
            name: "Ring".into(),
        })
    );
    assert!(doc.is_empty());
}

#[rstest]
fn key_arity_mismatch_leaves_the_output_untouched(dies: Table) {
    let mut doc = Document::new();
    Pipeline::new(config("Circle", "CirclePct"))
        .unwrap()
        .run(&dies, &mut doc)
        .unwrap();
    let before = doc.get_table(OUTPUT).unwrap().clone();

    let lot_only = vec![String::from("Lot")];
    let derived = CategoryExpansion::new(&lot_only, "Segment", "SegmentPct", AggregateOp::Avg)
        .run(&dies)
        .unwrap();
    let err = AddColumnsSettings::new(["Lot", "Wafer"], derived.keys().iter().copied())
        .and_then(|settings| {
            add_columns(doc.get_table_mut(OUTPUT).unwrap(), derived.result(), &settings)
        })
        .unwrap_err();
    assert_eq!(
        err,
        Error::JoinArity {
            output_keys: 2,
            source_keys: 1,
        }
    );
    assert_eq!(doc.get_table(OUTPUT), Some(&before));
}

#[rstest]
fn normalized_shares_sum_to_one_per_partition() {
    let rows = [
        ("L1", 1, "Center", 1),
        ("L1", 1, "Center", 2),
        ("L1", 1, "Center", 2),
        ("L1", 1, "Edge", 1),
        ("L1", 2, "Center", 1),
    ];
    let base = Table::from_rows(
        "Bins",
        &[
            ("Lot", DataType::String),
            ("Wafer", DataType::Integer),
            ("Circle", DataType::String),
            ("Bin", DataType::Integer),
        ],
        rows.iter().map(|&(lot, wafer, circle, bin)| {
            [
                Value::from(lot),
                Value::Integer(wafer),
                Value::from(circle),
                Value::Integer(bin),
            ]
        }),
    )
    .unwrap();
    let config = PipelineConfig::from_csv("Lot,Wafer,Bin", "Circle", "CirclePct", "Avg", OUTPUT)
        .unwrap()
        .with_normalize("Bin");
    let mut doc = Document::new();
    Pipeline::new(config).unwrap().run(&base, &mut doc).unwrap();

    let out = doc.get_table(OUTPUT).unwrap();
    assert_eq!(out.row_count(), 3);
    // Per (Lot, Wafer, Bin) row: the share of that bin's dies within each circle.
    let center = out.require_column("CirclePct.Center").unwrap().values();
    let expected = [1.0 / 3.0, 2.0 / 3.0, 1.0];
    for (got, want) in center.iter().zip(expected) {
        let got = got.as_f64().unwrap();
        assert!((got - want).abs() < 1e-12, "{got} != {want}");
    }
    assert_eq!(
        out.require_column("CirclePct.Edge").unwrap().values(),
        [Value::real(1.0), Value::real(0.0), Value::real(0.0)]
    );
}

#[rstest]
#[case("Avg", AggregateOp::Avg)]
#[case("average", AggregateOp::Avg)]
#[case("Mean", AggregateOp::Avg)]
#[case("SUM", AggregateOp::Sum)]
#[case("min", AggregateOp::Min)]
#[case("Max", AggregateOp::Max)]
#[case("count", AggregateOp::Count)]
fn aggregate_names(#[case] name: &str, #[case] op: AggregateOp) {
    let config = PipelineConfig::from_csv("Lot", "Circle", "CirclePct", name, OUTPUT).unwrap();
    assert_eq!(config.measure, op);
}

#[rstest]
#[case(AggregateOp::Avg)]
#[case(AggregateOp::Sum)]
#[case(AggregateOp::Min)]
#[case(AggregateOp::Max)]
#[case(AggregateOp::Count)]
fn every_measure_keeps_the_key_set(dies: Table, #[case] measure: AggregateOp) {
    let mut config = config("Circle,Segment", "CirclePct,SegmentPct");
    config.measure = measure;
    let mut doc = Document::new();
    Pipeline::new(config).unwrap().run(&dies, &mut doc).unwrap();

    let out = doc.get_table(OUTPUT).unwrap();
    assert_eq!(out.row_count(), 6);
    for column in out.columns().iter().skip(3) {
        assert!(
            column.values().iter().all(|v| !v.is_null()),
            "{} has nulls",
            column.name()
        );
    }
}
