// Copyright 2025 the Zonal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

extern crate std;

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use zonal_core::{ColumnNotFound, DataType, Table, Value};
use zonal_transforms::{AggregateOp, Error, Frame};

use crate::{CategoryExpansion, Normalize};

fn die(
    wafer: i64,
    bin: i64,
    circle: Option<&str>,
    circle_pct: f64,
    segment: Option<i64>,
    segment_pct: f64,
) -> Vec<Value> {
    vec![
        "L1".into(),
        Value::Integer(wafer),
        Value::Integer(bin),
        circle.into(),
        Value::real(circle_pct),
        segment.into(),
        Value::real(segment_pct),
    ]
}

fn dies_from(rows: Vec<Vec<Value>>) -> Table {
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

fn dies() -> Table {
    dies_from(vec![
        die(1, 1, Some("Center"), 0.5, Some(1), 0.2),
        die(1, 1, Some("Donut"), 0.3, Some(2), 0.4),
        die(1, 1, Some("Edge"), 0.2, Some(1), 0.6),
        die(1, 2, Some("Center"), 1.0, Some(2), 0.5),
        die(1, 2, Some("Donut"), 0.0, None, 0.9),
        die(2, 1, Some("Center"), 0.25, Some(3), 0.1),
        die(2, 1, Some("Center"), 0.75, Some(3), 0.3),
        die(2, 1, None, 0.9, Some(1), 0.8),
    ])
}

fn keys() -> Vec<String> {
    vec!["Lot".into(), "Wafer".into(), "Bin".into()]
}

fn column<'f>(frame: &'f Frame, name: &str) -> &'f [Value] {
    &frame.column_by_name(name).unwrap().values
}

#[test]
fn circle_scenario() {
    let base = dies();
    let keys = keys();
    let expanded = CategoryExpansion::new(&keys, "Circle", "CirclePct", AggregateOp::Avg)
        .run(&base)
        .unwrap();
    let out = expanded.result();

    assert_eq!(
        out.column_names().collect::<Vec<_>>(),
        [
            "Lot",
            "Wafer",
            "Bin",
            "CirclePct.Center",
            "CirclePct.Donut",
            "CirclePct.Edge",
        ]
    );
    assert_eq!(out.row_count(), 3);
    assert_eq!(column(out, "Wafer"), [1, 1, 2].map(Value::Integer));
    assert_eq!(column(out, "Bin"), [1, 2, 1].map(Value::Integer));
    assert_eq!(
        column(out, "CirclePct.Center"),
        [0.5, 1.0, 0.5].map(Value::real)
    );
    // (L1, 1, 2) and (L1, 2, 1) have no Edge dies.
    assert_eq!(column(out, "CirclePct.Edge"), [0.2, 0.0, 0.0].map(Value::real));
    assert_eq!(
        expanded.area_columns().collect::<Vec<_>>(),
        ["CirclePct.Center", "CirclePct.Donut", "CirclePct.Edge"]
    );
}

#[test]
fn integer_titles_become_area_labels() {
    let base = dies();
    let keys = keys();
    let expanded = CategoryExpansion::new(&keys, "Segment", "SegmentPct", AggregateOp::Max)
        .run(&base)
        .unwrap();
    assert_eq!(
        expanded.area_columns().collect::<Vec<_>>(),
        ["SegmentPct.1", "SegmentPct.2", "SegmentPct.3"]
    );
    let out = expanded.result();
    assert_eq!(column(out, "SegmentPct.1"), [0.6, 0.0, 0.8].map(Value::real));
    assert_eq!(column(out, "SegmentPct.3"), [0.0, 0.0, 0.3].map(Value::real));
}

#[test]
fn long_form_has_no_null_values() {
    let base = dies();
    let keys = keys();
    let long = CategoryExpansion::new(&keys, "Circle", "CirclePct", AggregateOp::Avg)
        .long_form(&base)
        .unwrap();
    let frame = long.result();
    // Three key groups times three categories.
    assert_eq!(frame.row_count(), 9);
    let values = &frame.column(long.value()).unwrap().values;
    assert!(values.iter().all(|v| !v.is_null()), "{values:?}");
    assert_eq!(values.iter().filter(|v| **v == Value::real(0.0)).count(), 4);
}

#[test]
fn area_columns_match_split_labels() {
    let base = dies();
    let keys = keys();
    let expansion = CategoryExpansion::new(&keys, "Circle", "CirclePct", AggregateOp::Avg);
    let long = expansion.long_form(&base).unwrap();
    let areas: BTreeSet<String> = long
        .result()
        .column(long.area())
        .unwrap()
        .values
        .iter()
        .map(|v| v.as_str().unwrap().into())
        .collect();
    let zones: BTreeSet<&Value> = long.result().column(long.zone()).unwrap().values.iter().collect();
    assert_eq!(zones.len(), 1);

    let expanded = expansion.pivot_areas(long).unwrap();
    let labels: BTreeSet<String> = expanded
        .area_columns()
        .map(|name| name.strip_prefix("CirclePct.").unwrap().into())
        .collect();
    assert_eq!(labels, areas);
}

#[test]
fn key_groups_are_neither_duplicated_nor_dropped() {
    let base = dies();
    for keys in [
        vec![String::from("Lot")],
        vec!["Lot".into(), "Wafer".into()],
        keys(),
    ] {
        let expected: BTreeSet<Vec<Value>> = (0..base.row_count())
            .map(|row| keys.iter().map(|k| base.value(row, k).unwrap().clone()).collect())
            .collect();
        let expanded = CategoryExpansion::new(&keys, "Circle", "CirclePct", AggregateOp::Sum)
            .run(&base)
            .unwrap();
        assert_eq!(expanded.result().row_count(), expected.len(), "keys {keys:?}");
    }
}

#[test]
fn normalize_derives_the_value_column() {
    let base = Table::from_rows(
        "Dies",
        &[
            ("Lot", DataType::String),
            ("Wafer", DataType::Integer),
            ("Circle", DataType::String),
            ("Bin", DataType::Integer),
        ],
        [
            vec!["L1".into(), Value::Integer(1), "Center".into(), Value::Integer(1)],
            vec!["L1".into(), Value::Integer(1), "Center".into(), Value::Integer(1)],
            vec!["L1".into(), Value::Integer(1), "Center".into(), Value::Integer(2)],
            vec!["L1".into(), Value::Integer(1), "Edge".into(), Value::Integer(1)],
        ],
    )
    .unwrap();
    let keys: Vec<String> = vec!["Lot".into(), "Wafer".into()];
    let normalize = Normalize {
        bin_column: "Bin".into(),
    };
    let expanded = CategoryExpansion::new(&keys, "Circle", "CircleShare", AggregateOp::Avg)
        .with_normalize(Some(&normalize))
        .run(&base)
        .unwrap();
    let out = expanded.result();
    assert_eq!(out.row_count(), 1);
    let center = column(out, "CircleShare.Center")[0].as_f64().unwrap();
    assert!((center - 5.0 / 9.0).abs() < 1e-12, "{center}");
    assert_eq!(column(out, "CircleShare.Edge"), [Value::real(1.0)]);
}

#[test]
fn missing_columns_fail_fast() {
    let base = dies();
    let keys = keys();
    let err = CategoryExpansion::new(&keys, "Ring", "RingPct", AggregateOp::Avg)
        .run(&base)
        .unwrap_err();
    assert_eq!(
        err,
        Error::ColumnNotFound(ColumnNotFound {
            table: "Dies".into(),
            name: "Ring".into(),
        })
    );
}

#[test]
fn untitled_rows_alone_yield_bare_key_groups() {
    let base = dies_from(vec![
        die(1, 1, None, 0.5, Some(1), 0.2),
        die(1, 1, None, 0.3, Some(2), 0.4),
        die(2, 1, None, 0.9, Some(1), 0.8),
    ]);
    let keys = keys();
    let expanded = CategoryExpansion::new(&keys, "Circle", "CirclePct", AggregateOp::Avg)
        .run(&base)
        .unwrap();
    let out = expanded.result();
    assert_eq!(out.column_names().collect::<Vec<_>>(), ["Lot", "Wafer", "Bin"]);
    assert_eq!(out.row_count(), 2);
    assert_eq!(column(out, "Wafer"), [1, 2].map(Value::Integer));
    assert_eq!(expanded.area_columns().count(), 0);
}

#[test]
fn empty_base_yields_empty_key_table() {
    let base = dies_from(vec![]);
    let keys = keys();
    let expanded = CategoryExpansion::new(&keys, "Circle", "CirclePct", AggregateOp::Avg)
        .run(&base)
        .unwrap();
    let out = expanded.result();
    assert_eq!(out.column_names().collect::<Vec<_>>(), ["Lot", "Wafer", "Bin"]);
    assert_eq!(out.row_count(), 0);
}

#[test]
fn zero_titles_are_kept_apart_from_missing_titles() {
    let base = dies_from(vec![
        die(1, 1, Some("Center"), 0.5, Some(0), 0.2),
        die(1, 1, Some("Center"), 0.5, Some(1), 0.4),
        die(1, 1, Some("Center"), 0.5, None, 0.9),
        die(2, 1, Some("Center"), 0.5, Some(0), 0.7),
    ]);
    let keys = keys();
    let expanded = CategoryExpansion::new(&keys, "Segment", "SegmentPct", AggregateOp::Avg)
        .run(&base)
        .unwrap();
    assert_eq!(
        expanded.area_columns().collect::<Vec<_>>(),
        ["SegmentPct.0", "SegmentPct.1"]
    );
    let out = expanded.result();
    assert_eq!(column(out, "SegmentPct.0"), [0.2, 0.7].map(Value::real));
    assert_eq!(column(out, "SegmentPct.1"), [0.4, 0.0].map(Value::real));
}
