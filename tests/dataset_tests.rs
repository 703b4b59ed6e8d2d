use std::sync::Arc;

use chart_graph::core::{DataType, DateGranularity, Value};
use chart_graph::dataset::{
    BoxDataSet, BrushDataSet, CalcColumn, CalculatedDataSet, ColumnInfo, DataSource, DataTable,
    DrillPath, GapFill, GapFillSpec, Hyperlink, IntervalDataSet, PercentOfTotalColumn, Quantile,
    RunningTotalColumn, SubDataSet, TimeSeriesDataSet, ValueComparator, WaterfallDataSet,
    root_source,
};
use chrono::NaiveDate;

fn date(year: i32, month: u32, day: u32) -> Value {
    Value::Date(NaiveDate::from_ymd_opt(year, month, day).expect("valid date"))
}

fn text(value: &str) -> Value {
    Value::Text(value.to_owned())
}

fn monthly_sales() -> Arc<dyn DataSource> {
    let table = DataTable::new(vec![
        ColumnInfo::dimension("Month", DataType::Date),
        ColumnInfo::dimension("Region", DataType::String),
        ColumnInfo::measure("Sales", DataType::Double),
    ])
    .with_rows(vec![
        vec![date(2024, 1, 1), text("East"), Value::Double(10.0)],
        vec![date(2024, 3, 1), text("East"), Value::Double(30.0)],
        vec![date(2024, 2, 1), text("West"), Value::Double(5.0)],
    ])
    .expect("valid rows");
    Arc::new(table)
}

fn column(source: &dyn DataSource, header: &str) -> Vec<Value> {
    let col = source.find_column(header).expect("column exists");
    (0..source.row_count()).map(|row| source.value(col, row)).collect()
}

fn gap_spec(fill: GapFill, measure: &str) -> GapFillSpec {
    GapFillSpec {
        date_column: "Month".to_owned(),
        granularity: DateGranularity::Month,
        group_columns: vec!["Region".to_owned()],
        fills: vec![(measure.to_owned(), fill)],
    }
}

#[test]
fn table_rejects_ragged_rows() {
    let result = DataTable::new(vec![ColumnInfo::measure("Sales", DataType::Double)])
        .with_rows(vec![vec![Value::Double(1.0), Value::Double(2.0)]]);
    assert!(result.is_err());
}

#[test]
fn out_of_range_reads_are_null() {
    let source = monthly_sales();
    assert_eq!(source.value(0, 99), Value::Null);
    assert_eq!(source.value(42, 0), Value::Null);
    assert_eq!(source.find_column("Profit"), None);
}

#[test]
fn gap_fill_synthesizes_missing_months_per_group() {
    let series = TimeSeriesDataSet::new(monthly_sales(), &gap_spec(GapFill::Constant(0.0), "Sales"))
        .expect("gap filled series");

    assert_eq!(series.row_count(), 6);
    assert_eq!(series.synthetic_row_count(), 3);
    assert_eq!(
        column(&series, "Month"),
        [
            date(2024, 1, 1),
            date(2024, 2, 1),
            date(2024, 3, 1),
            date(2024, 1, 1),
            date(2024, 2, 1),
            date(2024, 3, 1),
        ]
    );
    assert_eq!(
        column(&series, "Region"),
        ["East", "East", "East", "West", "West", "West"].map(text)
    );
    assert_eq!(
        column(&series, "Sales"),
        [10.0, 0.0, 30.0, 0.0, 5.0, 0.0].map(Value::Double)
    );
}

#[test]
fn complete_series_is_unchanged() {
    let first = TimeSeriesDataSet::new(monthly_sales(), &gap_spec(GapFill::Skip, "Sales"))
        .expect("first pass");
    let filled: Arc<dyn DataSource> = Arc::new(first);
    let second = TimeSeriesDataSet::new(Arc::clone(&filled), &gap_spec(GapFill::Skip, "Sales"))
        .expect("second pass");
    assert_eq!(second.synthetic_row_count(), 0);
    assert_eq!(second.row_count(), filled.row_count());
    assert_eq!(column(&second, "Sales"), column(&*filled, "Sales"));
}

#[test]
fn running_totals_carry_forward_into_gaps() {
    let running: Vec<Arc<dyn CalcColumn>> = vec![Arc::new(
        RunningTotalColumn::new("RunningTotal(Sales)", "Sales").reset_on("Region"),
    )];
    let calculated: Arc<dyn DataSource> = Arc::new(
        CalculatedDataSet::new(monthly_sales(), running).expect("calculated columns"),
    );
    assert_eq!(
        column(&*calculated, "RunningTotal(Sales)"),
        [10.0, 40.0, 5.0].map(Value::Double)
    );

    let series = TimeSeriesDataSet::new(
        calculated,
        &gap_spec(GapFill::CarryForward, "RunningTotal(Sales)"),
    )
    .expect("gap filled series");
    assert_eq!(
        column(&series, "RunningTotal(Sales)"),
        [
            Value::Double(10.0),
            Value::Double(10.0),
            Value::Double(40.0),
            Value::Null,
            Value::Double(5.0),
            Value::Double(5.0),
        ]
    );
}

#[test]
fn percent_of_total_sums_to_hundred() {
    let percent: Vec<Arc<dyn CalcColumn>> =
        vec![Arc::new(PercentOfTotalColumn::new("PercentOfTotal(Sales)", "Sales"))];
    let calculated = CalculatedDataSet::new(monthly_sales(), percent).expect("calculated");
    let total: f64 = column(&calculated, "PercentOfTotal(Sales)")
        .iter()
        .filter_map(Value::as_f64)
        .sum();
    assert!((total - 100.0).abs() < 1e-9);
    let col = calculated
        .find_column("PercentOfTotal(Sales)")
        .expect("calculated column");
    assert!(calculated.is_measure(col));
    assert_eq!(calculated.data_type(col), DataType::Double);
}

#[test]
fn brush_union_mirrors_measures() {
    let brushed: Arc<dyn DataSource> =
        Arc::new(SubDataSet::new(monthly_sales(), 0..1).expect("subset"));
    let union = BrushDataSet::new(brushed, monthly_sales()).expect("brush union");

    assert_eq!(union.brushed_rows(), 0..1);
    assert_eq!(union.all_rows(), 1..4);
    assert_eq!(
        column(&union, "Sales"),
        [
            Value::Double(10.0),
            Value::Null,
            Value::Null,
            Value::Null
        ]
    );
    assert_eq!(
        column(&union, "ALL_Sales"),
        [
            Value::Null,
            Value::Double(10.0),
            Value::Double(30.0),
            Value::Double(5.0),
        ]
    );
    assert_eq!(column(&union, "Region")[3], text("West"));
}

#[test]
fn sub_range_must_fit_the_base() {
    assert!(SubDataSet::new(monthly_sales(), 2..5).is_err());
    let sub = SubDataSet::new(monthly_sales(), 1..3).expect("subset");
    assert_eq!(column(&sub, "Region"), [text("East"), text("West")]);
}

#[test]
fn box_groups_expand_to_summary_and_outliers() {
    let mut rows = Vec::new();
    for value in [1.0, 2.0, 3.0, 4.0, 5.0, 100.0] {
        rows.push(vec![text("East"), Value::Double(value)]);
    }
    rows.push(vec![text("West"), Value::Double(7.0)]);
    let table = DataTable::new(vec![
        ColumnInfo::dimension("Region", DataType::String),
        ColumnInfo::measure("Sales", DataType::Double),
    ])
    .with_rows(rows)
    .expect("valid rows");
    let boxes = BoxDataSet::new(
        Arc::new(table),
        &["Region".to_owned()],
        &["Sales".to_owned()],
    )
    .expect("box data");

    assert_eq!(boxes.group_count(), 2);
    // East summary, East outlier, West summary
    assert_eq!(boxes.row_count(), 3);
    assert_eq!(
        column(&boxes, "Region"),
        [text("East"), text("East"), text("West")]
    );
    assert_eq!(
        column(&boxes, "Sales"),
        [Value::Null, Value::Double(100.0), Value::Null]
    );
    assert_eq!(
        column(&boxes, &Quantile::Max.header("Sales"))[0],
        Value::Double(5.0)
    );
    assert_eq!(
        column(&boxes, &Quantile::Median.header("Sales"))[2],
        Value::Double(7.0)
    );
}

#[test]
fn waterfall_appends_total_row() {
    let mut table = DataTable::new(vec![
        ColumnInfo::dimension("Step", DataType::String),
        ColumnInfo::measure("Delta", DataType::Double),
    ])
    .with_rows(vec![
        vec![text("Start"), Value::Double(100.0)],
        vec![text("Cost"), Value::Double(-30.0)],
        vec![text("Bonus"), Value::Double(10.0)],
    ])
    .expect("valid rows");
    let steps = ["Start", "Cost", "Bonus"].map(str::to_owned).to_vec();
    table
        .set_comparator("Step", ValueComparator::manual(steps))
        .expect("step column");
    let waterfall =
        WaterfallDataSet::new(Arc::new(table), "Step", "Delta", "Total").expect("waterfall");

    assert_eq!(waterfall.row_count(), 4);
    assert_eq!(waterfall.total(), 80.0);
    assert_eq!(
        column(&waterfall, "__SUM__Delta"),
        [0.0, 100.0, 70.0, 0.0].map(Value::Double)
    );
    assert_eq!(column(&waterfall, "Step")[3], text("Total"));
    assert_eq!(column(&waterfall, "Delta")[3], Value::Double(80.0));
}

#[test]
fn waterfall_accumulates_in_category_order_with_total_last() {
    let table = DataTable::new(vec![
        ColumnInfo::dimension("Step", DataType::String),
        ColumnInfo::measure("Delta", DataType::Double),
    ])
    .with_rows(vec![
        vec![text("Q2"), Value::Double(50.0)],
        vec![text("Zeta"), Value::Double(-30.0)],
        vec![text("Q1"), Value::Double(100.0)],
    ])
    .expect("valid rows");
    let waterfall =
        WaterfallDataSet::new(Arc::new(table), "Step", "Delta", "Total").expect("waterfall");

    assert_eq!(
        column(&waterfall, "Step"),
        ["Q1", "Q2", "Zeta", "Total"].map(text)
    );
    assert_eq!(
        column(&waterfall, "__SUM__Delta"),
        [0.0, 100.0, 150.0, 0.0].map(Value::Double)
    );
    assert_eq!(column(&waterfall, "Delta")[3], Value::Double(120.0));

    let step = waterfall.find_column("Step").expect("step column");
    let order = waterfall.comparator(step).manual_order.expect("manual order");
    assert_eq!(order, ["Q1", "Q2", "Zeta", "Total"]);
}

#[test]
fn waterfall_follows_explicit_category_order() {
    let table = DataTable::new(vec![
        ColumnInfo::dimension("Step", DataType::String),
        ColumnInfo::measure("Delta", DataType::Double),
    ])
    .with_rows(vec![
        vec![text("Aardvark"), Value::Double(5.0)],
        vec![text("Total"), Value::Double(1.0)],
        vec![text("Base"), Value::Double(10.0)],
    ])
    .expect("valid rows");
    let order = ["Base", "Total", "Aardvark"].map(str::to_owned).to_vec();
    let waterfall = WaterfallDataSet::ordered_by(
        Arc::new(table),
        "Step",
        "Delta",
        "Total",
        Some(ValueComparator::manual(order)),
    )
    .expect("waterfall");

    assert_eq!(
        column(&waterfall, "__SUM__Delta"),
        [0.0, 10.0, 11.0, 0.0].map(Value::Double)
    );
    let step = waterfall.find_column("Step").expect("step column");
    let labels = waterfall.comparator(step).manual_order.expect("manual order");
    assert_eq!(labels, ["Base", "Aardvark", "Total"]);
}

#[test]
fn interval_length_measures_calendar_in_seconds() {
    let table = DataTable::new(vec![
        ColumnInfo::dimension("Task", DataType::String),
        ColumnInfo::measure("Start", DataType::Date),
        ColumnInfo::measure("End", DataType::Date),
    ])
    .with_rows(vec![vec![text("Design"), date(2024, 1, 1), date(2024, 1, 3)]])
    .expect("valid rows");
    let intervals = IntervalDataSet::new(
        Arc::new(table),
        &[("Start".to_owned(), "End".to_owned())],
    )
    .expect("interval data");
    assert_eq!(
        column(&intervals, "__INTERVAL__End"),
        [Value::Double(2.0 * 86_400.0)]
    );
}

#[test]
fn decorators_delegate_metadata_to_the_base() {
    let mut table = DataTable::new(vec![
        ColumnInfo::dimension("Region", DataType::String),
        ColumnInfo::measure("Sales", DataType::Double),
    ])
    .with_rows(vec![
        vec![text("East"), Value::Double(1.0)],
        vec![text("West"), Value::Double(2.0)],
    ])
    .expect("valid rows");
    let link = Hyperlink {
        link: "https://example.com/west".to_owned(),
        tooltip: None,
    };
    table
        .set_hyperlink("Region", 1, link.clone())
        .expect("hyperlink");
    table
        .add_drill_path(
            "Region",
            DrillPath {
                name: "by city".to_owned(),
                link: "city".to_owned(),
            },
        )
        .expect("drill path");
    table
        .set_comparator(
            "Region",
            ValueComparator::manual(vec!["West".to_owned(), "East".to_owned()]),
        )
        .expect("comparator");

    let sub = SubDataSet::new(Arc::new(table), 1..2).expect("subset");
    assert_eq!(sub.hyperlink(0, 0), Some(link));
    assert_eq!(sub.drill_paths(0).len(), 1);
    assert_eq!(
        sub.comparator(0).manual_order.as_deref(),
        Some(&["West".to_owned(), "East".to_owned()][..])
    );
    assert_eq!(root_source(&sub).row_count(), 2);
}
