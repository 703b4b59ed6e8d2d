use chart_graph::api::{
    Aggregate, AestheticRef, ChartBinding, ChartGenerator, DimensionRef, FieldRef,
    GenerateRequest, StyleDescriptor,
};
use chart_graph::core::{Channel, ChartType, DataType, DateGranularity, Value};
use chart_graph::dataset::{
    ColumnInfo, DataSource, DataTable, GapFill, GapFillSpec, TimeSeriesDataSet,
};
use chrono::{Duration, NaiveDate};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

fn sales_table(rows: usize) -> Arc<dyn DataSource> {
    let table = DataTable::new(vec![
        ColumnInfo::dimension("Region", DataType::String),
        ColumnInfo::dimension("Product", DataType::String),
        ColumnInfo::measure("Sum(Sales)", DataType::Double),
    ])
    .with_rows((0..rows).map(|i| {
        vec![
            Value::Text(format!("region-{}", i % 50)),
            Value::Text(format!("product-{}", i % 12)),
            Value::Double(((i * 37) % 1_000) as f64 - 200.0),
        ]
    }))
    .expect("valid generated rows");
    Arc::new(table)
}

fn bench_stacked_bar_10k(c: &mut Criterion) {
    let binding = ChartBinding::new(ChartType::Bar)
        .with_x(FieldRef::dimension("Region"))
        .with_y(FieldRef::measure("Sales", Aggregate::Sum))
        .with_aesthetic(
            Channel::Color,
            AestheticRef::Dimension(DimensionRef::new("Product")),
        );
    let mut style = StyleDescriptor::default();
    style.plot.stack_values = true;
    let request = GenerateRequest::new(binding, sales_table(10_000)).with_style(style);
    let generator = ChartGenerator::default();

    c.bench_function("stacked_bar_10k", |b| {
        b.iter(|| {
            let graph = generator
                .generate(black_box(&request))
                .expect("generation should succeed");
            black_box(graph.elements.len());
        })
    });
}

fn bench_gap_fill_daily_series(c: &mut Criterion) {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid start date");
    let table = DataTable::new(vec![
        ColumnInfo::dimension("Day", DataType::Date),
        ColumnInfo::dimension("Store", DataType::String),
        ColumnInfo::measure("Sales", DataType::Double),
    ])
    .with_rows((0..730_i64).flat_map(|day| {
        (0..20_i64)
            .filter(move |store| (day + store) % 3 != 0)
            .map(move |store| {
                vec![
                    Value::Date(start + Duration::days(day)),
                    Value::Text(format!("store-{store}")),
                    Value::Double((day * store) as f64),
                ]
            })
    }))
    .expect("valid generated rows");
    let base: Arc<dyn DataSource> = Arc::new(table);
    let spec = GapFillSpec {
        date_column: "Day".to_owned(),
        granularity: DateGranularity::Day,
        group_columns: vec!["Store".to_owned()],
        fills: vec![("Sales".to_owned(), GapFill::Constant(0.0))],
    };

    c.bench_function("gap_fill_daily_20_groups", |b| {
        b.iter(|| {
            let series = TimeSeriesDataSet::new(Arc::clone(black_box(&base)), &spec)
                .expect("gap fill should succeed");
            black_box(series.synthetic_row_count());
        })
    });
}

criterion_group!(benches, bench_stacked_bar_10k, bench_gap_fill_daily_series);
criterion_main!(benches);
