use std::sync::Arc;

use approx::assert_relative_eq;
use chart_graph::api::{
    Aggregate, AestheticRef, ChartBinding, ChartGenerator, DimensionRef, FieldRef, GeoBinding,
    GenerateRequest, IntervalBinding, MeasureRef, StyleDescriptor, TargetDef, TrendStyle,
};
use chart_graph::core::{
    Channel, ChartType, CollisionPolicy, Color, Coordinate, DataType, Decoration, ElementRole,
    FacetNesting, Frame, GeneratorKind, Geometry, PolarProjection, ScaleDomain, SchemaKind,
    TargetStrategy, Value,
};
use chart_graph::dataset::{ColumnInfo, DataSource, DataTable, Quantile};
use chart_graph::render::{NullRenderer, Renderer};

fn text(value: &str) -> Value {
    Value::Text(value.to_owned())
}

fn sales_table() -> Arc<dyn DataSource> {
    let table = DataTable::new(vec![
        ColumnInfo::dimension("Region", DataType::String),
        ColumnInfo::dimension("Product", DataType::String),
        ColumnInfo::measure("Sum(Sales)", DataType::Double),
        ColumnInfo::measure("Sum(Cost)", DataType::Double),
    ])
    .with_rows(vec![
        vec![text("East"), text("A"), Value::Double(10.0), Value::Double(4.0)],
        vec![text("East"), text("B"), Value::Double(5.0), Value::Double(2.0)],
        vec![text("West"), text("A"), Value::Double(20.0), Value::Double(8.0)],
        vec![text("West"), text("B"), Value::Double(30.0), Value::Double(12.0)],
    ])
    .expect("valid rows");
    Arc::new(table)
}

fn sales() -> FieldRef {
    FieldRef::measure("Sales", Aggregate::Sum)
}

fn cost() -> FieldRef {
    FieldRef::measure("Cost", Aggregate::Sum)
}

fn generate(request: &GenerateRequest) -> chart_graph::ElementGraph {
    ChartGenerator::default()
        .generate(request)
        .expect("generation should succeed")
}

fn continuous_domain(graph: &chart_graph::ElementGraph, field: &str) -> (f64, f64) {
    let scale = graph.scales.scale_for(field).expect("scale bound to field");
    match scale.domain() {
        ScaleDomain::Continuous(linear) => linear.domain(),
        other => panic!("expected continuous domain for {field}, got {other:?}"),
    }
}

#[test]
fn stacked_bar_by_product_stacks_per_region() {
    let binding = ChartBinding::new(ChartType::Bar)
        .with_x(FieldRef::dimension("Region"))
        .with_y(sales())
        .with_aesthetic(
            Channel::Color,
            AestheticRef::Dimension(DimensionRef::new("Product")),
        );
    let mut style = StyleDescriptor::default();
    style.plot.stack_values = true;
    let graph = generate(&GenerateRequest::new(binding, sales_table()).with_style(style));

    assert_eq!(graph.chart_type, ChartType::StackBar);
    assert_eq!(graph.kind, GeneratorKind::Merged);
    assert_eq!(continuous_domain(&graph, "Sum(Sales)"), (0.0, 50.0));

    let primary: Vec<_> = graph.elements_with_role(ElementRole::Primary).collect();
    assert_eq!(primary.len(), 1);
    assert_eq!(primary[0].geometry, Geometry::Interval);
    assert_eq!(primary[0].collision, CollisionPolicy::Stack);
    assert_eq!(primary[0].dimensions, ["Product", "Region"]);
    assert_eq!(primary[0].values, ["Sum(Sales)"]);

    let legend = graph
        .legend(Channel::Color, "Product")
        .expect("color legend for product");
    assert_eq!(legend.title, "Product");
    assert_eq!(graph.legends.len(), 1);
}

#[test]
fn stacked_measures_share_one_element_and_scale() {
    let binding = ChartBinding::new(ChartType::StackBar)
        .with_x(FieldRef::dimension("Region"))
        .with_y(sales())
        .with_y(cost());
    let graph = generate(&GenerateRequest::new(binding, sales_table()));

    let primary: Vec<_> = graph.elements_with_role(ElementRole::Primary).collect();
    assert_eq!(primary.len(), 1);
    assert_eq!(primary[0].values, ["Sum(Sales)", "Sum(Cost)"]);
    assert!(matches!(
        primary[0].frame(Channel::Color).map(|frame| frame.as_ref()),
        Some(Frame::StackedMeasures(_))
    ));

    let sales_scale = graph.scales.id_for("Sum(Sales)");
    assert_eq!(sales_scale, graph.scales.id_for("Sum(Cost)"));
    assert_eq!(continuous_domain(&graph, "Sum(Sales)"), (0.0, 70.0));
}

#[test]
fn dimension_only_binding_nests_facets() {
    let table = DataTable::new(vec![
        ColumnInfo::dimension("A", DataType::String),
        ColumnInfo::dimension("B", DataType::String),
        ColumnInfo::dimension("C", DataType::String),
        ColumnInfo::dimension("D", DataType::String),
    ])
    .with_rows(vec![
        vec![text("a1"), text("b1"), text("c1"), text("d1")],
        vec![text("a2"), text("b2"), text("c2"), text("d2")],
    ])
    .expect("valid rows");
    let binding = ChartBinding::new(ChartType::Point)
        .with_x(FieldRef::dimension("A"))
        .with_x(FieldRef::dimension("B"))
        .with_x(FieldRef::dimension("C"))
        .with_y(FieldRef::dimension("D"));
    let graph = generate(&GenerateRequest::new(binding, Arc::new(table)));

    assert_eq!(graph.coordinate.facet_depth(), 2);
    let primary = graph
        .elements_with_role(ElementRole::Primary)
        .next()
        .expect("primary element");
    assert_eq!(primary.dimensions, ["A", "B", "C", "D"]);
    assert_eq!(primary.values, ["__VALUE__"]);
    graph.validate().expect("graph is consistent");
}

#[test]
fn scatter_fits_trend_and_quadrants() {
    let binding = ChartBinding::new(ChartType::Auto)
        .with_x(cost())
        .with_y(sales());
    let mut style = StyleDescriptor::default();
    style.trend = Some(TrendStyle::default());
    style.plot.quadrant_lines = true;
    let graph = generate(&GenerateRequest::new(binding, sales_table()).with_style(style));

    assert_eq!(graph.chart_type, ChartType::Point);
    let trend = graph
        .decorations
        .iter()
        .find_map(|decoration| match decoration {
            Decoration::Trend(trend) => Some(trend),
            _ => None,
        })
        .expect("trend line");
    assert_eq!(trend.x_field.as_deref(), Some("Sum(Cost)"));
    assert_relative_eq!(trend.slope, 2.5, epsilon = 1e-9);
    assert_relative_eq!(trend.intercept, 0.0, epsilon = 1e-9);
    assert_eq!(trend.color, StyleDescriptor::default().palette_color(0));

    let quadrants = graph
        .decorations
        .iter()
        .find_map(|decoration| match decoration {
            Decoration::QuadrantLines { x, y } => Some((*x, *y)),
            _ => None,
        })
        .expect("quadrant lines");
    assert_relative_eq!(quadrants.0, 7.0);
    assert_relative_eq!(quadrants.1, 17.5);
}

#[test]
fn separated_measures_get_one_pane_each() {
    let mut binding = ChartBinding::new(ChartType::Line)
        .with_x(FieldRef::dimension("Region"))
        .with_y(sales())
        .with_y(cost());
    binding.separated = true;
    let graph = generate(&GenerateRequest::new(binding, sales_table()));

    assert_eq!(graph.kind, GeneratorKind::Separated);
    assert_eq!(graph.pane_count(), 2);
    match &graph.coordinate {
        Coordinate::Facet(facet) => {
            assert_eq!(facet.inners.len(), 2);
            assert_eq!(facet.nesting, FacetNesting::Vertical);
        }
        other => panic!("expected pane facet, got {other:?}"),
    }
    let panes: Vec<usize> = graph
        .elements_with_role(ElementRole::Primary)
        .map(|element| element.pane)
        .collect();
    assert_eq!(panes, [0, 1]);
    assert_ne!(
        graph.scales.id_for("Sum(Sales)"),
        graph.scales.id_for("Sum(Cost)")
    );
}

#[test]
fn pie_draws_in_angle_projection() {
    let binding = ChartBinding::new(ChartType::Pie)
        .with_y(sales())
        .with_aesthetic(
            Channel::Color,
            AestheticRef::Dimension(DimensionRef::new("Region")),
        );
    let graph = generate(&GenerateRequest::new(binding, sales_table()));

    match &graph.coordinate {
        Coordinate::Polar(polar) => assert_eq!(polar.projection, PolarProjection::Angle),
        other => panic!("expected polar coordinate, got {other:?}"),
    }
    assert!(
        !graph
            .decorations
            .iter()
            .any(|decoration| matches!(decoration, Decoration::GridLines { .. }))
    );
}

#[test]
fn donut_center_total_never_adds_legend() {
    let binding = ChartBinding::new(ChartType::Donut)
        .with_y(sales())
        .with_aesthetic(
            Channel::Color,
            AestheticRef::Dimension(DimensionRef::new("Region")),
        );
    let mut style = StyleDescriptor::default();
    style.plot.donut_center_total = true;
    let graph = generate(&GenerateRequest::new(binding, sales_table()).with_style(style));

    let center = graph
        .elements_with_role(ElementRole::CenterTotal)
        .next()
        .expect("center total element");
    assert!(!center.legend);
    assert_eq!(graph.legends.len(), 1);
}

#[test]
fn waterfall_adds_running_sum_support() {
    let binding = ChartBinding::new(ChartType::Waterfall)
        .with_x(FieldRef::dimension("Region"))
        .with_y(sales());
    let graph = generate(&GenerateRequest::new(binding, sales_table()));

    assert_eq!(graph.data().row_count(), 5);
    let roles: Vec<ElementRole> = graph.elements.iter().map(|element| element.role).collect();
    assert_eq!(roles, [ElementRole::Support, ElementRole::Primary]);
    assert!(!graph.elements[0].visible);
    assert_eq!(graph.elements[0].values, ["__SUM__Sum(Sales)"]);
    graph.validate().expect("graph is consistent");
}

fn quarter_table() -> Arc<dyn DataSource> {
    let table = DataTable::new(vec![
        ColumnInfo::dimension("Quarter", DataType::String),
        ColumnInfo::measure("Sum(Sales)", DataType::Double),
    ])
    .with_rows(vec![
        vec![text("Q2"), Value::Double(50.0)],
        vec![text("Q1"), Value::Double(100.0)],
        vec![text("Zeta"), Value::Double(-30.0)],
    ])
    .expect("valid rows");
    Arc::new(table)
}

fn waterfall_steps(graph: &chart_graph::ElementGraph) -> Vec<(String, f64)> {
    let data = graph.data();
    let quarter = data.find_column("Quarter").expect("quarter column");
    let sum = data.find_column("__SUM__Sum(Sales)").expect("running sum column");
    (0..data.row_count())
        .map(|row| {
            let prior = data.value(sum, row).as_f64().expect("numeric running sum");
            (data.value(quarter, row).label(), prior)
        })
        .collect()
}

fn category_labels(graph: &chart_graph::ElementGraph, field: &str) -> Vec<String> {
    let scale = graph.scales.scale_for(field).expect("scale bound to field");
    match scale.domain() {
        ScaleDomain::Categories(values) => values.iter().map(Value::label).collect(),
        other => panic!("expected categories for {field}, got {other:?}"),
    }
}

#[test]
fn waterfall_floats_each_bar_on_the_bars_to_its_left() {
    let binding = ChartBinding::new(ChartType::Waterfall)
        .with_x(FieldRef::dimension("Quarter"))
        .with_y(sales());
    let graph = generate(&GenerateRequest::new(binding, quarter_table()));

    let steps = waterfall_steps(&graph);
    assert_eq!(
        steps,
        [("Q1", 0.0), ("Q2", 100.0), ("Zeta", 150.0), ("Total", 0.0)]
            .map(|(label, prior)| (label.to_owned(), prior))
    );
    let data = graph.data();
    let sales = data.find_column("Sum(Sales)").expect("sales column");
    assert_eq!(data.value(sales, 3), Value::Double(120.0));
    assert_eq!(
        category_labels(&graph, "Quarter"),
        ["Q1", "Q2", "Zeta", "Total"]
    );
    graph.validate().expect("graph is consistent");
}

#[test]
fn waterfall_honors_manual_category_order() {
    let mut quarter = DimensionRef::new("Quarter");
    quarter.manual_order = Some(["Zeta", "Q1", "Q2"].map(str::to_owned).to_vec());
    let binding = ChartBinding::new(ChartType::Waterfall)
        .with_x(FieldRef::Dimension(quarter))
        .with_y(sales());
    let graph = generate(&GenerateRequest::new(binding, quarter_table()));

    let priors: Vec<f64> = waterfall_steps(&graph).into_iter().map(|(_, prior)| prior).collect();
    assert_eq!(priors, [0.0, -30.0, 70.0, 0.0]);
    assert_eq!(
        category_labels(&graph, "Quarter"),
        ["Zeta", "Q1", "Q2", "Total"]
    );
}

#[test]
fn box_plot_expands_quantiles_and_outliers() {
    let mut rows = Vec::new();
    for value in [1.0, 2.0, 3.0, 4.0, 5.0, 100.0] {
        rows.push(vec![text("East"), Value::Double(value)]);
    }
    let table = DataTable::new(vec![
        ColumnInfo::dimension("Region", DataType::String),
        ColumnInfo::measure("Sales", DataType::Double),
    ])
    .with_rows(rows)
    .expect("valid rows");
    let binding = ChartBinding::new(ChartType::BoxPlot)
        .with_x(FieldRef::dimension("Region"))
        .with_y(FieldRef::measure("Sales", Aggregate::None));
    let graph = generate(&GenerateRequest::new(binding, Arc::new(table)));

    let geometries: Vec<Geometry> = graph.elements.iter().map(|element| element.geometry).collect();
    assert_eq!(
        geometries,
        [Geometry::Schema(SchemaKind::BoxPlot), Geometry::Point]
    );
    assert_eq!(graph.elements[1].role, ElementRole::Outlier);
    let median = graph
        .data()
        .find_column(&Quantile::Median.header("Sales"))
        .expect("median column");
    assert_eq!(graph.data().value(median, 0).as_f64(), Some(3.5));
}

#[test]
fn gantt_draws_intervals_from_start() {
    let table = DataTable::new(vec![
        ColumnInfo::dimension("Task", DataType::String),
        ColumnInfo::measure("Start", DataType::Double),
        ColumnInfo::measure("End", DataType::Double),
    ])
    .with_rows(vec![
        vec![text("Design"), Value::Double(1.0), Value::Double(4.0)],
        vec![text("Build"), Value::Double(4.0), Value::Double(9.0)],
    ])
    .expect("valid rows");
    let mut binding = ChartBinding::new(ChartType::Gantt).with_y(FieldRef::dimension("Task"));
    binding.interval = Some(IntervalBinding {
        start: MeasureRef::new("Start", Aggregate::None),
        end: MeasureRef::new("End", Aggregate::None),
        milestone: None,
    });
    let graph = generate(&GenerateRequest::new(binding, Arc::new(table)));

    assert_eq!(graph.kind, GeneratorKind::Gantt);
    let primary = graph
        .elements_with_role(ElementRole::Primary)
        .next()
        .expect("interval element");
    assert_eq!(primary.geometry, Geometry::Interval);
    assert_eq!(primary.values, ["Start", "__INTERVAL__End"]);
    let length = graph
        .data()
        .find_column("__INTERVAL__End")
        .expect("interval column");
    assert_eq!(graph.data().value(length, 1).as_f64(), Some(5.0));
}

#[test]
fn map_uses_geo_coordinate_without_grid() {
    let table = DataTable::new(vec![
        ColumnInfo::dimension("Country", DataType::String),
        ColumnInfo::measure("Sum(Sales)", DataType::Double),
    ])
    .with_rows(vec![
        vec![text("FR"), Value::Double(3.0)],
        vec![text("DE"), Value::Double(7.0)],
    ])
    .expect("valid rows");
    let mut binding = ChartBinding::new(ChartType::Map).with_y(sales());
    binding.geo = Some(GeoBinding {
        location: DimensionRef::new("Country"),
        longitude: None,
        latitude: None,
    });
    let graph = generate(&GenerateRequest::new(binding, Arc::new(table)));

    assert_eq!(graph.kind, GeneratorKind::Map);
    match &graph.coordinate {
        Coordinate::Geo(geo) => assert_eq!(geo.location.as_deref(), Some("Country")),
        other => panic!("expected geo coordinate, got {other:?}"),
    }
    assert!(graph.decorations.is_empty());
    assert_eq!(graph.elements[0].geometry, Geometry::Polygon);
}

#[test]
fn treemap_lists_every_level() {
    let binding = ChartBinding::new(ChartType::Treemap)
        .with_x(FieldRef::dimension("Region"))
        .with_x(FieldRef::dimension("Product"))
        .with_y(sales());
    let graph = generate(&GenerateRequest::new(binding, sales_table()));

    assert_eq!(graph.kind, GeneratorKind::Hierarchy);
    assert_eq!(graph.coordinate.facet_depth(), 0);
    assert_eq!(graph.elements[0].dimensions, ["Region", "Product"]);
}

#[test]
fn value_labels_add_text_frames() {
    let binding = ChartBinding::new(ChartType::Bar)
        .with_x(FieldRef::dimension("Region"))
        .with_y(sales());
    let mut style = StyleDescriptor::default();
    style.plot.value_labels = true;
    let graph = generate(&GenerateRequest::new(binding, sales_table()).with_style(style));

    let frame = graph.elements[0]
        .frame(Channel::Text)
        .expect("text frame");
    assert!(matches!(frame.as_ref(), Frame::Label(label) if label.field.is_none()));
    assert_eq!(graph.titles.y.as_deref(), Some("Sum(Sales)"));
    assert_eq!(graph.titles.x.as_deref(), Some("Region"));
}

#[test]
fn value_labels_use_each_measure_format() {
    let binding = ChartBinding::new(ChartType::Line)
        .with_x(FieldRef::dimension("Region"))
        .with_y(sales())
        .with_y(cost());
    let mut style = StyleDescriptor::default();
    style.plot.value_labels = true;
    style.formats.insert("Sum(Sales)".to_owned(), "$#,##0".to_owned());
    style.formats.insert("Sum(Cost)".to_owned(), "0.0%".to_owned());
    let graph = generate(&GenerateRequest::new(binding, sales_table()).with_style(style));

    let formats: Vec<(String, Option<String>)> = graph
        .elements_with_role(ElementRole::Primary)
        .map(|element| {
            let frame = element.frame(Channel::Text).expect("text frame");
            let Frame::Label(label) = frame.as_ref() else {
                panic!("expected label frame, got {frame:?}");
            };
            (element.values[0].clone(), label.format.clone())
        })
        .collect();
    assert_eq!(
        formats,
        [
            ("Sum(Sales)".to_owned(), Some("$#,##0".to_owned())),
            ("Sum(Cost)".to_owned(), Some("0.0%".to_owned())),
        ]
    );
}

#[test]
fn quantile_targets_interpolate_between_values() {
    let binding = ChartBinding::new(ChartType::Bar)
        .with_x(FieldRef::dimension("Region"))
        .with_x(FieldRef::dimension("Product"))
        .with_y(sales());
    let mut style = StyleDescriptor::default();
    for strategy in [TargetStrategy::Median, TargetStrategy::Percentile(75.0)] {
        style.targets.push(TargetDef {
            measure: Some("Sum(Sales)".to_owned()),
            strategy,
            label: None,
            color: Color::ACCENT,
        });
    }
    let graph = generate(&GenerateRequest::new(binding, sales_table()).with_style(style));

    let targets: Vec<f64> = graph
        .decorations
        .iter()
        .filter_map(|decoration| match decoration {
            Decoration::Target(target) => Some(target.value),
            _ => None,
        })
        .collect();
    assert_eq!(targets.len(), 2);
    assert_relative_eq!(targets[0], 15.0);
    assert_relative_eq!(targets[1], 22.5);
}

#[test]
fn null_renderer_accepts_generated_graph() {
    let binding = ChartBinding::new(ChartType::Line)
        .with_x(FieldRef::dimension("Region"))
        .with_y(sales())
        .with_y(cost());
    let mut style = StyleDescriptor::default();
    style.trend = Some(TrendStyle::default());
    let graph = generate(&GenerateRequest::new(binding, sales_table()).with_style(style));

    let mut renderer = NullRenderer::default();
    renderer.render(&graph).expect("render should succeed");
    assert_eq!(renderer.last_element_count, 2);
    assert_eq!(renderer.last_trend_count, 2);
    assert_eq!(renderer.renders, 1);
}
