use std::sync::Arc;

use indexmap::IndexSet;
use tracing::{debug, info_span, warn};

use crate::core::{
    Axis, AxisTitles, ChartFamily, ChartType, ElementGraph, FacetNesting, GeneratorKind, GeoCoord,
    PolarProjection,
};
use crate::dataset::{
    BoxDataSet, BrushDataSet, CalcColumn, CalculatedDataSet, ConstantColumn, DataSource, GapFill,
    GapFillSpec, IntervalDataSet, PercentOfTotalColumn, RunningTotalColumn, TimeSeriesDataSet,
    ValueComparator, WaterfallDataSet, require_column,
};
use crate::error::ChartResult;

use super::binding::{AestheticRef, Calculator, ChartBinding, DimensionRef, MeasureRef};
use super::context::{BrushRows, GenerationContext};
use super::coord_builder::{CoordLayout, InnerCoord, build_tree, separate_panes};
use super::decompose::{Decomposition, FAKE_MEASURE};
use super::decorations::build_decorations;
use super::dispatch::select_generator;
use super::element_builder::{PaneLayout, build_elements};
use super::frame_resolver::FrameResolver;
use super::palette_cache::PaletteCache;
use super::scale_builder::{AxisScales, build_scales};
use super::style::StyleDescriptor;
use super::validation::{resolve_chart_type, validate_binding};

/// Inputs of one generation call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub binding: ChartBinding,
    pub data: Arc<dyn DataSource>,
    /// Unfiltered data drawn as a dimmed shadow behind `data`.
    pub all_data: Option<Arc<dyn DataSource>>,
    pub style: StyleDescriptor,
    /// Identity of the data source, keying shared palettes.
    pub source_id: Option<String>,
}

impl GenerateRequest {
    #[must_use]
    pub fn new(binding: ChartBinding, data: Arc<dyn DataSource>) -> Self {
        Self {
            binding,
            data,
            all_data: None,
            style: StyleDescriptor::default(),
            source_id: None,
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: StyleDescriptor) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_all_data(mut self, all_data: Arc<dyn DataSource>) -> Self {
        self.all_data = Some(all_data);
        self
    }

    #[must_use]
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }
}

/// Turns bindings into element graphs.
///
/// Stateless apart from the palette cache, which may be shared between
/// generators so charts over the same source agree on category colors.
#[derive(Debug, Clone, Default)]
pub struct ChartGenerator {
    palette_cache: Arc<PaletteCache>,
}

impl ChartGenerator {
    #[must_use]
    pub fn new(palette_cache: Arc<PaletteCache>) -> Self {
        Self { palette_cache }
    }

    #[must_use]
    pub fn palette_cache(&self) -> &Arc<PaletteCache> {
        &self.palette_cache
    }

    /// Generates the element graph for one request.
    ///
    /// Configuration errors surface before the data is read; a missing
    /// column aborts with the column's name. Nothing partial is returned.
    pub fn generate(&self, request: &GenerateRequest) -> ChartResult<ElementGraph> {
        let binding = &request.binding;
        let style = &request.style;
        let span = info_span!("generate", chart_type = ?binding.chart_type);
        let _guard = span.enter();

        style.validate()?;
        let chart_type = resolve_chart_type(binding, style.plot.stack_values);
        validate_binding(binding, chart_type)?;
        let kind = select_generator(binding, chart_type);
        let decomposition = Decomposition::new(binding, chart_type);
        debug!(?chart_type, ?kind, "generator selected");

        require_inputs(&*request.data, binding, &decomposition)?;
        let prepared = prepare(
            Arc::clone(&request.data),
            binding,
            style,
            chart_type,
            kind,
            &decomposition,
        )?;

        let (data, brush) = match &request.all_data {
            Some(all) if supports_brushing(kind, chart_type) => {
                require_inputs(&**all, binding, &decomposition)?;
                let all = prepare(
                    Arc::clone(all),
                    binding,
                    style,
                    chart_type,
                    kind,
                    &decomposition,
                )?;
                let union = BrushDataSet::new(prepared, all)?;
                let rows = BrushRows {
                    brushed: union.brushed_rows(),
                    all: union.all_rows(),
                };
                debug!(brushed = rows.brushed.len(), all = rows.all.len(), "brush union");
                (Arc::new(union) as Arc<dyn DataSource>, Some(rows))
            }
            Some(_) => {
                warn!(?chart_type, "chart type cannot be brushed, all-data source ignored");
                (prepared, None)
            }
            None => (prepared, None),
        };
        let data = family_view(data, binding, style, chart_type, &decomposition)?;

        let ctx = GenerationContext {
            binding,
            style,
            chart_type,
            kind,
            decomposition,
            data,
            brush,
        };

        let mut plan = build_scales(&ctx)?;
        plan.scales.init_all(&*ctx.data)?;

        let title_of = |field: &str| ctx.decomposition.label_of(field);
        let dim_columns = |axis_dims: &[DimensionRef]| -> Vec<String> {
            axis_dims.iter().map(|dim| dim.column.clone()).collect()
        };
        let x_dims = dim_columns(&ctx.decomposition.x_dims);
        let y_dims = dim_columns(&ctx.decomposition.y_dims);
        let polar = match kind {
            GeneratorKind::Radar => Some(PolarProjection::AngleRadius),
            _ if chart_type.is_polar() => Some(PolarProjection::Angle),
            _ => None,
        };
        let first_pane = plan.panes.first().copied().unwrap_or_default();

        let (layout, pane_axes) = match kind {
            GeneratorKind::Separated => {
                let mut trees = Vec::with_capacity(plan.panes.len());
                let mut first_layout: Option<CoordLayout> = None;
                for axes in &plan.panes {
                    let layout = build_tree(
                        &mut plan.scales,
                        style,
                        chart_type,
                        &x_dims,
                        &y_dims,
                        InnerCoord::Rect { axes: *axes, polar },
                        &title_of,
                    );
                    trees.push(layout.coordinate.clone());
                    first_layout.get_or_insert(layout);
                }
                let nesting = match ctx.decomposition.value_axis() {
                    Axis::Y => FacetNesting::Vertical,
                    Axis::X => FacetNesting::Horizontal,
                };
                let coordinate = separate_panes(&mut plan.scales, trees, nesting);
                let (facet_dims, consumed_dims) = first_layout
                    .map(|layout| (layout.facet_dims, layout.consumed_dims))
                    .unwrap_or_default();
                let layout = CoordLayout {
                    coordinate,
                    facet_dims,
                    consumed_dims,
                };
                (layout, plan.panes.clone())
            }
            GeneratorKind::Map => {
                let inner = match plan.geo {
                    Some((longitude, latitude)) => InnerCoord::Geo(GeoCoord {
                        longitude,
                        latitude,
                        location: binding.geo.as_ref().map(|geo| geo.location.column.clone()),
                    }),
                    None => InnerCoord::Structural,
                };
                let layout = build_tree(
                    &mut plan.scales,
                    style,
                    chart_type,
                    &x_dims,
                    &y_dims,
                    inner,
                    &title_of,
                );
                (layout, vec![first_pane])
            }
            GeneratorKind::Hierarchy => {
                let mut layout = build_tree(
                    &mut plan.scales,
                    style,
                    chart_type,
                    &[],
                    &[],
                    InnerCoord::Structural,
                    &title_of,
                );
                layout.consumed_dims = x_dims.iter().chain(&y_dims).cloned().collect();
                (layout, vec![first_pane])
            }
            GeneratorKind::Merged
            | GeneratorKind::Radar
            | GeneratorKind::Stock
            | GeneratorKind::Candle
            | GeneratorKind::Gantt => {
                let layout = build_tree(
                    &mut plan.scales,
                    style,
                    chart_type,
                    &x_dims,
                    &y_dims,
                    InnerCoord::Rect {
                        axes: first_pane,
                        polar,
                    },
                    &title_of,
                );
                (layout, vec![first_pane])
            }
        };
        debug!(
            facet_depth = layout.coordinate.facet_depth(),
            consumed = ?layout.consumed_dims,
            "coordinates built"
        );

        let dims = pane_dims(&ctx, &layout);
        let panes: Vec<(PaneLayout, AxisScales)> = match kind {
            GeneratorKind::Separated => ctx
                .decomposition
                .value_measures()
                .iter()
                .zip(pane_axes)
                .enumerate()
                .map(|(pane, (measure, axes))| {
                    let layout = PaneLayout {
                        pane,
                        measures: vec![measure.clone()],
                        dims: dims.clone(),
                    };
                    (layout, axes)
                })
                .collect(),
            _ => vec![(
                PaneLayout {
                    pane: 0,
                    measures: ctx.decomposition.value_measures().to_vec(),
                    dims,
                },
                first_pane,
            )],
        };
        let pane_layouts: Vec<PaneLayout> = panes.iter().map(|(pane, _)| pane.clone()).collect();

        let titles = layout
            .coordinate
            .innermost_rect()
            .map(|rect| AxisTitles {
                x: rect.x_axis.title.clone(),
                y: rect.y_axis.title.clone(),
            })
            .unwrap_or_default();

        let mut resolver = FrameResolver::new(
            &ctx,
            &plan.scales,
            &self.palette_cache,
            request.source_id.as_deref(),
        );
        let elements = build_elements(&ctx, &mut resolver, &pane_layouts);
        let decorations =
            build_decorations(&ctx, &plan.scales, &layout.coordinate, &panes, &mut resolver)?;
        let legends = resolver.into_legends();
        debug!(
            elements = elements.len(),
            legends = legends.len(),
            decorations = decorations.len(),
            "element graph assembled"
        );

        Ok(ElementGraph::new(
            kind,
            chart_type,
            layout.coordinate,
            elements,
            plan.scales,
            legends,
            decorations,
            titles,
            Arc::clone(&ctx.data),
        ))
    }
}

/// Facet dimensions, then aesthetic grouping, then the consumed dimensions
/// innermost.
fn pane_dims(ctx: &GenerationContext<'_>, layout: &CoordLayout) -> Vec<String> {
    let mut dims: IndexSet<String> = layout.facet_dims.iter().cloned().collect();
    dims.extend(ctx.aesthetic_dims().into_iter().map(|dim| dim.column.clone()));
    for consumed in &layout.consumed_dims {
        dims.shift_remove(consumed);
        dims.insert(consumed.clone());
    }
    dims.into_iter().collect()
}

/// Brushing overlays a shadow series behind ordinary geometry only.
fn supports_brushing(kind: GeneratorKind, chart_type: ChartType) -> bool {
    matches!(kind, GeneratorKind::Merged | GeneratorKind::Separated)
        && !matches!(
            chart_type.family(),
            ChartFamily::BoxPlot | ChartFamily::Waterfall | ChartFamily::Gantt
        )
        && chart_type != ChartType::Interval
}

/// Columns the query layer must have produced.
fn require_inputs(
    data: &dyn DataSource,
    binding: &ChartBinding,
    decomposition: &Decomposition,
) -> ChartResult<()> {
    let mut headers: IndexSet<String> = IndexSet::new();
    for dim in decomposition.position_dims() {
        headers.insert(dim.column.clone());
    }
    for measure in decomposition.all_measures().chain(binding.all_measures()) {
        if measure.column != FAKE_MEASURE {
            headers.insert(measure.aggregate_name());
        }
    }
    for (_, aesthetic) in binding.aesthetics.iter() {
        match aesthetic {
            AestheticRef::Dimension(dim) => headers.insert(dim.column.clone()),
            AestheticRef::Measure(measure) => headers.insert(measure.aggregate_name()),
            AestheticRef::Static(_) => continue,
        };
    }
    for dim in binding.group.iter().chain(&binding.path) {
        headers.insert(dim.column.clone());
    }
    if let Some(geo) = &binding.geo {
        headers.insert(geo.location.column.clone());
        for measure in geo.longitude.iter().chain(&geo.latitude) {
            headers.insert(measure.aggregate_name());
        }
    }
    if let Some(relation) = &binding.relation {
        headers.insert(relation.source.column.clone());
        headers.insert(relation.target.column.clone());
    }
    for header in &headers {
        require_column(data, header)?;
    }
    Ok(())
}

fn aesthetic_measures(binding: &ChartBinding) -> impl Iterator<Item = &MeasureRef> {
    binding
        .aesthetics
        .iter()
        .filter_map(|(_, aesthetic)| match aesthetic {
            AestheticRef::Measure(measure) => Some(measure.as_ref()),
            _ => None,
        })
}

/// Calculated columns and gap filling, applied alike to the brushed and the
/// all-data source.
fn prepare(
    data: Arc<dyn DataSource>,
    binding: &ChartBinding,
    style: &StyleDescriptor,
    chart_type: ChartType,
    kind: GeneratorKind,
    decomposition: &Decomposition,
) -> ChartResult<Arc<dyn DataSource>> {
    let calcs = calculated_columns(binding, decomposition);
    let data: Arc<dyn DataSource> = if calcs.is_empty() {
        data
    } else {
        debug!(columns = calcs.len(), "calculated columns added");
        Arc::new(CalculatedDataSet::new(data, calcs)?)
    };

    let fills_gaps = style.plot.fill_gaps
        && matches!(
            kind,
            GeneratorKind::Merged
                | GeneratorKind::Separated
                | GeneratorKind::Radar
                | GeneratorKind::Stock
                | GeneratorKind::Candle
        );
    if !fills_gaps {
        return Ok(data);
    }
    match gap_fill_spec(&*data, binding, style, chart_type, decomposition)? {
        Some(spec) => {
            let series = TimeSeriesDataSet::new(data, &spec)?;
            debug!(
                date = %spec.date_column,
                synthetic = series.synthetic_row_count(),
                "time series gap filled"
            );
            Ok(Arc::new(series))
        }
        None => Ok(data),
    }
}

fn calculated_columns(
    binding: &ChartBinding,
    decomposition: &Decomposition,
) -> Vec<Arc<dyn CalcColumn>> {
    let mut seen = IndexSet::new();
    let mut calcs: Vec<Arc<dyn CalcColumn>> = Vec::new();
    let measures = decomposition
        .all_measures()
        .chain(binding.all_measures())
        .chain(aesthetic_measures(binding));
    for measure in measures {
        let Some(calculator) = &measure.calculator else {
            continue;
        };
        let header = measure.full_name();
        if !seen.insert(header.clone()) {
            continue;
        }
        let source = measure.aggregate_name();
        match calculator {
            Calculator::RunningTotal { reset_on } => {
                let mut column = RunningTotalColumn::new(header, source);
                if let Some(group) = reset_on {
                    column = column.reset_on(group.clone());
                }
                calcs.push(Arc::new(column));
            }
            Calculator::PercentOfTotal => {
                calcs.push(Arc::new(PercentOfTotalColumn::new(header, source)));
            }
        }
    }
    if let Some(fake) = &decomposition.fake {
        calcs.push(Arc::new(ConstantColumn::new(FAKE_MEASURE, fake.value)));
    }
    calcs
}

/// Gap filling applies when the innermost category dimension is a genuine
/// time series at a fixed granularity.
fn gap_fill_spec(
    data: &dyn DataSource,
    binding: &ChartBinding,
    style: &StyleDescriptor,
    chart_type: ChartType,
    decomposition: &Decomposition,
) -> ChartResult<Option<GapFillSpec>> {
    let Some(date) = decomposition.innermost_dim() else {
        return Ok(None);
    };
    let date_col = require_column(data, &date.column)?;
    if !date.is_time_series(data.data_type(date_col)) {
        return Ok(None);
    }
    let Some(granularity) = date.date_group.fixed_granularity() else {
        return Ok(None);
    };

    let mut group_columns: IndexSet<String> = decomposition
        .position_dims()
        .map(|dim| dim.column.clone())
        .collect();
    for dim in binding.aesthetics.dimensions() {
        group_columns.insert(dim.column.clone());
    }
    for dim in binding.group.iter().chain(&binding.path) {
        group_columns.insert(dim.column.clone());
    }
    group_columns.shift_remove(&date.column);

    let xy = binding.has_xy_measures();
    let mut fills = IndexSet::new();
    let mut specs = Vec::new();
    for measure in decomposition.all_measures() {
        let header = measure.full_name();
        if fills.insert(header.clone()) {
            let measure_type = measure.effective_type(chart_type).resolve_auto(xy);
            let fill = gap_fill(measure, measure_type, style.plot.gap_fill_value);
            specs.push((header, fill));
        }
    }

    Ok(Some(GapFillSpec {
        date_column: date.column.clone(),
        granularity,
        group_columns: group_columns.into_iter().collect(),
        fills: specs,
    }))
}

/// Running totals carry forward, bars leave gaps empty, additive measures
/// take the configured fill value.
fn gap_fill(measure: &MeasureRef, measure_type: ChartType, fill_value: f64) -> GapFill {
    match &measure.calculator {
        Some(Calculator::RunningTotal { .. }) => GapFill::CarryForward,
        _ if measure_type.is_bar_like() => GapFill::Skip,
        _ if measure.aggregate.is_additive() => GapFill::Constant(fill_value),
        _ => GapFill::Skip,
    }
}

/// Wraps the source in the view its chart family draws from.
fn family_view(
    data: Arc<dyn DataSource>,
    binding: &ChartBinding,
    style: &StyleDescriptor,
    chart_type: ChartType,
    decomposition: &Decomposition,
) -> ChartResult<Arc<dyn DataSource>> {
    match chart_type.family() {
        ChartFamily::BoxPlot => {
            let mut dims: IndexSet<String> = decomposition
                .position_dims()
                .map(|dim| dim.column.clone())
                .collect();
            dims.extend(
                binding
                    .aesthetics
                    .dimensions()
                    .into_iter()
                    .map(|dim| dim.column.clone()),
            );
            let dims: Vec<String> = dims.into_iter().collect();
            let measures: Vec<String> = decomposition
                .value_measures()
                .iter()
                .map(MeasureRef::full_name)
                .collect();
            let boxes = BoxDataSet::new(data, &dims, &measures)?;
            debug!(groups = boxes.group_count(), "box quantiles expanded");
            Ok(Arc::new(boxes))
        }
        ChartFamily::Waterfall => {
            let (Some(category), Some(measure)) = (
                decomposition.innermost_dim(),
                decomposition.value_measures().first(),
            ) else {
                return Ok(data);
            };
            let waterfall = WaterfallDataSet::ordered_by(
                data,
                &category.column,
                &measure.full_name(),
                style.plot.waterfall_total_label.clone(),
                category.manual_order.clone().map(ValueComparator::manual),
            )?;
            debug!(total = waterfall.total(), "waterfall running sums added");
            Ok(Arc::new(waterfall))
        }
        _ if matches!(chart_type, ChartType::Interval | ChartType::Gantt) => {
            match &binding.interval {
                Some(interval) => {
                    let pair = (interval.start.full_name(), interval.end.full_name());
                    Ok(Arc::new(IntervalDataSet::new(data, &[pair])?))
                }
                None => Ok(data),
            }
        }
        _ => Ok(data),
    }
}

#[cfg(test)]
mod tests {
    use super::{gap_fill, supports_brushing};
    use crate::api::binding::{Aggregate, Calculator, MeasureRef};
    use crate::core::{ChartType, GeneratorKind};
    use crate::dataset::GapFill;

    #[test]
    fn gap_fill_policy_follows_measure_kind() {
        let sum = MeasureRef::new("Sales", Aggregate::Sum);
        let running = sum.clone().with_calculator(Calculator::RunningTotal { reset_on: None });
        let average = MeasureRef::new("Sales", Aggregate::Average);

        assert_eq!(gap_fill(&running, ChartType::Bar, 0.0), GapFill::CarryForward);
        assert_eq!(gap_fill(&sum, ChartType::Bar, 0.0), GapFill::Skip);
        assert_eq!(gap_fill(&sum, ChartType::Line, 5.0), GapFill::Constant(5.0));
        assert_eq!(gap_fill(&average, ChartType::Line, 0.0), GapFill::Skip);
    }

    #[test]
    fn brushing_skips_derived_geometry() {
        assert!(supports_brushing(GeneratorKind::Merged, ChartType::Bar));
        assert!(supports_brushing(GeneratorKind::Separated, ChartType::Line));
        assert!(!supports_brushing(GeneratorKind::Merged, ChartType::BoxPlot));
        assert!(!supports_brushing(GeneratorKind::Merged, ChartType::Waterfall));
        assert!(!supports_brushing(GeneratorKind::Map, ChartType::Map));
    }
}
