use tracing::{debug, trace};

use crate::core::{
    Axis, BrushRange, ChartFamily, ChartType, GeneratorKind, ParetoRange, ScaleId, ScaleKind,
    ScaleRange, ScaleRangeRule, ScaleSet, StackRange,
};
use crate::dataset::{ValueComparator, require_column};
use crate::error::ChartResult;

use super::binding::{AestheticRef, DimensionRef, MeasureRef};
use super::context::GenerationContext;

/// Scales of the two position axes of one pane; `None` when the axis
/// carries only dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AxisScales {
    pub x: Option<ScaleId>,
    pub y: Option<ScaleId>,
}

impl AxisScales {
    fn set(&mut self, axis: Axis, id: ScaleId) {
        match axis {
            Axis::X => self.x = Some(id),
            Axis::Y => self.y = Some(id),
        }
    }
}

#[derive(Debug)]
pub(crate) struct ScalePlan {
    pub scales: ScaleSet,
    /// Value scales per pane; a single entry unless measures are separated.
    pub panes: Vec<AxisScales>,
    /// Longitude and latitude scales of map charts.
    pub geo: Option<(ScaleId, ScaleId)>,
}

/// Creates every scale the chart needs and binds fields to them.
///
/// Domains stay unset; the caller runs [`ScaleSet::init_all`] once the
/// plan is complete.
pub(crate) fn build_scales(ctx: &GenerationContext<'_>) -> ChartResult<ScalePlan> {
    let mut builder = ScaleBuilder {
        ctx,
        scales: ScaleSet::new(),
        measure_scales: Vec::new(),
    };

    for dim in ctx.decomposition.position_dims() {
        builder.dimension(dim)?;
    }
    for dim in ctx.aesthetic_dims() {
        builder.dimension(dim)?;
    }
    builder.aesthetic_measures();

    let mut geo = None;
    let panes = match ctx.kind {
        GeneratorKind::Merged if ctx.chart_type == ChartType::Interval => {
            vec![builder.interval_axes()?]
        }
        GeneratorKind::Merged | GeneratorKind::Radar => {
            vec![builder.merged_axes(ctx.decomposition.value_measures())?]
        }
        GeneratorKind::Separated => ctx
            .decomposition
            .measures(ctx.decomposition.value_axis())
            .iter()
            .map(|measure| builder.merged_axes(std::slice::from_ref(measure)))
            .collect::<ChartResult<Vec<_>>>()?,
        GeneratorKind::Stock | GeneratorKind::Candle => vec![builder.ohlc_axes()?],
        GeneratorKind::Gantt => vec![builder.interval_axes()?],
        GeneratorKind::Map => {
            geo = Some(builder.geo_scales()?);
            builder.off_axis_measures(ctx.decomposition.value_measures())?;
            vec![AxisScales::default()]
        }
        GeneratorKind::Hierarchy => {
            if let Some(relation) = &ctx.binding.relation {
                builder.dimension(&relation.source)?;
                builder.dimension(&relation.target)?;
            }
            builder.off_axis_measures(ctx.decomposition.value_measures())?;
            vec![AxisScales::default()]
        }
    };

    if ctx.is_brushing() {
        builder.mirror_brushed();
    }
    debug!(scales = builder.scales.len(), panes = panes.len(), "scales planned");
    Ok(ScalePlan {
        scales: builder.scales,
        panes,
        geo,
    })
}

struct ScaleBuilder<'c, 'a> {
    ctx: &'c GenerationContext<'a>,
    scales: ScaleSet,
    /// Continuous scales over measure fields, mirrored while brushing.
    measure_scales: Vec<ScaleId>,
}

impl ScaleBuilder<'_, '_> {
    fn dimension(&mut self, dim: &DimensionRef) -> ChartResult<ScaleId> {
        let data = &*self.ctx.data;
        let col = require_column(data, &dim.column)?;
        let kind = if dim.is_date_scaled(data.data_type(col)) {
            ScaleKind::Time {
                granularity: dim.date_group.fixed_granularity(),
            }
        } else if self.is_waterfall_category(dim) {
            // The waterfall view already orders categories with the total last.
            ScaleKind::categorical()
        } else {
            ScaleKind::Categorical {
                comparator: dim.manual_order.clone().map(ValueComparator::manual),
            }
        };
        Ok(self.scales.ensure(&dim.column, kind))
    }

    fn is_waterfall_category(&self, dim: &DimensionRef) -> bool {
        self.ctx.chart_type.family() == ChartFamily::Waterfall
            && self
                .ctx
                .decomposition
                .innermost_dim()
                .is_some_and(|category| category.column == dim.column)
    }

    /// Continuous scales for aesthetics bound to measures, global first.
    fn aesthetic_measures(&mut self) {
        let binding = self.ctx.binding;
        let per_measure = binding
            .all_measures()
            .into_iter()
            .flat_map(|measure| measure.aesthetics.iter().map(|(_, aesthetic)| aesthetic));
        let aesthetics = binding
            .aesthetics
            .iter()
            .map(|(_, aesthetic)| aesthetic)
            .chain(per_measure);
        for aesthetic in aesthetics {
            if let AestheticRef::Measure(measure) = aesthetic {
                let id = self.scales.ensure(&measure.full_name(), ScaleKind::linear());
                self.track(id);
            }
        }
    }

    fn measure_kind(&self, measure: &MeasureRef, axis: Option<Axis>) -> ChartResult<ScaleKind> {
        let data = &*self.ctx.data;
        let col = require_column(data, &measure.full_name())?;
        if data.data_type(col).is_calendar()
            && measure.aggregate.preserves_type()
            && measure.calculator.is_none()
        {
            return Ok(ScaleKind::Time { granularity: None });
        }
        let log = measure.log || axis.is_some_and(|axis| self.ctx.style.axis(axis).log);
        Ok(ScaleKind::Linear {
            log,
            include_zero: !log && self.ctx.measure_type(measure).is_bar_like(),
        })
    }

    /// One scale shared by every field in `fields`.
    fn shared(&mut self, fields: &[String], kind: ScaleKind) -> Option<ScaleId> {
        let (first, rest) = fields.split_first()?;
        let id = self.scales.ensure(first, kind);
        for field in rest {
            self.scales.bind(field, id);
        }
        self.track(id);
        Some(id)
    }

    fn track(&mut self, id: ScaleId) {
        if !self.measure_scales.contains(&id) {
            self.measure_scales.push(id);
        }
    }

    /// Value axis holding `measures`, plus the other axis when both axes
    /// carry measures.
    fn merged_axes(&mut self, measures: &[MeasureRef]) -> ChartResult<AxisScales> {
        let ctx = self.ctx;
        let decomposition = &ctx.decomposition;
        let value_axis = decomposition.value_axis();
        let on_axis = !decomposition.measures(value_axis).is_empty();
        let mut axes = AxisScales::default();

        if let Some(first) = measures.first() {
            let kind = self.measure_kind(first, on_axis.then_some(value_axis))?;
            let fields: Vec<String> = measures
                .iter()
                .flat_map(|measure| ctx.scale_fields(measure))
                .collect();
            if let Some(id) = self.shared(&fields, kind) {
                self.apply_range(id, measures);
                if on_axis {
                    axes.set(value_axis, id);
                }
            }
        }

        let other_axis = match value_axis {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        };
        let others = decomposition.measures(other_axis);
        if let Some(first) = others.first() {
            let kind = self.measure_kind(first, Some(other_axis))?;
            let fields: Vec<String> = others.iter().map(MeasureRef::full_name).collect();
            if let Some(id) = self.shared(&fields, kind) {
                axes.set(other_axis, id);
            }
        }
        Ok(axes)
    }

    fn apply_range(&mut self, id: ScaleId, measures: &[MeasureRef]) {
        let mut stack: Option<StackRange> = None;
        let mut pareto: Option<ParetoRange> = None;
        for measure in measures {
            match self.ctx.measure_type(measure).scale_range_rule() {
                ScaleRangeRule::Plain => {}
                ScaleRangeRule::Stack {
                    absolute,
                    negative_grouping,
                } => {
                    let range = stack.get_or_insert_with(|| StackRange {
                        fields: Vec::new(),
                        group_by: self
                            .ctx
                            .decomposition
                            .position_dims()
                            .map(|dim| dim.column.clone())
                            .collect(),
                        absolute,
                        negative_grouping,
                    });
                    for field in self.ctx.scale_fields(measure) {
                        range.add_field(&field);
                    }
                }
                ScaleRangeRule::Pareto => {
                    pareto
                        .get_or_insert_with(|| ParetoRange { fields: Vec::new() })
                        .fields
                        .push(measure.full_name());
                }
            }
        }
        let range = match (stack, pareto) {
            (Some(stack), _) => ScaleRange::Stack(stack),
            (None, Some(pareto)) => ScaleRange::Pareto(pareto),
            (None, None) => return,
        };
        trace!(scale = id.index(), ?range, "scale range applied");
        if let Some(scale) = self.scales.get_mut(id) {
            scale.range = range;
        }
    }

    fn ohlc_axes(&mut self) -> ChartResult<AxisScales> {
        let mut axes = AxisScales::default();
        let ctx = self.ctx;
        if let Some(ohlc) = &ctx.binding.ohlc {
            let kind = self.measure_kind(&ohlc.close, Some(Axis::Y))?;
            let fields: Vec<String> = ohlc.measures().iter().map(|m| m.full_name()).collect();
            if let Some(id) = self.shared(&fields, kind) {
                axes.y = Some(id);
            }
        }
        Ok(axes)
    }

    /// Start, end and milestone on one scale along the axis free of
    /// dimensions; the interval length column resolves to the same scale.
    fn interval_axes(&mut self) -> ChartResult<AxisScales> {
        let mut axes = AxisScales::default();
        let ctx = self.ctx;
        let Some(interval) = &ctx.binding.interval else {
            return Ok(axes);
        };
        let decomposition = &ctx.decomposition;
        let axis = if decomposition.y_dims.is_empty() && !decomposition.x_dims.is_empty() {
            Axis::Y
        } else {
            Axis::X
        };
        let kind = self.measure_kind(&interval.start, Some(axis))?;
        let mut fields = vec![interval.start.full_name(), interval.end.full_name()];
        fields.extend(interval.milestone.as_ref().map(MeasureRef::full_name));
        if let Some(id) = self.shared(&fields, kind) {
            if let Some((_, length)) = ctx.interval_fields() {
                self.scales.alias(&length, id);
            }
            axes.set(axis, id);
        }
        Ok(axes)
    }

    /// Location categories plus longitude/latitude scales, fake when the
    /// map binds no coordinates.
    fn geo_scales(&mut self) -> ChartResult<(ScaleId, ScaleId)> {
        let ctx = self.ctx;
        let Some(geo) = &ctx.binding.geo else {
            let lon = self.scales.push_fake(ScaleKind::linear());
            return Ok((lon, self.scales.push_fake(ScaleKind::linear())));
        };
        self.dimension(&geo.location)?;
        let mut coordinate = |measure: Option<&MeasureRef>| match measure {
            Some(measure) => {
                let id = self.scales.ensure(&measure.full_name(), ScaleKind::linear());
                self.track(id);
                id
            }
            None => self.scales.push_fake(ScaleKind::linear()),
        };
        let lon = coordinate(geo.longitude.as_ref());
        let lat = coordinate(geo.latitude.as_ref());
        Ok((lon, lat))
    }

    /// Measures that size or color elements without owning an axis.
    fn off_axis_measures(&mut self, measures: &[MeasureRef]) -> ChartResult<()> {
        if let Some(first) = measures.first() {
            let kind = self.measure_kind(first, None)?;
            let fields: Vec<String> = measures.iter().map(MeasureRef::full_name).collect();
            self.shared(&fields, kind);
        }
        Ok(())
    }

    /// Adds the `ALL_` mirror of every measure field and wraps the range so
    /// the domain spans the brushed subset and the full data.
    fn mirror_brushed(&mut self) {
        for &id in &self.measure_scales {
            let Some(scale) = self.scales.get(id) else {
                continue;
            };
            if scale.is_fake() || !scale.kind.is_continuous() || scale.range.is_brushed() {
                continue;
            }
            let fields: Vec<String> = match &scale.range {
                ScaleRange::Stack(stack) => stack.fields.clone(),
                ScaleRange::Pareto(pareto) => pareto.fields.clone(),
                ScaleRange::Plain | ScaleRange::Brush(_) => scale.data_fields().to_vec(),
            };
            let all_fields: Vec<String> = fields
                .iter()
                .map(|field| GenerationContext::mirror(field))
                .collect();
            for field in &all_fields {
                self.scales.bind_mirror(field, id);
            }
            if let Some(scale) = self.scales.get_mut(id) {
                let inner = std::mem::take(&mut scale.range);
                scale.range = ScaleRange::Brush(BrushRange {
                    inner: Box::new(inner),
                    all_fields,
                });
            }
        }
    }
}
