use std::sync::Arc;

use smallvec::{SmallVec, smallvec};
use tracing::debug;

use crate::core::{
    Axis, ChartType, CollisionPolicy, Element, ElementRole, Frame, Geometry, GeneratorKind,
    LineShape, SchemaKind, VisualValue,
};
use crate::dataset::{Quantile, sum_header};

use super::binding::MeasureRef;
use super::context::GenerationContext;
use super::frame_resolver::FrameResolver;

/// One geometry a chart type draws per measure group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GeometryPlan {
    pub geometry: Geometry,
    pub role: ElementRole,
    pub line_shape: LineShape,
    pub filled: bool,
}

impl GeometryPlan {
    const fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            role: ElementRole::Primary,
            line_shape: LineShape::Straight,
            filled: false,
        }
    }

    const fn role(mut self, role: ElementRole) -> Self {
        self.role = role;
        self
    }

    const fn shape(mut self, line_shape: LineShape) -> Self {
        self.line_shape = line_shape;
        self
    }

    const fn filled(mut self) -> Self {
        self.filled = true;
        self
    }
}

/// Style toggles that add secondary geometries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PlanOptions {
    pub point_on_line: bool,
    pub sparkline: bool,
    pub donut_center_total: bool,
    pub milestone: bool,
    /// Map binds longitude and latitude.
    pub geo_points: bool,
}

/// Geometries of one chart type, primary first unless a support element
/// must be drawn underneath.
pub(crate) fn geometry_plan(
    chart_type: ChartType,
    options: PlanOptions,
) -> SmallVec<[GeometryPlan; 3]> {
    let point = GeometryPlan::new(Geometry::Point);
    let mut plan: SmallVec<[GeometryPlan; 3]> = match chart_type {
        ChartType::Auto
        | ChartType::Bar
        | ChartType::Bar3D
        | ChartType::StackBar
        | ChartType::StackBar3D
        | ChartType::Funnel
        | ChartType::Marimekko
        | ChartType::Pie
        | ChartType::Pie3D => smallvec![GeometryPlan::new(Geometry::Interval)],
        ChartType::Interval | ChartType::Gantt => {
            let mut plan = smallvec![GeometryPlan::new(Geometry::Interval)];
            if options.milestone {
                plan.push(point.role(ElementRole::Milestone));
            }
            plan
        }
        ChartType::Line | ChartType::StackLine | ChartType::Radar => {
            line_plan(GeometryPlan::new(Geometry::Line), options)
        }
        ChartType::StepLine => line_plan(
            GeometryPlan::new(Geometry::Line).shape(LineShape::Step),
            options,
        ),
        ChartType::JumpLine => line_plan(
            GeometryPlan::new(Geometry::Line).shape(LineShape::Jump),
            options,
        ),
        ChartType::Area | ChartType::StackArea | ChartType::FilledRadar => {
            smallvec![GeometryPlan::new(Geometry::Area).filled()]
        }
        ChartType::StepArea => {
            smallvec![GeometryPlan::new(Geometry::Area).shape(LineShape::Step).filled()]
        }
        ChartType::Point => {
            let mut plan = smallvec![point];
            if options.point_on_line {
                plan.push(GeometryPlan::new(Geometry::Line).role(ElementRole::Overlay));
            }
            plan
        }
        ChartType::StackPoint | ChartType::DotPlot => smallvec![point],
        ChartType::Donut => {
            let mut plan = smallvec![GeometryPlan::new(Geometry::Interval)];
            if options.donut_center_total {
                plan.push(point.role(ElementRole::CenterTotal));
            }
            plan
        }
        ChartType::Stock => smallvec![GeometryPlan::new(Geometry::Schema(SchemaKind::Stock))],
        ChartType::Candle => smallvec![GeometryPlan::new(Geometry::Schema(SchemaKind::Candle))],
        ChartType::BoxPlot => smallvec![
            GeometryPlan::new(Geometry::Schema(SchemaKind::BoxPlot)),
            point.role(ElementRole::Outlier),
        ],
        ChartType::Waterfall => smallvec![
            GeometryPlan::new(Geometry::Interval).role(ElementRole::Support),
            GeometryPlan::new(Geometry::Interval),
        ],
        ChartType::Pareto => smallvec![
            GeometryPlan::new(Geometry::Interval),
            GeometryPlan::new(Geometry::Line).role(ElementRole::Overlay),
        ],
        ChartType::Map => {
            let mut plan = smallvec![GeometryPlan::new(Geometry::Polygon).filled()];
            if options.geo_points {
                plan.push(point.role(ElementRole::Overlay));
            }
            plan
        }
        ChartType::MapContour => {
            let mut plan = smallvec![GeometryPlan::new(Geometry::Polygon).filled()];
            if options.geo_points {
                plan.push(GeometryPlan::new(Geometry::Contour).role(ElementRole::Overlay));
            }
            plan
        }
        ChartType::ScatterContour => smallvec![
            GeometryPlan::new(Geometry::Contour),
            point.role(ElementRole::Overlay),
        ],
        ChartType::Treemap | ChartType::Sunburst | ChartType::Icicle | ChartType::CirclePacking => {
            smallvec![GeometryPlan::new(Geometry::Polygon).filled()]
        }
        ChartType::Tree => smallvec![GeometryPlan::new(Geometry::Tree)],
        ChartType::Network => smallvec![
            GeometryPlan::new(Geometry::Relation),
            point.role(ElementRole::Overlay),
        ],
    };
    if options.sparkline && chart_type.is_line_like() {
        plan.push(point.role(ElementRole::Endpoint));
    }
    plan
}

fn line_plan(line: GeometryPlan, options: PlanOptions) -> SmallVec<[GeometryPlan; 3]> {
    let mut plan = smallvec![line];
    if options.point_on_line {
        plan.push(GeometryPlan::new(Geometry::Point).role(ElementRole::Overlay));
    }
    plan
}

/// Measures and dimensions one pane draws.
#[derive(Debug, Clone)]
pub(crate) struct PaneLayout {
    pub pane: usize,
    pub measures: Vec<MeasureRef>,
    /// Element dimensions, outer to inner.
    pub dims: Vec<String>,
}

/// Creates every element of the graph in deterministic order: panes, then
/// measure groups, then plan entries.
pub(crate) fn build_elements<'a>(
    ctx: &GenerationContext<'a>,
    resolver: &mut FrameResolver<'_, 'a>,
    panes: &[PaneLayout],
) -> Vec<Element> {
    let mut builder = ElementBuilder {
        ctx,
        resolver,
        elements: Vec::new(),
    };
    let interval_chart = matches!(ctx.chart_type, ChartType::Interval | ChartType::Gantt);
    for pane in panes {
        match ctx.kind {
            GeneratorKind::Merged | GeneratorKind::Gantt if interval_chart => {
                builder.interval(pane);
            }
            GeneratorKind::Merged
            | GeneratorKind::Separated
            | GeneratorKind::Radar
            | GeneratorKind::Gantt => builder.measure_groups(pane),
            GeneratorKind::Stock | GeneratorKind::Candle => builder.ohlc(pane),
            GeneratorKind::Map => builder.geo(pane),
            GeneratorKind::Hierarchy => builder.hierarchy(pane),
        }
    }
    debug!(elements = builder.elements.len(), "elements built");
    builder.elements
}

struct ElementBuilder<'r, 'c, 'x, 'a> {
    ctx: &'x GenerationContext<'a>,
    resolver: &'r mut FrameResolver<'c, 'a>,
    elements: Vec<Element>,
}

impl ElementBuilder<'_, '_, '_, '_> {
    fn options(&self) -> PlanOptions {
        let plot = &self.ctx.style.plot;
        let binding = self.ctx.binding;
        PlanOptions {
            point_on_line: plot.point_on_line,
            sparkline: plot.sparkline,
            donut_center_total: plot.donut_center_total,
            milestone: binding
                .interval
                .as_ref()
                .is_some_and(|interval| interval.milestone.is_some()),
            geo_points: binding
                .geo
                .as_ref()
                .is_some_and(|geo| geo.longitude.is_some() && geo.latitude.is_some()),
        }
    }

    /// Stacked measures share one element; everything else gets one group
    /// per measure.
    fn measure_groups(&mut self, pane: &PaneLayout) {
        let ctx = self.ctx;
        let mut stacked: Vec<&MeasureRef> = Vec::new();
        let mut groups: Vec<Vec<&MeasureRef>> = Vec::new();
        for measure in &pane.measures {
            if ctx.measure_type(measure).is_stacked() {
                if stacked.is_empty() {
                    groups.push(Vec::new());
                }
                stacked.push(measure);
            } else {
                groups.push(vec![measure]);
            }
        }
        // The stacked group keeps the slot of its first measure.
        if let Some(slot) = groups.iter_mut().find(|group| group.is_empty()) {
            *slot = stacked;
        }

        let cross: Vec<String> = if ctx.binding.has_xy_measures() {
            let other = match ctx.decomposition.value_axis() {
                Axis::X => Axis::Y,
                Axis::Y => Axis::X,
            };
            ctx.decomposition
                .measures(other)
                .iter()
                .map(MeasureRef::full_name)
                .collect()
        } else {
            Vec::new()
        };

        let options = self.options();
        for group in groups {
            let Some(first) = group.first() else {
                continue;
            };
            let chart_type = ctx.measure_type(first);
            let mut primary_color = None;
            for entry in geometry_plan(chart_type, options) {
                let mut values = cross.clone();
                values.extend(self.entry_values(chart_type, entry.role, &group));
                if chart_type == ChartType::Pareto && entry.role == ElementRole::Overlay {
                    // The cumulative line takes the bars' first color.
                    let color = primary_color.unwrap_or_else(|| self.resolver.measure_color(first));
                    let mut element = self.element(chart_type, entry, &group, values, pane);
                    element.frames.color =
                        Some(Arc::new(Frame::constant(VisualValue::Color(color))));
                    self.elements.push(element);
                    continue;
                }
                let element = self.element(chart_type, entry, &group, values, pane);
                if entry.role == ElementRole::Primary {
                    primary_color = Some(self.resolver.measure_color(first));
                    if ctx.is_brushing() {
                        let shadow = self.shadow(&element, &group);
                        self.elements.push(element);
                        self.elements.push(shadow);
                        continue;
                    }
                }
                self.elements.push(element);
            }
        }
    }

    fn entry_values(
        &self,
        chart_type: ChartType,
        role: ElementRole,
        group: &[&MeasureRef],
    ) -> Vec<String> {
        let names = || group.iter().map(|measure| measure.full_name()).collect::<Vec<_>>();
        match (chart_type, role) {
            (ChartType::BoxPlot, ElementRole::Primary) => group
                .iter()
                .flat_map(|measure| {
                    let name = measure.full_name();
                    Quantile::ALL.map(|quantile| quantile.header(&name))
                })
                .collect(),
            (ChartType::Waterfall, ElementRole::Support) => group
                .iter()
                .map(|measure| sum_header(&measure.full_name()))
                .collect(),
            _ => names(),
        }
    }

    fn element(
        &mut self,
        chart_type: ChartType,
        entry: GeometryPlan,
        measures: &[&MeasureRef],
        values: Vec<String>,
        pane: &PaneLayout,
    ) -> Element {
        let ctx = self.ctx;
        let legend = entry.role != ElementRole::CenterTotal;
        let frame_fields: Vec<String> =
            measures.iter().map(|measure| measure.full_name()).collect();
        let frames = self
            .resolver
            .element_frames(measures, &frame_fields, entry.role, legend);
        let mut element = Element::new(entry.geometry, chart_type).with_role(entry.role);
        element.dimensions = pane.dims.clone();
        element.values = values;
        element.frames = frames;
        element.collision = match entry.role {
            ElementRole::Primary | ElementRole::Support => chart_type.collision(ctx.is_grouped()),
            _ => CollisionPolicy::None,
        };
        element.row_range = ctx.brush.as_ref().map(|brush| brush.brushed.clone());
        element.line_shape = entry.line_shape;
        element.filled = entry.filled;
        element.depth = chart_type.is_3d();
        element.visible = entry.role != ElementRole::Support;
        element.legend = legend;
        element.pane = pane.pane;
        element
    }

    /// Unbrushed copy of a primary element drawing the `ALL_` mirrors.
    fn shadow(&mut self, primary: &Element, measures: &[&MeasureRef]) -> Element {
        let mut shadow = primary.clone().with_role(ElementRole::Shadow);
        shadow.values = primary
            .values
            .iter()
            .map(|field| GenerationContext::mirror(field))
            .collect();
        let frame_fields: Vec<String> = measures
            .iter()
            .map(|measure| GenerationContext::mirror(&measure.full_name()))
            .collect();
        shadow.frames = self
            .resolver
            .element_frames(measures, &frame_fields, ElementRole::Shadow, false);
        shadow.row_range = self.ctx.brush.as_ref().map(|brush| brush.all.clone());
        shadow.legend = false;
        shadow
    }

    fn ohlc(&mut self, pane: &PaneLayout) {
        let ctx = self.ctx;
        let Some(ohlc) = &ctx.binding.ohlc else {
            return;
        };
        let values: Vec<String> = ohlc
            .measures()
            .iter()
            .map(|measure| measure.full_name())
            .collect();
        for entry in geometry_plan(ctx.chart_type, self.options()) {
            let element = self.element(ctx.chart_type, entry, &[&ohlc.close], values.clone(), pane);
            self.elements.push(element);
        }
    }

    fn interval(&mut self, pane: &PaneLayout) {
        let ctx = self.ctx;
        let (Some(interval), Some((start, length))) =
            (&ctx.binding.interval, ctx.interval_fields())
        else {
            return;
        };
        for entry in geometry_plan(ctx.chart_type, self.options()) {
            let (measure, values) = match (entry.role, &interval.milestone) {
                (ElementRole::Milestone, Some(milestone)) => {
                    (milestone, vec![milestone.full_name()])
                }
                _ => (&interval.start, vec![start.clone(), length.clone()]),
            };
            let element = self.element(ctx.chart_type, entry, &[measure], values, pane);
            self.elements.push(element);
        }
    }

    fn geo(&mut self, pane: &PaneLayout) {
        let ctx = self.ctx;
        let measures: Vec<&MeasureRef> = pane.measures.iter().collect();
        let coordinates: Vec<String> = ctx
            .binding
            .geo
            .iter()
            .flat_map(|geo| [&geo.longitude, &geo.latitude])
            .flatten()
            .map(MeasureRef::full_name)
            .collect();
        for entry in geometry_plan(ctx.chart_type, self.options()) {
            let values = match entry.role {
                ElementRole::Overlay => coordinates.clone(),
                _ => measures.iter().map(|measure| measure.full_name()).collect(),
            };
            let element = self.element(ctx.chart_type, entry, &measures, values, pane);
            self.elements.push(element);
        }
    }

    fn hierarchy(&mut self, pane: &PaneLayout) {
        let ctx = self.ctx;
        let measures: Vec<&MeasureRef> = pane.measures.iter().collect();
        let values: Vec<String> = measures.iter().map(|measure| measure.full_name()).collect();
        for entry in geometry_plan(ctx.chart_type, self.options()) {
            let mut element = self.element(ctx.chart_type, entry, &measures, values.clone(), pane);
            if entry.role == ElementRole::Overlay {
                if let Some(relation) = &ctx.binding.relation {
                    element.dimensions = vec![relation.source.column.clone()];
                }
            }
            self.elements.push(element);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PlanOptions, geometry_plan};
    use crate::core::{ChartType, ElementRole, Geometry, LineShape, SchemaKind};

    #[test]
    fn point_on_line_adds_overlay_points() {
        let plan = geometry_plan(
            ChartType::StepLine,
            PlanOptions {
                point_on_line: true,
                ..PlanOptions::default()
            },
        );
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].line_shape, LineShape::Step);
        assert_eq!(plan[1].geometry, Geometry::Point);
        assert_eq!(plan[1].role, ElementRole::Overlay);
    }

    #[test]
    fn waterfall_draws_support_under_primary() {
        let plan = geometry_plan(ChartType::Waterfall, PlanOptions::default());
        let roles: Vec<_> = plan.iter().map(|entry| entry.role).collect();
        assert_eq!(roles, [ElementRole::Support, ElementRole::Primary]);
    }

    #[test]
    fn box_plot_adds_outliers() {
        let plan = geometry_plan(ChartType::BoxPlot, PlanOptions::default());
        assert_eq!(plan[0].geometry, Geometry::Schema(SchemaKind::BoxPlot));
        assert_eq!(plan[1].role, ElementRole::Outlier);
    }

    #[test]
    fn sparkline_marks_line_end() {
        let plan = geometry_plan(
            ChartType::Line,
            PlanOptions {
                sparkline: true,
                ..PlanOptions::default()
            },
        );
        assert_eq!(plan.last().map(|entry| entry.role), Some(ElementRole::Endpoint));
        let bars = geometry_plan(
            ChartType::Bar,
            PlanOptions {
                sparkline: true,
                ..PlanOptions::default()
            },
        );
        assert_eq!(bars.len(), 1);
    }
}
