use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{trace, warn};

use crate::core::{
    BrushFrame, BrushRole, CategoricalFrame, Channel, Color, CompositeFrame, ElementFrames,
    ElementRole, Frame, HighlightFrame, HighlightRule, HighlightTarget, LabelFrame, LegendSpec,
    LineStyle, LinearFrame, ScaleDomain, ScaleSet, ShapeKind, StackedMeasuresFrame, TextureKind,
    VisualValue,
};
use crate::dataset::Quantile;

use super::binding::{AestheticRef, MeasureRef};
use super::context::GenerationContext;
use super::palette_cache::{Palette, PaletteCache};

/// Cache key of a base frame: the channel plus the measure owning it, or
/// `None` for frames shared by every measure.
type FrameKey = (Channel, Option<String>);

/// Turns aesthetic bindings into shared frames and collects legends.
///
/// Base frames are built once per key and handed out as `Arc` clones, so
/// every element bound to the same field shares one frame.
pub(crate) struct FrameResolver<'c, 'a> {
    ctx: &'c GenerationContext<'a>,
    scales: &'c ScaleSet,
    palette_cache: &'c PaletteCache,
    source_id: Option<&'c str>,
    measure_index: IndexMap<String, usize>,
    cache: HashMap<FrameKey, Option<Arc<Frame>>>,
    legends: IndexMap<(Channel, String), LegendSpec>,
}

impl<'c, 'a> FrameResolver<'c, 'a> {
    pub fn new(
        ctx: &'c GenerationContext<'a>,
        scales: &'c ScaleSet,
        palette_cache: &'c PaletteCache,
        source_id: Option<&'c str>,
    ) -> Self {
        let mut measure_index = IndexMap::new();
        let measures = ctx
            .decomposition
            .value_measures()
            .iter()
            .chain(ctx.decomposition.all_measures());
        for measure in measures {
            let next = measure_index.len();
            measure_index.entry(measure.full_name()).or_insert(next);
        }
        Self {
            ctx,
            scales,
            palette_cache,
            source_id,
            measure_index,
            cache: HashMap::new(),
            legends: IndexMap::new(),
        }
    }

    /// Frames of one element drawing `measures` through `value_fields`.
    ///
    /// Several measures in one element get a per-measure frame keyed by
    /// value field, unless they all share one global frame.
    pub fn element_frames(
        &mut self,
        measures: &[&MeasureRef],
        value_fields: &[String],
        role: ElementRole,
        legend: bool,
    ) -> ElementFrames {
        let mut frames = ElementFrames::default();
        for channel in Channel::ALL {
            let base = if measures.len() > 1 {
                self.stacked(channel, measures, value_fields)
            } else {
                self.base(channel, measures.first().copied())
            };
            if legend {
                if let Some(base) = &base {
                    self.register_legend(base);
                }
            }
            let mut layers: Vec<Arc<Frame>> = Vec::new();
            if let Some(brush) = self.brush_layer(channel, role) {
                layers.push(brush);
            }
            if role != ElementRole::Shadow {
                if let Some(highlight) = self.highlight(channel, measures.first().copied()) {
                    layers.push(highlight);
                }
            }
            let frame = match (layers.is_empty(), base) {
                (true, base) => base,
                (false, base) => {
                    layers.extend(base);
                    Some(Arc::new(Frame::Composite(CompositeFrame { layers })))
                }
            };
            frames.set(channel, frame);
        }
        frames
    }

    /// Color frame of a measure without highlight or brush layers.
    pub fn color_frame(&mut self, measure: &MeasureRef) -> Option<Arc<Frame>> {
        self.base(Channel::Color, Some(measure))
    }

    /// Base color of a measure, used by decorations and overlay lines.
    pub fn measure_color(&mut self, measure: &MeasureRef) -> Color {
        self.color_frame(measure)
            .and_then(|frame| first_color(&frame))
            .unwrap_or_else(|| self.default_color(Some(measure)))
    }

    /// Legends in first-registration order.
    pub fn into_legends(self) -> Vec<LegendSpec> {
        self.legends.into_values().collect()
    }

    fn stacked(
        &mut self,
        channel: Channel,
        measures: &[&MeasureRef],
        value_fields: &[String],
    ) -> Option<Arc<Frame>> {
        let frames: IndexMap<String, Arc<Frame>> = measures
            .iter()
            .zip(value_fields)
            .filter_map(|(measure, field)| {
                self.base(channel, Some(*measure))
                    .map(|frame| (field.clone(), frame))
            })
            .collect();
        let first = frames.values().next()?.clone();
        if frames.len() == measures.len()
            && frames.values().all(|frame| Arc::ptr_eq(frame, &first))
        {
            return Some(first);
        }
        Some(Arc::new(Frame::StackedMeasures(StackedMeasuresFrame {
            channel,
            frames,
        })))
    }

    fn base(&mut self, channel: Channel, measure: Option<&MeasureRef>) -> Option<Arc<Frame>> {
        let own = measure.and_then(|measure| measure.aesthetics.get(channel));
        let global = self.ctx.binding.aesthetics.get(channel);
        // Default color and value-label frames depend on the measure.
        let per_measure = own.is_some()
            || (global.is_none() && matches!(channel, Channel::Color | Channel::Text));
        let key = (channel, per_measure.then(|| measure.map(MeasureRef::full_name)).flatten());
        if let Some(frame) = self.cache.get(&key) {
            return frame.clone();
        }
        let frame = match own.or(global) {
            Some(aesthetic) => self.bound_frame(channel, aesthetic),
            None => self.default_frame(channel, measure),
        }
        .map(Arc::new);
        trace!(?channel, measure = ?key.1, bound = frame.is_some(), "frame resolved");
        self.cache.insert(key, frame.clone());
        frame
    }

    fn bound_frame(&self, channel: Channel, aesthetic: &AestheticRef) -> Option<Frame> {
        match aesthetic {
            AestheticRef::Static(value) => Some(Frame::constant(value.clone())),
            AestheticRef::Dimension(dimension) => self.field_frame(channel, &dimension.column),
            AestheticRef::Measure(measure) => self.field_frame(channel, &measure.full_name()),
        }
    }

    fn field_frame(&self, channel: Channel, field: &str) -> Option<Frame> {
        if channel == Channel::Text {
            return Some(Frame::Label(LabelFrame {
                field: Some(field.to_owned()),
                format: self.ctx.style.formats.get(field).cloned(),
            }));
        }
        let Some(scale) = self.scales.scale_for(field) else {
            warn!(field, "aesthetic field has no scale, frame omitted");
            return None;
        };
        match scale.domain() {
            ScaleDomain::Categories(values) if !values.is_empty() => {
                let labels: Vec<String> = values.iter().map(|value| value.label()).collect();
                Some(self.categorical_frame(channel, field, &labels))
            }
            ScaleDomain::Continuous(linear) => {
                let (low, high) = self.linear_range(channel);
                Some(Frame::Linear(LinearFrame {
                    channel,
                    field: field.to_owned(),
                    domain: linear.domain(),
                    low,
                    high,
                }))
            }
            ScaleDomain::Categories(_) | ScaleDomain::Unset => {
                warn!(field, ?channel, "aesthetic field has no values, frame omitted");
                None
            }
        }
    }

    fn categorical_frame(&self, channel: Channel, field: &str, labels: &[String]) -> Frame {
        let size = self.ctx.chart_type.default_size();
        let count = labels.len();
        let palette = match (channel, self.source_id) {
            (Channel::Color, Some(source)) => {
                self.palette_cache
                    .assign(source, field, labels, &self.ctx.style.palette)
            }
            (Channel::Color, None) => {
                let mut palette = Palette::default();
                for label in labels {
                    palette.assign(label, &self.ctx.style.palette);
                }
                palette
            }
            _ => Palette::default(),
        };
        let mapping = labels
            .iter()
            .enumerate()
            .map(|(index, label)| {
                let value = match channel {
                    Channel::Color => VisualValue::Color(
                        palette
                            .color(label)
                            .unwrap_or_else(|| self.ctx.style.palette_color(index)),
                    ),
                    Channel::Shape => {
                        VisualValue::Shape(ShapeKind::ALL[index % ShapeKind::ALL.len()])
                    }
                    Channel::Texture => {
                        VisualValue::Texture(TextureKind::ALL[index % TextureKind::ALL.len()])
                    }
                    Channel::Line => {
                        VisualValue::Line(LineStyle::ALL[index % LineStyle::ALL.len()])
                    }
                    Channel::Size => VisualValue::Size(
                        size.min + (size.max - size.min) * (index + 1) as f64 / count as f64,
                    ),
                    Channel::Text => VisualValue::Text(label.clone()),
                };
                (label.clone(), value)
            })
            .collect();
        Frame::Categorical(CategoricalFrame {
            channel,
            field: field.to_owned(),
            mapping,
            fallback: self.fallback(channel),
        })
    }

    fn linear_range(&self, channel: Channel) -> (VisualValue, VisualValue) {
        let size = self.ctx.chart_type.default_size();
        match channel {
            Channel::Color => (
                VisualValue::Color(self.ctx.style.palette_color(1)),
                VisualValue::Color(self.ctx.style.palette_color(0)),
            ),
            Channel::Size => (VisualValue::Size(size.min), VisualValue::Size(size.max)),
            Channel::Shape => (
                VisualValue::Shape(ShapeKind::Circle),
                VisualValue::Shape(ShapeKind::Square),
            ),
            Channel::Texture => (
                VisualValue::Texture(TextureKind::Solid),
                VisualValue::Texture(TextureKind::Hatch),
            ),
            Channel::Line => (
                VisualValue::Line(LineStyle::Solid),
                VisualValue::Line(LineStyle::Dash),
            ),
            Channel::Text => (VisualValue::Text(String::new()), VisualValue::Text(String::new())),
        }
    }

    fn fallback(&self, channel: Channel) -> VisualValue {
        match channel {
            Channel::Color => VisualValue::Color(Color::GRAY),
            Channel::Shape => VisualValue::Shape(ShapeKind::Circle),
            Channel::Size => VisualValue::Size(self.default_size()),
            Channel::Texture => VisualValue::Texture(TextureKind::Solid),
            Channel::Line => VisualValue::Line(LineStyle::Solid),
            Channel::Text => VisualValue::Text(String::new()),
        }
    }

    fn default_frame(&self, channel: Channel, measure: Option<&MeasureRef>) -> Option<Frame> {
        match channel {
            Channel::Color => Some(Frame::constant(VisualValue::Color(
                self.default_color(measure),
            ))),
            Channel::Size => Some(Frame::constant(VisualValue::Size(self.default_size()))),
            Channel::Text if self.ctx.style.plot.value_labels => Some(Frame::Label(LabelFrame {
                field: None,
                format: measure.and_then(|m| self.ctx.style.formats.get(&m.full_name()).cloned()),
            })),
            Channel::Text | Channel::Shape | Channel::Texture | Channel::Line => None,
        }
    }

    fn default_color(&self, measure: Option<&MeasureRef>) -> Color {
        let index = measure
            .and_then(|measure| self.measure_index.get(&measure.full_name()).copied())
            .unwrap_or(0);
        self.ctx.style.palette_color(index)
    }

    fn default_size(&self) -> f64 {
        self.ctx
            .style
            .plot
            .size
            .unwrap_or_else(|| self.ctx.chart_type.default_size().size)
    }

    /// Highlight layer for `channel`, inspecting the chart type's
    /// highlight field.
    fn highlight(&self, channel: Channel, measure: Option<&MeasureRef>) -> Option<Arc<Frame>> {
        let rules: Vec<HighlightRule> = self
            .ctx
            .binding
            .highlights
            .iter()
            .filter(|def| def.value.channel() == channel)
            .map(|def| HighlightRule {
                name: def.name.clone(),
                condition: def.condition.clone(),
                value: def.value.clone(),
            })
            .collect();
        if rules.is_empty() {
            return None;
        }
        let binding = self.ctx.binding;
        let field = match self.ctx.chart_type.highlight_target() {
            HighlightTarget::Measure => None,
            HighlightTarget::Median => {
                measure.map(|measure| Quantile::Median.header(&measure.full_name()))
            }
            HighlightTarget::Close => binding.ohlc.as_ref().map(|ohlc| ohlc.close.full_name()),
            HighlightTarget::Dimension => binding
                .geo
                .as_ref()
                .map(|geo| geo.location.column.clone())
                .or_else(|| binding.relation.as_ref().map(|r| r.source.column.clone()))
                .or_else(|| {
                    self.ctx
                        .decomposition
                        .innermost_dim()
                        .map(|dim| dim.column.clone())
                }),
        };
        Some(Arc::new(Frame::Highlight(HighlightFrame {
            channel,
            field,
            rules,
        })))
    }

    fn brush_layer(&self, channel: Channel, role: ElementRole) -> Option<Arc<Frame>> {
        let brush = self.ctx.brush.as_ref()?;
        if channel != Channel::Color {
            return None;
        }
        let frame = match role {
            ElementRole::Shadow => BrushFrame {
                role: BrushRole::Dim,
                value: VisualValue::Color(self.ctx.style.brush.dim),
                rows: brush.all.clone(),
            },
            ElementRole::Support | ElementRole::CenterTotal => return None,
            ElementRole::Primary
            | ElementRole::Overlay
            | ElementRole::Outlier
            | ElementRole::Milestone
            | ElementRole::Endpoint => BrushFrame {
                role: BrushRole::Highlight,
                value: VisualValue::Color(self.ctx.style.brush.highlight),
                rows: brush.brushed.clone(),
            },
        };
        Some(Arc::new(Frame::Brush(frame)))
    }

    fn register_legend(&mut self, frame: &Arc<Frame>) {
        let candidates: Vec<Arc<Frame>> = match frame.as_ref() {
            Frame::StackedMeasures(stacked) => stacked.frames.values().cloned().collect(),
            _ => vec![Arc::clone(frame)],
        };
        let style = self.ctx.style;
        if style.plot.sparkline {
            return;
        }
        for candidate in candidates {
            let channel = candidate.channel();
            let Some(field) = candidate.legend_field() else {
                continue;
            };
            if channel == Channel::Size && self.ctx.chart_type.is_contour() {
                continue;
            }
            let Some(settings) = style.legend.channel(channel) else {
                continue;
            };
            if !settings.visible {
                continue;
            }
            let key = (channel, field.to_owned());
            if self.legends.contains_key(&key) {
                continue;
            }
            let title = settings
                .title
                .clone()
                .unwrap_or_else(|| self.ctx.decomposition.label_of(field));
            let legend = LegendSpec {
                channel,
                field: field.to_owned(),
                title,
                position: style.legend.position,
                frame: Arc::clone(&candidate),
            };
            self.legends.insert(key, legend);
        }
    }
}

/// Representative color of a frame: its static value, first category or
/// high end.
pub(crate) fn first_color(frame: &Frame) -> Option<Color> {
    match frame {
        Frame::Static { value, .. } => value.as_color(),
        Frame::Categorical(categorical) => categorical
            .mapping
            .values()
            .next()
            .and_then(VisualValue::as_color),
        Frame::Linear(linear) => linear.high.as_color(),
        Frame::Composite(composite) => composite.layers.last().and_then(|layer| first_color(layer)),
        Frame::StackedMeasures(stacked) => stacked
            .frames
            .values()
            .next()
            .and_then(|sub| first_color(sub)),
        Frame::Label(_) | Frame::Highlight(_) | Frame::Brush(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{FrameResolver, first_color};
    use crate::api::binding::{AestheticRef, Aggregate, ChartBinding, DimensionRef, FieldRef};
    use crate::api::context::GenerationContext;
    use crate::api::decompose::Decomposition;
    use crate::api::palette_cache::PaletteCache;
    use crate::api::scale_builder::build_scales;
    use crate::api::style::StyleDescriptor;
    use crate::core::{Channel, ChartType, DataType, ElementRole, Frame, GeneratorKind, Value};
    use crate::dataset::{ColumnInfo, DataTable};

    fn context<'a>(binding: &'a ChartBinding, style: &'a StyleDescriptor) -> GenerationContext<'a> {
        let table = DataTable::new(vec![
            ColumnInfo::dimension("Month", DataType::String),
            ColumnInfo::dimension("Region", DataType::String),
            ColumnInfo::measure("Sum(Sales)", DataType::Double),
        ])
        .with_rows([
            vec![Value::from("Jan"), Value::from("East"), Value::from(3.0)],
            vec![Value::from("Jan"), Value::from("West"), Value::from(4.0)],
            vec![Value::from("Feb"), Value::from("East"), Value::from(5.0)],
        ])
        .expect("rows");
        GenerationContext {
            binding,
            style,
            chart_type: binding.chart_type,
            kind: GeneratorKind::Merged,
            decomposition: Decomposition::new(binding, binding.chart_type),
            data: Arc::new(table),
            brush: None,
        }
    }

    #[test]
    fn color_dimension_registers_one_legend_and_shares_frames() {
        let binding = ChartBinding::new(ChartType::Bar)
            .with_x(FieldRef::dimension("Month"))
            .with_y(FieldRef::measure("Sales", Aggregate::Sum))
            .with_aesthetic(
                Channel::Color,
                AestheticRef::Dimension(DimensionRef::new("Region")),
            );
        let style = StyleDescriptor::default();
        let ctx = context(&binding, &style);
        let mut plan = build_scales(&ctx).expect("scales");
        plan.scales.init_all(&*ctx.data).expect("init");
        let cache = PaletteCache::new();
        let mut resolver = FrameResolver::new(&ctx, &plan.scales, &cache, Some("sales"));
        let measure = ctx.decomposition.y_measures[0].clone();
        let name = measure.full_name();
        let first =
            resolver.element_frames(&[&measure], &[name.clone()], ElementRole::Primary, true);
        let second = resolver.element_frames(&[&measure], &[name], ElementRole::Overlay, true);
        let (Some(a), Some(b)) = (first.color, second.color) else {
            panic!("color frames expected");
        };
        assert!(Arc::ptr_eq(&a, &b));
        assert!(matches!(a.as_ref(), Frame::Categorical(_)));
        assert_eq!(cache.get("sales", "Region").map(|palette| palette.len()), Some(2));

        let legends = resolver.into_legends();
        assert_eq!(legends.len(), 1);
        assert_eq!(legends[0].field, "Region");
    }

    #[test]
    fn unbound_color_uses_measure_palette_index() {
        let binding = ChartBinding::new(ChartType::Line)
            .with_x(FieldRef::dimension("Month"))
            .with_y(FieldRef::measure("Sales", Aggregate::Sum));
        let style = StyleDescriptor::default();
        let ctx = context(&binding, &style);
        let plan = build_scales(&ctx).expect("scales");
        let cache = PaletteCache::new();
        let mut resolver = FrameResolver::new(&ctx, &plan.scales, &cache, None);
        let measure = ctx.decomposition.y_measures[0].clone();
        let frames = resolver.element_frames(
            &[&measure],
            &[measure.full_name()],
            ElementRole::Primary,
            true,
        );
        let color = frames.color.as_deref().and_then(first_color);
        assert_eq!(color, Some(style.palette_color(0)));
        assert!(frames.shape.is_none());
        assert!(resolver.into_legends().is_empty());
    }
}
