use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::{
    Axis, Channel, Color, LegendPosition, LineStyle, TargetStrategy, TrendFit, default_palette,
};
use crate::error::{ChartError, ChartResult};

pub const STYLE_JSON_SCHEMA_V1: u32 = 1;

/// Plot-wide options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotOptions {
    /// Draw bar/line/area/point types as their stacked variants.
    #[serde(default)]
    pub stack_values: bool,
    #[serde(default)]
    pub point_on_line: bool,
    #[serde(default)]
    pub sparkline: bool,
    /// Shine effect on filled shapes.
    #[serde(default)]
    pub effect: bool,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default)]
    pub value_labels: bool,
    #[serde(default)]
    pub quadrant_lines: bool,
    #[serde(default)]
    pub diagonal_line: bool,
    #[serde(default)]
    pub donut_center_total: bool,
    /// Synthesize missing buckets of time-series dimensions.
    #[serde(default = "default_true")]
    pub fill_gaps: bool,
    /// Value written into gaps of additive measures.
    #[serde(default)]
    pub gap_fill_value: f64,
    #[serde(default = "default_total_label")]
    pub waterfall_total_label: String,
    /// Split trend lines per color group.
    #[serde(default)]
    pub trend_per_color: bool,
    /// Overrides the chart type's default element size.
    #[serde(default)]
    pub size: Option<f64>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            stack_values: false,
            point_on_line: false,
            sparkline: false,
            effect: false,
            alpha: default_alpha(),
            value_labels: false,
            quadrant_lines: false,
            diagonal_line: false,
            donut_center_total: false,
            fill_gaps: true,
            gap_fill_value: 0.0,
            waterfall_total_label: default_total_label(),
            trend_per_color: false,
            size: None,
        }
    }
}

/// Per-axis visual options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDescriptor {
    #[serde(default = "default_true")]
    pub line_visible: bool,
    #[serde(default = "default_line_color")]
    pub line_color: Color,
    #[serde(default = "default_true")]
    pub labels_visible: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// Log transform for every measure on this axis.
    #[serde(default)]
    pub log: bool,
}

impl Default for AxisDescriptor {
    fn default() -> Self {
        Self {
            line_visible: true,
            line_color: default_line_color(),
            labels_visible: true,
            title: None,
            format: None,
            log: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelLegend {
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub title: Option<String>,
}

impl Default for ChannelLegend {
    fn default() -> Self {
        Self {
            visible: true,
            title: None,
        }
    }
}

/// Legend layout and per-channel settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendDescriptor {
    pub position: LegendPosition,
    /// Maximum legend extent in pixels along its layout direction.
    pub max_size: Option<f64>,
    pub color: ChannelLegend,
    pub shape: ChannelLegend,
    pub size: ChannelLegend,
    pub texture: ChannelLegend,
    pub line: ChannelLegend,
}

impl LegendDescriptor {
    /// Settings for a channel; text frames never get a legend.
    #[must_use]
    pub fn channel(&self, channel: Channel) -> Option<&ChannelLegend> {
        match channel {
            Channel::Color => Some(&self.color),
            Channel::Shape => Some(&self.shape),
            Channel::Size => Some(&self.size),
            Channel::Texture => Some(&self.texture),
            Channel::Line => Some(&self.line),
            Channel::Text => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendStyle {
    #[serde(default)]
    pub fit: TrendFit,
    /// Overrides the measure's own color.
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default = "default_trend_line")]
    pub line: LineStyle,
}

impl Default for TrendStyle {
    fn default() -> Self {
        Self {
            fit: TrendFit::Linear,
            color: None,
            line: default_trend_line(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetDef {
    /// Measure field the target applies to; `None` targets every measure.
    #[serde(default)]
    pub measure: Option<String>,
    pub strategy: TargetStrategy,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_target_color")]
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandingDescriptor {
    pub axis: Axis,
    pub colors: Vec<Color>,
}

/// Colors of the two brushing layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushStyle {
    #[serde(default = "default_brush_highlight")]
    pub highlight: Color,
    #[serde(default = "default_brush_dim")]
    pub dim: Color,
}

impl Default for BrushStyle {
    fn default() -> Self {
        Self {
            highlight: default_brush_highlight(),
            dim: default_brush_dim(),
        }
    }
}

/// Visual configuration consumed read-only by generation.
///
/// Serializable so hosts can persist chart styling without inventing their
/// own format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    #[serde(default)]
    pub plot: PlotOptions,
    #[serde(default)]
    pub x_axis: AxisDescriptor,
    #[serde(default)]
    pub y_axis: AxisDescriptor,
    #[serde(default)]
    pub legend: LegendDescriptor,
    #[serde(default)]
    pub trend: Option<TrendStyle>,
    #[serde(default)]
    pub targets: Vec<TargetDef>,
    #[serde(default)]
    pub banding: Option<BandingDescriptor>,
    #[serde(default = "default_palette")]
    pub palette: Vec<Color>,
    #[serde(default)]
    pub brush: BrushStyle,
    /// Format pattern per field name.
    #[serde(default)]
    pub formats: IndexMap<String, String>,
}

impl Default for StyleDescriptor {
    fn default() -> Self {
        Self {
            plot: PlotOptions::default(),
            x_axis: AxisDescriptor::default(),
            y_axis: AxisDescriptor::default(),
            legend: LegendDescriptor::default(),
            trend: None,
            targets: Vec::new(),
            banding: None,
            palette: default_palette(),
            brush: BrushStyle::default(),
            formats: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDescriptorJsonContractV1 {
    pub schema_version: u32,
    pub style: StyleDescriptor,
}

impl StyleDescriptor {
    #[must_use]
    pub fn axis(&self, axis: Axis) -> &AxisDescriptor {
        match axis {
            Axis::X => &self.x_axis,
            Axis::Y => &self.y_axis,
        }
    }

    /// Palette color at `index`, cycling.
    #[must_use]
    pub fn palette_color(&self, index: usize) -> Color {
        if self.palette.is_empty() {
            return Color::GRAY;
        }
        self.palette[index % self.palette.len()]
    }

    pub fn validate(&self) -> ChartResult<()> {
        let plot = &self.plot;
        if !plot.alpha.is_finite() || !(0.0..=1.0).contains(&plot.alpha) {
            return Err(ChartError::InvalidStyle(
                "plot alpha must be finite and in [0, 1]".to_owned(),
            ));
        }
        if let Some(size) = plot.size {
            if !size.is_finite() || size <= 0.0 {
                return Err(ChartError::InvalidStyle(
                    "plot size must be finite and > 0".to_owned(),
                ));
            }
        }
        if !plot.gap_fill_value.is_finite() {
            return Err(ChartError::InvalidStyle(
                "gap fill value must be finite".to_owned(),
            ));
        }
        if let Some(max_size) = self.legend.max_size {
            if !max_size.is_finite() || max_size < 0.0 {
                return Err(ChartError::InvalidStyle(
                    "legend max size must be finite and >= 0".to_owned(),
                ));
            }
        }
        if self.palette.is_empty() {
            return Err(ChartError::InvalidStyle(
                "palette must contain at least one color".to_owned(),
            ));
        }

        for target in &self.targets {
            match target.strategy {
                TargetStrategy::Percentile(percent)
                    if !percent.is_finite() || !(0.0..=100.0).contains(&percent) =>
                {
                    return Err(ChartError::InvalidStyle(
                        "target percentile must be in [0, 100]".to_owned(),
                    ));
                }
                TargetStrategy::Fixed(value) if !value.is_finite() => {
                    return Err(ChartError::InvalidStyle(
                        "fixed target must be finite".to_owned(),
                    ));
                }
                _ => {}
            }
            target.color.validate()?;
        }

        let colors = self
            .palette
            .iter()
            .chain([
                &self.x_axis.line_color,
                &self.y_axis.line_color,
                &self.brush.highlight,
                &self.brush.dim,
            ])
            .chain(self.trend.iter().filter_map(|trend| trend.color.as_ref()))
            .chain(self.banding.iter().flat_map(|banding| &banding.colors));
        for color in colors {
            color.validate()?;
        }
        Ok(())
    }

    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let style: Self = serde_json::from_str(input)
            .map_err(|e| ChartError::InvalidStyle(format!("failed to parse style json: {e}")))?;
        style.validate()?;
        Ok(style)
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ChartError::InvalidStyle(format!("failed to serialize style json: {e}")))
    }

    pub fn to_json_contract_v1_pretty(&self) -> ChartResult<String> {
        let payload = StyleDescriptorJsonContractV1 {
            schema_version: STYLE_JSON_SCHEMA_V1,
            style: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            ChartError::InvalidStyle(format!("failed to serialize style contract v1: {e}"))
        })
    }

    /// Accepts either a bare style object or a versioned contract payload.
    pub fn from_json_compat_str(input: &str) -> ChartResult<Self> {
        if let Ok(payload) = serde_json::from_str::<StyleDescriptorJsonContractV1>(input) {
            if payload.schema_version != STYLE_JSON_SCHEMA_V1 {
                return Err(ChartError::InvalidStyle(format!(
                    "unsupported style schema version: {}",
                    payload.schema_version
                )));
            }
            payload.style.validate()?;
            return Ok(payload.style);
        }
        Self::from_json_str(input)
    }
}

fn default_true() -> bool {
    true
}

fn default_alpha() -> f64 {
    1.0
}

fn default_total_label() -> String {
    "Total".to_owned()
}

fn default_line_color() -> Color {
    Color::GRAY
}

fn default_trend_line() -> LineStyle {
    LineStyle::Dash
}

fn default_target_color() -> Color {
    Color::ACCENT
}

fn default_brush_highlight() -> Color {
    Color::ACCENT
}

fn default_brush_dim() -> Color {
    Color::GRAY.with_alpha(0.6)
}
