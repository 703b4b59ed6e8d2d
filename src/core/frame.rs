//! Aesthetic frames: mappings from data values to visual properties.
//!
//! Frames are immutable once built and shared between elements through
//! `Arc<Frame>`. Cross-cutting effects (highlight, brushing) never mutate a
//! base frame; they wrap it in a [`CompositeFrame`] whose layers are
//! evaluated in order until one produces a value.

use std::ops::Range;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::primitives::compare_values;
use crate::core::{Color, Value};
use crate::dataset::DataSource;

/// One of the six aesthetic channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    Color,
    Shape,
    Size,
    Texture,
    Line,
    Text,
}

impl Channel {
    pub const ALL: [Self; 6] = [
        Self::Color,
        Self::Shape,
        Self::Size,
        Self::Texture,
        Self::Line,
        Self::Text,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Circle,
    Square,
    Triangle,
    Diamond,
    Cross,
    Star,
}

impl ShapeKind {
    pub const ALL: [Self; 6] = [
        Self::Circle,
        Self::Square,
        Self::Triangle,
        Self::Diamond,
        Self::Cross,
        Self::Star,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureKind {
    Solid,
    Hatch,
    CrossHatch,
    Dots,
    Diagonal,
}

impl TextureKind {
    pub const ALL: [Self; 5] = [
        Self::Solid,
        Self::Hatch,
        Self::CrossHatch,
        Self::Dots,
        Self::Diagonal,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LineStyle {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
}

impl LineStyle {
    pub const ALL: [Self; 4] = [Self::Solid, Self::Dash, Self::Dot, Self::DashDot];
}

/// Visual value produced by a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VisualValue {
    Color(Color),
    Shape(ShapeKind),
    Size(f64),
    Texture(TextureKind),
    Line(LineStyle),
    Text(String),
}

impl VisualValue {
    #[must_use]
    pub fn channel(&self) -> Channel {
        match self {
            Self::Color(_) => Channel::Color,
            Self::Shape(_) => Channel::Shape,
            Self::Size(_) => Channel::Size,
            Self::Texture(_) => Channel::Texture,
            Self::Line(_) => Channel::Line,
            Self::Text(_) => Channel::Text,
        }
    }

    #[must_use]
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(color) => Some(*color),
            _ => None,
        }
    }

    /// Interpolates between two values of the same kind. Discrete kinds
    /// switch at the midpoint.
    fn blend(&self, other: &Self, t: f64) -> Self {
        match (self, other) {
            (Self::Color(a), Self::Color(b)) => Self::Color(a.lerp(*b, t)),
            (Self::Size(a), Self::Size(b)) => Self::Size(a + (b - a) * t.clamp(0.0, 1.0)),
            _ if t < 0.5 => self.clone(),
            _ => other.clone(),
        }
    }
}

/// Comparison applied by a highlight rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HighlightCondition {
    Eq(Value),
    Ne(Value),
    Gt(f64),
    Ge(f64),
    Lt(f64),
    Le(f64),
    Between(f64, f64),
    OneOf(Vec<Value>),
}

impl HighlightCondition {
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        let number = value.as_position();
        match self {
            Self::Eq(expected) => {
                compare_values(value, expected).is_eq() || value.label() == expected.label()
            }
            Self::Ne(expected) => {
                !(compare_values(value, expected).is_eq() || value.label() == expected.label())
            }
            Self::Gt(limit) => number.is_some_and(|n| n > *limit),
            Self::Ge(limit) => number.is_some_and(|n| n >= *limit),
            Self::Lt(limit) => number.is_some_and(|n| n < *limit),
            Self::Le(limit) => number.is_some_and(|n| n <= *limit),
            Self::Between(low, high) => number.is_some_and(|n| n >= *low && n <= *high),
            Self::OneOf(values) => {
                let label = value.label();
                values.iter().any(|candidate| candidate.label() == label)
            }
        }
    }
}

/// Named conditional override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRule {
    pub name: String,
    pub condition: HighlightCondition,
    pub value: VisualValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalFrame {
    pub channel: Channel,
    pub field: String,
    /// Value label to visual value, in category order.
    pub mapping: IndexMap<String, VisualValue>,
    pub fallback: VisualValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFrame {
    pub channel: Channel,
    pub field: String,
    pub domain: (f64, f64),
    pub low: VisualValue,
    pub high: VisualValue,
}

/// Text labels taken from a field (value labels).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelFrame {
    /// `None` labels each element with the measure being evaluated.
    pub field: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightFrame {
    pub channel: Channel,
    /// Field inspected by the rules; `None` means the evaluated measure.
    pub field: Option<String>,
    pub rules: Vec<HighlightRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrushRole {
    /// Accent over the brushed subset.
    Highlight,
    /// Gray over the unbrushed shadow series.
    Dim,
}

/// Static brushing layer restricted to a row range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushFrame {
    pub role: BrushRole,
    pub value: VisualValue,
    pub rows: Range<usize>,
}

/// Layers evaluated first to last; the last layer is the base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeFrame {
    pub layers: Vec<Arc<Frame>>,
}

/// One sub-frame per measure of a multi-measure element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedMeasuresFrame {
    pub channel: Channel,
    pub frames: IndexMap<String, Arc<Frame>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    Static { channel: Channel, value: VisualValue },
    Categorical(CategoricalFrame),
    Linear(LinearFrame),
    Label(LabelFrame),
    Highlight(HighlightFrame),
    Brush(BrushFrame),
    Composite(CompositeFrame),
    StackedMeasures(StackedMeasuresFrame),
}

impl Frame {
    #[must_use]
    pub fn constant(value: VisualValue) -> Self {
        Self::Static {
            channel: value.channel(),
            value,
        }
    }

    #[must_use]
    pub fn channel(&self) -> Channel {
        match self {
            Self::Static { channel, .. } => *channel,
            Self::Categorical(frame) => frame.channel,
            Self::Linear(frame) => frame.channel,
            Self::Label(_) => Channel::Text,
            Self::Highlight(frame) => frame.channel,
            Self::Brush(frame) => frame.value.channel(),
            Self::Composite(frame) => frame
                .layers
                .last()
                .map_or(Channel::Color, |layer| layer.channel()),
            Self::StackedMeasures(frame) => frame.channel,
        }
    }

    /// Field a legend for this frame describes. Composites report their base.
    #[must_use]
    pub fn legend_field(&self) -> Option<&str> {
        match self {
            Self::Categorical(frame) => Some(&frame.field),
            Self::Linear(frame) => Some(&frame.field),
            Self::Composite(frame) => frame.layers.last().and_then(|layer| layer.legend_field()),
            Self::Static { .. }
            | Self::Label(_)
            | Self::Highlight(_)
            | Self::Brush(_)
            | Self::StackedMeasures(_) => None,
        }
    }

    /// Every field bound anywhere in this frame, in layer order.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, fields: &mut Vec<String>) {
        match self {
            Self::Categorical(frame) => fields.push(frame.field.clone()),
            Self::Linear(frame) => fields.push(frame.field.clone()),
            Self::Label(frame) => fields.extend(frame.field.clone()),
            Self::Highlight(frame) => fields.extend(frame.field.clone()),
            Self::Composite(frame) => {
                for layer in &frame.layers {
                    layer.collect_fields(fields);
                }
            }
            Self::StackedMeasures(frame) => {
                for sub in frame.frames.values() {
                    sub.collect_fields(fields);
                }
            }
            Self::Static { .. } | Self::Brush(_) => {}
        }
    }

    /// Layers of a composite, outermost first; a plain frame is its own layer.
    #[must_use]
    pub fn layers(&self) -> Vec<&Frame> {
        match self {
            Self::Composite(frame) => frame.layers.iter().map(AsRef::as_ref).collect(),
            other => vec![other],
        }
    }

    /// Visual value for one row. `measure` is the measure field the element
    /// is drawing at this point, used by stacked and measure-relative frames.
    #[must_use]
    pub fn evaluate(
        &self,
        source: &dyn DataSource,
        row: usize,
        measure: Option<&str>,
    ) -> Option<VisualValue> {
        match self {
            Self::Static { value, .. } => Some(value.clone()),
            Self::Categorical(frame) => {
                let label = field_value(source, &frame.field, row)?.label();
                Some(
                    frame
                        .mapping
                        .get(&label)
                        .cloned()
                        .unwrap_or_else(|| frame.fallback.clone()),
                )
            }
            Self::Linear(frame) => {
                let value = field_value(source, &frame.field, row)?.as_position()?;
                let (low, high) = frame.domain;
                let t = if high == low {
                    0.0
                } else {
                    (value - low) / (high - low)
                };
                Some(frame.low.blend(&frame.high, t))
            }
            Self::Label(frame) => {
                let field = frame.field.as_deref().or(measure)?;
                let value = field_value(source, field, row)?;
                (!value.is_null()).then(|| VisualValue::Text(value.label()))
            }
            Self::Highlight(frame) => {
                let field = frame.field.as_deref().or(measure)?;
                let value = field_value(source, field, row)?;
                frame
                    .rules
                    .iter()
                    .find(|rule| rule.condition.matches(&value))
                    .map(|rule| rule.value.clone())
            }
            Self::Brush(frame) => frame.rows.contains(&row).then(|| frame.value.clone()),
            Self::Composite(frame) => frame
                .layers
                .iter()
                .find_map(|layer| layer.evaluate(source, row, measure)),
            Self::StackedMeasures(frame) => frame
                .frames
                .get(measure?)
                .and_then(|sub| sub.evaluate(source, row, measure)),
        }
    }
}

fn field_value(source: &dyn DataSource, field: &str, row: usize) -> Option<Value> {
    source.find_column(field).map(|col| source.value(col, row))
}

#[cfg(test)]
mod tests {
    use super::{HighlightCondition, VisualValue};
    use crate::core::{Color, Value};

    #[test]
    fn between_is_inclusive() {
        let condition = HighlightCondition::Between(1.0, 3.0);
        assert!(condition.matches(&Value::Double(1.0)));
        assert!(condition.matches(&Value::Integer(3)));
        assert!(!condition.matches(&Value::Double(3.5)));
        assert!(!condition.matches(&Value::Null));
    }

    #[test]
    fn one_of_compares_labels() {
        let condition = HighlightCondition::OneOf(vec![Value::from("East"), Value::Integer(2)]);
        assert!(condition.matches(&Value::from("East")));
        assert!(condition.matches(&Value::Integer(2)));
        assert!(!condition.matches(&Value::from("West")));
    }

    #[test]
    fn size_blend_interpolates() {
        let blended = VisualValue::Size(2.0).blend(&VisualValue::Size(4.0), 0.5);
        assert_eq!(blended, VisualValue::Size(3.0));
        let color = VisualValue::Color(Color::BLACK).blend(&VisualValue::Color(Color::BLACK), 0.3);
        assert_eq!(color.as_color(), Some(Color::BLACK));
    }
}
