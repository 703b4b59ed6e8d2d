use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{Channel, ChartType, CollisionPolicy, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaKind {
    BoxPlot,
    Stock,
    Candle,
}

/// Geometric primitive of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Geometry {
    Point,
    Line,
    Area,
    Interval,
    Polygon,
    Schema(SchemaKind),
    Tree,
    Relation,
    /// Density contour over two continuous fields.
    Contour,
}

/// How consecutive line/area points connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineShape {
    #[default]
    Straight,
    Step,
    Jump,
}

/// Purpose of an element within its chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ElementRole {
    #[default]
    Primary,
    /// Secondary geometry drawn over the primary (pareto line, point-on-line).
    Overlay,
    /// Box-plot outlier points.
    Outlier,
    /// Gantt milestone markers.
    Milestone,
    /// Sparkline end marker.
    Endpoint,
    /// Invisible waterfall base.
    Support,
    /// Donut center total label.
    CenterTotal,
    /// Unbrushed "all data" copy of a primary element.
    Shadow,
}

/// Up to six aesthetic frames; frames may be shared with other elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementFrames {
    pub color: Option<Arc<Frame>>,
    pub shape: Option<Arc<Frame>>,
    pub size: Option<Arc<Frame>>,
    pub texture: Option<Arc<Frame>>,
    pub line: Option<Arc<Frame>>,
    pub text: Option<Arc<Frame>>,
}

impl ElementFrames {
    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&Arc<Frame>> {
        match channel {
            Channel::Color => self.color.as_ref(),
            Channel::Shape => self.shape.as_ref(),
            Channel::Size => self.size.as_ref(),
            Channel::Texture => self.texture.as_ref(),
            Channel::Line => self.line.as_ref(),
            Channel::Text => self.text.as_ref(),
        }
    }

    pub fn set(&mut self, channel: Channel, frame: Option<Arc<Frame>>) {
        let slot = match channel {
            Channel::Color => &mut self.color,
            Channel::Shape => &mut self.shape,
            Channel::Size => &mut self.size,
            Channel::Texture => &mut self.texture,
            Channel::Line => &mut self.line,
            Channel::Text => &mut self.text,
        };
        *slot = frame;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &Arc<Frame>)> {
        Channel::ALL
            .into_iter()
            .filter_map(|channel| self.get(channel).map(|frame| (channel, frame)))
    }
}

/// One geometric element of the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub geometry: Geometry,
    pub chart_type: ChartType,
    pub role: ElementRole,
    /// Ordering dimensions, outer to inner.
    pub dimensions: Vec<String>,
    /// Value fields drawn by this element.
    pub values: Vec<String>,
    pub frames: ElementFrames,
    pub collision: CollisionPolicy,
    /// Rows of the graph data this element draws; `None` means all rows.
    pub row_range: Option<Range<usize>>,
    pub line_shape: LineShape,
    pub filled: bool,
    pub depth: bool,
    pub visible: bool,
    /// Whether frames of this element may produce legend entries.
    pub legend: bool,
    /// Inner coordinate index for separated layouts.
    pub pane: usize,
}

impl Element {
    #[must_use]
    pub fn new(geometry: Geometry, chart_type: ChartType) -> Self {
        Self {
            geometry,
            chart_type,
            role: ElementRole::Primary,
            dimensions: Vec::new(),
            values: Vec::new(),
            frames: ElementFrames::default(),
            collision: CollisionPolicy::None,
            row_range: None,
            line_shape: LineShape::Straight,
            filled: false,
            depth: false,
            visible: true,
            legend: true,
            pane: 0,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: ElementRole) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn frame(&self, channel: Channel) -> Option<&Arc<Frame>> {
        self.frames.get(channel)
    }
}
