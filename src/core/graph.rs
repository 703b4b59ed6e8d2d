use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{
    Channel, ChartType, Color, Coordinate, Element, ElementRole, Frame, LineStyle, ScaleId,
    ScaleSet,
};
use crate::dataset::{DataSource, require_column};
use crate::error::{ChartError, ChartResult};

/// Generator variant that produced a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneratorKind {
    Merged,
    Separated,
    Radar,
    Stock,
    Candle,
    Map,
    Gantt,
    Hierarchy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

/// Regression family used for trend lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrendFit {
    #[default]
    Linear,
    Exponential,
    Logarithmic,
    Power,
}

/// Fitted trend for one measure (and optionally one color group).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub measure: String,
    /// Continuous x field; `None` fits against row order.
    pub x_field: Option<String>,
    pub fit: TrendFit,
    pub intercept: f64,
    pub slope: f64,
    pub color: Color,
    pub line: LineStyle,
    /// Color-group label when trends are split per color.
    pub group: Option<String>,
    pub pane: usize,
}

impl TrendLine {
    /// Fitted value at `x`, `None` outside the fit's domain.
    #[must_use]
    pub fn predict(&self, x: f64) -> Option<f64> {
        let y = match self.fit {
            TrendFit::Linear => self.intercept + self.slope * x,
            TrendFit::Exponential => self.intercept.exp() * (self.slope * x).exp(),
            TrendFit::Logarithmic if x > 0.0 => self.intercept + self.slope * x.ln(),
            TrendFit::Power if x > 0.0 => self.intercept.exp() * x.powf(self.slope),
            TrendFit::Logarithmic | TrendFit::Power => return None,
        };
        y.is_finite().then_some(y)
    }
}

/// How a target line derives its value from the data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TargetStrategy {
    Fixed(f64),
    Average,
    Min,
    Max,
    Median,
    Percentile(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetLine {
    pub measure: String,
    pub strategy: TargetStrategy,
    pub value: f64,
    pub label: Option<String>,
    pub color: Color,
}

/// Graph-level decoration independent of element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decoration {
    GridLines { x: bool, y: bool },
    /// Reference lines through the domain midpoints of both value axes.
    QuadrantLines { x: f64, y: f64 },
    DiagonalLine { x_scale: ScaleId, y_scale: ScaleId },
    Trend(TrendLine),
    Target(TargetLine),
    Banding { axis: Axis, colors: Vec<Color> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LegendPosition {
    #[default]
    Right,
    Left,
    Top,
    Bottom,
}

/// One legend, unique per (channel, field).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendSpec {
    pub channel: Channel,
    pub field: String,
    pub title: String,
    pub position: LegendPosition,
    pub frame: Arc<Frame>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisTitles {
    pub x: Option<String>,
    pub y: Option<String>,
}

/// Resolved output of one generation request.
///
/// Owns the wrapped data source the elements index into and the scale arena
/// their fields resolve through.
pub struct ElementGraph {
    pub kind: GeneratorKind,
    pub chart_type: ChartType,
    pub coordinate: Coordinate,
    pub elements: Vec<Element>,
    pub scales: ScaleSet,
    pub legends: Vec<LegendSpec>,
    pub decorations: Vec<Decoration>,
    pub titles: AxisTitles,
    data: Arc<dyn DataSource>,
}

impl fmt::Debug for ElementGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementGraph")
            .field("kind", &self.kind)
            .field("chart_type", &self.chart_type)
            .field("coordinate", &self.coordinate)
            .field("elements", &self.elements.len())
            .field("scales", &self.scales.len())
            .field("legends", &self.legends.len())
            .field("decorations", &self.decorations.len())
            .field("rows", &self.data.row_count())
            .finish()
    }
}

impl ElementGraph {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        kind: GeneratorKind,
        chart_type: ChartType,
        coordinate: Coordinate,
        elements: Vec<Element>,
        scales: ScaleSet,
        legends: Vec<LegendSpec>,
        decorations: Vec<Decoration>,
        titles: AxisTitles,
        data: Arc<dyn DataSource>,
    ) -> Self {
        Self {
            kind,
            chart_type,
            coordinate,
            elements,
            scales,
            legends,
            decorations,
            titles,
            data,
        }
    }

    /// The final wrapped data source elements index into.
    #[must_use]
    pub fn data(&self) -> &Arc<dyn DataSource> {
        &self.data
    }

    pub fn elements_with_role(&self, role: ElementRole) -> impl Iterator<Item = &Element> {
        self.elements
            .iter()
            .filter(move |element| element.role == role)
    }

    #[must_use]
    pub fn legend(&self, channel: Channel, field: &str) -> Option<&LegendSpec> {
        self.legends
            .iter()
            .find(|legend| legend.channel == channel && legend.field == field)
    }

    #[must_use]
    pub fn pane_count(&self) -> usize {
        match (&self.kind, &self.coordinate) {
            (GeneratorKind::Separated, Coordinate::Facet(facet)) => facet.inners.len(),
            _ => 1,
        }
    }

    /// Checks internal consistency: scale ids resolve, element fields exist
    /// in the data, row ranges and panes are in bounds.
    pub fn validate(&self) -> ChartResult<()> {
        for id in self.coordinate.scale_ids() {
            if self.scales.get(id).is_none() {
                return Err(ChartError::InvalidData(format!(
                    "coordinate references unknown scale {}",
                    id.index()
                )));
            }
        }

        let rows = self.data.row_count();
        let panes = self.pane_count();
        for element in &self.elements {
            for field in element.dimensions.iter().chain(&element.values) {
                require_column(&*self.data, field)?;
            }
            if let Some(range) = &element.row_range {
                if range.start > range.end || range.end > rows {
                    return Err(ChartError::InvalidData(format!(
                        "element row range {}..{} exceeds {rows} rows",
                        range.start, range.end
                    )));
                }
            }
            if element.pane >= panes {
                return Err(ChartError::InvalidData(format!(
                    "element pane {} exceeds {panes} panes",
                    element.pane
                )));
            }
        }
        Ok(())
    }
}
