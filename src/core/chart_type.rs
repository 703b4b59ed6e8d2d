use serde::{Deserialize, Serialize};

/// Chart type requested globally or per measure.
///
/// Every decision that depends on the chart type is an exhaustive `match`
/// over this enum, so adding a variant forces each decision point to be
/// revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ChartType {
    /// Resolved from the binding shape before generation.
    #[default]
    Auto,
    Bar,
    Bar3D,
    StackBar,
    StackBar3D,
    Funnel,
    Marimekko,
    Line,
    StepLine,
    JumpLine,
    StackLine,
    Area,
    StepArea,
    StackArea,
    Point,
    StackPoint,
    DotPlot,
    Pie,
    Pie3D,
    Donut,
    Radar,
    FilledRadar,
    Stock,
    Candle,
    BoxPlot,
    Waterfall,
    Pareto,
    Map,
    MapContour,
    ScatterContour,
    Interval,
    Gantt,
    Treemap,
    Sunburst,
    Icicle,
    CirclePacking,
    Tree,
    Network,
}

/// Group of chart types that may share one element graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartFamily {
    Cartesian,
    Funnel,
    Marimekko,
    Pie,
    Radar,
    Stock,
    Candle,
    BoxPlot,
    Waterfall,
    Pareto,
    Map,
    Contour,
    Gantt,
    Hierarchy,
    Relation,
}

/// How the value scale of a chart type combines the fields it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleRangeRule {
    Plain,
    Stack {
        /// Accumulate absolute values (pie slices).
        absolute: bool,
        /// Stack negatives separately below zero.
        negative_grouping: bool,
    },
    Pareto,
}

/// Element collision policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CollisionPolicy {
    #[default]
    None,
    Stack,
    MoveCenter,
    MoveMiddle,
}

/// Default size of the size channel, preserved as literal per-type constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeDefault {
    pub size: f64,
    pub min: f64,
    pub max: f64,
}

impl SizeDefault {
    const fn new(size: f64, min: f64, max: f64) -> Self {
        Self { size, min, max }
    }
}

/// Which field a highlight rule inspects for a chart type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HighlightTarget {
    /// The element's own measure value.
    Measure,
    /// The synthesized median column of a box plot.
    Median,
    /// The close value of a stock/candle schema.
    Close,
    /// The innermost dimension (node/region charts without magnitude).
    Dimension,
}

impl ChartType {
    #[must_use]
    pub fn family(self) -> ChartFamily {
        match self {
            Self::Auto
            | Self::Bar
            | Self::Bar3D
            | Self::StackBar
            | Self::StackBar3D
            | Self::Line
            | Self::StepLine
            | Self::JumpLine
            | Self::StackLine
            | Self::Area
            | Self::StepArea
            | Self::StackArea
            | Self::Point
            | Self::StackPoint
            | Self::DotPlot
            | Self::Interval => ChartFamily::Cartesian,
            Self::Funnel => ChartFamily::Funnel,
            Self::Marimekko => ChartFamily::Marimekko,
            Self::Pie | Self::Pie3D | Self::Donut => ChartFamily::Pie,
            Self::Radar | Self::FilledRadar => ChartFamily::Radar,
            Self::Stock => ChartFamily::Stock,
            Self::Candle => ChartFamily::Candle,
            Self::BoxPlot => ChartFamily::BoxPlot,
            Self::Waterfall => ChartFamily::Waterfall,
            Self::Pareto => ChartFamily::Pareto,
            Self::Map => ChartFamily::Map,
            Self::MapContour | Self::ScatterContour => ChartFamily::Contour,
            Self::Gantt => ChartFamily::Gantt,
            Self::Treemap | Self::Sunburst | Self::Icicle | Self::CirclePacking => {
                ChartFamily::Hierarchy
            }
            Self::Tree | Self::Network => ChartFamily::Relation,
        }
    }

    /// Two types are compatible when they belong to the same family.
    #[must_use]
    pub fn is_compatible(self, other: Self) -> bool {
        self.family() == other.family()
    }

    /// Resolves `Auto`; other types are returned unchanged.
    #[must_use]
    pub fn resolve_auto(self, measures_on_both_axes: bool) -> Self {
        match self {
            Self::Auto if measures_on_both_axes => Self::Point,
            Self::Auto => Self::Bar,
            other => other,
        }
    }

    #[must_use]
    pub fn is_stacked(self) -> bool {
        matches!(self.scale_range_rule(), ScaleRangeRule::Stack { .. })
    }

    #[must_use]
    pub fn is_polar(self) -> bool {
        matches!(
            self,
            Self::Pie | Self::Pie3D | Self::Donut | Self::Radar | Self::FilledRadar
        )
    }

    #[must_use]
    pub fn is_3d(self) -> bool {
        matches!(self, Self::Bar3D | Self::StackBar3D | Self::Pie3D)
    }

    #[must_use]
    pub fn is_geo(self) -> bool {
        matches!(self, Self::Map | Self::MapContour)
    }

    #[must_use]
    pub fn is_bar_like(self) -> bool {
        matches!(
            self,
            Self::Bar
                | Self::Bar3D
                | Self::StackBar
                | Self::StackBar3D
                | Self::Funnel
                | Self::Marimekko
                | Self::Waterfall
                | Self::Pareto
                | Self::Interval
                | Self::Gantt
        )
    }

    #[must_use]
    pub fn is_line_like(self) -> bool {
        matches!(
            self,
            Self::Line | Self::StepLine | Self::JumpLine | Self::StackLine | Self::Radar
        )
    }

    #[must_use]
    pub fn is_contour(self) -> bool {
        self.family() == ChartFamily::Contour
    }

    /// Whether measures on both axes can be plotted against each other.
    #[must_use]
    pub fn supports_xy_measures(self) -> bool {
        matches!(
            self,
            Self::Auto
                | Self::Point
                | Self::Line
                | Self::StepLine
                | Self::JumpLine
                | Self::ScatterContour
        )
    }

    /// Upper bound on bound measures, if the family caps it.
    #[must_use]
    pub fn max_measures(self) -> Option<usize> {
        match self {
            Self::Waterfall | Self::Marimekko | Self::Funnel => Some(1),
            _ => None,
        }
    }

    /// Whether a dimension-only binding needs a synthetic magnitude.
    #[must_use]
    pub fn requires_magnitude(self) -> bool {
        !matches!(self, Self::Tree | Self::Network | Self::Map)
    }

    /// Value of the synthetic measure injected for dimension-only bindings.
    ///
    /// Dot plots stack marks from zero, so a non-zero constant would imply a
    /// bogus baseline; everything else uses 1 so marks stay visible.
    #[must_use]
    pub fn fake_value(self) -> f64 {
        match self {
            Self::DotPlot => 0.0,
            _ => 1.0,
        }
    }

    #[must_use]
    pub fn scale_range_rule(self) -> ScaleRangeRule {
        match self {
            Self::StackBar
            | Self::StackBar3D
            | Self::StackLine
            | Self::StackArea
            | Self::StackPoint
            | Self::Marimekko => ScaleRangeRule::Stack {
                absolute: false,
                negative_grouping: true,
            },
            Self::Pie | Self::Pie3D | Self::Donut => ScaleRangeRule::Stack {
                absolute: true,
                negative_grouping: true,
            },
            Self::Waterfall => ScaleRangeRule::Stack {
                absolute: false,
                negative_grouping: false,
            },
            Self::Pareto => ScaleRangeRule::Pareto,
            Self::Auto
            | Self::Bar
            | Self::Bar3D
            | Self::Funnel
            | Self::Line
            | Self::StepLine
            | Self::JumpLine
            | Self::Area
            | Self::StepArea
            | Self::Point
            | Self::DotPlot
            | Self::Radar
            | Self::FilledRadar
            | Self::Stock
            | Self::Candle
            | Self::BoxPlot
            | Self::Map
            | Self::MapContour
            | Self::ScatterContour
            | Self::Interval
            | Self::Gantt
            | Self::Treemap
            | Self::Sunburst
            | Self::Icicle
            | Self::CirclePacking
            | Self::Tree
            | Self::Network => ScaleRangeRule::Plain,
        }
    }

    #[must_use]
    pub fn default_size(self) -> SizeDefault {
        match self {
            Self::Auto
            | Self::Bar
            | Self::Bar3D
            | Self::StackBar
            | Self::StackBar3D
            | Self::Funnel
            | Self::Marimekko
            | Self::Waterfall
            | Self::Pareto
            | Self::Interval
            | Self::Gantt
            | Self::BoxPlot
            | Self::Stock
            | Self::Candle => SizeDefault::new(15.0, 1.0, 30.0),
            Self::Line
            | Self::StepLine
            | Self::JumpLine
            | Self::StackLine
            | Self::Area
            | Self::StepArea
            | Self::StackArea
            | Self::Radar
            | Self::FilledRadar => SizeDefault::new(1.0, 1.0, 10.0),
            Self::Point
            | Self::StackPoint
            | Self::ScatterContour
            | Self::Map
            | Self::MapContour
            | Self::Tree
            | Self::Network => SizeDefault::new(3.0, 1.0, 30.0),
            Self::DotPlot => SizeDefault::new(1.0, 1.0, 3.0),
            Self::Pie
            | Self::Pie3D
            | Self::Donut
            | Self::Treemap
            | Self::Sunburst
            | Self::Icicle
            | Self::CirclePacking => SizeDefault::new(30.0, 1.0, 30.0),
        }
    }

    #[must_use]
    pub fn highlight_target(self) -> HighlightTarget {
        match self {
            Self::BoxPlot => HighlightTarget::Median,
            Self::Stock | Self::Candle => HighlightTarget::Close,
            Self::Tree | Self::Network | Self::Map => HighlightTarget::Dimension,
            Self::Auto
            | Self::Bar
            | Self::Bar3D
            | Self::StackBar
            | Self::StackBar3D
            | Self::Funnel
            | Self::Marimekko
            | Self::Line
            | Self::StepLine
            | Self::JumpLine
            | Self::StackLine
            | Self::Area
            | Self::StepArea
            | Self::StackArea
            | Self::Point
            | Self::StackPoint
            | Self::DotPlot
            | Self::Pie
            | Self::Pie3D
            | Self::Donut
            | Self::Radar
            | Self::FilledRadar
            | Self::Waterfall
            | Self::Pareto
            | Self::MapContour
            | Self::ScatterContour
            | Self::Interval
            | Self::Gantt
            | Self::Treemap
            | Self::Sunburst
            | Self::Icicle
            | Self::CirclePacking => HighlightTarget::Measure,
        }
    }

    /// Collision policy for the primary element of this type.
    ///
    /// `grouped` is true when an aesthetic dimension splits the element into
    /// several series sharing one position.
    #[must_use]
    pub fn collision(self, grouped: bool) -> CollisionPolicy {
        match self {
            Self::StackBar
            | Self::StackBar3D
            | Self::StackLine
            | Self::StackArea
            | Self::StackPoint
            | Self::Marimekko
            | Self::Pie
            | Self::Pie3D
            | Self::Donut
            | Self::Waterfall
            | Self::Pareto
            | Self::Treemap
            | Self::Sunburst
            | Self::Icicle
            | Self::CirclePacking => CollisionPolicy::Stack,
            Self::Auto | Self::Bar | Self::Bar3D | Self::BoxPlot | Self::Interval if grouped => {
                CollisionPolicy::MoveCenter
            }
            Self::Funnel | Self::DotPlot => CollisionPolicy::MoveMiddle,
            Self::Auto
            | Self::Bar
            | Self::Bar3D
            | Self::BoxPlot
            | Self::Interval
            | Self::Line
            | Self::StepLine
            | Self::JumpLine
            | Self::Area
            | Self::StepArea
            | Self::Point
            | Self::Radar
            | Self::FilledRadar
            | Self::Stock
            | Self::Candle
            | Self::Map
            | Self::MapContour
            | Self::ScatterContour
            | Self::Gantt
            | Self::Tree
            | Self::Network => CollisionPolicy::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChartFamily, ChartType, CollisionPolicy, ScaleRangeRule};

    #[test]
    fn cartesian_types_are_mutually_compatible() {
        assert!(ChartType::Bar.is_compatible(ChartType::Line));
        assert!(ChartType::StackArea.is_compatible(ChartType::Point));
        assert!(!ChartType::Pie.is_compatible(ChartType::Line));
        assert_eq!(ChartType::Donut.family(), ChartFamily::Pie);
    }

    #[test]
    fn waterfall_stacks_without_negative_grouping() {
        assert_eq!(
            ChartType::Waterfall.scale_range_rule(),
            ScaleRangeRule::Stack {
                absolute: false,
                negative_grouping: false
            }
        );
        assert!(ChartType::Pie.is_stacked());
        assert!(!ChartType::Pareto.is_stacked());
    }

    #[test]
    fn size_table_keeps_literal_defaults() {
        assert_eq!(ChartType::Bar.default_size().size, 15.0);
        assert_eq!(ChartType::Point.default_size().size, 3.0);
        assert_eq!(ChartType::DotPlot.default_size().size, 1.0);
        assert_eq!(ChartType::Treemap.default_size().size, 30.0);
    }

    #[test]
    fn grouped_bars_dodge_and_scatter_overlaps() {
        assert_eq!(ChartType::Bar.collision(true), CollisionPolicy::MoveCenter);
        assert_eq!(ChartType::Bar.collision(false), CollisionPolicy::None);
        assert_eq!(ChartType::Point.collision(true), CollisionPolicy::None);
        assert_eq!(ChartType::StackBar.collision(false), CollisionPolicy::Stack);
    }

    #[test]
    fn dot_plot_fake_value_is_zero() {
        assert_eq!(ChartType::DotPlot.fake_value(), 0.0);
        assert_eq!(ChartType::Bar.fake_value(), 1.0);
    }
}
