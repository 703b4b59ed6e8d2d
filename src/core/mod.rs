pub mod chart_type;
pub mod color;
pub mod coord;
pub mod element;
pub mod frame;
pub mod graph;
pub mod primitives;
pub mod scale;
pub mod types;

pub use chart_type::{
    ChartFamily, ChartType, CollisionPolicy, HighlightTarget, ScaleRangeRule, SizeDefault,
};
pub use color::{Color, default_palette};
pub use coord::{
    AxisVisual, Coordinate, FacetCoord, FacetNesting, GeoCoord, PolarCoord, PolarProjection,
    RectCoord, grid_visible,
};
pub use element::{Element, ElementFrames, ElementRole, Geometry, LineShape, SchemaKind};
pub use frame::{
    BrushFrame, BrushRole, CategoricalFrame, Channel, CompositeFrame, Frame, HighlightCondition,
    HighlightFrame, HighlightRule, LabelFrame, LineStyle, LinearFrame, ShapeKind,
    StackedMeasuresFrame, TextureKind, VisualValue,
};
pub use graph::{
    Axis, AxisTitles, Decoration, ElementGraph, GeneratorKind, LegendPosition, LegendSpec,
    TargetLine, TargetStrategy, TrendFit, TrendLine,
};
pub use scale::{
    BrushRange, LinearScale, ParetoRange, Scale, ScaleDomain, ScaleId, ScaleKind, ScaleRange,
    ScaleSet, StackRange,
};
pub use types::{DataType, DateGranularity, DateGroup, DatePart, Value};
