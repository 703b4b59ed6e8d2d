pub mod binding;
pub mod decompose;
pub mod dispatch;
pub mod palette_cache;
pub mod style;
pub mod validation;

mod context;
mod coord_builder;
mod decorations;
mod element_builder;
mod frame_resolver;
mod generator;
mod scale_builder;

pub use binding::{
    Aggregate, AestheticRef, Aesthetics, Calculator, ChartBinding, DimensionRef, FieldRef,
    GeoBinding, HighlightDef, IntervalBinding, MeasureRef, OhlcBinding, RelationBinding,
};
pub use decompose::{Decomposition, FAKE_MEASURE, FakeMeasure, FakePlacement};
pub use dispatch::select_generator;
pub use generator::{ChartGenerator, GenerateRequest};
pub use palette_cache::{Palette, PaletteCache};
pub use style::{
    AxisDescriptor, BandingDescriptor, BrushStyle, ChannelLegend, LegendDescriptor, PlotOptions,
    STYLE_JSON_SCHEMA_V1, StyleDescriptor, StyleDescriptorJsonContractV1, TargetDef, TrendStyle,
};
pub use validation::{resolve_chart_type, validate_binding};
