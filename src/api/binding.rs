use serde::{Deserialize, Serialize};

use crate::core::{
    Channel, ChartType, DataType, DateGranularity, DateGroup, HighlightCondition, VisualValue,
};

/// Aggregation applied by the query layer that produced a measure column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Aggregate {
    /// Detail values; the column header is the bare column name.
    None,
    #[default]
    Sum,
    Count,
    DistinctCount,
    Average,
    Min,
    Max,
    Median,
}

impl Aggregate {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Sum => "Sum",
            Self::Count => "Count",
            Self::DistinctCount => "DistinctCount",
            Self::Average => "Avg",
            Self::Min => "Min",
            Self::Max => "Max",
            Self::Median => "Median",
        }
    }

    /// Sums of parts are parts of sums; missing buckets mean zero.
    #[must_use]
    pub fn is_additive(self) -> bool {
        matches!(self, Self::Sum | Self::Count | Self::DistinctCount)
    }

    /// Aggregates that keep the column's own value domain.
    #[must_use]
    pub fn preserves_type(self) -> bool {
        matches!(self, Self::None | Self::Min | Self::Max)
    }
}

/// Post-aggregation calculation computed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Calculator {
    RunningTotal {
        #[serde(default)]
        reset_on: Option<String>,
    },
    PercentOfTotal,
}

impl Calculator {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RunningTotal { .. } => "RunningTotal",
            Self::PercentOfTotal => "PercentOfTotal",
        }
    }
}

/// Grouping column reference.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionRef {
    pub column: String,
    pub label: Option<String>,
    pub date_group: DateGroup,
    /// Dates form a continuous series and may be gap filled.
    pub time_series: bool,
    /// Column comes from a cube (pre-grouped) source.
    pub cube: bool,
    /// Column folds small groups into an "others" bucket.
    pub grouped_other: bool,
    /// Explicit category order, overriding the source comparator.
    pub manual_order: Option<Vec<String>>,
}

impl DimensionRef {
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_date_group(mut self, date_group: DateGroup) -> Self {
        self.date_group = date_group;
        self
    }

    #[must_use]
    pub fn time_series(mut self) -> Self {
        self.time_series = true;
        self
    }

    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.column
    }

    #[must_use]
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.column)
    }

    /// Whether this dimension is a genuine time series given the column's
    /// declared type. Only such dimensions are gap filled.
    #[must_use]
    pub fn is_time_series(&self, data_type: DataType) -> bool {
        data_type.is_calendar()
            && self.time_series
            && !self.cube
            && !self.grouped_other
            && !matches!(self.date_group, DateGroup::Part(_))
    }

    /// Whether this dimension is drawn on a time scale rather than
    /// categorically: a time series at day granularity or finer.
    #[must_use]
    pub fn is_date_scaled(&self, data_type: DataType) -> bool {
        self.is_time_series(data_type)
            && match self.date_group {
                DateGroup::Raw => true,
                DateGroup::Level(granularity) => granularity >= DateGranularity::Day,
                DateGroup::Part(_) => false,
            }
    }
}

/// Aggregated value reference.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureRef {
    pub column: String,
    pub aggregate: Aggregate,
    pub label: Option<String>,
    /// Overrides the binding's chart type for this measure.
    pub chart_type: Option<ChartType>,
    /// Request a log axis for this measure.
    pub log: bool,
    pub calculator: Option<Calculator>,
    /// Frames taking precedence over the binding's global frames.
    pub aesthetics: Aesthetics,
}

impl MeasureRef {
    #[must_use]
    pub fn new(column: impl Into<String>, aggregate: Aggregate) -> Self {
        Self {
            column: column.into(),
            aggregate,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_chart_type(mut self, chart_type: ChartType) -> Self {
        self.chart_type = Some(chart_type);
        self
    }

    #[must_use]
    pub fn with_calculator(mut self, calculator: Calculator) -> Self {
        self.calculator = Some(calculator);
        self
    }

    /// Header of the aggregated column the query layer produces.
    #[must_use]
    pub fn aggregate_name(&self) -> String {
        match self.aggregate {
            Aggregate::None => self.column.clone(),
            aggregate => format!("{}({})", aggregate.code(), self.column),
        }
    }

    /// Field name this measure is drawn from, including any calculator.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.calculator {
            Some(calculator) => format!("{}({})", calculator.code(), self.aggregate_name()),
            None => self.aggregate_name(),
        }
    }

    #[must_use]
    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.full_name())
    }

    #[must_use]
    pub fn effective_type(&self, global: ChartType) -> ChartType {
        self.chart_type.unwrap_or(global)
    }
}

/// Either side of an axis reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldRef {
    Dimension(DimensionRef),
    Measure(MeasureRef),
}

impl FieldRef {
    #[must_use]
    pub fn dimension(column: impl Into<String>) -> Self {
        Self::Dimension(DimensionRef::new(column))
    }

    #[must_use]
    pub fn measure(column: impl Into<String>, aggregate: Aggregate) -> Self {
        Self::Measure(MeasureRef::new(column, aggregate))
    }

    #[must_use]
    pub fn as_measure(&self) -> Option<&MeasureRef> {
        match self {
            Self::Measure(measure) => Some(measure),
            Self::Dimension(_) => None,
        }
    }
}

/// Binding of one aesthetic channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AestheticRef {
    Dimension(DimensionRef),
    Measure(Box<MeasureRef>),
    Static(VisualValue),
}

impl AestheticRef {
    #[must_use]
    pub fn field_name(&self) -> Option<String> {
        match self {
            Self::Dimension(dimension) => Some(dimension.column.clone()),
            Self::Measure(measure) => Some(measure.full_name()),
            Self::Static(_) => None,
        }
    }

    #[must_use]
    pub fn is_measure(&self) -> bool {
        matches!(self, Self::Measure(_))
    }
}

/// Per-channel aesthetic bindings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Aesthetics {
    pub color: Option<AestheticRef>,
    pub shape: Option<AestheticRef>,
    pub size: Option<AestheticRef>,
    pub texture: Option<AestheticRef>,
    pub line: Option<AestheticRef>,
    pub text: Option<AestheticRef>,
}

impl Aesthetics {
    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&AestheticRef> {
        match channel {
            Channel::Color => self.color.as_ref(),
            Channel::Shape => self.shape.as_ref(),
            Channel::Size => self.size.as_ref(),
            Channel::Texture => self.texture.as_ref(),
            Channel::Line => self.line.as_ref(),
            Channel::Text => self.text.as_ref(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &AestheticRef)> {
        Channel::ALL
            .into_iter()
            .filter_map(|channel| self.get(channel).map(|aesthetic| (channel, aesthetic)))
    }

    /// Dimension columns bound to any channel, in channel order.
    #[must_use]
    pub fn dimensions(&self) -> Vec<&DimensionRef> {
        self.iter()
            .filter_map(|(_, aesthetic)| match aesthetic {
                AestheticRef::Dimension(dimension) => Some(dimension),
                _ => None,
            })
            .collect()
    }
}

/// Open/high/low/close measures of stock and candle charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcBinding {
    pub open: MeasureRef,
    pub high: MeasureRef,
    pub low: MeasureRef,
    pub close: MeasureRef,
}

impl OhlcBinding {
    #[must_use]
    pub fn measures(&self) -> [&MeasureRef; 4] {
        [&self.open, &self.high, &self.low, &self.close]
    }
}

/// Start/end pair of interval and gantt charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalBinding {
    pub start: MeasureRef,
    pub end: MeasureRef,
    #[serde(default)]
    pub milestone: Option<MeasureRef>,
}

/// Region and optional point coordinates of map charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoBinding {
    pub location: DimensionRef,
    #[serde(default)]
    pub longitude: Option<MeasureRef>,
    #[serde(default)]
    pub latitude: Option<MeasureRef>,
}

/// Node-link pair of tree and network charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationBinding {
    pub source: DimensionRef,
    pub target: DimensionRef,
}

/// User-defined highlight on the chart's highlight field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightDef {
    pub name: String,
    pub condition: HighlightCondition,
    pub value: VisualValue,
}

/// Declarative chart binding: which columns drive which roles.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartBinding {
    pub x: Vec<FieldRef>,
    pub y: Vec<FieldRef>,
    pub chart_type: ChartType,
    pub aesthetics: Aesthetics,
    /// Extra grouping that splits lines/areas without changing visuals.
    pub group: Option<DimensionRef>,
    /// Ordering of points along a line.
    pub path: Option<DimensionRef>,
    pub geo: Option<GeoBinding>,
    pub ohlc: Option<OhlcBinding>,
    pub interval: Option<IntervalBinding>,
    pub relation: Option<RelationBinding>,
    /// Draw one sub-graph per measure.
    pub separated: bool,
    pub highlights: Vec<HighlightDef>,
}

impl ChartBinding {
    #[must_use]
    pub fn new(chart_type: ChartType) -> Self {
        Self {
            chart_type,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_x(mut self, field: FieldRef) -> Self {
        self.x.push(field);
        self
    }

    #[must_use]
    pub fn with_y(mut self, field: FieldRef) -> Self {
        self.y.push(field);
        self
    }

    #[must_use]
    pub fn with_aesthetic(mut self, channel: Channel, aesthetic: AestheticRef) -> Self {
        let slot = match channel {
            Channel::Color => &mut self.aesthetics.color,
            Channel::Shape => &mut self.aesthetics.shape,
            Channel::Size => &mut self.aesthetics.size,
            Channel::Texture => &mut self.aesthetics.texture,
            Channel::Line => &mut self.aesthetics.line,
            Channel::Text => &mut self.aesthetics.text,
        };
        *slot = Some(aesthetic);
        self
    }

    pub fn x_measures(&self) -> impl Iterator<Item = &MeasureRef> {
        self.x.iter().filter_map(FieldRef::as_measure)
    }

    pub fn y_measures(&self) -> impl Iterator<Item = &MeasureRef> {
        self.y.iter().filter_map(FieldRef::as_measure)
    }

    /// Every measure bound on an axis or through a family binding.
    #[must_use]
    pub fn all_measures(&self) -> Vec<&MeasureRef> {
        let mut measures: Vec<&MeasureRef> = self.x_measures().chain(self.y_measures()).collect();
        if let Some(ohlc) = &self.ohlc {
            measures.extend(ohlc.measures());
        }
        if let Some(interval) = &self.interval {
            measures.push(&interval.start);
            measures.push(&interval.end);
            measures.extend(interval.milestone.as_ref());
        }
        measures
    }

    #[must_use]
    pub fn has_xy_measures(&self) -> bool {
        self.x_measures().next().is_some() && self.y_measures().next().is_some()
    }

    #[must_use]
    pub fn axis_measure_count(&self) -> usize {
        self.x_measures().count() + self.y_measures().count()
    }
}

#[cfg(test)]
mod tests {
    use super::{Aggregate, Calculator, DimensionRef, MeasureRef};
    use crate::core::{DataType, DateGranularity, DateGroup, DatePart};

    #[test]
    fn measure_names_follow_aggregate_and_calculator() {
        let plain = MeasureRef::new("Sales", Aggregate::Sum);
        assert_eq!(plain.full_name(), "Sum(Sales)");
        let detail = MeasureRef::new("Sales", Aggregate::None);
        assert_eq!(detail.full_name(), "Sales");
        let running = plain.with_calculator(Calculator::RunningTotal { reset_on: None });
        assert_eq!(running.full_name(), "RunningTotal(Sum(Sales))");
        assert_eq!(running.aggregate_name(), "Sum(Sales)");
    }

    #[test]
    fn date_parts_are_never_time_series() {
        let level = DimensionRef::new("Date")
            .with_date_group(DateGroup::Level(DateGranularity::Month))
            .time_series();
        assert!(level.is_time_series(DataType::Date));
        assert!(!level.is_time_series(DataType::String));

        let part = DimensionRef::new("Date")
            .with_date_group(DateGroup::Part(DatePart::MonthOfYear))
            .time_series();
        assert!(!part.is_time_series(DataType::Timestamp));
    }

    #[test]
    fn coarse_time_series_stays_categorical() {
        let monthly = DimensionRef::new("Date")
            .with_date_group(DateGroup::Level(DateGranularity::Month))
            .time_series();
        assert!(monthly.is_time_series(DataType::Date));
        assert!(!monthly.is_date_scaled(DataType::Date));

        let daily = DimensionRef::new("Date")
            .with_date_group(DateGroup::Level(DateGranularity::Day))
            .time_series();
        assert!(daily.is_date_scaled(DataType::Timestamp));
    }
}
