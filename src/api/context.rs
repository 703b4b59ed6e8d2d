use std::ops::Range;
use std::sync::Arc;

use crate::core::{ChartFamily, ChartType, GeneratorKind};
use crate::dataset::{DataSource, Quantile, all_header, interval_header, sum_header};

use super::binding::{ChartBinding, DimensionRef, MeasureRef};
use super::decompose::Decomposition;
use super::style::StyleDescriptor;

/// Row ranges of the brushed subset and the all-data shadow in the union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BrushRows {
    pub brushed: Range<usize>,
    pub all: Range<usize>,
}

/// Per-request state shared by the generation phases. Never escapes one
/// `generate` call.
#[derive(Debug)]
pub(crate) struct GenerationContext<'a> {
    pub binding: &'a ChartBinding,
    pub style: &'a StyleDescriptor,
    pub chart_type: ChartType,
    pub kind: GeneratorKind,
    pub decomposition: Decomposition,
    pub data: Arc<dyn DataSource>,
    pub brush: Option<BrushRows>,
}

impl GenerationContext<'_> {
    /// Effective chart type of one measure.
    #[must_use]
    pub fn measure_type(&self, measure: &MeasureRef) -> ChartType {
        measure
            .effective_type(self.chart_type)
            .resolve_auto(self.binding.has_xy_measures())
    }

    #[must_use]
    pub fn is_brushing(&self) -> bool {
        self.brush.is_some()
    }

    /// Dimensions bound to aesthetics, grouping or path ordering.
    #[must_use]
    pub fn aesthetic_dims(&self) -> Vec<&DimensionRef> {
        let mut dims = self.binding.aesthetics.dimensions();
        dims.extend(self.binding.group.as_ref());
        dims.extend(self.binding.path.as_ref());
        dims
    }

    /// Whether an aesthetic dimension splits elements into several series.
    #[must_use]
    pub fn is_grouped(&self) -> bool {
        !self.aesthetic_dims().is_empty()
    }

    /// Data fields the value scale of `measure` spans.
    #[must_use]
    pub fn scale_fields(&self, measure: &MeasureRef) -> Vec<String> {
        let name = measure.full_name();
        match self.measure_type(measure).family() {
            ChartFamily::BoxPlot => {
                let mut fields: Vec<String> =
                    Quantile::ALL.iter().map(|q| q.header(&name)).collect();
                fields.push(name);
                fields
            }
            ChartFamily::Waterfall => vec![sum_header(&name), name],
            _ => vec![name],
        }
    }

    /// Start and interval-length fields of interval and gantt charts.
    #[must_use]
    pub fn interval_fields(&self) -> Option<(String, String)> {
        self.binding.interval.as_ref().map(|interval| {
            (
                interval.start.full_name(),
                interval_header(&interval.end.full_name()),
            )
        })
    }

    /// Name of the unbrushed mirror of a field.
    #[must_use]
    pub fn mirror(field: &str) -> String {
        all_header(field)
    }
}
