//! Read-only tabular data facade and the derived views built on top of it.
//!
//! Every wrapper owns exactly one base source (`Arc<dyn DataSource>`) and
//! answers hyperlink/drill/comparator queries it does not synthesize itself
//! by delegating to that base. Chains are strictly forward: a wrapper never
//! refers back to whoever wraps it.

mod box_quantile;
mod brush;
mod calc;
mod interval;
mod sub;
mod table;
mod time_series;
mod waterfall;

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::primitives::compare_values;
use crate::core::{DataType, Value};
use crate::error::{ChartError, ChartResult};

pub use box_quantile::{BoxDataSet, Quantile};
pub use brush::{ALL_PREFIX, BrushDataSet, all_header};
pub use calc::{
    CalcColumn, CalculatedDataSet, ConstantColumn, PercentOfTotalColumn, RunningTotalColumn,
};
pub use interval::{INTERVAL_PREFIX, IntervalDataSet, interval_header};
pub use sub::SubDataSet;
pub use table::DataTable;
pub use time_series::{GapFill, GapFillSpec, TimeSeriesDataSet};
pub use waterfall::{SUM_PREFIX, WaterfallDataSet, sum_header};

/// Declared shape of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub header: String,
    pub data_type: DataType,
    pub measure: bool,
}

impl ColumnInfo {
    #[must_use]
    pub fn dimension(header: impl Into<String>, data_type: DataType) -> Self {
        Self {
            header: header.into(),
            data_type,
            measure: false,
        }
    }

    #[must_use]
    pub fn measure(header: impl Into<String>, data_type: DataType) -> Self {
        Self {
            header: header.into(),
            data_type,
            measure: true,
        }
    }
}

/// Per-cell hyperlink metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperlink {
    pub link: String,
    #[serde(default)]
    pub tooltip: Option<String>,
}

/// Per-column drill-through target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillPath {
    pub name: String,
    pub link: String,
}

/// Ordering used by categorical scales for one column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValueComparator {
    #[serde(default)]
    pub descending: bool,
    /// Explicit label order; unlisted values follow in natural order.
    #[serde(default)]
    pub manual_order: Option<Vec<String>>,
}

impl ValueComparator {
    #[must_use]
    pub fn manual(order: Vec<String>) -> Self {
        Self {
            descending: false,
            manual_order: Some(order),
        }
    }

    #[must_use]
    pub fn compare(&self, left: &Value, right: &Value) -> Ordering {
        if let Some(order) = &self.manual_order {
            let position = |value: &Value| {
                let label = value.label();
                order.iter().position(|item| *item == label)
            };
            match (position(left), position(right)) {
                (Some(a), Some(b)) => return a.cmp(&b),
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => {}
            }
        }

        let natural = compare_values(left, right);
        if self.descending {
            natural.reverse()
        } else {
            natural
        }
    }
}

/// Read-only tabular data consumed by the generator.
///
/// Out-of-range column or row indices yield `Value::Null` / empty metadata
/// rather than panicking.
pub trait DataSource: fmt::Debug + Send + Sync {
    fn column_count(&self) -> usize;
    fn row_count(&self) -> usize;
    fn header(&self, col: usize) -> &str;
    fn data_type(&self, col: usize) -> DataType;
    fn is_measure(&self, col: usize) -> bool;
    fn value(&self, col: usize, row: usize) -> Value;

    fn comparator(&self, _col: usize) -> ValueComparator {
        ValueComparator::default()
    }

    fn hyperlink(&self, _col: usize, _row: usize) -> Option<Hyperlink> {
        None
    }

    fn drill_paths(&self, _col: usize) -> Vec<DrillPath> {
        Vec::new()
    }

    /// The source this one wraps, if any.
    fn base(&self) -> Option<&dyn DataSource> {
        None
    }

    fn find_column(&self, header: &str) -> Option<usize> {
        (0..self.column_count()).find(|&col| self.header(col) == header)
    }
}

/// Follows `base()` links down to the undecorated source.
#[must_use]
pub fn root_source(mut source: &dyn DataSource) -> &dyn DataSource {
    while let Some(base) = source.base() {
        source = base;
    }
    source
}

/// Resolves a header or fails with `ColumnNotFound`.
pub fn require_column(source: &dyn DataSource, header: &str) -> ChartResult<usize> {
    source
        .find_column(header)
        .ok_or_else(|| ChartError::column_not_found(header))
}

/// All values of one column in row order.
pub fn column_values(source: &dyn DataSource, col: usize) -> impl Iterator<Item = Value> + '_ {
    (0..source.row_count()).map(move |row| source.value(col, row))
}

/// Resolves several headers at once.
pub(crate) fn require_columns(
    source: &dyn DataSource,
    headers: &[String],
) -> ChartResult<Vec<usize>> {
    headers
        .iter()
        .map(|header| require_column(source, header))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::ValueComparator;
    use crate::core::Value;
    use std::cmp::Ordering;

    #[test]
    fn manual_order_wins_over_natural_order() {
        let comparator = ValueComparator::manual(vec!["West".to_owned(), "East".to_owned()]);
        assert_eq!(
            comparator.compare(&Value::from("West"), &Value::from("East")),
            Ordering::Less
        );
        assert_eq!(
            comparator.compare(&Value::from("East"), &Value::from("North")),
            Ordering::Less
        );
    }

    #[test]
    fn descending_reverses_natural_order() {
        let comparator = ValueComparator {
            descending: true,
            manual_order: None,
        };
        assert_eq!(
            comparator.compare(&Value::Integer(1), &Value::Integer(2)),
            Ordering::Greater
        );
    }
}
