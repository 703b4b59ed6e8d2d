use std::sync::Arc;

use crate::core::{DataType, Value};
use crate::error::ChartResult;

use super::{DataSource, DrillPath, Hyperlink, ValueComparator, require_column};

/// Header prefix of a synthesized interval-length column.
pub const INTERVAL_PREFIX: &str = "__INTERVAL__";

#[must_use]
pub fn interval_header(end: &str) -> String {
    format!("{INTERVAL_PREFIX}{end}")
}

#[derive(Debug)]
struct IntervalPair {
    start_col: usize,
    end_col: usize,
    header: String,
}

/// Start/end expansion for interval and gantt charts.
///
/// For every `(start, end)` pair a column `__INTERVAL__<end>` holds
/// `end - start`, so an interval bar can be drawn from `start` with that
/// length. Calendar columns are measured in seconds.
#[derive(Debug)]
pub struct IntervalDataSet {
    base: Arc<dyn DataSource>,
    pairs: Vec<IntervalPair>,
}

impl IntervalDataSet {
    pub fn new(base: Arc<dyn DataSource>, pairs: &[(String, String)]) -> ChartResult<Self> {
        let pairs = pairs
            .iter()
            .map(|(start, end)| {
                Ok(IntervalPair {
                    start_col: require_column(&*base, start)?,
                    end_col: require_column(&*base, end)?,
                    header: interval_header(end),
                })
            })
            .collect::<ChartResult<Vec<_>>>()?;
        Ok(Self { base, pairs })
    }

    fn pair(&self, col: usize) -> Option<&IntervalPair> {
        col.checked_sub(self.base.column_count())
            .and_then(|index| self.pairs.get(index))
    }
}

impl DataSource for IntervalDataSet {
    fn column_count(&self) -> usize {
        self.base.column_count() + self.pairs.len()
    }

    fn row_count(&self) -> usize {
        self.base.row_count()
    }

    fn header(&self, col: usize) -> &str {
        match self.pair(col) {
            Some(pair) => &pair.header,
            None => self.base.header(col),
        }
    }

    fn data_type(&self, col: usize) -> DataType {
        match self.pair(col) {
            Some(_) => DataType::Double,
            None => self.base.data_type(col),
        }
    }

    fn is_measure(&self, col: usize) -> bool {
        self.pair(col).is_some() || self.base.is_measure(col)
    }

    fn value(&self, col: usize, row: usize) -> Value {
        let Some(pair) = self.pair(col) else {
            return self.base.value(col, row);
        };
        let start = self.base.value(pair.start_col, row).as_position();
        let end = self.base.value(pair.end_col, row).as_position();
        match (start, end) {
            (Some(start), Some(end)) => Value::Double(end - start),
            _ => Value::Null,
        }
    }

    fn comparator(&self, col: usize) -> ValueComparator {
        match self.pair(col) {
            Some(pair) => self.base.comparator(pair.end_col),
            None => self.base.comparator(col),
        }
    }

    fn hyperlink(&self, col: usize, row: usize) -> Option<Hyperlink> {
        match self.pair(col) {
            Some(pair) => self.base.hyperlink(pair.end_col, row),
            None => self.base.hyperlink(col, row),
        }
    }

    fn drill_paths(&self, col: usize) -> Vec<DrillPath> {
        match self.pair(col) {
            Some(pair) => self.base.drill_paths(pair.end_col),
            None => self.base.drill_paths(col),
        }
    }

    fn base(&self) -> Option<&dyn DataSource> {
        Some(&*self.base)
    }
}
