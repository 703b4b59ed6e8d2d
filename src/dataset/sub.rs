use std::ops::Range;
use std::sync::Arc;

use crate::core::{DataType, Value};
use crate::error::{ChartError, ChartResult};

use super::{DataSource, DrillPath, Hyperlink, ValueComparator};

/// Contiguous row range of a base source.
#[derive(Debug)]
pub struct SubDataSet {
    base: Arc<dyn DataSource>,
    rows: Range<usize>,
}

impl SubDataSet {
    pub fn new(base: Arc<dyn DataSource>, rows: Range<usize>) -> ChartResult<Self> {
        if rows.start > rows.end || rows.end > base.row_count() {
            return Err(ChartError::InvalidData(format!(
                "row range {}..{} is outside 0..{}",
                rows.start,
                rows.end,
                base.row_count()
            )));
        }
        Ok(Self { base, rows })
    }

    fn base_row(&self, row: usize) -> Option<usize> {
        let mapped = self.rows.start + row;
        (mapped < self.rows.end).then_some(mapped)
    }
}

impl DataSource for SubDataSet {
    fn column_count(&self) -> usize {
        self.base.column_count()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn header(&self, col: usize) -> &str {
        self.base.header(col)
    }

    fn data_type(&self, col: usize) -> DataType {
        self.base.data_type(col)
    }

    fn is_measure(&self, col: usize) -> bool {
        self.base.is_measure(col)
    }

    fn value(&self, col: usize, row: usize) -> Value {
        self.base_row(row)
            .map_or(Value::Null, |base_row| self.base.value(col, base_row))
    }

    fn comparator(&self, col: usize) -> ValueComparator {
        self.base.comparator(col)
    }

    fn hyperlink(&self, col: usize, row: usize) -> Option<Hyperlink> {
        self.base_row(row)
            .and_then(|base_row| self.base.hyperlink(col, base_row))
    }

    fn drill_paths(&self, col: usize) -> Vec<DrillPath> {
        self.base.drill_paths(col)
    }

    fn base(&self) -> Option<&dyn DataSource> {
        Some(&*self.base)
    }
}
