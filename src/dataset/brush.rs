use std::ops::Range;
use std::sync::Arc;

use crate::core::{DataType, Value};
use crate::error::ChartResult;

use super::{DataSource, DrillPath, Hyperlink, ValueComparator, require_column};

/// Header prefix of the unbrushed shadow copy of a measure.
pub const ALL_PREFIX: &str = "ALL_";

#[must_use]
pub fn all_header(header: &str) -> String {
    format!("{ALL_PREFIX}{header}")
}

/// Union of a brushed subset and the full ("all data") series.
///
/// Rows `0..brushed` come from the brushed source with every `ALL_` column
/// null. The following rows come from the full source with the original
/// measure columns null and the values moved to their `ALL_` mirrors, so the
/// two series never stack onto each other.
#[derive(Debug)]
pub struct BrushDataSet {
    brushed: Arc<dyn DataSource>,
    all: Arc<dyn DataSource>,
    /// For each brushed column, its index in the full source.
    all_index: Vec<usize>,
    /// Brushed measure columns mirrored as `ALL_` columns.
    mirrored: Vec<usize>,
    mirrored_headers: Vec<String>,
}

impl BrushDataSet {
    pub fn new(brushed: Arc<dyn DataSource>, all: Arc<dyn DataSource>) -> ChartResult<Self> {
        let all_index = (0..brushed.column_count())
            .map(|col| require_column(&*all, brushed.header(col)))
            .collect::<ChartResult<Vec<_>>>()?;
        let mirrored: Vec<usize> = (0..brushed.column_count())
            .filter(|&col| brushed.is_measure(col))
            .collect();
        let mirrored_headers = mirrored
            .iter()
            .map(|&col| all_header(brushed.header(col)))
            .collect();

        Ok(Self {
            brushed,
            all,
            all_index,
            mirrored,
            mirrored_headers,
        })
    }

    #[must_use]
    pub fn brushed_rows(&self) -> Range<usize> {
        0..self.brushed.row_count()
    }

    #[must_use]
    pub fn all_rows(&self) -> Range<usize> {
        let start = self.brushed.row_count();
        start..start + self.all.row_count()
    }

    /// Index into `mirrored` for an appended `ALL_` column.
    fn mirror_index(&self, col: usize) -> Option<usize> {
        col.checked_sub(self.brushed.column_count())
            .filter(|index| *index < self.mirrored.len())
    }

    fn all_row(&self, row: usize) -> Option<usize> {
        row.checked_sub(self.brushed.row_count())
            .filter(|all_row| *all_row < self.all.row_count())
    }
}

impl DataSource for BrushDataSet {
    fn column_count(&self) -> usize {
        self.brushed.column_count() + self.mirrored.len()
    }

    fn row_count(&self) -> usize {
        self.brushed.row_count() + self.all.row_count()
    }

    fn header(&self, col: usize) -> &str {
        match self.mirror_index(col) {
            Some(index) => &self.mirrored_headers[index],
            None => self.brushed.header(col),
        }
    }

    fn data_type(&self, col: usize) -> DataType {
        match self.mirror_index(col) {
            Some(index) => self.brushed.data_type(self.mirrored[index]),
            None => self.brushed.data_type(col),
        }
    }

    fn is_measure(&self, col: usize) -> bool {
        match self.mirror_index(col) {
            Some(_) => true,
            None => self.brushed.is_measure(col),
        }
    }

    fn value(&self, col: usize, row: usize) -> Value {
        let mirror = self.mirror_index(col);
        match self.all_row(row) {
            None => match mirror {
                Some(_) => Value::Null,
                None => self.brushed.value(col, row),
            },
            Some(all_row) => match mirror {
                Some(index) => self
                    .all
                    .value(self.all_index[self.mirrored[index]], all_row),
                None if self.brushed.is_measure(col) => Value::Null,
                None => self
                    .all_index
                    .get(col)
                    .map_or(Value::Null, |&all_col| self.all.value(all_col, all_row)),
            },
        }
    }

    fn comparator(&self, col: usize) -> ValueComparator {
        match self.mirror_index(col) {
            Some(index) => self.brushed.comparator(self.mirrored[index]),
            None => self.brushed.comparator(col),
        }
    }

    fn hyperlink(&self, col: usize, row: usize) -> Option<Hyperlink> {
        let base_col = match self.mirror_index(col) {
            Some(index) => self.mirrored[index],
            None => col,
        };
        match self.all_row(row) {
            None => self.brushed.hyperlink(base_col, row),
            Some(all_row) => self
                .all_index
                .get(base_col)
                .and_then(|&all_col| self.all.hyperlink(all_col, all_row)),
        }
    }

    fn drill_paths(&self, col: usize) -> Vec<DrillPath> {
        match self.mirror_index(col) {
            Some(index) => self.brushed.drill_paths(self.mirrored[index]),
            None => self.brushed.drill_paths(col),
        }
    }

    fn base(&self) -> Option<&dyn DataSource> {
        Some(&*self.brushed)
    }
}
