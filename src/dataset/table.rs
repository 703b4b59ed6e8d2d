use std::collections::HashMap;

use crate::core::{DataType, Value};
use crate::error::{ChartError, ChartResult};

use super::{ColumnInfo, DataSource, DrillPath, Hyperlink, ValueComparator, require_column};

/// In-memory row-major table.
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<Value>>,
    comparators: HashMap<usize, ValueComparator>,
    hyperlinks: HashMap<(usize, usize), Hyperlink>,
    drill_paths: HashMap<usize, Vec<DrillPath>>,
}

impl DataTable {
    #[must_use]
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    /// Appends one row; its width must match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> ChartResult<()> {
        if row.len() != self.columns.len() {
            return Err(ChartError::InvalidData(format!(
                "row has {} values but table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn with_rows<I>(mut self, rows: I) -> ChartResult<Self>
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        for row in rows {
            self.push_row(row)?;
        }
        Ok(self)
    }

    pub fn set_comparator(&mut self, header: &str, comparator: ValueComparator) -> ChartResult<()> {
        let col = require_column(&*self, header)?;
        self.comparators.insert(col, comparator);
        Ok(())
    }

    pub fn set_hyperlink(&mut self, header: &str, row: usize, link: Hyperlink) -> ChartResult<()> {
        let col = require_column(&*self, header)?;
        if row >= self.rows.len() {
            return Err(ChartError::InvalidData(format!(
                "hyperlink row {row} is out of range"
            )));
        }
        self.hyperlinks.insert((col, row), link);
        Ok(())
    }

    pub fn add_drill_path(&mut self, header: &str, path: DrillPath) -> ChartResult<()> {
        let col = require_column(&*self, header)?;
        self.drill_paths.entry(col).or_default().push(path);
        Ok(())
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }
}

impl DataSource for DataTable {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn header(&self, col: usize) -> &str {
        self.columns.get(col).map_or("", |column| column.header.as_str())
    }

    fn data_type(&self, col: usize) -> DataType {
        self.columns
            .get(col)
            .map_or(DataType::String, |column| column.data_type)
    }

    fn is_measure(&self, col: usize) -> bool {
        self.columns.get(col).is_some_and(|column| column.measure)
    }

    fn value(&self, col: usize, row: usize) -> Value {
        self.rows
            .get(row)
            .and_then(|values| values.get(col))
            .cloned()
            .unwrap_or_default()
    }

    fn comparator(&self, col: usize) -> ValueComparator {
        self.comparators.get(&col).cloned().unwrap_or_default()
    }

    fn hyperlink(&self, col: usize, row: usize) -> Option<Hyperlink> {
        self.hyperlinks.get(&(col, row)).cloned()
    }

    fn drill_paths(&self, col: usize) -> Vec<DrillPath> {
        self.drill_paths.get(&col).cloned().unwrap_or_default()
    }
}
