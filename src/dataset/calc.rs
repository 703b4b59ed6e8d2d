use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::core::{DataType, Value};
use crate::error::ChartResult;

use super::{DataSource, DrillPath, Hyperlink, ValueComparator, require_column};

/// Derived column computed once over a whole base source.
pub trait CalcColumn: fmt::Debug + Send + Sync {
    fn header(&self) -> &str;

    fn data_type(&self) -> DataType {
        DataType::Double
    }

    fn is_measure(&self) -> bool {
        true
    }

    /// Computes one value per base row.
    fn compute(&self, source: &dyn DataSource) -> ChartResult<Vec<Value>>;
}

/// Cumulative sum of a measure, optionally restarting per group value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningTotalColumn {
    pub header: String,
    pub source: String,
    pub reset_on: Option<String>,
}

impl RunningTotalColumn {
    #[must_use]
    pub fn new(header: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            source: source.into(),
            reset_on: None,
        }
    }

    #[must_use]
    pub fn reset_on(mut self, group: impl Into<String>) -> Self {
        self.reset_on = Some(group.into());
        self
    }
}

impl CalcColumn for RunningTotalColumn {
    fn header(&self) -> &str {
        &self.header
    }

    fn compute(&self, source: &dyn DataSource) -> ChartResult<Vec<Value>> {
        let col = require_column(source, &self.source)?;
        let group_col = self
            .reset_on
            .as_deref()
            .map(|group| require_column(source, group))
            .transpose()?;

        let mut totals: IndexMap<String, f64> = IndexMap::new();
        let mut out = Vec::with_capacity(source.row_count());
        for row in 0..source.row_count() {
            let key = group_col.map_or_else(String::new, |g| source.value(g, row).label());
            let total = totals.entry(key).or_insert(0.0);
            match source.value(col, row).as_f64() {
                Some(value) => {
                    *total += value;
                    out.push(Value::Double(*total));
                }
                None => out.push(Value::Null),
            }
        }
        Ok(out)
    }
}

/// Share of the column total, in percent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PercentOfTotalColumn {
    pub header: String,
    pub source: String,
}

impl PercentOfTotalColumn {
    #[must_use]
    pub fn new(header: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            source: source.into(),
        }
    }
}

impl CalcColumn for PercentOfTotalColumn {
    fn header(&self) -> &str {
        &self.header
    }

    fn compute(&self, source: &dyn DataSource) -> ChartResult<Vec<Value>> {
        let col = require_column(source, &self.source)?;
        let values: Vec<Option<f64>> = (0..source.row_count())
            .map(|row| source.value(col, row).as_f64())
            .collect();
        let total: f64 = values.iter().flatten().sum();
        Ok(values
            .into_iter()
            .map(|value| match value {
                Some(value) if total != 0.0 => Value::Double(value / total * 100.0),
                _ => Value::Null,
            })
            .collect())
    }
}

/// Constant measure, used for the synthetic magnitude of dimension-only charts.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantColumn {
    pub header: String,
    pub value: f64,
}

impl ConstantColumn {
    #[must_use]
    pub fn new(header: impl Into<String>, value: f64) -> Self {
        Self {
            header: header.into(),
            value,
        }
    }
}

impl CalcColumn for ConstantColumn {
    fn header(&self) -> &str {
        &self.header
    }

    fn compute(&self, source: &dyn DataSource) -> ChartResult<Vec<Value>> {
        Ok(vec![Value::Double(self.value); source.row_count()])
    }
}

/// Base source extended with calculated columns appended after the base columns.
#[derive(Debug)]
pub struct CalculatedDataSet {
    base: Arc<dyn DataSource>,
    calcs: Vec<Arc<dyn CalcColumn>>,
    computed: Vec<Vec<Value>>,
}

impl CalculatedDataSet {
    pub fn new(base: Arc<dyn DataSource>, calcs: Vec<Arc<dyn CalcColumn>>) -> ChartResult<Self> {
        let computed = calcs
            .iter()
            .map(|calc| calc.compute(&*base))
            .collect::<ChartResult<Vec<_>>>()?;
        Ok(Self {
            base,
            calcs,
            computed,
        })
    }

    fn calc_index(&self, col: usize) -> Option<usize> {
        col.checked_sub(self.base.column_count())
            .filter(|index| *index < self.calcs.len())
    }
}

impl DataSource for CalculatedDataSet {
    fn column_count(&self) -> usize {
        self.base.column_count() + self.calcs.len()
    }

    fn row_count(&self) -> usize {
        self.base.row_count()
    }

    fn header(&self, col: usize) -> &str {
        match self.calc_index(col) {
            Some(index) => self.calcs[index].header(),
            None => self.base.header(col),
        }
    }

    fn data_type(&self, col: usize) -> DataType {
        match self.calc_index(col) {
            Some(index) => self.calcs[index].data_type(),
            None => self.base.data_type(col),
        }
    }

    fn is_measure(&self, col: usize) -> bool {
        match self.calc_index(col) {
            Some(index) => self.calcs[index].is_measure(),
            None => self.base.is_measure(col),
        }
    }

    fn value(&self, col: usize, row: usize) -> Value {
        match self.calc_index(col) {
            Some(index) => self.computed[index].get(row).cloned().unwrap_or_default(),
            None => self.base.value(col, row),
        }
    }

    fn comparator(&self, col: usize) -> ValueComparator {
        self.base.comparator(col)
    }

    fn hyperlink(&self, col: usize, row: usize) -> Option<Hyperlink> {
        self.base.hyperlink(col, row)
    }

    fn drill_paths(&self, col: usize) -> Vec<DrillPath> {
        self.base.drill_paths(col)
    }

    fn base(&self) -> Option<&dyn DataSource> {
        Some(&*self.base)
    }
}
