use std::sync::Arc;

use indexmap::IndexSet;

use crate::core::{DataType, Value};
use crate::error::ChartResult;

use super::{DataSource, DrillPath, Hyperlink, ValueComparator, require_column};

/// Header prefix of the invisible cumulative base column.
pub const SUM_PREFIX: &str = "__SUM__";

#[must_use]
pub fn sum_header(measure: &str) -> String {
    format!("{SUM_PREFIX}{measure}")
}

/// Running-total view for waterfall charts.
///
/// Rows are reordered by the category comparator, so each bar floats on the
/// total of the bars drawn to its left. A `__SUM__<measure>` column holds
/// that prior total, and one trailing total row carries the configured label.
/// The category comparator lists every category in drawing order with the
/// total label last.
#[derive(Debug)]
pub struct WaterfallDataSet {
    base: Arc<dyn DataSource>,
    category_col: usize,
    measure_col: usize,
    sum_header: String,
    total_label: String,
    /// View row to base row.
    order: Vec<usize>,
    prior_sums: Vec<f64>,
    category_order: ValueComparator,
    total: f64,
}

impl WaterfallDataSet {
    pub fn new(
        base: Arc<dyn DataSource>,
        category: &str,
        measure: &str,
        total_label: impl Into<String>,
    ) -> ChartResult<Self> {
        Self::ordered_by(base, category, measure, total_label, None)
    }

    /// Like [`WaterfallDataSet::new`], with `comparator` overriding the
    /// source's category order.
    pub fn ordered_by(
        base: Arc<dyn DataSource>,
        category: &str,
        measure: &str,
        total_label: impl Into<String>,
        comparator: Option<ValueComparator>,
    ) -> ChartResult<Self> {
        let category_col = require_column(&*base, category)?;
        let measure_col = require_column(&*base, measure)?;
        let total_label = total_label.into();

        let comparator = comparator.unwrap_or_else(|| base.comparator(category_col));
        let mut order: Vec<usize> = (0..base.row_count()).collect();
        order.sort_by(|&left, &right| {
            comparator.compare(
                &base.value(category_col, left),
                &base.value(category_col, right),
            )
        });

        let mut labels: IndexSet<String> = order
            .iter()
            .map(|&row| base.value(category_col, row))
            .filter(|value| !value.is_null())
            .map(|value| value.label())
            .collect();
        labels.shift_remove(&total_label);
        labels.insert(total_label.clone());

        let mut running = 0.0;
        let prior_sums = order
            .iter()
            .map(|&row| {
                let prior = running;
                running += base.value(measure_col, row).as_f64().unwrap_or(0.0);
                prior
            })
            .collect();

        Ok(Self {
            sum_header: sum_header(measure),
            base,
            category_col,
            measure_col,
            total_label,
            order,
            prior_sums,
            category_order: ValueComparator::manual(labels.into_iter().collect()),
            total: running,
        })
    }

    #[must_use]
    pub fn total_row(&self) -> usize {
        self.base.row_count()
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.total
    }

    fn sum_col(&self) -> usize {
        self.base.column_count()
    }
}

impl DataSource for WaterfallDataSet {
    fn column_count(&self) -> usize {
        self.base.column_count() + 1
    }

    fn row_count(&self) -> usize {
        self.base.row_count() + 1
    }

    fn header(&self, col: usize) -> &str {
        if col == self.sum_col() {
            &self.sum_header
        } else {
            self.base.header(col)
        }
    }

    fn data_type(&self, col: usize) -> DataType {
        if col == self.sum_col() {
            DataType::Double
        } else {
            self.base.data_type(col)
        }
    }

    fn is_measure(&self, col: usize) -> bool {
        col == self.sum_col() || self.base.is_measure(col)
    }

    fn value(&self, col: usize, row: usize) -> Value {
        if row == self.total_row() {
            return if col == self.category_col {
                Value::Text(self.total_label.clone())
            } else if col == self.measure_col {
                Value::Double(self.total)
            } else if col == self.sum_col() {
                Value::Double(0.0)
            } else {
                Value::Null
            };
        }
        if col == self.sum_col() {
            self.prior_sums
                .get(row)
                .map_or(Value::Null, |sum| Value::Double(*sum))
        } else {
            self.order
                .get(row)
                .map_or(Value::Null, |&base_row| self.base.value(col, base_row))
        }
    }

    fn comparator(&self, col: usize) -> ValueComparator {
        if col == self.category_col {
            self.category_order.clone()
        } else {
            self.base.comparator(col)
        }
    }

    fn hyperlink(&self, col: usize, row: usize) -> Option<Hyperlink> {
        self.order
            .get(row)
            .and_then(|&base_row| self.base.hyperlink(col, base_row))
    }

    fn drill_paths(&self, col: usize) -> Vec<DrillPath> {
        self.base.drill_paths(col)
    }

    fn base(&self) -> Option<&dyn DataSource> {
        Some(&*self.base)
    }
}
