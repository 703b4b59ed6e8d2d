use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::primitives::{percentile, sorted_finite};
use crate::core::{DataType, Value};
use crate::error::ChartResult;

use super::{DataSource, DrillPath, Hyperlink, ValueComparator, require_columns};

/// One of the five synthesized box-plot columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantile {
    Min,
    Q25,
    Median,
    Q75,
    Max,
}

impl Quantile {
    pub const ALL: [Self; 5] = [Self::Min, Self::Q25, Self::Median, Self::Q75, Self::Max];

    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Min => "__MIN__",
            Self::Q25 => "__Q25__",
            Self::Median => "__MEDIAN__",
            Self::Q75 => "__Q75__",
            Self::Max => "__MAX__",
        }
    }

    /// Header of this quantile's column for `measure`.
    #[must_use]
    pub fn header(self, measure: &str) -> String {
        format!("{}{measure}", self.prefix())
    }

    const fn offset(self) -> usize {
        match self {
            Self::Min => 0,
            Self::Q25 => 1,
            Self::Median => 2,
            Self::Q75 => 3,
            Self::Max => 4,
        }
    }
}

/// Whisker statistics using the 1.5 x IQR fence rule.
#[derive(Debug, Clone, PartialEq)]
struct BoxStats {
    values: [f64; 5],
    outliers: Vec<f64>,
}

impl BoxStats {
    fn from_values(values: Vec<f64>) -> Option<Self> {
        let sorted = sorted_finite(values);
        let q25 = percentile(&sorted, 25.0)?;
        let median = percentile(&sorted, 50.0)?;
        let q75 = percentile(&sorted, 75.0)?;
        let iqr = q75 - q25;
        let lower_fence = q25 - 1.5 * iqr;
        let upper_fence = q75 + 1.5 * iqr;

        let min = sorted
            .iter()
            .copied()
            .find(|&value| value >= lower_fence)
            .unwrap_or(sorted[0]);
        let max = sorted
            .iter()
            .rev()
            .copied()
            .find(|&value| value <= upper_fence)
            .unwrap_or(sorted[sorted.len() - 1]);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|&value| value < lower_fence || value > upper_fence)
            .collect();

        Some(Self {
            values: [min, q25, median, q75, max],
            outliers,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BoxRow {
    Summary { group: usize },
    Outlier { group: usize, measure: usize, value: f64 },
}

impl BoxRow {
    fn group(self) -> usize {
        match self {
            Self::Summary { group } | Self::Outlier { group, .. } => group,
        }
    }
}

#[derive(Debug)]
struct BoxGroup {
    first_row: usize,
    stats: Vec<Option<BoxStats>>,
}

/// Box-plot expansion of detail rows.
///
/// Output columns are the grouping dimensions, the original measures (which
/// only carry outlier values) and five quantile columns per measure. Each
/// group yields one summary row followed by one row per outlier.
#[derive(Debug)]
pub struct BoxDataSet {
    base: Arc<dyn DataSource>,
    dim_cols: Vec<usize>,
    measure_cols: Vec<usize>,
    quantile_headers: Vec<String>,
    groups: Vec<BoxGroup>,
    rows: Vec<BoxRow>,
}

impl BoxDataSet {
    pub fn new(
        base: Arc<dyn DataSource>,
        dimensions: &[String],
        measures: &[String],
    ) -> ChartResult<Self> {
        let dim_cols = require_columns(&*base, dimensions)?;
        let measure_cols = require_columns(&*base, measures)?;

        let mut grouped: IndexMap<Vec<String>, Vec<usize>> = IndexMap::new();
        for row in 0..base.row_count() {
            let key = dim_cols
                .iter()
                .map(|&col| base.value(col, row).label())
                .collect();
            grouped.entry(key).or_default().push(row);
        }

        let mut groups = Vec::with_capacity(grouped.len());
        let mut rows = Vec::new();
        for (group, members) in grouped.values().enumerate() {
            let stats: Vec<Option<BoxStats>> = measure_cols
                .iter()
                .map(|&col| {
                    let values = members
                        .iter()
                        .filter_map(|&row| base.value(col, row).as_f64())
                        .collect();
                    BoxStats::from_values(values)
                })
                .collect();

            rows.push(BoxRow::Summary { group });
            for (measure, stat) in stats.iter().enumerate() {
                if let Some(stat) = stat {
                    rows.extend(stat.outliers.iter().map(|&value| BoxRow::Outlier {
                        group,
                        measure,
                        value,
                    }));
                }
            }
            groups.push(BoxGroup {
                first_row: members[0],
                stats,
            });
        }

        let quantile_headers = measures
            .iter()
            .flat_map(|measure| Quantile::ALL.iter().map(move |q| q.header(measure)))
            .collect();

        Ok(Self {
            base,
            dim_cols,
            measure_cols,
            quantile_headers,
            groups,
            rows,
        })
    }

    /// Column index of `quantile` for the measure at `measure_index`.
    #[must_use]
    pub fn quantile_column(&self, measure_index: usize, quantile: Quantile) -> usize {
        self.dim_cols.len() + self.measure_cols.len() + measure_index * 5 + quantile.offset()
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn layout(&self, col: usize) -> Column {
        let dims = self.dim_cols.len();
        let measures = self.measure_cols.len();
        if col < dims {
            Column::Dimension(col)
        } else if col < dims + measures {
            Column::Measure(col - dims)
        } else if col < dims + measures * 6 {
            let index = col - dims - measures;
            Column::Quantile(index / 5, Quantile::ALL[index % 5])
        } else {
            Column::Missing
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Column {
    Dimension(usize),
    Measure(usize),
    Quantile(usize, Quantile),
    Missing,
}

impl DataSource for BoxDataSet {
    fn column_count(&self) -> usize {
        self.dim_cols.len() + self.measure_cols.len() * 6
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn header(&self, col: usize) -> &str {
        match self.layout(col) {
            Column::Dimension(index) => self.base.header(self.dim_cols[index]),
            Column::Measure(index) => self.base.header(self.measure_cols[index]),
            Column::Quantile(measure, quantile) => {
                &self.quantile_headers[measure * 5 + quantile.offset()]
            }
            Column::Missing => "",
        }
    }

    fn data_type(&self, col: usize) -> DataType {
        match self.layout(col) {
            Column::Dimension(index) => self.base.data_type(self.dim_cols[index]),
            Column::Measure(_) | Column::Quantile(..) => DataType::Double,
            Column::Missing => DataType::String,
        }
    }

    fn is_measure(&self, col: usize) -> bool {
        matches!(self.layout(col), Column::Measure(_) | Column::Quantile(..))
    }

    fn value(&self, col: usize, row: usize) -> Value {
        let Some(&box_row) = self.rows.get(row) else {
            return Value::Null;
        };
        let group = &self.groups[box_row.group()];
        match (self.layout(col), box_row) {
            (Column::Dimension(index), _) => {
                self.base.value(self.dim_cols[index], group.first_row)
            }
            (Column::Measure(index), BoxRow::Outlier { measure, value, .. })
                if index == measure =>
            {
                Value::Double(value)
            }
            (Column::Quantile(measure, quantile), BoxRow::Summary { .. }) => group.stats[measure]
                .as_ref()
                .map_or(Value::Null, |stats| {
                    Value::Double(stats.values[quantile.offset()])
                }),
            _ => Value::Null,
        }
    }

    fn comparator(&self, col: usize) -> ValueComparator {
        match self.layout(col) {
            Column::Dimension(index) => self.base.comparator(self.dim_cols[index]),
            Column::Measure(index) => self.base.comparator(self.measure_cols[index]),
            _ => ValueComparator::default(),
        }
    }

    fn hyperlink(&self, col: usize, row: usize) -> Option<Hyperlink> {
        let box_row = self.rows.get(row)?;
        match self.layout(col) {
            Column::Dimension(index) => self.base.hyperlink(
                self.dim_cols[index],
                self.groups[box_row.group()].first_row,
            ),
            _ => None,
        }
    }

    fn drill_paths(&self, col: usize) -> Vec<DrillPath> {
        match self.layout(col) {
            Column::Dimension(index) => self.base.drill_paths(self.dim_cols[index]),
            Column::Measure(index) => self.base.drill_paths(self.measure_cols[index]),
            _ => Vec::new(),
        }
    }

    fn base(&self) -> Option<&dyn DataSource> {
        Some(&*self.base)
    }
}
