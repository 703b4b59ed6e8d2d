use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::{DataType, DateGranularity, Value};
use crate::error::{ChartError, ChartResult};

use super::{DataSource, DrillPath, Hyperlink, ValueComparator, require_column, require_columns};

/// Upper bound on buckets synthesized per timeline.
const MAX_TIMELINE_BUCKETS: usize = 100_000;

/// Value written into a measure column of a synthesized bucket row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GapFill {
    /// Fixed value, 0 for additive measures.
    Constant(f64),
    /// Previous value of the same group (running totals).
    CarryForward,
    /// Leave the measure null.
    Skip,
}

/// Parameters of one gap-filling pass.
#[derive(Debug, Clone, PartialEq)]
pub struct GapFillSpec {
    pub date_column: String,
    pub granularity: DateGranularity,
    /// Grouping columns; every distinct combination gets a full timeline.
    pub group_columns: Vec<String>,
    pub fills: Vec<(String, GapFill)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SeriesRow {
    Base(usize),
    Synthetic {
        group: usize,
        bucket: NaiveDateTime,
        previous: Option<usize>,
    },
}

/// Time series with missing calendar buckets synthesized per group.
///
/// Rows are emitted group by group in bucket order. Rows whose date is null
/// are kept unchanged at the end.
#[derive(Debug)]
pub struct TimeSeriesDataSet {
    base: Arc<dyn DataSource>,
    date_col: usize,
    date_type: DataType,
    group_cols: Vec<usize>,
    group_values: Vec<Vec<Value>>,
    fills: Vec<(usize, GapFill)>,
    rows: Vec<SeriesRow>,
    synthetic_rows: usize,
}

impl TimeSeriesDataSet {
    pub fn new(base: Arc<dyn DataSource>, spec: &GapFillSpec) -> ChartResult<Self> {
        let date_col = require_column(&*base, &spec.date_column)?;
        let group_cols = require_columns(&*base, &spec.group_columns)?;
        let fills = spec
            .fills
            .iter()
            .map(|(header, fill)| Ok((require_column(&*base, header)?, *fill)))
            .collect::<ChartResult<Vec<_>>>()?;

        type Timeline = BTreeMap<NaiveDateTime, Vec<usize>>;
        let mut groups: IndexMap<Vec<String>, (Vec<Value>, Timeline)> = IndexMap::new();
        let mut undated = Vec::new();
        let mut bounds: Option<(NaiveDateTime, NaiveDateTime)> = None;

        for row in 0..base.row_count() {
            let Some(time) = base.value(date_col, row).as_datetime() else {
                undated.push(row);
                continue;
            };
            let bucket = spec.granularity.truncate(time);
            bounds = Some(match bounds {
                Some((first, last)) => (first.min(bucket), last.max(bucket)),
                None => (bucket, bucket),
            });

            let values: Vec<Value> = group_cols.iter().map(|&col| base.value(col, row)).collect();
            let key = values.iter().map(Value::label).collect();
            groups
                .entry(key)
                .or_insert_with(|| (values, BTreeMap::new()))
                .1
                .entry(bucket)
                .or_default()
                .push(row);
        }

        let timeline = match bounds {
            Some((first, last)) => build_timeline(spec.granularity, first, last)?,
            None => Vec::new(),
        };

        let mut rows = Vec::with_capacity(base.row_count());
        let mut synthetic_rows = 0;
        let mut group_values = Vec::with_capacity(groups.len());
        for (group, (values, buckets)) in groups.into_values().enumerate() {
            let mut previous = None;
            for &bucket in &timeline {
                match buckets.get(&bucket) {
                    Some(members) => {
                        rows.extend(members.iter().map(|&row| SeriesRow::Base(row)));
                        previous = members.last().copied();
                    }
                    None => {
                        rows.push(SeriesRow::Synthetic {
                            group,
                            bucket,
                            previous,
                        });
                        synthetic_rows += 1;
                    }
                }
            }
            group_values.push(values);
        }
        rows.extend(undated.into_iter().map(SeriesRow::Base));

        Ok(Self {
            date_type: base.data_type(date_col),
            base,
            date_col,
            group_cols,
            group_values,
            fills,
            rows,
            synthetic_rows,
        })
    }

    /// Number of rows that did not exist in the base source.
    #[must_use]
    pub fn synthetic_row_count(&self) -> usize {
        self.synthetic_rows
    }

    fn synthetic_value(
        &self,
        col: usize,
        group: usize,
        bucket: NaiveDateTime,
        previous: Option<usize>,
    ) -> Value {
        if col == self.date_col {
            return Value::from_datetime(self.date_type, bucket);
        }
        if let Some(index) = self.group_cols.iter().position(|&group_col| group_col == col) {
            return self.group_values[group][index].clone();
        }
        match self.fills.iter().find(|(fill_col, _)| *fill_col == col) {
            Some((_, GapFill::Constant(value))) => Value::Double(*value),
            Some((_, GapFill::CarryForward)) => {
                previous.map_or(Value::Null, |row| self.base.value(col, row))
            }
            Some((_, GapFill::Skip)) | None => Value::Null,
        }
    }
}

fn build_timeline(
    granularity: DateGranularity,
    first: NaiveDateTime,
    last: NaiveDateTime,
) -> ChartResult<Vec<NaiveDateTime>> {
    let mut timeline = vec![first];
    let mut current = first;
    while current < last {
        let Some(next) = granularity.next(current) else {
            break;
        };
        if timeline.len() >= MAX_TIMELINE_BUCKETS {
            return Err(ChartError::InvalidData(format!(
                "time series spans more than {MAX_TIMELINE_BUCKETS} {granularity:?} buckets"
            )));
        }
        timeline.push(next);
        current = next;
    }
    Ok(timeline)
}

impl DataSource for TimeSeriesDataSet {
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
        match self.rows.get(row) {
            Some(SeriesRow::Base(base_row)) => self.base.value(col, *base_row),
            Some(SeriesRow::Synthetic {
                group,
                bucket,
                previous,
            }) => self.synthetic_value(col, *group, *bucket, *previous),
            None => Value::Null,
        }
    }

    fn comparator(&self, col: usize) -> ValueComparator {
        self.base.comparator(col)
    }

    fn hyperlink(&self, col: usize, row: usize) -> Option<Hyperlink> {
        match self.rows.get(row) {
            Some(SeriesRow::Base(base_row)) => self.base.hyperlink(col, *base_row),
            _ => None,
        }
    }

    fn drill_paths(&self, col: usize) -> Vec<DrillPath> {
        self.base.drill_paths(col)
    }

    fn base(&self) -> Option<&dyn DataSource> {
        Some(&*self.base)
    }
}
