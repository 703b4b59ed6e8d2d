use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::core::Value;
use crate::error::{ChartError, ChartResult};

pub fn decimal_to_f64(value: Decimal, field_name: &str) -> ChartResult<f64> {
    value.to_f64().ok_or_else(|| {
        ChartError::InvalidData(format!("{field_name} cannot be represented as f64"))
    })
}

#[must_use]
pub fn datetime_to_unix_seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

/// Total order over cell values.
///
/// Nulls sort first, then booleans, numbers, calendar values and text. Values
/// of different kinds compare by that rank so mixed columns stay stable.
#[must_use]
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Integer(_) | Value::Double(_) | Value::Decimal(_) => 2,
            Value::Date(_) | Value::Timestamp(_) => 3,
            Value::Text(_) => 4,
        }
    }

    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::Date(_) | Value::Timestamp(_), Value::Date(_) | Value::Timestamp(_)) => {
            left.as_datetime().cmp(&right.as_datetime())
        }
        _ if rank(left) == 2 && rank(right) == 2 => {
            let a = left.as_f64().unwrap_or(f64::NAN);
            let b = right.as_f64().unwrap_or(f64::NAN);
            OrderedFloat(a).cmp(&OrderedFloat(b))
        }
        _ => rank(left).cmp(&rank(right)),
    }
}

/// Finite numeric values of a column slice, in row order.
pub fn finite_values<I>(values: I) -> impl Iterator<Item = f64>
where
    I: IntoIterator<Item = Value>,
{
    values
        .into_iter()
        .filter_map(|value| value.as_f64())
        .filter(|value| value.is_finite())
}

/// Linear-interpolated percentile over an ascending-sorted slice.
///
/// `percent` is in `0..=100`. Returns `None` for an empty slice.
#[must_use]
pub fn percentile(sorted: &[f64], percent: f64) -> Option<f64> {
    match sorted.len() {
        0 => None,
        1 => Some(sorted[0]),
        len => {
            let rank = (percent.clamp(0.0, 100.0) / 100.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            if lower == upper || upper >= len {
                Some(sorted[lower.min(len - 1)])
            } else {
                let weight = rank - lower as f64;
                Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
            }
        }
    }
}

/// Sorts finite values ascending, dropping NaN/inf.
#[must_use]
pub fn sorted_finite(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    sorted.sort_by_key(|value| OrderedFloat(*value));
    sorted
}

#[cfg(test)]
mod tests {
    use super::{compare_values, percentile, sorted_finite};
    use crate::core::Value;
    use std::cmp::Ordering;

    #[test]
    fn percentile_interpolates_between_neighbours() {
        let sorted = sorted_finite([4.0, 1.0, 3.0, 2.0]);
        assert_eq!(percentile(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile(&sorted, 50.0), Some(2.5));
        assert_eq!(percentile(&sorted, 100.0), Some(4.0));
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn mixed_numeric_values_compare_by_magnitude() {
        assert_eq!(
            compare_values(&Value::Integer(2), &Value::Double(1.5)),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(&Value::Null, &Value::Text("a".to_owned())),
            Ordering::Less
        );
    }
}
