use chrono::{
    DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::primitives::{datetime_to_unix_seconds, decimal_to_f64};

/// Declared type of a data-source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataType {
    #[default]
    String,
    Boolean,
    Integer,
    Double,
    Decimal,
    Date,
    Time,
    Timestamp,
}

impl DataType {
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Double | Self::Decimal)
    }

    /// `Date` and `Timestamp` carry a calendar position; `Time` alone does not.
    #[must_use]
    pub fn is_calendar(self) -> bool {
        matches!(self, Self::Date | Self::Timestamp)
    }

    #[must_use]
    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::Timestamp)
    }
}

/// One cell of a tabular data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the value. Temporal values are not numbers here.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Double(value) if value.is_finite() => Some(*value),
            Self::Decimal(value) => decimal_to_f64(*value, "value").ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(date) => date.and_hms_opt(0, 0, 0),
            Self::Timestamp(time) => Some(time.naive_utc()),
            _ => None,
        }
    }

    /// Position on a continuous axis: numbers as-is, calendar values as unix seconds.
    #[must_use]
    pub fn as_position(&self) -> Option<f64> {
        match self {
            Self::Date(_) => self
                .as_datetime()
                .map(|naive| datetime_to_unix_seconds(naive.and_utc())),
            Self::Timestamp(time) => Some(datetime_to_unix_seconds(*time)),
            other => other.as_f64(),
        }
    }

    /// Stable label used for categorical keys, legends and palette assignment.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(value) => value.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Double(value) => value.to_string(),
            Self::Decimal(value) => value.normalize().to_string(),
            Self::Text(value) => value.clone(),
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
            Self::Timestamp(time) => time.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    /// Rebuilds a calendar value of the given column type from a bucket start.
    #[must_use]
    pub fn from_datetime(data_type: DataType, time: NaiveDateTime) -> Self {
        match data_type {
            DataType::Date => Self::Date(time.date()),
            _ => Self::Timestamp(time.and_utc()),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// Fixed calendar bucket size used by time scales and gap filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DateGranularity {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl DateGranularity {
    /// Start of the bucket containing `time`.
    #[must_use]
    pub fn truncate(self, time: NaiveDateTime) -> NaiveDateTime {
        let date = time.date();
        let truncated = match self {
            Self::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).and_then(midnight),
            Self::Quarter => {
                let month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), month, 1).and_then(midnight)
            }
            Self::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1).and_then(midnight),
            Self::Week => {
                let back = i64::from(date.weekday().num_days_from_monday());
                date.checked_sub_signed(TimeDelta::days(back))
                    .and_then(midnight)
            }
            Self::Day => midnight(date),
            Self::Hour => date.and_hms_opt(time.hour(), 0, 0),
            Self::Minute => date.and_hms_opt(time.hour(), time.minute(), 0),
            Self::Second => date.and_hms_opt(time.hour(), time.minute(), time.second()),
        };
        truncated.unwrap_or(time)
    }

    /// Start of the bucket following the one that starts at `bucket`.
    #[must_use]
    pub fn next(self, bucket: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::Year => bucket.checked_add_months(Months::new(12)),
            Self::Quarter => bucket.checked_add_months(Months::new(3)),
            Self::Month => bucket.checked_add_months(Months::new(1)),
            Self::Week => bucket.checked_add_signed(TimeDelta::days(7)),
            Self::Day => bucket.checked_add_signed(TimeDelta::days(1)),
            Self::Hour => bucket.checked_add_signed(TimeDelta::hours(1)),
            Self::Minute => bucket.checked_add_signed(TimeDelta::minutes(1)),
            Self::Second => bucket.checked_add_signed(TimeDelta::seconds(1)),
        }
    }
}

fn midnight(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
}

/// Cyclic date component; always categorical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatePart {
    QuarterOfYear,
    MonthOfYear,
    DayOfMonth,
    DayOfWeek,
    HourOfDay,
}

/// How a date dimension groups its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DateGroup {
    /// Ungrouped raw values.
    #[default]
    Raw,
    /// Calendar buckets of a fixed size.
    Level(DateGranularity),
    /// Cyclic component such as month-of-year.
    Part(DatePart),
}

impl DateGroup {
    #[must_use]
    pub fn fixed_granularity(self) -> Option<DateGranularity> {
        match self {
            Self::Level(granularity) => Some(granularity),
            Self::Raw | Self::Part(_) => None,
        }
    }
}
