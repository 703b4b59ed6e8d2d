use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

/// Stable reason codes for configuration errors.
///
/// Codes are part of the public contract: hosts match on them to show
/// localized messages, so existing codes must never be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingErrorReason {
    /// Two bound measures resolve to chart types from different families.
    IncompatibleTypes,
    /// More than one measure is bound to a waterfall chart.
    MeasureForWaterfall,
    /// Both axes carry measures for a chart family that cannot plot them.
    XyMeasures,
    /// A measure is bound where only a dimension is legal.
    MeasureNotAllowed,
    /// A chart family is missing a binding it cannot be drawn without.
    MissingBinding,
    /// The chart family caps the number of measures.
    TooManyMeasures,
}

impl BindingErrorReason {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::IncompatibleTypes => "incompatible_types",
            Self::MeasureForWaterfall => "measure_for_waterfall",
            Self::XyMeasures => "xy_measures",
            Self::MeasureNotAllowed => "measure_not_allowed",
            Self::MissingBinding => "missing_binding",
            Self::TooManyMeasures => "too_many_measures",
        }
    }
}

impl fmt::Display for BindingErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid chart binding ({reason}): {message}")]
    InvalidBinding {
        reason: BindingErrorReason,
        message: String,
    },

    #[error("column not found: {column}")]
    ColumnNotFound { column: String },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid style: {0}")]
    InvalidStyle(String),
}

impl ChartError {
    pub(crate) fn binding(reason: BindingErrorReason, message: impl Into<String>) -> Self {
        Self::InvalidBinding {
            reason,
            message: message.into(),
        }
    }

    pub(crate) fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Returns the configuration reason code, if this is a binding error.
    #[must_use]
    pub fn reason(&self) -> Option<BindingErrorReason> {
        match self {
            Self::InvalidBinding { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::InvalidBinding { .. } | Self::InvalidStyle(_))
    }
}
