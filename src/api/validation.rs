use crate::core::{Channel, ChartFamily, ChartType};
use crate::error::{BindingErrorReason, ChartError, ChartResult};

use super::binding::{AestheticRef, ChartBinding, FieldRef};

/// Effective chart type of the binding: `Auto` resolved, stacking toggle
/// applied.
#[must_use]
pub fn resolve_chart_type(binding: &ChartBinding, stack_values: bool) -> ChartType {
    let resolved = binding.chart_type.resolve_auto(binding.has_xy_measures());
    if stack_values {
        stacked_variant(resolved)
    } else {
        resolved
    }
}

fn stacked_variant(chart_type: ChartType) -> ChartType {
    match chart_type {
        ChartType::Bar => ChartType::StackBar,
        ChartType::Bar3D => ChartType::StackBar3D,
        ChartType::Line => ChartType::StackLine,
        ChartType::Area => ChartType::StackArea,
        ChartType::Point => ChartType::StackPoint,
        other => other,
    }
}

/// Rejects binding combinations the chart family cannot draw.
///
/// Runs before any data is touched; failures carry a stable reason code.
pub fn validate_binding(binding: &ChartBinding, chart_type: ChartType) -> ChartResult<()> {
    let xy = binding.has_xy_measures();
    let axis_measures: Vec<_> = binding.x_measures().chain(binding.y_measures()).collect();

    let types: Vec<(String, ChartType)> = axis_measures
        .iter()
        .map(|measure| {
            (
                measure.full_name(),
                measure.effective_type(chart_type).resolve_auto(xy),
            )
        })
        .collect();
    for (index, (left_name, left)) in types.iter().enumerate() {
        for (right_name, right) in &types[index + 1..] {
            if !left.is_compatible(*right) {
                return Err(ChartError::binding(
                    BindingErrorReason::IncompatibleTypes,
                    format!(
                        "{left_name} ({left:?}) cannot share a chart with {right_name} ({right:?})"
                    ),
                ));
            }
        }
    }

    if chart_type == ChartType::Waterfall && axis_measures.len() > 1 {
        return Err(ChartError::binding(
            BindingErrorReason::MeasureForWaterfall,
            format!("waterfall takes one measure, {} bound", axis_measures.len()),
        ));
    }
    if let Some(max) = chart_type.max_measures() {
        if axis_measures.len() > max {
            return Err(ChartError::binding(
                BindingErrorReason::TooManyMeasures,
                format!("{chart_type:?} takes at most {max} measure(s)"),
            ));
        }
    }

    let unstacked_xy = xy && !types.iter().all(|(_, kind)| kind.supports_xy_measures());
    if unstacked_xy || (xy && chart_type.is_stacked()) {
        return Err(ChartError::binding(
            BindingErrorReason::XyMeasures,
            format!("{chart_type:?} cannot plot measures on both axes"),
        ));
    }

    for channel in [Channel::Shape, Channel::Texture] {
        let global = binding.aesthetics.get(channel);
        let per_measure = axis_measures
            .iter()
            .filter_map(|measure| measure.aesthetics.get(channel));
        if global.into_iter().chain(per_measure).any(AestheticRef::is_measure) {
            return Err(ChartError::binding(
                BindingErrorReason::MeasureNotAllowed,
                format!("{channel:?} only accepts dimensions"),
            ));
        }
    }

    validate_family_bindings(binding, chart_type)
}

fn validate_family_bindings(binding: &ChartBinding, chart_type: ChartType) -> ChartResult<()> {
    let missing = |what: &str| {
        Err(ChartError::binding(
            BindingErrorReason::MissingBinding,
            format!("{chart_type:?} requires {what}"),
        ))
    };
    match chart_type.family() {
        ChartFamily::Stock | ChartFamily::Candle if binding.ohlc.is_none() => {
            missing("open/high/low/close measures")
        }
        ChartFamily::Gantt if binding.interval.is_none() => missing("start and end measures"),
        ChartFamily::Cartesian
            if chart_type == ChartType::Interval && binding.interval.is_none() =>
        {
            missing("start and end measures")
        }
        ChartFamily::Map if binding.geo.is_none() => missing("a location binding"),
        ChartFamily::Contour if chart_type == ChartType::MapContour && binding.geo.is_none() => {
            missing("a location binding")
        }
        ChartFamily::Contour
            if chart_type == ChartType::ScatterContour && !binding.has_xy_measures() =>
        {
            missing("measures on both axes")
        }
        ChartFamily::Relation if binding.relation.is_none() => {
            missing("source and target dimensions")
        }
        ChartFamily::Waterfall | ChartFamily::Pareto | ChartFamily::BoxPlot
            if binding.axis_measure_count() == 0 =>
        {
            missing("a measure")
        }
        ChartFamily::Waterfall
            if binding
                .x
                .iter()
                .chain(&binding.y)
                .all(|field| matches!(field, FieldRef::Measure(_))) =>
        {
            missing("a category dimension")
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_chart_type, validate_binding};
    use crate::api::binding::{Aggregate, ChartBinding, FieldRef, MeasureRef};
    use crate::core::ChartType;
    use crate::error::BindingErrorReason;

    #[test]
    fn auto_resolves_from_binding_shape() {
        let bars = ChartBinding::new(ChartType::Auto)
            .with_x(FieldRef::dimension("Region"))
            .with_y(FieldRef::measure("Sales", Aggregate::Sum));
        assert_eq!(resolve_chart_type(&bars, false), ChartType::Bar);
        assert_eq!(resolve_chart_type(&bars, true), ChartType::StackBar);

        let scatter = ChartBinding::new(ChartType::Auto)
            .with_x(FieldRef::measure("Cost", Aggregate::Sum))
            .with_y(FieldRef::measure("Sales", Aggregate::Sum));
        assert_eq!(resolve_chart_type(&scatter, false), ChartType::Point);
    }

    #[test]
    fn stacked_bars_reject_measures_on_both_axes() {
        let binding = ChartBinding::new(ChartType::StackBar)
            .with_x(FieldRef::measure("Cost", Aggregate::Sum))
            .with_y(FieldRef::measure("Sales", Aggregate::Sum));
        let err = validate_binding(&binding, ChartType::StackBar).expect_err("xy stack");
        assert_eq!(err.reason(), Some(BindingErrorReason::XyMeasures));
    }

    #[test]
    fn funnel_caps_measure_count() {
        let binding = ChartBinding::new(ChartType::Funnel)
            .with_x(FieldRef::dimension("Stage"))
            .with_y(FieldRef::Measure(MeasureRef::new("A", Aggregate::Sum)))
            .with_y(FieldRef::Measure(MeasureRef::new("B", Aggregate::Sum)));
        let err = validate_binding(&binding, ChartType::Funnel).expect_err("too many");
        assert_eq!(err.reason(), Some(BindingErrorReason::TooManyMeasures));
    }
}
