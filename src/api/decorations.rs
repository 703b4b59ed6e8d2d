use std::ops::Range;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::core::primitives::{finite_values, percentile, sorted_finite};
use crate::core::{
    Axis, Channel, ChartType, Coordinate, Decoration, GeneratorKind, LineStyle, ScaleDomain,
    ScaleSet, TargetLine, TargetStrategy, TrendFit, TrendLine, VisualValue,
};
use crate::dataset::{DataSource, require_column};
use crate::error::ChartResult;

use super::binding::{AestheticRef, MeasureRef};
use super::context::GenerationContext;
use super::element_builder::PaneLayout;
use super::frame_resolver::FrameResolver;
use super::scale_builder::AxisScales;

/// Graph-level reference lines, trends and bands.
pub(crate) fn build_decorations<'a>(
    ctx: &GenerationContext<'a>,
    scales: &ScaleSet,
    coordinate: &Coordinate,
    panes: &[(PaneLayout, AxisScales)],
    resolver: &mut FrameResolver<'_, 'a>,
) -> ChartResult<Vec<Decoration>> {
    let mut decorations = Vec::new();
    let cartesian = !coordinate.is_polar()
        && !matches!(ctx.kind, GeneratorKind::Map | GeneratorKind::Hierarchy);

    if cartesian {
        if let Some(rect) = coordinate.innermost_rect() {
            decorations.push(Decoration::GridLines {
                x: rect.x_axis.grid_visible,
                y: rect.y_axis.grid_visible,
            });
        }
    }

    if let Some((_, AxisScales { x: Some(x), y: Some(y) })) = panes.first() {
        let plot = &ctx.style.plot;
        if cartesian && plot.quadrant_lines {
            let midpoint = |id| match scales.get(id).map(|scale| scale.domain()) {
                Some(ScaleDomain::Continuous(linear)) => Some(linear.midpoint()),
                _ => None,
            };
            match (midpoint(*x), midpoint(*y)) {
                (Some(x), Some(y)) => decorations.push(Decoration::QuadrantLines { x, y }),
                _ => warn!("quadrant lines need continuous domains on both axes"),
            }
        }
        if cartesian && plot.diagonal_line {
            decorations.push(Decoration::DiagonalLine {
                x_scale: *x,
                y_scale: *y,
            });
        }
    }

    if cartesian {
        if let Some(style) = &ctx.style.trend {
            for (pane, _) in panes {
                for measure in &pane.measures {
                    let trends = trend_lines(ctx, scales, resolver, measure, style.fit, pane.pane)?;
                    for trend in trends {
                        decorations.push(Decoration::Trend(TrendLine {
                            color: style.color.unwrap_or(trend.color),
                            line: style.line,
                            ..trend
                        }));
                    }
                }
            }
        }
    }

    let targets_allowed = ctx.chart_type != ChartType::BoxPlot
        && !matches!(ctx.kind, GeneratorKind::Map | GeneratorKind::Hierarchy);
    if targets_allowed {
        for target in &ctx.style.targets {
            for measure in ctx.decomposition.value_measures() {
                let name = measure.full_name();
                let applies = target
                    .measure
                    .as_deref()
                    .is_none_or(|wanted| wanted == name || wanted == measure.column);
                if !applies {
                    continue;
                }
                let col = require_column(&*ctx.data, &name)?;
                let values = finite_values(rows(ctx).map(|row| ctx.data.value(col, row)));
                match target_value(target.strategy, values) {
                    Some(value) => decorations.push(Decoration::Target(TargetLine {
                        measure: name,
                        strategy: target.strategy,
                        value,
                        label: target.label.clone(),
                        color: target.color,
                    })),
                    None => warn!(measure = %name, "target skipped, measure has no values"),
                }
            }
        }
    }

    if let Some(banding) = &ctx.style.banding {
        decorations.push(Decoration::Banding {
            axis: banding.axis,
            colors: banding.colors.clone(),
        });
    }
    debug!(decorations = decorations.len(), "decorations built");
    Ok(decorations)
}

/// Rows the primary elements draw: the brushed subset while brushing.
fn rows(ctx: &GenerationContext<'_>) -> Range<usize> {
    match &ctx.brush {
        Some(brush) => brush.brushed.clone(),
        None => 0..ctx.data.row_count(),
    }
}

fn target_value(strategy: TargetStrategy, values: impl Iterator<Item = f64>) -> Option<f64> {
    if let TargetStrategy::Fixed(value) = strategy {
        return Some(value);
    }
    let sorted = sorted_finite(values);
    let (first, last) = (sorted.first().copied()?, sorted.last().copied()?);
    match strategy {
        TargetStrategy::Fixed(value) => Some(value),
        TargetStrategy::Average => Some(sorted.iter().sum::<f64>() / sorted.len() as f64),
        TargetStrategy::Min => Some(first),
        TargetStrategy::Max => Some(last),
        TargetStrategy::Median => percentile(&sorted, 50.0),
        TargetStrategy::Percentile(percent) => percentile(&sorted, percent),
    }
}

/// One trend per measure, or per color group when trends split by color.
fn trend_lines<'a>(
    ctx: &GenerationContext<'a>,
    scales: &ScaleSet,
    resolver: &mut FrameResolver<'_, 'a>,
    measure: &MeasureRef,
    fit: TrendFit,
    pane: usize,
) -> ChartResult<Vec<TrendLine>> {
    let data: &dyn DataSource = &*ctx.data;
    let name = measure.full_name();
    let y_col = require_column(data, &name)?;

    let x_field = if ctx.binding.has_xy_measures() {
        let category_axis = match ctx.decomposition.value_axis() {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        };
        ctx.decomposition
            .measures(category_axis)
            .first()
            .map(MeasureRef::full_name)
    } else {
        ctx.decomposition.innermost_dim().map(|dim| dim.column.clone())
    };
    let x_scale = x_field.as_deref().and_then(|field| scales.scale_for(field));
    let continuous_x =
        x_scale.is_some_and(|scale| matches!(scale.domain(), ScaleDomain::Continuous(_)));
    let x_col = x_field
        .as_deref()
        .map(|field| require_column(data, field))
        .transpose()?;

    let group_col = match ctx.binding.aesthetics.get(Channel::Color) {
        Some(AestheticRef::Dimension(dim)) if ctx.style.plot.trend_per_color => {
            Some(require_column(data, &dim.column)?)
        }
        _ => None,
    };

    // group label -> (first row, points)
    let mut groups: IndexMap<Option<String>, (usize, Vec<(f64, f64)>)> = IndexMap::new();
    for row in rows(ctx) {
        let Some(y) = data.value(y_col, row).as_f64() else {
            continue;
        };
        let x = match (x_col, x_scale) {
            (Some(col), Some(scale)) if !continuous_x => scale.map(&data.value(col, row)),
            (Some(col), _) => data.value(col, row).as_position(),
            (None, _) => Some(row as f64),
        };
        let Some(x) = x else {
            continue;
        };
        let group = group_col.map(|col| data.value(col, row).label());
        groups
            .entry(group)
            .or_insert_with(|| (row, Vec::new()))
            .1
            .push((x, y));
    }

    let color_frame = resolver.color_frame(measure);
    let base_color = resolver.measure_color(measure);
    let mut trends = Vec::new();
    for (group, (first_row, points)) in groups {
        let Some((intercept, slope)) = least_squares(&points, fit) else {
            warn!(measure = %name, ?group, "trend skipped, not enough distinct points");
            continue;
        };
        let color = match (&group, &color_frame) {
            (Some(_), Some(frame)) => frame
                .evaluate(data, first_row, Some(&name))
                .as_ref()
                .and_then(VisualValue::as_color)
                .unwrap_or(base_color),
            _ => base_color,
        };
        trends.push(TrendLine {
            measure: name.clone(),
            x_field: x_field.clone().filter(|_| continuous_x),
            fit,
            intercept,
            slope,
            color,
            line: LineStyle::Dash,
            group,
            pane,
        });
    }
    Ok(trends)
}

/// Least-squares `(intercept, slope)` in the fit's transformed space.
///
/// Points outside the transform's domain are dropped; fewer than two
/// points or zero x variance yield `None`.
pub(crate) fn least_squares(points: &[(f64, f64)], fit: TrendFit) -> Option<(f64, f64)> {
    let transformed: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|&(x, y)| match fit {
            TrendFit::Linear => Some((x, y)),
            TrendFit::Exponential => (y > 0.0).then(|| (x, y.ln())),
            TrendFit::Logarithmic => (x > 0.0).then(|| (x.ln(), y)),
            TrendFit::Power => (x > 0.0 && y > 0.0).then(|| (x.ln(), y.ln())),
        })
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if transformed.len() < 2 {
        return None;
    }
    let n = transformed.len() as f64;
    let mean_x = transformed.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = transformed.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (sxx, sxy) = transformed.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        let dx = x - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some((mean_y - slope * mean_x, slope))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{least_squares, target_value};
    use crate::core::{TargetStrategy, TrendFit};

    #[test]
    fn linear_fit_recovers_line() {
        let points = [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)];
        let (intercept, slope) = least_squares(&points, TrendFit::Linear).expect("fit");
        assert_relative_eq!(intercept, 1.0, epsilon = 1e-12);
        assert_relative_eq!(slope, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn exponential_fit_works_in_log_space() {
        let points: Vec<(f64, f64)> = (0..5)
            .map(|x| (f64::from(x), 2.0 * (0.5 * f64::from(x)).exp()))
            .collect();
        let (intercept, slope) = least_squares(&points, TrendFit::Exponential).expect("fit");
        assert_relative_eq!(intercept.exp(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(slope, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn vertical_points_have_no_fit() {
        assert!(least_squares(&[(1.0, 1.0), (1.0, 4.0)], TrendFit::Linear).is_none());
        assert!(least_squares(&[(1.0, 1.0)], TrendFit::Linear).is_none());
    }

    #[test]
    fn target_strategies() {
        let values = || [4.0, 1.0, 3.0, 2.0].into_iter();
        assert_eq!(target_value(TargetStrategy::Average, values()), Some(2.5));
        assert_eq!(target_value(TargetStrategy::Median, values()), Some(2.5));
        assert_eq!(target_value(TargetStrategy::Max, values()), Some(4.0));
        assert_eq!(target_value(TargetStrategy::Fixed(9.0), std::iter::empty()), Some(9.0));
        assert_eq!(target_value(TargetStrategy::Min, std::iter::empty()), None);
    }
}
