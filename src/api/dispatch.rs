use crate::core::{ChartFamily, ChartType, GeneratorKind};

use super::binding::ChartBinding;

/// Picks the generator variant from the binding's declared shape alone.
///
/// Radar, stock, candle, map and gantt charts ignore the `separated` flag;
/// separation applies only when at least two axis measures are bound.
#[must_use]
pub fn select_generator(binding: &ChartBinding, chart_type: ChartType) -> GeneratorKind {
    match chart_type.family() {
        ChartFamily::Radar => GeneratorKind::Radar,
        ChartFamily::Stock => GeneratorKind::Stock,
        ChartFamily::Candle => GeneratorKind::Candle,
        ChartFamily::Map => GeneratorKind::Map,
        ChartFamily::Contour if chart_type == ChartType::MapContour => GeneratorKind::Map,
        ChartFamily::Gantt => GeneratorKind::Gantt,
        ChartFamily::Hierarchy | ChartFamily::Relation => GeneratorKind::Hierarchy,
        ChartFamily::Cartesian
        | ChartFamily::Funnel
        | ChartFamily::Marimekko
        | ChartFamily::Pie
        | ChartFamily::BoxPlot
        | ChartFamily::Waterfall
        | ChartFamily::Pareto
        | ChartFamily::Contour
            if binding.separated && binding.axis_measure_count() >= 2 =>
        {
            GeneratorKind::Separated
        }
        ChartFamily::Cartesian
        | ChartFamily::Funnel
        | ChartFamily::Marimekko
        | ChartFamily::Pie
        | ChartFamily::BoxPlot
        | ChartFamily::Waterfall
        | ChartFamily::Pareto
        | ChartFamily::Contour => GeneratorKind::Merged,
    }
}

#[cfg(test)]
mod tests {
    use super::select_generator;
    use crate::api::binding::{Aggregate, ChartBinding, FieldRef};
    use crate::core::{ChartType, GeneratorKind};

    fn two_measures(chart_type: ChartType) -> ChartBinding {
        let mut binding = ChartBinding::new(chart_type)
            .with_x(FieldRef::dimension("Month"))
            .with_y(FieldRef::measure("Sales", Aggregate::Sum))
            .with_y(FieldRef::measure("Cost", Aggregate::Sum));
        binding.separated = true;
        binding
    }

    #[test]
    fn separated_needs_two_measures() {
        assert_eq!(
            select_generator(&two_measures(ChartType::Line), ChartType::Line),
            GeneratorKind::Separated
        );
        let mut single = ChartBinding::new(ChartType::Line)
            .with_y(FieldRef::measure("Sales", Aggregate::Sum));
        single.separated = true;
        assert_eq!(
            select_generator(&single, ChartType::Line),
            GeneratorKind::Merged
        );
    }

    #[test]
    fn radar_ignores_separated_flag() {
        assert_eq!(
            select_generator(&two_measures(ChartType::Radar), ChartType::Radar),
            GeneratorKind::Radar
        );
    }
}
