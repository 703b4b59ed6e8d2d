use indexmap::IndexMap;

use crate::core::{Axis, ChartType};

use super::binding::{Aggregate, ChartBinding, DimensionRef, FieldRef, MeasureRef};

/// Header of the synthetic constant measure of dimension-only charts.
pub const FAKE_MEASURE: &str = "__VALUE__";

/// Where the synthetic measure lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakePlacement {
    Axis(Axis),
    /// Both axes carry dimensions: the measure only sizes elements.
    Element,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeMeasure {
    pub value: f64,
    pub placement: FakePlacement,
}

/// Binding refs split into ordered dimension and measure lists.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Decomposition {
    pub x_dims: Vec<DimensionRef>,
    pub x_measures: Vec<MeasureRef>,
    pub y_dims: Vec<DimensionRef>,
    pub y_measures: Vec<MeasureRef>,
    /// Measure drawn by elements without sitting on an axis.
    pub element_measures: Vec<MeasureRef>,
    /// Field name to display label.
    pub labels: IndexMap<String, String>,
    pub fake: Option<FakeMeasure>,
}

impl Decomposition {
    /// Walks the x and y refs once, classifying each.
    #[must_use]
    pub fn new(binding: &ChartBinding, chart_type: ChartType) -> Self {
        let mut decomposition = Self::default();
        for (axis, refs) in [(Axis::X, &binding.x), (Axis::Y, &binding.y)] {
            for field in refs {
                match field {
                    FieldRef::Dimension(dimension) => {
                        decomposition.label(dimension.full_name(), dimension.display_label());
                        decomposition.dims_mut(axis).push(dimension.clone());
                    }
                    FieldRef::Measure(measure) => {
                        decomposition.label(&measure.full_name(), &measure.display_label());
                        decomposition.measures_mut(axis).push(measure.clone());
                    }
                }
            }
        }
        for measure in family_measures(binding) {
            decomposition.label(&measure.full_name(), &measure.display_label());
        }

        let has_dims = !decomposition.x_dims.is_empty() || !decomposition.y_dims.is_empty();
        let has_measures = !decomposition.x_measures.is_empty()
            || !decomposition.y_measures.is_empty()
            || !family_measures(binding).is_empty();
        if has_dims && !has_measures && chart_type.requires_magnitude() {
            decomposition.inject_fake(chart_type);
        }
        decomposition
    }

    fn inject_fake(&mut self, chart_type: ChartType) {
        let placement = if self.y_dims.is_empty() {
            FakePlacement::Axis(Axis::Y)
        } else if self.x_dims.is_empty() {
            FakePlacement::Axis(Axis::X)
        } else {
            FakePlacement::Element
        };
        let measure = MeasureRef::new(FAKE_MEASURE, Aggregate::None);
        match placement {
            FakePlacement::Axis(axis) => self.measures_mut(axis).push(measure),
            FakePlacement::Element => self.element_measures.push(measure),
        }
        self.fake = Some(FakeMeasure {
            value: chart_type.fake_value(),
            placement,
        });
    }

    fn label(&mut self, field: &str, label: &str) {
        self.labels
            .entry(field.to_owned())
            .or_insert_with(|| label.to_owned());
    }

    fn dims_mut(&mut self, axis: Axis) -> &mut Vec<DimensionRef> {
        match axis {
            Axis::X => &mut self.x_dims,
            Axis::Y => &mut self.y_dims,
        }
    }

    fn measures_mut(&mut self, axis: Axis) -> &mut Vec<MeasureRef> {
        match axis {
            Axis::X => &mut self.x_measures,
            Axis::Y => &mut self.y_measures,
        }
    }

    #[must_use]
    pub fn dims(&self, axis: Axis) -> &[DimensionRef] {
        match axis {
            Axis::X => &self.x_dims,
            Axis::Y => &self.y_dims,
        }
    }

    #[must_use]
    pub fn measures(&self, axis: Axis) -> &[MeasureRef] {
        match axis {
            Axis::X => &self.x_measures,
            Axis::Y => &self.y_measures,
        }
    }

    /// Axis carrying the values: y unless only x has measures.
    #[must_use]
    pub fn value_axis(&self) -> Axis {
        if self.y_measures.is_empty() && !self.x_measures.is_empty() {
            Axis::X
        } else {
            Axis::Y
        }
    }

    /// Measures drawn as element values: value-axis measures, or the
    /// element-only synthetic measure.
    #[must_use]
    pub fn value_measures(&self) -> &[MeasureRef] {
        let on_axis = self.measures(self.value_axis());
        if on_axis.is_empty() {
            &self.element_measures
        } else {
            on_axis
        }
    }

    /// Every measure in x, y, element order.
    pub fn all_measures(&self) -> impl Iterator<Item = &MeasureRef> {
        self.x_measures
            .iter()
            .chain(&self.y_measures)
            .chain(&self.element_measures)
    }

    /// Position dimensions, x before y, each outer to inner.
    pub fn position_dims(&self) -> impl Iterator<Item = &DimensionRef> {
        self.x_dims.iter().chain(&self.y_dims)
    }

    /// Innermost dimension of the category axis.
    #[must_use]
    pub fn innermost_dim(&self) -> Option<&DimensionRef> {
        let category = match self.value_axis() {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        };
        self.dims(category)
            .last()
            .or_else(|| self.dims(self.value_axis()).last())
    }

    #[must_use]
    pub fn label_of(&self, field: &str) -> String {
        self.labels
            .get(field)
            .cloned()
            .unwrap_or_else(|| field.to_owned())
    }
}

fn family_measures(binding: &ChartBinding) -> Vec<&MeasureRef> {
    let mut measures = Vec::new();
    if let Some(ohlc) = &binding.ohlc {
        measures.extend(ohlc.measures());
    }
    if let Some(interval) = &binding.interval {
        measures.push(&interval.start);
        measures.push(&interval.end);
        measures.extend(interval.milestone.as_ref());
    }
    measures
}

#[cfg(test)]
mod tests {
    use super::{Decomposition, FAKE_MEASURE, FakePlacement};
    use crate::api::binding::{Aggregate, ChartBinding, FieldRef};
    use crate::core::{Axis, ChartType};

    #[test]
    fn classifies_refs_per_axis() {
        let binding = ChartBinding::new(ChartType::Bar)
            .with_x(FieldRef::dimension("Region"))
            .with_x(FieldRef::dimension("Product"))
            .with_y(FieldRef::measure("Sales", Aggregate::Sum));
        let decomposition = Decomposition::new(&binding, ChartType::Bar);
        assert_eq!(decomposition.x_dims.len(), 2);
        assert_eq!(decomposition.y_measures[0].full_name(), "Sum(Sales)");
        assert_eq!(decomposition.value_axis(), Axis::Y);
        assert_eq!(
            decomposition.innermost_dim().map(|d| d.column.as_str()),
            Some("Product")
        );
        assert!(decomposition.fake.is_none());
    }

    #[test]
    fn dimension_only_binding_gets_fake_measure() {
        let binding = ChartBinding::new(ChartType::DotPlot).with_x(FieldRef::dimension("Region"));
        let decomposition = Decomposition::new(&binding, ChartType::DotPlot);
        let fake = decomposition.fake.expect("fake measure");
        assert_eq!(fake.value, 0.0);
        assert_eq!(fake.placement, FakePlacement::Axis(Axis::Y));
        assert_eq!(decomposition.y_measures[0].full_name(), FAKE_MEASURE);
    }

    #[test]
    fn both_axes_dimensions_keep_fake_off_axis() {
        let binding = ChartBinding::new(ChartType::Point)
            .with_x(FieldRef::dimension("Region"))
            .with_y(FieldRef::dimension("Product"));
        let decomposition = Decomposition::new(&binding, ChartType::Point);
        assert_eq!(
            decomposition.fake.as_ref().map(|fake| fake.placement),
            Some(FakePlacement::Element)
        );
        assert!(decomposition.y_measures.is_empty());
        assert_eq!(decomposition.value_measures().len(), 1);
    }

    #[test]
    fn relation_charts_need_no_magnitude() {
        let binding = ChartBinding::new(ChartType::Network).with_x(FieldRef::dimension("From"));
        assert!(Decomposition::new(&binding, ChartType::Network).fake.is_none());
    }
}
