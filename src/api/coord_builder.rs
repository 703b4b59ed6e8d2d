use tracing::trace;

use crate::core::{
    AxisVisual, ChartType, Color, Coordinate, FacetCoord, FacetNesting, GeoCoord, PolarCoord,
    PolarProjection, RectCoord, ScaleId, ScaleKind, ScaleSet, grid_visible,
};

use super::scale_builder::AxisScales;
use super::style::{AxisDescriptor, StyleDescriptor};

/// What sits at the bottom of the coordinate tree.
#[derive(Debug, Clone)]
pub(crate) enum InnerCoord {
    /// Axes carry the given value scales; free axes take the innermost
    /// dimension. `Angle` upgrades to `AngleRadius` when a dimension is
    /// consumed.
    Rect {
        axes: AxisScales,
        polar: Option<PolarProjection>,
    },
    Geo(GeoCoord),
    /// Layout owned by the renderer (hierarchies, networks).
    Structural,
}

/// Built tree and the split of position dimensions it implies.
#[derive(Debug, Clone)]
pub(crate) struct CoordLayout {
    pub coordinate: Coordinate,
    /// Dimensions drawn as facet layers, outer to inner.
    pub facet_dims: Vec<String>,
    /// Dimensions absorbed by the innermost coordinate.
    pub consumed_dims: Vec<String>,
}

/// Axis titles picked for fields bound to the innermost coordinate.
pub(crate) type TitleLookup<'a> = &'a dyn Fn(&str) -> String;

/// Builds one coordinate tree.
///
/// The innermost coordinate takes the value scales, or else the last
/// dimension of each axis. Remaining dimensions pop from the inner end and
/// each pop wraps the tree in a facet layer, so nesting depth equals the
/// longer list of unconsumed dimensions.
pub(crate) fn build_tree(
    scales: &mut ScaleSet,
    style: &StyleDescriptor,
    chart_type: ChartType,
    x_dims: &[String],
    y_dims: &[String],
    inner: InnerCoord,
    title_of: TitleLookup<'_>,
) -> CoordLayout {
    let mut x_rest = x_dims.to_vec();
    let mut y_rest = y_dims.to_vec();
    let mut consumed = Vec::new();

    let mut coordinate = match inner {
        InnerCoord::Rect { axes, polar } => {
            let mut take = |value: Option<ScaleId>, rest: &mut Vec<String>| match value {
                Some(id) => Some((id, None)),
                None => rest.pop().and_then(|field| {
                    let id = scales.id_for(&field)?;
                    consumed.push(field.clone());
                    Some((id, Some(field)))
                }),
            };
            let x = take(axes.x, &mut x_rest);
            let y = take(axes.y, &mut y_rest);
            let x_title = bound_title(scales, x.as_ref(), title_of);
            let y_title = bound_title(scales, y.as_ref(), title_of);
            let dim_consumed = [&x, &y]
                .into_iter()
                .any(|bound| bound.as_ref().is_some_and(|(_, field)| field.is_some()));

            let mut scale_of = |bound: &Option<(ScaleId, Option<String>)>| match bound {
                Some((id, _)) => *id,
                None => scales.push_fake(ScaleKind::categorical()),
            };
            let x_id = scale_of(&x);
            let y_id = scale_of(&y);
            let mut rect = RectCoord::new(x_id, y_id);
            rect.x_axis = axis_visual(
                &style.x_axis,
                y.is_some().then_some(style.y_axis.line_visible),
                x_title,
            );
            rect.y_axis = axis_visual(
                &style.y_axis,
                x.is_some().then_some(style.x_axis.line_visible),
                y_title,
            );
            rect.depth = chart_type.is_3d();
            match polar {
                Some(PolarProjection::Angle) if dim_consumed => Coordinate::Polar(PolarCoord {
                    rect,
                    projection: PolarProjection::AngleRadius,
                }),
                Some(projection) => Coordinate::Polar(PolarCoord { rect, projection }),
                None => Coordinate::Rect(rect),
            }
        }
        InnerCoord::Geo(geo) => Coordinate::Geo(geo),
        InnerCoord::Structural => {
            let x = scales.push_fake(ScaleKind::categorical());
            let y = scales.push_fake(ScaleKind::categorical());
            let mut rect = RectCoord::new(x, y);
            rect.x_axis = AxisVisual::structural(false, Color::GRAY);
            rect.y_axis = AxisVisual::structural(false, Color::GRAY);
            Coordinate::Rect(rect)
        }
    };
    let facet_dims: Vec<String> = x_rest.iter().chain(&y_rest).cloned().collect();

    while !x_rest.is_empty() || !y_rest.is_empty() {
        let x = x_rest.pop();
        let y = y_rest.pop();
        let nesting = match (&x, &y) {
            (Some(_), Some(_)) => FacetNesting::Grid,
            (Some(_), None) => FacetNesting::Horizontal,
            (None, _) => FacetNesting::Vertical,
        };
        let outer = outer_layer(scales, &coordinate, x.as_deref(), y.as_deref());
        trace!(?nesting, x = ?x, y = ?y, "facet layer");
        coordinate = Coordinate::Facet(FacetCoord {
            outer,
            inners: vec![coordinate],
            nesting,
        });
    }

    CoordLayout {
        coordinate,
        facet_dims,
        consumed_dims: consumed,
    }
}

/// Wraps one tree per measure under a structural facet, stacked along the
/// value axis.
pub(crate) fn separate_panes(
    scales: &mut ScaleSet,
    panes: Vec<Coordinate>,
    nesting: FacetNesting,
) -> Coordinate {
    let x = scales.push_fake(ScaleKind::categorical());
    let y = scales.push_fake(ScaleKind::categorical());
    let mut outer = RectCoord::new(x, y);
    outer.x_axis = AxisVisual::structural(false, Color::GRAY);
    outer.y_axis = AxisVisual::structural(false, Color::GRAY);
    Coordinate::Facet(FacetCoord {
        outer,
        inners: panes,
        nesting,
    })
}

fn bound_title(
    scales: &ScaleSet,
    bound: Option<&(ScaleId, Option<String>)>,
    title_of: TitleLookup<'_>,
) -> Option<String> {
    let (id, field) = bound?;
    match field {
        Some(field) => Some(title_of(field)),
        None => scales
            .get(*id)
            .and_then(|scale| scale.fields().first())
            .map(|field| title_of(field)),
    }
}

fn axis_visual(
    descriptor: &AxisDescriptor,
    orthogonal_line_visible: Option<bool>,
    fallback_title: Option<String>,
) -> AxisVisual {
    AxisVisual {
        line_visible: descriptor.line_visible,
        line_color: descriptor.line_color,
        grid_visible: grid_visible(descriptor.line_visible, orthogonal_line_visible),
        labels_visible: descriptor.labels_visible,
        title: descriptor.title.clone().or(fallback_title),
        format: descriptor.format.clone(),
    }
}

/// Structural facet layer whose lines copy the nearest visible line of the
/// layer it wraps.
fn outer_layer(
    scales: &mut ScaleSet,
    wrapped: &Coordinate,
    x_field: Option<&str>,
    y_field: Option<&str>,
) -> RectCoord {
    let mut id_for = |field: Option<&str>| {
        field
            .and_then(|field| scales.id_for(field))
            .unwrap_or_else(|| scales.push_fake(ScaleKind::categorical()))
    };
    let x = id_for(x_field);
    let y = id_for(y_field);

    let adjacent = adjacent_rect(wrapped);
    let line = |own: Option<&AxisVisual>, other: Option<&AxisVisual>| {
        own.filter(|axis| axis.line_visible)
            .or_else(|| other.filter(|axis| axis.line_visible))
            .map_or((false, Color::GRAY), |axis| (true, axis.line_color))
    };
    let (x_line, x_color) = line(
        adjacent.map(|rect| &rect.x_axis),
        adjacent.map(|rect| &rect.y_axis),
    );
    let (y_line, y_color) = line(
        adjacent.map(|rect| &rect.y_axis),
        adjacent.map(|rect| &rect.x_axis),
    );

    let mut outer = RectCoord::new(x, y);
    outer.x_axis = AxisVisual::structural(x_line, x_color);
    outer.y_axis = AxisVisual::structural(y_line, y_color);
    outer.x_axis.labels_visible = x_field.is_some();
    outer.y_axis.labels_visible = y_field.is_some();
    outer
}

fn adjacent_rect(coordinate: &Coordinate) -> Option<&RectCoord> {
    match coordinate {
        Coordinate::Rect(rect) => Some(rect),
        Coordinate::Polar(polar) => Some(&polar.rect),
        Coordinate::Facet(facet) => Some(&facet.outer),
        Coordinate::Geo(_) => None,
    }
}
