use serde::{Deserialize, Serialize};

use crate::core::{Color, ScaleId};

/// Visual properties of one axis of a rectangular coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisVisual {
    pub line_visible: bool,
    pub line_color: Color,
    pub grid_visible: bool,
    pub labels_visible: bool,
    pub title: Option<String>,
    pub format: Option<String>,
}

impl AxisVisual {
    /// Structural axis of an outer facet layer: no labels, no grid.
    #[must_use]
    pub fn structural(line_visible: bool, line_color: Color) -> Self {
        Self {
            line_visible,
            line_color,
            grid_visible: false,
            labels_visible: true,
            title: None,
            format: None,
        }
    }
}

impl Default for AxisVisual {
    fn default() -> Self {
        Self {
            line_visible: true,
            line_color: Color::GRAY,
            grid_visible: false,
            labels_visible: true,
            title: None,
            format: None,
        }
    }
}

/// Grid rule: follow the orthogonal axis line when there is one, otherwise
/// this axis' own line.
#[must_use]
pub fn grid_visible(own_line_visible: bool, orthogonal_line_visible: Option<bool>) -> bool {
    orthogonal_line_visible.unwrap_or(own_line_visible)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectCoord {
    pub x: ScaleId,
    pub y: ScaleId,
    pub x_axis: AxisVisual,
    pub y_axis: AxisVisual,
    /// 2.5D projection used by 3D bar and pie types.
    pub depth: bool,
}

impl RectCoord {
    #[must_use]
    pub fn new(x: ScaleId, y: ScaleId) -> Self {
        Self {
            x,
            y,
            x_axis: AxisVisual::default(),
            y_axis: AxisVisual::default(),
            depth: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolarProjection {
    /// Values map to angle only (plain pie).
    Angle,
    /// Values map to angle, a dimension or size maps to radius.
    AngleRadius,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarCoord {
    pub rect: RectCoord,
    pub projection: PolarProjection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacetNesting {
    Horizontal,
    Vertical,
    Grid,
}

/// Outer structural layer wrapping one or more inner coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetCoord {
    pub outer: RectCoord,
    pub inners: Vec<Coordinate>,
    pub nesting: FacetNesting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCoord {
    pub longitude: ScaleId,
    pub latitude: ScaleId,
    /// Field naming the region each row belongs to.
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Coordinate {
    Rect(RectCoord),
    Polar(PolarCoord),
    Facet(FacetCoord),
    Geo(GeoCoord),
}

impl Coordinate {
    /// First inner coordinate of a facet.
    #[must_use]
    pub fn inner(&self) -> Option<&Coordinate> {
        match self {
            Self::Facet(facet) => facet.inners.first(),
            Self::Rect(_) | Self::Polar(_) | Self::Geo(_) => None,
        }
    }

    /// Number of nested facet levels along the first-inner path.
    #[must_use]
    pub fn facet_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Some(inner) = current.inner() {
            depth += 1;
            current = inner;
        }
        depth
    }

    /// Deepest non-facet coordinate along the first-inner path.
    #[must_use]
    pub fn innermost(&self) -> &Coordinate {
        let mut current = self;
        while let Some(inner) = current.inner() {
            current = inner;
        }
        current
    }

    /// The rectangular coordinate carrying the real axis visuals.
    #[must_use]
    pub fn innermost_rect(&self) -> Option<&RectCoord> {
        match self.innermost() {
            Self::Rect(rect) => Some(rect),
            Self::Polar(polar) => Some(&polar.rect),
            Self::Facet(_) | Self::Geo(_) => None,
        }
    }

    #[must_use]
    pub fn is_polar(&self) -> bool {
        matches!(self.innermost(), Self::Polar(_))
    }

    /// Every scale referenced anywhere in the tree.
    #[must_use]
    pub fn scale_ids(&self) -> Vec<ScaleId> {
        let mut ids = Vec::new();
        self.collect_scales(&mut ids);
        ids
    }

    fn collect_scales(&self, ids: &mut Vec<ScaleId>) {
        match self {
            Self::Rect(rect) => ids.extend([rect.x, rect.y]),
            Self::Polar(polar) => ids.extend([polar.rect.x, polar.rect.y]),
            Self::Facet(facet) => {
                ids.extend([facet.outer.x, facet.outer.y]);
                for inner in &facet.inners {
                    inner.collect_scales(ids);
                }
            }
            Self::Geo(geo) => ids.extend([geo.longitude, geo.latitude]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::grid_visible;

    #[test]
    fn grid_follows_orthogonal_line_when_bound() {
        assert!(grid_visible(false, Some(true)));
        assert!(!grid_visible(true, Some(false)));
        assert!(grid_visible(true, None));
        assert!(!grid_visible(false, None));
    }
}
