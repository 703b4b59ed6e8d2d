use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{DateGranularity, Value};
use crate::dataset::{DataSource, ValueComparator, require_column};
use crate::error::{ChartError, ChartResult};

/// Index of a scale inside its owning [`ScaleSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScaleId(usize);

impl ScaleId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Continuous numeric domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    domain_start: f64,
    domain_end: f64,
}

impl LinearScale {
    pub fn new(domain_start: f64, domain_end: f64) -> ChartResult<Self> {
        if !domain_start.is_finite() || !domain_end.is_finite() || domain_start == domain_end {
            return Err(ChartError::InvalidData(
                "scale domain must be finite and non-zero".to_owned(),
            ));
        }

        Ok(Self {
            domain_start,
            domain_end,
        })
    }

    /// Builds a domain from a data extent, widening degenerate extents.
    fn from_extent(min: f64, max: f64) -> ChartResult<Self> {
        if min == max {
            let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.5 };
            return Self::new(min - pad, max + pad);
        }
        Self::new(min, max)
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.domain_start, self.domain_end)
    }

    /// Position of `value` in `0..=1` across the domain.
    #[must_use]
    pub fn normalize(self, value: f64) -> f64 {
        let span = self.domain_end - self.domain_start;
        (value - self.domain_start) / span
    }

    #[must_use]
    pub fn midpoint(self) -> f64 {
        (self.domain_start + self.domain_end) / 2.0
    }
}

/// Configured scale variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScaleKind {
    /// Ordinal index per distinct value.
    Categorical {
        /// Overrides the data source comparator when set.
        comparator: Option<ValueComparator>,
    },
    Linear {
        log: bool,
        include_zero: bool,
    },
    Time {
        granularity: Option<DateGranularity>,
    },
}

impl ScaleKind {
    #[must_use]
    pub fn categorical() -> Self {
        Self::Categorical { comparator: None }
    }

    #[must_use]
    pub fn linear() -> Self {
        Self::Linear {
            log: false,
            include_zero: false,
        }
    }

    #[must_use]
    pub fn is_continuous(&self) -> bool {
        !matches!(self, Self::Categorical { .. })
    }
}

/// Stack composition: fields accumulated together per stacking group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackRange {
    pub fields: Vec<String>,
    /// Rows sharing these dimension values stack onto each other.
    pub group_by: Vec<String>,
    pub absolute: bool,
    pub negative_grouping: bool,
}

impl StackRange {
    pub fn add_field(&mut self, field: &str) {
        if !self.fields.iter().any(|existing| existing == field) {
            self.fields.push(field.to_owned());
        }
    }
}

/// Cumulative running sum over rows in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoRange {
    pub fields: Vec<String>,
}

/// Brushing wrapper: the inner range computed once over the brushed fields
/// and once over their `ALL_` mirrors, then unioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushRange {
    pub inner: Box<ScaleRange>,
    pub all_fields: Vec<String>,
}

/// How the fields sharing one scale combine into a domain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ScaleRange {
    #[default]
    Plain,
    Stack(StackRange),
    Pareto(ParetoRange),
    Brush(BrushRange),
}

impl ScaleRange {
    /// Fields of the stack range, looking through a brush wrapper.
    #[must_use]
    pub fn stack_fields(&self) -> Option<&[String]> {
        match self {
            Self::Stack(stack) => Some(&stack.fields),
            Self::Brush(brush) => brush.inner.stack_fields(),
            Self::Plain | Self::Pareto(_) => None,
        }
    }

    #[must_use]
    pub fn is_brushed(&self) -> bool {
        matches!(self, Self::Brush(_))
    }
}

/// Computed domain, filled by [`Scale::init`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ScaleDomain {
    #[default]
    Unset,
    Categories(Vec<Value>),
    Continuous(LinearScale),
}

/// Field-to-position mapping shared by every field bound to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    id: ScaleId,
    pub kind: ScaleKind,
    /// Fields mapped through this scale, in binding order.
    fields: Vec<String>,
    /// Fields scanned for the domain; adds `ALL_` mirrors while brushing.
    data_fields: Vec<String>,
    pub range: ScaleRange,
    /// Structural scale with no bound data.
    fake: bool,
    domain: ScaleDomain,
}

impl Scale {
    fn new(id: ScaleId, kind: ScaleKind) -> Self {
        Self {
            id,
            kind,
            fields: Vec::new(),
            data_fields: Vec::new(),
            range: ScaleRange::Plain,
            fake: false,
            domain: ScaleDomain::Unset,
        }
    }

    #[must_use]
    pub fn id(&self) -> ScaleId {
        self.id
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub fn data_fields(&self) -> &[String] {
        &self.data_fields
    }

    #[must_use]
    pub fn is_fake(&self) -> bool {
        self.fake
    }

    #[must_use]
    pub fn domain(&self) -> &ScaleDomain {
        &self.domain
    }

    #[must_use]
    pub fn is_log(&self) -> bool {
        matches!(self.kind, ScaleKind::Linear { log: true, .. })
    }

    fn add_field(&mut self, field: &str) {
        if !self.fields.iter().any(|existing| existing == field) {
            self.fields.push(field.to_owned());
        }
        self.add_data_field(field);
    }

    fn add_data_field(&mut self, field: &str) {
        if !self.data_fields.iter().any(|existing| existing == field) {
            self.data_fields.push(field.to_owned());
        }
    }

    /// Scans `source` once and fills the domain.
    ///
    /// Fake scales and scales whose fields have no values keep an unset
    /// domain; a missing column fails with `ColumnNotFound`.
    pub fn init(&mut self, source: &dyn DataSource) -> ChartResult<()> {
        if self.fake || self.data_fields.is_empty() {
            return Ok(());
        }
        let columns = self
            .data_fields
            .iter()
            .map(|field| require_column(source, field))
            .collect::<ChartResult<Vec<_>>>()?;

        self.domain = match &self.kind {
            ScaleKind::Categorical { comparator } => {
                let comparator = comparator
                    .clone()
                    .unwrap_or_else(|| source.comparator(columns[0]));
                ScaleDomain::Categories(distinct_values(source, &columns, &comparator))
            }
            ScaleKind::Linear { log, include_zero } => {
                let extent = self.value_extent(source)?;
                continuous_domain(extent, *log, *include_zero)?
            }
            ScaleKind::Time { .. } => continuous_domain(self.value_extent(source)?, false, false)?,
        };
        trace!(
            scale = self.id.index(),
            fields = ?self.fields,
            domain = ?self.domain,
            "scale initialized"
        );
        Ok(())
    }

    fn value_extent(&self, source: &dyn DataSource) -> ChartResult<Option<(f64, f64)>> {
        match &self.range {
            ScaleRange::Brush(brush) => {
                let brushed_fields: Vec<String> = self
                    .data_fields
                    .iter()
                    .filter(|field| !brush.all_fields.contains(field))
                    .cloned()
                    .collect();
                let brushed = range_extent(
                    source,
                    &brush.inner,
                    &resolve_fields(&brush.inner, &brushed_fields),
                )?;
                let all = range_extent(source, &brush.inner, &brush.all_fields)?;
                Ok(union_extent(brushed, all))
            }
            range => range_extent(source, range, &self.data_fields),
        }
    }

    /// Normalized `0..=1` position of a value; `None` before `init` or for
    /// values outside a categorical domain.
    #[must_use]
    pub fn map(&self, value: &Value) -> Option<f64> {
        match &self.domain {
            ScaleDomain::Unset => None,
            ScaleDomain::Categories(values) => {
                let label = value.label();
                let index = values.iter().position(|candidate| candidate.label() == label)?;
                Some((index as f64 + 0.5) / values.len() as f64)
            }
            ScaleDomain::Continuous(linear) => {
                let position = value.as_position()?;
                if self.is_log() {
                    let (start, end) = linear.domain();
                    if position <= 0.0 {
                        return Some(0.0);
                    }
                    Some((position.log10() - start.log10()) / (end.log10() - start.log10()))
                } else {
                    Some(linear.normalize(position))
                }
            }
        }
    }
}

/// Fields a brushed inner range keeps: for stacks the stack's own fields.
fn resolve_fields(inner: &ScaleRange, fallback: &[String]) -> Vec<String> {
    match inner {
        ScaleRange::Stack(stack) => stack.fields.clone(),
        ScaleRange::Pareto(pareto) => pareto.fields.clone(),
        ScaleRange::Plain | ScaleRange::Brush(_) => fallback.to_vec(),
    }
}

fn distinct_values(
    source: &dyn DataSource,
    columns: &[usize],
    comparator: &ValueComparator,
) -> Vec<Value> {
    let mut seen = BTreeSet::new();
    let mut values = Vec::new();
    for &col in columns {
        for row in 0..source.row_count() {
            let value = source.value(col, row);
            if value.is_null() {
                continue;
            }
            if seen.insert(value.label()) {
                values.push(value);
            }
        }
    }
    values.sort_by(|left, right| comparator.compare(left, right));
    values
}

fn continuous_domain(
    extent: Option<(f64, f64)>,
    log: bool,
    include_zero: bool,
) -> ChartResult<ScaleDomain> {
    let Some((mut min, mut max)) = extent else {
        return Ok(ScaleDomain::Unset);
    };
    if log {
        if max <= 0.0 {
            return LinearScale::new(1.0, 10.0).map(ScaleDomain::Continuous);
        }
        min = if min > 0.0 { min } else { max.min(1.0) };
        if min == max {
            return LinearScale::new(min / 10.0, max * 10.0).map(ScaleDomain::Continuous);
        }
    } else if include_zero {
        min = min.min(0.0);
        max = max.max(0.0);
    }
    LinearScale::from_extent(min, max).map(ScaleDomain::Continuous)
}

fn union_extent(left: Option<(f64, f64)>, right: Option<(f64, f64)>) -> Option<(f64, f64)> {
    match (left, right) {
        (Some((a_min, a_max)), Some((b_min, b_max))) => Some((a_min.min(b_min), a_max.max(b_max))),
        (Some(extent), None) | (None, Some(extent)) => Some(extent),
        (None, None) => None,
    }
}

fn range_extent(
    source: &dyn DataSource,
    range: &ScaleRange,
    fields: &[String],
) -> ChartResult<Option<(f64, f64)>> {
    let columns = fields
        .iter()
        .map(|field| require_column(source, field))
        .collect::<ChartResult<Vec<_>>>()?;
    let rows = 0..source.row_count();

    let mut extent: Option<(f64, f64)> = None;
    let mut include = |value: f64| {
        extent = Some(match extent {
            Some((min, max)) => (min.min(value), max.max(value)),
            None => (value, value),
        });
    };

    match range {
        ScaleRange::Plain | ScaleRange::Brush(_) => {
            for row in rows {
                for &col in &columns {
                    if let Some(value) = source.value(col, row).as_position() {
                        include(value);
                    }
                }
            }
        }
        ScaleRange::Stack(stack) => {
            let group_cols = stack
                .group_by
                .iter()
                .map(|field| require_column(source, field))
                .collect::<ChartResult<Vec<_>>>()?;
            // (positive total, negative total, running total) per stacking group
            let mut totals: IndexMap<Vec<String>, (f64, f64, f64)> = IndexMap::new();
            for row in rows {
                let key = group_cols
                    .iter()
                    .map(|&col| source.value(col, row).label())
                    .collect();
                let entry = totals.entry(key).or_insert((0.0, 0.0, 0.0));
                for &col in &columns {
                    let Some(mut value) = source.value(col, row).as_f64() else {
                        continue;
                    };
                    if stack.absolute {
                        value = value.abs();
                    }
                    if stack.negative_grouping {
                        if value >= 0.0 {
                            entry.0 += value;
                        } else {
                            entry.1 += value;
                        }
                    } else {
                        entry.2 += value;
                        include(entry.2);
                    }
                }
            }
            for (positive, negative, _) in totals.into_values() {
                if stack.negative_grouping {
                    include(positive);
                    include(negative);
                } else {
                    include(0.0);
                }
            }
        }
        ScaleRange::Pareto(_) => {
            let mut running = 0.0;
            for row in rows {
                for &col in &columns {
                    if let Some(value) = source.value(col, row).as_f64() {
                        include(value);
                        running += value;
                        include(running);
                    }
                }
            }
        }
    }
    Ok(extent)
}

/// Arena of scales with a many-to-one field index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleSet {
    scales: Vec<Scale>,
    by_field: IndexMap<String, ScaleId>,
}

impl ScaleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the scale already bound to `field`, or creates one of `kind`.
    pub fn ensure(&mut self, field: &str, kind: ScaleKind) -> ScaleId {
        if let Some(id) = self.by_field.get(field) {
            return *id;
        }
        let id = self.push(kind);
        self.bind(field, id);
        trace!(field, scale = id.index(), "scale created");
        id
    }

    /// Binds `field` to an existing scale; later lookups of `field` reuse it.
    pub fn bind(&mut self, field: &str, id: ScaleId) {
        if let Some(scale) = self.scales.get_mut(id.index()) {
            scale.add_field(field);
            self.by_field.entry(field.to_owned()).or_insert(id);
        }
    }

    /// Binds a brushed `ALL_` mirror: scanned for the domain only.
    pub fn bind_mirror(&mut self, field: &str, id: ScaleId) {
        if let Some(scale) = self.scales.get_mut(id.index()) {
            scale.add_data_field(field);
            self.by_field.entry(field.to_owned()).or_insert(id);
        }
    }

    /// Resolves `field` to an existing scale without scanning it, for
    /// derived columns that are offsets rather than positions.
    pub fn alias(&mut self, field: &str, id: ScaleId) {
        if id.index() < self.scales.len() {
            self.by_field.entry(field.to_owned()).or_insert(id);
        }
    }

    /// Structural scale with no data behind it.
    pub fn push_fake(&mut self, kind: ScaleKind) -> ScaleId {
        let id = self.push(kind);
        if let Some(scale) = self.scales.get_mut(id.index()) {
            scale.fake = true;
        }
        id
    }

    fn push(&mut self, kind: ScaleKind) -> ScaleId {
        let id = ScaleId(self.scales.len());
        self.scales.push(Scale::new(id, kind));
        id
    }

    #[must_use]
    pub fn get(&self, id: ScaleId) -> Option<&Scale> {
        self.scales.get(id.index())
    }

    pub fn get_mut(&mut self, id: ScaleId) -> Option<&mut Scale> {
        self.scales.get_mut(id.index())
    }

    #[must_use]
    pub fn id_for(&self, field: &str) -> Option<ScaleId> {
        self.by_field.get(field).copied()
    }

    #[must_use]
    pub fn scale_for(&self, field: &str) -> Option<&Scale> {
        self.id_for(field).and_then(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scale> {
        self.scales.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scales.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// Initializes every scale against `source`.
    pub fn init_all(&mut self, source: &dyn DataSource) -> ChartResult<()> {
        for scale in &mut self.scales {
            scale.init(source)?;
        }
        Ok(())
    }
}
