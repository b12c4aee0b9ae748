//! Point data model
//!
//! Every dataset in the pipeline reduces to `(lon, lat, value)` triples:
//! - `SpatialSample`: the atomic triple; a NaN value means "missing"
//! - `StationSample` / `StationSet`: observed gauge errors keyed by station id
//! - `ControlPointSet`: synthetic land (KNN-populated) or water (fixed) clamps
//! - `TrainingSet`: the flattened union handed to an interpolator

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// A value at a geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialSample {
    pub lon: f64,
    pub lat: f64,
    pub value: f64,
}

impl SpatialSample {
    pub fn new(lon: f64, lat: f64, value: f64) -> Self {
        Self { lon, lat, value }
    }

    /// A coordinate with no value yet.
    pub fn unvalued(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, f64::NAN)
    }

    /// Whether the value is absent (NaN).
    #[inline]
    pub fn is_missing(&self) -> bool {
        self.value.is_nan()
    }

    /// Squared Euclidean distance to a coordinate
    #[inline]
    pub fn dist_sq(&self, lon: f64, lat: f64) -> f64 {
        let dx = self.lon - lon;
        let dy = self.lat - lat;
        dx * dx + dy * dy
    }
}

/// An observed error at a gauge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSample {
    pub station_id: String,
    pub sample: SpatialSample,
}

impl StationSample {
    pub fn new(station_id: impl Into<String>, lon: f64, lat: f64, value: f64) -> Self {
        Self {
            station_id: station_id.into(),
            sample: SpatialSample::new(lon, lat, value),
        }
    }
}

/// Drop samples with missing values, logging counts before and after.
fn purge<T: Clone>(label: &str, items: &[T], missing: impl Fn(&T) -> bool) -> Vec<T> {
    let before = items.len();
    let kept: Vec<T> = items.iter().filter(|s| !missing(s)).cloned().collect();
    info!(
        "{}: input rows {}, after missingness check rows {}",
        label,
        before,
        kept.len()
    );
    kept
}

/// Station error samples, in file order.
///
/// Station ids are not deduplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationSet {
    samples: Vec<StationSample>,
}

impl StationSet {
    pub fn new(samples: Vec<StationSample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[StationSample] {
        &self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationSample> {
        self.samples.iter()
    }

    /// Copy of this set without stations whose value is missing.
    pub fn purge_missing(&self) -> StationSet {
        StationSet::new(purge("stations", &self.samples, |s| s.sample.is_missing()))
    }

    /// The stations at the given positions, in the given order.
    pub fn select(&self, indices: &[usize]) -> StationSet {
        StationSet::new(indices.iter().map(|&i| self.samples[i].clone()).collect())
    }

    /// Bare `(lon, lat, value)` triples.
    pub fn spatial_samples(&self) -> Vec<SpatialSample> {
        self.samples.iter().map(|s| s.sample).collect()
    }
}

impl FromIterator<StationSample> for StationSet {
    fn from_iter<I: IntoIterator<Item = StationSample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// What a control set constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlKind {
    /// Near-zero error on land; values estimated from nearby stations
    Land,
    /// Exactly-known (usually zero) error offshore
    Water,
}

/// Synthetic constraint points.
///
/// Water controls carry their values as loaded. Land controls start
/// unpopulated and only become usable once a regressor has assigned
/// values via [`ControlPointSet::with_values`].
#[derive(Debug, Clone, PartialEq)]
pub struct ControlPointSet {
    kind: ControlKind,
    points: Vec<SpatialSample>,
    populated: bool,
}

impl ControlPointSet {
    /// Land controls; any loaded values are placeholders.
    pub fn land(points: Vec<SpatialSample>) -> Self {
        Self {
            kind: ControlKind::Land,
            points,
            populated: false,
        }
    }

    /// Water controls used as-is.
    pub fn water(points: Vec<SpatialSample>) -> Self {
        Self {
            kind: ControlKind::Water,
            points,
            populated: true,
        }
    }

    /// Build a set of the given kind.
    pub fn of_kind(kind: ControlKind, points: Vec<SpatialSample>) -> Self {
        match kind {
            ControlKind::Land => Self::land(points),
            ControlKind::Water => Self::water(points),
        }
    }

    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SpatialSample] {
        &self.points
    }

    /// Coordinates as `(lon, lat)` pairs.
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(|p| (p.lon, p.lat)).collect()
    }

    /// A populated copy with `values[i]` assigned to point `i`.
    pub fn with_values(&self, values: &[f64]) -> Result<ControlPointSet> {
        if values.len() != self.points.len() {
            return Err(Error::InvalidParameter {
                name: "values",
                value: values.len().to_string(),
                reason: format!("expected one value per control point ({})", self.points.len()),
            });
        }
        let points = self
            .points
            .iter()
            .zip(values)
            .map(|(p, &v)| SpatialSample::new(p.lon, p.lat, v))
            .collect();
        Ok(ControlPointSet {
            kind: self.kind,
            points,
            populated: true,
        })
    }
}

/// Anything that can contribute `(lon, lat, value)` triples to a [`TrainingSet`].
pub trait PointSource {
    /// Name used in diagnostics.
    fn label(&self) -> String;

    /// The triples this source contributes, or an error if it cannot
    /// supply a value field.
    fn projected(&self) -> Result<Vec<SpatialSample>>;
}

impl PointSource for StationSet {
    fn label(&self) -> String {
        format!("stations ({} rows)", self.len())
    }

    fn projected(&self) -> Result<Vec<SpatialSample>> {
        Ok(self.spatial_samples())
    }
}

impl PointSource for ControlPointSet {
    fn label(&self) -> String {
        let kind = match self.kind {
            ControlKind::Land => "land controls",
            ControlKind::Water => "water controls",
        };
        format!("{} ({} rows)", kind, self.len())
    }

    fn projected(&self) -> Result<Vec<SpatialSample>> {
        if !self.populated {
            return Err(Error::UnpopulatedControls(self.label()));
        }
        Ok(self.points.clone())
    }
}

impl PointSource for Vec<SpatialSample> {
    fn label(&self) -> String {
        format!("samples ({} rows)", self.len())
    }

    fn projected(&self) -> Result<Vec<SpatialSample>> {
        Ok(self.clone())
    }
}

/// The flattened point set an interpolator is fitted on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    samples: Vec<SpatialSample>,
}

impl TrainingSet {
    pub fn new(samples: Vec<SpatialSample>) -> Self {
        Self { samples }
    }

    /// Concatenate the projections of `sources`.
    ///
    /// Fails on the first source that cannot provide values; nothing is
    /// returned in that case.
    pub fn combine(sources: &[&dyn PointSource]) -> Result<TrainingSet> {
        info!("combine_datasets: combining {} point sets", sources.len());
        let mut samples = Vec::new();
        for source in sources {
            samples.extend(source.projected()?);
        }
        Ok(TrainingSet { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[SpatialSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<SpatialSample> {
        self.samples
    }

    /// Copy of this set without missing values.
    pub fn purge_missing(&self) -> TrainingSet {
        TrainingSet::new(purge("training set", &self.samples, SpatialSample::is_missing))
    }
}

impl From<Vec<SpatialSample>> for TrainingSet {
    fn from(samples: Vec<SpatialSample>) -> Self {
        Self::new(samples)
    }
}
