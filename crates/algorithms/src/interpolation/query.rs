//! Evaluating a fitted model over query coordinates
//!
//! Two query shapes:
//! - `Points`: `lon[i], lat[i]` paired element-wise
//! - `Grid`: axes of a rectangular lattice, flattened latitude-major
//!   (`lat` outer, `lon` inner) so the output reshapes to `ny × nx`

use ndarray::Array2;
use offsetfield_core::{Error, QueryMode, Result, SpatialSample};

use super::model::Interpolant;
use crate::maybe_rayon::*;

/// Target coordinates for model evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySpec {
    Points { lon: Vec<f64>, lat: Vec<f64> },
    Grid { lon: Vec<f64>, lat: Vec<f64> },
}

impl QuerySpec {
    /// Paired coordinates; both lists must have the same length.
    pub fn points(lon: Vec<f64>, lat: Vec<f64>) -> Result<Self> {
        if lon.len() != lat.len() {
            return Err(Error::LengthMismatch {
                lon: lon.len(),
                lat: lat.len(),
            });
        }
        Ok(QuerySpec::Points { lon, lat })
    }

    /// Lattice from a longitude axis and a latitude axis.
    pub fn grid(lon_axis: Vec<f64>, lat_axis: Vec<f64>) -> Self {
        QuerySpec::Grid {
            lon: lon_axis,
            lat: lat_axis,
        }
    }

    /// Interpret `lon`/`lat` according to `mode`.
    pub fn from_mode(mode: QueryMode, lon: Vec<f64>, lat: Vec<f64>) -> Result<Self> {
        match mode {
            QueryMode::Points => Self::points(lon, lat),
            QueryMode::Grid => Ok(Self::grid(lon, lat)),
        }
    }

    /// Regular lattice of `nx × ny` nodes starting at the lower-left corner.
    pub fn regular_grid(
        lower_left_lon: f64,
        lower_left_lat: f64,
        resolution: f64,
        nx: usize,
        ny: usize,
    ) -> Result<Self> {
        if !(resolution > 0.0 && resolution.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "resolution",
                value: resolution.to_string(),
                reason: "must be positive and finite".into(),
            });
        }
        let lon = (0..nx).map(|i| lower_left_lon + i as f64 * resolution).collect();
        let lat = (0..ny).map(|j| lower_left_lat + j as f64 * resolution).collect();
        Ok(Self::grid(lon, lat))
    }

    /// 400 × 500 lattice at 0.05° from (-90, 20), for quick surface checks.
    pub fn generic_grid() -> Self {
        let lon = (0..400).map(|i| -90.0 + i as f64 * 0.05).collect();
        let lat = (0..500).map(|j| 20.0 + j as f64 * 0.05).collect();
        Self::grid(lon, lat)
    }

    /// Number of coordinates the query expands to.
    pub fn len(&self) -> usize {
        match self {
            QuerySpec::Points { lon, .. } => lon.len(),
            QuerySpec::Grid { lon, lat } => lon.len() * lat.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expanded coordinates in output order.
    pub fn coordinates(&self) -> Result<Vec<(f64, f64)>> {
        match self {
            QuerySpec::Points { lon, lat } => {
                if lon.len() != lat.len() {
                    return Err(Error::LengthMismatch {
                        lon: lon.len(),
                        lat: lat.len(),
                    });
                }
                Ok(lon.iter().copied().zip(lat.iter().copied()).collect())
            }
            QuerySpec::Grid { lon, lat } => Ok(lat
                .iter()
                .flat_map(|&y| lon.iter().map(move |&x| (x, y)))
                .collect()),
        }
    }
}

/// Evaluated query coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    samples: Vec<SpatialSample>,
    /// `(ny, nx)` for grid queries
    shape: Option<(usize, usize)>,
}

impl PointCloud {
    pub fn samples(&self) -> &[SpatialSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<SpatialSample> {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// Grid shape `(ny, nx)`, `None` for point queries.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.shape
    }

    /// Values reshaped to `ny × nx` (row = latitude index).
    pub fn to_grid(&self) -> Result<Array2<f64>> {
        let (ny, nx) = self.shape.ok_or_else(|| Error::InvalidParameter {
            name: "query_mode",
            value: "points".into(),
            reason: "only grid queries can be reshaped".into(),
        })?;
        Array2::from_shape_vec((ny, nx), self.values())
            .map_err(|e| Error::Algorithm(format!("grid reshape failed: {}", e)))
    }
}

/// Evaluate `model` at every coordinate of `query`.
pub fn interpolation_model_transform(model: &Interpolant, query: &QuerySpec) -> Result<PointCloud> {
    let coords = query.coordinates()?;

    let samples: Vec<SpatialSample> = coords
        .into_par_iter()
        .map(|(lon, lat)| SpatialSample::new(lon, lat, model.evaluate(lon, lat)))
        .collect();

    let shape = match query {
        QuerySpec::Points { .. } => None,
        QuerySpec::Grid { lon, lat } => Some((lat.len(), lon.len())),
    };
    Ok(PointCloud { samples, shape })
}
