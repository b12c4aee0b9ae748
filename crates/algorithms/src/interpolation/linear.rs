//! Piecewise-linear interpolation on a Delaunay triangulation
//!
//! Inside each triangle the value is the barycentric blend of its three
//! vertex values. Outside the convex hull the fill value is returned.

use offsetfield_core::{Result, SpatialSample};

use super::triangulation::Triangulation;

/// A fitted piecewise-linear interpolant.
#[derive(Debug, Clone)]
pub struct LinearInterpolant {
    tri: Triangulation,
    fill_value: f64,
}

impl LinearInterpolant {
    /// Triangulate `samples` (no missing values) and fit.
    pub fn fit(samples: &[SpatialSample], fill_value: f64) -> Result<Self> {
        Ok(Self {
            tri: Triangulation::build(samples)?,
            fill_value,
        })
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.tri
    }

    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }

    /// Value at `(lon, lat)`.
    pub fn evaluate(&self, lon: f64, lat: f64) -> f64 {
        let points = self.tri.points();
        if let Some(v) = self.tri.vertex_at(lon, lat) {
            return points[v].value;
        }
        match self.tri.locate(lon, lat) {
            Some((ti, [u, v, w])) => {
                let [a, b, c] = self.tri.triangles()[ti];
                u * points[a].value + v * points[b].value + w * points[c].value
            }
            None => self.fill_value,
        }
    }
}
