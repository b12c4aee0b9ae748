//! k-nearest-neighbor regression of control-point values
//!
//! Land controls carry no observed error. Each one is assigned the
//! unweighted mean of the `k` nearest station errors, searched with a
//! k-d tree over `(lon, lat)`.

use offsetfield_core::{ControlPointSet, Error, Result, SpatialSample, StationSet};
use tracing::info;

use crate::interpolation::KdTree;

/// A fitted uniform-weight KNN regressor.
#[derive(Debug, Clone)]
pub struct KnnRegressor {
    tree: KdTree,
    k: usize,
}

impl KnnRegressor {
    /// Fit on `samples`, which must not contain missing values.
    ///
    /// A `k` larger than the number of samples is capped to it.
    pub fn fit(samples: &[SpatialSample], k: usize) -> Result<Self> {
        if k == 0 {
            return Err(Error::InvalidParameter {
                name: "nearest_neighbors",
                value: k.to_string(),
                reason: "must be a positive integer".into(),
            });
        }
        if samples.is_empty() {
            return Err(Error::InsufficientPoints {
                required: 1,
                found: 0,
            });
        }
        if samples.iter().any(SpatialSample::is_missing) {
            return Err(Error::Algorithm(
                "KNN training samples contain missing values".into(),
            ));
        }
        Ok(Self {
            tree: KdTree::build(samples),
            k: k.min(samples.len()),
        })
    }

    /// Effective neighbor count after capping.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Mean value of the `k` nearest samples to `(lon, lat)`.
    pub fn predict(&self, lon: f64, lat: f64) -> f64 {
        let nearest = self.tree.k_nearest(lon, lat, self.k);
        nearest.iter().map(|r| r.point.value).sum::<f64>() / nearest.len() as f64
    }

    /// Predictions for each `(lon, lat)` pair.
    pub fn predict_many(&self, coords: &[(f64, f64)]) -> Vec<f64> {
        coords.iter().map(|&(lon, lat)| self.predict(lon, lat)).collect()
    }
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Assign KNN-estimated values from `stations` to every point of `controls`.
///
/// Stations with missing values are dropped first. Returns a populated copy
/// of `controls`; the input is left untouched.
pub fn knn_fit_control_points(
    stations: &StationSet,
    controls: &ControlPointSet,
    nearest_neighbors: usize,
) -> Result<ControlPointSet> {
    let source = stations.purge_missing();
    let regressor = KnnRegressor::fit(&source.spatial_samples(), nearest_neighbors)?;

    let values = regressor.predict_many(&controls.coordinates());
    let (mean, std) = mean_and_std(&values);
    info!(
        "KNN estimated {} control points using uniform weights and {} nearest neighbors from {} source points",
        values.len(),
        regressor.k(),
        source.len()
    );
    info!("Predicted control values: mean {:.6}, std {:.6}", mean, std);

    controls.with_values(&values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use offsetfield_core::StationSample;

    fn stations() -> StationSet {
        StationSet::new(vec![
            StationSample::new("a", 0.0, 0.0, 1.0),
            StationSample::new("b", 1.0, 0.0, 2.0),
            StationSample::new("c", 0.0, 1.0, 3.0),
        ])
    }

    #[test]
    fn test_uniform_mean_of_nearest() {
        let land = ControlPointSet::land(vec![SpatialSample::unvalued(2.0, 2.0)]);
        let fitted = knn_fit_control_points(&stations(), &land, 2).unwrap();
        assert!(fitted.is_populated());
        // (1,0) and (0,1) are both √5 away; (0,0) is √8
        assert_relative_eq!(fitted.points()[0].value, 2.5);
    }

    #[test]
    fn test_k_capped_to_training_size() {
        let land = ControlPointSet::land(vec![SpatialSample::unvalued(5.0, 5.0)]);
        let fitted = knn_fit_control_points(&stations(), &land, 10).unwrap();
        assert_relative_eq!(fitted.points()[0].value, 2.0);

        let reg = KnnRegressor::fit(&stations().spatial_samples(), 10).unwrap();
        assert_eq!(reg.k(), 3);
    }

    #[test]
    fn test_missing_station_values_dropped() {
        let mut samples = stations().samples().to_vec();
        samples.push(StationSample::new("d", 2.0, 2.0, f64::NAN));
        let land = ControlPointSet::land(vec![SpatialSample::unvalued(2.0, 2.0)]);

        let fitted = knn_fit_control_points(&StationSet::new(samples), &land, 1).unwrap();
        assert!(!fitted.points()[0].is_missing());
    }

    #[test]
    fn test_zero_k_rejected() {
        let err = KnnRegressor::fit(&stations().spatial_samples(), 0).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_empty_source_rejected() {
        let land = ControlPointSet::land(vec![SpatialSample::unvalued(2.0, 2.0)]);
        let err = knn_fit_control_points(&StationSet::default(), &land, 3).unwrap_err();
        assert!(matches!(err, Error::InsufficientPoints { .. }));
    }

    #[test]
    fn test_input_controls_untouched() {
        let land = ControlPointSet::land(vec![SpatialSample::unvalued(2.0, 2.0)]);
        let _ = knn_fit_control_points(&stations(), &land, 2).unwrap();
        assert!(land.points()[0].is_missing());
        assert!(!land.is_populated());
    }
}
