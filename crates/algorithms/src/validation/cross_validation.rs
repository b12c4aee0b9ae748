//! K-fold cross-validation of the full error-field pipeline
//!
//! For every fold the whole chain is refit on the training stations:
//! KNN land controls, combination with water controls, interpolation.
//! The fold model is then scored on the held-out stations. When land
//! controls are configured a second score compares the fold model against
//! land controls KNN-fitted from the held-out stations alone.
//!
//! Folds are independent and run in parallel when the `parallel` feature
//! is enabled; the report always lists them in fold order.

use offsetfield_core::{
    ControlPointSet, PipelineConfig, PointSource, Result, StationSet, TrainingSet,
};
use serde::Serialize;
use tracing::info;

use super::kfold::{Fold, KFold};
use super::metrics::mean_squared_error;
use crate::interpolation::{interpolation_model_fit, interpolation_model_transform, QuerySpec};
use crate::maybe_rayon::*;
use crate::regression::knn_fit_control_points;

/// Record-form marker for a score that does not apply (no land controls).
pub const NOT_APPLICABLE_SCORE: f64 = -99999.0;

/// Scores of one fold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FoldScore {
    /// 1-based fold number
    pub fold: usize,
    /// Training stations in this fold
    pub n_train: usize,
    /// Held-out stations in this fold
    pub n_test: usize,
    /// MSE at held-out station coordinates
    pub station_mse: f64,
    /// MSE at land controls fitted from held-out stations; `None` without land controls
    pub control_mse: Option<f64>,
}

/// Per-fold scores with their mean and best (minimum).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSeries {
    pub scores: Vec<f64>,
    pub mean: f64,
    pub best: f64,
}

impl ScoreSeries {
    fn from_scores(scores: Vec<f64>) -> Self {
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let best = scores.iter().copied().fold(f64::INFINITY, f64::min);
        Self { scores, mean, best }
    }
}

/// Outcome of a cross-validation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidationReport {
    pub folds: Vec<FoldScore>,
    /// Held-out station scores
    pub station: ScoreSeries,
    /// Held-out land-control scores, `None` when no land controls were given
    pub control: Option<ScoreSeries>,
}

impl CrossValidationReport {
    /// Flat `(key, value)` records in report order:
    /// `fold_1..fold_K, best, avgMSE, Cnrl_fold_1..Cnrl_fold_K, best_cntl, avgCnrlMSE`.
    ///
    /// Inapplicable control scores appear as [`NOT_APPLICABLE_SCORE`].
    pub fn records(&self) -> Vec<(String, f64)> {
        let mut out = Vec::with_capacity(2 * self.folds.len() + 4);
        for f in &self.folds {
            out.push((format!("fold_{}", f.fold), f.station_mse));
        }
        out.push(("best".into(), self.station.best));
        out.push(("avgMSE".into(), self.station.mean));

        for f in &self.folds {
            out.push((
                format!("Cnrl_fold_{}", f.fold),
                f.control_mse.unwrap_or(NOT_APPLICABLE_SCORE),
            ));
        }
        let (best, mean) = self
            .control
            .as_ref()
            .map_or((NOT_APPLICABLE_SCORE, NOT_APPLICABLE_SCORE), |c| (c.best, c.mean));
        out.push(("best_cntl".into(), best));
        out.push(("avgCnrlMSE".into(), mean));
        out
    }

    /// Records as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .records()
            .into_iter()
            .map(|(k, v)| (k, serde_json::json!(v)))
            .collect();
        serde_json::Value::Object(map)
    }
}

fn score_fold(
    fold: &Fold,
    stations: &StationSet,
    land_controls: Option<&ControlPointSet>,
    water_controls: Option<&ControlPointSet>,
    config: &PipelineConfig,
) -> Result<FoldScore> {
    let train = stations.select(&fold.train);
    let test = stations.select(&fold.test);
    info!(
        "Fold {}: {} training stations, {} held out",
        fold.index,
        train.len(),
        test.len()
    );

    let (land_train, land_test) = match land_controls {
        Some(land) => {
            let fitted_train = knn_fit_control_points(&train, land, config.nearest_neighbors)?;
            let k_test = test.len().min(config.nearest_neighbors);
            let fitted_test = knn_fit_control_points(&test, land, k_test)?;
            (Some(fitted_train), Some(fitted_test))
        }
        None => (None, None),
    };

    let mut sources: Vec<&dyn PointSource> = vec![&train];
    if let Some(land) = &land_train {
        sources.push(land);
    }
    if let Some(water) = water_controls {
        sources.push(water);
    }
    let training = TrainingSet::combine(&sources)?;
    let model = interpolation_model_fit(&training, config)?;

    let test_samples = test.spatial_samples();
    let query = QuerySpec::points(
        test_samples.iter().map(|s| s.lon).collect(),
        test_samples.iter().map(|s| s.lat).collect(),
    )?;
    let predicted = interpolation_model_transform(&model, &query)?;
    let truth: Vec<f64> = test_samples.iter().map(|s| s.value).collect();
    let station_mse = mean_squared_error(&truth, &predicted.values())?;

    let control_mse = match &land_test {
        Some(land) => {
            let (lon, lat): (Vec<f64>, Vec<f64>) = land.coordinates().into_iter().unzip();
            let predicted = interpolation_model_transform(&model, &QuerySpec::points(lon, lat)?)?;
            let truth: Vec<f64> = land.points().iter().map(|p| p.value).collect();
            Some(mean_squared_error(&truth, &predicted.values())?)
        }
        None => None,
    };

    Ok(FoldScore {
        fold: fold.index,
        n_train: train.len(),
        n_test: test.len(),
        station_mse,
        control_mse,
    })
}

/// Cross-validate the pipeline on `stations`.
///
/// # Arguments
/// * `stations` - Station error samples; missing values are dropped first
/// * `land_controls` - Optional land controls, KNN-fitted per fold
/// * `water_controls` - Optional water controls, used as-is in every fold
/// * `config` - Fold count, neighbor count, interpolant and fill value
///
/// # Returns
/// Per-fold scores and summaries. Any fold failure fails the whole run.
pub fn cross_validate(
    stations: &StationSet,
    land_controls: Option<&ControlPointSet>,
    water_controls: Option<&ControlPointSet>,
    config: &PipelineConfig,
) -> Result<CrossValidationReport> {
    config.validate()?;
    info!(
        "Cross-validating with station drop-outs: cv_splits {}, knn {}",
        config.cv_splits, config.nearest_neighbors
    );

    let stations = stations.purge_missing();

    let mut kfold = KFold::new(config.cv_splits)?;
    if let Some(seed) = config.shuffle_seed {
        kfold = kfold.with_shuffle(seed);
    }
    let folds = kfold.split(stations.len())?;

    let scores: Vec<FoldScore> = folds
        .into_par_iter()
        .map(|fold| score_fold(&fold, &stations, land_controls, water_controls, config))
        .collect::<Result<Vec<_>>>()?;

    let station = ScoreSeries::from_scores(scores.iter().map(|s| s.station_mse).collect());
    let control = scores
        .iter()
        .map(|s| s.control_mse)
        .collect::<Option<Vec<f64>>>()
        .map(ScoreSeries::from_scores);

    info!(
        "Cross-validation finished: avg MSE {:.6}, best {:.6}",
        station.mean, station.best
    );

    Ok(CrossValidationReport {
        folds: scores,
        station,
        control,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use offsetfield_core::{InterpolantKind, SpatialSample, StationSample};

    fn ring_stations(n: usize) -> StationSet {
        (0..n)
            .map(|i| {
                let t = i as f64 / n as f64 * std::f64::consts::TAU;
                let r = 1.0 + 0.3 * (i % 3) as f64;
                let (x, y) = (r * t.cos(), r * t.sin());
                StationSample::new(format!("st{}", i), x, y, 0.1 * x - 0.2 * y)
            })
            .collect()
    }

    fn water() -> ControlPointSet {
        ControlPointSet::water(vec![
            SpatialSample::new(-5.0, -5.0, 0.0),
            SpatialSample::new(5.0, -5.0, 0.0),
            SpatialSample::new(5.0, 5.0, 0.0),
            SpatialSample::new(-5.0, 5.0, 0.0),
        ])
    }

    #[test]
    fn test_report_without_land_controls() {
        let cfg = PipelineConfig::default();
        let report = cross_validate(&ring_stations(20), None, Some(&water()), &cfg).unwrap();

        assert_eq!(report.folds.len(), 5);
        assert!(report.control.is_none());
        assert!(report.folds.iter().all(|f| f.control_mse.is_none()));
        assert!(report.station.scores.iter().all(|s| *s >= 0.0));

        let records = report.records();
        let lookup = |key: &str| records.iter().find(|(k, _)| k == key).map(|(_, v)| *v);
        assert_eq!(lookup("Cnrl_fold_3"), Some(NOT_APPLICABLE_SCORE));
        assert_eq!(lookup("avgCnrlMSE"), Some(NOT_APPLICABLE_SCORE));
        assert_eq!(lookup("best"), Some(report.station.best));
    }

    #[test]
    fn test_report_with_land_controls() {
        let land = ControlPointSet::land(vec![
            SpatialSample::unvalued(0.0, 0.0),
            SpatialSample::unvalued(0.5, -0.5),
        ]);
        let cfg = PipelineConfig {
            cv_splits: 4,
            ..Default::default()
        };
        let report = cross_validate(&ring_stations(12), Some(&land), Some(&water()), &cfg).unwrap();

        let control = report.control.as_ref().unwrap();
        assert_eq!(control.scores.len(), 4);
        let expected_mean = control.scores.iter().sum::<f64>() / 4.0;
        assert!((control.mean - expected_mean).abs() < 1e-12);
        assert!(control.scores.iter().all(|s| *s >= control.best));
    }

    #[test]
    fn test_scores_match_hand_computation() {
        // Two well-separated clusters; each fold holds one out. The held-out
        // cluster lies outside the hull of the other plus the land control,
        // so its stations are predicted as the fill value. The land control
        // is a training vertex, so the fold model returns its train-KNN
        // value there and is scored against the test-KNN value.
        let stations = StationSet::new(vec![
            StationSample::new("a1", 0.0, 0.0, 1.0),
            StationSample::new("a2", 1.0, 0.0, 2.0),
            StationSample::new("a3", 0.0, 1.0, 3.0),
            StationSample::new("b1", 10.0, 0.0, 10.0),
            StationSample::new("b2", 11.0, 0.0, 20.0),
            StationSample::new("b3", 10.0, 1.0, 30.0),
        ]);
        let land = ControlPointSet::land(vec![SpatialSample::unvalued(5.0, 5.0)]);

        for interpolant in [InterpolantKind::Linear, InterpolantKind::CloughTocher] {
            let cfg = PipelineConfig {
                cv_splits: 2,
                nearest_neighbors: 3,
                fill_value: -1.0,
                interpolant,
                ..Default::default()
            };
            let report = cross_validate(&stations, Some(&land), None, &cfg).unwrap();

            // fold 1: truth 1,2,3 against fill -1; land 20 (train b) vs 2 (test a)
            // fold 2: truth 10,20,30 against fill -1; land 2 (train a) vs 20 (test b)
            let fold1 = (4.0 + 9.0 + 16.0) / 3.0;
            let fold2 = (121.0 + 441.0 + 961.0) / 3.0;
            assert_relative_eq!(report.folds[0].station_mse, fold1);
            assert_relative_eq!(report.folds[1].station_mse, fold2);
            assert_relative_eq!(report.folds[0].control_mse.unwrap(), 324.0);
            assert_relative_eq!(report.folds[1].control_mse.unwrap(), 324.0);

            assert_relative_eq!(report.station.mean, (fold1 + fold2) / 2.0);
            assert_relative_eq!(report.station.best, fold1);
            let control = report.control.as_ref().unwrap();
            assert_relative_eq!(control.mean, 324.0);
            assert_relative_eq!(control.best, 324.0);
        }
    }

    #[test]
    fn test_control_knn_uses_at_most_test_size_neighbors() {
        // Fold 2 holds out a single station, so its land control takes that
        // station's value even though k = 5.
        let stations = StationSet::new(vec![
            StationSample::new("a", 0.0, 0.0, 1.0),
            StationSample::new("b", 4.0, 0.0, 2.0),
            StationSample::new("c", 0.0, 4.0, 3.0),
            StationSample::new("d", 20.0, 20.0, 7.0),
        ]);
        let land = ControlPointSet::land(vec![SpatialSample::unvalued(1.0, 1.0)]);
        let cfg = PipelineConfig {
            cv_splits: 2,
            nearest_neighbors: 5,
            ..Default::default()
        };
        let folds = KFold::new(2).unwrap().split(4).unwrap();
        assert_eq!(folds[1].test, vec![2, 3]);

        let water = ControlPointSet::water(vec![
            SpatialSample::new(-50.0, -50.0, 0.0),
            SpatialSample::new(60.0, -50.0, 0.0),
            SpatialSample::new(0.0, 60.0, 0.0),
        ]);
        let report = cross_validate(&stations, Some(&land), Some(&water), &cfg).unwrap();

        // fold 2 trains on a, b plus the land control valued mean(1, 2) = 1.5;
        // its test KNN value is mean(3, 7) = 5.
        assert_relative_eq!(report.folds[1].control_mse.unwrap(), (1.5 - 5.0f64).powi(2));
    }

    #[test]
    fn test_folds_reported_in_order() {
        let cfg = PipelineConfig {
            cv_splits: 6,
            ..Default::default()
        };
        let report = cross_validate(&ring_stations(18), None, Some(&water()), &cfg).unwrap();
        let order: Vec<usize> = report.folds.iter().map(|f| f.fold).collect();
        assert_eq!(order, vec![1, 2, 3, 4, 5, 6]);
        assert!(report.folds.iter().all(|f| f.n_test == 3 && f.n_train == 15));
    }

    #[test]
    fn test_missing_station_values_purged() {
        let mut samples = ring_stations(10).samples().to_vec();
        samples.push(StationSample::new("gap", 0.2, 0.2, f64::NAN));
        let cfg = PipelineConfig {
            cv_splits: 5,
            ..Default::default()
        };
        let report =
            cross_validate(&StationSet::new(samples), None, Some(&water()), &cfg).unwrap();
        let held_out: usize = report.folds.iter().map(|f| f.n_test).sum();
        assert_eq!(held_out, 10);
    }

    #[test]
    fn test_too_many_folds() {
        let cfg = PipelineConfig {
            cv_splits: 30,
            ..Default::default()
        };
        assert!(cross_validate(&ring_stations(10), None, None, &cfg).is_err());
    }

    #[test]
    fn test_json_keys() {
        let report =
            cross_validate(&ring_stations(10), None, Some(&water()), &PipelineConfig::default())
                .unwrap();
        let json = report.to_json();
        let keys = [
            "fold_1",
            "fold_5",
            "best",
            "avgMSE",
            "Cnrl_fold_1",
            "best_cntl",
            "avgCnrlMSE",
        ];
        for key in keys {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
