//! Fit/transform wrapper around the error-field pipeline
//!
//! [`ErrorFieldEstimator`] owns a validated configuration and, once fitted,
//! the interpolation model. Calling `transform` before `fit` is an error
//! rather than a panic.

use offsetfield_core::{
    ControlPointSet, Error, PipelineConfig, PointSource, Result, StationSet, TrainingSet,
};
use tracing::info;

use crate::interpolation::{
    interpolation_model_fit, interpolation_model_transform, Interpolant, PointCloud, QuerySpec,
};
use crate::regression::knn_fit_control_points;

/// Stations plus KNN-populated land controls plus water controls.
///
/// Returns the training set together with the populated land controls so
/// callers can persist them.
pub fn assemble_training_set(
    stations: &StationSet,
    land_controls: Option<&ControlPointSet>,
    water_controls: Option<&ControlPointSet>,
    nearest_neighbors: usize,
) -> Result<(TrainingSet, Option<ControlPointSet>)> {
    let stations = stations.purge_missing();
    let land = land_controls
        .map(|land| knn_fit_control_points(&stations, land, nearest_neighbors))
        .transpose()?;

    let mut sources: Vec<&dyn PointSource> = vec![&stations];
    if let Some(land) = &land {
        sources.push(land);
    }
    if let Some(water) = water_controls {
        sources.push(water);
    }
    let training = TrainingSet::combine(&sources)?;
    Ok((training, land))
}

/// Stateful estimator: `fit` once, `transform` many times.
#[derive(Debug, Clone)]
pub struct ErrorFieldEstimator {
    config: PipelineConfig,
    model: Option<Interpolant>,
}

impl ErrorFieldEstimator {
    /// Create an unfitted estimator. The configuration is validated here.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            model: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The fitted model, if any.
    pub fn model(&self) -> Option<&Interpolant> {
        self.model.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Fit on `training`, replacing any previous model.
    pub fn fit(&mut self, training: &TrainingSet) -> Result<&mut Self> {
        info!(
            "Fitting {} with fill value {}",
            self.config.interpolant, self.config.fill_value
        );
        self.model = Some(interpolation_model_fit(training, &self.config)?);
        Ok(self)
    }

    /// Evaluate the fitted model over `query`.
    pub fn transform(&self, query: &QuerySpec) -> Result<PointCloud> {
        let model = self.model.as_ref().ok_or(Error::ModelNotFitted)?;
        interpolation_model_transform(model, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offsetfield_core::{SpatialSample, StationSample};

    fn stations() -> StationSet {
        StationSet::new(vec![
            StationSample::new("a", 0.0, 0.0, 1.0),
            StationSample::new("b", 1.0, 0.0, 2.0),
            StationSample::new("c", 0.0, 1.0, 3.0),
        ])
    }

    #[test]
    fn test_transform_before_fit() {
        let est = ErrorFieldEstimator::new(PipelineConfig::default()).unwrap();
        let q = QuerySpec::points(vec![0.0], vec![0.0]).unwrap();
        assert!(matches!(est.transform(&q), Err(Error::ModelNotFitted)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = PipelineConfig {
            nearest_neighbors: 0,
            ..Default::default()
        };
        assert!(ErrorFieldEstimator::new(cfg).is_err());
    }

    #[test]
    fn test_assemble_and_fit() {
        let land = ControlPointSet::land(vec![SpatialSample::unvalued(2.0, 2.0)]);
        let water = ControlPointSet::water(vec![SpatialSample::new(10.0, 10.0, 0.0)]);

        let (training, fitted_land) =
            assemble_training_set(&stations(), Some(&land), Some(&water), 2).unwrap();
        assert_eq!(training.len(), 5);
        assert_eq!(fitted_land.unwrap().points()[0].value, 2.5);

        let mut est = ErrorFieldEstimator::new(PipelineConfig::default()).unwrap();
        est.fit(&training).unwrap();
        assert!(est.is_fitted());

        let q = QuerySpec::points(vec![0.0, 2.0], vec![0.0, 2.0]).unwrap();
        let out = est.transform(&q).unwrap();
        assert_eq!(out.values(), vec![1.0, 2.5]);
    }

    #[test]
    fn test_assemble_without_controls() {
        let (training, land) = assemble_training_set(&stations(), None, None, 3).unwrap();
        assert_eq!(training.len(), 3);
        assert!(land.is_none());
    }
}
