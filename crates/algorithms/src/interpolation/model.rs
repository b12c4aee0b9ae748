//! Fitted interpolation model
//!
//! Dispatches between the supported interpolant kinds. A model is immutable
//! once fitted; refitting produces a new instance.

use offsetfield_core::{InterpolantKind, PipelineConfig, Result, TrainingSet};
use tracing::info;

use super::clough_tocher::CloughTocherInterpolant;
use super::linear::LinearInterpolant;
use super::triangulation::Triangulation;

/// A fitted `(lon, lat) -> value` function.
#[derive(Debug, Clone)]
pub enum Interpolant {
    Linear(LinearInterpolant),
    CloughTocher(CloughTocherInterpolant),
}

impl Interpolant {
    /// Fit an interpolant of `kind` over `training`.
    ///
    /// Rows with missing values are removed first. Fails when fewer than
    /// four distinct points remain or when they are all collinear.
    pub fn fit(training: &TrainingSet, kind: InterpolantKind, fill_value: f64) -> Result<Self> {
        let purged = training.purge_missing();
        let model = match kind {
            InterpolantKind::Linear => {
                Interpolant::Linear(LinearInterpolant::fit(purged.samples(), fill_value)?)
            }
            InterpolantKind::CloughTocher => Interpolant::CloughTocher(
                CloughTocherInterpolant::fit(purged.samples(), fill_value)?,
            ),
        };
        info!(
            "Finished building {} model on {} vertices",
            kind,
            model.triangulation().points().len()
        );
        Ok(model)
    }

    pub fn kind(&self) -> InterpolantKind {
        match self {
            Interpolant::Linear(_) => InterpolantKind::Linear,
            Interpolant::CloughTocher(_) => InterpolantKind::CloughTocher,
        }
    }

    pub fn fill_value(&self) -> f64 {
        match self {
            Interpolant::Linear(m) => m.fill_value(),
            Interpolant::CloughTocher(m) => m.fill_value(),
        }
    }

    pub fn triangulation(&self) -> &Triangulation {
        match self {
            Interpolant::Linear(m) => m.triangulation(),
            Interpolant::CloughTocher(m) => m.triangulation(),
        }
    }

    /// Value at `(lon, lat)`; the fill value outside the convex hull.
    #[inline]
    pub fn evaluate(&self, lon: f64, lat: f64) -> f64 {
        match self {
            Interpolant::Linear(m) => m.evaluate(lon, lat),
            Interpolant::CloughTocher(m) => m.evaluate(lon, lat),
        }
    }
}

/// Fit the interpolant configured in `config`.
pub fn interpolation_model_fit(
    training: &TrainingSet,
    config: &PipelineConfig,
) -> Result<Interpolant> {
    Interpolant::fit(training, config.interpolant, config.fill_value)
}
