//! # Offsetfield Algorithms
//!
//! Numerical core of the storm-surge error-field pipeline.
//!
//! ## Modules
//!
//! - **interpolation**: Delaunay triangulation, linear and Clough-Tocher
//!   interpolants, k-d tree, point and grid queries
//! - **regression**: KNN estimation of land-control values from stations
//! - **validation**: K-fold splitting, MSE, pipeline cross-validation
//! - **estimator**: fit/transform wrapper and training-set assembly

pub mod estimator;
pub mod interpolation;
pub mod maybe_rayon;
pub mod regression;
pub mod validation;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::estimator::{assemble_training_set, ErrorFieldEstimator};
    pub use crate::interpolation::{
        interpolation_model_fit, interpolation_model_transform, Interpolant, PointCloud,
        QuerySpec,
    };
    pub use crate::regression::{knn_fit_control_points, KnnRegressor};
    pub use crate::validation::{
        cross_validate, mean_squared_error, randomly_select_rows, CrossValidationReport,
        KFold,
    };
    pub use offsetfield_core::prelude::*;
}
