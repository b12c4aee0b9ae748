//! Model validation
//!
//! K-fold partitioning, scoring, and the cross-validation harness that
//! refits the whole pipeline per fold.

mod cross_validation;
mod kfold;
mod metrics;
mod sampling;

pub use cross_validation::{
    cross_validate, CrossValidationReport, FoldScore, ScoreSeries, NOT_APPLICABLE_SCORE,
};
pub use kfold::{Fold, KFold};
pub use metrics::mean_squared_error;
pub use sampling::randomly_select_rows;
