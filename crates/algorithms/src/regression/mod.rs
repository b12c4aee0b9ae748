//! Regression of control-point values from station observations

mod knn;

pub use knn::{knn_fit_control_points, KnnRegressor};
