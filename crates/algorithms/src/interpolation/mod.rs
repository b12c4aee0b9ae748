//! Scattered-data interpolation
//!
//! Fit a continuous surface through `(lon, lat, value)` samples and evaluate
//! it at arbitrary coordinates:
//! - Linear: barycentric interpolation on a Delaunay triangulation
//! - Clough-Tocher: C1 piecewise-cubic on the same triangulation
//! - k-d tree: neighbor search shared with the KNN regressor

mod clough_tocher;
pub mod kdtree;
mod linear;
mod model;
mod query;
pub mod triangulation;

pub use clough_tocher::CloughTocherInterpolant;
pub use kdtree::{KdTree, NearestResult};
pub use linear::LinearInterpolant;
pub use model::{interpolation_model_fit, Interpolant};
pub use query::{interpolation_model_transform, PointCloud, QuerySpec};
pub use triangulation::{Triangulation, MIN_TRIANGULATION_POINTS};
