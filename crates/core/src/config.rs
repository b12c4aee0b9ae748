//! Pipeline configuration
//!
//! A single immutable [`PipelineConfig`] is validated once and then passed
//! by reference into every fitting, querying and validation call.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Scattered-data interpolant family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InterpolantKind {
    /// Piecewise-linear over a Delaunay triangulation
    #[default]
    Linear,
    /// C1 piecewise-cubic (Clough-Tocher) over a Delaunay triangulation
    CloughTocher,
}

impl InterpolantKind {
    /// Canonical name as accepted on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            InterpolantKind::Linear => "LinearNDInterpolator",
            InterpolantKind::CloughTocher => "CloughTocher2DInterpolator",
        }
    }
}

impl fmt::Display for InterpolantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InterpolantKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "LINEARNDINTERPOLATOR" | "LINEAR" => Ok(InterpolantKind::Linear),
            "CLOUGHTOCHER2DINTERPOLATOR" | "CLOUGH_TOCHER" | "CLOUGHTOCHER" | "CUBIC" => {
                Ok(InterpolantKind::CloughTocher)
            }
            _ => Err(Error::UnknownInterpolant(s.to_string())),
        }
    }
}

impl TryFrom<String> for InterpolantKind {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<InterpolantKind> for String {
    fn from(kind: InterpolantKind) -> Self {
        kind.name().to_string()
    }
}

/// How query coordinates are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// `lon[i], lat[i]` are paired element-wise
    #[default]
    Points,
    /// `lon` and `lat` are the axes of a rectangular lattice
    Grid,
}

impl FromStr for QueryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "points" | "point" => Ok(QueryMode::Points),
            "grid" => Ok(QueryMode::Grid),
            _ => Err(Error::InvalidParameter {
                name: "query_mode",
                value: s.to_string(),
                reason: "expected 'points' or 'grid'".into(),
            }),
        }
    }
}

/// Settings shared by the regressor, interpolator and cross-validation harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Neighbors averaged when estimating land-control values
    pub nearest_neighbors: usize,
    /// Interpolant family
    pub interpolant: InterpolantKind,
    /// Value returned outside the convex hull of the training points
    pub fill_value: f64,
    /// Number of cross-validation folds
    pub cv_splits: usize,
    /// Interpretation of query coordinates
    pub query_mode: QueryMode,
    /// Shuffle stations before fold splitting with this seed. `None` keeps
    /// contiguous folds in input order.
    pub shuffle_seed: Option<u64>,
    /// Raw header of the value column in station files
    pub station_value_column: String,
    /// Raw header of the value column in control files
    pub control_value_column: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            nearest_neighbors: 3,
            interpolant: InterpolantKind::Linear,
            fill_value: 0.0,
            cv_splits: 5,
            query_mode: QueryMode::Points,
            shuffle_seed: None,
            station_value_column: "mean".into(),
            control_value_column: "val".into(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file. Absent keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field once, before any computation.
    pub fn validate(&self) -> Result<()> {
        if self.nearest_neighbors == 0 {
            return Err(Error::InvalidParameter {
                name: "nearest_neighbors",
                value: self.nearest_neighbors.to_string(),
                reason: "must be a positive integer".into(),
            });
        }
        if self.cv_splits < 2 {
            return Err(Error::InvalidParameter {
                name: "cv_splits",
                value: self.cv_splits.to_string(),
                reason: "need at least 2 folds".into(),
            });
        }
        if self.fill_value.is_infinite() {
            return Err(Error::InvalidParameter {
                name: "fill_value",
                value: self.fill_value.to_string(),
                reason: "must be finite or NaN".into(),
            });
        }
        for (name, column) in [
            ("station_value_column", &self.station_value_column),
            ("control_value_column", &self.control_value_column),
        ] {
            if column.trim().is_empty() {
                return Err(Error::InvalidParameter {
                    name,
                    value: column.clone(),
                    reason: "column name cannot be empty".into(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolant_parse_case_insensitive() {
        assert_eq!(
            "linearndinterpolator".parse::<InterpolantKind>().unwrap(),
            InterpolantKind::Linear
        );
        assert_eq!(
            "CloughTocher2DInterpolator".parse::<InterpolantKind>().unwrap(),
            InterpolantKind::CloughTocher
        );
        assert_eq!(
            " CLOUGHTOCHER2DINTERPOLATOR ".parse::<InterpolantKind>().unwrap(),
            InterpolantKind::CloughTocher
        );
    }

    #[test]
    fn test_interpolant_unknown() {
        let err = "RBFInterpolator".parse::<InterpolantKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownInterpolant(ref s) if s == "RBFInterpolator"));
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.nearest_neighbors, 3);
        assert_eq!(cfg.cv_splits, 5);
        assert_eq!(cfg.fill_value, 0.0);
        assert_eq!(cfg.interpolant, InterpolantKind::Linear);
        assert_eq!(cfg.query_mode, QueryMode::Points);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = PipelineConfig {
            nearest_neighbors: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = PipelineConfig {
            cv_splits: 1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_json_partial_config() {
        let cfg: PipelineConfig = serde_json::from_str(
            r#"{ "interpolant": "cloughtocher2dinterpolator", "cv_splits": 3, "query_mode": "grid" }"#,
        )
        .unwrap();
        assert_eq!(cfg.interpolant, InterpolantKind::CloughTocher);
        assert_eq!(cfg.cv_splits, 3);
        assert_eq!(cfg.query_mode, QueryMode::Grid);
        assert_eq!(cfg.nearest_neighbors, 3);
    }

    #[test]
    fn test_json_unknown_interpolant_rejected() {
        let res: std::result::Result<PipelineConfig, _> =
            serde_json::from_str(r#"{ "interpolant": "kriging" }"#);
        assert!(res.is_err());
    }
}
