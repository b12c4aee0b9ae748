//! Error types for offsetfield

use thiserror::Error;

/// Broad category of an [`Error`].
///
/// Lets callers decide how to respond without matching every variant:
/// configuration mistakes are fatal, degenerate geometry may be worth
/// retrying with more control points, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad file reference, unknown interpolant, missing column set, bad parameter
    Configuration,
    /// Malformed or unusable values in otherwise well-formed input
    DataQuality,
    /// Too few points, or all points collinear
    Degeneracy,
    /// An operation was called out of order (e.g. transform before fit)
    Precondition,
    /// Underlying file or stream failure
    Io,
}

/// Main error type for offsetfield operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration file error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{source_name}: expected columns {expected:?} after header normalization, found {found:?}")]
    MissingColumns {
        source_name: String,
        expected: Vec<&'static str>,
        found: Vec<String>,
    },

    #[error("Unknown interpolant '{0}' (available: LinearNDInterpolator, CloughTocher2DInterpolator)")]
    UnknownInterpolant(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Coordinate length mismatch: {lon} longitudes vs {lat} latitudes")]
    LengthMismatch { lon: usize, lat: usize },

    #[error("Land control set '{0}' has not been populated; fit it with KNN before combining")]
    UnpopulatedControls(String),

    #[error("Parse error at row {row}, column {column}: '{value}'")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Insufficient points: need at least {required}, got {found}")]
    InsufficientPoints { required: usize, found: usize },

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("No interpolation model has been fitted")]
    ModelNotFitted,

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

impl Error {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::Csv(e) if e.is_io_error() => ErrorKind::Io,
            Error::Csv(_) | Error::Parse { .. } => ErrorKind::DataQuality,
            Error::Json(_)
            | Error::MissingColumns { .. }
            | Error::UnknownInterpolant(_)
            | Error::InvalidParameter { .. }
            | Error::LengthMismatch { .. }
            | Error::UnpopulatedControls(_) => ErrorKind::Configuration,
            Error::InsufficientPoints { .. } | Error::DegenerateGeometry(_) => {
                ErrorKind::Degeneracy
            }
            Error::ModelNotFitted => ErrorKind::Precondition,
            Error::Algorithm(_) => ErrorKind::DataQuality,
        }
    }
}

/// Result type alias for offsetfield operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Error::ModelNotFitted.kind(), ErrorKind::Precondition);
        assert_eq!(
            Error::UnknownInterpolant("rbf".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::InsufficientPoints { required: 4, found: 2 }.kind(),
            ErrorKind::Degeneracy
        );
        assert_eq!(
            Error::DegenerateGeometry("collinear".into()).kind(),
            ErrorKind::Degeneracy
        );
    }

    #[test]
    fn test_missing_columns_message_names_source() {
        let err = Error::MissingColumns {
            source_name: "land_controls.csv".into(),
            expected: vec!["LON", "LAT", "VAL"],
            found: vec!["LON".into(), "LAT".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("land_controls.csv"));
        assert!(msg.contains("VAL"));
    }
}
