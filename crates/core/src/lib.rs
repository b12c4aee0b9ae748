//! # offsetfield Core
//!
//! Core types, configuration and I/O for building water-level error fields
//! from sparse gauge observations.
//!
//! This crate provides:
//! - `SpatialSample`, `StationSet`, `ControlPointSet`, `TrainingSet`: point data model
//! - `PipelineConfig`: validated, immutable pipeline settings
//! - `Error` / `ErrorKind`: typed error channel
//! - CSV loading and writing of station and control-point files

pub mod config;
pub mod error;
pub mod io;
pub mod points;

pub use config::{InterpolantKind, PipelineConfig, QueryMode};
pub use error::{Error, ErrorKind, Result};
pub use points::{
    ControlKind, ControlPointSet, PointSource, SpatialSample, StationSample, StationSet,
    TrainingSet,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{InterpolantKind, PipelineConfig, QueryMode};
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::points::{
        ControlKind, ControlPointSet, PointSource, SpatialSample, StationSample, StationSet,
        TrainingSet,
    };
}
