//! I/O for point datasets
//!
//! Tabular CSV sources are normalized to canonical `LON, LAT, VAL`
//! (controls) or `STATIONID, LON, LAT, VAL` (stations) shapes.

mod table;

pub use table::{
    read_control_points, read_control_points_from_reader, read_station_values,
    read_station_values_from_reader, write_control_points, write_samples, write_station_values,
};
