//! CSV loading and writing of point datasets
//!
//! Header names are normalized (all whitespace removed, upper-cased) before
//! matching. The caller names the raw value column; it becomes `VAL`.
//! After normalization each required column must appear exactly once.
//! Unrecognized columns are ignored.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::points::{ControlKind, ControlPointSet, SpatialSample, StationSample, StationSet};

const CONTROL_COLUMNS: [&str; 3] = ["LON", "LAT", "VAL"];
const STATION_COLUMNS: [&str; 4] = ["STATIONID", "LON", "LAT", "VAL"];

fn normalize_header(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Normalized headers with the value column renamed to `VAL` and, for
/// station files, `STATION` renamed to `STATIONID`.
fn canonical_headers(headers: &StringRecord, value_column: &str, stations: bool) -> Vec<String> {
    let value_column = normalize_header(value_column);
    headers
        .iter()
        .map(|h| {
            let h = normalize_header(h);
            if h == value_column {
                "VAL".to_string()
            } else if stations && h == "STATION" {
                "STATIONID".to_string()
            } else {
                h
            }
        })
        .collect()
}

/// Column index of each required name, failing unless every name occurs once.
fn locate_columns<const N: usize>(
    source_name: &str,
    headers: &[String],
    required: [&'static str; N],
) -> Result<[usize; N]> {
    let mut found = [0usize; N];
    for (slot, name) in found.iter_mut().zip(required) {
        let mut positions = headers.iter().enumerate().filter(|(_, h)| h.as_str() == name);
        match (positions.next(), positions.next()) {
            (Some((idx, _)), None) => *slot = idx,
            _ => {
                return Err(Error::MissingColumns {
                    source_name: source_name.to_string(),
                    expected: required.to_vec(),
                    found: headers.to_vec(),
                })
            }
        }
    }
    Ok(found)
}

fn field<'r>(record: &'r StringRecord, idx: usize, row: usize, column: &str) -> Result<&'r str> {
    record.get(idx).ok_or_else(|| Error::Parse {
        row,
        column: column.to_string(),
        value: String::new(),
    })
}

fn parse_coordinate(record: &StringRecord, idx: usize, row: usize, column: &str) -> Result<f64> {
    let raw = field(record, idx, row, column)?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Error::Parse {
            row,
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Values may be missing; missing cells become NaN. Any other non-finite
/// value is a parse error.
fn parse_value(record: &StringRecord, idx: usize, row: usize) -> Result<f64> {
    let raw = field(record, idx, row, "VAL")?;
    if raw.is_empty() || matches!(raw.to_lowercase().as_str(), "nan" | "na" | "null" | "none") {
        return Ok(f64::NAN);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Error::Parse {
            row,
            column: "VAL".into(),
            value: raw.to_string(),
        }),
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader)
}

/// Read a control-point CSV file.
///
/// # Arguments
/// * `path` - CSV file with a header row
/// * `value_column` - Raw header of the value column (default in configs: `val`)
/// * `kind` - Land controls come back unpopulated; water controls as loaded
pub fn read_control_points(
    path: impl AsRef<Path>,
    value_column: &str,
    kind: ControlKind,
) -> Result<ControlPointSet> {
    let path = path.as_ref();
    let file = File::open(path)?;
    parse_control_points(file, &path.display().to_string(), value_column, kind)
}

/// Same as [`read_control_points`] from any reader.
pub fn read_control_points_from_reader<R: Read>(
    reader: R,
    value_column: &str,
    kind: ControlKind,
) -> Result<ControlPointSet> {
    parse_control_points(reader, "<reader>", value_column, kind)
}

fn parse_control_points<R: Read>(
    reader: R,
    source_name: &str,
    value_column: &str,
    kind: ControlKind,
) -> Result<ControlPointSet> {
    let mut rdr = csv_reader(reader);
    let headers = canonical_headers(rdr.headers()?, value_column, false);
    let [lon_idx, lat_idx, val_idx] = locate_columns(source_name, &headers, CONTROL_COLUMNS)?;

    let mut points = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        points.push(SpatialSample::new(
            parse_coordinate(&record, lon_idx, row, "LON")?,
            parse_coordinate(&record, lat_idx, row, "LAT")?,
            parse_value(&record, val_idx, row)?,
        ));
    }

    info!("{}: loaded {} {:?} control points", source_name, points.len(), kind);
    Ok(ControlPointSet::of_kind(kind, points))
}

/// Read a station (averaging) CSV file.
///
/// # Arguments
/// * `path` - CSV file with a header row containing a `STATION`/`STATIONID` column
/// * `value_column` - Raw header of the value column (default in configs: `mean`)
pub fn read_station_values(path: impl AsRef<Path>, value_column: &str) -> Result<StationSet> {
    let path = path.as_ref();
    let file = File::open(path)?;
    parse_station_values(file, &path.display().to_string(), value_column)
}

/// Same as [`read_station_values`] from any reader.
pub fn read_station_values_from_reader<R: Read>(
    reader: R,
    value_column: &str,
) -> Result<StationSet> {
    parse_station_values(reader, "<reader>", value_column)
}

fn parse_station_values<R: Read>(
    reader: R,
    source_name: &str,
    value_column: &str,
) -> Result<StationSet> {
    let mut rdr = csv_reader(reader);
    let headers = canonical_headers(rdr.headers()?, value_column, true);
    let [id_idx, lon_idx, lat_idx, val_idx] =
        locate_columns(source_name, &headers, STATION_COLUMNS)?;

    let mut samples = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        samples.push(StationSample::new(
            field(&record, id_idx, row, "STATIONID")?,
            parse_coordinate(&record, lon_idx, row, "LON")?,
            parse_coordinate(&record, lat_idx, row, "LAT")?,
            parse_value(&record, val_idx, row)?,
        ));
    }

    info!("{}: loaded {} stations", source_name, samples.len());
    Ok(StationSet::new(samples))
}

#[derive(Serialize)]
struct SampleRecord {
    #[serde(rename = "LON")]
    lon: f64,
    #[serde(rename = "LAT")]
    lat: f64,
    #[serde(rename = "VAL")]
    val: f64,
}

#[derive(Serialize)]
struct StationRecord<'a> {
    #[serde(rename = "STATIONID")]
    station_id: &'a str,
    #[serde(rename = "LON")]
    lon: f64,
    #[serde(rename = "LAT")]
    lat: f64,
    #[serde(rename = "VAL")]
    val: f64,
}

/// Write `(lon, lat, value)` triples with a `LON,LAT,VAL` header.
pub fn write_samples<W: Write>(writer: W, samples: &[SpatialSample]) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    for s in samples {
        wtr.serialize(SampleRecord {
            lon: s.lon,
            lat: s.lat,
            val: s.value,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a control set to a CSV file.
pub fn write_control_points(path: impl AsRef<Path>, controls: &ControlPointSet) -> Result<()> {
    write_samples(File::create(path)?, controls.points())
}

/// Write a station set to a CSV file with a `STATIONID,LON,LAT,VAL` header.
pub fn write_station_values(path: impl AsRef<Path>, stations: &StationSet) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(File::create(path)?);
    for s in stations.iter() {
        wtr.serialize(StationRecord {
            station_id: &s.station_id,
            lon: s.sample.lon,
            lat: s.sample.lat,
            val: s.sample.value,
        })?;
    }
    wtr.flush()?;
    Ok(())
}
