//! Offsetfield CLI - water-level error fields from station observations

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use offsetfield_algorithms::estimator::{assemble_training_set, ErrorFieldEstimator};
use offsetfield_algorithms::interpolation::QuerySpec;
use offsetfield_algorithms::validation::cross_validate;
use offsetfield_core::io::{
    read_control_points, read_station_values, write_control_points, write_samples,
};
use offsetfield_core::{
    ControlKind, ControlPointSet, InterpolantKind, PipelineConfig, QueryMode, StationSet,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "offsetfield")]
#[command(author, version, about = "Storm-surge error fields from tide-gauge offsets", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the error field and evaluate it at points or on a grid
    Interpolate {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        settings: SettingsArgs,
        #[command(flatten)]
        query: QueryArgs,
        /// Output CSV (LON,LAT,VAL; grid rows are latitude-major)
        #[arg(short, long)]
        output: PathBuf,
        /// Also write the KNN-populated land controls to this CSV
        #[arg(long)]
        land_output: Option<PathBuf>,
    },
    /// K-fold cross-validation of the full pipeline
    CrossValidate {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        settings: SettingsArgs,
        /// Number of folds
        #[arg(short = 'k', long)]
        cv_splits: Option<usize>,
        /// Shuffle stations with this seed before splitting
        #[arg(long)]
        shuffle_seed: Option<u64>,
        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Station CSV (STATIONID, LON, LAT and the station value column)
    #[arg(short, long)]
    stations: PathBuf,
    /// Land control CSV (LON, LAT and the control value column)
    #[arg(long)]
    land: Option<PathBuf>,
    /// Water control CSV (LON, LAT and the control value column)
    #[arg(long)]
    water: Option<PathBuf>,
}

#[derive(Args)]
struct SettingsArgs {
    /// JSON configuration; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Neighbors averaged per land control
    #[arg(short = 'n', long)]
    nearest_neighbors: Option<usize>,
    /// Interpolant: LinearNDInterpolator or CloughTocher2DInterpolator
    #[arg(short, long)]
    interpolant: Option<InterpolantKind>,
    /// Value outside the convex hull of the training points
    #[arg(short, long, allow_hyphen_values = true)]
    fill_value: Option<f64>,
    /// Raw header of the station value column
    #[arg(long)]
    station_value_column: Option<String>,
    /// Raw header of the control value column
    #[arg(long)]
    control_value_column: Option<String>,
}

#[derive(Args)]
struct QueryArgs {
    /// Query longitudes (comma separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    lon: Vec<f64>,
    /// Query latitudes (comma separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    lat: Vec<f64>,
    /// How --lon/--lat are combined: points or grid
    #[arg(short, long)]
    mode: Option<QueryMode>,
    /// Regular grid as LL_LON,LL_LAT,RESOLUTION,NX,NY
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    grid: Option<Vec<f64>>,
    /// Evaluate on the built-in 400 x 500 grid at 0.05 degrees from (-90, 20)
    #[arg(long, conflicts_with = "grid")]
    generic_grid: bool,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn resolve_config(settings: &SettingsArgs) -> Result<PipelineConfig> {
    let mut config = match &settings.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(k) = settings.nearest_neighbors {
        config.nearest_neighbors = k;
    }
    if let Some(kind) = settings.interpolant {
        config.interpolant = kind;
    }
    if let Some(fill) = settings.fill_value {
        config.fill_value = fill;
    }
    if let Some(col) = &settings.station_value_column {
        config.station_value_column = col.clone();
    }
    if let Some(col) = &settings.control_value_column {
        config.control_value_column = col.clone();
    }
    Ok(config)
}

struct Inputs {
    stations: StationSet,
    land: Option<ControlPointSet>,
    water: Option<ControlPointSet>,
}

fn read_controls(
    path: Option<&Path>,
    config: &PipelineConfig,
    kind: ControlKind,
) -> Result<Option<ControlPointSet>> {
    path.map(|p| {
        read_control_points(p, &config.control_value_column, kind)
            .with_context(|| format!("Failed to read control points {}", p.display()))
    })
    .transpose()
}

fn read_inputs(inputs: &InputArgs, config: &PipelineConfig) -> Result<Inputs> {
    let pb = spinner("Reading inputs...")?;
    let stations = read_station_values(&inputs.stations, &config.station_value_column)
        .with_context(|| format!("Failed to read stations {}", inputs.stations.display()))?;
    let land = read_controls(inputs.land.as_deref(), config, ControlKind::Land)?;
    let water = read_controls(inputs.water.as_deref(), config, ControlKind::Water)?;
    pb.finish_and_clear();

    info!(
        "Input: {} stations, {} land controls, {} water controls",
        stations.len(),
        land.as_ref().map_or(0, ControlPointSet::len),
        water.as_ref().map_or(0, ControlPointSet::len)
    );
    Ok(Inputs {
        stations,
        land,
        water,
    })
}

fn build_query(args: QueryArgs, config: &PipelineConfig) -> Result<QuerySpec> {
    if args.generic_grid {
        return Ok(QuerySpec::generic_grid());
    }
    if let Some(g) = args.grid {
        if g.len() != 5 {
            anyhow::bail!("--grid expects LL_LON,LL_LAT,RESOLUTION,NX,NY, got {} values", g.len());
        }
        let count = |v: f64, name: &str| -> Result<usize> {
            if v < 1.0 || v.fract() != 0.0 {
                anyhow::bail!("Grid {} must be a positive integer, got {}", name, v);
            }
            Ok(v as usize)
        };
        let (nx, ny) = (count(g[3], "NX")?, count(g[4], "NY")?);
        return Ok(QuerySpec::regular_grid(g[0], g[1], g[2], nx, ny)?);
    }
    if args.lon.is_empty() || args.lat.is_empty() {
        anyhow::bail!("No query coordinates. Use --lon/--lat, --grid, or --generic-grid.");
    }
    let mode = args.mode.unwrap_or(config.query_mode);
    Ok(QuerySpec::from_mode(mode, args.lon, args.lat)?)
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Interpolate {
            inputs,
            settings,
            query,
            output,
            land_output,
        } => {
            let config = resolve_config(&settings)?;
            config.validate()?;
            let data = read_inputs(&inputs, &config)?;
            let query = build_query(query, &config)?;

            let start = Instant::now();
            let pb = spinner("Fitting error field...")?;
            let (training, land) = assemble_training_set(
                &data.stations,
                data.land.as_ref(),
                data.water.as_ref(),
                config.nearest_neighbors,
            )?;
            let mut estimator = ErrorFieldEstimator::new(config)?;
            estimator.fit(&training)?;
            pb.set_message(format!("Evaluating {} query points...", query.len()));
            let cloud = estimator.transform(&query)?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            write_samples(create_output(&output)?, cloud.samples())
                .context("Failed to write output")?;
            if let Some((ny, nx)) = cloud.shape() {
                info!("Grid: {} x {} (lat x lon)", ny, nx);
            }
            if let (Some(path), Some(land)) = (land_output, land) {
                write_control_points(&path, &land).context("Failed to write land controls")?;
                println!("Land controls saved to: {}", path.display());
            }
            done("Error field", &output, elapsed);
        }

        Commands::CrossValidate {
            inputs,
            settings,
            cv_splits,
            shuffle_seed,
            output,
        } => {
            let mut config = resolve_config(&settings)?;
            if let Some(k) = cv_splits {
                config.cv_splits = k;
            }
            if shuffle_seed.is_some() {
                config.shuffle_seed = shuffle_seed;
            }
            config.validate()?;
            let data = read_inputs(&inputs, &config)?;

            let start = Instant::now();
            let pb = spinner(&format!("Cross-validating ({} folds)...", config.cv_splits))?;
            let report = cross_validate(
                &data.stations,
                data.land.as_ref(),
                data.water.as_ref(),
                &config,
            )?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            let json = serde_json::to_string_pretty(&report.to_json())?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    done("Cross-validation report", &path, elapsed);
                }
                None => {
                    println!("{}", json);
                    println!("  Processing time: {:.2?}", elapsed);
                }
            }
            println!(
                "  Station MSE: mean {:.6}, best {:.6}",
                report.station.mean, report.station.best
            );
            if let Some(control) = &report.control {
                println!(
                    "  Land-control MSE: mean {:.6}, best {:.6}",
                    control.mean, control.best
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_controls_optional_path() {
        let config = PipelineConfig::default();
        assert!(read_controls(None, &config, ControlKind::Land).unwrap().is_none());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "LON,LAT,val\n-70.0,43.0,0.5\n-71.0,42.0,").unwrap();
        let owned: Option<PathBuf> = Some(file.path().to_path_buf());
        let water = read_controls(owned.as_deref(), &config, ControlKind::Water)
            .unwrap()
            .unwrap();
        assert_eq!(water.len(), 2);
        assert_eq!(water.points()[0].value, 0.5);
    }

    #[test]
    fn test_read_controls_reports_path() {
        let config = PipelineConfig::default();
        let missing = Path::new("/nonexistent/controls.csv");
        let err = read_controls(Some(missing), &config, ControlKind::Land).unwrap_err();
        assert!(format!("{:#}", err).contains("controls.csv"));
    }
}
