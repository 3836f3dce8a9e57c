use super::CliError;
use super::output::{
    FITTED_FILE, REFLECTIVITY_FILE, SLD_FILE, SUMMARY_FILE, Summary, write_profile,
    write_reflectivity, write_summary,
};
use anyhow::{Context, anyhow};
use mdrefl::{
    Comparison, DatOptions, Job, JobConfig, QSet, TimeSelection, read_dat, read_lgt, read_pdb,
    read_snapshot,
};
use mdrefl_data::{SNAPSHOT_FORMAT_VERSION, Trajectory, TrajectorySnapshot};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DEFAULT_Q_GRID: QGrid = QGrid {
    start: 0.005,
    end: 0.5,
    count: 50,
};

#[derive(clap::Args)]
pub(super) struct ConvertArgs {
    /// PDB trajectory to convert
    pdb: PathBuf,

    /// Snapshot output path
    #[arg(short, long)]
    output: PathBuf,

    /// Mirror depths through the cell before storing
    #[arg(long)]
    flip: bool,
}

#[derive(clap::Args)]
pub(super) struct CheckArgs {
    /// PDB trajectory or .zst snapshot
    trajectory: PathBuf,

    /// Scattering length table
    #[arg(long)]
    lgt: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// PDB trajectory or .zst snapshot
    trajectory: PathBuf,

    /// Scattering length table
    #[arg(long)]
    lgt: PathBuf,

    /// Experimental data with 2 to 4 columns: q R [dR [dq]]
    #[arg(long, conflicts_with = "q_grid")]
    dat: Option<PathBuf>,

    /// Synthetic q grid as start,end,count
    #[arg(long, value_parser = parse_q_grid)]
    q_grid: Option<QGrid>,

    /// Space the synthetic grid evenly in log q
    #[arg(long, requires = "q_grid")]
    log_q: bool,

    /// JSON file with analysis parameters; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Layer thickness in Å
    #[arg(long)]
    layer_thickness: Option<f64>,

    /// Length at the top of the cell excluded from the profile, in Å
    #[arg(long)]
    cutoff: Option<f64>,

    /// Frames to analyse as start,stop,step
    #[arg(long, value_parser = parse_times)]
    times: Option<TimeSelection>,

    /// q resolution in percent, used when the data has no dq column
    #[arg(long)]
    resolution: Option<f64>,

    /// Intensity error in percent, used when the data has no dR column
    #[arg(long)]
    ierror: Option<f64>,

    /// Mirror depths through the cell when reading PDB text
    #[arg(long)]
    flip: bool,

    /// Fit scale and background against the experimental data
    #[arg(long, requires = "dat")]
    fit: bool,

    /// Directory for the output files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct QGrid {
    start: f64,
    end: f64,
    count: usize,
}

fn split_triple(value: &str) -> Result<[&str; 3], String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    match parts[..] {
        [a, b, c] => Ok([a, b, c]),
        _ => Err(format!("expected three comma separated values, got '{value}'")),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid number '{value}'"))
}

fn parse_q_grid(value: &str) -> Result<QGrid, String> {
    let [start, end, count] = split_triple(value)?;
    Ok(QGrid {
        start: parse_number(start)?,
        end: parse_number(end)?,
        count: parse_number(count)?,
    })
}

fn parse_times(value: &str) -> Result<TimeSelection, String> {
    let [start, stop, step] = split_triple(value)?;
    Ok(TimeSelection::Range {
        start: parse_number(start)?,
        stop: parse_number(stop)?,
        step: parse_number(step)?,
    })
}

fn is_snapshot(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "zst")
}

fn load_trajectory(path: &Path, flip: bool) -> Result<Trajectory, CliError> {
    if is_snapshot(path) {
        if flip {
            warn!("--flip is ignored for snapshots; flip when converting instead");
        }
        read_snapshot(path).map_err(CliError::compute("reading trajectory"))
    } else {
        read_pdb(path, flip).map_err(CliError::compute("reading trajectory"))
    }
}

pub(super) fn run_convert_command(args: ConvertArgs) -> Result<i32, CliError> {
    let trajectory = read_pdb(&args.pdb, args.flip).map_err(CliError::compute("reading trajectory"))?;
    let frames = trajectory.frames.len();
    let snapshot = TrajectorySnapshot {
        format_version: SNAPSHOT_FORMAT_VERSION,
        source: args
            .pdb
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        trajectory,
    };

    let serialized =
        postcard::to_allocvec(&snapshot).map_err(|e| anyhow!("failed to serialize snapshot: {e}"))?;
    let compressed = zstd::encode_all(&serialized[..], 19).context("zstd compression failed")?;
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&args.output, &compressed)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    info!(
        frames,
        serialized = serialized.len(),
        compressed = compressed.len(),
        "wrote snapshot"
    );
    println!(
        "wrote {} frames to {} ({} bytes)",
        frames,
        args.output.display(),
        compressed.len()
    );
    Ok(0)
}

pub(super) fn run_check_command(args: CheckArgs) -> Result<i32, CliError> {
    let trajectory = load_trajectory(&args.trajectory, false)?;
    let table = read_lgt(&args.lgt).map_err(CliError::compute("reading scattering lengths"))?;

    let types = trajectory.atom_types();
    let missing = table.missing_types(&trajectory);
    println!(
        "{} frames, {} atom types, {} scattering lengths",
        trajectory.frames.len(),
        types.len(),
        table.len()
    );
    if missing.is_empty() {
        println!("all atom types covered");
        return Ok(0);
    }
    for atom_type in &missing {
        println!("missing: {atom_type}");
    }
    Ok(mdrefl::ErrorCategory::DataIntegrity.exit_code())
}

fn load_config(args: &RunArgs) -> Result<JobConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid job configuration in {}", path.display()))?
        }
        None => JobConfig::default(),
    };
    if let Some(v) = args.layer_thickness {
        config.layer_thickness = v;
    }
    if let Some(v) = args.cutoff {
        config.cutoff = v;
    }
    if let Some(times) = &args.times {
        config.times = times.clone();
    }
    if let Some(v) = args.resolution {
        config.resolution_percent = v;
    }
    if let Some(v) = args.ierror {
        config.intensity_error_percent = v;
    }
    config.flip |= args.flip;
    Ok(config)
}

fn load_qset(args: &RunArgs, config: &JobConfig) -> Result<QSet, CliError> {
    if let Some(path) = &args.dat {
        let options = DatOptions {
            resolution_percent: config.resolution_percent,
            intensity_error_percent: config.intensity_error_percent,
        };
        return read_dat(path, &options).map_err(CliError::compute("reading experimental data"));
    }
    let grid = args.q_grid.unwrap_or(DEFAULT_Q_GRID);
    let qset = if args.log_q {
        QSet::logarithmic(grid.start, grid.end, grid.count, config.resolution_percent)
    } else {
        QSet::linear(grid.start, grid.end, grid.count, config.resolution_percent)
    };
    qset.map_err(CliError::compute("building q grid"))
}

pub(super) fn run_analysis_command(args: RunArgs) -> Result<i32, CliError> {
    let config = load_config(&args)?;
    let trajectory = load_trajectory(&args.trajectory, config.flip)?;
    let table = read_lgt(&args.lgt).map_err(CliError::compute("reading scattering lengths"))?;
    let qset = load_qset(&args, &config)?;

    let job = Job::new(trajectory, table, config).map_err(CliError::compute("preparing analysis"))?;
    let output = job.run(&qset).map_err(CliError::compute("analysis"))?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;
    let dir = &args.output_dir;
    write_profile(&dir.join(SLD_FILE), &output.averaged_profile)?;
    write_reflectivity(&dir.join(REFLECTIVITY_FILE), &output.averaged)?;
    let mut files = vec![SLD_FILE, REFLECTIVITY_FILE];

    let fit = if args.fit {
        let mut comparison = Comparison::new(&qset, &output.averaged, 1.0, 0.0)
            .map_err(CliError::compute("fitting"))?;
        let result = comparison.fit().map_err(CliError::compute("fitting"))?;
        write_reflectivity(&dir.join(FITTED_FILE), &comparison.fitted())?;
        files.push(FITTED_FILE);
        println!(
            "scale = {:.6e}, background = {:.6e}, chi2 = {:.6e}",
            result.scale, result.background, result.chi_squared
        );
        Some(result)
    } else {
        None
    };

    files.push(SUMMARY_FILE);
    let summary = Summary {
        trajectory: args.trajectory.display().to_string(),
        scattering_lengths: args.lgt.display().to_string(),
        frame_times: output.profiles.iter().map(|p| p.time).collect(),
        layers: output.averaged_profile.layers.len(),
        q_points: output.averaged.points.len(),
        config: job.config(),
        fit,
        files: files.clone(),
    };
    write_summary(&dir.join(SUMMARY_FILE), &summary)?;

    println!(
        "{} frames analysed, wrote {} to {}",
        summary.frame_times.len(),
        files.join(", "),
        dir.display()
    );
    Ok(0)
}
