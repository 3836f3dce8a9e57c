mod commands;
mod output;

use clap::Parser;
use mdrefl::MdReflError;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_tracing(cli.verbose, cli.quiet);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "mdrefl",
    version,
    about = "Reflectometry profiles from molecular-dynamics trajectories"
)]
struct Cli {
    /// More log output (repeat for trace level)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Convert a PDB trajectory into a compressed binary snapshot
    Convert(commands::ConvertArgs),
    /// Report atom types that have no scattering length
    Check(commands::CheckArgs),
    /// Build SLD profiles and reflectivity, averaged over frames
    Run(commands::RunArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Convert(args) => commands::run_convert_command(args),
        CliCommand::Check(args) => commands::run_check_command(args),
        CliCommand::Run(args) => commands::run_analysis_command(args),
    }
}

/// `RUST_LOG` wins over the verbosity flags when set.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{stage} failed: {source}")]
    Compute {
        stage: &'static str,
        #[source]
        source: MdReflError,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    pub(crate) fn compute(stage: &'static str) -> impl FnOnce(MdReflError) -> CliError {
        move |source| CliError::Compute { stage, source }
    }

    fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Compute { source, .. } => source.category().exit_code(),
            Self::Internal(error) => error
                .downcast_ref::<MdReflError>()
                .map_or(1, |e| e.category().exit_code()),
        }
    }
}
