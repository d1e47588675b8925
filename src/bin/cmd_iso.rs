use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use cmd_isochrones::app::{App, FetchOptions};
use cmd_isochrones::cmd::CmdHttpClient;
use cmd_isochrones::config::ConfigLoader;
use cmd_isochrones::error::IsoError;
use cmd_isochrones::output::{ConsoleOutput, JsonOutput, OutputMode};
use cmd_isochrones::store::{DEFAULT_OUTPUT_DIR, OutputStore};

#[derive(Parser)]
#[command(name = "cmd-iso")]
#[command(about = "Download PARSEC + COLIBRI isochrones from the CMD web service")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Request one isochrone file per metallicity (default command)")]
    Fetch(FetchArgs),
    #[command(about = "List the photometric systems offered by the CMD form")]
    Systems(SystemsArgs),
}

#[derive(Args, Clone, Default)]
struct FetchArgs {
    /// Config file; defaults to cmd-iso.not_tracked.json, then cmd-iso.json.
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    output_dir: Option<String>,

    /// Resolve every query and output path without contacting CMD.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct SystemsArgs {
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<IsoError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &IsoError) -> u8 {
    match error {
        IsoError::InvalidTrack(_)
        | IsoError::InvalidPhotometricSystem(_)
        | IsoError::InvalidImf(_)
        | IsoError::InvalidRange(_)
        | IsoError::InvalidField(_)
        | IsoError::MissingConfig
        | IsoError::ConfigRead(_)
        | IsoError::ConfigParse(_) => 2,
        IsoError::Http(_) | IsoError::Status { .. } => 3,
        IsoError::UnsupportedPhotometricSystem(_) | IsoError::Rejected(_) => 4,
        IsoError::Decode(_) | IsoError::BlockCountMismatch { .. } => 5,
        IsoError::Filesystem(_) => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command.unwrap_or(Commands::Fetch(FetchArgs::default())) {
        Commands::Fetch(args) => run_fetch(args, output_mode),
        Commands::Systems(args) => run_systems(args, output_mode),
    }
}

fn run_fetch(args: FetchArgs, output_mode: OutputMode) -> miette::Result<()> {
    let FetchArgs {
        config,
        output_dir,
        dry_run,
    } = args;

    let mut resolved = ConfigLoader::resolve(config.as_deref())?;
    if let Some(output_dir) = output_dir {
        resolved.output_dir = Utf8PathBuf::from(output_dir);
    }

    let client = CmdHttpClient::new(resolved.timeout)?;
    let app = App::new(client, OutputStore::new(resolved.output_dir.clone()));
    let options = FetchOptions { dry_run };

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.fetch(&resolved, options, &JsonOutput)?;
            JsonOutput::print_fetch(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.fetch(&resolved, options, &ConsoleOutput)?;
            ConsoleOutput::print_fetch(&result);
        }
    }
    Ok(())
}

fn run_systems(args: SystemsArgs, output_mode: OutputMode) -> miette::Result<()> {
    let client = CmdHttpClient::new(args.timeout_secs.map(Duration::from_secs))?;
    let app = App::new(client, OutputStore::new(Utf8PathBuf::from(DEFAULT_OUTPUT_DIR)));

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.systems(&JsonOutput)?;
            JsonOutput::print_systems(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.systems(&ConsoleOutput)?;
            ConsoleOutput::print_systems(&result);
        }
    }
    Ok(())
}
