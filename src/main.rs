use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use sd_helper::core::{app_state::AppState, menu, settings::HelperSettings, terminal::Console};
use tracing::metadata::LevelFilter;

#[derive(Debug, Parser)]
#[command(name = "sd-helper", version, about = "Stable Diffusion workspace helper")]
struct Cli {
    /// Settings file, defaults to the platform config directory.
    #[arg(long, env = "SD_HELPER_CONFIG")]
    config: Option<PathBuf>,
    /// Workspace directory, defaults to the current directory.
    #[arg(long, short = 'C')]
    workdir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download models from catalog page urls and install them.
    Download {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Send a dataset to the remote editor and restore the edited copy.
    Edit { dataset: String },
    /// List folders that are valid image/caption datasets.
    Datasets,
}

fn download(state: &AppState, console: &mut Console, urls: &[String]) -> Result<()> {
    let mut job = state.new_job()?;
    for url in urls {
        if let Err(error) = job.add(url) {
            println!("{} {error}", style("Ignoring").yellow());
        }
    }
    if job.is_empty() {
        bail!("no valid model urls given");
    }

    let report = state.download_models(&job, console);
    console.print_acquisition_summary(&report);
    if !report.failed.is_empty() {
        bail!("{} of {} downloads failed", report.failed.len(), job.len());
    }
    Ok(())
}

fn edit(state: &AppState, console: &mut Console, dataset: &str) -> Result<()> {
    let report = state.edit_dataset(dataset, console)?;
    println!(
        "{}",
        style(format!(
            "Dataset '{dataset}' updated, {} files restored.",
            report.files_restored
        ))
        .green()
    );
    Ok(())
}

fn list_datasets(state: &AppState) -> Result<()> {
    let datasets = state.datasets()?;
    if datasets.is_empty() {
        println!("No datasets in {}", state.layout().root().display());
    }
    for dataset in datasets {
        println!("{dataset}");
    }
    Ok(())
}

fn setup_logging() {
    let filter = std::env::var("SD_HELPER_LOG")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(LevelFilter::WARN);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let workdir = match cli.workdir {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolve working directory")?,
    };
    let settings = HelperSettings::load(cli.config.as_deref())?;
    tracing::debug!(?settings, workdir = %workdir.display(), "starting");
    let state = AppState::new(settings, workdir)?;
    let mut console = Console::new();

    match cli.command {
        None => menu::run(&state, &mut console),
        Some(Command::Download { urls }) => download(&state, &mut console, &urls),
        Some(Command::Edit { dataset }) => edit(&state, &mut console, &dataset),
        Some(Command::Datasets) => list_datasets(&state),
    }
}
