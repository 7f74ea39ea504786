use anyhow::Result;
use console::style;

use super::{app_state::AppState, terminal::Console};

const EXAMPLE_URL: &str = "https://civitai.com/models/43331/majicmix-realistic";
const MAIN_MENU: [&str; 3] = ["Download models", "Edit datasets", "Quit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    Continue,
    Quit,
}

enum MainAction {
    DownloadModels,
    EditDatasets,
}

impl MainAction {
    fn from_choice(choice: usize) -> Option<Self> {
        match choice {
            0 => Some(MainAction::DownloadModels),
            1 => Some(MainAction::EditDatasets),
            _ => None,
        }
    }
}

/// Shows the main menu until the operator quits.
pub fn run(state: &AppState, console: &mut Console) -> Result<()> {
    welcome(state);
    loop {
        let choice = console.choose("Please select an option", &MAIN_MENU)?;
        let outcome = match MainAction::from_choice(choice) {
            Some(MainAction::DownloadModels) => download_models(state, console)?,
            Some(MainAction::EditDatasets) => edit_datasets(state, console)?,
            None => MenuOutcome::Quit,
        };
        if outcome == MenuOutcome::Quit {
            tracing::debug!("leaving main menu");
            return Ok(());
        }
        println!();
    }
}

fn welcome(state: &AppState) {
    println!();
    println!("{}", style("RunPod Stable Diffusion Helper").bold());
    println!();
    if let Some(warning) = state.workspace_warning() {
        println!("{}", style(warning).yellow());
        println!();
    }
}

fn download_models(state: &AppState, console: &mut Console) -> Result<MenuOutcome> {
    let mut job = state.new_job()?;
    console.read_model_urls(&mut job, EXAMPLE_URL)?;
    if job.is_empty() {
        println!("No models entered.");
        return Ok(MenuOutcome::Continue);
    }

    let report = state.download_models(&job, console);
    console.print_acquisition_summary(&report);
    console.acknowledge("Press Enter to continue")?;
    Ok(MenuOutcome::Continue)
}

fn edit_datasets(state: &AppState, console: &mut Console) -> Result<MenuOutcome> {
    let datasets = state.datasets()?;
    if datasets.is_empty() {
        println!(
            "{}",
            style("No datasets found. A dataset is a folder of images with matching .txt captions.")
                .yellow()
        );
        console.acknowledge("Press Enter to continue")?;
        return Ok(MenuOutcome::Continue);
    }

    let mut options = datasets.clone();
    options.push("Back".into());
    let choice = console.choose("Select a dataset to edit", &options)?;
    let Some(dataset) = datasets.get(choice) else {
        return Ok(MenuOutcome::Continue);
    };

    match state.edit_dataset(dataset, console) {
        Ok(report) => println!(
            "{}",
            style(format!(
                "Dataset '{dataset}' updated, {} files restored to {}.",
                report.files_restored,
                report.dataset_dir.display()
            ))
            .green()
        ),
        Err(error) => {
            tracing::warn!(dataset = %dataset, "dataset round trip failed: {error:#}");
            println!("{} {error:#}", style(format!("Editing '{dataset}' failed:")).red());
        }
    }
    console.acknowledge("Press Enter to continue")?;
    Ok(MenuOutcome::Continue)
}
