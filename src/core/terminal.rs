use std::time::Duration;

use anyhow::Result;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};

use crate::datasets::{EditOperator, RoundTripState};
use crate::models::{
    AcquisitionObserver, AcquisitionReport, DownloadJob, ItemOutcome, ModelMetadata,
    TransferProgress,
};

const SIZED_TEMPLATE: &str = "{msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes}";
const UNSIZED_TEMPLATE: &str = "{spinner:.green} {msg}: {bytes} downloaded";

/// Progress bar for one transfer. Starts as a byte counter and switches to a
/// percentage once the total size is known.
pub struct TransferBar {
    bar: ProgressBar,
    label: String,
    sized: bool,
}

impl TransferBar {
    pub fn new(label: &str) -> Self {
        let label = format!("Downloading '{label}'");
        let bar = ProgressBar::new_spinner();
        bar.set_style(style_for(UNSIZED_TEMPLATE));
        bar.set_message(label.clone());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            label,
            sized: false,
        }
    }

    pub fn update(&mut self, progress: TransferProgress) {
        if let Some(percent) = progress.percent() {
            if !self.sized {
                self.bar.set_style(style_for(SIZED_TEMPLATE));
                self.sized = true;
            }
            if let Some(total) = progress.total {
                self.bar.set_length(total);
            }
            self.bar
                .set_message(format!("{}: {percent}% completed", self.label));
        }
        self.bar.set_position(progress.downloaded);
    }

    pub fn finish(self) {
        self.bar.finish();
    }

    /// Stops the bar where it is, leaving the last line on screen.
    pub fn abandon(self) {
        self.bar.abandon();
    }
}

fn style_for(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .progress_chars("#>-")
}

/// Interactive terminal surface: menus, prompts and progress output.
pub struct Console {
    theme: ColorfulTheme,
    bar: Option<TransferBar>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
            bar: None,
        }
    }

    /// Index of the chosen option.
    pub fn choose<T: ToString>(&self, prompt: &str, options: &[T]) -> Result<usize> {
        let choice = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(options)
            .default(0)
            .interact()?;
        Ok(choice)
    }

    /// Reads model page urls into `job` until a blank line.
    pub fn read_model_urls(&self, job: &mut DownloadJob, example: &str) -> Result<()> {
        println!("Enter links to the models to be downloaded. Press Enter to finish.");
        println!("{}\n", style(format!("(Example: {example})")).dim());

        loop {
            let line = Input::<String>::with_theme(&self.theme)
                .with_prompt(format!("Model {}", job.len() + 1))
                .allow_empty(true)
                .interact_text()?;
            if line.trim().is_empty() {
                break;
            }
            match job.add(&line) {
                Ok(true) => {}
                Ok(false) => println!("{}", style("Already in this batch.").dim()),
                Err(error) => println!(
                    "{} {error}\n",
                    style("Invalid link. Please enter a valid url.").red()
                ),
            }
        }
        println!();
        Ok(())
    }

    pub fn acknowledge(&self, prompt: &str) -> Result<()> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(())
    }

    pub fn print_acquisition_summary(&self, report: &AcquisitionReport) {
        println!();
        println!(
            "{}",
            style(format!(
                "Finished downloading {} models.",
                report.downloaded_count()
            ))
            .bold()
        );
        if !report.skipped.is_empty() {
            println!("{}", style(format!("{} skipped", report.skipped.len())).yellow());
        }
        if !report.failed.is_empty() {
            println!("{}", style(format!("{} failed", report.failed.len())).red());
        }
    }

    fn finish_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}

impl AcquisitionObserver for Console {
    fn on_download_started(&mut self, metadata: &ModelMetadata) {
        self.finish_bar();
        self.bar = Some(TransferBar::new(&metadata.display_name));
    }

    fn on_progress(&mut self, progress: TransferProgress) {
        if let Some(bar) = self.bar.as_mut() {
            bar.update(progress);
        }
    }

    fn on_download_finished(&mut self) {
        self.finish_bar();
    }

    fn on_outcome(&mut self, url: &str, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Installed { display_name, path } => println!(
                "{} '{display_name}' to {}",
                style("Installed").green(),
                path.display()
            ),
            ItemOutcome::Skipped {
                display_name,
                model_type,
            } => println!(
                "{}",
                style(format!(
                    "Skipped download '{display_name}': '{model_type}' is unsupported."
                ))
                .yellow()
            ),
            ItemOutcome::Failed(error) => {
                println!("{} {url}: {error:#}", style("Failed").red())
            }
        }
    }
}

impl EditOperator for Console {
    fn await_edits(&mut self, dataset: &str, edit_url: &str) -> Result<()> {
        println!();
        println!("Edit '{dataset}' in your browser:");
        println!("  {}", style(edit_url).cyan().underlined());
        println!();
        loop {
            let saved = Confirm::with_theme(&self.theme)
                .with_prompt("Have you finished editing and saved your changes?")
                .default(false)
                .interact()?;
            if saved {
                return Ok(());
            }
        }
    }

    fn on_state(&mut self, state: RoundTripState) {
        self.finish_bar();
        match state {
            RoundTripState::Downloading => {
                self.bar = Some(TransferBar::new("edited dataset"));
            }
            RoundTripState::Archiving | RoundTripState::Uploading | RoundTripState::Extracting => {
                println!("{}", style(format!("{}...", capitalize(&state.to_string()))).dim());
            }
            RoundTripState::Idle | RoundTripState::AwaitingUserEdit | RoundTripState::Done => {}
        }
    }

    fn on_progress(&mut self, progress: TransferProgress) {
        if let Some(bar) = self.bar.as_mut() {
            bar.update(progress);
        }
    }

    fn on_failed(&mut self, state: RoundTripState) {
        if let Some(bar) = self.bar.take() {
            bar.abandon();
        }
        tracing::debug!(%state, "round trip stopped");
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
