use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};

use crate::models::{is_plain_name, TransferProgress};

use super::{
    archive::{archive_dataset, archive_path, extract_archive},
    remote::EditService,
    validate::{validate_dataset, DatasetCheck},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundTripState {
    Idle,
    Archiving,
    Uploading,
    AwaitingUserEdit,
    Downloading,
    Extracting,
    Done,
}

impl fmt::Display for RoundTripState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RoundTripState::Idle => "idle",
            RoundTripState::Archiving => "archiving",
            RoundTripState::Uploading => "uploading",
            RoundTripState::AwaitingUserEdit => "awaiting edits",
            RoundTripState::Downloading => "downloading",
            RoundTripState::Extracting => "extracting",
            RoundTripState::Done => "done",
        };
        f.write_str(label)
    }
}

/// The person driving the round trip.
pub trait EditOperator {
    /// Blocks until the operator says their edits at `edit_url` are saved.
    fn await_edits(&mut self, dataset: &str, edit_url: &str) -> Result<()>;
    fn on_state(&mut self, _state: RoundTripState) {}
    fn on_progress(&mut self, _progress: TransferProgress) {}
    /// Called once when a step fails, with the state the run stopped in.
    fn on_failed(&mut self, _state: RoundTripState) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTripReport {
    pub dataset_dir: PathBuf,
    pub edit_url: String,
    pub files_restored: usize,
}

pub struct DatasetRoundTrip<'a> {
    root: &'a Path,
    service: &'a dyn EditService,
    state: RoundTripState,
}

impl<'a> DatasetRoundTrip<'a> {
    pub fn new(root: &'a Path, service: &'a dyn EditService) -> Self {
        Self {
            root,
            service,
            state: RoundTripState::Idle,
        }
    }

    pub fn state(&self) -> RoundTripState {
        self.state
    }

    /// Runs archive, upload, operator edit, download and extract for
    /// `root/<dataset>`. Any failing step ends the run; nothing is rolled back.
    pub fn run(
        &mut self,
        dataset: &str,
        operator: &mut dyn EditOperator,
    ) -> Result<RoundTripReport> {
        let result = self.run_steps(dataset, operator);
        if result.is_err() {
            operator.on_failed(self.state);
        }
        result
    }

    fn run_steps(
        &mut self,
        dataset: &str,
        operator: &mut dyn EditOperator,
    ) -> Result<RoundTripReport> {
        if !is_plain_name(dataset) {
            bail!("'{dataset}' is not a folder in {}", self.root.display());
        }
        let dataset_dir = self.root.join(dataset);
        if let DatasetCheck::Invalid(reason) = validate_dataset(&dataset_dir)? {
            bail!("'{dataset}' is not a dataset: {reason}");
        }

        self.enter(RoundTripState::Archiving, operator);
        let archive = archive_dataset(self.root, dataset)?;

        self.enter(RoundTripState::Uploading, operator);
        let uploaded = self.service.upload(&archive);
        discard(&archive);
        let handle = uploaded.with_context(|| format!("upload '{dataset}'"))?;
        tracing::info!(dataset, %handle, "dataset uploaded");

        self.enter(RoundTripState::AwaitingUserEdit, operator);
        let edit_url = self.service.edit_url(&handle);
        operator.await_edits(dataset, &edit_url)?;

        self.enter(RoundTripState::Downloading, operator);
        let download = archive_path(self.root, dataset);
        let downloaded = self.service.download(
            &handle,
            &download,
            &mut |progress: TransferProgress| operator.on_progress(progress),
        );
        if let Err(error) = downloaded {
            discard(&download);
            return Err(error.context(format!("download edited '{dataset}'")));
        }

        self.enter(RoundTripState::Extracting, operator);
        let extracted = extract_archive(&download, &dataset_dir);
        discard(&download);
        let files_restored = extracted?;

        self.enter(RoundTripState::Done, operator);
        Ok(RoundTripReport {
            dataset_dir,
            edit_url,
            files_restored,
        })
    }

    fn enter(&mut self, state: RoundTripState, operator: &mut dyn EditOperator) {
        tracing::debug!(from = %self.state, to = %state, "dataset round trip");
        self.state = state;
        operator.on_state(state);
    }
}

fn discard(archive: &Path) {
    if !archive.exists() {
        return;
    }
    if let Err(error) = fs::remove_file(archive) {
        tracing::warn!("Failed to remove {}: {error}", archive.display());
    }
}
