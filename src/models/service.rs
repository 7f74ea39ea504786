use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{
    catalog::{ModelCatalog, ModelMetadata, ModelType},
    download::{ModelFetcher, TransferProgress},
    metadata::{checksum_matches, compute_sha256},
    placement::{is_plain_name, place, route, Route, WorkspaceLayout},
    reference::{DownloadJob, ModelReference},
};

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("'{name}' has unknown model type '{model_type}'")]
    UnknownModelType { name: String, model_type: ModelType },
    #[error("catalog file name '{0}' is not a plain file name")]
    UnsafeFileName(String),
    #[error("destination directory {} does not exist", .0.display())]
    MissingDestination(PathBuf),
    #[error("checksum mismatch for '{file}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },
}

/// Receives per-item events while a batch runs.
pub trait AcquisitionObserver {
    fn on_download_started(&mut self, _metadata: &ModelMetadata) {}
    fn on_progress(&mut self, _progress: TransferProgress) {}
    fn on_download_finished(&mut self) {}
    fn on_outcome(&mut self, _url: &str, _outcome: &ItemOutcome) {}
}

impl AcquisitionObserver for () {}

#[derive(Debug)]
pub enum ItemOutcome {
    Installed {
        display_name: String,
        path: PathBuf,
    },
    Skipped {
        display_name: String,
        model_type: ModelType,
    },
    Failed(anyhow::Error),
}

#[derive(Debug, Default)]
pub struct AcquisitionReport {
    pub installed: Vec<PathBuf>,
    pub skipped: Vec<(String, ModelType)>,
    pub failed: Vec<(String, anyhow::Error)>,
}

impl AcquisitionReport {
    #[must_use]
    pub fn downloaded_count(&self) -> usize {
        self.installed.len()
    }
}

pub struct AcquisitionPipeline<'a> {
    catalog: &'a dyn ModelCatalog,
    fetcher: &'a dyn ModelFetcher,
    layout: &'a WorkspaceLayout,
}

impl<'a> AcquisitionPipeline<'a> {
    pub fn new(
        catalog: &'a dyn ModelCatalog,
        fetcher: &'a dyn ModelFetcher,
        layout: &'a WorkspaceLayout,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            layout,
        }
    }

    /// Processes every url in turn. A failing item never stops the batch.
    pub fn run(
        &self,
        job: &DownloadJob,
        observer: &mut dyn AcquisitionObserver,
    ) -> AcquisitionReport {
        let mut report = AcquisitionReport::default();
        for url in job.urls() {
            let outcome = match self.acquire(url, observer) {
                Ok(outcome) => outcome,
                Err(error) => ItemOutcome::Failed(error),
            };
            observer.on_outcome(url, &outcome);
            match outcome {
                ItemOutcome::Installed { display_name, path } => {
                    tracing::info!(model = %display_name, path = %path.display(), "model installed");
                    report.installed.push(path);
                }
                ItemOutcome::Skipped {
                    display_name,
                    model_type,
                } => {
                    tracing::info!(model = %display_name, %model_type, "skipped unsupported model");
                    report.skipped.push((display_name, model_type));
                }
                ItemOutcome::Failed(error) => {
                    tracing::warn!(%url, "model download failed: {error:#}");
                    report.failed.push((url.clone(), error));
                }
            }
        }
        report
    }

    fn acquire(&self, url: &str, observer: &mut dyn AcquisitionObserver) -> Result<ItemOutcome> {
        let reference = ModelReference::parse(url)?;
        let metadata = self
            .catalog
            .resolve(&reference)
            .with_context(|| format!("resolve model {}", reference.model_id))?;

        let destination = match route(&metadata.model_type) {
            Route::Install(destination) => destination,
            Route::Unsupported => {
                return Ok(ItemOutcome::Skipped {
                    display_name: metadata.display_name,
                    model_type: metadata.model_type,
                })
            }
            Route::Unknown => {
                return Err(AcquireError::UnknownModelType {
                    name: metadata.display_name,
                    model_type: metadata.model_type,
                }
                .into())
            }
        };

        let file_name = plain_file_name(&metadata.file_name)?;
        let dest_dir = self.layout.destination_dir(destination);
        if !dest_dir.is_dir() {
            return Err(AcquireError::MissingDestination(dest_dir).into());
        }

        let staged = self.layout.staging_path(file_name);
        observer.on_download_started(&metadata);
        let fetched = self.fetcher.fetch(
            &metadata.download_url,
            &staged,
            &mut |progress: TransferProgress| observer.on_progress(progress),
        );
        observer.on_download_finished();
        let bytes = fetched.with_context(|| format!("download '{}'", metadata.display_name))?;
        tracing::debug!(file = %file_name, bytes, "staged model file");

        if let Some(expected) = &metadata.sha256 {
            verify_checksum(&staged, file_name, expected)?;
        }

        let path = place(&staged, &dest_dir)?;
        Ok(ItemOutcome::Installed {
            display_name: metadata.display_name,
            path,
        })
    }
}

fn plain_file_name(name: &str) -> Result<&str, AcquireError> {
    if is_plain_name(name) {
        Ok(name)
    } else {
        Err(AcquireError::UnsafeFileName(name.to_string()))
    }
}

fn verify_checksum(staged: &Path, file_name: &str, expected: &str) -> Result<()> {
    let actual = compute_sha256(staged)?;
    if checksum_matches(expected, &actual) {
        return Ok(());
    }
    if let Err(error) = fs::remove_file(staged) {
        tracing::warn!("Failed to remove corrupt download {}: {error}", staged.display());
    }
    Err(AcquireError::ChecksumMismatch {
        file: file_name.to_string(),
        expected: expected.to_string(),
        actual,
    }
    .into())
}
