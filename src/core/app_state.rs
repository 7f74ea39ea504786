use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::datasets::{
    eligible_datasets, DatasetRoundTrip, EditOperator, HttpEditService, RoundTripReport,
};
use crate::models::{
    build_client, AcquisitionObserver, AcquisitionPipeline, AcquisitionReport, CivitaiCatalog,
    DownloadJob, HttpFetcher, WorkspaceLayout,
};

use super::settings::HelperSettings;

pub struct AppState {
    settings: HelperSettings,
    layout: WorkspaceLayout,
    catalog: CivitaiCatalog,
    fetcher: HttpFetcher,
    editor: HttpEditService,
}

impl AppState {
    pub fn new(settings: HelperSettings, workdir: PathBuf) -> Result<Self> {
        let client = build_client(settings.request_timeout())?;
        let layout = WorkspaceLayout::new(workdir, &settings.webui_dir);
        Ok(Self {
            catalog: CivitaiCatalog::new(client.clone(), &settings.catalog_base_url),
            fetcher: HttpFetcher::new(client.clone()),
            editor: HttpEditService::new(client, &settings.editor_base_url),
            layout,
            settings,
        })
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Warning shown at start when the helper is not run from the workspace.
    pub fn workspace_warning(&self) -> Option<String> {
        if self.layout.webui().is_dir() {
            return None;
        }
        Some(format!(
            "{} not found. Make sure you are running from the workspace directory.",
            self.layout.webui().display()
        ))
    }

    pub fn new_job(&self) -> Result<DownloadJob> {
        DownloadJob::new(&self.settings.catalog_base_url)
            .with_context(|| format!("invalid catalog url {}", self.settings.catalog_base_url))
    }

    pub fn download_models(
        &self,
        job: &DownloadJob,
        observer: &mut dyn AcquisitionObserver,
    ) -> AcquisitionReport {
        tracing::info!(models = job.len(), "starting model downloads");
        AcquisitionPipeline::new(&self.catalog, &self.fetcher, &self.layout).run(job, observer)
    }

    pub fn datasets(&self) -> Result<Vec<String>> {
        eligible_datasets(self.layout.root())
    }

    pub fn edit_dataset(
        &self,
        dataset: &str,
        operator: &mut dyn EditOperator,
    ) -> Result<RoundTripReport> {
        DatasetRoundTrip::new(self.layout.root(), &self.editor).run(dataset, operator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn warns_when_webui_is_missing() {
        let temp = TempDir::new().unwrap();
        let state = AppState::new(HelperSettings::default(), temp.path().to_path_buf()).unwrap();
        assert!(state.workspace_warning().is_some());

        std::fs::create_dir(temp.path().join("stable-diffusion-webui")).unwrap();
        assert!(state.workspace_warning().is_none());
    }

    #[test]
    fn jobs_filter_on_configured_catalog() {
        let temp = TempDir::new().unwrap();
        let settings = HelperSettings {
            catalog_base_url: "https://mirror.example".into(),
            ..HelperSettings::default()
        };
        let state = AppState::new(settings, temp.path().to_path_buf()).unwrap();
        let mut job = state.new_job().unwrap();
        assert!(job.add("https://mirror.example/models/5").is_ok());
        assert!(job.add("https://civitai.com/models/5").is_err());
    }
}
