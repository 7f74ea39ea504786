use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.json";
const ENV_CATALOG_URL: &str = "SD_HELPER_CATALOG_URL";
const ENV_EDITOR_URL: &str = "SD_HELPER_EDITOR_URL";
const ENV_WEBUI_DIR: &str = "SD_HELPER_WEBUI_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HelperSettings {
    pub catalog_base_url: String,
    pub editor_base_url: String,
    pub webui_dir: PathBuf,
    pub request_timeout_secs: Option<u64>,
}

impl Default for HelperSettings {
    fn default() -> Self {
        Self {
            catalog_base_url: "https://civitai.com".into(),
            editor_base_url: "http://localhost:5000".into(),
            webui_dir: PathBuf::from("stable-diffusion-webui"),
            request_timeout_secs: None,
        }
    }
}

impl HelperSettings {
    /// Reads `path`, or the platform config file when `path` is `None`, then
    /// applies environment overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => resolve_config_path()?,
        };
        let mut settings = load_settings(&path)?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_CATALOG_URL) {
            self.catalog_base_url = url;
        }
        if let Some(url) = lookup(ENV_EDITOR_URL) {
            self.editor_base_url = url;
        }
        if let Some(dir) = lookup(ENV_WEBUI_DIR) {
            self.webui_dir = PathBuf::from(dir);
        }
    }
}

fn resolve_config_path() -> Result<PathBuf> {
    let project_dirs =
        ProjectDirs::from("com", "SdHelper", "SdHelper").context("missing project directories")?;
    Ok(project_dirs.config_dir().join(CONFIG_FILE))
}

fn load_settings(path: &Path) -> Result<HelperSettings> {
    if !path.exists() {
        tracing::debug!("no config at {}, using defaults", path.display());
        return Ok(HelperSettings::default());
    }
    let bytes = fs::read(path).with_context(|| format!("failed reading {path:?}"))?;
    serde_json::from_slice(&bytes).with_context(|| format!("config {path:?} could not be parsed"))
}
