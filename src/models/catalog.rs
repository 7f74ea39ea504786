use std::fmt;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::reference::ModelReference;

/// Catalog classification of a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModelType {
    Checkpoint,
    TextualInversion,
    Lora,
    Hypernetwork,
    AestheticGradient,
    Controlnet,
    Poses,
    Other(String),
}

impl ModelType {
    pub fn as_str(&self) -> &str {
        match self {
            ModelType::Checkpoint => "Checkpoint",
            ModelType::TextualInversion => "TextualInversion",
            ModelType::Lora => "LORA",
            ModelType::Hypernetwork => "Hypernetwork",
            ModelType::AestheticGradient => "AestheticGradient",
            ModelType::Controlnet => "Controlnet",
            ModelType::Poses => "Poses",
            ModelType::Other(value) => value,
        }
    }
}

impl From<String> for ModelType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Checkpoint" => ModelType::Checkpoint,
            "TextualInversion" => ModelType::TextualInversion,
            "LORA" => ModelType::Lora,
            "Hypernetwork" => ModelType::Hypernetwork,
            "AestheticGradient" => ModelType::AestheticGradient,
            "Controlnet" => ModelType::Controlnet,
            "Poses" => ModelType::Poses,
            _ => ModelType::Other(value),
        }
    }
}

impl From<ModelType> for String {
    fn from(value: ModelType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMetadata {
    pub display_name: String,
    pub file_name: String,
    pub download_url: String,
    pub model_type: ModelType,
    pub sha256: Option<String>,
}

/// Looks up download metadata for a model reference.
pub trait ModelCatalog {
    fn resolve(&self, reference: &ModelReference) -> Result<ModelMetadata>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogModel {
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: ModelType,
    #[serde(default)]
    pub model_versions: Vec<CatalogVersion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogVersion {
    pub id: u64,
    #[serde(default)]
    pub files: Vec<CatalogFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFile {
    pub name: String,
    pub download_url: String,
    #[serde(default)]
    pub hashes: CatalogHashes,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogHashes {
    #[serde(rename = "SHA256", default)]
    pub sha256: Option<String>,
}

impl CatalogModel {
    /// Picks the requested version, falling back to the first one when the
    /// id is absent or unknown, then takes that version's first file.
    pub fn select(self, reference: &ModelReference) -> Result<ModelMetadata> {
        let CatalogModel {
            name,
            model_type,
            model_versions,
        } = self;

        let position = reference
            .model_version_id
            .and_then(|wanted| model_versions.iter().position(|version| version.id == wanted))
            .unwrap_or(0);
        let version = model_versions
            .into_iter()
            .nth(position)
            .ok_or_else(|| anyhow!("model '{}' has no versions", name))?;
        let file = version
            .files
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("version {} of '{}' has no files", version.id, name))?;

        Ok(ModelMetadata {
            display_name: name,
            file_name: file.name,
            download_url: file.download_url,
            model_type,
            sha256: file.hashes.sha256,
        })
    }
}

pub struct CivitaiCatalog {
    client: Client,
    base_url: String,
}

impl CivitaiCatalog {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn model_url(&self, model_id: u64) -> String {
        format!("{}/api/v1/models/{}", self.base_url, model_id)
    }
}

impl ModelCatalog for CivitaiCatalog {
    fn resolve(&self, reference: &ModelReference) -> Result<ModelMetadata> {
        let url = self.model_url(reference.model_id);
        tracing::debug!(%url, "requesting model metadata");
        let model: CatalogModel = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("request {url}"))?
            .error_for_status()
            .with_context(|| format!("metadata lookup {url}"))?
            .json()
            .with_context(|| format!("parse metadata from {url}"))?;
        model.select(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAJICMIX: &str = r#"{"name":"MajicMix","type":"Checkpoint","modelVersions":[{"id":1,"files":[{"name":"majicmix.safetensors","downloadUrl":"https://host/f"}]}]}"#;

    fn two_versions() -> CatalogModel {
        serde_json::from_str(
            r#"{
                "name": "Detail Tweaker",
                "type": "LORA",
                "modelVersions": [
                    {"id": 10, "files": [{"name": "new.safetensors", "downloadUrl": "https://host/new",
                        "hashes": {"SHA256": "ABCD"}}]},
                    {"id": 9, "files": [{"name": "old.safetensors", "downloadUrl": "https://host/old"}]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn selects_first_version_without_version_id() {
        let model: CatalogModel = serde_json::from_str(MAJICMIX).unwrap();
        let reference = ModelReference {
            model_id: 43331,
            model_version_id: None,
        };
        let metadata = model.select(&reference).unwrap();
        assert_eq!(metadata.display_name, "MajicMix");
        assert_eq!(metadata.file_name, "majicmix.safetensors");
        assert_eq!(metadata.download_url, "https://host/f");
        assert_eq!(metadata.model_type, ModelType::Checkpoint);
        assert_eq!(metadata.sha256, None);
    }

    #[test]
    fn selects_matching_version() {
        let reference = ModelReference {
            model_id: 1,
            model_version_id: Some(9),
        };
        let metadata = two_versions().select(&reference).unwrap();
        assert_eq!(metadata.file_name, "old.safetensors");
        assert_eq!(metadata.model_type, ModelType::Lora);
    }

    #[test]
    fn unknown_version_falls_back_to_first() {
        let reference = ModelReference {
            model_id: 1,
            model_version_id: Some(404),
        };
        let metadata = two_versions().select(&reference).unwrap();
        assert_eq!(metadata.file_name, "new.safetensors");
        assert_eq!(metadata.sha256.as_deref(), Some("ABCD"));
    }

    #[test]
    fn empty_versions_is_an_error() {
        let model: CatalogModel =
            serde_json::from_str(r#"{"name":"Empty","type":"Checkpoint","modelVersions":[]}"#)
                .unwrap();
        let reference = ModelReference {
            model_id: 1,
            model_version_id: None,
        };
        assert!(model.select(&reference).is_err());
    }

    #[test]
    fn unrecognised_type_is_kept_verbatim() {
        let model: CatalogModel =
            serde_json::from_str(r#"{"name":"X","type":"LoCon","modelVersions":[]}"#).unwrap();
        assert_eq!(model.model_type, ModelType::Other("LoCon".into()));
        assert_eq!(model.model_type.to_string(), "LoCon");
    }
}
