use std::{fmt, path::Path};

use anyhow::{bail, Context, Result};
use reqwest::blocking::{multipart::Form, Client};

use crate::models::{download_to_file, TransferProgress};

/// Path fragment naming an edit session on the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditHandle(String);

impl EditHandle {
    /// Builds a handle from the upload response body. Spaces are
    /// percent-encoded so the handle can be dropped into a url path.
    pub fn from_response(body: &str) -> Result<Self> {
        let fragment = body.trim().trim_matches('/');
        if fragment.is_empty() {
            bail!("edit service returned an empty session handle");
        }
        Ok(Self(fragment.replace(' ', "%20")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EditHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The remote dataset editor.
pub trait EditService {
    fn upload(&self, archive: &Path) -> Result<EditHandle>;
    /// Browser url the operator opens to edit the session.
    fn edit_url(&self, handle: &EditHandle) -> String;
    fn download(
        &self,
        handle: &EditHandle,
        target: &Path,
        progress: &mut dyn FnMut(TransferProgress),
    ) -> Result<u64>;
}

pub struct HttpEditService {
    client: Client,
    base_url: String,
}

impl HttpEditService {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl EditService for HttpEditService {
    fn upload(&self, archive: &Path) -> Result<EditHandle> {
        let url = format!("{}/upload", self.base_url);
        let form = Form::new()
            .file("file", archive)
            .with_context(|| format!("attach {}", archive.display()))?;
        tracing::debug!(%url, archive = %archive.display(), "uploading dataset");
        let body = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .with_context(|| format!("request {url}"))?
            .error_for_status()
            .with_context(|| format!("upload to {url}"))?
            .text()
            .context("read upload response")?;
        EditHandle::from_response(&body)
    }

    fn edit_url(&self, handle: &EditHandle) -> String {
        format!("{}/edit/{}", self.base_url, handle)
    }

    fn download(
        &self,
        handle: &EditHandle,
        target: &Path,
        progress: &mut dyn FnMut(TransferProgress),
    ) -> Result<u64> {
        let url = format!("{}/download/{}", self.base_url, handle);
        download_to_file(&self.client, &url, target, progress)
    }
}
