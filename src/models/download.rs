use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
    time::Duration,
};

use anyhow::{Context, Result};
use reqwest::blocking::Client;

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
}

impl TransferProgress {
    /// Completion percentage, or `None` when the server sent no length.
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(total) if total > 0 => {
                let ratio = (self.downloaded as f64 / total as f64).clamp(0.0, 1.0);
                Some((ratio * 100.0) as u8)
            }
            _ => None,
        }
    }
}

/// Streams a remote file to a local path.
pub trait ModelFetcher {
    fn fetch(
        &self,
        url: &str,
        target: &Path,
        progress: &mut dyn FnMut(TransferProgress),
    ) -> Result<u64>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ModelFetcher for HttpFetcher {
    fn fetch(
        &self,
        url: &str,
        target: &Path,
        progress: &mut dyn FnMut(TransferProgress),
    ) -> Result<u64> {
        download_to_file(&self.client, url, target, progress)
    }
}

pub fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().context("create http client")
}

/// The target file is only created once the server answered with a success
/// status, so a failed request never leaves an empty file behind.
pub fn download_to_file(
    client: &Client,
    url: &str,
    path: &Path,
    progress: &mut dyn FnMut(TransferProgress),
) -> Result<u64> {
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("request {url}"))?
        .error_for_status()
        .with_context(|| format!("download {url}"))?;
    let total = response.content_length();

    let mut file =
        File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut downloaded = 0u64;
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = response.read(&mut buffer).context("read download chunk")?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .context("write download chunk")?;
        downloaded += read as u64;
        progress(TransferProgress { downloaded, total });
    }
    file.flush().context("flush download")?;
    tracing::debug!(%url, bytes = downloaded, "download finished");
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_with_known_total() {
        let progress = TransferProgress {
            downloaded: 512,
            total: Some(2048),
        };
        assert_eq!(progress.percent(), Some(25));
    }

    #[test]
    fn percent_is_clamped() {
        let progress = TransferProgress {
            downloaded: 4096,
            total: Some(2048),
        };
        assert_eq!(progress.percent(), Some(100));
    }

    #[test]
    fn percent_without_total_is_none() {
        let unknown = TransferProgress {
            downloaded: 10,
            total: None,
        };
        let zero = TransferProgress {
            downloaded: 10,
            total: Some(0),
        };
        assert_eq!(unknown.percent(), None);
        assert_eq!(zero.percent(), None);
    }
}
