use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static MODEL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"models/(\d+)").expect("model id pattern is valid"));
static MODEL_VERSION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[?&]modelVersionId=(\d+)").expect("model version pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("'{0}' is not a model page url")]
    NotModelPage(String),
    #[error("'{0}' carries an id that does not fit in 64 bits")]
    IdOverflow(String),
}

/// Model id and optional version id taken from a catalog model page url.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelReference {
    pub model_id: u64,
    pub model_version_id: Option<u64>,
}

impl ModelReference {
    pub fn parse(url: &str) -> Result<Self, ReferenceError> {
        let model_id = MODEL_ID
            .captures(url)
            .and_then(|captures| captures.get(1))
            .ok_or_else(|| ReferenceError::NotModelPage(url.to_string()))?;
        let model_id = parse_id(url, model_id.as_str())?;

        let model_version_id = match MODEL_VERSION_ID
            .captures(url)
            .and_then(|captures| captures.get(1))
        {
            Some(digits) => Some(parse_id(url, digits.as_str())?),
            None => None,
        };

        Ok(Self {
            model_id,
            model_version_id,
        })
    }
}

fn parse_id(url: &str, digits: &str) -> Result<u64, ReferenceError> {
    digits
        .parse()
        .map_err(|_| ReferenceError::IdOverflow(url.to_string()))
}

/// Unique model page urls submitted in one batch.
///
/// Urls are deduplicated by exact string, never by the model they resolve to.
#[derive(Debug)]
pub struct DownloadJob {
    page_pattern: Regex,
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl DownloadJob {
    /// `catalog_base_url` is the scheme and host urls must start with,
    /// e.g. `https://civitai.com`.
    pub fn new(catalog_base_url: &str) -> Result<Self, regex::Error> {
        let base = catalog_base_url.trim_end_matches('/');
        let page_pattern = Regex::new(&format!(r"{}/models/\d+", regex::escape(base)))?;
        Ok(Self {
            page_pattern,
            urls: Vec::new(),
            seen: HashSet::new(),
        })
    }

    pub fn accepts(&self, url: &str) -> bool {
        self.page_pattern.is_match(url)
    }

    /// Returns `Ok(false)` when the exact url is already queued.
    pub fn add(&mut self, url: &str) -> Result<bool, ReferenceError> {
        if !self.accepts(url) {
            return Err(ReferenceError::NotModelPage(url.to_string()));
        }
        if !self.seen.insert(url.to_string()) {
            return Ok(false);
        }
        self.urls.push(url.to_string());
        Ok(true)
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
