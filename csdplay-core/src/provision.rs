//! Resource provisioning: fetch the samples a document references before it
//! is compiled.
//!
//! The provisioner diffs the catalog against the document text and the set of
//! names already installed, then fetches what is missing one at a time in
//! catalog order. Failed fetches are logged and dropped; a missing sample
//! surfaces later as a compile error from the engine.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::catalog::{resolve_name, ResourceCatalog};
use crate::config::Config;

pub type FetchResult<T = Vec<u8>> = Result<T, FetchError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with something other than 200.
    Status(u16),
    Transport(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "HTTP status {}", code),
            Self::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}

impl std::error::Error for FetchError {}

/// Where resource bytes come from.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn fetch(&self, name: &str) -> FetchResult;
}

/// Fetches `GET {base_url}{path_prefix}/{name}`.
pub struct HttpResourceSource {
    client: reqwest::Client,
    root: String,
}

impl HttpResourceSource {
    pub fn new(base_url: &str, path_prefix: &str, timeout: Duration) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("create http client failed: {e}")))?;
        let root = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path_prefix.trim_matches('/')
        );
        Ok(Self { client, root })
    }

    pub fn from_config(config: &Config) -> FetchResult<Self> {
        Self::new(config.base_url(), config.path_prefix(), config.request_timeout())
    }

    pub fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.root, name)
    }
}

#[async_trait]
impl ResourceSource for HttpResourceSource {
    async fn fetch(&self, name: &str) -> FetchResult {
        let url = self.url_for(name);
        log::debug!(target: "provision", "GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// In-memory source. Records every requested name so tests can check
/// which names went over the wire and in what order.
#[derive(Default)]
pub struct StaticSource {
    files: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.into(), bytes.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceSource for StaticSource {
    async fn fetch(&self, name: &str) -> FetchResult {
        self.requests.lock().unwrap().push(name.to_string());
        self.files.get(name).cloned().ok_or(FetchError::Status(404))
    }
}

#[async_trait]
impl<S: ResourceSource + ?Sized> ResourceSource for Arc<S> {
    async fn fetch(&self, name: &str) -> FetchResult {
        (**self).fetch(name).await
    }
}

/// Resources fetched by one provisioning pass, keyed by resolved name and
/// kept in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionedResources {
    entries: Vec<(String, Vec<u8>)>,
}

impl ProvisionedResources {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, name: String, bytes: Vec<u8>) {
        self.entries.push((name, bytes));
    }
}

pub struct ResourceProvisioner {
    catalog: Arc<ResourceCatalog>,
    source: Box<dyn ResourceSource>,
}

impl ResourceProvisioner {
    pub fn new(catalog: Arc<ResourceCatalog>, source: impl ResourceSource + 'static) -> Self {
        Self {
            catalog,
            source: Box::new(source),
        }
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    /// Fetch every catalog resource `document` mentions that is not yet in
    /// `already_loaded`. An entry counts as loaded under either its catalog
    /// name or its resolved name.
    pub async fn diff_and_fetch(
        &self,
        document: &str,
        already_loaded: &HashSet<String>,
    ) -> ProvisionedResources {
        let mut fetched = ProvisionedResources::default();
        for name in self.catalog.names() {
            let resolved = resolve_name(name);
            if already_loaded.contains(name) || already_loaded.contains(resolved) {
                continue;
            }
            if !document.contains(name.as_str()) {
                continue;
            }
            match self.source.fetch(resolved).await {
                Ok(bytes) => {
                    log::debug!(
                        target: "provision",
                        "fetched {} ({} bytes)",
                        resolved,
                        bytes.len()
                    );
                    fetched.push(resolved.to_string(), bytes);
                }
                Err(e) => {
                    log::warn!(target: "provision", "skipping {}: {}", resolved, e);
                }
            }
        }
        fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provisioner(names: &[&str], source: Arc<StaticSource>) -> ResourceProvisioner {
        let catalog = Arc::new(ResourceCatalog::new(names.iter().copied()));
        ResourceProvisioner::new(catalog, source)
    }

    fn loaded(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn unreferenced_names_are_not_fetched() {
        let source = Arc::new(StaticSource::new().with_file("piano.wav", vec![1, 2, 3]));
        let p = provisioner(&["piano.wav"], source.clone());
        let result = p
            .diff_and_fetch("<CsoundSynthesizer>...</CsoundSynthesizer>", &HashSet::new())
            .await;
        assert!(result.is_empty());
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn fetches_referenced_names_in_catalog_order() {
        let source = Arc::new(
            StaticSource::new()
                .with_file("a.wav", vec![1])
                .with_file("b.wav", vec![2])
                .with_file("c.wav", vec![3]),
        );
        let p = provisioner(&["a.wav", "b.wav", "c.wav"], source.clone());
        let doc = r#"gS1 = "c.wav"  gS2 = "a.wav""#;
        let result = p.diff_and_fetch(doc, &HashSet::new()).await;
        assert_eq!(result.names().collect::<Vec<_>>(), vec!["a.wav", "c.wav"]);
        assert_eq!(result.get("c.wav"), Some(&[3u8][..]));
        assert_eq!(source.requests(), vec!["a.wav", "c.wav"]);
    }

    #[tokio::test]
    async fn loaded_names_are_skipped() {
        let source = Arc::new(
            StaticSource::new()
                .with_file("a.wav", vec![1])
                .with_file("b.wav", vec![2]),
        );
        let p = provisioner(&["a.wav", "b.wav"], source.clone());
        let result = p.diff_and_fetch("a.wav b.wav", &loaded(&["a.wav"])).await;
        assert_eq!(result.names().collect::<Vec<_>>(), vec!["b.wav"]);
        assert_eq!(source.requests(), vec!["b.wav"]);
    }

    #[tokio::test]
    async fn failed_fetch_is_omitted() {
        let source = Arc::new(StaticSource::new().with_file("b.wav", vec![2]));
        let p = provisioner(&["a.wav", "b.wav"], source.clone());
        let result = p.diff_and_fetch("a.wav b.wav", &HashSet::new()).await;
        assert_eq!(result.names().collect::<Vec<_>>(), vec!["b.wav"]);
        assert_eq!(source.requests(), vec!["a.wav", "b.wav"]);
    }

    #[tokio::test]
    async fn renamed_resource_uses_alternate_name() {
        let source = Arc::new(StaticSource::new().with_file("circularstring-128", vec![9; 128]));
        let p = provisioner(&["circularstring"], source.clone());
        let result = p
            .diff_and_fetch(r#"giTab ftgen 0, 0, 128, -23, "circularstring""#, &HashSet::new())
            .await;
        assert_eq!(result.names().collect::<Vec<_>>(), vec!["circularstring-128"]);
        assert_eq!(source.requests(), vec!["circularstring-128"]);
        assert!(result.get("circularstring").is_none());
    }

    #[tokio::test]
    async fn second_pass_after_merge_is_empty() {
        let source = Arc::new(
            StaticSource::new()
                .with_file("fox.wav", vec![1])
                .with_file("circularstring-128", vec![2]),
        );
        let p = provisioner(&["fox.wav", "circularstring", "piano.wav"], source.clone());
        let doc = "fox.wav and circularstring";
        let mut set = HashSet::new();
        let first = p.diff_and_fetch(doc, &set).await;
        assert_eq!(first.len(), 2);
        set.extend(first.names().map(str::to_string));
        let second = p.diff_and_fetch(doc, &set).await;
        assert!(second.is_empty());
        assert_eq!(source.requests().len(), 2);
    }

    #[tokio::test]
    async fn empty_inputs() {
        let source = Arc::new(StaticSource::new());
        let p = provisioner(&["a.wav"], source.clone());
        assert!(p.diff_and_fetch("", &HashSet::new()).await.is_empty());
        let p = provisioner(&[], source);
        assert!(p.diff_and_fetch("a.wav", &HashSet::new()).await.is_empty());
    }

    #[test]
    fn http_url_layout() {
        let source = HttpResourceSource::new(
            "http://localhost:8000/",
            "/resources/SourceMaterials",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            source.url_for("fox.wav"),
            "http://localhost:8000/resources/SourceMaterials/fox.wav"
        );
    }
}
