//! Async client for the archive's scene search interface.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{CatalogError, Result};
use crate::models::{PageLink, ScenePage, SceneRef, SceneSearchParams};

/// Search endpoints: one well-known archive plus custom deployments.
#[derive(Debug, Clone)]
pub enum ArchiveEndpoint {
    /// AWS Earth Search (Element 84), which hosts the Sentinel-2
    /// collections the service consumes.
    EarthSearch,
    /// Any compatible archive (root URL, `/search` appended if absent).
    Custom(String),
}

impl ArchiveEndpoint {
    /// Return the full POST `/search` URL for this endpoint.
    pub fn search_url(&self) -> String {
        match self {
            Self::EarthSearch => "https://earth-search.aws.element84.com/v1/search".to_string(),
            Self::Custom(base) => {
                let base = base.trim_end_matches('/');
                if base.ends_with("/search") {
                    base.to_string()
                } else {
                    format!("{}/search", base)
                }
            }
        }
    }
}

/// Configuration for [`ArchiveClient`].
#[derive(Debug, Clone)]
pub struct ArchiveClientOptions {
    /// Per-request timeout (default 30 s).
    pub request_timeout: Duration,
    /// Maximum retries on transient failures (default 3).
    pub max_retries: u32,
    /// Maximum scenes to collect across pages (default 200).
    pub max_scenes: usize,
}

impl Default for ArchiveClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            max_scenes: 200,
        }
    }
}

/// Async scene-search client.
///
/// Transient failures are retried with exponential backoff up to
/// `max_retries`; 4xx responses are never retried. Beyond that, retry
/// policy belongs to the caller; the pipeline deliberately performs no
/// implicit retries of its own.
pub struct ArchiveClient {
    endpoint: ArchiveEndpoint,
    client: reqwest::Client,
    options: ArchiveClientOptions,
}

impl ArchiveClient {
    /// Create a new client.
    pub fn new(endpoint: ArchiveEndpoint, options: ArchiveClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| CatalogError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint,
            client,
            options,
        })
    }

    /// The endpoint this client is configured for.
    pub fn endpoint(&self) -> &ArchiveEndpoint {
        &self.endpoint
    }

    /// Execute one search request and return a single page.
    pub async fn search(&self, params: &SceneSearchParams) -> Result<ScenePage> {
        let url = self.endpoint.search_url();
        self.post_search(&url, params).await
    }

    /// Search with automatic pagination, collecting up to `max_scenes`.
    pub async fn search_all(&self, params: &SceneSearchParams) -> Result<Vec<SceneRef>> {
        let mut scenes: Vec<SceneRef> = Vec::new();
        let max = self.options.max_scenes;

        let mut page = self.search(params).await?;
        loop {
            let next = page.next_link().cloned();
            scenes.extend(page.features.drain(..));

            if scenes.len() >= max {
                break;
            }
            match next {
                Some(link) => {
                    page = self.follow_next(&link, params).await?;
                    if page.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }

        scenes.truncate(max);
        debug!(count = scenes.len(), "scene search complete");
        Ok(scenes)
    }

    /// Fetch a band asset's raw bytes.
    pub async fn fetch_asset(&self, href: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(href).send().await?;
        if !resp.status().is_success() {
            return Err(CatalogError::AssetUnavailable {
                id: href.to_string(),
                reason: format!("HTTP {}", resp.status()),
            });
        }
        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    }

    // ── Private helpers ─────────────────────────────────────────────

    async fn post_search(&self, url: &str, params: &SceneSearchParams) -> Result<ScenePage> {
        let mut last_err: Option<String> = None;
        let mut attempts = 0;

        for attempt in 0..=self.options.max_retries {
            attempts = attempt + 1;
            if attempt > 0 {
                // exponential backoff: 500ms, 1s, 2s, ...
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                tokio::time::sleep(delay).await;
                warn!(attempt, url, "retrying scene search");
            }

            let resp = self
                .client
                .post(url)
                .header("Content-Type", "application/json")
                .json(params)
                .send()
                .await;

            match resp {
                Ok(r) if r.status().is_success() => {
                    let body = r
                        .text()
                        .await
                        .map_err(|e| CatalogError::Network(format!("reading response body: {e}")))?;
                    let page: ScenePage = serde_json::from_str(&body).map_err(|e| {
                        CatalogError::Network(format!("parsing search response: {e}"))
                    })?;
                    return Ok(page);
                }
                Ok(r) => {
                    let status = r.status();
                    let body = r.text().await.unwrap_or_default();
                    last_err = Some(format!(
                        "HTTP {}: {}",
                        status,
                        body.chars().take(300).collect::<String>()
                    ));
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) => {
                    last_err = Some(format!("request failed: {e}"));
                }
            }
        }

        Err(CatalogError::SearchFailed {
            attempts,
            reason: last_err.unwrap_or_else(|| "scene search failed".to_string()),
        })
    }

    /// Follow a POST pagination link (token-merge style).
    async fn follow_next(&self, link: &PageLink, original: &SceneSearchParams) -> Result<ScenePage> {
        let mut params = original.clone();
        if let Some(body) = &link.body {
            if let Some(token) = body.get("token").and_then(|t| t.as_str()) {
                params.token = Some(token.to_string());
            }
        }
        self.post_search(&link.href, &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_search_urls() {
        assert_eq!(
            ArchiveEndpoint::EarthSearch.search_url(),
            "https://earth-search.aws.element84.com/v1/search"
        );
        assert_eq!(
            ArchiveEndpoint::Custom("https://archive.example.com".into()).search_url(),
            "https://archive.example.com/search"
        );
        assert_eq!(
            ArchiveEndpoint::Custom("https://archive.example.com/search".into()).search_url(),
            "https://archive.example.com/search"
        );
        assert_eq!(
            ArchiveEndpoint::Custom("https://archive.example.com/".into()).search_url(),
            "https://archive.example.com/search"
        );
    }

    #[test]
    fn default_options() {
        let opts = ArchiveClientOptions::default();
        assert_eq!(opts.max_retries, 3);
        assert_eq!(opts.max_scenes, 200);
    }
}
