//! Asset URL resolution and fetching.

use async_trait::async_trait;
use boardsound_common::{SoundError, SoundResult};
use tracing::debug;

/// Downloads encoded audio.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetches the bytes at `url`. Non-success responses are errors.
    async fn fetch(&self, url: &str) -> SoundResult<Vec<u8>>;
}

/// Turns an asset path into a fully qualified, versioned URL.
pub trait AssetResolver: Send + Sync {
    /// Resolves `path` (no leading slash, no extension).
    fn resolve(&self, path: &str) -> String;
}

/// Fetches assets over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher sharing an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> SoundResult<Vec<u8>> {
        let network_error = |e: reqwest::Error| SoundError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(network_error)?;

        if !response.status().is_success() {
            return Err(SoundError::Fetch {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(network_error)?;
        debug!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Resolves paths against a fixed base URL with an optional version segment.
///
/// With a version, `standard/Move` under `https://cdn.test/sound` becomes
/// `https://cdn.test/sound/_v3/standard/Move`.
#[derive(Debug, Clone)]
pub struct StaticAssetResolver {
    base_url: String,
    version: Option<String>,
}

impl StaticAssetResolver {
    /// Creates an unversioned resolver.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            version: None,
        }
    }

    /// Adds a version segment.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.version = (!version.is_empty()).then_some(version);
        self
    }

    /// The base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl AssetResolver for StaticAssetResolver {
    fn resolve(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        match &self.version {
            Some(version) => format!("{}/_{}/{}", self.base_url, version, path),
            None => format!("{}/{}", self.base_url, path),
        }
    }
}
