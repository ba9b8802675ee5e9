// ABOUTME: oEmbed SDK library turning arbitrary URLs into embeddable HTML
// ABOUTME: Wires renderer registry, cached fetcher, link discovery and classification

pub mod builder;
pub mod cache;
pub mod classify;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod fetcher;
pub mod protocol;
pub mod registry;
pub mod retry;
pub mod storage;
pub mod target;
pub mod thumbnail;
pub mod types;

pub use builder::{EmbedClientConfig, ThumbnailClientConfig};
pub use cache::{Cache, FileCache, MemoryCache, NoCache};
pub use discovery::{LinkScanner, RegexLinkScanner};
pub use error::EmbedError;
pub use fetcher::{FetchedPage, Fetcher};
pub use protocol::ProtocolClient;
pub use registry::{CustomRenderer, RendererRegistry, YouTubeRenderer};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use storage::{BlobStorage, FileStorage, MemoryStorage};
pub use thumbnail::ThumbnailClient;
pub use types::{
    DiscoveryEndpoint, EmbedFormat, FailurePolicy, LinkCandidate, OEmbedPayload, PayloadFormat,
    RenderResult, StoredImage,
};

pub type Result<T> = std::result::Result<T, EmbedError>;

use url::Url;

pub struct EmbedClient {
    fetcher: Fetcher,
    protocol: ProtocolClient,
    registry: RendererRegistry,
    scanner: Box<dyn LinkScanner>,
    failure_policy: FailurePolicy,
}

impl EmbedClient {
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn from_config(config: EmbedClientConfig) -> Result<Self> {
        let fetcher = Fetcher::new(
            config.cache,
            &config.user_agent,
            config.timeout,
            config.cache_ttl,
            config.max_body_bytes,
        )?;
        let protocol = ProtocolClient::new(&config.user_agent, config.timeout, config.max_body_bytes)?;

        Ok(Self {
            fetcher,
            protocol,
            registry: config.registry,
            scanner: config.scanner,
            failure_policy: config.failure_policy,
        })
    }

    /// Turns `url` into a [`RenderResult`].
    ///
    /// Fetch and discovery failures never surface as errors; they degrade
    /// according to the configured [`FailurePolicy`] or to an iframe. The
    /// only errors are an unusable URL and an unsupported content type.
    pub fn discover(&self, url: &str, format: EmbedFormat) -> Result<RenderResult> {
        let url = target::normalize_target(url)?;

        if let Some(rendered) = self.registry.try_custom_render(&url) {
            return Ok(rendered);
        }

        let page = match self.fetcher.fetch(&url, format) {
            Ok(page) => page,
            // Already logged by the fetcher
            Err(_) => return Ok(self.fallback(&url)),
        };

        let mime_type = page.mime_type();
        let payload = if classify::wants_discovery(&mime_type, format) {
            self.discover_payload(&page)
        } else {
            None
        };

        classify::classify_and_render(&mime_type, format, payload.as_ref(), &url)
    }

    /// Fetches the page and lists every `<link>` the scanner finds.
    pub fn scan_links(&self, url: &str) -> Result<(Url, Vec<LinkCandidate>)> {
        let url = target::normalize_target(url)?;
        let page = self.fetcher.fetch(&url, EmbedFormat::Full)?;
        let links = self.scanner.scan(&page.text());
        Ok((url, links))
    }

    /// Tries each advertised endpoint in document order until one answers.
    fn discover_payload(&self, page: &FetchedPage) -> Option<OEmbedPayload> {
        let html = page.text();
        for endpoint in discovery::find_oembed_links(self.scanner.as_ref(), &html, &page.url) {
            log::debug!("Querying oEmbed endpoint {}", endpoint.url);
            match self.protocol.query_endpoint(&endpoint) {
                Ok(payload) => return Some(payload),
                Err(e) => log::warn!("oEmbed endpoint {} failed: {}", endpoint.url, e),
            }
        }
        None
    }

    fn fallback(&self, url: &Url) -> RenderResult {
        match self.failure_policy {
            FailurePolicy::NoEmbed => RenderResult::DiscoveryFailed,
            FailurePolicy::Iframe => RenderResult::IframeTag(url.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_client_creation() {
        let client = EmbedClient::new();
        assert!(client.is_ok());
    }

    #[test]
    fn test_discover_rejects_invalid_url() {
        let client = EmbedClient::new().unwrap();
        let err = client.discover("mailto:someone@example.com", EmbedFormat::Full);
        assert!(matches!(err, Err(EmbedError::InvalidUrl { .. })));
    }

    #[test]
    fn test_registry_short_circuits_network() {
        let client = EmbedClient::builder()
            .registry(RendererRegistry::with_defaults())
            .build()
            .unwrap();

        let result = client
            .discover("https://youtu.be/dQw4w9WgXcQ", EmbedFormat::Full)
            .unwrap();
        assert!(matches!(result, RenderResult::OEmbedHtml(_)));
    }

    #[test]
    fn test_network_failure_follows_policy() {
        let client = EmbedClient::new().unwrap();
        assert_eq!(
            client
                .discover("http://127.0.0.1:1/page", EmbedFormat::Full)
                .unwrap(),
            RenderResult::DiscoveryFailed
        );

        let client = EmbedClient::builder()
            .failure_policy(FailurePolicy::Iframe)
            .build()
            .unwrap();
        assert!(matches!(
            client
                .discover("http://127.0.0.1:1/page", EmbedFormat::Full)
                .unwrap(),
            RenderResult::IframeTag(_)
        ));
    }
}
