// ABOUTME: Builder pattern configuration for EmbedClient and ThumbnailClient
// ABOUTME: Provides typed defaults for collaborators, timeouts and retry policy

use crate::cache::{Cache, MemoryCache};
use crate::constants::{cache, http, thumbnail};
use crate::discovery::{LinkScanner, RegexLinkScanner};
use crate::error::EmbedError;
use crate::registry::RendererRegistry;
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::storage::BlobStorage;
use crate::thumbnail::ThumbnailClient;
use crate::types::FailurePolicy;
use crate::EmbedClient;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use typed_builder::TypedBuilder;

#[derive(TypedBuilder)]
#[builder(build_method(into = Result<EmbedClient, EmbedError>))]
pub struct EmbedClientConfig {
    #[builder(default = Arc::new(MemoryCache::default()))]
    pub cache: Arc<dyn Cache>,

    #[builder(default)]
    pub registry: RendererRegistry,

    #[builder(default = Box::new(RegexLinkScanner))]
    pub scanner: Box<dyn LinkScanner>,

    #[builder(default = http::USER_AGENT.to_string(), setter(into))]
    pub user_agent: String,

    #[builder(default = http::REQUEST_TIMEOUT)]
    pub timeout: Duration,

    #[builder(default = cache::FETCH_TTL)]
    pub cache_ttl: Duration,

    #[builder(default)]
    pub failure_policy: FailurePolicy,

    #[builder(default = http::MAX_BODY_BYTES)]
    pub max_body_bytes: u64,
}

impl From<EmbedClientConfig> for Result<EmbedClient, EmbedError> {
    fn from(config: EmbedClientConfig) -> Self {
        EmbedClient::from_config(config)
    }
}

impl EmbedClient {
    pub fn builder() -> EmbedClientConfigBuilder<((), (), (), (), (), (), (), ())> {
        EmbedClientConfig::builder()
    }
}

#[derive(TypedBuilder)]
#[builder(build_method(into = Result<ThumbnailClient, EmbedError>))]
pub struct ThumbnailClientConfig {
    pub api_key: SecretString,

    pub storage: Arc<dyn BlobStorage>,

    #[builder(default = thumbnail::SERVICE_BASE.to_string(), setter(into))]
    pub base_url: String,

    #[builder(default)]
    pub retry: RetryPolicy,

    #[builder(default = Arc::new(ThreadSleeper))]
    pub sleeper: Arc<dyn Sleeper>,

    #[builder(default = thumbnail::DEFAULT_WIDTH)]
    pub default_width: u32,

    #[builder(default = thumbnail::REQUEST_TIMEOUT)]
    pub timeout: Duration,
}

impl From<ThumbnailClientConfig> for Result<ThumbnailClient, EmbedError> {
    fn from(config: ThumbnailClientConfig) -> Self {
        ThumbnailClient::from_config(config)
    }
}

impl ThumbnailClient {
    pub fn builder() -> ThumbnailClientConfigBuilder<((), (), (), (), (), (), ())> {
        ThumbnailClientConfig::builder()
    }
}
