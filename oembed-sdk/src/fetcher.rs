// ABOUTME: Cached HTTP GET of target pages with a fixed request profile
// ABOUTME: Classifies transport and HTTP failures and resolves the page MIME type

use crate::cache::Cache;
use crate::constants::http::{ACCEPT_LANGUAGE, PAGE_ACCEPT};
use crate::error::EmbedError;
use crate::target::url_digest;
use crate::types::EmbedFormat;
use reqwest::blocking::Client;
use reqwest::header::{self, HeaderValue};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A fetched (or cached) response for a target page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub from_cache: bool,
}

impl FetchedPage {
    /// The MIME type used to pick an embedding strategy.
    pub fn mime_type(&self) -> String {
        resolve_mime_type(self.content_type.as_deref(), self.status, &self.url)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// What actually goes into the cache for one `(url, format)` key.
#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    status: u16,
    content_type: Option<String>,
    #[serde(with = "base64_body")]
    body: Vec<u8>,
}

pub struct Fetcher {
    client: Client,
    cache: Arc<dyn Cache>,
    ttl: Duration,
    max_body_bytes: u64,
}

impl Fetcher {
    pub fn new(
        cache: Arc<dyn Cache>,
        user_agent: &str,
        timeout: Duration,
        ttl: Duration,
        max_body_bytes: u64,
    ) -> Result<Self, EmbedError> {
        // No cookie store; with only the `gzip` feature enabled reqwest
        // advertises `Accept-Encoding: gzip` and nothing else.
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| EmbedError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            cache,
            ttl,
            max_body_bytes,
        })
    }

    pub fn cache_key(url: &Url, format: EmbedFormat) -> String {
        format!("{}_{}", url_digest(url.as_str()), format)
    }

    /// Fetches `url`, serving from cache when a fresh entry exists.
    ///
    /// Every completed response is cached, error statuses included, so a
    /// failing origin is not hammered within the TTL.
    pub fn fetch(&self, url: &Url, format: EmbedFormat) -> Result<FetchedPage, EmbedError> {
        let key = Self::cache_key(url, format);

        let (cached, from_cache) = match self.cached(&key) {
            Some(cached) => {
                log::debug!("Cache hit: {}", url);
                (cached, true)
            }
            None => {
                log::debug!("Cache miss: {}", url);
                let response = self.request(url)?;
                self.store(&key, &response);
                (response, false)
            }
        };

        if (400..600).contains(&cached.status) {
            log::error!("HTTP error discovering HTML: {} returned {}", url, cached.status);
            return Err(EmbedError::Http {
                status: cached.status,
                url: url.to_string(),
            });
        }

        Ok(FetchedPage {
            url: url.clone(),
            status: cached.status,
            content_type: cached.content_type,
            body: cached.body,
            from_cache,
        })
    }

    fn cached(&self, key: &str) -> Option<CachedResponse> {
        let bytes = self.cache.get(key)?;
        match serde_json::from_slice(&bytes) {
            Ok(cached) => Some(cached),
            Err(e) => {
                log::debug!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn store(&self, key: &str, response: &CachedResponse) {
        let result = serde_json::to_vec(response)
            .map_err(|e| EmbedError::Cache(e.to_string()))
            .and_then(|bytes| self.cache.set(key, &bytes, self.ttl));

        if let Err(e) = result {
            log::warn!("Failed to cache response for {}: {}", key, e);
        }
    }

    fn request(&self, url: &Url) -> Result<CachedResponse, EmbedError> {
        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, PAGE_ACCEPT)
            .header(header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
            .header(header::DNT, HeaderValue::from_static("1"))
            .header(header::CONNECTION, HeaderValue::from_static("close"))
            .send()
            .map_err(|e| {
                log::error!("Network error discovering HTML for {}: {}", url, e);
                EmbedError::Network(e.to_string())
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = read_capped(response, self.max_body_bytes, url).map_err(|e| {
            log::error!("Failed to read response body from {}: {}", url, e);
            EmbedError::Network(e.to_string())
        })?;

        Ok(CachedResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Reads at most `cap` bytes of `reader`, warning when more were available.
pub(crate) fn read_capped(reader: impl Read, cap: u64, url: &Url) -> std::io::Result<Vec<u8>> {
    let mut body = Vec::new();
    reader.take(cap.saturating_add(1)).read_to_end(&mut body)?;

    if body.len() as u64 > cap {
        log::warn!("Response from {} truncated at {} bytes", url, cap);
        body.truncate(cap as usize);
    }
    Ok(body)
}

/// Picks the MIME type to classify a response by.
///
/// The declared type is trusted unless it is missing, or it claims HTML on
/// a non-200/201 response (redirect bodies and the like). Then the type is
/// guessed from the URL path, falling back to `text/html`.
pub fn resolve_mime_type(content_type: Option<&str>, status: u16, url: &Url) -> String {
    match content_type {
        Some(declared) if !(declared.starts_with("text/html") && status > 201) => {
            declared.to_string()
        }
        _ => mime_guess::from_path(url.path())
            .first_raw()
            .unwrap_or("text/html")
            .to_string(),
    }
}

mod base64_body {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
