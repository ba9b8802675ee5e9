// ABOUTME: Screenshot capture through an external rendering service
// ABOUTME: Retries server-side failures and persists PNGs into blob storage

use crate::builder::ThumbnailClientConfig;
use crate::constants::thumbnail::{MAX_WIDTH, SETTLE_SECONDS, STORAGE_PREFIX};
use crate::error::EmbedError;
use crate::retry::{retry_with_policy, RetryPolicy, Sleeper};
use crate::storage::BlobStorage;
use crate::target::{normalize_target, url_digest};
use crate::types::StoredImage;
use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};
use std::io::{Read, Seek};
use std::sync::Arc;
use url::Url;

pub struct ThumbnailClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    storage: Arc<dyn BlobStorage>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    default_width: u32,
}

impl ThumbnailClient {
    pub fn from_config(config: ThumbnailClientConfig) -> Result<Self, EmbedError> {
        Url::parse(&config.base_url).map_err(|e| {
            EmbedError::Configuration(format!("Invalid screenshot service URL: {}", e))
        })?;
        check_width(config.default_width)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbedError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            storage: config.storage,
            retry: config.retry,
            sleeper: config.sleeper,
            default_width: config.default_width,
        })
    }

    /// Blob key a capture of `url` is stored under.
    pub fn blob_key(url: &Url) -> String {
        format!("{}/{}.png", STORAGE_PREFIX, url_digest(url.as_str()))
    }

    /// Service URL for a capture. Contains the API key; never log it.
    fn screenshot_url(
        &self,
        url: &Url,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<String, EmbedError> {
        let width = check_width(width.filter(|w| *w > 0).unwrap_or(self.default_width))?;

        let mut request = format!(
            "{}/get/auth/{}/width/{}/viewportWidth/{}/",
            self.base_url,
            self.api_key.expose_secret(),
            width * 2,
            width
        );
        if let Some(height) = height.filter(|h| *h > 0) {
            request.push_str(&format!("crop/{}/", height));
        }
        request.push_str(&format!("noanimate/png/wait/{}/", SETTLE_SECONDS));
        request.push_str(url.as_str());
        Ok(request)
    }

    /// Captures `url` and stores the PNG, blocking until the service answers.
    ///
    /// Transport errors and 5xx responses are retried according to the
    /// configured [`RetryPolicy`]; the default policy retries forever. A 4xx
    /// response fails immediately with [`EmbedError::ThumbnailRejected`].
    pub fn capture_thumbnail(
        &self,
        url: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<StoredImage, EmbedError> {
        let target = normalize_target(url)?;
        let request_url = self.screenshot_url(&target, width, height)?;

        let mut response = retry_with_policy(&self.retry, self.sleeper.as_ref(), |attempt| {
            let response = self.client.get(&request_url).send().map_err(|e| {
                let e = e.without_url();
                log::warn!("Error taking screenshot of {} (attempt {}): {}", target, attempt, e);
                EmbedError::Network(e.to_string())
            })?;

            match response.status().as_u16() {
                status @ 500.. => Err(EmbedError::Http {
                    status,
                    url: target.to_string(),
                }),
                status @ 400..=499 => Err(EmbedError::ThumbnailRejected { status }),
                _ => Ok(response),
            }
        })?;

        // Drain the connection before touching storage so a failed read stores nothing
        let mut spool = tempfile::tempfile()?;
        response
            .copy_to(&mut spool)
            .map_err(|e| EmbedError::Network(e.without_url().to_string()))?;
        spool.rewind()?;
        let mut bytes = Vec::new();
        spool.read_to_end(&mut bytes)?;

        let blob_key = self.storage.save(&Self::blob_key(&target), &bytes)?;
        log::debug!("Stored screenshot of {} as {}", target, blob_key);

        Ok(StoredImage { blob_key })
    }

    /// Like [`Self::capture_thumbnail`], but reuses an existing capture.
    pub fn capture_thumbnail_if_missing(
        &self,
        url: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<StoredImage, EmbedError> {
        let target = normalize_target(url)?;
        let blob_key = Self::blob_key(&target);

        if self.storage.exists(&blob_key)? {
            log::debug!("Reusing stored screenshot {}", blob_key);
            return Ok(StoredImage { blob_key });
        }

        self.capture_thumbnail(target.as_str(), width, height)
    }
}

/// The service renders at twice the viewport width, so both must fit.
fn check_width(width: u32) -> Result<u32, EmbedError> {
    if width > MAX_WIDTH {
        return Err(EmbedError::Configuration(format!(
            "Thumbnail width {} exceeds the maximum of {}",
            width, MAX_WIDTH
        )));
    }
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::tests::RecordingSleeper;
    use crate::storage::MemoryStorage;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];
    const TARGET: &str = "https://example.com/article";

    struct Harness {
        client: ThumbnailClient,
        storage: Arc<MemoryStorage>,
        sleeper: Arc<RecordingSleeper>,
    }

    fn harness(base_url: String, retry: RetryPolicy) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = ThumbnailClient::builder()
            .api_key(SecretString::new("test-key".to_string().into_boxed_str()))
            .storage(storage.clone())
            .base_url(base_url)
            .retry(retry)
            .sleeper(sleeper.clone())
            .build()
            .unwrap();

        Harness {
            client,
            storage,
            sleeper,
        }
    }

    fn capture_path() -> Matcher {
        Matcher::Regex(
            r"^/get/auth/test-key/width/1872/viewportWidth/936/noanimate/png/wait/5/https://example\.com/article$"
                .to_string(),
        )
    }

    #[test]
    fn test_screenshot_url_layout() {
        let h = harness("https://shots.example.net/".to_string(), RetryPolicy::default());
        let target = Url::parse(TARGET).unwrap();

        assert_eq!(
            h.client.screenshot_url(&target, None, None).unwrap(),
            "https://shots.example.net/get/auth/test-key/width/1872/viewportWidth/936/noanimate/png/wait/5/https://example.com/article"
        );
        assert_eq!(
            h.client.screenshot_url(&target, Some(600), Some(400)).unwrap(),
            "https://shots.example.net/get/auth/test-key/width/1200/viewportWidth/600/crop/400/noanimate/png/wait/5/https://example.com/article"
        );
    }

    #[test]
    fn test_oversized_width_is_rejected_without_request() {
        let mut server = Server::new();
        let mock = server.mock("GET", Matcher::Any).expect(0).create();
        let h = harness(server.url(), RetryPolicy::default());

        let err = h
            .client
            .capture_thumbnail(TARGET, Some(u32::MAX), None)
            .unwrap_err();

        mock.assert();
        assert!(matches!(err, EmbedError::Configuration(_)));
        assert!(h
            .client
            .screenshot_url(&Url::parse(TARGET).unwrap(), Some(MAX_WIDTH), None)
            .unwrap()
            .contains("/width/20000/viewportWidth/10000/"));
    }

    #[test]
    fn test_oversized_default_width_fails_to_build() {
        let result = ThumbnailClient::builder()
            .api_key(SecretString::new("test-key".to_string().into_boxed_str()))
            .storage(Arc::new(MemoryStorage::new()))
            .default_width(MAX_WIDTH + 1)
            .build();
        assert!(matches!(result, Err(EmbedError::Configuration(_))));
    }

    #[test]
    fn test_retries_server_errors_then_stores() {
        let mut server = Server::new();
        let failing = server
            .mock("GET", capture_path())
            .with_status(503)
            .expect(2)
            .create();
        let ok = server
            .mock("GET", capture_path())
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(PNG)
            .expect(1)
            .create();

        let h = harness(server.url(), RetryPolicy::default());
        let stored = h.client.capture_thumbnail(TARGET, None, None).unwrap();

        failing.assert();
        ok.assert();
        assert_eq!(
            *h.sleeper.sleeps.lock(),
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );
        assert!(stored.blob_key.starts_with("oembed/"));
        assert!(stored.blob_key.ends_with(".png"));
        assert_eq!(h.storage.get(&stored.blob_key).unwrap(), PNG);
    }

    #[test]
    fn test_client_error_is_fatal_without_retry() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", capture_path())
            .with_status(404)
            .expect(1)
            .create();

        let h = harness(server.url(), RetryPolicy::default());
        let err = h.client.capture_thumbnail(TARGET, None, None).unwrap_err();

        mock.assert();
        assert!(matches!(err, EmbedError::ThumbnailRejected { status: 404 }));
        assert!(h.sleeper.sleeps.lock().is_empty());
        assert!(h.storage.is_empty());
    }

    #[test]
    fn test_bounded_policy_gives_up_on_transport_errors() {
        let policy = RetryPolicy {
            max_attempts: Some(2),
            ..Default::default()
        };
        let h = harness("http://127.0.0.1:1".to_string(), policy);

        let err = h.client.capture_thumbnail(TARGET, None, None).unwrap_err();
        assert!(matches!(err, EmbedError::RetriesExhausted { attempts: 2 }));
        assert_eq!(h.sleeper.sleeps.lock().len(), 1);
    }

    #[test]
    fn test_existing_capture_is_reused() {
        let mut server = Server::new();
        let mock = server.mock("GET", Matcher::Any).expect(0).create();

        let h = harness(server.url(), RetryPolicy::default());
        let key = ThumbnailClient::blob_key(&Url::parse(TARGET).unwrap());
        h.storage.save(&key, PNG).unwrap();

        let stored = h
            .client
            .capture_thumbnail_if_missing(TARGET, None, None)
            .unwrap();

        mock.assert();
        assert_eq!(stored.blob_key, key);
    }

    #[test]
    fn test_invalid_target_is_rejected_before_any_request() {
        let h = harness("http://127.0.0.1:1".to_string(), RetryPolicy::default());
        let err = h
            .client
            .capture_thumbnail("ftp://example.com/x", None, None)
            .unwrap_err();
        assert!(matches!(err, EmbedError::InvalidUrl { .. }));
    }
}
