// ABOUTME: Normalization and validation of caller-supplied target URLs
// ABOUTME: Expands protocol-relative URLs and rejects non-HTTP schemes

use crate::error::EmbedError;
use url::Url;

/// Parses a URL handed to `discover` or `capture_thumbnail`.
///
/// Protocol-relative URLs (`//host/path`) are treated as plain `http:`.
pub fn normalize_target(raw: &str) -> Result<Url, EmbedError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.starts_with("//") {
        format!("http:{}", trimmed)
    } else {
        trimmed.to_string()
    };

    let url = Url::parse(&candidate).map_err(|e| EmbedError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(EmbedError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", scheme),
            });
        }
    }

    if url.host_str().is_none() {
        return Err(EmbedError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

/// Lower-case hex sha256 of a URL, used for cache keys and blob paths.
pub fn url_digest(url: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}
