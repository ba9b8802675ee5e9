// ABOUTME: Custom error types for the oEmbed SDK with user-friendly messages
// ABOUTME: Classifies network, HTTP, content and storage failures for callers

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Unsupported content type '{mime_type}' for {url}")]
    UnsupportedMimeType { mime_type: String, url: String },

    #[error("Screenshot service rejected the request with status {status}")]
    ThumbnailRejected { status: u16 },

    #[error("Gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmbedError {
    pub fn help_text(&self) -> Option<&'static str> {
        match self {
            EmbedError::InvalidUrl { .. } => Some("Only http:// and https:// URLs can be embedded"),
            EmbedError::Network(_) => Some("Check your internet connection and try again"),
            EmbedError::UnsupportedMimeType { .. } => {
                Some("Only HTML pages, audio and video can be embedded; link to it instead")
            }
            EmbedError::ThumbnailRejected { status: 401 | 403 } => {
                Some("Check the screenshot API key (OEMBED_SCREENSHOT_API_KEY)")
            }
            EmbedError::RetriesExhausted { .. } => {
                Some("The screenshot service kept failing; raise thumbnail.max_attempts or retry later")
            }
            _ => None,
        }
    }

    /// Transient failures worth another attempt: transport errors and 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbedError::Network(_) => true,
            EmbedError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
