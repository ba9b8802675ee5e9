// ABOUTME: Centralized constants for the oEmbed SDK
// ABOUTME: Contains request profile, cache, thumbnail and retry defaults

/// Request profile used for every outbound request
pub mod http {
    use std::time::Duration;

    /// User-Agent sent to origin servers and discovery endpoints
    pub const USER_AGENT: &str = concat!("oembed-sdk/", env!("CARGO_PKG_VERSION"));

    /// Accept header for the primary page fetch
    pub const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

    pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

    /// Default timeout for HTTP requests
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Bodies larger than this are truncated while streaming
    pub const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;
}

/// Fetch cache settings
pub mod cache {
    use std::time::Duration;

    /// How long a fetched page stays valid
    pub const FETCH_TTL: Duration = Duration::from_secs(60 * 60);

    /// Default entry count for the in-memory cache
    pub const MEMORY_CAPACITY: usize = 512;
}

/// Screenshot service settings
pub mod thumbnail {
    use std::time::Duration;

    pub const SERVICE_BASE: &str = "https://image.thum.io";

    /// Logical viewport width when the caller does not ask for one
    pub const DEFAULT_WIDTH: u32 = 936;

    /// Widest viewport the service is asked to render
    pub const MAX_WIDTH: u32 = 10_000;

    /// Seconds the service waits for the page to settle before capturing
    pub const SETTLE_SECONDS: u32 = 5;

    /// Rendering waits server-side, so allow longer than a page fetch
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Fixed delay between attempts after a 5xx or transport failure
    pub const RETRY_DELAY: Duration = Duration::from_secs(5);

    /// Blob storage prefix for captured images
    pub const STORAGE_PREFIX: &str = "oembed";
}

/// Retry configuration constants
pub mod retry {
    use std::time::Duration;

    /// Backoff multiplier; 1.0 keeps the delay fixed
    pub const BACKOFF_MULTIPLIER: f64 = 1.0;

    /// Maximum delay between retries
    pub const MAX_DELAY: Duration = Duration::from_secs(60);
}
