// ABOUTME: Configuration file loading, validation, and hierarchical merging for the oembed CLI
// ABOUTME: Turns TOML settings plus environment overrides into configured SDK clients

use anyhow::{Context, Result, anyhow};
use oembed_sdk::constants::{cache, http, thumbnail};
use oembed_sdk::{
    Cache, EmbedClient, FailurePolicy, FileCache, FileStorage, NoCache, RetryPolicy,
    ThumbnailClient,
};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable that overrides `[thumbnail].api_key`
pub const API_KEY_ENV: &str = "OEMBED_SCREENSHOT_API_KEY";

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default, deserialize_with = "validate_duration")]
    pub cache_ttl: Option<String>,
    #[serde(default, deserialize_with = "validate_duration")]
    pub request_timeout: Option<String>,
    #[serde(default, deserialize_with = "validate_failure_policy")]
    pub failure_policy: Option<FailurePolicy>,
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    #[serde(default)]
    pub thumbnail: Option<ThumbnailSection>,
}

#[derive(Clone, PartialEq, Deserialize, Default)]
pub struct ThumbnailSection {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default, deserialize_with = "validate_duration")]
    pub retry_delay: Option<String>,
}

impl fmt::Debug for ThumbnailSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailSection")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("width", &self.width)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

impl Config {
    /// Load configuration from standard XDG-compliant locations
    pub fn load() -> Result<Self> {
        let paths = Self::get_config_paths();
        Self::load_from_paths(&paths.iter().map(|p| p.as_str()).collect::<Vec<_>>())
    }

    /// Load from `--config` when given, otherwise from the standard locations
    pub fn load_with_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    /// Load configuration from specific file paths in order of precedence (highest first)
    pub fn load_from_paths(paths: &[&str]) -> Result<Self> {
        let mut config = Config::default();

        // Lowest precedence first so higher ones win the merge
        for path in paths.iter().rev() {
            if !Path::new(path).exists() {
                continue;
            }
            config = config.merge(Self::load_from_file(path)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a single file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse TOML config file: {}",
                path.as_ref().display()
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get standard config file paths in order of precedence (highest first)
    pub fn get_config_paths() -> Vec<String> {
        let mut paths = Vec::new();

        // 1. Project-specific config (highest precedence)
        if let Ok(current_dir) = std::env::current_dir() {
            paths.push(current_dir.join("oembed.toml").to_string_lossy().to_string());
        }

        // 2. XDG config home
        if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
            let path = PathBuf::from(config_home)
                .join("oembed")
                .join("config.toml");
            paths.push(path.to_string_lossy().to_string());
        }

        // 3. User config directory fallback
        if let Some(home_dir) = dirs::home_dir() {
            let path = home_dir.join(".config").join("oembed").join("config.toml");
            paths.push(path.to_string_lossy().to_string());
        }

        paths
    }

    /// Merge this config with another, giving precedence to the other config
    pub fn merge(self, other: Config) -> Config {
        Config {
            user_agent: other.user_agent.or(self.user_agent),
            cache_dir: other.cache_dir.or(self.cache_dir),
            cache_ttl: other.cache_ttl.or(self.cache_ttl),
            request_timeout: other.request_timeout.or(self.request_timeout),
            failure_policy: other.failure_policy.or(self.failure_policy),
            storage_dir: other.storage_dir.or(self.storage_dir),
            thumbnail: match (self.thumbnail, other.thumbnail) {
                (Some(base), Some(other)) => Some(base.merge(other)),
                (Some(base), None) => Some(base),
                (None, Some(other)) => Some(other),
                (None, None) => None,
            },
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(ref user_agent) = self.user_agent {
            if user_agent.trim().is_empty() {
                return Err(anyhow!("user_agent must not be empty"));
            }
        }

        if let Some(ref thumbnail) = self.thumbnail {
            thumbnail
                .validate()
                .context("Invalid thumbnail configuration")?;
        }

        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(cache::FETCH_TTL)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(http::REQUEST_TIMEOUT)
    }

    /// The screenshot API key, preferring the environment over the file
    pub fn screenshot_api_key(&self) -> Option<SecretString> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                self.thumbnail
                    .as_ref()
                    .and_then(|thumbnail| thumbnail.api_key.clone())
            })
            .map(|key| SecretString::new(key.into_boxed_str()))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let section = self.thumbnail.clone().unwrap_or_default();
        RetryPolicy {
            delay: section
                .retry_delay
                .as_deref()
                .and_then(parse_duration)
                .unwrap_or(thumbnail::RETRY_DELAY),
            max_attempts: section.max_attempts,
            ..Default::default()
        }
    }

    pub fn file_cache(&self) -> Result<FileCache> {
        let cache = match self.cache_dir {
            Some(ref dir) => FileCache::new(dir),
            None => FileCache::in_default_location(),
        };
        cache.context("Failed to open fetch cache")
    }

    /// Build a discovery client from this configuration
    pub fn embed_client(&self, no_cache: bool) -> Result<EmbedClient> {
        let cache: Arc<dyn Cache> = if no_cache {
            Arc::new(NoCache)
        } else {
            Arc::new(self.file_cache()?)
        };

        let client = EmbedClient::builder()
            .cache(cache)
            .registry(oembed_sdk::RendererRegistry::with_defaults())
            .user_agent(
                self.user_agent
                    .clone()
                    .unwrap_or_else(|| http::USER_AGENT.to_string()),
            )
            .timeout(self.request_timeout())
            .cache_ttl(self.cache_ttl())
            .failure_policy(self.failure_policy.unwrap_or_default())
            .build()?;

        Ok(client)
    }

    /// Build a screenshot client; fails when no API key is configured
    pub fn thumbnail_client(&self) -> Result<ThumbnailClient> {
        let api_key = self.screenshot_api_key().ok_or_else(|| {
            anyhow!(
                "No screenshot API key configured. Set {} or [thumbnail].api_key in the config file",
                API_KEY_ENV
            )
        })?;

        let storage = match self.storage_dir {
            Some(ref dir) => FileStorage::new(dir),
            None => FileStorage::in_default_location(),
        }
        .context("Failed to open thumbnail storage")?;

        let width = self
            .thumbnail
            .as_ref()
            .and_then(|thumbnail| thumbnail.width)
            .unwrap_or(thumbnail::DEFAULT_WIDTH);

        let client = ThumbnailClient::builder()
            .api_key(api_key)
            .storage(Arc::new(storage))
            .retry(self.retry_policy())
            .default_width(width)
            .build()?;

        Ok(client)
    }
}

impl ThumbnailSection {
    /// Merge sections field by field, giving precedence to the other section
    pub fn merge(self, other: ThumbnailSection) -> ThumbnailSection {
        ThumbnailSection {
            api_key: other.api_key.or(self.api_key),
            width: other.width.or(self.width),
            max_attempts: other.max_attempts.or(self.max_attempts),
            retry_delay: other.retry_delay.or(self.retry_delay),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(width) = self.width {
            if width == 0 || width > thumbnail::MAX_WIDTH {
                return Err(anyhow!(
                    "width must be between 1 and {}",
                    thumbnail::MAX_WIDTH
                ));
            }
        }
        if self.max_attempts == Some(0) {
            return Err(anyhow!("max_attempts must be greater than zero"));
        }
        Ok(())
    }
}

/// Parses `45s`, `30m`, `1h` or `2d` into a duration
pub fn parse_duration(value: &str) -> Option<Duration> {
    let unit = value.chars().last()?;
    let amount: u64 = value[..value.len() - unit.len_utf8()].parse().ok()?;
    let scale: u64 = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 60 * 60 * 24,
        _ => return None,
    };
    amount.checked_mul(scale).map(Duration::from_secs)
}

// Custom deserializer for duration validation
fn validate_duration<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value: Option<String> = Option::deserialize(deserializer)?;

    match value {
        Some(ref duration) if parse_duration(duration).is_none() => Err(D::Error::custom(format!(
            "Invalid duration format '{}'. Expected format like '45s', '30m', '1h', '2d'",
            duration
        ))),
        _ => Ok(value),
    }
}

// Custom deserializer so the error names the accepted values
fn validate_failure_policy<'de, D>(deserializer: D) -> Result<Option<FailurePolicy>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value: Option<String> = Option::deserialize(deserializer)?;

    match value.as_deref() {
        None => Ok(None),
        Some("none") => Ok(Some(FailurePolicy::NoEmbed)),
        Some("iframe") => Ok(Some(FailurePolicy::Iframe)),
        Some(other) => Err(D::Error::custom(format!(
            "Invalid failure_policy '{}'. Must be one of: none, iframe",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.user_agent.is_none());
        assert!(config.thumbnail.is_none());
        assert_eq!(config.cache_ttl(), cache::FETCH_TTL);
        assert_eq!(config.request_timeout(), http::REQUEST_TIMEOUT);
    }

    #[test]
    fn test_merge_configs() {
        let base = Config {
            user_agent: Some("base-agent".to_string()),
            cache_ttl: Some("1h".to_string()),
            ..Default::default()
        };

        let override_config = Config {
            user_agent: Some("override-agent".to_string()),
            failure_policy: Some(FailurePolicy::Iframe),
            ..Default::default()
        };

        let merged = base.merge(override_config);
        assert_eq!(merged.user_agent, Some("override-agent".to_string()));
        assert_eq!(merged.cache_ttl, Some("1h".to_string()));
        assert_eq!(merged.failure_policy, Some(FailurePolicy::Iframe));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("45s"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(1800)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("2d"), Some(Duration::from_secs(172_800)));
        assert_eq!(parse_duration("2w"), None);
        assert_eq!(parse_duration("h"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration(&format!("{}d", u64::MAX)), None);
        assert_eq!(
            parse_duration(&format!("{}s", u64::MAX)),
            Some(Duration::from_secs(u64::MAX))
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let section = ThumbnailSection {
            api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", section);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_retry_policy_from_section() {
        let config = Config {
            thumbnail: Some(ThumbnailSection {
                max_attempts: Some(4),
                retry_delay: Some("10s".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let policy = config.retry_policy();
        assert_eq!(policy.delay, Duration::from_secs(10));
        assert_eq!(policy.max_attempts, Some(4));
        assert!(policy.is_bounded());
        assert!(!Config::default().retry_policy().is_bounded());
    }
}
