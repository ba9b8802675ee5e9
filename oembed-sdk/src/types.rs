// ABOUTME: Shared data types for discovery requests, payloads and render results
// ABOUTME: Defines the tagged RenderResult produced by every discover call

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// What the caller wants back from `discover`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedFormat {
    /// Run oEmbed discovery on HTML pages
    #[default]
    Full,
    /// Skip discovery; HTML pages are embedded directly
    Html,
    Callable,
}

impl EmbedFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedFormat::Full => "full",
            EmbedFormat::Html => "html",
            EmbedFormat::Callable => "callable",
        }
    }
}

impl fmt::Display for EmbedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbedFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(EmbedFormat::Full),
            "html" => Ok(EmbedFormat::Html),
            "callable" => Ok(EmbedFormat::Callable),
            other => Err(format!(
                "Invalid format '{}'. Must be one of: full, html, callable",
                other
            )),
        }
    }
}

/// Encoding of a discovery endpoint response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    Html,
    Callable,
    Json,
    Xml,
}

impl PayloadFormat {
    /// Maps the format token of an `application/{json,xml}+oembed` link type.
    pub fn from_link_token(token: &str) -> Option<Self> {
        match token {
            "json" => Some(PayloadFormat::Json),
            "xml" => Some(PayloadFormat::Xml),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadFormat::Html => "html",
            PayloadFormat::Callable => "callable",
            PayloadFormat::Json => "json",
            PayloadFormat::Xml => "xml",
        }
    }

    pub fn accept_header(&self) -> &'static str {
        match self {
            PayloadFormat::Json => "application/json",
            PayloadFormat::Xml => "text/xml",
            PayloadFormat::Html | PayloadFormat::Callable => "text/html",
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `<link>` element as seen by a [`crate::LinkScanner`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkCandidate {
    pub rel: Option<String>,
    #[serde(rename = "type")]
    pub link_type: Option<String>,
    pub href: Option<String>,
}

/// A resolved discovery endpoint, with its query string split out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryEndpoint {
    pub url: Url,
    pub params: Vec<(String, String)>,
    pub format: PayloadFormat,
}

/// Decoded discovery response. Only `html` is used for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OEmbedPayload {
    pub html: Option<String>,
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl OEmbedPayload {
    /// The embed markup, if the endpoint produced any.
    pub fn usable_html(&self) -> Option<&str> {
        self.html.as_deref().filter(|html| !html.trim().is_empty())
    }
}

/// The terminal output of [`crate::EmbedClient::discover`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RenderResult {
    /// Markup returned by a discovery endpoint or a custom renderer.
    ///
    /// This is third-party HTML. It is passed through untouched; whoever
    /// renders it unescaped is trusting its source.
    OEmbedHtml(String),
    AudioTag(Url),
    VideoTag(Url),
    IframeTag(Url),
    DiscoveryFailed,
}

impl RenderResult {
    /// Renders the result as embeddable HTML. `DiscoveryFailed` has none.
    pub fn to_html(&self) -> Option<String> {
        match self {
            RenderResult::OEmbedHtml(html) => Some(html.clone()),
            RenderResult::AudioTag(url) => Some(format!(
                r#"<audio src="{}" class="width-100" preload="none" controls></audio>"#,
                escape_attr(url)
            )),
            RenderResult::VideoTag(url) => Some(format!(
                r#"<video src="{}" class="width-100" preload="none" controls></video>"#,
                escape_attr(url)
            )),
            RenderResult::IframeTag(url) => Some(format!(
                r#"<iframe src="{}" frameborder="0" width="100%"></iframe>"#,
                escape_attr(url)
            )),
            RenderResult::DiscoveryFailed => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RenderResult::OEmbedHtml(_) => "oembed_html",
            RenderResult::AudioTag(_) => "audio_tag",
            RenderResult::VideoTag(_) => "video_tag",
            RenderResult::IframeTag(_) => "iframe_tag",
            RenderResult::DiscoveryFailed => "discovery_failed",
        }
    }
}

fn escape_attr(url: &Url) -> String {
    html_escape::encode_double_quoted_attribute(url.as_str()).into_owned()
}

/// How `discover` degrades when the target page cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Produce `RenderResult::DiscoveryFailed`
    #[default]
    #[serde(rename = "none")]
    NoEmbed,
    /// Embed the URL in an iframe anyway
    Iframe,
}

/// A screenshot persisted to blob storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredImage {
    pub blob_key: String,
}
