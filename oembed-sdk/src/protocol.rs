// ABOUTME: oEmbed discovery endpoint client and response decoding
// ABOUTME: Normalizes html/callable, JSON and XML payloads into one shape

use crate::error::EmbedError;
use crate::fetcher::read_capped;
use crate::types::{DiscoveryEndpoint, OEmbedPayload, PayloadFormat};
use reqwest::blocking::Client;
use reqwest::header;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub struct ProtocolClient {
    client: Client,
    max_body_bytes: u64,
}

impl ProtocolClient {
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        max_body_bytes: u64,
    ) -> Result<Self, EmbedError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| EmbedError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_body_bytes,
        })
    }

    pub fn query_endpoint(&self, endpoint: &DiscoveryEndpoint) -> Result<OEmbedPayload, EmbedError> {
        self.query_oembed(&endpoint.url, &endpoint.params, endpoint.format)
    }

    /// Queries a discovery endpoint. Any status outside `200..400` is an error.
    pub fn query_oembed(
        &self,
        endpoint_url: &Url,
        params: &[(String, String)],
        format: PayloadFormat,
    ) -> Result<OEmbedPayload, EmbedError> {
        let response = self
            .client
            .get(endpoint_url.clone())
            .query(params)
            .header(header::ACCEPT, format.accept_header())
            .send()
            .map_err(|e| EmbedError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..400).contains(&status) {
            return Err(EmbedError::Http {
                status,
                url: endpoint_url.to_string(),
            });
        }

        let body = read_capped(response, self.max_body_bytes, endpoint_url)
            .map_err(|e| EmbedError::Network(e.to_string()))?;

        Ok(parse_oembed_response(&String::from_utf8_lossy(&body), format))
    }
}

/// Repeated elements are collected so the first occurrence can win.
#[derive(Debug, Default, Deserialize)]
struct XmlPayload {
    #[serde(default)]
    html: Vec<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    thumbnail_url: Vec<String>,
}

/// Decodes a discovery response body.
///
/// Decoding never fails: a body that cannot be read as the expected
/// encoding is logged and treated as a payload without html.
pub fn parse_oembed_response(body: &str, format: PayloadFormat) -> OEmbedPayload {
    match format {
        PayloadFormat::Html | PayloadFormat::Callable => OEmbedPayload {
            html: Some(body.to_string()),
            ..Default::default()
        },
        PayloadFormat::Json => parse_json(body),
        PayloadFormat::Xml => parse_xml(body),
    }
}

fn parse_json(body: &str) -> OEmbedPayload {
    let data: serde_json::Value = match serde_json::from_str(body) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("Discarding malformed JSON oEmbed response: {}", e);
            return OEmbedPayload::default();
        }
    };

    let field = |name: &str| data.get(name).and_then(|v| v.as_str()).map(str::to_string);

    match field("html") {
        Some(html) => OEmbedPayload {
            html: Some(html),
            title: field("title"),
            thumbnail_url: field("thumbnail_url"),
        },
        None => OEmbedPayload::default(),
    }
}

fn parse_xml(body: &str) -> OEmbedPayload {
    match quick_xml::de::from_str::<XmlPayload>(body) {
        // Missing elements read as empty strings
        Ok(xml) => {
            let first = |values: Vec<String>| Some(values.into_iter().next().unwrap_or_default());
            OEmbedPayload {
                html: first(xml.html),
                title: first(xml.title),
                thumbnail_url: first(xml.thumbnail_url),
            }
        }
        Err(e) => {
            log::warn!("Discarding malformed XML oEmbed response: {}", e);
            OEmbedPayload::default()
        }
    }
}
