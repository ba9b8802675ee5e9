// ABOUTME: oEmbed link discovery over fetched HTML
// ABOUTME: Tolerant <link> scanning behind a trait, plus endpoint resolution

use crate::types::{DiscoveryEndpoint, LinkCandidate, PayloadFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static LINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<link[^>]+>").expect("link pattern is valid"));

static ATTR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i) ([a-z]+)=(?:"([^"]+)"|'([^']+)')"#).expect("attribute pattern is valid")
});

static LINK_TYPE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^application/(json|xml)\+oembed$").expect("link type pattern is valid")
});

/// Extracts `<link>` elements from markup, in document order.
pub trait LinkScanner: Send + Sync {
    fn scan(&self, html: &str) -> Vec<LinkCandidate>;
}

/// Non-validating token scan. Third-party markup is often broken, so this
/// never fails; it just finds fewer links.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexLinkScanner;

impl LinkScanner for RegexLinkScanner {
    fn scan(&self, html: &str) -> Vec<LinkCandidate> {
        LINK_REGEX
            .find_iter(html)
            .map(|tag| {
                let mut candidate = LinkCandidate::default();
                for attr in ATTR_REGEX.captures_iter(tag.as_str()) {
                    let value = attr
                        .get(2)
                        .or_else(|| attr.get(3))
                        .map(|m| m.as_str().to_string());
                    match attr[1].to_lowercase().as_str() {
                        "rel" => candidate.rel = value,
                        "type" => candidate.link_type = value,
                        "href" => candidate.href = value,
                        _ => {}
                    }
                }
                candidate
            })
            .collect()
    }
}

impl LinkCandidate {
    /// The payload format this link advertises, if it is an oEmbed link.
    pub fn oembed_format(&self) -> Option<PayloadFormat> {
        if self.rel.as_deref() != Some("alternate") {
            return None;
        }
        let link_type = self.link_type.as_deref()?;
        let captures = LINK_TYPE_REGEX.captures(link_type)?;
        PayloadFormat::from_link_token(&captures[1])
    }
}

/// Resolves a qualifying candidate against the page URL.
///
/// The query string is split into passthrough parameters (blank values
/// dropped) and removed from the endpoint URL along with any fragment.
pub fn resolve_endpoint(candidate: &LinkCandidate, base_url: &Url) -> Option<DiscoveryEndpoint> {
    let format = candidate.oembed_format()?;
    let href = candidate.href.as_deref()?;

    let mut url = match base_url.join(href) {
        Ok(url) => url,
        Err(e) => {
            log::debug!("Skipping oEmbed link with bad href '{}': {}", href, e);
            return None;
        }
    };

    let params = url
        .query_pairs()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.set_query(None);
    url.set_fragment(None);

    Some(DiscoveryEndpoint {
        url,
        params,
        format,
    })
}

/// Every resolvable oEmbed endpoint advertised by the page, in document order.
pub fn find_oembed_links(
    scanner: &dyn LinkScanner,
    html: &str,
    base_url: &Url,
) -> Vec<DiscoveryEndpoint> {
    scanner
        .scan(html)
        .iter()
        .filter_map(|candidate| resolve_endpoint(candidate, base_url))
        .collect()
}

/// The first oEmbed endpoint advertised by the page.
pub fn find_oembed_link(html: &str, base_url: &Url) -> Option<DiscoveryEndpoint> {
    RegexLinkScanner
        .scan(html)
        .iter()
        .find_map(|candidate| resolve_endpoint(candidate, base_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.example.com/videos/123").unwrap()
    }

    #[test]
    fn test_double_quoted_link() {
        let html = r#"<html><head>
            <link rel="alternate" type="application/json+oembed" href="/oembed?format=json">
        </head></html>"#;

        let endpoint = find_oembed_link(html, &base()).unwrap();
        assert_eq!(endpoint.url.as_str(), "https://www.example.com/oembed");
        assert_eq!(
            endpoint.params,
            vec![("format".to_string(), "json".to_string())]
        );
        assert_eq!(endpoint.format, PayloadFormat::Json);
    }

    #[test]
    fn test_single_quoted_link() {
        let html = "<LINK REL='alternate' TYPE='application/json+oembed' HREF='/oembed?format=json'>";

        let endpoint = find_oembed_link(html, &base()).unwrap();
        assert_eq!(endpoint.url.as_str(), "https://www.example.com/oembed");
        assert_eq!(
            endpoint.params,
            vec![("format".to_string(), "json".to_string())]
        );
    }

    #[test]
    fn test_xml_link_with_absolute_href() {
        let html = r#"<link href="https://api.example.org/oembed.xml?url=https%3A%2F%2Fx.test%2F1&maxwidth=600" type="application/xml+oembed" rel="alternate" />"#;

        let endpoint = find_oembed_link(html, &base()).unwrap();
        assert_eq!(endpoint.url.as_str(), "https://api.example.org/oembed.xml");
        assert_eq!(endpoint.format, PayloadFormat::Xml);
        assert_eq!(
            endpoint.params,
            vec![
                ("url".to_string(), "https://x.test/1".to_string()),
                ("maxwidth".to_string(), "600".to_string()),
            ]
        );
    }

    #[test]
    fn test_relative_href_resolves_against_page() {
        let html = r#"<link rel="alternate" type="application/json+oembed" href="oembed.json">"#;
        let endpoint = find_oembed_link(html, &base()).unwrap();
        assert_eq!(
            endpoint.url.as_str(),
            "https://www.example.com/videos/oembed.json"
        );
        assert!(endpoint.params.is_empty());
    }

    #[test]
    fn test_first_qualifying_link_wins() {
        let html = r#"
            <link rel="stylesheet" type="text/css" href="/style.css">
            <link rel="alternate" type="application/rss+xml" href="/feed">
            <link rel="alternate" type="application/xml+oembed" href="/oembed.xml">
            <link rel="alternate" type="application/json+oembed" href="/oembed.json">
        "#;

        let endpoint = find_oembed_link(html, &base()).unwrap();
        assert_eq!(endpoint.format, PayloadFormat::Xml);

        let all = find_oembed_links(&RegexLinkScanner, html, &base());
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].format, PayloadFormat::Json);
    }

    #[test]
    fn test_rel_must_be_exactly_alternate() {
        let html = r#"<link rel="alternate nofollow" type="application/json+oembed" href="/o">"#;
        assert!(find_oembed_link(html, &base()).is_none());
    }

    #[test]
    fn test_no_links() {
        assert!(find_oembed_link("<html><body>hi</body></html>", &base()).is_none());
        assert!(find_oembed_link("", &base()).is_none());
    }

    #[test]
    fn test_blank_query_values_are_dropped() {
        let html = r#"<link rel="alternate" type="application/json+oembed" href="/o?url=&format=json#top">"#;
        let endpoint = find_oembed_link(html, &base()).unwrap();
        assert_eq!(endpoint.url.as_str(), "https://www.example.com/o");
        assert_eq!(
            endpoint.params,
            vec![("format".to_string(), "json".to_string())]
        );
    }

    #[test]
    fn test_malformed_markup_is_tolerated() {
        let html = r#"<div <link rel="alternate" type="application/json+oembed" href="/o" <p>unclosed"#;
        let candidates = RegexLinkScanner.scan(html);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].href.as_deref(), Some("/o"));
    }

    #[test]
    fn test_scanner_reports_every_link() {
        let html = r#"<link rel="icon" href="/favicon.ico"><link rel='canonical' href='https://example.com/a'>"#;
        let candidates = RegexLinkScanner.scan(html);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].rel.as_deref(), Some("icon"));
        assert_eq!(candidates[0].link_type, None);
        assert!(candidates.iter().all(|c| c.oembed_format().is_none()));
    }
}
