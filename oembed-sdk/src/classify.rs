// ABOUTME: Content classification that picks the final embedding strategy
// ABOUTME: Maps MIME type, requested format and discovery outcome to a RenderResult

use crate::error::EmbedError;
use crate::types::{EmbedFormat, OEmbedPayload, RenderResult};
use url::Url;

/// Chooses how to embed `url`.
///
/// `payload` is the outcome of oEmbed discovery, or `None` when no endpoint
/// was found or querying it failed. It is only consulted for HTML pages
/// requested in the `full` format.
pub fn classify_and_render(
    mime_type: &str,
    format: EmbedFormat,
    payload: Option<&OEmbedPayload>,
    url: &Url,
) -> Result<RenderResult, EmbedError> {
    if is_html(mime_type) {
        if format == EmbedFormat::Full {
            if let Some(html) = payload.and_then(OEmbedPayload::usable_html) {
                return Ok(RenderResult::OEmbedHtml(html.to_string()));
            }
        }
        return Ok(RenderResult::IframeTag(url.clone()));
    }

    if mime_type.starts_with("audio/") {
        return Ok(RenderResult::AudioTag(url.clone()));
    }

    if mime_type.starts_with("video/") {
        return Ok(RenderResult::VideoTag(url.clone()));
    }

    Err(EmbedError::UnsupportedMimeType {
        mime_type: mime_type.to_string(),
        url: url.to_string(),
    })
}

/// Whether discovery should run for a page of this type and format.
pub fn wants_discovery(mime_type: &str, format: EmbedFormat) -> bool {
    is_html(mime_type) && format == EmbedFormat::Full
}

fn is_html(mime_type: &str) -> bool {
    mime_type.starts_with("text/html")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://example.com/media").unwrap()
    }

    fn payload(html: &str) -> OEmbedPayload {
        OEmbedPayload {
            html: Some(html.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_html_with_payload_is_oembed() {
        let result = classify_and_render(
            "text/html; charset=utf-8",
            EmbedFormat::Full,
            Some(&payload("<iframe src=\"x\"></iframe>")),
            &url(),
        )
        .unwrap();
        assert_eq!(
            result,
            RenderResult::OEmbedHtml("<iframe src=\"x\"></iframe>".to_string())
        );
    }

    #[test]
    fn test_html_without_payload_is_iframe() {
        let result = classify_and_render("text/html", EmbedFormat::Full, None, &url()).unwrap();
        assert_eq!(result, RenderResult::IframeTag(url()));

        let empty = OEmbedPayload::default();
        let result =
            classify_and_render("text/html", EmbedFormat::Full, Some(&empty), &url()).unwrap();
        assert_eq!(result, RenderResult::IframeTag(url()));

        let blank = payload("");
        let result =
            classify_and_render("text/html", EmbedFormat::Full, Some(&blank), &url()).unwrap();
        assert_eq!(result, RenderResult::IframeTag(url()));
    }

    #[test]
    fn test_html_in_non_full_format_skips_payload() {
        let markup = payload("<b>ignored</b>");
        for format in [EmbedFormat::Html, EmbedFormat::Callable] {
            let result = classify_and_render("text/html", format, Some(&markup), &url()).unwrap();
            assert_eq!(result, RenderResult::IframeTag(url()));
        }
    }

    #[test]
    fn test_audio_and_video() {
        assert_eq!(
            classify_and_render("audio/mpeg", EmbedFormat::Full, None, &url()).unwrap(),
            RenderResult::AudioTag(url())
        );
        assert_eq!(
            classify_and_render("video/mp4", EmbedFormat::Html, None, &url()).unwrap(),
            RenderResult::VideoTag(url())
        );
    }

    #[test]
    fn test_unsupported_mime_type_is_an_error() {
        let err =
            classify_and_render("application/pdf", EmbedFormat::Full, None, &url()).unwrap_err();
        match err {
            EmbedError::UnsupportedMimeType { mime_type, url } => {
                assert_eq!(mime_type, "application/pdf");
                assert_eq!(url, "https://example.com/media");
            }
            other => panic!("Expected UnsupportedMimeType, got {other:?}"),
        }
    }

    #[test]
    fn test_wants_discovery() {
        assert!(wants_discovery("text/html; charset=utf-8", EmbedFormat::Full));
        assert!(!wants_discovery("text/html", EmbedFormat::Html));
        assert!(!wants_discovery("audio/ogg", EmbedFormat::Full));
    }
}
