// ABOUTME: Ordered registry of per-domain renderers consulted before discovery
// ABOUTME: Includes a built-in YouTube renderer that needs no network access

use crate::types::RenderResult;
use url::Url;

/// Bespoke embedding logic for a known site.
///
/// Returning `None` means "not mine"; the next renderer is tried.
pub trait CustomRenderer: Send + Sync {
    /// Name used for logging.
    fn name(&self) -> &'static str;

    fn render(&self, url: &Url) -> Option<RenderResult>;
}

/// Renderers tried in registration order. The first `Some` wins.
#[derive(Default)]
pub struct RendererRegistry {
    renderers: Vec<Box<dyn CustomRenderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in renderers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(YouTubeRenderer);
        registry
    }

    pub fn register(&mut self, renderer: impl CustomRenderer + 'static) -> &mut Self {
        self.renderers.push(Box::new(renderer));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.renderers.iter().map(|r| r.name()).collect()
    }

    pub fn try_custom_render(&self, url: &Url) -> Option<RenderResult> {
        self.renderers.iter().find_map(|renderer| {
            let rendered = renderer.render(url)?;
            log::debug!("renderer={} matched {}", renderer.name(), url);
            Some(rendered)
        })
    }
}

/// Embeds YouTube videos through the no-cookie player.
#[derive(Debug, Default, Clone, Copy)]
pub struct YouTubeRenderer;

impl YouTubeRenderer {
    fn video_id(url: &Url) -> Option<String> {
        let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
        let mut segments = url.path_segments()?;

        let id = match host {
            "youtu.be" => segments.next()?.to_string(),
            "youtube.com" => match segments.next()? {
                "watch" => url
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned())?,
                "shorts" | "embed" | "live" => segments.next()?.to_string(),
                _ => return None,
            },
            _ => return None,
        };

        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then_some(id)
    }
}

impl CustomRenderer for YouTubeRenderer {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn render(&self, url: &Url) -> Option<RenderResult> {
        let id = Self::video_id(url)?;
        Some(RenderResult::OEmbedHtml(format!(
            r#"<iframe src="https://www.youtube-nocookie.com/embed/{}" frameborder="0" width="100%" allow="encrypted-media; picture-in-picture" allowfullscreen></iframe>"#,
            id
        )))
    }
}
