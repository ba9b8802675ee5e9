// ABOUTME: This module handles output formatting for the oembed CLI
// ABOUTME: It renders link tables with color support and discovery results as HTML or JSON

use anyhow::Result;
use oembed_sdk::{LinkCandidate, RenderResult};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

pub struct TableFormatter {
    use_color: bool,
}

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "Rel")]
    rel: String,
    #[tabled(rename = "Type")]
    link_type: String,
    #[tabled(rename = "Href")]
    href: String,
    #[tabled(rename = "oEmbed")]
    oembed: String,
}

impl TableFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn truncate(text: &str, max_len: usize) -> String {
        if text.chars().count() <= max_len {
            text.to_string()
        } else {
            let kept: String = text.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        }
    }

    fn format_missing(&self, value: &Option<String>) -> String {
        match value {
            Some(value) => value.clone(),
            None if self.use_color => "-".dimmed().to_string(),
            None => "-".to_string(),
        }
    }

    fn format_qualifies(&self, link: &LinkCandidate) -> String {
        match (link.oembed_format(), self.use_color) {
            (Some(format), true) => format!("{}", format.to_string().green()),
            (Some(format), false) => format.to_string(),
            (None, true) => "no".dimmed().to_string(),
            (None, false) => "no".to_string(),
        }
    }

    pub fn format_links(&self, links: &[LinkCandidate]) -> String {
        let rows: Vec<LinkRow> = links
            .iter()
            .map(|link| LinkRow {
                rel: self.format_missing(&link.rel),
                link_type: self.format_missing(&link.link_type),
                href: self.format_missing(&link.href.as_deref().map(|href| Self::truncate(href, 60))),
                oembed: self.format_qualifies(link),
            })
            .collect();

        let mut table = Table::new(rows);
        table.with(Style::psql());
        table.to_string()
    }
}

#[derive(Serialize)]
struct RenderOutput<'a> {
    #[serde(flatten)]
    result: &'a RenderResult,
    html: Option<String>,
}

pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Serializes the result with its rendered HTML alongside
    pub fn format_render(&self, result: &RenderResult) -> Result<String> {
        let output = RenderOutput {
            result,
            html: result.to_html(),
        };

        if self.pretty {
            Ok(serde_json::to_string_pretty(&output)?)
        } else {
            Ok(serde_json::to_string(&output)?)
        }
    }
}
