// ABOUTME: CLI argument definitions for the oembed application
// ABOUTME: Defines the command-line interface structure using clap derive macros

use clap::{Parser, Subcommand};
use oembed_sdk::constants::thumbnail::MAX_WIDTH;
use oembed_sdk::EmbedFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "oembed")]
#[command(about = "Discover embeddable HTML for any URL", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output for debugging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Read configuration from this file instead of the standard locations
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Turn a URL into embeddable HTML
    Discover {
        /// Page or media URL
        url: String,

        /// Requested output (full, html, callable)
        #[arg(short, long, default_value = "full")]
        format: EmbedFormat,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Bypass the fetch cache
        #[arg(long)]
        no_cache: bool,
    },
    /// List every <link> on a page and whether it advertises oEmbed
    Links {
        /// Page URL
        url: String,
    },
    /// Capture a screenshot of a page into thumbnail storage
    Thumbnail {
        /// Page URL
        url: String,

        /// Viewport width in pixels
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WIDTH)))]
        width: Option<u32>,

        /// Crop the capture to this height
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        height: Option<u32>,

        /// Capture again even if a stored screenshot exists
        #[arg(long)]
        force: bool,
    },
    /// Manage the fetch cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum CacheAction {
    /// Remove every cached response
    Clear,
    /// Remove only expired responses
    Purge,
}
