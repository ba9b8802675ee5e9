// ABOUTME: Main entry point for the oembed CLI application
// ABOUTME: Provides commands for discovery, link inspection, thumbnails and cache upkeep

use anyhow::Result;
use clap::Parser;
use oembed_cli::cli::{CacheAction, Cli, Commands};
use oembed_cli::cli_output::CliOutput;
use oembed_cli::config::Config;
use oembed_cli::output::{JsonFormatter, TableFormatter};
use oembed_sdk::EmbedError;
use std::env;
use std::io::IsTerminal;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Determine if color should be used
    let use_color = !cli.no_color
        && env::var("NO_COLOR").is_err()
        && env::var("TERM").unwrap_or_default() != "dumb"
        && std::io::stdout().is_terminal();
    let output = CliOutput::with_color(use_color);

    if let Err(e) = run(cli, use_color, &output) {
        output.error(&format!("{:#}", e));
        if let Some(help) = e.downcast_ref::<EmbedError>().and_then(EmbedError::help_text) {
            output.hint(help);
        }
        std::process::exit(1);
    }
}

/// `--verbose` wins over `RUST_LOG`; otherwise only warnings and errors show
fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn run(cli: Cli, use_color: bool, output: &CliOutput) -> Result<()> {
    let config = Config::load_with_override(cli.config.as_deref())?;
    log::debug!("Loaded configuration: {:?}", config);

    match cli.command {
        Commands::Discover {
            url,
            format,
            json,
            no_cache,
        } => {
            let client = config.embed_client(no_cache)?;
            let result = client.discover(&url, format)?;

            if json {
                println!("{}", JsonFormatter::new(true).format_render(&result)?);
            } else {
                match result.to_html() {
                    Some(html) => println!("{}", html),
                    None => output.warning(&format!("No embed available for {}", url)),
                }
            }
        }
        Commands::Links { url } => {
            let client = config.embed_client(false)?;
            let (url, links) = client.scan_links(&url)?;

            if links.is_empty() {
                println!("No <link> elements found on {}", url);
            } else {
                println!("{}", TableFormatter::new(use_color).format_links(&links));
            }
        }
        Commands::Thumbnail {
            url,
            width,
            height,
            force,
        } => {
            let client = config.thumbnail_client()?;
            let stored = if force {
                client.capture_thumbnail(&url, width, height)?
            } else {
                client.capture_thumbnail_if_missing(&url, width, height)?
            };

            output.success(&format!("Screenshot of {} stored", url));
            println!("{}", stored.blob_key);
        }
        Commands::Cache { action } => {
            let cache = config.file_cache()?;
            match action {
                CacheAction::Clear => {
                    cache.clear()?;
                    output.success(&format!("Cleared fetch cache at {}", cache.dir().display()));
                }
                CacheAction::Purge => {
                    let removed = cache.purge_expired()?;
                    output.success(&format!("Removed {} expired cache entries", removed));
                }
            }
        }
    }

    Ok(())
}
