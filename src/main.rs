use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use naver_blog_scraper::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "naver-blog-scraper",
    version,
    about = "Naver Blog search scraper with pausable streaming and spreadsheet export",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file; environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,

        /// Bind port
        #[arg(short, long)]
        port: Option<u16>,

        /// Allow cross-origin requests
        #[arg(long, default_value = "false")]
        cors: bool,
    },

    /// Count posts for a keyword and date range
    Count {
        /// Search keyword
        keyword: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: String,
    },

    /// Scrape posts, printing one JSON record per line
    Scrape {
        /// Search keyword
        keyword: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Comma separated fields (title,url,content,author,blog_name,date,likes,comments)
        #[arg(short, long, default_value = "")]
        fields: String,

        /// Content mode (preview, full, none)
        #[arg(long, default_value = "preview")]
        content_mode: String,

        /// Also write the results to an .xlsx file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the detail extractor over a saved post page
    Inspect {
        /// Saved HTML of the post page
        page: PathBuf,

        /// Saved HTML of a frame embedded in the page (repeatable, in order)
        #[arg(long)]
        frame: Vec<PathBuf>,

        /// Comma separated fields
        #[arg(short, long, default_value = "")]
        fields: String,

        /// Content mode (preview, full, none)
        #[arg(long, default_value = "full")]
        content_mode: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, cli.verbose, &config.logging.level)?;

    match cli.command {
        Commands::Serve { host, port, cors } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.server.enable_cors |= cors;
            config.validate().context("Invalid configuration")?;

            tracing::info!(host = %config.server.host, port = config.server.port, "Starting serve command");
            commands::serve(config).await?;
        }

        Commands::Count { keyword, start, end } => {
            tracing::info!(keyword = %keyword, start = %start, end = %end, "Starting count command");
            commands::count(&config, &keyword, &start, &end).await?;
        }

        Commands::Scrape {
            keyword,
            start,
            end,
            fields,
            content_mode,
            output,
        } => {
            tracing::info!(
                keyword = %keyword,
                start = %start,
                end = %end,
                fields = %fields,
                content_mode = %content_mode,
                output = ?output,
                "Starting scrape command"
            );
            commands::scrape(
                config,
                commands::ScrapeParams {
                    keyword,
                    start,
                    end,
                    fields,
                    content_mode,
                    output,
                },
            )
            .await?;
        }

        Commands::Inspect {
            page,
            frame,
            fields,
            content_mode,
        } => {
            tracing::info!(page = %page.display(), frames = frame.len(), "Starting inspect command");
            commands::inspect(&config, &page, &frame, &fields, &content_mode, cli.verbose).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn setup_tracing(format: &str, verbose: bool, level: &str) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("naver_blog_scraper=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
            tracing_subscriber::EnvFilter::try_new(format!("naver_blog_scraper={level},warn"))
        })?
    };

    // Records go to stdout, so logs go to stderr
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
