//! sdfetch - ScienceDirect search form
//!
//! Serves a search form for the Elsevier ScienceDirect search API, or runs a
//! single search from the command line.
//!
//! The API key is read from `SCIENCEDIRECT_API_KEY`.
//!
//! ## Usage
//!
//! ### HTTP Server Mode
//! ```bash
//! sdfetch serve --port 3000
//! ```
//!
//! ### CLI Mode
//! ```bash
//! sdfetch search "graphene oxide" --from 2020 --to 2024 --count 50 --output results.csv
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sdfetch::config::FetcherConfig;
use sdfetch::export;
use sdfetch::pagination::PageWindow;
use sdfetch::query::{FormField, PageSize, QueryForm};
use sdfetch::render::{PlaceholderPolicy, RenderOptions};
use sdfetch::sciencedirect::{ScienceDirectClient, SearchBackend};
use sdfetch::server::{self, AppState};
use sdfetch::session::SearchController;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// ScienceDirect search form
#[derive(Parser)]
#[command(name = "sdfetch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Override the API host (default: https://api.elsevier.com)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the search form as an HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Show the table for a single result instead of the "nothing found" row
        #[arg(long)]
        show_single_result: bool,
    },

    /// Run one search and print the results
    Search {
        /// Search query
        query: String,

        /// First publication year
        #[arg(long, default_value = "2022")]
        from: i32,

        /// Last publication year
        #[arg(long, default_value = "2024")]
        to: i32,

        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: u32,

        /// Results per page: 10, 20, 50 or 100
        #[arg(long, default_value = "20")]
        count: u32,

        /// Write results to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let mut config = FetcherConfig::from_env().context("Invalid environment configuration")?;
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }
    info!(config = ?config, "Loaded configuration");

    match cli.command {
        Commands::Serve {
            port,
            host,
            show_single_result,
        } => run_server(config, host, port, show_single_result).await,
        Commands::Search {
            query,
            from,
            to,
            page,
            count,
            output,
        } => run_search(config, query, from, to, page, count, output).await,
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(
    config: FetcherConfig,
    host: String,
    port: u16,
    show_single_result: bool,
) -> Result<()> {
    let client = ScienceDirectClient::new(config).context("Failed to create search client")?;

    let placeholder = if show_single_result {
        PlaceholderPolicy::EmptyOnly
    } else {
        PlaceholderPolicy::BelowTwo
    };
    let state = Arc::new(AppState {
        controller: SearchController::new(Arc::new(client)),
        options: RenderOptions {
            placeholder,
            ..Default::default()
        },
    });

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    server::serve(listener, state).await.context("Server error")?;

    Ok(())
}

// ============================================================================
// One-off Search
// ============================================================================

async fn run_search(
    config: FetcherConfig,
    query: String,
    from: i32,
    to: i32,
    page: u32,
    count: u32,
    output: Option<PathBuf>,
) -> Result<()> {
    let page_size = PageSize::try_from(count).context("Invalid --count")?;

    let mut form = QueryForm::default();
    form.update(FormField::Query(query));
    form.update(FormField::YearFrom(from));
    form.update(FormField::YearTo(to));
    form.update(FormField::PageSize(page_size));
    form.update(FormField::Page(page));
    form.validate().context("Invalid search")?;

    let client = ScienceDirectClient::new(config).context("Failed to create search client")?;
    let result = client.search(&form).await.context("Search failed")?;

    let window = PageWindow::new(result.total, form.page, form.page_size);
    println!(
        "\nPage {} of {} | {} of {}\n",
        window.page,
        window.total_pages,
        window.range_label(),
        window.total
    );

    for entry in &result.entries {
        println!("[{}] {}", entry.access.label(), entry.title);
        println!("    {}", entry.authors.joined());
        println!(
            "    {} {} ({})",
            entry.publication_name,
            entry.volume.as_deref().unwrap_or_default(),
            entry.cover_date
        );
        println!("    doi: {}  pii: {}", entry.doi, entry.pii);
        if let Some(link) = entry.title_link() {
            println!("    {}", link);
        }
    }

    if result.entries.is_empty() {
        println!("Nothing found");
    }

    if let Some(path) = output {
        let written = export::write_csv(&path, &result.entries)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("\nSaved {} rows to {}", written, path.display());
    }

    Ok(())
}
