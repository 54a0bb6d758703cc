//! CLI commands implementation.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{load_settings, write_default_config, Settings};
use crate::llm::GeminiClient;
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::repository::{SqlitePool, SummaryRepository};

#[derive(Parser)]
#[command(name = "cityscope")]
#[command(about = "Municipal meeting document ingestion and summary service")]
#[command(version)]
pub struct Cli {
    /// Data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Run the ingestion pipeline (discover, extract, summarize, persist)
    Run {
        /// Maximum number of new documents to process
        #[arg(short, long, default_value = "5")]
        max: usize,
        /// Portal page URLs to scan (defaults to the configured pages)
        #[arg(long)]
        pages: Vec<String>,
        /// Delay between model calls in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Skip LLM summarization
        #[arg(long)]
        no_summarize: bool,
        /// Skip persisting results to the store
        #[arg(long)]
        no_persist: bool,
        /// Process documents even if they already have a stored summary
        #[arg(long)]
        no_filter: bool,
    },

    /// Start the read-only summary API server
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default: 127.0.0.1:5000)
        #[arg(default_value = "127.0.0.1:5000")]
        bind: String,
    },

    /// Show store status and the most recent summaries
    Status,

    /// Verify model and database connectivity
    Check,
}

/// Parse CLI arguments and dispatch.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.data_dir)?;

    match cli.command {
        Commands::Init => cmd_init(&settings).await,
        Commands::Run {
            max,
            pages,
            delay_ms,
            no_summarize,
            no_persist,
            no_filter,
        } => {
            if !pages.is_empty() {
                settings.meeting_pages = pages;
            }
            let options = PipelineOptions {
                max_documents: max,
                summarize: !no_summarize,
                persist: !no_persist,
                filter_duplicates: !no_filter,
                delay: Duration::from_millis(delay_ms.unwrap_or(settings.request_delay_ms)),
            };
            cmd_run(&settings, options).await
        }
        Commands::Serve { bind } => cmd_serve(&settings, &bind).await,
        Commands::Status => cmd_status(&settings).await,
        Commands::Check => cmd_check(&settings).await,
    }
}

fn open_repository(settings: &Settings) -> SummaryRepository {
    SummaryRepository::new(
        SqlitePool::from_path(&settings.database_path()),
        &settings.portal_base_url,
    )
}

async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    std::fs::create_dir_all(&settings.data_dir)?;
    let config_path = write_default_config(&settings.data_dir)?;

    let repo = open_repository(settings);
    repo.init_schema().await?;

    println!(
        "{} Initialized data directory at {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    println!("  config:   {}", config_path.display());
    println!("  database: {}", settings.database_path().display());
    Ok(())
}

async fn cmd_run(settings: &Settings, options: PipelineOptions) -> anyhow::Result<()> {
    std::fs::create_dir_all(&settings.data_dir)?;

    let mut pipeline = Pipeline::new(settings);
    pipeline.repository().init_schema().await?;

    println!(
        "{} {} portal pages, up to {} new documents",
        style("→").cyan(),
        settings.meeting_pages.len(),
        options.max_documents
    );

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Running ingestion pipeline...");

    let report = pipeline.run(&options).await;
    pb.finish_and_clear();

    println!("{}", style("Pipeline complete").green().bold());
    println!("{}", report);
    Ok(())
}

async fn cmd_serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;
    crate::server::serve(settings, &host, port).await
}

async fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let repo = open_repository(settings);
    repo.init_schema().await?;

    let count = repo.count().await?;
    println!("{}", style("CityScope store").bold());
    println!("  database: {}", settings.database_path().display());
    println!("  records:  {}", count);

    let recent = repo.get_all(Some(5)).await?;
    if !recent.is_empty() {
        println!("\nMost recent summaries:");
        for summary in recent {
            println!(
                "  {} {} ({})",
                style(&summary.meeting_date).dim(),
                summary.meeting_title,
                summary.document_id
            );
        }
    }
    Ok(())
}

async fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    // Model connectivity
    let client = GeminiClient::new(settings.llm.clone());
    if client.is_available().await {
        println!("{} Model service reachable", style("✓").green());
        match client.list_models().await {
            Ok(models) => {
                let configured = &settings.llm.model;
                let known = models.iter().any(|m| m.ends_with(configured.as_str()));
                if known {
                    println!("{} Model {} available", style("✓").green(), configured);
                } else {
                    println!(
                        "{} Model {} not in the service's model list",
                        style("!").yellow(),
                        configured
                    );
                }
            }
            Err(e) => println!("{} Could not list models: {}", style("!").yellow(), e),
        }
    } else {
        println!(
            "{} Model service unreachable (is GEMINI_API_KEY set?)",
            style("✗").red()
        );
    }

    // Store connectivity
    let repo = open_repository(settings);
    match repo.init_schema().await {
        Ok(()) => match repo.count().await {
            Ok(count) => println!(
                "{} Database reachable ({} records)",
                style("✓").green(),
                count
            ),
            Err(e) => println!("{} Database query failed: {}", style("✗").red(), e),
        },
        Err(e) => println!("{} Database unreachable: {}", style("✗").red(), e),
    }

    Ok(())
}

fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    // Try parsing as just a port number
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    // Try parsing as host:port
    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
    }

    // Must be just a host, use default port
    Ok((bind.to_string(), 5000))
}
