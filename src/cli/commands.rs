//! CLI commands implementation.
//!
//! Grounded on the teacher's `cli::commands::run` dispatch shape (parse,
//! load settings, match on subcommand, print with `console::style`) and
//! `cli::commands::state` (status/clear commands against a repository).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use crate::config::Config;
use crate::frontier::Frontier;
use crate::get::GetParams;
use crate::model::{QueueWithinCrawl, UrlInfo, UrlItem};

#[derive(Parser)]
#[command(name = "frontier")]
#[command(about = "URL Frontier scheduling engine")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the store's database path.
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled, for early logging setup before `Cli::parse`.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a discovered URL.
    Put {
        url: String,
        /// Queue key (derived from the URL's host when omitted).
        #[arg(long, default_value = "")]
        key: String,
        #[arg(long, default_value = "")]
        crawl_id: String,
        /// Mark this URL as already known, rescheduling it instead of
        /// inserting it fresh. `0` means completed/never-refetchable.
        #[arg(long)]
        refetchable_from_date: Option<i64>,
    },

    /// Dispatch URLs for crawling.
    Get {
        #[arg(long, default_value_t = 1)]
        max_queues: u32,
        #[arg(long, default_value_t = 1)]
        max_urls_per_queue: u32,
        #[arg(long, default_value_t = 30)]
        delay_requestable_secs: u32,
        /// Restrict dispatch to one queue instead of rotating.
        #[arg(long)]
        crawl_id: Option<String>,
        #[arg(long)]
        queue_key: Option<String>,
    },

    /// List dispatchable queue identifiers.
    ListQueues {
        /// Maximum number of queues to return (0 = unlimited).
        #[arg(long, default_value_t = 0)]
        max: u32,
    },

    /// Report aggregate counts for one queue, or all queues.
    Stats {
        #[arg(long)]
        crawl_id: Option<String>,
        #[arg(long)]
        queue_key: Option<String>,
    },

    /// Delete one queue and everything in it.
    DeleteQueue {
        #[arg(long, default_value = "")]
        crawl_id: String,
        queue_key: String,
    },

    /// Delete every queue under one crawl.
    DeleteCrawl {
        crawl_id: String,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data) = &cli.data {
        config.store_path = data.clone();
    }

    let frontier = Frontier::open(&config).await?;
    let now = chrono::Utc::now().timestamp();

    let result = match cli.command {
        Commands::Put {
            url,
            key,
            crawl_id,
            refetchable_from_date,
        } => cmd_put(&frontier, url, key, crawl_id, refetchable_from_date, now).await,
        Commands::Get {
            max_queues,
            max_urls_per_queue,
            delay_requestable_secs,
            crawl_id,
            queue_key,
        } => {
            cmd_get(
                &frontier,
                max_queues,
                max_urls_per_queue,
                delay_requestable_secs,
                crawl_id,
                queue_key,
                now,
            )
            .await
        }
        Commands::ListQueues { max } => cmd_list_queues(&frontier, max, now).await,
        Commands::Stats { crawl_id, queue_key } => cmd_stats(&frontier, crawl_id, queue_key, now).await,
        Commands::DeleteQueue { crawl_id, queue_key } => cmd_delete_queue(&frontier, crawl_id, queue_key).await,
        Commands::DeleteCrawl { crawl_id } => cmd_delete_crawl(&frontier, crawl_id).await,
    };

    frontier.close().await?;
    result
}

async fn cmd_put(
    frontier: &Frontier,
    url: String,
    key: String,
    crawl_id: String,
    refetchable_from_date: Option<i64>,
    now: i64,
) -> anyhow::Result<()> {
    let mut info = UrlInfo::new(url);
    info.key = key;
    info.crawl_id = crawl_id;

    let item = match refetchable_from_date {
        Some(refetchable_from_date) => UrlItem::Known {
            info,
            refetchable_from_date,
        },
        None => UrlItem::Discovered { info },
    };

    let acked = frontier.put(item, now).await?;
    println!("{} acked {}", style("\u{2713}").green(), acked);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_get(
    frontier: &Frontier,
    max_queues: u32,
    max_urls_per_queue: u32,
    delay_requestable_secs: u32,
    crawl_id: Option<String>,
    queue_key: Option<String>,
    now: i64,
) -> anyhow::Result<()> {
    let target_queue = queue_key.map(|key| QueueWithinCrawl::new(crawl_id.unwrap_or_default(), key));

    let params = GetParams {
        max_queues,
        max_urls_per_queue,
        delay_requestable_secs,
        target_queue,
    };

    let urls = frontier.get(params, now).await?;
    if urls.is_empty() {
        println!("{} nothing dispatchable", style("!").yellow());
        return Ok(());
    }
    for info in urls {
        println!("{}", info.url);
    }
    Ok(())
}

async fn cmd_list_queues(frontier: &Frontier, max: u32, now: i64) -> anyhow::Result<()> {
    let queues = frontier.list_queues(max, now).await?;
    if queues.is_empty() {
        println!("{} no dispatchable queues", style("!").yellow());
        return Ok(());
    }
    for q in queues {
        println!("{}", q);
    }
    Ok(())
}

async fn cmd_stats(
    frontier: &Frontier,
    crawl_id: Option<String>,
    queue_key: Option<String>,
    now: i64,
) -> anyhow::Result<()> {
    let queue = queue_key.map(|key| QueueWithinCrawl::new(crawl_id.unwrap_or_default(), key));
    let stats = frontier.stats(queue, now).await?;

    println!("{}", style("Frontier Stats").bold());
    println!("{:<20} {}", "numberOfQueues:", stats.number_of_queues);
    println!("{:<20} {}", "size:", stats.size);
    println!("{:<20} {}", "inProcess:", stats.in_process);
    for (status, count) in &stats.status_counts {
        println!("{:<20} {}", format!("  {}:", status), count);
    }
    Ok(())
}

async fn cmd_delete_queue(frontier: &Frontier, crawl_id: String, queue_key: String) -> anyhow::Result<()> {
    let removed = frontier
        .delete_queue(QueueWithinCrawl::new(crawl_id, queue_key))
        .await?;
    println!("{} removed {} URLs", style("\u{2713}").green(), removed);
    Ok(())
}

async fn cmd_delete_crawl(frontier: &Frontier, crawl_id: String) -> anyhow::Result<()> {
    let removed = frontier.delete_crawl(crawl_id).await?;
    println!("{} removed {} URLs", style("\u{2713}").green(), removed);
    Ok(())
}
