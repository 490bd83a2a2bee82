use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hybridcrawl", about = "Hybrid static/dynamic web crawl engine")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand, overriding whatever the config file
/// set for this invocation.
#[derive(Parser, Clone)]
pub struct CommonOpts {
    /// static | dynamic | auto
    #[arg(long)]
    pub force_method: Option<String>,

    #[arg(long)]
    pub timeout_ms: Option<u64>,

    #[arg(long)]
    pub max_retries: Option<u32>,

    #[arg(long)]
    pub detection_threshold: Option<f64>,

    #[arg(long)]
    pub block_resources: Option<bool>,

    #[arg(long)]
    pub auto_scroll: bool,

    #[arg(long)]
    pub screenshot: bool,

    #[arg(long)]
    pub screenshot_dir: Option<String>,

    /// Opaque identifier for the owning user, echoed back uninterpreted
    /// in every PageResult and lifecycle event (spec.md §6 `CredentialContext`).
    #[arg(long)]
    pub credential_context: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl a single URL and print its PageResult as JSON.
    CrawlOne {
        url: String,
        #[command(flatten)]
        common: CommonOpts,
    },
    /// Crawl a batch of URLs concurrently (no shared dedup across them).
    CrawlBatch {
        /// URLs to crawl, or a path to a newline-delimited file when `--file` is set.
        urls: Vec<String>,
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        concurrency: Option<usize>,
        #[command(flatten)]
        common: CommonOpts,
    },
    /// Recursively crawl from a seed URL under depth/page budgets.
    CrawlRecursive {
        seed: String,
        #[arg(long)]
        max_depth: Option<u32>,
        #[arg(long)]
        max_pages: Option<usize>,
        #[arg(long)]
        child_links_per_page: Option<usize>,
        #[arg(long)]
        delay_ms: Option<u64>,
        #[arg(long)]
        same_domain_only: Option<bool>,
        #[command(flatten)]
        common: CommonOpts,
    },
}
