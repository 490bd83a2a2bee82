mod cli;
mod config;
mod sink;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use hybridcrawl_core::{cancel_pair, CancelHandle, ForceMethod, Options};
use hybridcrawl_engine::Engine;
use tracing::warn;

use crate::cli::{Cli, CommonOpts, Commands};
use crate::config::AppConfig;
use crate::sink::NdjsonSink;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        String::new()
    });
    let mut app_config: AppConfig = if config_str.trim().is_empty() {
        AppConfig::default()
    } else {
        toml::from_str(&config_str)?
    };
    config::apply_env_overrides(&mut app_config);

    let (handle, cancel) = cancel_pair();
    spawn_ctrl_c_watcher(handle);

    match cli.command {
        Commands::CrawlOne { url, common } => {
            let opts = build_options(&app_config, &common, None);
            let engine = Engine::new(&opts)?;
            let sink: Arc<dyn hybridcrawl_core::EventSink> = Arc::new(NdjsonSink);
            let result = engine.crawl_one(&url, &opts, sink, cancel).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::CrawlBatch {
            urls,
            file,
            concurrency,
            common,
        } => {
            let urls = resolve_urls(urls, file)?;
            let opts = build_options(&app_config, &common, concurrency);
            let engine = Engine::new(&opts)?;
            let sink: Arc<dyn hybridcrawl_core::EventSink> = Arc::new(NdjsonSink);
            let results = engine.crawl_batch(&urls, &opts, sink, cancel).await;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::CrawlRecursive {
            seed,
            max_depth,
            max_pages,
            child_links_per_page,
            delay_ms,
            same_domain_only,
            common,
        } => {
            let mut opts = build_options(&app_config, &common, None);
            if let Some(v) = max_depth {
                opts.limits.max_depth = v;
            }
            if let Some(v) = max_pages {
                opts.limits.max_pages = v;
            }
            if let Some(v) = child_links_per_page {
                opts.limits.child_links_per_page = v;
            }
            if let Some(v) = delay_ms {
                opts.limits.delay_ms = v;
            }
            if let Some(v) = same_domain_only {
                opts.limits.same_domain_only = v;
            }
            let opts = opts.clamped();

            let engine = Engine::new(&opts)?;
            let sink: Arc<dyn hybridcrawl_core::EventSink> = Arc::new(NdjsonSink);
            let session = engine.crawl_recursive(&seed, &opts, sink, cancel).await;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
    }

    Ok(())
}

fn build_options(config: &AppConfig, common: &CommonOpts, concurrency: Option<usize>) -> Options {
    let mut opts = config.crawl.to_options();

    if let Some(method) = &common.force_method {
        opts.force_method = match method.to_lowercase().as_str() {
            "static" => ForceMethod::Static,
            "dynamic" => ForceMethod::Dynamic,
            _ => ForceMethod::Auto,
        };
    }
    if let Some(v) = common.timeout_ms {
        opts.timeout_ms = v;
    }
    if let Some(v) = common.max_retries {
        opts.max_retries = v;
    }
    if let Some(v) = common.detection_threshold {
        opts.detection_threshold = v;
    }
    if let Some(v) = common.block_resources {
        opts.block_resources = v;
    }
    if common.auto_scroll {
        opts.auto_scroll = true;
    }
    if common.screenshot {
        opts.screenshot = true;
    }
    if let Some(dir) = &common.screenshot_dir {
        opts.screenshot_dir = Some(dir.clone());
    }
    if let Some(v) = &common.credential_context {
        opts.credential_context = Some(v.clone());
    }
    if let Some(v) = concurrency {
        opts.concurrency = v;
    }

    opts.clamped()
}

fn resolve_urls(urls: Vec<String>, file: Option<String>) -> Result<Vec<String>> {
    if let Some(path) = file {
        let contents = std::fs::read_to_string(path)?;
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    } else {
        Ok(urls)
    }
}

/// Cancel the crawl on Ctrl-C. Spec.md §5: cancellation must be observed
/// within bounded time at each suspension point; the handle fires the
/// `watch` channel every `CancelToken::is_cancelled()` check already polls.
fn spawn_ctrl_c_watcher(handle: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
}
