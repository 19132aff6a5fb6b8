//! newsgate service binary

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use newsgate::aggregator::TopicAggregator;
use newsgate::cache::NewsCache;
use newsgate::clock;
use newsgate::config::Config;
use newsgate::enrich::DetailEnricher;
use newsgate::http_client::{HttpClientConfig, ResilientHttpClient, SourceHttpClient};
use newsgate::model::NewsItem;
use newsgate::registry::default_registry;
use newsgate::server::{self, AppState};
use newsgate::sources::topics::{TopicSelectors, TopicSource};
use newsgate::store::{Keyspace, KvStore, MemoryStore, RedisStore};

/// newsgate - cached news aggregation service
#[derive(Parser, Debug)]
#[command(name = "newsgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Aggregates topic listings and RSS feeds behind a date-partitioned cache")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, default_value = "false", global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP service
    Serve {
        /// Bind address, overrides BIND_ADDR
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Harvest one source once and print the result
    Fetch {
        /// Source to fetch ("topics" or a registered feed path)
        #[arg(short, long, default_value = "topics")]
        source: String,

        /// Date key (YYYYMMDD) for the topics source; defaults to today
        #[arg(short, long)]
        date: Option<String>,

        /// Output format (json, table, summary)
        #[arg(short, long, default_value = "summary")]
        output: String,
    },

    /// List registered sources
    Resources,
}

/// Generates a new correlation ID for the session
fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Sets up structured logging with tracing
fn setup_logging(log_level: &str, json_output: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

/// Handles graceful shutdown on SIGTERM/SIGINT
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    let _ = shutdown_tx.send(());
}

/// Wires the store, client, aggregators and registry from configuration
async fn build_state(config: &Config) -> Result<Arc<AppState>> {
    let store: Arc<dyn KvStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisStore::connect(url).await?),
        None => {
            warn!("REDIS_URL not set, caching in process memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let http_client = Arc::new(ResilientHttpClient::new(HttpClientConfig {
        max_concurrent_requests: config.max_concurrent_requests,
        request_timeout: std::time::Duration::from_secs(config.request_timeout_secs),
        max_retries: config.max_retries,
        ..Default::default()
    })?);

    let topic_source = TopicSource::new(
        SourceHttpClient::new(http_client.clone(), "topics", config.topics_rate_limit_rpm),
        &config.topics_base_url,
        TopicSelectors {
            item: config.topics_item_selector.clone(),
            link: config.topics_link_selector.clone(),
            title: config.topics_title_selector.clone(),
        },
    );

    let enricher = DetailEnricher::new(
        Keyspace::new(store.clone(), "detail"),
        SourceHttpClient::new(http_client.clone(), "detail", config.detail_rate_limit_rpm),
        &config.detail_selector,
    );

    let topics = TopicAggregator::new(
        config.categories.clone(),
        topic_source,
        enricher,
        NewsCache::new(Keyspace::new(store.clone(), "daily"), config.today_ttl_secs),
    );

    let registry = default_registry(http_client, store, config);

    Ok(Arc::new(AppState { registry, topics }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli.log_level, cli.json_logs);

    // Generate session correlation ID
    let correlation_id = generate_correlation_id();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        correlation_id = %correlation_id,
        "Starting newsgate"
    );

    // Load configuration
    let config = Config::load()?;

    info!(
        bind = %config.bind_addr,
        topics = %config.topics_base_url,
        categories = config.categories.len(),
        today_ttl_secs = config.today_ttl_secs,
        redis = config.has_redis(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Serve { bind } => {
            run_server(config, bind).await?;
        }

        Commands::Fetch { source, date, output } => {
            fetch_once(config, &source, date, &output).await?;
        }

        Commands::Resources => {
            show_resources(config).await?;
        }
    }

    Ok(())
}

/// Runs the HTTP service until shutdown
async fn run_server(config: Config, bind: Option<String>) -> Result<()> {
    let addr: SocketAddr = bind.unwrap_or_else(|| config.bind_addr.clone()).parse()?;
    let state = build_state(&config).await?;

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(shutdown_signal(shutdown_tx));

    if let Err(e) = server::serve(addr, state, shutdown_rx).await {
        error!(error = %e, "Server failed");
        return Err(e);
    }

    info!("newsgate stopped");
    Ok(())
}

/// Runs a single harvest from the command line
async fn fetch_once(config: Config, source: &str, date: Option<String>, output_format: &str) -> Result<()> {
    let state = build_state(&config).await?;

    let items: Vec<NewsItem> = if source == "topics" {
        let date = date.unwrap_or_else(clock::today);
        state.topics.for_date(&date).await?
    } else {
        let handler = state
            .registry
            .find(source)
            .ok_or_else(|| newsgate::error::NewsError::UnknownSource(source.to_string()))?;
        handler.news().await?
    };

    match output_format {
        "json" => {
            let json = serde_json::to_string_pretty(&items)?;
            println!("{}", json);
        }
        "table" => {
            println!("\n{:<12} {:<50} {}", "Category", "Title", "Link");
            println!("{}", "-".repeat(110));
            for item in &items {
                println!(
                    "{:<12} {:<50} {}",
                    item.category,
                    truncate(&item.title, 48),
                    item.link
                );
            }
            println!("\nTotal: {} items", items.len());
        }
        _ => {
            // Summary
            println!("\nHarvest Summary");
            println!("===============");
            println!("Source: {}", source);
            println!("Items:  {}", items.len());

            // Count by category
            let mut by_category: std::collections::HashMap<&str, usize> =
                std::collections::HashMap::new();
            for item in &items {
                *by_category.entry(item.category.as_str()).or_insert(0) += 1;
            }

            println!("\nBy Category:");
            for (category, count) in by_category {
                println!("  - {}: {}", category, count);
            }
        }
    }

    Ok(())
}

/// Lists registered sources
async fn show_resources(config: Config) -> Result<()> {
    let state = build_state(&config).await?;

    println!("\nRegistered Sources");
    println!("==================");
    for resource in state.registry.resources() {
        println!("  /{:<14} {}", resource.path, resource.name);
    }

    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}..")
    }
}
