use interview_intel::adapters::SourceAdapter;
use interview_intel::adapters::{GeeksForGeeksAdapter, GlassdoorAdapter, LeetCodeAdapter, RedditAdapter};
use interview_intel::crawl::CrawlEngine;
use interview_intel::insights::InsightsResult;
use interview_intel::{load_config, MemoryStore, Orchestrator};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Demo harness: wires the in-memory store, the default adapter set, and a
/// handful of target companies from config, then prints a short summary per
/// company. Not a production entry point — a real deployment swaps
/// `MemoryStore` for a durable `PersistenceGateway` implementation.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config();
    let demo_companies: Vec<String> = config.resolve_target_companies().into_iter().take(2).collect();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.resolve_timeout_secs()))
        .build()?;

    let engine = Arc::new(CrawlEngine::new(
        client,
        config.resolve_respect_robots_txt(),
        config.resolve_user_agent(),
        config.resolve_max_retries(),
        config.resolve_max_consecutive_failures(),
    ));

    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(GeeksForGeeksAdapter::new()),
        Arc::new(LeetCodeAdapter::new()),
        Arc::new(GlassdoorAdapter::new()),
        Arc::new(RedditAdapter::new()),
    ];

    let store = Arc::new(MemoryStore::new());
    let orchestrator = Arc::new(Orchestrator::new(store, engine, adapters, config));

    tracing::info!(companies = ?demo_companies, "running demo analysis");
    let results = orchestrator.run_batch_analysis(demo_companies, 10).await;

    for (company, result) in results {
        match result {
            Ok(InsightsResult::Ready(report)) => {
                println!(
                    "{company}: sample_size={} top_5={:?} statistical_confidence={:.2}",
                    report.sample_size, report.top_5, report.statistical_confidence
                );
            }
            Ok(InsightsResult::InsufficientData { have, need }) => {
                println!("{company}: insufficient data ({have}/{need} experiences collected)");
            }
            Err(e) => {
                println!("{company}: analysis failed: {e}");
            }
        }
    }

    Ok(())
}
