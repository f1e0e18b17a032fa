use anyhow::{anyhow, Context, Result};
use background_service::{BackgroundService, Orchestrator, PopupController, RunOutcome, TabRegistry};
use clap::Parser;
use content_script::{CommonMarkRenderer, ContentOptions, ContentScript, PageSource};
use helper_core::{HelperConfig, TabId};
use std::path::PathBuf;
use std::sync::Arc;
use summary_client::HttpSummaryClient;
use tracing_subscriber::EnvFilter;

/// Runs one duplicate-question analysis against a saved Reddit post page.
#[derive(Debug, Parser)]
#[command(name = "reddit-helper", version, about)]
struct Cli {
    /// Saved HTML of the post page
    #[arg(long)]
    page: PathBuf,

    /// Location the page was loaded from
    #[arg(long)]
    url: String,

    /// TOML configuration file
    #[arg(long, env = "REDDIT_HELPER_CONFIG")]
    config: Option<PathBuf>,

    /// Where to write the resulting page; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

const ACTIVE_TAB: TabId = TabId(1);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = HelperConfig::resolve(cli.config.as_deref()).context("loading configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Reddit Helper");

    let html = std::fs::read_to_string(&cli.page)
        .with_context(|| format!("reading {}", cli.page.display()))?;

    let mut options = ContentOptions::from_config(&config.content);
    if config.content.markdown {
        options = options.with_renderer(Box::new(CommonMarkRenderer::new()));
    }
    let tab = ContentScript::spawn(ACTIVE_TAB, PageSource::new(html, cli.url), options)?;

    let registry = Arc::new(TabRegistry::new());
    registry.register(tab.port());

    let backend = HttpSummaryClient::from_config(&config.backend)?;
    tracing::info!(endpoint = %backend.endpoint(), "Using summarization backend");

    let orchestrator =
        Orchestrator::new(registry, Arc::new(backend)).with_config(&config.orchestrator);
    let (service, mut reports) = BackgroundService::start(Arc::new(orchestrator));

    PopupController::new(service.handle()).run_clicked(Some(tab.tab_id()))?;
    let report = reports
        .recv()
        .await
        .ok_or_else(|| anyhow!("background context stopped before reporting"))?;

    match &report.outcome {
        RunOutcome::Injected => tracing::info!(
            invocation = %report.invocation,
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "Analysis finished"
        ),
        other => tracing::warn!(
            invocation = %report.invocation,
            state = %report.final_state,
            "Analysis did not inject a result: {:?}",
            other
        ),
    }

    service.stop().await?;
    let page = tab.unload().await?;

    match cli.output {
        Some(path) => std::fs::write(&path, page)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", page),
    }

    Ok(())
}
