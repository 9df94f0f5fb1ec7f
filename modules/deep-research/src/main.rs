use std::path::{Path, PathBuf};
use std::sync::Arc;

use ai_client::{Claude, OpenAi};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::Parser;
use dialoguer::Input;
use firecrawl_client::FirecrawlClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use deep_research::output::ReportWriter;
use deep_research::steps::{ContextBudget, FeedbackSource, SkipFeedback};
use deep_research::{
    DeepResearch, Orchestrator, ResearchOptions, ResearchRequest, Retriever, RetryPolicy,
    SearchOptions, StructuredGenerator,
};
use deep_research_common::{AiProvider, Config, WriteError};

#[derive(Parser, Debug)]
#[command(name = "deep-research", about = "Recursive web research into a markdown report")]
struct Cli {
    /// What to research. Prompted for when omitted.
    query: Option<String>,

    /// Sub-queries per level (halved at each deeper level).
    #[arg(long, default_value_t = 4)]
    breadth: usize,

    /// Additional recursion levels after the first.
    #[arg(long, default_value_t = 2)]
    depth: usize,

    /// Critique-and-revise iterations applied to the draft report.
    #[arg(long, default_value_t = 0)]
    refine: usize,

    /// Concurrent search + distill units (overrides FIRECRAWL_CONCURRENCY).
    #[arg(long)]
    concurrency: Option<usize>,

    /// Directory for the report (overrides RESEARCH_OUTPUT_DIR).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Skip the clarifying questions.
    #[arg(long)]
    no_feedback: bool,

    /// Log as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

/// Clarifying answers typed at the terminal.
struct InteractiveFeedback;

#[async_trait]
impl FeedbackSource for InteractiveFeedback {
    async fn answer(&self, question: &str) -> std::io::Result<String> {
        ask(question.to_string(), true).await
    }
}

async fn ask(prompt: String, allow_empty: bool) -> std::io::Result<String> {
    tokio::task::spawn_blocking(move || {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(allow_empty)
            .interact_text()
            .map_err(std::io::Error::other)
    })
    .await
    .map_err(std::io::Error::other)?
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("deep_research=info".parse()?)
        .add_directive("firecrawl_client=info".parse()?)
        .add_directive("ai_client=info".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    Ok(())
}

fn build_generator(config: &Config) -> Arc<dyn StructuredGenerator> {
    match config.provider {
        AiProvider::OpenAi => {
            let mut client = OpenAi::new(&config.ai_api_key, &config.model);
            if let Some(url) = &config.ai_base_url {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
        AiProvider::Anthropic => {
            let mut client = Claude::new(&config.ai_api_key, &config.model);
            if let Some(url) = &config.ai_base_url {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(concurrency) = cli.concurrency {
        if concurrency == 0 {
            bail!("--concurrency must be at least 1");
        }
        config.concurrency = concurrency;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    config.log_redacted();

    let query = match cli.query {
        Some(query) => query,
        None => ask("What would you like to research?".to_string(), false)
            .await
            .context("Failed to read research query")?,
    };
    let query = query.trim().to_string();
    if query.is_empty() {
        bail!("Research query is empty");
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            warn!("Interrupted, cancelling research; press Ctrl-C again to exit");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });

    let generator = build_generator(&config);
    let searcher = Arc::new(
        FirecrawlClient::new(config.firecrawl_api_key.as_deref())
            .with_base_url(&config.firecrawl_base_url),
    );
    let retriever = Retriever::new(searcher, RetryPolicy::default(), SearchOptions::default());

    let context = ContextBudget {
        total_chars: config.context_chars,
        ..ContextBudget::default()
    };
    let options = ResearchOptions::builder()
        .concurrency(config.concurrency)
        .context(context)
        .build();
    let orchestrator =
        Orchestrator::new(generator.clone(), retriever, options).with_cancellation(cancel.clone());

    let feedback: Arc<dyn FeedbackSource> = if cli.no_feedback {
        Arc::new(SkipFeedback)
    } else {
        Arc::new(InteractiveFeedback)
    };
    let pipeline = DeepResearch::new(generator, orchestrator)
        .with_feedback(feedback)
        .with_context_chars(config.context_chars)
        .with_cancellation(cancel);

    let request = ResearchRequest::builder()
        .query(query)
        .breadth(cli.breadth)
        .depth(cli.depth)
        .refine_iterations(cli.refine)
        .build();
    let run = pipeline.run(&request).await.context("Research failed")?;
    let document = run.document();

    match save(&config.output_dir, &run.file_name, &document).await {
        Ok(path) => {
            info!(
                path = %path.display(),
                learnings = run.learnings.len(),
                urls = run.visited_urls.len(),
                "Research complete"
            );
            Ok(())
        }
        Err(e) => {
            println!("{document}");
            Err(e.context("Report printed to stdout"))
        }
    }
}

async fn save(dir: &Path, base: &str, document: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    match ReportWriter::new(dir).write(base, document).await {
        Ok(path) => Ok(path),
        Err(WriteError::Collision(e)) => Err(e).context("Could not find a free file name"),
        Err(e) => Err(e).context("Failed to save report"),
    }
}
