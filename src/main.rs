//! Demo runner: one pipeline run from the command line.
//!
//! ```bash
//! # Neutral baseline over the baseball dataset
//! paradox-newsroom --dataset baseball --strategies single,single,single
//!
//! # Cherry-picking injected into stage 1, chart bias level 2, judged
//! OPENAI_API_KEY=sk-... paradox-newsroom \
//!     --dataset kidney --strategies vote,sequential,single \
//!     --bias-kind cherry --bias-level level2 --bias-stages 1,2 --seed 7 --judge
//! ```

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use paradox_newsroom::{
    judge_report, BiasAssignment, BiasConfig, BiasKind, BiasLevel, CompletionConfig, Dataset,
    HttpCompletionClient, PipelineEvent, RunConfig, Strategy, WorkflowOrchestrator,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dataset to report on
    #[arg(long, value_enum, default_value_t = Dataset::Baseball)]
    dataset: Dataset,

    /// Strategy per stage (title,article,visualization)
    #[arg(long, value_enum, value_delimiter = ',',
          default_values_t = [Strategy::Vote, Strategy::Sequential, Strategy::Single])]
    strategies: Vec<Strategy>,

    /// Bias directive for the text stages
    #[arg(long, value_enum, default_value_t = BiasKind::None)]
    bias_kind: BiasKind,

    /// Graduated bias level for the chart stage
    #[arg(long, value_enum, default_value_t = BiasLevel::None)]
    bias_level: BiasLevel,

    /// Stages (0..=2) the bias applies to
    #[arg(long, value_delimiter = ',')]
    bias_stages: Vec<usize>,

    /// Seed for selecting which agent receives the bias injection
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Override the completion endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Override the model identifier
    #[arg(long)]
    model: Option<String>,

    /// Run the judging pass over the finished report
    #[arg(long, default_value_t = false)]
    judge: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    if config.completion.api_key.is_empty() {
        bail!("no API key configured; set OPENAI_API_KEY");
    }

    info!(
        dataset = %config.dataset,
        strategies = ?args.strategies,
        bias = ?args.bias_kind,
        "Starting pipeline run"
    );

    let client =
        Arc::new(HttpCompletionClient::new(&config.completion).context("building HTTP client")?);
    let orchestrator = WorkflowOrchestrator::new(client.clone());

    // Mirror progress and agent lifecycle events onto the log.
    let mut events = orchestrator.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                PipelineEvent::Progress { message, .. } => info!("{message}"),
                PipelineEvent::AgentCompleted {
                    node_id,
                    agent_name,
                    output_chars,
                    ..
                } => info!(node = %node_id, chars = output_chars, "{agent_name} finished"),
                _ => {}
            }
        }
    });

    let report = orchestrator.run(&config).await?;
    printer.abort();

    println!("\n================ FINAL REPORT ================\n");
    println!("TITLE:\n{}\n", report.title.as_deref().unwrap_or("(empty)"));
    println!(
        "ARTICLE:\n{}\n",
        report.article.as_deref().unwrap_or("(empty)")
    );
    println!(
        "CHART SPEC:\n{}\n",
        report.visualization.as_deref().unwrap_or("(empty)")
    );

    if args.judge {
        let scores = judge_report(client.as_ref(), config.completion.temperature, &report)
            .await
            .context("judging pass")?;
        println!("================ SCORES ================\n");
        println!("Overall: {}", scores.overall_score);
        println!("Writing: {} ({})", scores.writing_score, scores.writing_reasons.join("; "));
        println!("Chart:   {} ({})", scores.coding_score, scores.coding_reasons.join("; "));
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<RunConfig> {
    let strategies: [Strategy; 3] = args
        .strategies
        .clone()
        .try_into()
        .map_err(|_| anyhow::anyhow!("exactly three strategies are required"))?;

    let mut stage_enabled = [false; 3];
    for stage in &args.bias_stages {
        if *stage > 2 {
            bail!("bias stage out of range: {stage}");
        }
        stage_enabled[*stage] = true;
    }

    let bias = BiasConfig {
        kind: args.bias_kind,
        level: args.bias_level,
        stage_enabled,
        assignment: BiasAssignment::seeded(args.seed, &strategies, stage_enabled),
    };

    let mut completion = CompletionConfig::default();
    if let Some(endpoint) = &args.endpoint {
        completion.endpoint = endpoint.clone();
    }
    if let Some(model) = &args.model {
        completion.model = model.clone();
    }

    Ok(RunConfig {
        dataset: args.dataset,
        strategies,
        bias,
        completion,
    })
}
