use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::EvalArgs;
use crate::eval::driver::Evaluator;
use crate::eval::models::{load_dataset, RunStatistics};
use crate::eval::report::ConsoleReporter;
use crate::openai::real::RealChatClient;

pub async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run_app(EvalArgs::parse()).await
}

pub async fn run_app(args: EvalArgs) -> Result<()> {
    let client = Arc::new(RealChatClient::new(args.endpoint_config())?);
    info!(
        "Evaluating model {} at {}",
        client.model(),
        args.endpoint_url
    );
    let evaluator = Evaluator::new(client, args.evaluator_config());

    for path in &args.files {
        println!("\nEvaluating file: {}", path.display());
        evaluate_file(&evaluator, path, !args.no_progress).await?;
    }

    Ok(())
}

/// Runs one dataset file and prints its report. Fails on an unreadable
/// or empty dataset; individual questions never fail the run.
pub async fn evaluate_file(
    evaluator: &Evaluator,
    path: &Path,
    show_progress: bool,
) -> Result<RunStatistics> {
    let dataset = load_dataset(path)?;
    info!(
        "Loaded {} questions from {}",
        dataset.questions.len(),
        path.display()
    );

    let mut reporter =
        ConsoleReporter::new(dataset.questions.len(), show_progress)?;
    let stats = evaluator
        .evaluate_with_reporter(&dataset.questions, &mut reporter)
        .await;
    reporter
        .finish(&stats)
        .with_context(|| format!("No results for {}", path.display()))?;

    Ok(stats)
}
