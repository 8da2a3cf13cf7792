//! Runs one generation against the configured providers and prints the
//! boundary JSON.

mod config;
mod error;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, UNAVAILABLE_MESSAGE};
use clap::Parser;
use lamla_ai::{ConnectionManager, Generation, GenerationRequest, Orchestrator, ProviderRegistry};
use lamla_conversation::{
    ConversationPrompt, DEFAULT_SYSTEM_PROMPT, HistoryEntry, HistoryOrder, context_window,
};
use rootcause::prelude::Report;
use serde_json::{Value as JsonValue, json};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ask the configured AI providers a question.
#[derive(Debug, Parser)]
#[command(name = "lamla-gateway", version)]
struct Cli {
    /// Provider to try, in order. Repeat to set a fallback chain.
    #[arg(short, long = "provider", value_name = "NAME")]
    providers: Vec<String>,

    /// Token budget for the answer.
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Print an empty response instead of failing when no provider answers.
    #[arg(long)]
    lenient: bool,

    /// JSON array of prior turns, oldest first.
    #[arg(long, value_name = "FILE")]
    history: Option<PathBuf>,

    /// Reference document included in the prompt.
    #[arg(long, value_name = "FILE")]
    document: Option<PathBuf>,

    /// System preamble.
    #[arg(long, default_value = DEFAULT_SYSTEM_PROMPT)]
    system: String,

    /// The question.
    prompt: String,
}

fn read_input(path: &Path) -> Result<String, GatewayError> {
    std::fs::read_to_string(path).map_err(|e| GatewayError::Input {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Assembles the prompt, adding history and document context when given.
fn build_prompt(cli: &Cli, history_window: usize) -> Result<String, GatewayError> {
    if cli.history.is_none() && cli.document.is_none() {
        return Ok(cli.prompt.clone());
    }

    let mut prompt = ConversationPrompt::new(cli.system.clone());
    if let Some(path) = &cli.document {
        prompt = prompt.with_document(read_input(path)?);
    }
    if let Some(path) = &cli.history {
        let history: Vec<HistoryEntry> =
            serde_json::from_str(&read_input(path)?).map_err(|e| GatewayError::Input {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        prompt = prompt.with_window(context_window(
            &history,
            HistoryOrder::OldestFirst,
            history_window,
        ));
    }
    Ok(prompt.render(&cli.prompt))
}

async fn run(cli: Cli) -> Result<JsonValue, Report<GatewayError>> {
    let config = GatewayConfig::from_env().map_err(|e| GatewayError::Config {
        reason: e.to_string(),
    })?;
    info!(providers = ?config.provider_order, "loaded configuration");

    let mut request = GenerationRequest::new(build_prompt(&cli, config.history_window)?)
        .with_providers(cli.providers.clone());
    if let Some(max_tokens) = cli.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }

    let registry = Arc::new(ProviderRegistry::from_settings(&config.providers()));
    let orchestrator_config = config.orchestrator();
    let lenient = cli.lenient;

    let outcome = ConnectionManager::scoped(config.pool.clone(), |connections| async move {
        let orchestrator = Orchestrator::new(registry, connections, orchestrator_config);
        if lenient {
            Ok(orchestrator.generate_or_empty(&request).await)
        } else {
            orchestrator.generate(&request).await
        }
    })
    .await
    .map_err(|e| GatewayError::Connection {
        reason: e.to_string(),
    })?;

    let generation: Generation = outcome.map_err(|e| GatewayError::Generation {
        reason: e.to_string(),
    })?;
    info!(
        generation = %generation.id,
        provider = generation.provider.as_deref().unwrap_or("none"),
        attempts = generation.attempts.len(),
        "generation finished"
    );
    Ok(generation.result.to_response())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(response) => {
            println!("{response}");
            ExitCode::SUCCESS
        }
        Err(report) => {
            error!(error = %report, "request failed");
            println!("{}", json!({ "error": UNAVAILABLE_MESSAGE }));
            ExitCode::FAILURE
        }
    }
}
