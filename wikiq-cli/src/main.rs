//! wikiq CLI - Wikipedia question answering and agent evals.

mod cli;
mod progress;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Args, Command};
use progress::EvalProgressBar;
use std::path::Path;
use std::sync::Arc;
use wikiq_core::{
    AgentError, AgentProfile, AnthropicProvider, ConfigLoader, LlmError, ModelClient, ToolAgent,
    ToolRegistry,
};
use wikiq_eval::{EvalError, EvalRunner};
use wikiq_wikipedia::WikipediaSearch;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(e) = args.validate() {
        bail!("{}", e);
    }

    // Tool calls and retries log at info, so --verbose shows them
    let default_filter = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let llm = Arc::new(build_client(&args)?);
    let registry = Arc::new(build_registry());
    let loader = ConfigLoader::new(&args.root);

    match &args.command {
        Command::Ask { query, config } => ask(&loader, llm, registry, query, config).await,
        Command::Evals {
            base,
            test,
            run_id,
            concurrency,
        } => {
            let runner = EvalRunner::new(loader, llm, registry).with_concurrency(*concurrency);
            evals(&runner, base, test.as_deref(), run_id.as_deref(), args.verbose).await
        }
    }
}

fn build_client(args: &Args) -> Result<ModelClient> {
    let config = args.llm_config();
    let api_key = args.api_key.clone().unwrap_or_default();
    let mut provider = AnthropicProvider::new(api_key, &config)
        .context("Set --api-key or ANTHROPIC_API_KEY")?;
    if let Some(base_url) = &args.base_url {
        provider = provider.with_base_url(base_url);
    }
    Ok(ModelClient::new(Arc::new(provider), config))
}

fn build_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(WikipediaSearch::new());
    registry
}

async fn ask(
    loader: &ConfigLoader,
    llm: Arc<ModelClient>,
    registry: Arc<ToolRegistry>,
    query: &str,
    config_name: &str,
) -> Result<()> {
    let profile = AgentProfile::load(loader, config_name, &registry)
        .with_context(|| format!("Failed to load agent '{}'", config_name))?;
    let agent = ToolAgent::new(profile, registry);

    let result = agent
        .run(query, &llm)
        .await
        .map_err(|e| format_agent_error(e, loader.root()))?;

    log::info!(
        "Finished in {} turns with {} tool calls",
        result.turn_count,
        result.tool_calls_made.len()
    );
    println!("{}", result.final_text);
    Ok(())
}

async fn evals(
    runner: &EvalRunner,
    base: &str,
    test: Option<&str>,
    run_id: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let outcome = if verbose {
        // Log lines and a redrawing bar interleave badly
        runner.run(base, test, run_id).await
    } else {
        let progress = EvalProgressBar::new()?;
        let outcome = runner
            .run_with_progress(base, test, run_id, |event| progress.handle(event))
            .await;
        if outcome.is_err() {
            progress.abandon();
        }
        outcome
    };

    let run_dir = outcome.map_err(|e| format_eval_error(e, runner.loader().root()))?;
    println!("Eval run complete: {}", run_dir.display());
    Ok(())
}

fn llm_hint(e: &LlmError) -> Option<String> {
    match e {
        LlmError::MissingApiKey(var) => Some(format!("Set --api-key or {}", var)),
        LlmError::Http { status: 401, .. } => Some("Check your API key".to_string()),
        LlmError::Timeout(_) => Some("Try increasing --llm-timeout".to_string()),
        _ => None,
    }
}

/// Format an AgentError with a hint where one helps.
fn format_agent_error(e: AgentError, root: &Path) -> anyhow::Error {
    let hint = match &e {
        AgentError::Llm(llm) => llm_hint(llm),
        AgentError::Config(_) => Some(format!(
            "Check configs/ and prompts/ under {}",
            root.display()
        )),
        _ => None,
    };
    if let Some(hint) = hint {
        eprintln!("hint: {}", hint);
    }
    anyhow::anyhow!("Agent run failed: {}", e)
}

/// Format an EvalError with a hint where one helps.
fn format_eval_error(e: EvalError, root: &Path) -> anyhow::Error {
    let hint = match &e {
        EvalError::Llm(llm) | EvalError::Agent(AgentError::Llm(llm)) => llm_hint(llm),
        EvalError::UnknownRater { .. } => {
            Some("Supported raters are 'trajectory' and 'onesided'".to_string())
        }
        EvalError::MissingDimensions(_) | EvalError::MissingPrompt(_) | EvalError::Config(_) => {
            Some(format!(
                "Check configs/evals.yaml and prompts/evals.yaml under {}",
                root.display()
            ))
        }
        _ => None,
    };
    if let Some(hint) = hint {
        eprintln!("hint: {}", hint);
    }
    anyhow::anyhow!("Eval run failed: {}", e)
}
