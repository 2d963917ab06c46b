// Promptchain - iterative LLM prompt chain
// Main entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use promptchain::chain::PromptChain;
use promptchain::cli::{InteractiveWorkflow, TerminalPrompter, WorkflowOutcome};
use promptchain::config::{config_path, load_config, Config};
use promptchain::providers::create_provider_from_entry;
use promptchain::server::ChainServer;

#[derive(Parser)]
#[command(name = "promptchain")]
#[command(version, about = "Turn an app idea into a spec, a plan and generated code")]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the chain over HTTP
    Serve {
        /// Bind address (overrides PORT and the config file)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run every stage interactively in the terminal
    Workflow,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let config = load_config()?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind_address = config
                .server
                .resolve_bind_address(bind, std::env::var("PORT").ok());
            ChainServer::new(&config, bind_address)?.serve().await?;
        }
        Commands::Workflow => run_workflow(&config).await?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("promptchain=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("promptchain=info,tower_http=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_workflow(config: &Config) -> Result<()> {
    let entry = config.provider.as_ref().with_context(|| {
        format!(
            "No provider configured.\n\n\
             Set ANTHROPIC_API_KEY or OPENAI_API_KEY, or add a [provider] \
             section to {}",
            config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "~/.promptchain/config.toml".to_string())
        )
    })?;

    let provider = create_provider_from_entry(entry)?;
    tracing::info!("Using {} provider", provider.name());

    let chain = PromptChain::new(Arc::from(provider)).with_sampling(config.sampling.clone());
    let mut workflow = InteractiveWorkflow::new(chain, TerminalPrompter::new()?);

    match workflow.run().await? {
        WorkflowOutcome::Completed(_) => tracing::info!("Workflow complete"),
        WorkflowOutcome::Cancelled(_) => tracing::info!("Workflow cancelled"),
    }
    Ok(())
}
