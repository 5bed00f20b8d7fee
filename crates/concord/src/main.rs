use anyhow::{Context, Result};
use clap::Parser;
use concord::agents::AgentSelection;
use concord_models::ConcordConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "concord", about = "Multi-agent research consensus engine")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/concord.toml")]
    config: String,

    /// Subject to analyze (ticker, entity or topic id)
    #[arg(short, long)]
    subject: String,

    /// Comma-separated agent names; defaults to every enabled agent
    #[arg(short, long, value_delimiter = ',')]
    agents: Vec<String>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load config
    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: ConcordConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse config")?;

    let orchestrator =
        concord::build_orchestrator(&config).context("Failed to build orchestrator")?;
    let cache = concord::open_cache(&config)?;

    let selection = if cli.agents.is_empty() {
        AgentSelection::Enabled
    } else {
        AgentSelection::Named(cli.agents.clone())
    };

    let report = concord::analyze(&orchestrator, &cache, &cli.subject, &selection)
        .await
        .with_context(|| format!("Analysis failed for {}", cli.subject))?;

    // Output report as JSON to stdout
    let output = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{output}");

    Ok(())
}
