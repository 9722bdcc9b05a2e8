use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::EnvFilter;

use schemagraph::config::{load_config, save_config, Config, CONFIG_FILENAME};
use schemagraph::errors::Result;
use schemagraph::graph::{GraphDriver, HttpGraphDriver};
use schemagraph::mcp::{default_registry, McpServer};

/// MCP server exposing a graph-stored relational schema to AI agents.
#[derive(Parser)]
#[command(name = "schemagraph", version, about = "Graph-stored schema exploration over MCP")]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON-RPC requests over stdio
    Serve,
    /// Print the registered tool definitions
    Tools,
    /// Print server identity and capabilities
    Info,
    /// Probe the graph store and report server health
    Health,
    /// Write a default configuration file
    InitConfig {
        /// Destination path (default: ./schemagraph.json)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            tracing::error!(error = %e, "fatal");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Executes the selected command. Returns `Ok(false)` when the command ran
/// but reports an unhealthy outcome.
async fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Serve => {
            let (_, server) = build_server(cli.config)?;
            tracing::info!("starting MCP server on stdio");
            Arc::new(server).run().await?;
        }
        Commands::Tools => {
            let (_, server) = build_server(cli.config)?;
            let tools = json!({ "tools": server.registry().list() });
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        Commands::Info => {
            let (_, server) = build_server(cli.config)?;
            println!("{}", serde_json::to_string_pretty(&server.server_info())?);
        }
        Commands::Health => {
            let (driver, server) = build_server(cli.config)?;
            let probe = driver.verify_connectivity();
            let info = server.server_info();
            let report = json!({
                "status": if probe.is_ok() { "healthy" } else { "unhealthy" },
                "server": info["name"],
                "version": info["version"],
                "tools_registered": server.registry().len(),
                "error": probe.as_ref().err().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(probe.is_ok());
        }
        Commands::InitConfig { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));
            save_config(&path, &Config::default())?;
            println!("Wrote default configuration to {}", path.display());
        }
    }
    Ok(true)
}

/// Loads configuration and builds the driver and server shared by all
/// store-backed commands.
fn build_server(config_path: Option<PathBuf>) -> Result<(Arc<dyn GraphDriver>, McpServer)> {
    let config = load_config(config_path.as_deref())?;
    tracing::info!(config = ?config.redacted(), "loaded configuration");

    let driver: Arc<dyn GraphDriver> = Arc::new(HttpGraphDriver::new(&config)?);
    let server = McpServer::new(default_registry(Arc::clone(&driver), &config));
    tracing::info!(tools = server.registry().len(), "MCP server initialized");
    Ok((driver, server))
}
