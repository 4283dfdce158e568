use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use toolbus_agent::agent::Agent;
use toolbus_agent::cache::CacheManager;
use toolbus_agent::config::{AgentFileConfig, ServerRegistry};
use toolbus_agent::conn::{ConnectionManager, ToolExecutor, ToolInvocation};
use toolbus_agent::llm::{Llm, OllamaClient};

#[derive(Parser)]
#[command(name = "agent")]
#[command(about = "Tool-using LLM agent with cached tool-server connections")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Ollama server URL (overrides .agent.toml)
    #[arg(long, env = "OLLAMA_URL")]
    ollama_url: Option<String>,

    /// Model to use (overrides .agent.toml)
    #[arg(long, env = "OLLAMA_MODEL")]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the LLM directly, no tools
    Chat {
        /// Message to send
        message: String,
    },
    /// Run the tool-using agent (LLM decides when to call tools)
    Agent {
        /// Message to send
        message: String,
        /// System prompt for the agent
        #[arg(long, short)]
        system: Option<String>,
    },
    /// Refresh and list tools from configured tool servers
    Tools {
        /// Only list tools from a specific server
        #[arg(long)]
        server: Option<String>,
    },
    /// Call a tool directly
    Call {
        /// Tool name
        tool: String,
        /// Arguments as JSON
        #[arg(long, short)]
        args: Option<String>,
        /// Bypass the result cache
        #[arg(long)]
        no_cache: bool,
    },
    /// List configured servers and their connection status
    Servers,
    /// Probe every enabled server and report availability
    Discover,
    /// Time a connect attempt against every enabled server
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AgentFileConfig::load()?;

    let registry = match ServerRegistry::load()? {
        Some(registry) => registry,
        None => {
            tracing::warn!("No .toolservers.json found; no tool servers configured");
            ServerRegistry::default()
        }
    };

    let conn = Arc::new(ConnectionManager::new(registry, config.connection.clone()));
    let cache = Arc::new(CacheManager::new(config.cache.clone(), conn.clone()));

    let ollama_url = cli.ollama_url.unwrap_or_else(|| config.llm.url.clone());
    let model = cli.model.unwrap_or_else(|| config.llm.model.clone());

    match cli.command {
        Commands::Chat { message } => {
            let llm = OllamaClient::new(&ollama_url, &model);
            let response = llm.chat(&message).await?;
            println!("{}", response);
        }

        Commands::Agent { message, system } => {
            conn.refresh_tools().await?;
            let cleanup = cache.spawn_cleanup();

            let llm = OllamaClient::new(&ollama_url, &model);
            let mut agent = Agent::new(Box::new(llm), conn.clone(), cache.clone());
            if let Some(ref system) = system {
                agent = agent.with_system_prompt(system);
            }

            let response = agent.chat(&message).await?;
            println!("{}", response);

            let stats = cache.global_stats().await;
            tracing::info!(
                "Cache: {} hits, {} misses ({:.0}% hit rate)",
                stats.hits,
                stats.misses,
                stats.hit_rate * 100.0
            );

            cleanup.abort();
            cache.shutdown().await;
        }

        Commands::Tools { server } => {
            conn.refresh_tools().await?;

            let tools = match server {
                Some(ref name) => conn.tools_from(name).await,
                None => conn.available_tools().await,
            };

            if tools.is_empty() {
                println!("No tools available");
            }
            for tool in tools {
                println!(
                    "{}/{}: {}",
                    tool.server,
                    tool.name,
                    tool.description.as_deref().unwrap_or("(no description)")
                );
            }
        }

        Commands::Call {
            tool,
            args,
            no_cache,
        } => {
            conn.refresh_tools().await?;

            let arguments = match args {
                Some(ref json) => Some(serde_json::from_str(json)?),
                None => None,
            };

            let result = if no_cache {
                conn.execute_tool(&tool, arguments).await?
            } else {
                cache
                    .execute_with_cache(ToolInvocation::new(&tool, arguments))
                    .await?
            };

            if result.success {
                println!("{}", result.text());
            } else {
                anyhow::bail!(
                    "Tool failed: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        Commands::Servers => {
            for name in conn.server_names() {
                let info = conn.server_info(&name).await?;
                println!(
                    "{} ({} {}:{}) - {}",
                    info.name, info.transport, info.address, info.port, info.status
                );
            }
        }

        Commands::Discover => {
            for info in conn.discover_servers().await {
                println!("{} ({}:{}) - {}", info.name, info.address, info.port, info.status);
            }
        }

        Commands::Health => {
            for (name, health) in conn.health_check().await {
                match health.error {
                    Some(ref error) => {
                        println!("{}: {} ({})", name, health.status, error)
                    }
                    None => println!(
                        "{}: {} ({}ms, {} tools)",
                        name, health.status, health.response_time_ms, health.tool_count
                    ),
                }
            }
        }
    }

    Ok(())
}
