//! maestro — agent orchestration runtime.
//!
//! `maestro run <agent> <intent…>` classifies the intent, plans, executes,
//! audits, and remembers. `maestro init-memory` seeds an agent's memory
//! directory ahead of its first run.

use clap::{Parser, Subcommand};
use std::sync::Arc;

use maestro_core::RuntimeConfig;
use maestro_runtime::Agent;

#[derive(Parser)]
#[command(name = "maestro", version, about = "Agent orchestration runtime")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an intent through an agent.
    Run {
        /// Agent name (lowercased; owns its own skills and memory).
        agent: String,
        /// The intent, as free text.
        #[arg(required = true, trailing_var_arg = true)]
        intent: Vec<String>,
    },
    /// Initialize (or re-initialize) an agent's memory directory.
    InitMemory {
        /// Agent name.
        #[arg(long)]
        agent: String,
        /// Reinitialize even if memory already exists.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(RuntimeConfig::load()?);
    let llm = maestro_llm::client_for(&config)?;

    match cli.command {
        Command::Run { agent, intent } => {
            let intent = intent.join(" ");

            let mut agent = Agent::new(&agent, "", config, llm)?;
            agent.initialize()?;
            let agent = Arc::new(agent);

            let outcome = agent.run(&intent).await?;

            if let Some(response) = &outcome.final_response {
                println!("{}", response);
            } else {
                if let Some(objective) = &outcome.objective {
                    println!("Objective: {}", objective);
                }
                for (i, step) in outcome.plan.iter().enumerate() {
                    println!("  {}. [{:?}] {}", i + 1, step.role, step.instruction);
                    if let Some(output) = outcome.tool_outputs.get(&format!("step_{}", i)) {
                        println!("     -> {}", output);
                    }
                }
            }
        }
        Command::InitMemory { agent, force } => {
            let name = agent.to_lowercase();
            let memory_dir = config.memory_dir(&name);
            if memory_dir.exists() && !force {
                anyhow::bail!(
                    "memory already initialized for agent '{}' at {} (use --force to reinitialize)",
                    name,
                    memory_dir.display()
                );
            }
            if memory_dir.exists() {
                std::fs::remove_dir_all(&memory_dir)?;
            }

            let memory = maestro_memory::MemoryManager::new(&name, &config, llm)?;
            memory.update_now(
                "Initialized and ready",
                Some(&["Awaiting first user input".to_string()]),
            )?;

            println!("Initialized memory for '{}' at {}", name, memory_dir.display());
        }
    }

    Ok(())
}
