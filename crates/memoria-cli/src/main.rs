//! Memoria CLI entry point.
//!
//! Binary name: `memoria`
//!
//! Loads configuration, initializes tracing and the memory pipeline, then
//! dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use memoria_infra::config::{load_config, resolve_data_dir};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions need neither config nor state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "memoria", &mut std::io::stdout());
        return Ok(());
    }

    let data_dir = resolve_data_dir();
    let config = load_config(&data_dir).await;

    memoria_observe::tracing_setup::init_tracing(&config.observe, cli.log_directive())
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli, data_dir, config).await;
    memoria_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(
    cli: Cli,
    data_dir: std::path::PathBuf,
    config: memoria_types::config::MemoriaConfig,
) -> anyhow::Result<()> {
    if let Commands::Config = cli.command {
        return cli::config::show_config(&data_dir, &config, cli.json);
    }

    let state = AppState::init(data_dir, config, cli.command.needs_llm()).await?;
    tracing::debug!(data_dir = %state.data_dir.display(), "memoria ready");

    match cli.command {
        Commands::Add {
            user,
            messages,
            file,
        } => {
            cli::memory::add(&state, &user, file.as_deref(), &messages, cli.json).await?;
        }

        Commands::Search {
            user,
            query,
            limit,
            boost,
        } => {
            cli::memory::search(&state, &user, &query, limit, boost, cli.json).await?;
        }

        Commands::Ask { user, question } => {
            cli::memory::ask(&state, &user, &question, cli.json).await?;
        }

        Commands::List { user, memory_type } => {
            cli::memory::list(&state, &user, memory_type, cli.json).await?;
        }

        Commands::Recent { user, days } => {
            cli::memory::recent(&state, &user, days, cli.json).await?;
        }

        Commands::Range { user, from, to } => {
            cli::memory::range(&state, &user, from, to, cli.json).await?;
        }

        Commands::Delete { user, id } => {
            cli::memory::delete(&state, &user, id, cli.json).await?;
        }

        Commands::Patterns { user } => {
            cli::memory::patterns(&state, &user).await?;
        }

        // Handled before state init
        Commands::Config | Commands::Completions { .. } => {}
    }

    Ok(())
}
