//! rolekeep CLI entry point.
//!
//! Binary name: `rolekeep`
//!
//! Parses CLI arguments, initializes tracing, the backend and the role store,
//! then dispatches to the appropriate command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    rolekeep_observe::tracing_setup::init_tracing(cli.log_filter(), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;

    rolekeep_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        // Shell completions don't need app state
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(shell, &mut cmd, "rolekeep", &mut std::io::stdout());
        }

        Commands::Role { action } => {
            let state = AppState::init().await?;
            tracing::debug!(data_dir = %state.data_dir.display(), "state initialized");
            cli::role::handle_role_command(action, &state, cli.json).await?;
        }
    }

    Ok(())
}
