//! Taskgraph CLI binary.

use anyhow::Result;
use taskgraph::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Each invocation runs one command against one project, so a current-thread
/// runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Example: RUST_LOG=taskgraph=debug,taskgraph_jsonl=trace taskgraph graph
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taskgraph=info,taskgraph_jsonl=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting taskgraph CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Taskgraph CLI completed successfully");
    Ok(())
}
