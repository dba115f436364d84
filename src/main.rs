use clap::Parser;
use shellbox::cli::Args;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shellbox=info")),
        )
        .init();

    let args = Args::parse();
    let config = args.command.into_workflow();

    info!(
        "Starting invocation: image {}, {} script(s)",
        config.image,
        config.scripts.len()
    );

    if let Err(e) = shellbox::workflow::run(&config).await {
        error!("Invocation failed: {}", e);
        std::process::exit(1);
    }

    info!("Invocation complete");
    Ok(())
}
