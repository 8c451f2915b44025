use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    sitesnap::logging::init().context("init logging")?;

    let cli = sitesnap::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        sitesnap::cli::Command::Grab(args) => {
            sitesnap::grab::run(args).await.context("grab")?;
        }
        sitesnap::cli::Command::Prerender(args) => {
            sitesnap::prerender::run(args).await.context("prerender")?;
        }
    }

    Ok(())
}
