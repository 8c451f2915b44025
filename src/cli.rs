use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Grab(GrabArgs),
    Prerender(PrerenderArgs),
}

#[derive(Debug, Args)]
pub struct GrabArgs {
    /// Output directory for the static snapshot.
    #[arg(long, default_value = "dist")]
    pub out: String,

    /// Number of concurrent browser workers.
    #[arg(long, default_value_t = 2)]
    pub workers: usize,
}

#[derive(Debug, Args)]
pub struct PrerenderArgs {
    /// Output directory for prerendered character pages.
    #[arg(long, default_value = "prerendered")]
    pub out: String,
}
