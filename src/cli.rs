use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "logbeat")]
#[command(about = "Heartbeat logging service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the heartbeat worker until stopped
    Run(RunArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Configuration file (defaults to $LOGBEAT_CONFIG or config/logbeat.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the journal file location
    #[arg(long)]
    pub journal: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Configuration file (defaults to $LOGBEAT_CONFIG or config/logbeat.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
