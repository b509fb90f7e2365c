mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use logbeat::config::Config;
use logbeat::{host, observability};

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let (config, origin) = Config::resolve(args.config, args.journal)?;

            observability::init(&config.telemetry)?;
            origin.log();

            host::run(config).await?;
        }
        Commands::Config(args) => {
            let (config, _) = Config::resolve(args.config, None)?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
