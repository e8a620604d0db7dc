mod args;
mod commands;
mod config;
mod logging;

use args::CliArgs;
use config::CliConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse().inspect_err(|_| CliArgs::print_help())?;
    let Some(command) = args.command.filter(|_| !args.show_help) else {
        CliArgs::print_help();
        return Ok(());
    };

    let config = CliConfig::load(args.config.as_deref())?;
    logging::init(config.log_level.as_deref());
    commands::run(command, &config).await
}
