use anyhow::Result;
use clap::Parser;
use log::info;

use director_cli::cli::commands::{env, login, run};
use director_cli::cli::{Cli, Commands};
use director_cli::ui::TerminalUi;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env().init();

    let cli = Cli::parse();
    info!("Starting director-cli");

    let ui = TerminalUi;

    match &cli.command {
        Commands::Environment => env::environment(&cli.global, &ui).await,
        Commands::Environments => env::environments(&cli.global, &ui),
        Commands::AliasEnv { alias } => env::alias_env(&cli.global, alias, &ui),
        Commands::LogIn => login::log_in(&cli.global, &ui).await,
        Commands::LogOut => login::log_out(&cli.global, &ui),
        Commands::Deployment { name } => env::deployment(&cli.global, name.as_deref(), &ui),
        Commands::RunCommand {
            endpoint,
            director_uuid,
            method,
            arguments,
        } => run::run_command(&cli.global, endpoint, director_uuid, method, arguments, &ui).await,
    }
}
