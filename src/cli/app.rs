use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "director-cli")]
#[command(about = "A CLI for driving a remote deployment Director")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Default)]
pub struct GlobalArgs {
    /// Director environment URL or alias
    #[arg(short = 'e', long = "environment", global = true)]
    pub environment: Option<String>,

    /// CA certificate for the environment (PEM text or a file path)
    #[arg(long = "ca-cert", global = true)]
    pub ca_cert: Option<String>,

    /// OAuth client id for service-account access
    #[arg(long, global = true)]
    pub client: Option<String>,

    /// OAuth client secret for service-account access
    #[arg(long, global = true)]
    pub client_secret: Option<String>,

    /// Accept any server certificate
    #[arg(long, global = true)]
    pub skip_ssl_validation: bool,

    /// Config file path (defaults to the per-user config location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current environment's Director info
    Environment,

    /// List known environments
    Environments,

    /// Remember an environment under an alias and make it current
    AliasEnv {
        /// Alias to attach to the environment given with -e
        alias: String,
    },

    /// Log in to the current environment
    LogIn,

    /// Forget saved credentials for the current environment
    LogOut,

    /// Show or set the remembered deployment for the current environment
    Deployment {
        /// Deployment name or manifest path; omit to show the current one
        name: Option<String>,
    },

    /// Invoke a method on a provisioning endpoint and wait for its task
    RunCommand {
        /// Command endpoint URL
        #[arg(long)]
        endpoint: String,

        /// Director UUID forwarded in the command context
        #[arg(long)]
        director_uuid: String,

        /// Method name to invoke
        method: String,

        /// Method arguments, each a JSON value (bare words are strings)
        arguments: Vec<String>,
    },
}
