use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct BaseArgs {
    /// Output as JSON
    #[arg(short = 'j', long, global = true)]
    pub json: bool,

    /// Credentials file (or via FATT_CONFIG)
    #[arg(long, env = "FATT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Override the FreeAgent API URL (or via FREEAGENT_API_URL)
    #[arg(
        long,
        env = "FREEAGENT_API_URL",
        hide_env_values = true,
        global = true
    )]
    pub api_url: Option<String>,

    /// Log debug output to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Path to a .env file to load before running commands.
    #[arg(long, env = "FATT_ENV_FILE", hide_env_values = true, global = true)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct CLIArgs<T: Args> {
    #[command(flatten)]
    pub base: BaseArgs,

    #[command(flatten)]
    pub args: T,
}
