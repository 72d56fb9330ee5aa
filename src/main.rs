use std::ffi::OsString;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod args;
mod auth;
mod config;
mod env;
mod http;
mod logging;
mod login;
mod tasks;
#[cfg(test)]
mod testing;
mod timeslips;
mod ui;
mod utils;

use crate::args::{BaseArgs, CLIArgs};
use crate::config::Credentials;
use crate::ui::{print_command_status, CommandStatus};

const DEFAULT_DEV_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-dev");
const CLI_VERSION: &str = match option_env!("FATT_VERSION_STRING") {
    Some(version) => version,
    None => DEFAULT_DEV_VERSION,
};

#[derive(Debug, Parser)]
#[command(
    name = "fatt",
    about = "FreeAgent time tracking from the command line",
    version = CLI_VERSION
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Store app credentials and log in to FreeAgent in the browser
    Login(CLIArgs<login::LoginArgs>),
    /// Display the stored access token and its TTL
    Token(CLIArgs<login::TokenArgs>),
    /// Forget the stored access token
    Logout(CLIArgs<login::LogoutArgs>),
    /// List active tasks with their project and rate
    GetTaskList(CLIArgs<tasks::TaskListArgs>),
    /// List the timeslips of a task
    GetTimeslipList(CLIArgs<timeslips::TimeslipListArgs>),
    /// List timeslips whose timer is running
    GetRunningTimers(CLIArgs<timeslips::RunningTimersArgs>),
    /// Create a timeslip for today and start its timer
    CreateTimeslip(CLIArgs<timeslips::CreateTimeslipArgs>),
    /// Start the timer of a timeslip
    StartTimer(CLIArgs<timeslips::TimerArgs>),
    /// Stop the timer of a timeslip
    StopTimer(CLIArgs<timeslips::TimerArgs>),
    /// Total billed amount of today's timeslips
    GetDailyTotal(CLIArgs<timeslips::DailyTotalArgs>),
}

impl Commands {
    fn base(&self) -> &BaseArgs {
        match self {
            Commands::Login(cmd) => &cmd.base,
            Commands::Token(cmd) => &cmd.base,
            Commands::Logout(cmd) => &cmd.base,
            Commands::GetTaskList(cmd) => &cmd.base,
            Commands::GetTimeslipList(cmd) => &cmd.base,
            Commands::GetRunningTimers(cmd) => &cmd.base,
            Commands::CreateTimeslip(cmd) => &cmd.base,
            Commands::StartTimer(cmd) => &cmd.base,
            Commands::StopTimer(cmd) => &cmd.base,
            Commands::GetDailyTotal(cmd) => &cmd.base,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let argv: Vec<OsString> = std::env::args_os().collect();
    if let Err(err) = env::bootstrap_from_args(&argv) {
        print_command_status(CommandStatus::Error, &format!("{err:#}"));
        return ExitCode::FAILURE;
    }
    let cli = Cli::parse_from(argv);
    logging::init(cli.command.base().verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if !already_reported(&err) {
                print_command_status(CommandStatus::Error, &format!("{err:#}"));
            }
            ExitCode::FAILURE
        }
    }
}

fn already_reported(err: &anyhow::Error) -> bool {
    err.downcast_ref::<login::LoginIncomplete>().is_some()
}

/// Credentials are written back whether or not the command succeeded, so a
/// token refreshed along the way is never lost.
async fn run(command: Commands) -> Result<()> {
    let base = command.base().clone();
    let path = config::resolve_path(base.config.as_deref())?;
    // Only the default location imports the older client's file.
    let legacy = base.config.is_none().then(config::legacy_path).flatten();
    let mut credentials = config::load_or_import(&path, legacy.as_deref())?;

    let outcome = dispatch(&base, command, &mut credentials).await;
    let saved = config::save(&path, &credentials);

    outcome?;
    saved
}

async fn dispatch(base: &BaseArgs, command: Commands, credentials: &mut Credentials) -> Result<()> {
    match command {
        Commands::Login(cmd) => login::run_login(base, cmd.args, credentials).await,
        Commands::Token(cmd) => login::run_token(base, cmd.args, credentials),
        Commands::Logout(cmd) => login::run_logout(cmd.args, credentials),
        Commands::GetTaskList(cmd) => tasks::run_list(base, cmd.args, credentials).await,
        Commands::GetTimeslipList(cmd) => timeslips::run_list(base, cmd.args, credentials).await,
        Commands::GetRunningTimers(cmd) => {
            timeslips::run_running(base, cmd.args, credentials).await
        }
        Commands::CreateTimeslip(cmd) => timeslips::run_create(base, cmd.args, credentials).await,
        Commands::StartTimer(cmd) => timeslips::run_start(base, cmd.args, credentials).await,
        Commands::StopTimer(cmd) => timeslips::run_stop(base, cmd.args, credentials).await,
        Commands::GetDailyTotal(cmd) => {
            timeslips::run_daily_total(base, cmd.args, credentials).await
        }
    }
}
