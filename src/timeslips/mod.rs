use anyhow::Result;
use clap::Args;

use crate::args::BaseArgs;
use crate::config::Credentials;
use crate::login::connect;
use crate::ui::with_spinner;

pub mod api;
mod create;
mod list;
mod timer;
mod total;

#[derive(Debug, Clone, Args)]
pub struct TimeslipListArgs {
    /// Task ID (last segment of the task URL)
    pub task_id: String,
}

#[derive(Debug, Clone, Args)]
pub struct RunningTimersArgs {}

#[derive(Debug, Clone, Args)]
pub struct CreateTimeslipArgs {
    /// Task ID to book the timeslip on
    pub task_id: String,

    /// Comment for the timeslip
    pub comment: String,
}

#[derive(Debug, Clone, Args)]
pub struct TimerArgs {
    /// Timeslip ID (last segment of the timeslip URL)
    pub timeslip_id: String,
}

#[derive(Debug, Clone, Args)]
pub struct DailyTotalArgs {}

pub async fn run_list(
    base: &BaseArgs,
    args: TimeslipListArgs,
    credentials: &mut Credentials,
) -> Result<()> {
    let client = connect(base, credentials).await?;
    let timeslips = with_spinner(
        "Loading timeslips...",
        api::list_for_task(&client, &args.task_id),
    )
    .await?;
    list::print(&timeslips, base.json)
}

pub async fn run_running(
    base: &BaseArgs,
    _args: RunningTimersArgs,
    credentials: &mut Credentials,
) -> Result<()> {
    let client = connect(base, credentials).await?;
    let timeslips = with_spinner("Loading timers...", api::list_running(&client)).await?;
    list::print(&timeslips, base.json)
}

pub async fn run_create(
    base: &BaseArgs,
    args: CreateTimeslipArgs,
    credentials: &mut Credentials,
) -> Result<()> {
    let client = connect(base, credentials).await?;
    create::run(
        &client,
        credentials.timeslip_user.as_deref(),
        &args.task_id,
        &args.comment,
        base.json,
    )
    .await
}

pub async fn run_start(
    base: &BaseArgs,
    args: TimerArgs,
    credentials: &mut Credentials,
) -> Result<()> {
    let client = connect(base, credentials).await?;
    timer::start(&client, &args.timeslip_id).await
}

pub async fn run_stop(
    base: &BaseArgs,
    args: TimerArgs,
    credentials: &mut Credentials,
) -> Result<()> {
    let client = connect(base, credentials).await?;
    timer::stop(&client, &args.timeslip_id).await
}

pub async fn run_daily_total(
    base: &BaseArgs,
    _args: DailyTotalArgs,
    credentials: &mut Credentials,
) -> Result<()> {
    let client = connect(base, credentials).await?;
    total::run(&client, base.json).await
}
