use anyhow::Result;
use clap::Args;

use crate::args::BaseArgs;
use crate::config::Credentials;
use crate::login::connect;

pub mod api;
mod list;

#[derive(Debug, Clone, Args)]
pub struct TaskListArgs {}

pub async fn run_list(
    base: &BaseArgs,
    _args: TaskListArgs,
    credentials: &mut Credentials,
) -> Result<()> {
    let client = connect(base, credentials).await?;
    list::run(&client, base.json).await
}
