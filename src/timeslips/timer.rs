use anyhow::Result;

use crate::http::ApiClient;
use crate::ui::{print_command_status, with_spinner, CommandStatus};

use super::api;

pub async fn start(client: &ApiClient, timeslip_id: &str) -> Result<()> {
    match with_spinner("Starting timer...", api::start_timer(client, timeslip_id)).await {
        Ok(()) => {
            print_command_status(
                CommandStatus::Success,
                &format!("Started timer on timeslip {timeslip_id}"),
            );
            Ok(())
        }
        Err(e) => {
            print_command_status(
                CommandStatus::Error,
                &format!("Failed to start timer on timeslip {timeslip_id}"),
            );
            Err(e)
        }
    }
}

pub async fn stop(client: &ApiClient, timeslip_id: &str) -> Result<()> {
    match with_spinner("Stopping timer...", api::stop_timer(client, timeslip_id)).await {
        Ok(()) => {
            print_command_status(
                CommandStatus::Success,
                &format!("Stopped timer on timeslip {timeslip_id}"),
            );
            Ok(())
        }
        Err(e) => {
            print_command_status(
                CommandStatus::Error,
                &format!("Failed to stop timer on timeslip {timeslip_id}"),
            );
            Err(e)
        }
    }
}
