use anyhow::{bail, Result};
use chrono::{Local, Utc};

use crate::http::ApiClient;
use crate::tasks::api::{Lookups, Project, Task};
use crate::ui::with_spinner;
use crate::utils::format_amount;

use super::api;

pub async fn run(client: &ApiClient, json: bool) -> Result<()> {
    let today = Local::now().date_naive();
    let total = with_spinner("Adding up today's timeslips...", daily_total(client)).await?;

    if json {
        let output = serde_json::json!({ "date": today, "total": total });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", format_amount(total));
    }
    Ok(())
}

async fn daily_total(client: &ApiClient) -> Result<f64> {
    let now = Utc::now();
    let timeslips = api::list_for_day(client, Local::now().date_naive()).await?;

    let mut lookups = Lookups::default();
    let mut total = 0.0;
    for slip in &timeslips {
        let task = lookups.task(client, &slip.task).await?.clone();
        let project = if bills_per_day(&task) {
            Some(lookups.project(client, &slip.project).await?)
        } else {
            None
        };
        total += billed_amount(slip.tracked_hours(now), &task, project)?;
    }
    Ok(total)
}

fn bills_per_day(task: &Task) -> bool {
    task.billing_period == "day"
}

/// Value of `hours` worked on `task`. Day rates are spread over the
/// project's working day, so `project` is required for them.
pub fn billed_amount(hours: f64, task: &Task, project: Option<&Project>) -> Result<f64> {
    if !bills_per_day(task) {
        return Ok(hours * task.billing_rate);
    }
    let Some(project) = project else {
        bail!("day-billed task {} needs its project", task.id());
    };
    if project.hours_per_day <= 0.0 {
        bail!("project {} has no hours per day set", project.name);
    }
    Ok(task.billing_rate / project.hours_per_day * hours)
}
