use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::http::ApiClient;
use crate::ui::with_spinner;
use crate::utils::format_amount;

use super::api::{self, Lookups, Project, Task};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRow {
    pub id: String,
    pub label: String,
}

pub async fn run(client: &ApiClient, json: bool) -> Result<()> {
    let rows = with_spinner("Loading tasks...", load_rows(client)).await?;

    if json {
        println!("{}", serde_json::to_string(&rows)?);
    } else {
        for row in &rows {
            println!("{}\t{}", row.id, row.label);
        }
    }
    Ok(())
}

async fn load_rows(client: &ApiClient) -> Result<Vec<TaskRow>> {
    let tasks: Vec<Task> = api::list_tasks(client)
        .await?
        .into_iter()
        .filter(Task::is_active)
        .collect();

    let mut lookups = Lookups::default();
    for task in &tasks {
        lookups.project(client, &task.project).await?;
    }
    task_rows(&tasks, lookups.projects())
}

/// One row per active task, sorted by label.
pub fn task_rows(tasks: &[Task], projects: &HashMap<String, Project>) -> Result<Vec<TaskRow>> {
    let mut rows = tasks
        .iter()
        .filter(|task| task.is_active())
        .map(|task| {
            let project = projects.get(&task.project).ok_or_else(|| {
                anyhow!("project {} of task {} not loaded", task.project, task.id())
            })?;
            Ok(TaskRow {
                id: task.id().to_string(),
                label: describe_task(task, project),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    rows.sort_by(|a, b| a.label.cmp(&b.label));
    Ok(rows)
}

pub fn describe_task(task: &Task, project: &Project) -> String {
    format!(
        "{}: {} - {} (£{} per {})",
        project.contact_name,
        project.name,
        task.name,
        format_amount(task.billing_rate),
        task.billing_period
    )
}
