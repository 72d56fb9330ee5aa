use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::http::ApiClient;
use crate::utils::{decimal, resource_id};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub url: String,
    pub name: String,
    /// URL of the owning project.
    pub project: String,
    #[serde(default)]
    pub status: String,
    #[serde(with = "decimal", default)]
    pub billing_rate: f64,
    /// `hour`, `day` or similar.
    #[serde(default)]
    pub billing_period: String,
}

impl Task {
    pub fn id(&self) -> &str {
        resource_id(&self.url)
    }

    pub fn is_active(&self) -> bool {
        self.status == "Active"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub contact_name: String,
    #[serde(with = "decimal", default)]
    pub hours_per_day: f64,
}

#[derive(Debug, Deserialize)]
struct TaskList {
    tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
struct TaskEnvelope {
    task: Task,
}

#[derive(Debug, Deserialize)]
struct ProjectEnvelope {
    project: Project,
}

pub async fn list_tasks(client: &ApiClient) -> Result<Vec<Task>> {
    let list: TaskList = client.get("tasks?per_page=100").await?;
    Ok(list.tasks)
}

/// `task` is either a bare id or the task's URL.
pub async fn get_task(client: &ApiClient, task: &str) -> Result<Task> {
    let path = if task.contains('/') {
        task.to_string()
    } else {
        format!("tasks/{}", urlencoding::encode(task))
    };
    let envelope: TaskEnvelope = client.get(&path).await?;
    Ok(envelope.task)
}

pub async fn get_project(client: &ApiClient, url: &str) -> Result<Project> {
    let envelope: ProjectEnvelope = client.get(url).await?;
    Ok(envelope.project)
}

/// Lookups keyed by resource URL, valid for one command.
#[derive(Default)]
pub struct Lookups {
    tasks: HashMap<String, Task>,
    projects: HashMap<String, Project>,
}

impl Lookups {
    pub async fn task(&mut self, client: &ApiClient, url: &str) -> Result<&Task> {
        if !self.tasks.contains_key(url) {
            let task = get_task(client, url).await?;
            self.tasks.insert(url.to_string(), task);
        }
        Ok(&self.tasks[url])
    }

    pub async fn project(&mut self, client: &ApiClient, url: &str) -> Result<&Project> {
        if !self.projects.contains_key(url) {
            let project = get_project(client, url).await?;
            self.projects.insert(url.to_string(), project);
        }
        Ok(&self.projects[url])
    }

    pub fn projects(&self) -> &HashMap<String, Project> {
        &self.projects
    }
}
