use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::http::ApiClient;
use crate::utils::{decimal, resource_id};

/// FreeAgent's largest page; listings fetch a single page.
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeslip {
    pub url: String,
    pub task: String,
    pub project: String,
    pub dated_on: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(with = "decimal", default)]
    pub hours: f64,
    /// Present while the timeslip's timer is running.
    #[serde(default)]
    pub timer: Option<Timer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    pub start_from: DateTime<Utc>,
}

impl Timeslip {
    pub fn id(&self) -> &str {
        resource_id(&self.url)
    }

    pub fn task_id(&self) -> &str {
        resource_id(&self.task)
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Booked hours, or the time elapsed since the timer started when it is
    /// running.
    pub fn tracked_hours(&self, now: DateTime<Utc>) -> f64 {
        match &self.timer {
            Some(timer) => (now - timer.start_from).num_seconds().max(0) as f64 / 3600.0,
            None => self.hours,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTimeslip {
    pub task: String,
    pub user: String,
    pub project: String,
    pub dated_on: NaiveDate,
    pub hours: u32,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
struct TimeslipList {
    timeslips: Vec<Timeslip>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TimeslipEnvelope<T> {
    timeslip: T,
}

pub async fn list_for_task(client: &ApiClient, task_id: &str) -> Result<Vec<Timeslip>> {
    let path = format!(
        "timeslips?task={}&per_page={PAGE_SIZE}",
        urlencoding::encode(task_id)
    );
    let list: TimeslipList = client.get(&path).await?;
    Ok(list.timeslips)
}

pub async fn list_running(client: &ApiClient) -> Result<Vec<Timeslip>> {
    let list: TimeslipList = client
        .get(&format!("timeslips?view=running&per_page={PAGE_SIZE}"))
        .await?;
    Ok(list.timeslips)
}

pub async fn list_for_day(client: &ApiClient, day: NaiveDate) -> Result<Vec<Timeslip>> {
    let path = format!("timeslips?from_date={day}&to_date={day}&view=all&per_page={PAGE_SIZE}");
    let list: TimeslipList = client.get(&path).await?;
    Ok(list.timeslips)
}

pub async fn create_timeslip(client: &ApiClient, timeslip: NewTimeslip) -> Result<Timeslip> {
    let created: TimeslipEnvelope<Timeslip> = client
        .post("timeslips", &TimeslipEnvelope { timeslip })
        .await?;
    Ok(created.timeslip)
}

/// `timeslip` is either a bare id or the timeslip's URL.
pub async fn start_timer(client: &ApiClient, timeslip: &str) -> Result<()> {
    client.post_empty(&timer_path(timeslip)).await
}

pub async fn stop_timer(client: &ApiClient, timeslip: &str) -> Result<()> {
    client.delete(&timer_path(timeslip)).await
}

fn timer_path(timeslip: &str) -> String {
    if timeslip.contains('/') {
        format!("{}/timer", timeslip.trim_end_matches('/'))
    } else {
        format!("timeslips/{}/timer", urlencoding::encode(timeslip))
    }
}
