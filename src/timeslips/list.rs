use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::utils::{format_hours, pad_comment};

use super::api::Timeslip;

#[derive(Debug, Serialize)]
struct TimeslipRow<'a> {
    id: &'a str,
    dated_on: &'a str,
    comment: &'a str,
    hours: f64,
    task_id: &'a str,
    running: bool,
}

pub fn print(timeslips: &[Timeslip], json: bool) -> Result<()> {
    let now = Utc::now();
    if json {
        let rows: Vec<TimeslipRow> = timeslips
            .iter()
            .map(|slip| TimeslipRow {
                id: slip.id(),
                dated_on: &slip.dated_on,
                comment: slip.comment.as_deref().unwrap_or_default(),
                hours: slip.tracked_hours(now),
                task_id: slip.task_id(),
                running: slip.is_running(),
            })
            .collect();
        println!("{}", serde_json::to_string(&rows)?);
    } else {
        for slip in timeslips {
            println!("{}", format_timeslip(slip, now));
        }
    }
    Ok(())
}

/// `<id>\t[<date>] <comment>  <hh>:<mm>\t<task id>`, plus `\tR` while the
/// timer runs.
pub fn format_timeslip(slip: &Timeslip, now: DateTime<Utc>) -> String {
    let mut line = format!(
        "{}\t[{}] {}  {}\t{}",
        slip.id(),
        slip.dated_on,
        pad_comment(slip.comment.as_deref().unwrap_or_default()),
        format_hours(slip.tracked_hours(now)),
        slip.task_id()
    );
    if slip.is_running() {
        line.push_str("\tR");
    }
    line
}
