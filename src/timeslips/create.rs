use anyhow::{bail, Result};
use chrono::Local;

use crate::http::ApiClient;
use crate::tasks::api::get_task;
use crate::ui::{print_command_status, with_spinner, CommandStatus};

use super::api::{self, NewTimeslip};

/// Book an empty timeslip for today on `task_id` and start its timer.
pub async fn run(
    client: &ApiClient,
    timeslip_user: Option<&str>,
    task_id: &str,
    comment: &str,
    json: bool,
) -> Result<()> {
    let Some(user) = timeslip_user.filter(|user| !user.is_empty()) else {
        bail!("no timeslip user set; run `fatt login` first");
    };

    let task = with_spinner("Loading task...", get_task(client, task_id)).await?;
    let new_timeslip = NewTimeslip {
        task: task.url.clone(),
        user: user.to_string(),
        project: task.project.clone(),
        dated_on: Local::now().date_naive(),
        hours: 0,
        comment: comment.to_string(),
    };

    let created = with_spinner(
        "Creating timeslip...",
        api::create_timeslip(client, new_timeslip),
    )
    .await?;

    match api::start_timer(client, &created.url).await {
        Ok(()) => {
            if json {
                println!("{}", serde_json::to_string(&created)?);
            }
            print_command_status(
                CommandStatus::Success,
                &format!("Started timer on new timeslip {} for '{}'", created.id(), task.name),
            );
            Ok(())
        }
        Err(e) => {
            print_command_status(
                CommandStatus::Error,
                &format!("Created timeslip {} but failed to start its timer", created.id()),
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockApi, MockApiBuilder};
    use actix_web::http::Method;
    use reqwest::Url;
    use serde_json::{json, Value};

    const USER: &str = "https://api.freeagent.com/v2/users/1";

    fn freeagent() -> MockApiBuilder {
        MockApi::builder()
            .route(
                Method::GET,
                "tasks/7",
                200,
                json!({"task": {
                    "url": "{base}tasks/7",
                    "name": "Fieldwork",
                    "project": "{base}projects/2",
                    "status": "Active",
                    "billing_rate": "85.0",
                    "billing_period": "hour"
                }}),
            )
            .route(
                Method::POST,
                "timeslips",
                201,
                json!({"timeslip": {
                    "url": "{base}timeslips/40",
                    "task": "{base}tasks/7",
                    "project": "{base}projects/2",
                    "dated_on": "2024-03-01",
                    "hours": "0.0",
                    "comment": "Interviews"
                }}),
            )
    }

    fn client(api: &MockApi) -> ApiClient {
        ApiClient::new(Url::parse(&api.base_url).unwrap(), "tok".into()).unwrap()
    }

    #[actix_web::test]
    async fn creates_timeslip_then_starts_its_timer() {
        let api = freeagent()
            .route(Method::POST, "timeslips/40/timer", 200, json!({}))
            .start();

        run(&client(&api), Some(USER), "7", "Interviews", false)
            .await
            .unwrap();

        let requests = api.requests();
        let paths: Vec<(Method, &str)> = requests
            .iter()
            .map(|r| (r.method.clone(), r.path.as_str()))
            .collect();
        assert_eq!(
            paths,
            vec![
                (Method::GET, "tasks/7"),
                (Method::POST, "timeslips"),
                (Method::POST, "timeslips/40/timer"),
            ]
        );

        let body: Value = serde_json::from_str(&requests[1].body).unwrap();
        let timeslip = &body["timeslip"];
        assert_eq!(timeslip["user"], USER);
        assert_eq!(timeslip["task"], format!("{}tasks/7", api.base_url));
        assert_eq!(timeslip["project"], format!("{}projects/2", api.base_url));
        assert_eq!(timeslip["hours"], 0);
        assert_eq!(timeslip["comment"], "Interviews");
        assert_eq!(
            timeslip["dated_on"],
            Local::now().date_naive().format("%Y-%m-%d").to_string()
        );
    }

    #[actix_web::test]
    async fn timer_failure_after_create_is_reported() {
        let api = freeagent().start();

        let err = run(&client(&api), Some(USER), "7", "", false)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("404"), "{err:#}");
        assert_eq!(api.count(Method::POST, "timeslips"), 1);
        assert_eq!(api.count(Method::POST, "timeslips/40/timer"), 1);
    }

    #[actix_web::test]
    async fn missing_timeslip_user_sends_nothing() {
        let api = freeagent().start();

        let err = run(&client(&api), None, "7", "", false)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no timeslip user"));
        assert!(api.requests().is_empty());
    }
}
