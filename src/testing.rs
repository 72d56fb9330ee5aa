//! Loopback stand-in for the FreeAgent API used by async tests.
//!
//! Must run inside an actix system (`#[actix_web::test]`), which provides the
//! local task set the server is spawned on. The literal `{base}` inside a
//! canned body is replaced with the server's base URL, so returned resource
//! URLs point back at the mock.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use actix_web::http::{Method, StatusCode};
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path relative to the API base, e.g. `timeslips/12/timer`.
    pub path: String,
    pub query: String,
    pub body: String,
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct Route {
    method: Method,
    path: String,
    status: StatusCode,
    body: Value,
}

struct MockState {
    base_url: String,
    routes: Vec<Route>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[derive(Default)]
pub struct MockApiBuilder {
    routes: Vec<Route>,
}

impl MockApiBuilder {
    pub fn route(mut self, method: Method, path: &str, status: u16, body: Value) -> Self {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            status: StatusCode::from_u16(status).unwrap(),
            body,
        });
        self
    }

    pub fn start(self) -> MockApi {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}/v2/");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = web::Data::new(MockState {
            base_url: base_url.clone(),
            routes: self.routes,
            requests: Arc::clone(&requests),
        });

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .default_service(web::to(respond))
        })
        .workers(1)
        .disable_signals()
        .listen(listener)
        .unwrap()
        .run();
        actix_web::rt::spawn(server);

        MockApi {
            base_url,
            requests,
        }
    }
}

pub struct MockApi {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockApi {
    pub fn builder() -> MockApiBuilder {
        MockApiBuilder::default()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

async fn respond(req: HttpRequest, body: web::Bytes, state: web::Data<MockState>) -> HttpResponse {
    let path = req.path().trim_start_matches("/v2/").to_string();
    state.requests.lock().unwrap().push(RecordedRequest {
        method: req.method().clone(),
        path: path.clone(),
        query: req.query_string().to_string(),
        body: String::from_utf8_lossy(&body).into_owned(),
        authorization: req
            .headers()
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    });

    match state
        .routes
        .iter()
        .find(|route| &route.method == req.method() && route.path == path)
    {
        Some(route) => HttpResponse::build(route.status)
            .content_type("application/json")
            .body(route.body.to_string().replace("{base}", &state.base_url)),
        None => HttpResponse::NotFound().json(json!({"errors": {"error": {"message": "not found"}}})),
    }
}
