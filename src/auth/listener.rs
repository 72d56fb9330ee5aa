use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener};
use std::sync::Mutex;
use std::time::Duration;

use actix_web::http::header::ContentType;
use actix_web::http::KeepAlive;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use tokio::sync::oneshot;
use tracing::debug;

use super::{AuthError, Result};

/// FreeAgent only redirects to URIs registered with the app, so the port is
/// fixed.
pub const DEFAULT_REDIRECT_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 12423));

const CONFIRMATION: &str = "You can go back to the console.";

/// Query parameters of the redirect that completed the wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCallback {
    pub state: String,
    pub code: Option<String>,
    /// Set instead of `code` when the user declined access.
    pub error: Option<String>,
}

struct CallbackSlot(Mutex<Option<oneshot::Sender<AuthorizationCallback>>>);

impl CallbackSlot {
    /// Hand the callback to the waiting login flow. Only the first delivery
    /// counts.
    fn deliver(&self, callback: AuthorizationCallback) {
        let sender = self.0.lock().ok().and_then(|mut slot| slot.take());
        match sender {
            Some(sender) => {
                let _ = sender.send(callback);
            }
            None => debug!("ignoring repeated redirect"),
        }
    }
}

/// Loopback HTTP endpoint that captures a single OAuth redirect.
pub struct RedirectListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl RedirectListener {
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(AuthError::Listener)?;
        let addr = listener.local_addr().map_err(AuthError::Listener)?;
        debug!(%addr, "redirect listener bound");
        Ok(Self { listener, addr })
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Serve until a redirect carrying `state` arrives, keep serving for
    /// `grace` so the browser can finish, then shut down.
    ///
    /// Fails with `LoginTimedOut` when nothing arrives within `timeout`.
    pub async fn wait(
        self,
        timeout: Duration,
        grace: Duration,
    ) -> Result<AuthorizationCallback> {
        let (sender, receiver) = oneshot::channel();
        let slot = web::Data::new(CallbackSlot(Mutex::new(Some(sender))));

        let server = HttpServer::new(move || {
            App::new()
                .app_data(slot.clone())
                .default_service(web::to(handle_redirect))
        })
        .workers(1)
        .keep_alive(KeepAlive::Disabled)
        .disable_signals()
        .shutdown_timeout(1)
        .listen(self.listener)
        .map_err(AuthError::Listener)?
        .run();
        let handle = server.handle();

        let waiter = async move {
            let outcome = match tokio::time::timeout(timeout, receiver).await {
                Ok(Ok(callback)) => {
                    tokio::time::sleep(grace).await;
                    Ok(callback)
                }
                Ok(Err(_)) => Err(AuthError::Listener(io::Error::other(
                    "redirect listener stopped before a redirect arrived",
                ))),
                Err(_) => Err(AuthError::LoginTimedOut(timeout)),
            };
            handle.stop(false).await;
            outcome
        };

        let (served, outcome) = tokio::join!(server, waiter);
        served.map_err(AuthError::Listener)?;
        outcome
    }
}

async fn handle_redirect(req: HttpRequest, slot: web::Data<CallbackSlot>) -> HttpResponse {
    let params = web::Query::<BTreeMap<String, String>>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .unwrap_or_default();

    let Some(state) = params.get("state") else {
        debug!(method = %req.method(), path = req.path(), "redirect without state");
        return plain_text(describe_params(&params));
    };

    slot.deliver(AuthorizationCallback {
        state: state.clone(),
        code: params.get("code").cloned(),
        error: params.get("error").cloned(),
    });
    plain_text(CONFIRMATION.to_string())
}

fn plain_text(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(body)
}

fn describe_params(params: &BTreeMap<String, String>) -> String {
    if params.is_empty() {
        return "No query parameters received.\n".to_string();
    }
    let mut body = String::from("Received query parameters:\n");
    for (key, value) in params {
        let _ = writeln!(body, "  {key} => {value}");
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    #[tokio::test]
    async fn yields_state_and_code() {
        let listener = RedirectListener::bind(loopback()).unwrap();
        let base = listener.redirect_uri();

        let browser = tokio::spawn(async move {
            let response = reqwest::get(format!("{base}?state=S&code=C")).await.unwrap();
            (response.status().as_u16(), response.text().await.unwrap())
        });

        let callback = listener
            .wait(Duration::from_secs(10), Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(
            callback,
            AuthorizationCallback {
                state: "S".into(),
                code: Some("C".into()),
                error: None,
            }
        );

        let (status, body) = browser.await.unwrap();
        assert_eq!(status, 200);
        assert_eq!(body, CONFIRMATION);
    }

    #[tokio::test]
    async fn request_without_state_keeps_listening() {
        let listener = RedirectListener::bind(loopback()).unwrap();
        let base = listener.redirect_uri();

        let browser = tokio::spawn(async move {
            let stray = reqwest::get(format!("{base}favicon.ico?check=1")).await.unwrap();
            let stray = (stray.status().as_u16(), stray.text().await.unwrap());
            let redirect = reqwest::get(format!("{base}?code=abc123&state=xyz")).await.unwrap();
            (stray, redirect.status().as_u16())
        });

        let callback = listener
            .wait(Duration::from_secs(10), Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(callback.state, "xyz");
        assert_eq!(callback.code.as_deref(), Some("abc123"));

        let ((stray_status, stray_body), redirect_status) = browser.await.unwrap();
        assert_eq!(stray_status, 200);
        assert!(stray_body.contains("check => 1"));
        assert_eq!(redirect_status, 200);
    }

    #[tokio::test]
    async fn denied_access_is_passed_through() {
        let listener = RedirectListener::bind(loopback()).unwrap();
        let base = listener.redirect_uri();

        tokio::spawn(async move {
            let _ = reqwest::get(format!("{base}?error=access_denied&state=xyz")).await;
        });

        let callback = listener
            .wait(Duration::from_secs(10), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(callback.code, None);
        assert_eq!(callback.error.as_deref(), Some("access_denied"));
    }

    #[tokio::test]
    async fn gives_up_after_timeout() {
        let listener = RedirectListener::bind(loopback()).unwrap();
        let err = listener
            .wait(Duration::from_millis(100), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::LoginTimedOut(_)));
    }

    #[test]
    fn redirect_uri_uses_bound_port() {
        let listener = RedirectListener::bind(loopback()).unwrap();
        let uri = listener.redirect_uri();
        assert!(uri.starts_with("http://127.0.0.1:"));
        assert!(uri.ends_with('/'));
        assert!(!uri.ends_with(":0/"));
    }

    #[test]
    fn default_address_is_fixed_loopback_port() {
        assert_eq!(DEFAULT_REDIRECT_ADDR.to_string(), "127.0.0.1:12423");
    }

    #[test]
    fn diagnostic_body_lists_params() {
        let mut params = BTreeMap::new();
        assert_eq!(describe_params(&params), "No query parameters received.\n");

        params.insert("b".to_string(), "2".to_string());
        params.insert("a".to_string(), "1".to_string());
        assert_eq!(
            describe_params(&params),
            "Received query parameters:\n  a => 1\n  b => 2\n"
        );
    }
}
