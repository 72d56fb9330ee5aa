//! OAuth2 authorization-code login and transparent token refresh for FreeAgent.
//!
//! The credential record is passed in explicitly and mutated in place; saving
//! it is left to the caller, which writes it back once at process exit.

use std::time::Duration;

mod flow;
mod listener;
mod provider;
mod token;

pub use flow::{fresh_login, LoginOptions};
pub use listener::DEFAULT_REDIRECT_ADDR;
pub use provider::{Environment, Provider};
pub use token::{ensure_valid_token, StoredToken};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no client ID or client secret set; run `fatt login` first")]
    MissingCredentials,

    #[error("not logged in; run `fatt login` first")]
    NotLoggedIn,

    #[error("authentication failed: {code}{}", describe(.message))]
    AuthenticationFailed { code: String, message: String },

    #[error("no authorization redirect received within {}s", .0.as_secs())]
    LoginTimedOut(Duration),

    #[error("redirect listener failed: {0}")]
    Listener(#[source] std::io::Error),

    #[error("request to FreeAgent failed: {0}")]
    Request(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

fn describe(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(" ({message})")
    }
}

impl AuthError {
    pub(crate) fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        AuthError::AuthenticationFailed {
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
