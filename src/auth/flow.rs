use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use oauth2::url::Url;
use tracing::warn;

use super::listener::{RedirectListener, DEFAULT_REDIRECT_ADDR};
use super::provider::Company;
use super::{AuthError, Provider, Result, StoredToken};
use crate::config::Credentials;
use crate::ui::{print_command_status, CommandStatus};

pub struct LoginOptions {
    pub redirect_addr: SocketAddr,
    /// Upper bound on waiting for the browser redirect.
    pub timeout: Duration,
    /// How long the listener keeps serving after the redirect arrived.
    pub grace: Duration,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            redirect_addr: DEFAULT_REDIRECT_ADDR,
            timeout: Duration::from_secs(300),
            grace: Duration::from_secs(3),
        }
    }
}

struct LoginReport {
    company: Company,
    expires_at: DateTime<Utc>,
}

/// Run the interactive authorization-code flow and store the resulting token
/// in `credentials`.
///
/// `present` receives the approval URL and is responsible for showing it to
/// the user. Failures are reported here and turned into `false`; on failure
/// `credentials` is left untouched.
pub async fn fresh_login<F>(
    credentials: &mut Credentials,
    provider: &Provider,
    options: &LoginOptions,
    present: F,
) -> bool
where
    F: FnOnce(&Url),
{
    match try_fresh_login(credentials, provider, options, present).await {
        Ok(report) => {
            print_command_status(
                CommandStatus::Success,
                &format!(
                    "Successfully authenticated: {} ({}). Token expiry: {}",
                    report.company.name,
                    report.company.subdomain,
                    report
                        .expires_at
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M:%S")
                ),
            );
            true
        }
        Err(err) => {
            print_command_status(CommandStatus::Error, &format!("Login failed: {err}"));
            false
        }
    }
}

async fn try_fresh_login<F>(
    credentials: &mut Credentials,
    provider: &Provider,
    options: &LoginOptions,
    present: F,
) -> Result<LoginReport>
where
    F: FnOnce(&Url),
{
    provider.check_client(credentials)?;

    // Bound before the URL is shown so an early redirect is queued, not refused.
    let listener = RedirectListener::bind(options.redirect_addr)?;
    let redirect_uri = listener.redirect_uri();
    let (authorize_url, state) = provider.authorize_url(credentials, &redirect_uri)?;
    present(&authorize_url);

    let callback = listener.wait(options.timeout, options.grace).await?;

    // A mismatched state is only reported; the exchange still goes ahead.
    if callback.state != *state.secret() {
        warn!("state returned by the redirect does not match this login attempt");
        print_command_status(
            CommandStatus::Warning,
            "The redirect's state did not match this login attempt",
        );
    }

    if let Some(error) = callback.error {
        return Err(AuthError::failed(error, "authorization was not granted"));
    }
    let code = callback.code.ok_or_else(|| {
        AuthError::failed("missing_code", "redirect did not include an authorization code")
    })?;

    let response = provider
        .exchange_code(credentials, &redirect_uri, &code)
        .await?;
    let token = StoredToken::from_response(&response, None, Utc::now())?;
    let company = provider.fetch_company(&token.access_token).await?;

    let expires_at = token.expires_at;
    credentials.access_token = Some(token);

    Ok(LoginReport {
        company,
        expires_at,
    })
}
