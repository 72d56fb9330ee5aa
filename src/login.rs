use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{Local, Utc};
use clap::Args;
use tracing::debug;

use crate::args::BaseArgs;
use crate::auth::{self, Environment, LoginOptions, Provider, DEFAULT_REDIRECT_ADDR};
use crate::config::Credentials;
use crate::http::ApiClient;
use crate::ui::{print_command_status, CommandStatus};

#[derive(Debug, Clone, Args)]
pub struct LoginArgs {
    /// OAuth client ID of your FreeAgent app
    pub client_id: String,

    /// OAuth client secret of your FreeAgent app
    pub client_secret: String,

    /// URL of the FreeAgent user new timeslips are booked for
    pub timeslip_user: String,

    /// FreeAgent environment to log in to
    #[arg(value_enum, default_value_t = Environment::Sandbox)]
    pub environment: Environment,

    /// Print the approval URL without opening a browser
    #[arg(long)]
    pub no_browser: bool,

    /// Local port the OAuth redirect is sent to
    #[arg(long, default_value_t = DEFAULT_REDIRECT_ADDR.port(), hide = true)]
    pub redirect_port: u16,

    /// Seconds to wait for the browser to come back
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,
}

#[derive(Debug, Clone, Args)]
pub struct TokenArgs {
    /// Show full token (default: masked)
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Clone, Args)]
pub struct LogoutArgs {}

/// A login that did not finish. `fresh_login` has already told the user why,
/// so this only carries the exit status.
#[derive(Debug, thiserror::Error)]
#[error("login was not completed")]
pub struct LoginIncomplete;

/// Resolve a usable API client, refreshing the stored token when it expired.
pub async fn connect(base: &BaseArgs, credentials: &mut Credentials) -> Result<ApiClient> {
    let provider = Provider::new(credentials.environment, base.api_url.as_deref())?;
    let token = auth::ensure_valid_token(credentials, &provider).await?;
    ApiClient::new(provider.base_url().clone(), token)
}

pub async fn run_login(
    base: &BaseArgs,
    args: LoginArgs,
    credentials: &mut Credentials,
) -> Result<()> {
    let previous_app = (credentials.client_id.clone(), credentials.environment);
    credentials.client_id = args.client_id;
    credentials.client_secret = args.client_secret;
    credentials.timeslip_user = Some(args.timeslip_user);
    credentials.environment = args.environment;

    let provider = Provider::new(credentials.environment, base.api_url.as_deref())?;
    let options = LoginOptions {
        redirect_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, args.redirect_port)),
        timeout: Duration::from_secs(args.timeout),
        ..LoginOptions::default()
    };

    let open_browser = !args.no_browser;
    let authenticated = auth::fresh_login(credentials, &provider, &options, |url| {
        // Launchers show stdout to the user, so the URL goes there.
        println!("Go to {url} in your browser.");
        if open_browser {
            if let Err(err) = open::that(url.as_str()) {
                debug!(%err, "could not open browser");
            }
        }
    })
    .await;

    if !authenticated {
        // A token issued to another app or environment must not outlive the switch.
        if previous_app != (credentials.client_id.clone(), credentials.environment) {
            credentials.access_token = None;
        }
        return Err(LoginIncomplete.into());
    }
    Ok(())
}

pub fn run_token(base: &BaseArgs, args: TokenArgs, credentials: &Credentials) -> Result<()> {
    let Some(token) = credentials.access_token.as_ref() else {
        bail!("not logged in; run `fatt login` first");
    };

    let ttl_seconds = (token.expires_at - Utc::now()).num_seconds();
    let token_display = if args.show {
        token.access_token.clone()
    } else {
        mask_token(&token.access_token)
    };

    if base.json {
        let output = serde_json::json!({
            "environment": credentials.environment,
            "token": token_display,
            "expires_at": token.expires_at,
            "ttl_seconds": ttl_seconds,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Token: {token_display}");
    let expires = token.expires_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
    if ttl_seconds > 0 {
        println!("Expires: {expires} (in {ttl_seconds} seconds)");
    } else {
        println!("Expires: {expires} (EXPIRED, refreshed on next use)");
    }
    Ok(())
}

pub fn run_logout(_args: LogoutArgs, credentials: &mut Credentials) -> Result<()> {
    if credentials.access_token.take().is_some() {
        print_command_status(CommandStatus::Success, "Logged out");
    } else {
        print_command_status(CommandStatus::Warning, "Not logged in (already logged out)");
    }
    Ok(())
}

fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
