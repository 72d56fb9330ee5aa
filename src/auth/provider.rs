use std::fmt;

use clap::ValueEnum;
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::url::Url;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, RefreshToken,
    RequestTokenError, TokenUrl,
};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AuthError, Result};
use crate::config::Credentials;

pub const PRODUCTION_API_URL: &str = "https://api.freeagent.com/v2/";
pub const SANDBOX_API_URL: &str = "https://api.sandbox.freeagent.com/v2/";

const AUTHORIZE_PATH: &str = "approve_app";
const TOKEN_PATH: &str = "token_endpoint";
const COMPANY_PATH: &str = "company";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Sandbox,
}

impl Environment {
    pub fn base_url(self) -> &'static str {
        match self {
            Environment::Production => PRODUCTION_API_URL,
            Environment::Sandbox => SANDBOX_API_URL,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => f.write_str("production"),
            Environment::Sandbox => f.write_str("sandbox"),
        }
    }
}

/// The account that granted access, as returned by the `company` endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Company {
    pub name: String,
    #[serde(default)]
    pub subdomain: String,
}

#[derive(Deserialize)]
struct CompanyEnvelope {
    company: Company,
}

/// FreeAgent OAuth endpoints for one environment.
#[derive(Debug, Clone)]
pub struct Provider {
    base_url: Url,
    http: reqwest::Client,
}

impl Provider {
    /// `override_url` replaces the environment's base URL (staging, tests).
    pub fn new(environment: Environment, override_url: Option<&str>) -> Result<Self> {
        let raw = override_url.unwrap_or(environment.base_url());
        // Url::join drops the last segment unless the base ends with a slash.
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };
        let base_url =
            Url::parse(&normalized).map_err(|e| AuthError::InvalidUrl(format!("{raw}: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("fatt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::Request(e.to_string()))?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AuthError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Build the OAuth client. Fails before any network traffic when the
    /// client id or secret is missing.
    fn oauth_client(&self, credentials: &Credentials) -> Result<BasicClient> {
        let client_id = credentials.client_id.trim();
        let client_secret = credentials.client_secret.trim();
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        Ok(BasicClient::new(
            ClientId::new(client_id.to_string()),
            Some(ClientSecret::new(client_secret.to_string())),
            AuthUrl::from_url(self.endpoint(AUTHORIZE_PATH)?),
            Some(TokenUrl::from_url(self.endpoint(TOKEN_PATH)?)),
        ))
    }

    pub fn check_client(&self, credentials: &Credentials) -> Result<()> {
        self.oauth_client(credentials).map(|_| ())
    }

    /// Approval URL for the browser plus the state value it embeds.
    pub fn authorize_url(
        &self,
        credentials: &Credentials,
        redirect_uri: &str,
    ) -> Result<(Url, CsrfToken)> {
        let client = self
            .oauth_client(credentials)?
            .set_redirect_uri(redirect_url(redirect_uri)?);
        Ok(client.authorize_url(CsrfToken::new_random).url())
    }

    pub async fn exchange_code(
        &self,
        credentials: &Credentials,
        redirect_uri: &str,
        code: &str,
    ) -> Result<BasicTokenResponse> {
        let client = self
            .oauth_client(credentials)?
            .set_redirect_uri(redirect_url(redirect_uri)?);
        debug!(endpoint = %self.base_url, "exchanging authorization code");
        client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(token_error)
    }

    pub async fn refresh(
        &self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> Result<BasicTokenResponse> {
        let client = self.oauth_client(credentials)?;
        debug!(endpoint = %self.base_url, "refreshing access token");
        client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(token_error)
    }

    pub async fn fetch_company(&self, access_token: &str) -> Result<Company> {
        let response = self
            .http
            .get(self.endpoint(COMPANY_PATH)?)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::failed(status.as_str(), body));
        }

        response
            .json::<CompanyEnvelope>()
            .await
            .map(|envelope| envelope.company)
            .map_err(|e| AuthError::Request(format!("unexpected company response: {e}")))
    }
}

fn redirect_url(uri: &str) -> Result<RedirectUrl> {
    RedirectUrl::new(uri.to_string()).map_err(|e| AuthError::InvalidUrl(format!("{uri}: {e}")))
}

fn token_error<E>(err: RequestTokenError<E, BasicErrorResponse>) -> AuthError
where
    E: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => AuthError::failed(
            AsRef::<str>::as_ref(response.error()),
            response.error_description().cloned().unwrap_or_default(),
        ),
        RequestTokenError::Parse(e, body) => AuthError::failed(
            "invalid_response",
            format!("{e}: {}", String::from_utf8_lossy(&body)),
        ),
        RequestTokenError::Request(e) => AuthError::Request(e.to_string()),
        RequestTokenError::Other(message) => AuthError::Request(message),
    }
}
