use anyhow::{bail, Context, Result};
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Authenticated JSON client for the FreeAgent REST API.
///
/// Paths are joined to the environment base URL; absolute URLs (as returned
/// in resource `url` fields) are used as they are.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: Url, token: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("fatt/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).with_context(|| format!("invalid URL {path}"));
        }
        self.base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("invalid API path {path}"))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.url(path)?;
        debug!(%method, %url, "FreeAgent request");
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json"))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = send(self.request(Method::GET, path)?, path).await?;
        decode(response, path).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = send(self.request(Method::POST, path)?.json(body), path).await?;
        decode(response, path).await
    }

    /// POST without a body, ignoring whatever comes back.
    pub async fn post_empty(&self, path: &str) -> Result<()> {
        send(self.request(Method::POST, path)?, path).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        send(self.request(Method::DELETE, path)?, path).await?;
        Ok(())
    }
}

async fn send(request: RequestBuilder, path: &str) -> Result<Response> {
    let response = request
        .send()
        .await
        .with_context(|| format!("request to {path} failed"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("request to {path} failed ({status}): {body}");
    }
    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
    response
        .json()
        .await
        .with_context(|| format!("unexpected response from {path}"))
}
