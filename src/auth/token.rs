use chrono::{DateTime, Duration, SubsecRound, Utc};
use oauth2::basic::BasicTokenResponse;
use oauth2::TokenResponse;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AuthError, Provider, Result};
use crate::config::Credentials;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// Access/refresh token pair as persisted in the credentials file.
///
/// `expires` is a unix timestamp in seconds; the token is unusable at or
/// after that instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(rename = "expires", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Convert a token endpoint response. `previous_refresh` is kept when the
    /// provider does not rotate the refresh token.
    pub(crate) fn from_response(
        response: &BasicTokenResponse,
        previous_refresh: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let refresh_token = response
            .refresh_token()
            .map(|token| token.secret().clone())
            .or_else(|| previous_refresh.map(str::to_string))
            .ok_or_else(|| {
                AuthError::failed(
                    "invalid_response",
                    "token response did not include a refresh token",
                )
            })?;

        let lifetime = response
            .expires_in()
            .and_then(|lifetime| Duration::from_std(lifetime).ok())
            .unwrap_or_else(|| Duration::seconds(DEFAULT_LIFETIME_SECS));

        Ok(Self {
            access_token: response.access_token().secret().clone(),
            refresh_token,
            expires_at: now.trunc_subsecs(0) + lifetime,
        })
    }
}

/// Return a bearer token that is valid right now, refreshing it when expired.
///
/// A refreshed token replaces the one in `credentials`; nothing is written to
/// disk here. There is no retry and no fallback to an interactive login.
pub async fn ensure_valid_token(
    credentials: &mut Credentials,
    provider: &Provider,
) -> Result<String> {
    provider.check_client(credentials)?;

    let Some(current) = credentials.access_token.as_ref() else {
        return Err(AuthError::NotLoggedIn);
    };

    if !current.is_expired_at(Utc::now()) {
        debug!(expires_at = %current.expires_at, "using stored access token");
        return Ok(current.access_token.clone());
    }

    debug!(expired_at = %current.expires_at, "access token expired, refreshing");
    let refresh_token = current.refresh_token.clone();
    let response = provider.refresh(credentials, &refresh_token).await?;
    let refreshed = StoredToken::from_response(&response, Some(&refresh_token), Utc::now())?;
    let access_token = refreshed.access_token.clone();
    credentials.access_token = Some(refreshed);

    Ok(access_token)
}

#[cfg(test)]
mod tests {
    use actix_web::http::Method;
    use serde_json::json;

    use super::*;
    use crate::auth::Environment;
    use crate::testing::MockApi;

    fn token_expiring_in(secs: i64) -> StoredToken {
        StoredToken {
            access_token: "tok0".into(),
            refresh_token: "ref0".into(),
            expires_at: Utc::now().trunc_subsecs(0) + Duration::seconds(secs),
        }
    }

    fn credentials(token: Option<StoredToken>) -> Credentials {
        Credentials {
            client_id: "client".into(),
            client_secret: "secret".into(),
            access_token: token,
            ..Default::default()
        }
    }

    /// Nothing listens on the discard port, so any request would fail loudly.
    fn offline_provider() -> Provider {
        Provider::new(Environment::Sandbox, Some("http://127.0.0.1:9/v2/")).unwrap()
    }

    fn parse_response(body: serde_json::Value) -> BasicTokenResponse {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn valid_token_is_returned_without_network() {
        let mut creds = credentials(Some(token_expiring_in(600)));
        let before = creds.clone();

        let token = ensure_valid_token(&mut creds, &offline_provider())
            .await
            .unwrap();

        assert_eq!(token, "tok0");
        assert_eq!(creds, before);
    }

    #[tokio::test]
    async fn missing_client_id_fails_before_network() {
        let mut creds = credentials(Some(token_expiring_in(-600)));
        creds.client_id.clear();

        let err = ensure_valid_token(&mut creds, &offline_provider())
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::MissingCredentials));
        assert_eq!(creds.access_token.unwrap().access_token, "tok0");
    }

    #[tokio::test]
    async fn no_stored_token_means_not_logged_in() {
        let mut creds = credentials(None);
        let err = ensure_valid_token(&mut creds, &offline_provider())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotLoggedIn));
    }

    #[actix_web::test]
    async fn expired_token_is_refreshed_once() {
        let api = MockApi::builder()
            .route(
                Method::POST,
                "token_endpoint",
                200,
                json!({
                    "access_token": "tok1",
                    "refresh_token": "ref1",
                    "expires_in": 3600,
                    "token_type": "bearer"
                }),
            )
            .start();
        let provider = Provider::new(Environment::Sandbox, Some(&api.base_url)).unwrap();
        let mut creds = credentials(Some(token_expiring_in(-5)));

        let token = ensure_valid_token(&mut creds, &provider).await.unwrap();

        assert_eq!(token, "tok1");
        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].body.contains("grant_type=refresh_token"));
        assert!(requests[0].body.contains("refresh_token=ref0"));

        let stored = creds.access_token.unwrap();
        assert_eq!(stored.access_token, "tok1");
        assert_eq!(stored.refresh_token, "ref1");
        let remaining = (stored.expires_at - Utc::now()).num_seconds();
        assert!((3540..=3600).contains(&remaining), "remaining: {remaining}");
    }

    #[actix_web::test]
    async fn refresh_keeps_refresh_token_when_not_rotated() {
        let api = MockApi::builder()
            .route(
                Method::POST,
                "token_endpoint",
                200,
                json!({"access_token": "tok1", "expires_in": 60, "token_type": "bearer"}),
            )
            .start();
        let provider = Provider::new(Environment::Sandbox, Some(&api.base_url)).unwrap();
        let mut creds = credentials(Some(token_expiring_in(0)));

        ensure_valid_token(&mut creds, &provider).await.unwrap();

        let stored = creds.access_token.unwrap();
        assert_eq!(stored.access_token, "tok1");
        assert_eq!(stored.refresh_token, "ref0");
    }

    #[actix_web::test]
    async fn rejected_refresh_surfaces_provider_error() {
        let api = MockApi::builder()
            .route(
                Method::POST,
                "token_endpoint",
                400,
                json!({"error": "invalid_grant", "error_description": "Refresh token revoked"}),
            )
            .start();
        let provider = Provider::new(Environment::Sandbox, Some(&api.base_url)).unwrap();
        let mut creds = credentials(Some(token_expiring_in(-60)));
        let before = creds.clone();

        let err = ensure_valid_token(&mut creds, &provider).await.unwrap_err();

        match err {
            AuthError::AuthenticationFailed { code, message } => {
                assert_eq!(code, "invalid_grant");
                assert_eq!(message, "Refresh token revoked");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(creds, before);
        assert_eq!(api.requests().len(), 1);
    }

    #[test]
    fn token_expires_exactly_at_deadline() {
        let token = token_expiring_in(0);
        assert!(token.is_expired_at(token.expires_at));
        assert!(!token.is_expired_at(token.expires_at - Duration::seconds(1)));
    }

    #[test]
    fn from_response_requires_refresh_token_on_first_grant() {
        let response = parse_response(json!({"access_token": "tok", "token_type": "bearer"}));
        let err = StoredToken::from_response(&response, None, Utc::now()).unwrap_err();
        assert!(matches!(err, AuthError::AuthenticationFailed { .. }));
    }

    #[test]
    fn from_response_defaults_lifetime() {
        let now = Utc::now();
        let response = parse_response(json!({
            "access_token": "tok",
            "refresh_token": "ref",
            "token_type": "bearer"
        }));
        let token = StoredToken::from_response(&response, None, now).unwrap();
        assert_eq!(
            token.expires_at,
            now.trunc_subsecs(0) + Duration::seconds(DEFAULT_LIFETIME_SECS)
        );
    }

    #[test]
    fn stored_token_uses_unix_expiry() {
        let token = StoredToken {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["expires"], 1_700_000_000);

        // Token objects written by older clients carry extra keys.
        let legacy: StoredToken = serde_json::from_value(json!({
            "token_type": "bearer",
            "access_token": "a",
            "refresh_token": "r",
            "expires": 1_700_000_000,
            "resource_owner_id": null
        }))
        .unwrap();
        assert_eq!(legacy, token);
    }
}
