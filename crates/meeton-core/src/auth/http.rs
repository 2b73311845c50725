//! MeetOn backend auth client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use super::{validate_credentials, AuthError, AuthResult, Authenticator, Credentials, SessionUser};
use crate::config::ClientConfig;
use crate::models::UserId;
use crate::util::{compact_text, normalize_base_url, unix_timestamp_now};

/// `reqwest` client for `/auth/login`, `/auth/refresh` and `/auth/logout`.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    auth_url: String,
    client: Client,
}

impl HttpAuthenticator {
    pub fn new(config: &ClientConfig) -> AuthResult<Self> {
        let base_url =
            normalize_base_url(&config.api_base_url).map_err(AuthError::InvalidConfiguration)?;
        Ok(Self {
            auth_url: format!("{base_url}/auth"),
            client: Client::builder().timeout(config.request_timeout()).build()?,
        })
    }

    async fn send_auth_request(&self, request: RequestBuilder) -> AuthResult<AuthResponse> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }
        Ok(response.json::<AuthResponse>().await?)
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Credentials> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email.trim(),
            "password": password,
        });
        let request = self
            .client
            .post(format!("{}/login", self.auth_url))
            .json(&payload);
        self.send_auth_request(request).await?.into_credentials(None)
    }

    async fn refresh(&self, current: &Credentials) -> AuthResult<Credentials> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                AuthError::InvalidConfiguration("Refresh token must not be empty".to_string())
            })?;

        let payload = serde_json::json!({
            "refreshToken": refresh_token,
        });
        let request = self
            .client
            .post(format!("{}/refresh", self.auth_url))
            .json(&payload);
        self.send_auth_request(request)
            .await?
            .into_credentials(Some(current))
    }

    async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        let response = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .bearer_auth(access_token)
            .send()
            .await?;
        if !(response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED) {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    #[serde(alias = "token")]
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<AuthResponseUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponseUser {
    id: serde_json::Value,
    email: Option<String>,
    #[serde(alias = "displayName", alias = "username")]
    name: Option<String>,
}

impl AuthResponse {
    /// Refresh responses may omit the user and the rotated refresh token;
    /// those are taken from `previous`.
    fn into_credentials(self, previous: Option<&Credentials>) -> AuthResult<Credentials> {
        let access_token = self
            .access_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::Api("Auth response did not include a token".to_string()))?;
        let user = match (self.user, previous) {
            (Some(user), _) => user.try_into()?,
            (None, Some(previous)) => previous.user.clone(),
            (None, None) => {
                return Err(AuthError::Api(
                    "Auth response did not include the user".to_string(),
                ))
            }
        };
        let expires_at = self.expires_at.or_else(|| {
            self.expires_in
                .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
        });

        Ok(Credentials {
            access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous.and_then(|previous| previous.refresh_token.clone())),
            expires_at,
            user,
        })
    }
}

impl TryFrom<AuthResponseUser> for SessionUser {
    type Error = AuthError;

    fn try_from(value: AuthResponseUser) -> AuthResult<Self> {
        // Numeric ids from SQL-backed ORMs arrive as JSON numbers.
        let raw_id = match value.id {
            serde_json::Value::String(id) => id,
            serde_json::Value::Number(id) => id.to_string(),
            other => {
                return Err(AuthError::Api(format!(
                    "Auth response user id has unexpected type: {other}"
                )))
            }
        };
        let id = UserId::new(raw_id).map_err(|error| AuthError::Api(error.to_string()))?;
        Ok(Self {
            id,
            email: value.email,
            display_name: value.name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AuthErrorResponse {
    error: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

fn error_for_status(status: StatusCode, body: &str) -> AuthError {
    if status == StatusCode::UNAUTHORIZED {
        AuthError::InvalidCredentials
    } else if status.is_server_error() {
        AuthError::Unavailable(parse_api_error(status, body))
    } else {
        AuthError::Api(parse_api_error(status, body))
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<AuthErrorResponse>(body) {
        if let Some(message) = payload.message.or(payload.msg).or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
