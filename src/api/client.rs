use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::Gateway;
use crate::config::ApiSection;
use crate::errors::ApiError;
use crate::models::User;

const USER_AGENT: &str = concat!("sprintboard/", env!("CARGO_PKG_VERSION"));

/// Response from `POST /auth/login`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

/// Authenticated JSON client for the sprint board REST API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(settings: &ApiSection) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if settings.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(settings.timeout_secs));
        }
        let http = builder.build().map_err(|source| ApiError::Transport {
            endpoint: settings.base_url.clone(),
            source,
        })?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(settings.token.clone()),
        })
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ApiError> {
        Self::new(&ApiSection {
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    /// Exchange credentials for a bearer token and keep it for later calls.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let value = self.send(Method::POST, "/auth/login", Some(body)).await?;
        let response: LoginResponse =
            serde_json::from_value(value).map_err(|source| ApiError::Decode {
                endpoint: "/auth/login".to_string(),
                source,
            })?;
        self.set_token(Some(response.token.clone()));
        Ok(response)
    }

    pub fn logout(&self) {
        self.set_token(None);
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            ["message", "detail", "error"]
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

#[async_trait]
impl Gateway for ApiClient {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(%method, %url, "api request");

        let mut request = self
            .http
            .request(method, &url)
            .header(ACCEPT, "application/json");
        if let Some(token) = self.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let transport = |source| ApiError::Transport {
            endpoint: path.to_string(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                warn!(%url, status = status.as_u16(), "authorization rejected, clearing token");
                self.set_token(None);
            }
            return Err(ApiError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }

        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            endpoint: path.to_string(),
            source,
        })
    }
}
